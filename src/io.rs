// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! The emulator's view of the outside world: a keyboard feeding the
//! memory-mapped input registers, and a console that trap routines write to.

use std::{collections::VecDeque, fmt::Display};

/// Keyboard input, as seen through the memory-mapped keyboard registers
///
/// Keys are queued in the order they're pressed. Reading the status register
/// latches the next key into the data register.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keyboard {
    pending: VecDeque<u8>,
    data: u8,
}

impl Keyboard {
    /// Presses a key
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::io::Keyboard;
    /// let mut kbd = Keyboard::default();
    /// kbd.press(b'w');
    /// assert!(kbd.available());
    /// ```
    pub fn press(&mut self, key: u8) {
        self.pending.push_back(key);
    }

    /// Presses each key in a string, in order
    pub fn type_str(&mut self, keys: &str) {
        self.pending.extend(keys.bytes())
    }

    /// Returns true if a key is waiting to be read
    pub fn available(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Samples the keyboard, as a read of the status register would.
    ///
    /// If a key is pending, it's latched into the data register and
    /// the status word has bit 15 set.
    pub fn status(&mut self) -> u16 {
        match self.pending.pop_front() {
            Some(key) => {
                self.data = key;
                0x8000
            }
            None => 0,
        }
    }

    /// Gets the last latched key, as a read of the data register would
    pub fn data(&self) -> u16 {
        self.data as u16
    }

    /// Takes the next pending key, bypassing the status register
    pub fn take(&mut self) -> Option<u8> {
        let key = self.pending.pop_front()?;
        self.data = key;
        Some(key)
    }

    /// Drops any keys that haven't been read yet
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Text written by the console trap routines
///
/// The front-end decides what to do with it; usually that means
/// draining it to a terminal every so often.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Console {
    buffer: Vec<u8>,
}

impl Console {
    /// Writes a single byte
    pub fn putc(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    /// Writes a run of bytes
    pub fn puts(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Gets everything written since the last [Console::take] or [Console::clear]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns true if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Removes and returns everything written so far
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::io::Console;
    /// let mut console = Console::default();
    /// console.puts(b"hi");
    /// assert_eq!(b"hi".to_vec(), console.take());
    /// assert!(console.is_empty());
    /// ```
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Discards everything written so far
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Display for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.buffer))
    }
}
