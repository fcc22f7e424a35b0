// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Flat, word-addressed LC-3 memory, with memory-mapped keyboard registers

use super::Adr;
use crate::io::Keyboard;
use owo_colors::{OwoColorize, Style};
use std::{
    fmt::{Debug, Display, Formatter, Result},
    ops::Range,
};

/// The number of addressable words
pub const MEMORY_SIZE: usize = 0x10000;
/// Keyboard status register. Bit 15 is set when a key is available.
pub const KBSR: Adr = 0xfe00;
/// Keyboard data register. The low byte holds the last key read.
pub const KBDR: Adr = 0xfe02;

/// 64Ki words of memory, plus the keyboard behind [KBSR] and [KBDR]
///
/// Addresses are [u16], so every address is in range, and address
/// arithmetic wraps around the top of memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    words: Vec<u16>,
    keyboard: Keyboard,
}

impl Memory {
    /// Constructs a zeroed Memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a word, running memory-mapped I/O
    ///
    /// A read of [KBSR] samples the keyboard, latching the next key (if any)
    /// into [KBDR]. Neither register is backed by storage.
    /// # Examples
    /// ```rust
    /// # use lc3vm::cpu::mem::*;
    /// let mut mem = Memory::new();
    /// mem.keyboard_mut().press(b'a');
    /// assert_eq!(0x8000, mem.read(KBSR));
    /// assert_eq!(b'a' as u16, mem.read(KBDR));
    /// // the key has been consumed
    /// assert_eq!(0, mem.read(KBSR));
    /// ```
    #[inline(always)]
    pub fn read(&mut self, addr: Adr) -> u16 {
        match addr {
            KBSR => self.keyboard.status(),
            KBDR => self.keyboard.data(),
            _ => self.words[addr as usize],
        }
    }

    /// Reads a word without side effects. [KBSR] reports availability,
    /// but doesn't consume the key.
    #[inline(always)]
    pub fn peek(&self, addr: Adr) -> u16 {
        match addr {
            KBSR if self.keyboard.available() => 0x8000,
            KBSR => 0,
            KBDR => self.keyboard.data(),
            _ => self.words[addr as usize],
        }
    }

    /// Writes a word. There are no write-protected addresses.
    #[inline(always)]
    pub fn write(&mut self, addr: Adr, value: u16) {
        self.words[addr as usize] = value;
    }

    /// Copies `words` into memory starting at `origin`, wrapping around the
    /// top of memory.
    ///
    /// Returns the number of words written.
    pub fn load(&mut self, origin: Adr, words: &[u16]) -> usize {
        for (addr, &word) in (origin..=Adr::MAX).chain(0..origin).zip(words) {
            self.write(addr, word);
        }
        words.len().min(MEMORY_SIZE)
    }

    /// Zeroes all of memory and drops any pending keys
    pub fn clear(&mut self) {
        self.words.fill(0);
        self.keyboard.clear();
    }

    /// Gets a slice of the backing storage, bypassing memory-mapped I/O
    pub fn grab(&self, range: Range<usize>) -> Option<&[u16]> {
        self.words.get(range)
    }

    /// Gets the entire backing storage
    pub fn as_slice(&self) -> &[u16] {
        &self.words
    }

    /// Gets the keyboard
    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    /// Gets the keyboard, for pressing keys
    pub fn keyboard_mut(&mut self) -> &mut Keyboard {
        &mut self.keyboard
    }

    /// Gets a hexdump view of `range`, clamped to the end of memory
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::cpu::mem::*;
    /// let mut mem = Memory::new();
    /// mem.write(0x3000, 0x1234);
    /// println!("{}", mem.window(0x3000..0x3010));
    /// ```
    pub fn window(&self, range: Range<usize>) -> MemWindow<'_> {
        let end = range.end.min(MEMORY_SIZE);
        let start = range.start.min(end);
        MemWindow {
            base: start,
            words: &self.words[start..end],
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            words: vec![0; MEMORY_SIZE],
            keyboard: Keyboard::default(),
        }
    }
}

impl Debug for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("Memory")
            .field("len", &self.words.len())
            .field("keyboard", &self.keyboard)
            .finish_non_exhaustive()
    }
}

/// A hexdump of a range of [Memory], eight words to a line
pub struct MemWindow<'a> {
    base: usize,
    words: &'a [u16],
}

impl<'a> Display for MemWindow<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        // Green phosphor style formatting, for taste
        let term: Style = Style::new().bold().green().on_black();
        for (index, word) in self.words.iter().enumerate() {
            let addr = self.base + index;
            if index % 8 == 0 {
                write!(f, "{:04x}{} ", addr.style(term), ":".style(term))?
            }
            write!(f, "{word:04x}")?;
            write!(
                f,
                "{}",
                match index % 8 {
                    7 => "\n",
                    3 => "  ",
                    _ => " ",
                }
            )?
        }
        if self.words.len() % 8 != 0 {
            writeln!(f)?
        }
        Ok(())
    }
}
