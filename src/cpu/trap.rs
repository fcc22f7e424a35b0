// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Built-in trap routines: console I/O and halt
//!
//! |vector| routine | effect
//! |------|---------|--------------------------------------------------
//! | `20` | GETC    | Read a key into R0, without echo
//! | `21` | OUT     | Write the character in R0\[7:0\]
//! | `22` | PUTS    | Write a string, one character per word
//! | `23` | IN      | Prompt, read a key into R0, and echo it
//! | `24` | PUTSP   | Write a string, two characters per word
//! | `25` | HALT    | Print `System HALT`, and stop the machine

use super::{mem::Memory, Adr, CPU};
use std::fmt::Display;

/// The prompt written by `IN`
pub const PROMPT: &[u8] = b"> ";
/// Written by `HALT` as the machine stops
pub const HALT_MESSAGE: &[u8] = b"\nSystem HALT\n";

/// The trap vectors this machine implements
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Vector {
    /// Read a key into R0, without echo
    Getc = 0x20,
    /// Write the character in R0\[7:0\]
    Out = 0x21,
    /// Write a string, one character per word
    Puts = 0x22,
    /// Prompt, read a key into R0, and echo it
    In = 0x23,
    /// Write a string, two characters per word
    Putsp = 0x24,
    /// Stop the machine
    Halt = 0x25,
}

impl TryFrom<u8> for Vector {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x20 => Ok(Vector::Getc),
            0x21 => Ok(Vector::Out),
            0x22 => Ok(Vector::Puts),
            0x23 => Ok(Vector::In),
            0x24 => Ok(Vector::Putsp),
            0x25 => Ok(Vector::Halt),
            _ => Err(value),
        }
    }
}

impl Display for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Vector::Getc => "GETC",
                Vector::Out => "OUT",
                Vector::Puts => "PUTS",
                Vector::In => "IN",
                Vector::Putsp => "PUTSP",
                Vector::Halt => "HALT",
            }
        )
    }
}

/// |`f0vv`| Saves the return address, then runs trap routine `vv`
impl CPU {
    /// |`f0vv`| Saves pc in R7, then runs a trap routine
    #[inline(always)]
    pub(super) fn trap(&mut self, mem: &mut Memory, vector: u8) {
        self.reg[7] = self.reg.pc;
        match Vector::try_from(vector) {
            Ok(Vector::Getc) => self.read_key(mem, false),
            Ok(Vector::Out) => self.console.putc(self.reg[0] as u8),
            Ok(Vector::Puts) => self.puts(mem),
            Ok(Vector::In) => self.read_key(mem, true),
            Ok(Vector::Putsp) => self.putsp(mem),
            Ok(Vector::Halt) => self.halt(),
            Err(vector) => log::warn!(
                "unrecognized trap vector x{vector:02x} at {:04x}",
                self.reg.pc.wrapping_sub(1)
            ),
        }
    }

    /// GETC and IN: reads a key into R0, clearing the high byte
    ///
    /// If no key is pending, rewinds pc onto the trap and waits for one.
    /// The execution loop resumes at the trap once a key arrives.
    fn read_key(&mut self, mem: &mut Memory, echo: bool) {
        if echo && !self.prompted {
            self.console.puts(PROMPT);
            self.prompted = true;
        }
        match mem.keyboard_mut().take() {
            Some(key) => {
                self.reg.set(0, key as u16);
                if echo {
                    self.console.putc(key);
                }
                self.prompted = false;
            }
            None => {
                self.reg.pc = self.reg.pc.wrapping_sub(1);
                self.flags.keypause = true;
            }
        }
    }

    /// PUTS: writes the low byte of each word from mem\[R0\], up to a zero
    /// low byte. The high byte is ignored.
    fn puts(&mut self, mem: &Memory) {
        let start: Adr = self.reg[0];
        for i in 0..=Adr::MAX {
            match mem.peek(start.wrapping_add(i)) as u8 {
                0 => break,
                c => self.console.putc(c),
            }
        }
    }

    /// PUTSP: writes two characters per word from mem\[R0\], low byte first,
    /// up to a zero word. A zero high byte ends an odd-length string.
    fn putsp(&mut self, mem: &Memory) {
        let start: Adr = self.reg[0];
        for i in 0..=Adr::MAX {
            match mem.peek(start.wrapping_add(i)) {
                0 => break,
                word => {
                    let [lo, hi] = word.to_le_bytes();
                    self.console.putc(lo);
                    if hi != 0 {
                        self.console.putc(hi);
                    }
                }
            }
        }
    }

    /// HALT: says so on the console, and clears the running flag. The
    /// execution loop stops at the next instruction boundary.
    fn halt(&mut self) {
        log::info!("HALT at {:04x}", self.reg.pc.wrapping_sub(1));
        self.console.puts(HALT_MESSAGE);
        self.running = false;
    }
}
