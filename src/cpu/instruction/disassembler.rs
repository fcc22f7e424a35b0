// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! A disassembler for LC-3 instruction words
use super::Insn;
use crate::cpu::Adr;
use owo_colors::{OwoColorize, Style};

/// Disassembles LC-3 instructions
pub trait Disassembler {
    /// Disassemble a single instruction, located at `addr`
    fn once(&self, insn: u16, addr: Adr) -> String;
}

/// Disassembles LC-3 instructions, printing them in the provided [owo_colors::Style]s
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dis {
    /// Styles instructions this machine can't run
    pub invalid: Style,
    /// Styles valid instructions
    pub normal: Style,
}

impl Dis {
    /// Constructs a Dis that doesn't style its output
    pub fn plain() -> Self {
        Self {
            invalid: Style::new(),
            normal: Style::new(),
        }
    }
}

impl Default for Dis {
    fn default() -> Self {
        Self {
            invalid: Style::new().bold().red(),
            normal: Style::new().green(),
        }
    }
}

impl Disassembler for Dis {
    /// # Examples
    /// ```rust
    /// # use lc3vm::cpu::instruction::disassembler::*;
    /// let dis = Dis::default();
    /// assert!(dis.once(0x1021, 0x3000).contains("ADD    R0, R0, #1"));
    /// assert!(dis.once(0x05ff, 0x3000).contains("BRz    x3000"));
    /// assert!(dis.once(0xf025, 0x3000).contains("HALT"));
    /// ```
    fn once(&self, insn: u16, addr: Adr) -> String {
        let decoded = Insn::from(insn);
        if decoded.is_unsupported() {
            let listing = format!("{:<24}; {insn:04x}", decoded.listing(Some(addr)));
            format!("{}", listing.style(self.invalid))
        } else {
            format!("{}", decoded.listing(Some(addr)).style(self.normal))
        }
    }
}
