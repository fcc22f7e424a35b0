// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE.txt for details)

//! This crate implements an LC-3 virtual machine that runs its programs one
//! basic block at a time, the way a dynamic translator would. Straight-line
//! runs of instructions are predecoded into a block cache, and re-entered at
//! whatever instruction a branch (or a single-stepping debugger) lands on.
//!
//! The machine itself is the [CPU] plus its [Memory]. [Lc3] bundles them for
//! front-ends that don't want to juggle the two.

pub mod cpu;
pub mod error;
pub mod io;
pub mod loader;

pub use cpu::{
    cache::{Block, BlockCache, CodeLocation, Eviction},
    flags::Flags,
    instruction::disassembler::{Dis, Disassembler},
    mem::Memory,
    Adr, Status, Yield, CPU,
};
pub use error::{Error, Result};

use std::path::Path;

/// Holds the state of an LC-3: a [CPU] and its [Memory]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lc3 {
    /// Decodes and runs instructions
    pub cpu: CPU,
    /// 64Ki words, plus the keyboard
    pub mem: Memory,
}

impl Lc3 {
    /// Constructs an Lc3 around an already configured [CPU]
    pub fn new(cpu: CPU) -> Self {
        Self {
            cpu,
            mem: Memory::new(),
        }
    }

    /// Loads an image from bytes, and points pc at its origin
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// # fn main() -> Result<()> {
    /// let mut lc3 = Lc3::default();
    /// // .ORIG x4000; ADD R0, R0, #1; HALT
    /// lc3.load_bytes(&[0x40, 0x00, 0x10, 0x21, 0xf0, 0x25])?;
    /// assert_eq!(0x4000, lc3.cpu.pc());
    /// assert_eq!(Status::Halted, lc3.run());
    /// assert_eq!(1, lc3.cpu.reg(0));
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        let origin = loader::load_bytes(&mut self.mem, bytes)?;
        self.cpu.set_pc(origin);
        Ok(self)
    }

    /// Loads an image file, and points pc at its origin
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let origin = loader::load_file(&mut self.mem, path)?;
        self.cpu.set_pc(origin);
        Ok(self)
    }

    /// Runs one macro-cycle. See [CPU::cycle].
    pub fn cycle(&mut self) -> Option<Yield> {
        self.cpu.cycle(&mut self.mem)
    }

    /// Runs exactly one instruction. See [CPU::singlestep].
    pub fn singlestep(&mut self) -> Option<Yield> {
        self.cpu.singlestep(&mut self.mem)
    }

    /// Runs until the CPU stops. See [CPU::run].
    pub fn run(&mut self) -> Status {
        self.cpu.run(&mut self.mem)
    }

    /// Presses a key on the keyboard
    pub fn press(&mut self, key: u8) -> &mut Self {
        self.mem.keyboard_mut().press(key);
        self
    }
}

/// Common imports for lc3vm
pub mod prelude {
    pub use super::*;
    pub use crate::cpu::{
        instruction::{Insn, Opcode},
        registers::{Condition, Registers},
    };
    pub use crate::io::{Console, Keyboard};
    pub use crate::loader::Image;
}
