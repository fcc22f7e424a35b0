// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Contains implementations for each LC-3 [Insn]
//!
//! By the time an instruction is executed, pc already points past it.

use super::{
    instruction::{Insn, Src},
    mem::Memory,
    Adr, Reg, CPU,
};

impl CPU {
    /// Executes a single [Insn]
    #[rustfmt::skip]
    #[inline(always)]
    pub(super) fn execute(&mut self, mem: &mut Memory, instruction: Insn) {
        match instruction {
            Insn::Br   { nzp, offset      } => self.branch(nzp, offset),
            Insn::Add  { dr, sr1, src     } => self.add(dr, sr1, src),
            Insn::Ld   { dr, offset       } => self.load(mem, dr, offset),
            Insn::St   { sr, offset       } => self.store(mem, sr, offset),
            Insn::Jsr  { offset           } => self.jump_subroutine(offset),
            Insn::Jsrr { base             } => self.jump_subroutine_register(base),
            Insn::And  { dr, sr1, src     } => self.and(dr, sr1, src),
            Insn::Ldr  { dr, base, offset } => self.load_register(mem, dr, base, offset),
            Insn::Str  { sr, base, offset } => self.store_register(mem, sr, base, offset),
            Insn::Rti                       => self.unsupported("RTI"),
            Insn::Not  { dr, sr           } => self.not(dr, sr),
            Insn::Ldi  { dr, offset       } => self.load_indirect(mem, dr, offset),
            Insn::Sti  { sr, offset       } => self.store_indirect(mem, sr, offset),
            Insn::Jmp  { base             } => self.jump(base),
            Insn::Reserved                  => self.unsupported("reserved opcode"),
            Insn::Lea  { dr, offset       } => self.load_effective_address(dr, offset),
            Insn::Trap { vector           } => self.trap(mem, vector),
        }
    }

    /// Reports an instruction this machine doesn't run. Execution continues.
    fn unsupported(&mut self, what: &str) {
        log::warn!("{what} at {:04x} is not supported", self.reg.pc.wrapping_sub(1));
    }

    /// Computes `pc + offset`, wrapping around memory
    #[inline(always)]
    fn relative(&self, offset: u16) -> Adr {
        self.reg.pc.wrapping_add(offset)
    }

    /// Gets the value of a second operand
    #[inline(always)]
    fn operand(&self, src: Src) -> u16 {
        match src {
            Src::Reg(r) => self.reg[r],
            Src::Imm(imm) => imm,
        }
    }
}

/// Arithmetic and logic
///
/// |opcode| effect                             |
/// |------|------------------------------------|
/// |`1...`| dr = sr1 + (sr2 or imm5)           |
/// |`5...`| dr = sr1 & (sr2 or imm5)           |
/// |`9...`| dr = !sr                           |
impl CPU {
    /// |`1...`| Adds, wrapping on overflow, and sets the condition codes
    #[inline(always)]
    pub(super) fn add(&mut self, dr: Reg, sr1: Reg, src: Src) {
        let value = self.reg[sr1].wrapping_add(self.operand(src));
        self.reg.set(dr, value);
    }
    /// |`5...`| Bitwise ANDs, and sets the condition codes
    #[inline(always)]
    pub(super) fn and(&mut self, dr: Reg, sr1: Reg, src: Src) {
        let value = self.reg[sr1] & self.operand(src);
        self.reg.set(dr, value);
    }
    /// |`9...`| Bitwise NOTs, and sets the condition codes
    #[inline(always)]
    pub(super) fn not(&mut self, dr: Reg, sr: Reg) {
        let value = !self.reg[sr];
        self.reg.set(dr, value);
    }
}

/// Loads and stores
///
/// |opcode| effect                             |
/// |------|------------------------------------|
/// |`2...`| dr = mem\[pc + offset\]            |
/// |`3...`| mem\[pc + offset\] = sr            |
/// |`6...`| dr = mem\[base + offset\]          |
/// |`7...`| mem\[base + offset\] = sr          |
/// |`a...`| dr = mem\[mem\[pc + offset\]\]     |
/// |`b...`| mem\[mem\[pc + offset\]\] = sr     |
/// |`e...`| dr = pc + offset                   |
impl CPU {
    /// |`2...`| Loads a word relative to pc
    #[inline(always)]
    pub(super) fn load(&mut self, mem: &mut Memory, dr: Reg, offset: u16) {
        let value = mem.read(self.relative(offset));
        self.reg.set(dr, value);
    }
    /// |`3...`| Stores a word relative to pc
    #[inline(always)]
    pub(super) fn store(&mut self, mem: &mut Memory, sr: Reg, offset: u16) {
        mem.write(self.relative(offset), self.reg[sr]);
    }
    /// |`6...`| Loads a word relative to a base register
    #[inline(always)]
    pub(super) fn load_register(&mut self, mem: &mut Memory, dr: Reg, base: Reg, offset: u16) {
        let value = mem.read(self.reg[base].wrapping_add(offset));
        self.reg.set(dr, value);
    }
    /// |`7...`| Stores a word relative to a base register
    #[inline(always)]
    pub(super) fn store_register(&mut self, mem: &mut Memory, sr: Reg, base: Reg, offset: u16) {
        mem.write(self.reg[base].wrapping_add(offset), self.reg[sr]);
    }
    /// |`a...`| Loads a word through a pointer stored relative to pc
    #[inline(always)]
    pub(super) fn load_indirect(&mut self, mem: &mut Memory, dr: Reg, offset: u16) {
        let pointer = mem.read(self.relative(offset));
        let value = mem.read(pointer);
        self.reg.set(dr, value);
    }
    /// |`b...`| Stores a word through a pointer stored relative to pc
    #[inline(always)]
    pub(super) fn store_indirect(&mut self, mem: &mut Memory, sr: Reg, offset: u16) {
        let pointer = mem.read(self.relative(offset));
        mem.write(pointer, self.reg[sr]);
    }
    /// |`e...`| Computes an address relative to pc. Sets the condition codes.
    #[inline(always)]
    pub(super) fn load_effective_address(&mut self, dr: Reg, offset: u16) {
        let value = self.relative(offset);
        self.reg.set(dr, value);
    }
}

/// Control flow
///
/// |opcode| effect                             |
/// |------|------------------------------------|
/// |`0...`| pc += offset, if nzp matches       |
/// |`4...`| r7 = pc, then pc += offset or base |
/// |`c...`| pc = base                          |
impl CPU {
    /// |`0...`| Branches if any of the `nzp` bits matches the condition codes
    #[inline(always)]
    pub(super) fn branch(&mut self, nzp: u16, offset: u16) {
        if self.reg.cond.matches(nzp) {
            self.reg.pc = self.relative(offset);
        }
    }
    /// |`4...`| Links pc in R7, then jumps relative to pc
    #[inline(always)]
    pub(super) fn jump_subroutine(&mut self, offset: u16) {
        self.reg[7] = self.reg.pc;
        self.reg.pc = self.relative(offset);
    }
    /// |`40..`| Links pc in R7, then jumps to the address in `base`
    ///
    /// `base` is read before linking, so `JSRR R7` jumps to the old R7.
    #[inline(always)]
    pub(super) fn jump_subroutine_register(&mut self, base: Reg) {
        let target = self.reg[base];
        self.reg[7] = self.reg.pc;
        self.reg.pc = target;
    }
    /// |`c...`| Jumps to the address in `base`. `RET` is `JMP R7`.
    #[inline(always)]
    pub(super) fn jump(&mut self, base: Reg) {
        self.reg.pc = self.reg[base];
    }
}
