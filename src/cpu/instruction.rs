// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Contains the definition of an LC-3 [Insn], and the decoder that produces it
//!
//! Every 16-bit word decodes to exactly one [Insn]. Bits the ISA leaves
//! unused are ignored, as they are on hardware.

pub mod disassembler;

use super::{trap::Vector, Adr, Reg};
use std::fmt::Display;

/// Sign-extends the low `bits` bits of `value` across all 16 bits
///
/// If bit `bits - 1` is set, the result is `value | (0xffff << bits)`.
/// Otherwise, `value` is returned unchanged.
///
/// # Examples
/// ```rust
/// # use lc3vm::cpu::instruction::sign_extend;
/// assert_eq!(0xffff, sign_extend(0x1f, 5));
/// assert_eq!(0x000f, sign_extend(0x0f, 5));
/// assert_eq!(0xff00, sign_extend(0x100, 9));
/// ```
#[inline(always)]
pub fn sign_extend(value: u16, bits: u32) -> u16 {
    debug_assert!((1..=16).contains(&bits));
    if (value >> (bits - 1)) & 1 != 0 {
        value | 0xffff_u16.checked_shl(bits).unwrap_or(0)
    } else {
        value
    }
}

/// Extracts the opcode nibble, bits `[15:12]`
#[inline]
pub fn op(ins: u16) -> u8 {
    (ins >> 12) as u8
}
/// Extracts the destination (or store source) register, bits `[11:9]`
#[inline]
pub fn dr(ins: u16) -> Reg {
    (ins >> 9 & 0x7) as Reg
}
/// Extracts the first source (or base) register, bits `[8:6]`
#[inline]
pub fn sr1(ins: u16) -> Reg {
    (ins >> 6 & 0x7) as Reg
}
/// Extracts the second source register, bits `[2:0]`
#[inline]
pub fn sr2(ins: u16) -> Reg {
    (ins & 0x7) as Reg
}
/// Extracts the `nzp` condition mask of a branch, bits `[11:9]`
#[inline]
pub fn nzp(ins: u16) -> u16 {
    ins >> 9 & 0x7
}
/// Extracts and sign-extends the 5-bit immediate, bits `[4:0]`
#[inline]
pub fn imm5(ins: u16) -> u16 {
    sign_extend(ins & 0x1f, 5)
}
/// Extracts and sign-extends the 6-bit offset, bits `[5:0]`
#[inline]
pub fn offset6(ins: u16) -> u16 {
    sign_extend(ins & 0x3f, 6)
}
/// Extracts and sign-extends the 9-bit PC offset, bits `[8:0]`
#[inline]
pub fn pc_offset9(ins: u16) -> u16 {
    sign_extend(ins & 0x1ff, 9)
}
/// Extracts and sign-extends the 11-bit PC offset, bits `[10:0]`
#[inline]
pub fn pc_offset11(ins: u16) -> u16 {
    sign_extend(ins & 0x7ff, 11)
}
/// Extracts the trap vector, bits `[7:0]`
#[inline]
pub fn trapvect8(ins: u16) -> u8 {
    (ins & 0xff) as u8
}

/// The sixteen LC-3 opcodes, by their top nibble
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xa,
    Sti = 0xb,
    Jmp = 0xc,
    Reserved = 0xd,
    Lea = 0xe,
    Trap = 0xf,
}

impl Opcode {
    /// Gets the opcode of an instruction word
    pub fn of(ins: u16) -> Self {
        match op(ins) {
            0x0 => Opcode::Br,
            0x1 => Opcode::Add,
            0x2 => Opcode::Ld,
            0x3 => Opcode::St,
            0x4 => Opcode::Jsr,
            0x5 => Opcode::And,
            0x6 => Opcode::Ldr,
            0x7 => Opcode::Str,
            0x8 => Opcode::Rti,
            0x9 => Opcode::Not,
            0xa => Opcode::Ldi,
            0xb => Opcode::Sti,
            0xc => Opcode::Jmp,
            0xd => Opcode::Reserved,
            0xe => Opcode::Lea,
            _ => Opcode::Trap,
        }
    }

    /// Returns true if this opcode ends a basic block.
    ///
    /// Branches, subroutine calls, and jumps end a block. Traps don't,
    /// since they return to the next instruction.
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Br | Opcode::Jsr | Opcode::Jmp)
    }
}

/// The second operand of `ADD` and `AND`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Src {
    /// `[5] = 0`: a register
    Reg(Reg),
    /// `[5] = 1`: a sign-extended 5-bit immediate
    Imm(u16),
}

/// A decoded LC-3 instruction
///
/// Offsets and immediates are stored already sign-extended, ready to be
/// wrapping-added to a 16-bit address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Insn {
    /// | 0000 nzp ooooooooo | Branch to pc + offset if any of nzp matches
    Br { nzp: u16, offset: u16 },
    /// | 0001 ddd sss 0 00 ttt | dr = sr1 + sr2
    /// | 0001 ddd sss 1 iiiii  | dr = sr1 + imm5
    Add { dr: Reg, sr1: Reg, src: Src },
    /// | 0010 ddd ooooooooo | dr = mem[pc + offset]
    Ld { dr: Reg, offset: u16 },
    /// | 0011 sss ooooooooo | mem[pc + offset] = sr
    St { sr: Reg, offset: u16 },
    /// | 0100 1 ooooooooooo | r7 = pc; pc += offset
    Jsr { offset: u16 },
    /// | 0100 0 00 bbb 000000 | r7 = pc; pc = base
    Jsrr { base: Reg },
    /// | 0101 ddd sss 0 00 ttt | dr = sr1 & sr2
    /// | 0101 ddd sss 1 iiiii  | dr = sr1 & imm5
    And { dr: Reg, sr1: Reg, src: Src },
    /// | 0110 ddd bbb oooooo | dr = mem[base + offset]
    Ldr { dr: Reg, base: Reg, offset: u16 },
    /// | 0111 sss bbb oooooo | mem[base + offset] = sr
    Str { sr: Reg, base: Reg, offset: u16 },
    /// | 1000 000000000000 | Return from interrupt (unsupported)
    Rti,
    /// | 1001 ddd sss 111111 | dr = !sr
    Not { dr: Reg, sr: Reg },
    /// | 1010 ddd ooooooooo | dr = mem[mem[pc + offset]]
    Ldi { dr: Reg, offset: u16 },
    /// | 1011 sss ooooooooo | mem[mem[pc + offset]] = sr
    Sti { sr: Reg, offset: u16 },
    /// | 1100 000 bbb 000000 | pc = base (`RET` when base is r7)
    Jmp { base: Reg },
    /// | 1101 xxxxxxxxxxxx | Reserved opcode
    Reserved,
    /// | 1110 ddd ooooooooo | dr = pc + offset
    Lea { dr: Reg, offset: u16 },
    /// | 1111 0000 vvvvvvvv | r7 = pc; run trap routine v
    Trap { vector: u8 },
}

impl From<u16> for Insn {
    /// Decodes an instruction word
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::cpu::instruction::*;
    /// assert_eq!(
    ///     Insn::Add { dr: 0, sr1: 0, src: Src::Imm(1) },
    ///     Insn::from(0x1021)
    /// );
    /// ```
    #[rustfmt::skip]
    fn from(ins: u16) -> Self {
        let src = || match ins >> 5 & 1 {
            0 => Src::Reg(sr2(ins)),
            _ => Src::Imm(imm5(ins)),
        };
        match Opcode::of(ins) {
            Opcode::Br       => Insn::Br   { nzp: nzp(ins), offset: pc_offset9(ins) },
            Opcode::Add      => Insn::Add  { dr: dr(ins), sr1: sr1(ins), src: src() },
            Opcode::Ld       => Insn::Ld   { dr: dr(ins), offset: pc_offset9(ins) },
            Opcode::St       => Insn::St   { sr: dr(ins), offset: pc_offset9(ins) },
            Opcode::Jsr if ins >> 11 & 1 != 0
                             => Insn::Jsr  { offset: pc_offset11(ins) },
            Opcode::Jsr      => Insn::Jsrr { base: sr1(ins) },
            Opcode::And      => Insn::And  { dr: dr(ins), sr1: sr1(ins), src: src() },
            Opcode::Ldr      => Insn::Ldr  { dr: dr(ins), base: sr1(ins), offset: offset6(ins) },
            Opcode::Str      => Insn::Str  { sr: dr(ins), base: sr1(ins), offset: offset6(ins) },
            Opcode::Rti      => Insn::Rti,
            Opcode::Not      => Insn::Not  { dr: dr(ins), sr: sr1(ins) },
            Opcode::Ldi      => Insn::Ldi  { dr: dr(ins), offset: pc_offset9(ins) },
            Opcode::Sti      => Insn::Sti  { sr: dr(ins), offset: pc_offset9(ins) },
            Opcode::Jmp      => Insn::Jmp  { base: sr1(ins) },
            Opcode::Reserved => Insn::Reserved,
            Opcode::Lea      => Insn::Lea  { dr: dr(ins), offset: pc_offset9(ins) },
            Opcode::Trap     => Insn::Trap { vector: trapvect8(ins) },
        }
    }
}

impl Insn {
    /// Gets the [Opcode] this instruction was decoded from
    pub fn opcode(&self) -> Opcode {
        match self {
            Insn::Br { .. } => Opcode::Br,
            Insn::Add { .. } => Opcode::Add,
            Insn::Ld { .. } => Opcode::Ld,
            Insn::St { .. } => Opcode::St,
            Insn::Jsr { .. } | Insn::Jsrr { .. } => Opcode::Jsr,
            Insn::And { .. } => Opcode::And,
            Insn::Ldr { .. } => Opcode::Ldr,
            Insn::Str { .. } => Opcode::Str,
            Insn::Rti => Opcode::Rti,
            Insn::Not { .. } => Opcode::Not,
            Insn::Ldi { .. } => Opcode::Ldi,
            Insn::Sti { .. } => Opcode::Sti,
            Insn::Jmp { .. } => Opcode::Jmp,
            Insn::Reserved => Opcode::Reserved,
            Insn::Lea { .. } => Opcode::Lea,
            Insn::Trap { .. } => Opcode::Trap,
        }
    }

    /// Returns true if this instruction can't run on this machine
    pub fn is_unsupported(&self) -> bool {
        match self {
            Insn::Rti | Insn::Reserved => true,
            Insn::Trap { vector } => Vector::try_from(*vector).is_err(),
            _ => false,
        }
    }

    /// Gets the mnemonic, including branch conditions and trap aliases
    pub fn mnemonic(&self) -> String {
        match self {
            Insn::Br { nzp: 0, .. } => "NOP".into(),
            Insn::Br { nzp, .. } => {
                let mut m = String::from("BR");
                for (bit, c) in [(0b100, 'n'), (0b010, 'z'), (0b001, 'p')] {
                    if nzp & bit != 0 {
                        m.push(c)
                    }
                }
                m
            }
            Insn::Add { .. } => "ADD".into(),
            Insn::Ld { .. } => "LD".into(),
            Insn::St { .. } => "ST".into(),
            Insn::Jsr { .. } => "JSR".into(),
            Insn::Jsrr { .. } => "JSRR".into(),
            Insn::And { .. } => "AND".into(),
            Insn::Ldr { .. } => "LDR".into(),
            Insn::Str { .. } => "STR".into(),
            Insn::Rti => "RTI".into(),
            Insn::Not { .. } => "NOT".into(),
            Insn::Ldi { .. } => "LDI".into(),
            Insn::Sti { .. } => "STI".into(),
            Insn::Jmp { base: 7 } => "RET".into(),
            Insn::Jmp { .. } => "JMP".into(),
            Insn::Reserved => "RSV".into(),
            Insn::Lea { .. } => "LEA".into(),
            Insn::Trap { vector } => match Vector::try_from(*vector) {
                Ok(v) => v.to_string(),
                Err(_) => "TRAP".into(),
            },
        }
    }

    /// Formats this instruction.
    ///
    /// With the instruction's address, pc-relative offsets are printed as
    /// absolute targets (`x3000`). Without it, they're printed as offsets (`#-2`).
    #[rustfmt::skip]
    pub fn listing(&self, addr: Option<Adr>) -> String {
        let rel = |offset: u16| match addr {
            Some(addr) => format!("x{:04x}", addr.wrapping_add(1).wrapping_add(offset)),
            None => format!("#{}", offset as i16),
        };
        let src = |src: &Src| match src {
            Src::Reg(r) => format!("R{r}"),
            Src::Imm(imm) => format!("#{}", *imm as i16),
        };
        let operands = match self {
            Insn::Br { nzp: 0, .. }            => String::new(),
            Insn::Br { offset, .. }            => rel(*offset),
            Insn::Add { dr, sr1, src: s }      => format!("R{dr}, R{sr1}, {}", src(s)),
            Insn::And { dr, sr1, src: s }      => format!("R{dr}, R{sr1}, {}", src(s)),
            Insn::Ld  { dr, offset }           => format!("R{dr}, {}", rel(*offset)),
            Insn::Ldi { dr, offset }           => format!("R{dr}, {}", rel(*offset)),
            Insn::Lea { dr, offset }           => format!("R{dr}, {}", rel(*offset)),
            Insn::St  { sr, offset }           => format!("R{sr}, {}", rel(*offset)),
            Insn::Sti { sr, offset }           => format!("R{sr}, {}", rel(*offset)),
            Insn::Jsr { offset }               => rel(*offset),
            Insn::Jsrr { base }                => format!("R{base}"),
            Insn::Ldr { dr, base, offset }     => format!("R{dr}, R{base}, #{}", *offset as i16),
            Insn::Str { sr, base, offset }     => format!("R{sr}, R{base}, #{}", *offset as i16),
            Insn::Not { dr, sr }               => format!("R{dr}, R{sr}"),
            Insn::Jmp { base: 7 }              => String::new(),
            Insn::Jmp { base }                 => format!("R{base}"),
            Insn::Trap { vector } if Vector::try_from(*vector).is_ok()
                                               => String::new(),
            Insn::Trap { vector }              => format!("x{vector:02x}"),
            Insn::Rti | Insn::Reserved         => String::new(),
        };
        format!("{:<6} {operands}", self.mnemonic()).trim_end().to_string()
    }
}

impl Display for Insn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.listing(None))
    }
}
