// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! The LC-3 register file: R0-R7, the program counter, and the condition codes

use super::{Adr, Reg};
use std::{
    fmt::{Display, Formatter},
    ops::{Index, IndexMut},
};

/// The condition codes. Exactly one is set at any time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Condition {
    /// The last value written was negative
    Negative = 0b100,
    /// The last value written was zero
    #[default]
    Zero = 0b010,
    /// The last value written was positive
    Positive = 0b001,
}

impl Condition {
    /// Classifies a value by its sign
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::cpu::registers::Condition;
    /// assert_eq!(Condition::Zero, Condition::of(0));
    /// assert_eq!(Condition::Positive, Condition::of(0x7fff));
    /// assert_eq!(Condition::Negative, Condition::of(0x8000));
    /// ```
    pub fn of(value: u16) -> Self {
        if value & 0x8000 != 0 {
            Condition::Negative
        } else if value == 0 {
            Condition::Zero
        } else {
            Condition::Positive
        }
    }

    /// Gets the `nzp` bit for this condition
    pub fn bits(self) -> u16 {
        self as u16
    }

    /// Returns true if any of the `nzp` bits in `mask` matches this condition
    pub fn matches(self, mask: u16) -> bool {
        self.bits() & mask != 0
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Condition::Negative => "N",
                Condition::Zero => "Z",
                Condition::Positive => "P",
            }
        )
    }
}

/// The register file
///
/// General purpose registers are indexed by number. The decoder only ever
/// produces 3-bit register numbers, so indexing past R7 is a bug, and panics.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Registers {
    gpr: [u16; 8],
    /// The program counter
    pub pc: Adr,
    /// The condition codes
    pub cond: Condition,
}

impl Registers {
    /// Constructs a register file with the program counter at `pc`
    pub fn new(pc: Adr) -> Self {
        Registers {
            pc,
            ..Default::default()
        }
    }

    /// Writes a general purpose register, and updates the condition codes
    /// to match the value written
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::cpu::registers::*;
    /// let mut reg = Registers::default();
    /// reg.set(3, 0xfffe);
    /// assert_eq!(0xfffe, reg[3]);
    /// assert_eq!(Condition::Negative, reg.cond);
    /// ```
    #[inline(always)]
    pub fn set(&mut self, r: Reg, value: u16) {
        self.gpr[r] = value;
        self.cond = Condition::of(value);
    }

    /// Gets a slice of the general purpose registers
    pub fn gpr(&self) -> &[u16] {
        &self.gpr
    }
}

impl Default for Registers {
    /// R0-R7 cleared, pc at `0x3000`, condition codes at Z
    fn default() -> Self {
        Registers {
            gpr: [0; 8],
            pc: 0x3000,
            cond: Condition::Zero,
        }
    }
}

impl Index<Reg> for Registers {
    type Output = u16;
    #[inline(always)]
    fn index(&self, r: Reg) -> &Self::Output {
        &self.gpr[r]
    }
}

/// Writes through `IndexMut` don't touch the condition codes.
impl IndexMut<Reg> for Registers {
    #[inline(always)]
    fn index_mut(&mut self, r: Reg) -> &mut Self::Output {
        &mut self.gpr[r]
    }
}

impl Display for Registers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PC: {:04x}, CC: {}", self.pc, self.cond)?;
        for (i, gpr) in self.gpr.iter().enumerate() {
            write!(
                f,
                "{}R{i}: {gpr:04x}",
                match i % 4 {
                    0 => "\n",
                    _ => " ",
                }
            )?;
        }
        Ok(())
    }
}
