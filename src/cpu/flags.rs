//! Represents flags that control the execution loop, but aren't a part of the LC-3 itself

/// Represents flags that aid in operation, but aren't inherent to the CPU
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Flags {
    /// Set when debug (live disassembly) mode enabled
    pub debug: bool,
    /// Set when the emulator is paused by the user, or by a breakpoint
    pub pause: bool,
    /// The single-step gate. While set, each cycle runs at most one instruction.
    pub step: bool,
    /// Set while a console read trap is waiting for a key
    pub keypause: bool,
    /// Set when the front-end has asked the emulator to shut down
    pub quit: bool,
}

impl Flags {
    /// Toggles debug mode
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let mut cpu = CPU::default();
    /// assert_eq!(false, cpu.flags.debug);
    /// // Toggle debug mode
    /// cpu.flags.debug();
    /// assert_eq!(true, cpu.flags.debug);
    /// ```
    pub fn debug(&mut self) {
        self.debug = !self.debug
    }

    /// Toggles pause
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let mut cpu = CPU::default();
    /// assert_eq!(false, cpu.flags.pause);
    /// // Pause the cpu
    /// cpu.flags.pause();
    /// assert_eq!(true, cpu.flags.pause);
    /// ```
    pub fn pause(&mut self) {
        self.pause = !self.pause
    }

    /// Toggles the single-step gate
    pub fn step(&mut self) {
        self.step = !self.step
    }

    /// Returns true if the execution loop shouldn't dispatch anything
    pub fn is_paused(&self) -> bool {
        self.pause || self.keypause || self.quit
    }
}
