// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Decodes and runs instructions, one basic block at a time

#[cfg(test)]
mod tests;

pub mod behavior;
pub mod cache;
pub mod flags;
pub mod instruction;
pub mod mem;
pub mod registers;
pub mod trap;

use self::{
    cache::{BlockCache, CodeLocation},
    flags::Flags,
    instruction::{
        disassembler::{Dis, Disassembler},
        Insn,
    },
    mem::Memory,
    registers::{Condition, Registers},
};
use crate::io::Console;
use owo_colors::OwoColorize;
use std::fmt::Debug;

/// A general purpose register number, `0..8`
pub type Reg = usize;
/// A word address
pub type Adr = u16;

/// What a single [CPU::cycle] did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Yield {
    /// Where in the cache the cycle entered
    pub location: CodeLocation,
    /// The number of instructions dispatched
    pub executed: usize,
    /// Whether the cycle ran to the end of the block
    pub complete: bool,
}

/// Why the execution loop is (or isn't) running
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Ready to execute
    Running,
    /// Paused by the user, or by a breakpoint
    Paused,
    /// Waiting for a key, in `GETC` or `IN`
    KeyWait,
    /// The program executed `HALT`
    Halted,
    /// A shutdown was requested
    Quit,
}

/// Represents the internal state of the CPU interpreter
#[derive(Clone, PartialEq)]
pub struct CPU {
    /// Flags that control the execution loop, but which aren't inherent to the
    /// LC-3. Includes the single-step gate, pause, and debug output.
    pub flags: Flags,
    // registers
    reg: Registers,
    // predecoded code
    cache: BlockCache,
    // I/O
    console: Console,
    prompted: bool,
    // Execution data
    running: bool,
    cycle: usize,
    breakpoints: Vec<Adr>,
    resume: Option<Adr>,
    disassembler: Dis,
}

impl CPU {
    /// Constructs a new CPU, taking all configurable parameters
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let cpu = CPU::new(
    ///     0x3000, // start of program
    ///     BlockCache::with_capacity(64, Eviction::Fifo),
    ///     Dis::default(),
    ///     vec![], // Breakpoints
    ///     Flags::default()
    /// );
    /// dbg!(cpu);
    /// ```
    pub fn new(
        pc: Adr,
        cache: BlockCache,
        disassembler: Dis,
        breakpoints: Vec<Adr>,
        flags: Flags,
    ) -> Self {
        CPU {
            reg: Registers::new(pc),
            cache,
            disassembler,
            breakpoints,
            flags,
            ..Default::default()
        }
    }

    /// Gets the register file
    pub fn registers(&self) -> &Registers {
        &self.reg
    }

    /// Gets a general purpose register
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let mut cpu = CPU::default();
    /// cpu.set_reg(4, 0x41);
    /// assert_eq!(0x41, cpu.reg(4));
    /// ```
    pub fn reg(&self, r: Reg) -> u16 {
        self.reg[r]
    }

    /// Sets a general purpose register, without touching the condition codes
    pub fn set_reg(&mut self, r: Reg, value: u16) {
        self.reg[r] = value;
    }

    /// Gets the program counter
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let cpu = CPU::default();
    /// assert_eq!(0x3000, cpu.pc());
    /// ```
    pub fn pc(&self) -> Adr {
        self.reg.pc
    }

    /// Sets the program counter. Used by loaders and debuggers.
    pub fn set_pc(&mut self, pc: Adr) {
        self.reg.pc = pc;
    }

    /// Gets the condition codes
    /// # Examples
    /// ```rust
    /// # use lc3vm::{*, cpu::registers::Condition};
    /// let cpu = CPU::default();
    /// assert_eq!(Condition::Zero, cpu.cond());
    /// ```
    pub fn cond(&self) -> Condition {
        self.reg.cond
    }

    /// Gets the block cache, for inspection
    pub fn cache(&self) -> &BlockCache {
        &self.cache
    }

    /// Drops all predecoded code. Call this after overwriting code in memory.
    pub fn flush_cache(&mut self) {
        self.cache.clear();
    }

    /// Gets the console that trap routines write to
    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Gets the console, for draining output
    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    /// Gets the number of instructions the CPU has executed
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let cpu = CPU::default();
    /// assert_eq!(0x0, cpu.cycles());
    /// ```
    pub fn cycles(&self) -> usize {
        self.cycle
    }

    /// Returns true until the program halts
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Gets the state of the execution loop
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let mut cpu = CPU::default();
    /// assert_eq!(Status::Running, cpu.status());
    /// cpu.flags.pause();
    /// assert_eq!(Status::Paused, cpu.status());
    /// ```
    pub fn status(&self) -> Status {
        if self.flags.quit {
            Status::Quit
        } else if !self.running {
            Status::Halted
        } else if self.flags.keypause {
            Status::KeyWait
        } else if self.flags.pause {
            Status::Paused
        } else {
            Status::Running
        }
    }

    /// Asks the execution loop to stop before its next cycle
    pub fn quit(&mut self) {
        self.flags.quit = true;
    }

    /// Resets the CPU.
    ///
    /// Touches the registers, the cache, the console, the running state,
    /// the cycle count, and the pause and keypause [Flags].
    ///
    /// Does not touch breakpoints, [Dis], or memory.
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let mut cpu = CPU::default();
    /// cpu.set_pc(0x4000);
    /// cpu.flags.keypause = true;
    /// cpu.reset();
    /// assert_eq!(0x3000, cpu.pc());
    /// assert_eq!(false, cpu.flags.keypause);
    /// ```
    pub fn reset(&mut self) {
        self.reg = Registers::default();
        self.cache.clear();
        self.console.clear();
        self.prompted = false;
        self.running = true;
        self.cycle = 0;
        self.resume = None;
        self.flags = Flags {
            pause: false,
            keypause: false,
            quit: false,
            ..self.flags
        };
    }

    /// Set a breakpoint
    pub fn set_break(&mut self, point: Adr) -> &mut Self {
        if !self.breakpoints.contains(&point) {
            self.breakpoints.push(point)
        }
        self
    }

    /// Unset a breakpoint
    pub fn unset_break(&mut self, point: Adr) -> &mut Self {
        self.breakpoints.retain(|&b| b != point);
        self
    }

    /// Gets a slice of breakpoints
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let cpu = CPU::default();
    /// assert_eq!(cpu.breakpoints(), &[]);
    /// ```
    pub fn breakpoints(&self) -> &[Adr] {
        self.breakpoints.as_slice()
    }

    /// Runs exactly one instruction, even if cpu.flags.pause is set.
    ///
    /// Leaves the CPU paused afterward.
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let mut cpu = CPU::default();
    /// let mut mem = Memory::new();
    /// // ADD R0, R0, #1; ADD R0, R0, #1; BRnzp #-3
    /// mem.load(0x3000, &[0x1021, 0x1021, 0x0ffd]);
    /// cpu.singlestep(&mut mem);
    /// assert_eq!(0x3001, cpu.pc());
    /// assert_eq!(1, cpu.reg(0));
    /// assert_eq!(1, cpu.cycles());
    /// ```
    pub fn singlestep(&mut self, mem: &mut Memory) -> Option<Yield> {
        self.resume = Some(self.reg.pc);
        let step = self.flags.step;
        self.flags.step = true;
        self.flags.pause = false;
        let done = self.cycle(mem);
        self.flags.step = step;
        self.flags.pause = true;
        done
    }

    /// Runs `cycles` macro-cycles, stopping early if the CPU halts, pauses,
    /// or has to wait for a key.
    ///
    /// Returns the number of instructions executed.
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let mut cpu = CPU::default();
    /// let mut mem = Memory::new();
    /// // ADD R0, R0, #1; ADD R0, R0, #1; BRnzp #-3
    /// mem.load(0x3000, &[0x1021, 0x1021, 0x0ffd]);
    /// assert_eq!(0x30, cpu.multistep(&mut mem, 0x10));
    /// assert_eq!(0x3000, cpu.pc());
    /// assert_eq!(0x20, cpu.reg(0));
    /// ```
    pub fn multistep(&mut self, mem: &mut Memory, cycles: usize) -> usize {
        let mut executed = 0;
        for _ in 0..cycles {
            match self.cycle(mem) {
                Some(done) => executed += done.executed,
                None => break,
            }
        }
        executed
    }

    /// Runs until the program halts, the CPU pauses or waits for a key, or
    /// quit is requested. With the step gate engaged, runs a single cycle.
    ///
    /// Returns the resulting [Status].
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let mut cpu = CPU::default();
    /// let mut mem = Memory::new();
    /// // ADD R0, R0, #1; HALT
    /// mem.load(0x3000, &[0x1021, 0xf025]);
    /// assert_eq!(Status::Halted, cpu.run(&mut mem));
    /// assert_eq!(1, cpu.reg(0));
    /// ```
    pub fn run(&mut self, mem: &mut Memory) -> Status {
        while self.cycle(mem).is_some() && !self.flags.step {}
        self.status()
    }

    /// Runs one macro-cycle: finds (or builds) the block holding pc, and runs
    /// it from there to its end.
    ///
    /// Stops early after one instruction if the step gate is engaged, or
    /// when the program halts, hits a breakpoint, or waits for a key.
    /// A breakpoint at pc pauses before anything runs, unless the CPU is
    /// resuming from that same breakpoint.
    ///
    /// Returns [None] if the CPU isn't [Status::Running], or if it just
    /// paused at a breakpoint.
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let mut cpu = CPU::default();
    /// let mut mem = Memory::new();
    /// // ADD R0, R0, #1; ADD R0, R0, #1; BRnzp #-2
    /// mem.load(0x3000, &[0x1021, 0x1021, 0x0ffe]);
    /// let first = cpu.cycle(&mut mem).unwrap();
    /// assert_eq!((0, 3, true), (first.location.offset, first.executed, first.complete));
    /// // The branch lands mid-block, and the block is re-entered there
    /// let second = cpu.cycle(&mut mem).unwrap();
    /// assert_eq!((1, 2), (second.location.offset, second.executed));
    /// assert_eq!(1, cpu.cache().len());
    /// ```
    pub fn cycle(&mut self, mem: &mut Memory) -> Option<Yield> {
        if self.flags.keypause && mem.keyboard().available() {
            self.flags.keypause = false;
        }
        if !self.running || self.flags.is_paused() {
            return None;
        }
        if self.at_breakpoint() {
            return None;
        }
        let pc = self.reg.pc;
        let location = match self.cache.find(pc) {
            Some(location) => location,
            None => {
                let block = self.cache.build(mem, pc);
                CodeLocation {
                    slot: self.cache.insert(block),
                    offset: 0,
                }
            }
        };
        let executed = self.run_block(mem, location);
        let complete = self
            .cache
            .get(location.slot)
            .map_or(false, |block| location.offset + executed == block.len());
        Some(Yield {
            location,
            executed,
            complete,
        })
    }

    /// Runs the block at `location`, from its offset to the end
    fn run_block(&mut self, mem: &mut Memory, mut at: CodeLocation) -> usize {
        let mut executed = 0;
        while let Some(word) = self.cache.word(at) {
            self.dispatch(mem, word);
            executed += 1;
            at.offset += 1;
            if self.flags.step || self.interrupted() {
                break;
            }
        }
        executed
    }

    /// Increments pc, then executes `word`
    #[inline(always)]
    fn dispatch(&mut self, mem: &mut Memory, word: u16) {
        self.cycle += 1;
        // Print opcode disassembly:
        if self.flags.debug {
            std::println!(
                "{:3} {:04x}: {:<36}",
                self.cycle.bright_black(),
                self.reg.pc,
                self.disassembler.once(word, self.reg.pc)
            );
        }
        self.reg.pc = self.reg.pc.wrapping_add(1);
        self.execute(mem, Insn::from(word));
        // a trap waiting for a key will run again, so it hasn't retired
        if self.flags.keypause {
            self.cycle -= 1;
        }
    }

    /// Returns true if block execution must stop before the next instruction
    fn interrupted(&mut self) -> bool {
        if self.flags.keypause {
            // the retried trap shouldn't trip a breakpoint twice
            self.resume = Some(self.reg.pc);
            return true;
        }
        !self.running || self.flags.quit || self.at_breakpoint()
    }

    /// Pauses if pc is a breakpoint, unless the CPU is resuming from it
    fn at_breakpoint(&mut self) -> bool {
        let pc = self.reg.pc;
        if self.resume.take() == Some(pc) || !self.breakpoints.contains(&pc) {
            return false;
        }
        log::info!("breakpoint hit at {pc:04x}");
        self.flags.pause = true;
        self.resume = Some(pc);
        true
    }

    /// Dumps the current state of all CPU registers, and the cycle count
    /// # Examples
    /// ```rust
    /// # use lc3vm::*;
    /// let cpu = CPU::default();
    /// cpu.dump();
    /// ```
    /// outputs
    /// ```text
    /// PC: 3000, CC: Z
    /// R0: 0000 R1: 0000 R2: 0000 R3: 0000
    /// R4: 0000 R5: 0000 R6: 0000 R7: 0000
    /// CYC:      0
    /// ```
    pub fn dump(&self) {
        std::println!("{}\nCYC: {:6}", self.reg, self.cycle);
    }
}

impl Debug for CPU {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CPU")
            .field("flags", &self.flags)
            .field("reg", &self.reg)
            .field("running", &self.running)
            .field("cycle", &self.cycle)
            .field("cached_blocks", &self.cache.len())
            .field("breakpoints", &self.breakpoints)
            .field("disassembler", &self.disassembler)
            .finish_non_exhaustive()
    }
}

impl Default for CPU {
    /// Constructs a new CPU with sane defaults
    ///
    /// | value    | default | description
    /// |----------|---------|------------
    /// | pc       |`0x3000` | Start location of user programs
    /// | cache    | 1024    | Cache slots, with FIFO eviction
    ///
    /// # Examples
    /// ```rust
    /// use lc3vm::*;
    /// let mut cpu = CPU::default();
    /// ```
    fn default() -> Self {
        CPU {
            flags: Flags::default(),
            reg: Registers::default(),
            cache: BlockCache::default(),
            console: Console::default(),
            prompted: false,
            running: true,
            cycle: 0,
            breakpoints: vec![],
            resume: None,
            disassembler: Dis::default(),
        }
    }
}
