// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE.txt for details)
#![allow(missing_docs)]
//! Terminal IO, logging, and the single-step debugger's commands

use lc3vm::{
    cpu::Adr,
    error::{Error, Result},
    Disassembler, Dis, Lc3, CPU,
};
use owo_colors::OwoColorize;
use std::{
    io::{Read, Write},
    str::FromStr,
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
};

/// Sets up the [log] backend on stderr. Warnings and errors are always shown.
pub fn init_logger(verbosity: u32) -> std::result::Result<(), log::SetLoggerError> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {}: {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}

/// Bytes from stdin, read on a helper thread so the emulator never blocks on them
#[derive(Debug)]
pub struct Input {
    rx: Receiver<u8>,
}

impl Input {
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for byte in std::io::stdin().lock().bytes() {
                match byte {
                    Ok(byte) if tx.send(byte).is_ok() => {}
                    _ => break,
                }
            }
        });
        Self::new(rx)
    }

    pub fn new(rx: Receiver<u8>) -> Self {
        Self { rx }
    }

    /// Presses every key that's arrived so far
    pub fn forward(&mut self, lc3: &mut Lc3) {
        while let Ok(key) = self.rx.try_recv() {
            lc3.press(key);
        }
    }

    /// Blocks until a key arrives, and presses it.
    ///
    /// Returns false if input has closed.
    pub fn wait(&mut self, lc3: &mut Lc3) -> bool {
        match self.rx.recv() {
            Ok(key) => {
                lc3.press(key);
                true
            }
            Err(_) => false,
        }
    }

    /// Reads a line for the debugger. Returns [None] if input has closed.
    pub fn line(&mut self) -> Option<String> {
        eprint!("{}", "(lc3vm) ".bright_black());
        let mut line = vec![];
        loop {
            match self.rx.recv() {
                Ok(b'\n') => break,
                Ok(byte) => line.push(byte),
                Err(_) if line.is_empty() => return None,
                Err(_) => break,
            }
        }
        Some(String::from_utf8_lossy(&line).trim().to_owned())
    }

    /// Returns true if input has closed and nothing is left to read
    #[allow(dead_code)]
    pub fn is_closed(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}

/// Writes everything the program has printed to stdout
pub fn drain_console(lc3: &mut Lc3) -> Result<()> {
    let output = lc3.cpu.console_mut().take();
    if !output.is_empty() {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&output)?;
        stdout.flush()?;
    }
    Ok(())
}

/// Lists every cached block, with disassembly
pub fn print_blocks(cpu: &CPU) {
    let dis = Dis::default();
    let cache = cpu.cache();
    println!(
        "{} of {} slots ({:?}), {} hits, {} misses",
        cache.len(),
        cache.capacity(),
        cache.eviction(),
        cache.hits(),
        cache.misses()
    );
    for (slot, block) in cache.iter().enumerate() {
        println!("{}", format_args!("block {slot}: {block}").bold());
        for (addr, word) in block.iter() {
            println!("  {addr:04x}: {} {}", word.bright_black(), dis.once(word, addr));
        }
    }
}

/// A single-step debugger command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run this many instructions
    Step(usize),
    /// Leave the debugger, and run freely
    Continue,
    /// Dump the registers
    Registers,
    /// Dump memory, starting at an address
    Memory(Adr),
    /// Toggle a breakpoint
    Break(Adr),
    /// List the block cache
    Blocks,
    /// Empty the block cache
    Flush,
    /// Toggle live disassembly
    Debug,
    Help,
    Quit,
}

impl Command {
    pub const HELP: &'static str = "\
s [N]   step N instructions (default 1; an empty line steps once)
c       continue
r       dump registers
m ADR   dump memory at ADR
b ADR   toggle a breakpoint at ADR
p       print the block cache
f       flush the block cache
d       toggle live disassembly
h       show this help
q       quit";
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let invalid = || Error::InvalidArgument {
            arg: line.to_owned(),
        };
        let hex = |arg: Option<&str>| {
            arg.and_then(|arg| Adr::from_str_radix(arg.trim_start_matches(['x', 'X']), 16).ok())
                .ok_or_else(invalid)
        };
        let mut words = line.split_whitespace();
        let command = match words.next() {
            None => Command::Step(1),
            Some("s" | "step") => match words.next() {
                Some(count) => Command::Step(count.parse().map_err(|_| invalid())?),
                None => Command::Step(1),
            },
            Some("c" | "continue") => Command::Continue,
            Some("r" | "regs") => Command::Registers,
            Some("m" | "mem") => Command::Memory(hex(words.next())?),
            Some("b" | "break") => Command::Break(hex(words.next())?),
            Some("p" | "blocks") => Command::Blocks,
            Some("f" | "flush") => Command::Flush,
            Some("d" | "debug") => Command::Debug,
            Some("h" | "help" | "?") => Command::Help,
            Some("q" | "quit") => Command::Quit,
            Some(_) => return Err(invalid()),
        };
        match words.next() {
            Some(_) => Err(invalid()),
            None => Ok(command),
        }
    }
}
