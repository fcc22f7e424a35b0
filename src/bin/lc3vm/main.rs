// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! lc3vm: An LC-3 virtual machine with a basic block cache
//! Hello, world!

mod ui;

use gumdrop::Options;
use lc3vm::{error::Result, *};
use owo_colors::OwoColorize;
use std::{path::PathBuf, process::ExitCode};
use ui::*;

pub fn main() -> ExitCode {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => return fail(e),
    };
    if options.help {
        println!("lc3vm [OPTIONS] FILE\n\n{}", Arguments::usage());
        return ExitCode::SUCCESS;
    }
    if let Err(e) = init_logger(options.verbose) {
        eprintln!("{}", e.bold().red());
    }
    match State::new(options).and_then(|mut state| state.run()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

/// Macro-cycles to run between checks for input
const SLICE: usize = 0x1000;

/// Reports an error, and turns it into the matching exit status
fn fail(e: Error) -> ExitCode {
    eprintln!("{}", e.bold().red());
    ExitCode::from(e.exit_code() as u8)
}

/// Parses the command line, turning gumdrop's complaints into [Error::InvalidArgument]
fn parse_args(args: impl Iterator<Item = String>) -> Result<Arguments> {
    let args: Vec<String> = args.collect();
    Arguments::parse_args_default(&args).map_err(|e| Error::InvalidArgument { arg: e.to_string() })
}

/// Parses a hexadecimal string into a u16
fn parse_hex(value: &str) -> std::result::Result<u16, std::num::ParseIntError> {
    u16::from_str_radix(value.trim_start_matches(['x', 'X']), 16)
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Options, Hash)]
struct Arguments {
    #[options(help = "Load an LC-3 object image to run.", required, free)]
    pub file: PathBuf,
    #[options(help = "Print this help message.")]
    help: bool,
    #[options(help = "Print each instruction as it executes.")]
    pub debug: bool,
    #[options(help = "Start in the single-step debugger.")]
    pub step: bool,
    #[options(
        long = "break",
        help = "Set breakpoints for the emulator to stop at.",
        parse(try_from_str = "parse_hex"),
        meta = "ADR"
    )]
    pub breakpoints: Vec<u16>,
    #[options(help = "Set the number of block cache slots.", default = "1024", meta = "N")]
    pub capacity: usize,
    #[options(
        short = "n",
        help = "When the cache is full, overwrite the newest block instead of the oldest."
    )]
    pub newest: bool,
    #[options(short = "D", help = "List the block cache on exit.")]
    pub dump_blocks: bool,
    #[options(count, help = "Log more (-v info, -vv debug, -vvv trace).")]
    pub verbose: u32,
}

#[derive(Debug)]
struct State {
    pub lc3: Lc3,
    pub input: Input,
    pub debugging: bool,
    pub dump_blocks: bool,
}

impl State {
    fn new(options: Arguments) -> Result<Self> {
        let eviction = match options.newest {
            true => Eviction::Newest,
            false => Eviction::Fifo,
        };
        let mut lc3 = Lc3::new(CPU::new(
            0x3000,
            BlockCache::with_capacity(options.capacity, eviction),
            Dis::default(),
            options.breakpoints,
            Flags {
                debug: options.debug,
                step: options.step,
                ..Default::default()
            },
        ));
        lc3.load_file(&options.file)?;
        Ok(State {
            lc3,
            input: Input::stdin(),
            debugging: options.step,
            dump_blocks: options.dump_blocks,
        })
    }

    /// Runs until the program halts or quit is requested
    fn run(&mut self) -> Result<Status> {
        let status = loop {
            // programs that poll the keyboard never stop on their own
            self.input.forward(&mut self.lc3);
            let status = match self.debugging {
                true => self.debug()?,
                false => {
                    self.lc3.cpu.multistep(&mut self.lc3.mem, SLICE);
                    self.lc3.cpu.status()
                }
            };
            drain_console(&mut self.lc3)?;
            match status {
                Status::Running => {}
                Status::Paused if self.debugging => {}
                Status::Paused => {
                    eprintln!("Breakpoint hit: {:04x}", self.lc3.cpu.pc());
                    self.debugging = true;
                    self.lc3.cpu.flags.step = true;
                }
                Status::KeyWait => {
                    if !self.input.wait(&mut self.lc3) {
                        self.lc3.cpu.quit();
                    }
                }
                Status::Halted | Status::Quit => break status,
            }
        };
        if self.dump_blocks {
            print_blocks(&self.lc3.cpu);
        }
        log::info!(
            "{} instructions, {} cache hits, {} misses",
            self.lc3.cpu.cycles(),
            self.lc3.cpu.cache().hits(),
            self.lc3.cpu.cache().misses()
        );
        Ok(status)
    }

    /// Runs one debugger command
    fn debug(&mut self) -> Result<Status> {
        let line = match self.input.line() {
            Some(line) => line,
            None => {
                self.lc3.cpu.quit();
                return Ok(self.lc3.cpu.status());
            }
        };
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e.bold().red());
                return Ok(self.lc3.cpu.status());
            }
        };
        let cpu = &mut self.lc3.cpu;
        match command {
            Command::Step(count) => {
                cpu.flags.pause = false;
                for _ in 0..count {
                    if cpu.cycle(&mut self.lc3.mem).is_none() {
                        break;
                    }
                }
                println!(
                    "{:04x}: {}",
                    cpu.pc(),
                    Dis::default().once(self.lc3.mem.peek(cpu.pc()), cpu.pc())
                );
            }
            Command::Continue => {
                cpu.flags.pause = false;
                cpu.flags.step = false;
                self.debugging = false;
            }
            Command::Registers => cpu.dump(),
            Command::Memory(addr) => {
                let start = addr as usize;
                print!("{}", self.lc3.mem.window(start..start + 0x40));
            }
            Command::Break(addr) => match cpu.breakpoints().contains(&addr) {
                true => {
                    cpu.unset_break(addr);
                    println!("Cleared breakpoint at {addr:04x}");
                }
                false => {
                    cpu.set_break(addr);
                    println!("Set breakpoint at {addr:04x}");
                }
            },
            Command::Blocks => print_blocks(cpu),
            Command::Flush => cpu.flush_cache(),
            Command::Debug => cpu.flags.debug(),
            Command::Help => println!("{}", Command::HELP),
            Command::Quit => cpu.quit(),
        }
        Ok(cpu.status())
    }
}
