// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Unit tests for [super::CPU]
//!
//! These run instructions, and ensure their output is consistent with previous builds
//!
//! General test format:
//! 1. Prepare to do the thing
//! 2. Do the thing
//! 3. Compare the result to the expected result

use super::*;
use crate::cpu::{instruction::Src, mem::KBSR};
use rand::random;


/// ADD R0, R0, #1
const INC: u16 = 0x1021;
/// BRnzp #-2
const BACK2: u16 = 0x0ffe;
/// TRAP x25
const HALT: u16 = 0xf025;

fn setup_environment() -> (CPU, Memory) {
    let cpu = CPU {
        flags: Flags {
            debug: true,
            pause: false,
            ..Default::default()
        },
        ..CPU::default()
    };
    (cpu, Memory::new())
}

fn setup_program(words: &[u16]) -> (CPU, Memory) {
    let (cpu, mut mem) = setup_environment();
    mem.load(0x3000, words);
    (cpu, mem)
}

/// Tests the condition codes
mod cond {
    use super::*;

    #[test]
    fn exactly_one_matches_sign() {
        let (mut cpu, _) = setup_environment();
        for _ in 0..0x1000 {
            let value = random::<u16>();
            cpu.reg.set(0, value);
            let bits = cpu.cond().bits();
            assert_eq!(1, bits.count_ones());
            let expected = match value {
                0 => 0b010,
                v if v & 0x8000 != 0 => 0b100,
                _ => 0b001,
            };
            assert_eq!(expected, bits);
        }
    }

    #[test]
    fn starts_zero() {
        let (cpu, _) = setup_environment();
        assert_eq!(Condition::Zero, cpu.cond());
    }

    #[test]
    fn stores_leave_codes_alone() {
        let (mut cpu, mut mem) = setup_environment();
        cpu.reg.set(1, 0x8000);
        cpu.store(&mut mem, 1, 4);
        cpu.store_register(&mut mem, 1, 1, 0);
        assert_eq!(Condition::Negative, cpu.cond());
    }
}

/// Tests arithmetic and logic
mod alu {
    use super::*;

    /// 1...: ADD with a register and with an immediate agree
    #[test]
    fn add_modes_agree() {
        let (mut cpu, _) = setup_environment();
        for _ in 0..0x1000 {
            let (a, imm) = (random::<u16>(), random::<u16>() & 0x1f);
            let imm = instruction::sign_extend(imm, 5);
            cpu.reg.set(1, a);
            cpu.reg.set(2, imm);
            cpu.add(3, 1, Src::Reg(2));
            cpu.add(4, 1, Src::Imm(imm));
            assert_eq!(a.wrapping_add(imm), cpu.reg[3]);
            assert_eq!(cpu.reg[3], cpu.reg[4]);
        }
    }

    /// 1...: ADD wraps on overflow
    #[test]
    fn add_wraps() {
        let (mut cpu, _) = setup_environment();
        cpu.reg.set(1, 0x7fff);
        cpu.add(0, 1, Src::Imm(1));
        assert_eq!(0x8000, cpu.reg[0]);
        assert_eq!(Condition::Negative, cpu.cond());
        cpu.reg.set(1, 0xffff);
        cpu.add(0, 1, Src::Imm(1));
        assert_eq!(0, cpu.reg[0]);
        assert_eq!(Condition::Zero, cpu.cond());
    }

    /// 5...: AND with a register and with an immediate agree
    #[test]
    fn and_modes_agree() {
        let (mut cpu, _) = setup_environment();
        for _ in 0..0x1000 {
            let (a, imm) = (random::<u16>(), random::<u16>() & 0x1f);
            let imm = instruction::sign_extend(imm, 5);
            cpu.reg.set(1, a);
            cpu.reg.set(2, imm);
            cpu.and(3, 1, Src::Reg(2));
            cpu.and(4, 1, Src::Imm(imm));
            assert_eq!(a & imm, cpu.reg[3]);
            assert_eq!(cpu.reg[3], cpu.reg[4]);
        }
    }

    /// 9...: NOT
    #[test]
    fn not() {
        let (mut cpu, _) = setup_environment();
        for _ in 0..0x1000 {
            let a = random::<u16>();
            cpu.reg.set(5, a);
            cpu.not(6, 5);
            assert_eq!(!a, cpu.reg[6]);
            assert_eq!(Condition::of(!a), cpu.cond());
        }
    }
}

/// Tests loads and stores
mod ldst {
    use super::*;

    /// 2...: LD reads relative to pc
    #[test]
    fn load() {
        let (mut cpu, mut mem) = setup_environment();
        cpu.reg.pc = 0x3001;
        mem.write(0x2fff, 0xbeef);
        cpu.load(&mut mem, 2, instruction::sign_extend(0x1fe, 9));
        assert_eq!(0xbeef, cpu.reg[2]);
        assert_eq!(Condition::Negative, cpu.cond());
    }

    /// 3...: ST writes relative to pc
    #[test]
    fn store() {
        let (mut cpu, mut mem) = setup_environment();
        cpu.reg.pc = 0x3001;
        cpu.reg[4] = 0x1234;
        cpu.store(&mut mem, 4, 0x10);
        assert_eq!(0x1234, mem.peek(0x3011));
    }

    /// 6...: LDR reads relative to a base register
    #[test]
    fn load_register() {
        let (mut cpu, mut mem) = setup_environment();
        cpu.reg[1] = 0x4000;
        mem.write(0x3ffe, 7);
        cpu.load_register(&mut mem, 0, 1, instruction::sign_extend(0x3e, 6));
        assert_eq!(7, cpu.reg[0]);
        assert_eq!(Condition::Positive, cpu.cond());
    }

    /// 7...: STR writes relative to a base register, wrapping
    #[test]
    fn store_register() {
        let (mut cpu, mut mem) = setup_environment();
        cpu.reg[1] = 0xffff;
        cpu.reg[2] = 0x5a5a;
        cpu.store_register(&mut mem, 2, 1, 2);
        assert_eq!(0x5a5a, mem.peek(0x0001));
    }

    /// a...: LDI follows a pointer
    #[test]
    fn load_indirect() {
        let (mut cpu, mut mem) = setup_environment();
        cpu.reg.pc = 0x3001;
        mem.write(0x3003, 0x4000);
        mem.write(0x4000, 0);
        cpu.reg.set(3, 1);
        cpu.load_indirect(&mut mem, 3, 2);
        assert_eq!(0, cpu.reg[3]);
        assert_eq!(Condition::Zero, cpu.cond());
    }

    /// b...: STI follows a pointer
    #[test]
    fn store_indirect() {
        let (mut cpu, mut mem) = setup_environment();
        cpu.reg.pc = 0x3001;
        mem.write(0x3003, 0x4000);
        cpu.reg[3] = 0xcafe;
        cpu.store_indirect(&mut mem, 3, 2);
        assert_eq!(0xcafe, mem.peek(0x4000));
    }

    /// e...: LEA computes an address, and sets the condition codes
    #[test]
    fn load_effective_address() {
        let (mut cpu, _) = setup_environment();
        cpu.reg.pc = 0x3001;
        cpu.load_effective_address(0, instruction::sign_extend(0x1ff, 9));
        assert_eq!(0x3000, cpu.reg[0]);
        assert_eq!(Condition::Positive, cpu.cond());
    }

    /// LDI through the keyboard status register latches the key
    #[test]
    fn load_indirect_polls_keyboard() {
        let (mut cpu, mut mem) = setup_environment();
        cpu.reg.pc = 0x3001;
        mem.write(0x3001, KBSR);
        mem.keyboard_mut().press(b'q');
        cpu.load_indirect(&mut mem, 1, 0);
        assert_eq!(0x8000, cpu.reg[1]);
        assert_eq!(b'q' as u16, mem.read(mem::KBDR));
    }
}

/// Tests control-flow instructions
///
/// Basically anything that touches the program counter
mod cf {
    use super::*;

    /// 0...: BR jumps only when a requested condition matches
    #[test]
    fn branch() {
        let (mut cpu, _) = setup_environment();
        for (cond, value) in [(0b100, 0x8000), (0b010, 0), (0b001, 1)] {
            for nzp in 0..=0b111 {
                cpu.reg.set(0, value);
                cpu.reg.pc = 0x3001;
                cpu.branch(nzp, 0x10);
                let taken = nzp & cond != 0;
                assert_eq!(if taken { 0x3011 } else { 0x3001 }, cpu.reg.pc);
            }
        }
    }

    /// 4...: JSR links, then jumps relative to pc
    #[test]
    fn jump_subroutine() {
        let (mut cpu, _) = setup_environment();
        cpu.reg.pc = 0x3001;
        cpu.jump_subroutine(instruction::sign_extend(0x7ff, 11));
        assert_eq!(0x3001, cpu.reg[7]);
        assert_eq!(0x3000, cpu.reg.pc);
    }

    /// 40..: JSRR links, then jumps to a register
    #[test]
    fn jump_subroutine_register() {
        let (mut cpu, _) = setup_environment();
        let target = random::<u16>();
        cpu.reg.pc = 0x3001;
        cpu.reg[2] = target;
        cpu.jump_subroutine_register(2);
        assert_eq!(0x3001, cpu.reg[7]);
        assert_eq!(target, cpu.reg.pc);
    }

    /// 41c0: JSRR R7 jumps to the old R7
    #[test]
    fn jump_subroutine_r7() {
        let (mut cpu, _) = setup_environment();
        cpu.reg.pc = 0x3001;
        cpu.reg[7] = 0x4000;
        cpu.jump_subroutine_register(7);
        assert_eq!(0x3001, cpu.reg[7]);
        assert_eq!(0x4000, cpu.reg.pc);
    }

    /// c...: JMP and RET
    #[test]
    fn jump() {
        let (mut cpu, _) = setup_environment();
        for r in 0..8 {
            let target = random::<u16>();
            cpu.reg[r] = target;
            cpu.jump(r);
            assert_eq!(target, cpu.reg.pc);
        }
    }

    /// Branches leave the condition codes alone
    #[test]
    fn control_flow_keeps_codes() {
        let (mut cpu, _) = setup_environment();
        cpu.reg.set(0, 0xffff);
        cpu.jump_subroutine(4);
        cpu.jump(0);
        cpu.branch(0b111, 1);
        assert_eq!(Condition::Negative, cpu.cond());
    }
}

/// Tests the trap routines
mod trap {
    use super::*;

    fn trap(cpu: &mut CPU, mem: &mut Memory, vector: u8) {
        cpu.reg.pc = 0x3001;
        cpu.trap(mem, vector);
    }

    #[test]
    fn links_r7() {
        let (mut cpu, mut mem) = setup_environment();
        cpu.reg[0] = b'x' as u16;
        trap(&mut cpu, &mut mem, 0x21);
        assert_eq!(0x3001, cpu.reg[7]);
    }

    #[test]
    fn getc_reads_key() {
        let (mut cpu, mut mem) = setup_environment();
        mem.keyboard_mut().press(b'A');
        cpu.reg.set(0, 0xff00);
        trap(&mut cpu, &mut mem, 0x20);
        assert_eq!(b'A' as u16, cpu.reg[0]);
        assert_eq!(Condition::Positive, cpu.cond());
        assert_eq!(0x3001, cpu.reg.pc);
        assert!(cpu.console().is_empty());
    }

    #[test]
    fn getc_waits_for_key() {
        let (mut cpu, mut mem) = setup_environment();
        trap(&mut cpu, &mut mem, 0x20);
        assert!(cpu.flags.keypause);
        assert_eq!(0x3000, cpu.reg.pc);
        assert_eq!(Status::KeyWait, cpu.status());
    }

    #[test]
    fn out_writes_low_byte() {
        let (mut cpu, mut mem) = setup_environment();
        cpu.reg[0] = 0x4142;
        trap(&mut cpu, &mut mem, 0x21);
        assert_eq!(b"B", cpu.console().as_bytes());
    }

    #[test]
    fn puts_stops_at_zero() {
        let (mut cpu, mut mem) = setup_environment();
        mem.load(0x4000, &[0x0048, 0x0069, 0x0000, 0x0021]);
        cpu.reg[0] = 0x4000;
        trap(&mut cpu, &mut mem, 0x22);
        assert_eq!(b"Hi", cpu.console().as_bytes());
    }

    #[test]
    fn puts_stops_at_zero_low_byte() {
        let (mut cpu, mut mem) = setup_environment();
        mem.load(0x4000, &[0x0048, 0x0100, 0x0069, 0x0000]);
        cpu.reg[0] = 0x4000;
        trap(&mut cpu, &mut mem, 0x22);
        assert_eq!(b"H", cpu.console().as_bytes());
    }

    #[test]
    fn puts_leaves_keys_pending() {
        let (mut cpu, mut mem) = setup_environment();
        mem.write(0xfdff, 0x0041);
        mem.keyboard_mut().press(b'k');
        cpu.reg[0] = 0xfdff;
        trap(&mut cpu, &mut mem, 0x22);
        // KBSR reads as 0x8000, whose low byte ends the string
        assert_eq!(b"A", cpu.console().as_bytes());
        assert!(mem.keyboard().available());
    }

    #[test]
    fn in_prompts_and_echoes() {
        let (mut cpu, mut mem) = setup_environment();
        mem.keyboard_mut().press(b'y');
        trap(&mut cpu, &mut mem, 0x23);
        assert_eq!(b"> y", cpu.console().as_bytes());
        assert_eq!(b'y' as u16, cpu.reg[0]);
    }

    #[test]
    fn in_prompts_once_while_waiting() {
        let (mut cpu, mut mem) = setup_environment();
        trap(&mut cpu, &mut mem, 0x23);
        trap(&mut cpu, &mut mem, 0x23);
        mem.keyboard_mut().press(b'n');
        trap(&mut cpu, &mut mem, 0x23);
        assert_eq!(b"> n", cpu.console().as_bytes());
    }

    #[test]
    fn putsp_packs_two_per_word() {
        let (mut cpu, mut mem) = setup_environment();
        // "Hello" packed low byte first, odd length
        mem.load(0x4000, &[0x6548, 0x6c6c, 0x006f, 0x0000]);
        cpu.reg[0] = 0x4000;
        trap(&mut cpu, &mut mem, 0x24);
        assert_eq!(b"Hello", cpu.console().as_bytes());
    }

    #[test]
    fn halt_stops_running() {
        let (mut cpu, mut mem) = setup_environment();
        trap(&mut cpu, &mut mem, 0x25);
        assert!(!cpu.is_running());
        assert_eq!(Status::Halted, cpu.status());
        assert_eq!(b"\nSystem HALT\n", cpu.console().as_bytes());
    }

    #[test]
    fn unknown_vector_continues() {
        let (mut cpu, mut mem) = setup_environment();
        trap(&mut cpu, &mut mem, 0x99);
        assert!(cpu.is_running());
        assert_eq!(0x3001, cpu.reg.pc);
        assert_eq!(0x3001, cpu.reg[7]);
    }
}

/// Tests the execution loop
mod exec {
    use super::*;

    /// A three-instruction block, run with the step gate engaged
    #[test]
    fn step_gate_runs_one_instruction() {
        let (mut cpu, mut mem) = setup_program(&[INC, INC, BACK2]);
        cpu.flags.step = true;
        let mut resumptions = 0;
        loop {
            let done = cpu.cycle(&mut mem).unwrap();
            assert_eq!(1, done.executed);
            resumptions += 1;
            if done.complete {
                break;
            }
        }
        assert_eq!(3, resumptions);
        assert_eq!((2, 0x3001), (cpu.reg[0], cpu.pc()));
        assert_eq!(1, cpu.cache().len());
    }

    /// Stepping and running reach the same state
    #[test]
    fn stepped_matches_unstepped() {
        let (mut stepped, mut smem) = setup_program(&[INC, INC, BACK2]);
        let (mut free, mut fmem) = setup_program(&[INC, INC, BACK2]);
        stepped.flags.step = true;
        free.cycle(&mut fmem);
        for _ in 0..3 {
            stepped.cycle(&mut smem);
        }
        assert_eq!(free.registers(), stepped.registers());
    }

    /// ADD; ADD; BRnzp #-2, four stepped macro-steps
    #[test]
    fn add_add_branch_stepped() {
        let (mut cpu, mut mem) = setup_program(&[INC, INC, BACK2]);
        cpu.flags.step = true;
        let mut trace = vec![];
        for _ in 0..4 {
            cpu.cycle(&mut mem);
            trace.push((cpu.reg[0], cpu.pc(), cpu.cond()));
        }
        use Condition::*;
        assert_eq!(
            vec![
                (1, 0x3001, Positive),
                (2, 0x3002, Positive),
                (2, 0x3001, Positive),
                (3, 0x3002, Positive),
            ],
            trace
        );
    }

    /// ADD; ADD; BRnzp #-2, three free-running macro-steps
    #[test]
    fn add_add_branch_unstepped() {
        let (mut cpu, mut mem) = setup_program(&[INC, INC, BACK2]);
        let offsets: Vec<_> = (0..3)
            .filter_map(|_| cpu.cycle(&mut mem))
            .map(|done| (done.location.offset, done.executed))
            .collect();
        assert_eq!(vec![(0, 3), (1, 2), (1, 2)], offsets);
        assert_eq!((4, 0x3001), (cpu.reg[0], cpu.pc()));
        assert_eq!(1, cpu.cache().len());
        assert_eq!((2, 1), (cpu.cache().hits(), cpu.cache().misses()));
    }

    /// Nothing runs after HALT, even later in the same block
    #[test]
    fn halt_stops_mid_block() {
        let (mut cpu, mut mem) = setup_program(&[INC, HALT, INC, INC, BACK2]);
        let done = cpu.cycle(&mut mem).unwrap();
        assert_eq!(2, done.executed);
        assert!(!done.complete);
        assert_eq!(None, cpu.cycle(&mut mem));
        assert_eq!(1, cpu.reg[0]);
        assert_eq!(0x3002, cpu.pc());
        assert_eq!(2, cpu.cycles());
    }

    /// GETC waits, then resumes at the trap once a key arrives
    #[test]
    fn getc_resumes_mid_block() {
        // GETC; OUT; HALT
        let (mut cpu, mut mem) = setup_program(&[INC, 0xf020, 0xf021, HALT]);
        assert_eq!(Status::KeyWait, cpu.run(&mut mem));
        assert_eq!(0x3001, cpu.pc());
        assert_eq!(None, cpu.cycle(&mut mem));
        mem.keyboard_mut().press(b'!');
        let done = cpu.cycle(&mut mem).unwrap();
        assert_eq!(1, done.location.offset);
        assert_eq!(Status::Halted, cpu.status());
        assert_eq!(b"!\nSystem HALT\n", cpu.console().as_bytes());
        assert_eq!(1, cpu.cache().len());
    }

    /// Retrying a trap that's waiting for a key doesn't count as an instruction
    #[test]
    fn key_wait_does_not_count_cycles() {
        // ADD; GETC; HALT
        let (mut cpu, mut mem) = setup_program(&[INC, 0xf020, HALT]);
        assert_eq!(Status::KeyWait, cpu.run(&mut mem));
        assert_eq!(1, cpu.cycles());
        for _ in 0..5 {
            cpu.flags.keypause = false;
            assert_eq!(Status::KeyWait, cpu.run(&mut mem));
        }
        assert_eq!(1, cpu.cycles());
        mem.keyboard_mut().press(b'g');
        assert_eq!(Status::Halted, cpu.run(&mut mem));
        assert_eq!(3, cpu.cycles());
    }

    /// Breakpoints pause after the instruction before them
    #[test]
    fn breakpoint_pauses() {
        let (mut cpu, mut mem) = setup_program(&[INC, INC, INC, HALT]);
        cpu.set_break(0x3002);
        assert_eq!(Status::Paused, cpu.run(&mut mem));
        assert_eq!((2, 0x3002), (cpu.reg[0], cpu.pc()));
        // singlestep steps over the breakpoint
        cpu.singlestep(&mut mem);
        assert_eq!(3, cpu.reg[0]);
        cpu.flags.pause = false;
        assert_eq!(Status::Halted, cpu.run(&mut mem));
    }

    /// A breakpoint at the entry pc pauses before anything runs
    #[test]
    fn breakpoint_at_entry() {
        let (mut cpu, mut mem) = setup_program(&[INC, INC, HALT]);
        cpu.set_break(0x3000);
        assert_eq!(Status::Paused, cpu.run(&mut mem));
        assert_eq!((0, 0x3000, 0), (cpu.reg[0], cpu.pc(), cpu.cycles()));
        // resuming runs past it
        cpu.flags.pause = false;
        assert_eq!(Status::Halted, cpu.run(&mut mem));
        assert_eq!((2, 0x3003), (cpu.reg[0], cpu.pc()));
    }

    /// A breakpoint on a branch target trips every time it's reached
    #[test]
    fn breakpoint_on_loop_trips_again() {
        let (mut cpu, mut mem) = setup_program(&[INC, INC, BACK2]);
        cpu.set_break(0x3001);
        for r0 in 1..=3 {
            assert_eq!(Status::Paused, cpu.run(&mut mem));
            assert_eq!((r0, 0x3001), (cpu.reg[0], cpu.pc()));
            cpu.flags.pause = false;
        }
    }

    #[test]
    fn singlestep_from_entry_breakpoint() {
        let (mut cpu, mut mem) = setup_program(&[INC, INC, HALT]);
        cpu.set_break(0x3000);
        let done = cpu.singlestep(&mut mem).unwrap();
        assert_eq!(1, done.executed);
        assert_eq!((1, 0x3001), (cpu.reg[0], cpu.pc()));
    }

    #[test]
    fn breakpoints_set_unset() {
        let (mut cpu, _) = setup_environment();
        cpu.set_break(0x3000).set_break(0x3004).set_break(0x3000);
        assert_eq!(&[0x3000_u16, 0x3004], cpu.breakpoints());
        cpu.unset_break(0x3000);
        assert_eq!(&[0x3004_u16], cpu.breakpoints());
    }

    /// Quit is observed before the next cycle
    #[test]
    fn quit_stops_loop() {
        let (mut cpu, mut mem) = setup_program(&[INC, BACK2]);
        cpu.quit();
        assert_eq!(Status::Quit, cpu.run(&mut mem));
        assert_eq!(0, cpu.cycles());
    }

    /// Unsupported instructions are skipped
    #[test]
    fn unsupported_instructions_continue() {
        // RTI; reserved; TRAP x7f; ADD; HALT
        let (mut cpu, mut mem) = setup_program(&[0x8000, 0xd123, 0xf07f, INC, HALT]);
        assert_eq!(Status::Halted, cpu.run(&mut mem));
        assert_eq!(1, cpu.reg[0]);
    }

    /// Blocks that run off their end fall through into the next block
    #[test]
    fn long_run_spans_blocks() {
        let mut program = vec![INC; 300];
        program.push(HALT);
        let (mut cpu, mut mem) = setup_program(&program);
        assert_eq!(Status::Halted, cpu.run(&mut mem));
        assert_eq!(300, cpu.reg[0]);
        assert_eq!(2, cpu.cache().len());
    }

    #[test]
    fn reset_keeps_memory_and_breakpoints() {
        let (mut cpu, mut mem) = setup_program(&[INC, HALT]);
        cpu.set_break(0x3005);
        cpu.run(&mut mem);
        cpu.reset();
        assert!(cpu.is_running());
        assert!(cpu.cache().is_empty());
        assert_eq!((0, 0x3000, 0), (cpu.reg[0], cpu.pc(), cpu.cycles()));
        assert_eq!(&[0x3005_u16], cpu.breakpoints());
        assert_eq!(Status::Halted, cpu.run(&mut mem));
    }

    #[test]
    fn multistep_counts_instructions() {
        let (mut cpu, mut mem) = setup_program(&[INC, INC, BACK2]);
        assert_eq!(3 + 2 * 9, cpu.multistep(&mut mem, 10));
        assert_eq!(cpu.cycles(), 21);
    }

    #[test]
    fn dump() {
        let (cpu, _) = setup_environment();
        cpu.dump();
    }
}
