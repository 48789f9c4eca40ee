use crate::cpu::instructions::{parse_next_instruction, Instruction};
use crate::cpu::registers::CpuRegister;
use crate::cpu::{self, CpuRegisters, InterruptType};
use crate::memory::ioregisters::IoRegister;
use crate::memory::{AddressSpace, Cartridge};
use crate::ppu::PpuState;

fn bare_address_space() -> AddressSpace {
    let rom = vec![0; 0x8000];
    AddressSpace::new(Cartridge::new(rom, None).expect("synthesized ROM should be valid"))
}

fn set_interrupt_state(address_space: &mut AddressSpace, ie: u8, iff: u8) {
    let ppu_state = PpuState::new();
    address_space.write_address_u8(0xFFFF, ie, &ppu_state);
    address_space.get_io_registers_mut().privileged_set_register(IoRegister::IF, iff);
}

#[test]
fn handler_addresses() {
    assert_eq!(0x0040, InterruptType::VBlank.handler_address());
    assert_eq!(0x0048, InterruptType::LcdStatus.handler_address());
    assert_eq!(0x0050, InterruptType::Timer.handler_address());
    assert_eq!(0x0058, InterruptType::Serial.handler_address());
    assert_eq!(0x0060, InterruptType::Joypad.handler_address());
}

#[test]
fn dispatch_pushes_pc_and_jumps_to_vector() {
    let mut address_space = bare_address_space();
    let mut cpu_registers = CpuRegisters::new();
    let ppu_state = PpuState::new();

    cpu_registers.pc = 0x1234;
    cpu_registers.sp = 0xCFFF;
    set_interrupt_state(&mut address_space, 0x04, 0x04);

    assert!(cpu::interrupt_triggered(&cpu_registers, &address_space));
    cpu::execute_interrupt_service_routine(&mut cpu_registers, &mut address_space, &ppu_state);

    assert_eq!(0x0050, cpu_registers.pc);
    assert_eq!(0xCFFD, cpu_registers.sp);
    assert_eq!(0x1234, address_space.read_address_u16(0xCFFD, &ppu_state));
    assert!(!cpu_registers.ime);
    // The dispatched bit is acknowledged in IF
    assert!(!address_space.get_io_registers_mut().interrupt_flags().get(InterruptType::Timer));
    assert_eq!(20, cpu::ISR_CYCLES_REQUIRED);
}

#[test]
fn lowest_bit_wins_priority() {
    let mut address_space = bare_address_space();
    let mut cpu_registers = CpuRegisters::new();
    let ppu_state = PpuState::new();

    cpu_registers.sp = 0xCFFF;
    // VBlank, Timer, and Joypad all pending
    set_interrupt_state(&mut address_space, 0x1F, 0x15);

    cpu::execute_interrupt_service_routine(&mut cpu_registers, &mut address_space, &ppu_state);
    assert_eq!(0x0040, cpu_registers.pc);

    // Timer and Joypad remain pending
    let io_registers = address_space.get_io_registers_mut();
    assert!(!io_registers.interrupt_flags().get(InterruptType::VBlank));
    assert!(io_registers.interrupt_flags().get(InterruptType::Timer));
    assert!(io_registers.interrupt_flags().get(InterruptType::Joypad));
}

#[test]
fn masked_interrupts_do_not_dispatch() {
    let mut address_space = bare_address_space();
    let cpu_registers = CpuRegisters::new();

    // Serial pending but only Timer enabled
    set_interrupt_state(&mut address_space, 0x04, 0x08);
    assert!(!cpu::interrupt_triggered(&cpu_registers, &address_space));
    assert!(!cpu::interrupt_triggered_no_ime_check(&address_space));

    set_interrupt_state(&mut address_space, 0x0C, 0x08);
    assert!(cpu::interrupt_triggered(&cpu_registers, &address_space));
}

#[test]
fn ime_gates_dispatch_but_not_halt_wake() {
    let mut address_space = bare_address_space();
    let mut cpu_registers = CpuRegisters::new();

    cpu_registers.ime = false;
    set_interrupt_state(&mut address_space, 0x01, 0x01);

    assert!(!cpu::interrupt_triggered(&cpu_registers, &address_space));
    // A pending interrupt still wakes a halted CPU
    assert!(cpu::interrupt_triggered_no_ime_check(&address_space));
}

#[test]
fn ei_defers_interrupt_enable_by_one_instruction() {
    let mut address_space = bare_address_space();
    let mut cpu_registers = CpuRegisters::new();
    let ppu_state = PpuState::new();

    cpu_registers.ime = false;
    set_interrupt_state(&mut address_space, 0x01, 0x01);

    Instruction::EnableInterrupts.execute(&mut address_space, &mut cpu_registers, &ppu_state);
    assert!(cpu_registers.ime);
    // Not yet: the instruction after EI must run first
    assert!(!cpu::interrupt_triggered(&cpu_registers, &address_space));

    Instruction::NoOp.execute(&mut address_space, &mut cpu_registers, &ppu_state);
    assert!(cpu::interrupt_triggered(&cpu_registers, &address_space));
}

#[test]
fn dispatch_clears_halt() {
    let mut address_space = bare_address_space();
    let mut cpu_registers = CpuRegisters::new();
    let ppu_state = PpuState::new();

    cpu_registers.halted = true;
    cpu_registers.sp = 0xCFFF;
    set_interrupt_state(&mut address_space, 0x01, 0x01);

    cpu::execute_interrupt_service_routine(&mut cpu_registers, &mut address_space, &ppu_state);
    assert!(!cpu_registers.halted);
    assert_eq!(0x0040, cpu_registers.pc);
}

#[test]
fn halt_with_ime_clear_and_pending_interrupt_triggers_halt_bug() {
    let mut address_space = bare_address_space();
    let mut cpu_registers = CpuRegisters::new();
    let ppu_state = PpuState::new();

    cpu_registers.ime = false;
    set_interrupt_state(&mut address_space, 0x01, 0x01);

    Instruction::Halt.execute(&mut address_space, &mut cpu_registers, &ppu_state);
    assert!(!cpu_registers.halted);
    assert!(cpu_registers.halt_bug_triggered);

    // The next opcode fetch reads the byte but PC does not move past it: for
    // LD A, n the opcode byte itself becomes the operand
    address_space.write_address_u8(0xC000, 0x3E, &ppu_state);
    address_space.write_address_u8(0xC001, 0x42, &ppu_state);
    let (instruction, pc) = parse_next_instruction(&address_space, 0xC000, &ppu_state, true);
    assert_eq!(Instruction::LoadRegisterImmediate(CpuRegister::A, 0x3E), instruction);
    assert_eq!(0xC001, pc);
}

#[test]
fn halt_without_pending_interrupt_halts() {
    let mut address_space = bare_address_space();
    let mut cpu_registers = CpuRegisters::new();
    let ppu_state = PpuState::new();

    cpu_registers.ime = false;
    set_interrupt_state(&mut address_space, 0x01, 0x00);

    Instruction::Halt.execute(&mut address_space, &mut cpu_registers, &ppu_state);
    assert!(cpu_registers.halted);
    assert!(!cpu_registers.halt_bug_triggered);
}
