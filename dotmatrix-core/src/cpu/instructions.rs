mod parse;

use crate::cpu::registers::{CpuRegister, CpuRegisterPair, CpuRegisters, FlagUpdate};
use crate::memory::ioregisters::IoRegister;
use crate::memory::AddressSpace;
use crate::ppu::PpuState;

pub use parse::parse_next_instruction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpCondition {
    NZ,
    Z,
    NC,
    C,
}

impl JumpCondition {
    fn check(self, cpu_registers: &CpuRegisters) -> bool {
        match self {
            Self::NZ => !cpu_registers.z_flag(),
            Self::Z => cpu_registers.z_flag(),
            Self::NC => !cpu_registers.c_flag(),
            Self::C => cpu_registers.c_flag(),
        }
    }
}

/// One decoded LR35902 instruction, one variant per addressing form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // LD r, r'
    LoadRegisterRegister(CpuRegister, CpuRegister),
    // LD r, n
    LoadRegisterImmediate(CpuRegister, u8),
    // LD r, (HL)
    LoadRegisterIndirectHL(CpuRegister),
    // LD (HL), r
    LoadIndirectHLRegister(CpuRegister),
    // LD (HL), n
    LoadIndirectHLImmediate(u8),
    // LD A, (BC)
    LoadAccumulatorIndirectBC,
    // LD A, (DE)
    LoadAccumulatorIndirectDE,
    // LD (BC), A
    LoadIndirectBCAccumulator,
    // LD (DE), A
    LoadIndirectDEAccumulator,
    // LD A, (nn)
    LoadAccumulatorDirect16(u16),
    // LD (nn), A
    LoadDirect16Accumulator(u16),
    // LDH A, (C)
    LoadAccumulatorIndirectC,
    // LDH (C), A
    LoadIndirectCAccumulator,
    // LDH A, (n)
    LoadAccumulatorDirect8(u8),
    // LDH (n), A
    LoadDirect8Accumulator(u8),
    // LD A, (HL-)
    LoadAccumulatorIndirectHLDec,
    // LD (HL-), A
    LoadIndirectHLDecAccumulator,
    // LD A, (HL+)
    LoadAccumulatorIndirectHLInc,
    // LD (HL+), A
    LoadIndirectHLIncAccumulator,
    // LD rr, nn
    LoadRegisterPairImmediate(CpuRegisterPair, u16),
    // LD (nn), SP
    LoadDirectStackPointer(u16),
    // LD SP, HL
    LoadStackPointerHL,
    // LD HL, SP+e
    LoadHLStackPointerOffset(i8),
    // PUSH rr
    PushStack(CpuRegisterPair),
    // POP rr
    PopStack(CpuRegisterPair),
    // ADD r / (HL) / n
    AddRegister(CpuRegister),
    AddIndirectHL,
    AddImmediate(u8),
    // ADC r / (HL) / n
    AddCarryRegister(CpuRegister),
    AddCarryIndirectHL,
    AddCarryImmediate(u8),
    // SUB r / (HL) / n
    SubtractRegister(CpuRegister),
    SubtractIndirectHL,
    SubtractImmediate(u8),
    // SBC r / (HL) / n
    SubtractCarryRegister(CpuRegister),
    SubtractCarryIndirectHL,
    SubtractCarryImmediate(u8),
    // CP r / (HL) / n
    CompareRegister(CpuRegister),
    CompareIndirectHL,
    CompareImmediate(u8),
    // INC r / (HL)
    IncRegister(CpuRegister),
    IncIndirectHL,
    // DEC r / (HL)
    DecRegister(CpuRegister),
    DecIndirectHL,
    // AND r / (HL) / n
    AndRegister(CpuRegister),
    AndIndirectHL,
    AndImmediate(u8),
    // OR r / (HL) / n
    OrRegister(CpuRegister),
    OrIndirectHL,
    OrImmediate(u8),
    // XOR r / (HL) / n
    XorRegister(CpuRegister),
    XorIndirectHL,
    XorImmediate(u8),
    // ADD HL, rr
    AddHLRegister(CpuRegisterPair),
    // INC rr
    IncRegisterPair(CpuRegisterPair),
    // DEC rr
    DecRegisterPair(CpuRegisterPair),
    // ADD SP, e
    AddSPImmediate(i8),
    // RLCA / RLA / RRCA / RRA
    RotateLeftAccumulator,
    RotateLeftAccumulatorThruCarry,
    RotateRightAccumulator,
    RotateRightAccumulatorThruCarry,
    // RLC r / (HL)
    RotateLeft(CpuRegister),
    RotateLeftIndirectHL,
    // RL r / (HL)
    RotateLeftThruCarry(CpuRegister),
    RotateLeftIndirectHLThruCarry,
    // RRC r / (HL)
    RotateRight(CpuRegister),
    RotateRightIndirectHL,
    // RR r / (HL)
    RotateRightThruCarry(CpuRegister),
    RotateRightIndirectHLThruCarry,
    // SLA r / (HL)
    ShiftLeft(CpuRegister),
    ShiftLeftIndirectHL,
    // SRA r / (HL)
    ArithmeticShiftRight(CpuRegister),
    ArithmeticShiftRightIndirectHL,
    // SRL r / (HL)
    LogicalShiftRight(CpuRegister),
    LogicalShiftRightIndirectHL,
    // SWAP r / (HL)
    Swap(CpuRegister),
    SwapIndirectHL,
    // BIT n, r / (HL)
    TestBit(u8, CpuRegister),
    TestBitIndirectHL(u8),
    // RES n, r / (HL)
    ResetBit(u8, CpuRegister),
    ResetBitIndirectHL(u8),
    // SET n, r / (HL)
    SetBit(u8, CpuRegister),
    SetBitIndirectHL(u8),
    // CCF
    ComplementCarryFlag,
    // SCF
    SetCarryFlag,
    // DAA
    DecimalAdjustAccumulator,
    // CPL
    ComplementAccumulator,
    // JP nn
    Jump(u16),
    // JP HL
    JumpHL,
    // JP cc, nn
    JumpCond(JumpCondition, u16),
    // JR e
    RelativeJump(i8),
    // JR cc, e
    RelativeJumpCond(JumpCondition, i8),
    // CALL nn
    Call(u16),
    // CALL cc, nn
    CallCond(JumpCondition, u16),
    // RET
    Return,
    // RET cc
    ReturnCond(JumpCondition),
    // RETI
    ReturnFromInterruptHandler,
    // RST n
    RestartCall(u8),
    // HALT
    Halt,
    // STOP
    Stop,
    // DI
    DisableInterrupts,
    // EI
    EnableInterrupts,
    // NOP
    NoOp,
    // One of the eleven undefined opcodes
    Invalid(u8),
}

impl Instruction {
    /// Execute the given CPU instruction, modifying CPU registers/flags and
    /// memory as needed.
    ///
    /// This method does *not* advance the PC register past the instruction;
    /// it expects that PC was updated before this method was called. Control
    /// flow instructions assign PC directly.
    pub fn execute(
        self,
        address_space: &mut AddressSpace,
        cpu_registers: &mut CpuRegisters,
        ppu_state: &PpuState,
    ) {
        match self {
            Self::LoadRegisterRegister(dst, src) => {
                cpu_registers.set_register(dst, cpu_registers.read_register(src));
            }
            Self::LoadRegisterImmediate(dst, n) => {
                cpu_registers.set_register(dst, n);
            }
            Self::LoadRegisterIndirectHL(dst) => {
                let value = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                cpu_registers.set_register(dst, value);
            }
            Self::LoadIndirectHLRegister(src) => {
                let value = cpu_registers.read_register(src);
                address_space.write_address_u8(cpu_registers.hl(), value, ppu_state);
            }
            Self::LoadIndirectHLImmediate(n) => {
                address_space.write_address_u8(cpu_registers.hl(), n, ppu_state);
            }
            Self::LoadAccumulatorIndirectBC => {
                cpu_registers.accumulator =
                    address_space.read_address_u8(cpu_registers.bc(), ppu_state);
            }
            Self::LoadAccumulatorIndirectDE => {
                cpu_registers.accumulator =
                    address_space.read_address_u8(cpu_registers.de(), ppu_state);
            }
            Self::LoadIndirectBCAccumulator => {
                address_space.write_address_u8(
                    cpu_registers.bc(),
                    cpu_registers.accumulator,
                    ppu_state,
                );
            }
            Self::LoadIndirectDEAccumulator => {
                address_space.write_address_u8(
                    cpu_registers.de(),
                    cpu_registers.accumulator,
                    ppu_state,
                );
            }
            Self::LoadAccumulatorDirect16(nn) => {
                cpu_registers.accumulator = address_space.read_address_u8(nn, ppu_state);
            }
            Self::LoadDirect16Accumulator(nn) => {
                address_space.write_address_u8(nn, cpu_registers.accumulator, ppu_state);
            }
            Self::LoadAccumulatorIndirectC => {
                let address = u16::from_be_bytes([0xFF, cpu_registers.c]);
                cpu_registers.accumulator = address_space.read_address_u8(address, ppu_state);
            }
            Self::LoadIndirectCAccumulator => {
                let address = u16::from_be_bytes([0xFF, cpu_registers.c]);
                address_space.write_address_u8(address, cpu_registers.accumulator, ppu_state);
            }
            Self::LoadAccumulatorDirect8(n) => {
                let address = u16::from_be_bytes([0xFF, n]);
                cpu_registers.accumulator = address_space.read_address_u8(address, ppu_state);
            }
            Self::LoadDirect8Accumulator(n) => {
                let address = u16::from_be_bytes([0xFF, n]);
                address_space.write_address_u8(address, cpu_registers.accumulator, ppu_state);
            }
            Self::LoadAccumulatorIndirectHLDec => {
                let hl = cpu_registers.hl();
                cpu_registers.accumulator = address_space.read_address_u8(hl, ppu_state);
                cpu_registers.set_hl(hl.wrapping_sub(1));
            }
            Self::LoadIndirectHLDecAccumulator => {
                let hl = cpu_registers.hl();
                address_space.write_address_u8(hl, cpu_registers.accumulator, ppu_state);
                cpu_registers.set_hl(hl.wrapping_sub(1));
            }
            Self::LoadAccumulatorIndirectHLInc => {
                let hl = cpu_registers.hl();
                cpu_registers.accumulator = address_space.read_address_u8(hl, ppu_state);
                cpu_registers.set_hl(hl.wrapping_add(1));
            }
            Self::LoadIndirectHLIncAccumulator => {
                let hl = cpu_registers.hl();
                address_space.write_address_u8(hl, cpu_registers.accumulator, ppu_state);
                cpu_registers.set_hl(hl.wrapping_add(1));
            }
            Self::LoadRegisterPairImmediate(rr, nn) => {
                cpu_registers.set_register_pair(rr, nn);
            }
            Self::LoadDirectStackPointer(nn) => {
                address_space.write_address_u16(nn, cpu_registers.sp, ppu_state);
            }
            Self::LoadStackPointerHL => {
                cpu_registers.sp = cpu_registers.hl();
            }
            Self::LoadHLStackPointerOffset(e) => {
                let (value, flags) = add_sp_offset(cpu_registers.sp, e);
                cpu_registers.set_hl(value);
                cpu_registers.update_flags(flags);
            }
            Self::PushStack(rr) => {
                let value = cpu_registers.read_register_pair(rr);
                push_stack(address_space, cpu_registers, value, ppu_state);
            }
            Self::PopStack(rr) => {
                let value = pop_stack(address_space, cpu_registers, ppu_state);
                cpu_registers.set_register_pair(rr, value);
            }
            Self::AddRegister(r) => {
                let operand = cpu_registers.read_register(r);
                alu_add(cpu_registers, operand, false);
            }
            Self::AddIndirectHL => {
                let operand = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                alu_add(cpu_registers, operand, false);
            }
            Self::AddImmediate(n) => {
                alu_add(cpu_registers, n, false);
            }
            Self::AddCarryRegister(r) => {
                let operand = cpu_registers.read_register(r);
                alu_add(cpu_registers, operand, true);
            }
            Self::AddCarryIndirectHL => {
                let operand = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                alu_add(cpu_registers, operand, true);
            }
            Self::AddCarryImmediate(n) => {
                alu_add(cpu_registers, n, true);
            }
            Self::SubtractRegister(r) => {
                let operand = cpu_registers.read_register(r);
                alu_subtract(cpu_registers, operand, false, true);
            }
            Self::SubtractIndirectHL => {
                let operand = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                alu_subtract(cpu_registers, operand, false, true);
            }
            Self::SubtractImmediate(n) => {
                alu_subtract(cpu_registers, n, false, true);
            }
            Self::SubtractCarryRegister(r) => {
                let operand = cpu_registers.read_register(r);
                alu_subtract(cpu_registers, operand, true, true);
            }
            Self::SubtractCarryIndirectHL => {
                let operand = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                alu_subtract(cpu_registers, operand, true, true);
            }
            Self::SubtractCarryImmediate(n) => {
                alu_subtract(cpu_registers, n, true, true);
            }
            Self::CompareRegister(r) => {
                let operand = cpu_registers.read_register(r);
                alu_subtract(cpu_registers, operand, false, false);
            }
            Self::CompareIndirectHL => {
                let operand = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                alu_subtract(cpu_registers, operand, false, false);
            }
            Self::CompareImmediate(n) => {
                alu_subtract(cpu_registers, n, false, false);
            }
            Self::IncRegister(r) => {
                let old = cpu_registers.read_register(r);
                let value = alu_increment(cpu_registers, old);
                cpu_registers.set_register(r, value);
            }
            Self::IncIndirectHL => {
                let old = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                let value = alu_increment(cpu_registers, old);
                address_space.write_address_u8(cpu_registers.hl(), value, ppu_state);
            }
            Self::DecRegister(r) => {
                let old = cpu_registers.read_register(r);
                let value = alu_decrement(cpu_registers, old);
                cpu_registers.set_register(r, value);
            }
            Self::DecIndirectHL => {
                let old = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                let value = alu_decrement(cpu_registers, old);
                address_space.write_address_u8(cpu_registers.hl(), value, ppu_state);
            }
            Self::AndRegister(r) => {
                let operand = cpu_registers.read_register(r);
                alu_and(cpu_registers, operand);
            }
            Self::AndIndirectHL => {
                let operand = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                alu_and(cpu_registers, operand);
            }
            Self::AndImmediate(n) => {
                alu_and(cpu_registers, n);
            }
            Self::OrRegister(r) => {
                let operand = cpu_registers.read_register(r);
                alu_or(cpu_registers, operand);
            }
            Self::OrIndirectHL => {
                let operand = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                alu_or(cpu_registers, operand);
            }
            Self::OrImmediate(n) => {
                alu_or(cpu_registers, n);
            }
            Self::XorRegister(r) => {
                let operand = cpu_registers.read_register(r);
                alu_xor(cpu_registers, operand);
            }
            Self::XorIndirectHL => {
                let operand = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                alu_xor(cpu_registers, operand);
            }
            Self::XorImmediate(n) => {
                alu_xor(cpu_registers, n);
            }
            Self::AddHLRegister(rr) => {
                let lhs = cpu_registers.hl();
                let rhs = cpu_registers.read_register_pair(rr);
                let sum = lhs.wrapping_add(rhs);
                let half_carry = (lhs & 0x0FFF) + (rhs & 0x0FFF) >= 0x1000;
                let carry = lhs > u16::MAX - rhs;
                cpu_registers.set_hl(sum);
                cpu_registers.update_flags(FlagUpdate {
                    z: None,
                    n: Some(false),
                    h: Some(half_carry),
                    c: Some(carry),
                });
            }
            Self::IncRegisterPair(rr) => {
                cpu_registers
                    .set_register_pair(rr, cpu_registers.read_register_pair(rr).wrapping_add(1));
            }
            Self::DecRegisterPair(rr) => {
                cpu_registers
                    .set_register_pair(rr, cpu_registers.read_register_pair(rr).wrapping_sub(1));
            }
            Self::AddSPImmediate(e) => {
                let (value, flags) = add_sp_offset(cpu_registers.sp, e);
                cpu_registers.sp = value;
                cpu_registers.update_flags(flags);
            }
            // The accumulator rotates always clear Z, unlike their CB-prefixed
            // counterparts
            Self::RotateLeftAccumulator => {
                let (value, carry) = rotate_left(cpu_registers.accumulator);
                cpu_registers.accumulator = value;
                cpu_registers.update_flags(FlagUpdate::all(false, false, false, carry));
            }
            Self::RotateLeftAccumulatorThruCarry => {
                let (value, carry) =
                    rotate_left_thru_carry(cpu_registers.accumulator, cpu_registers.c_flag());
                cpu_registers.accumulator = value;
                cpu_registers.update_flags(FlagUpdate::all(false, false, false, carry));
            }
            Self::RotateRightAccumulator => {
                let (value, carry) = rotate_right(cpu_registers.accumulator);
                cpu_registers.accumulator = value;
                cpu_registers.update_flags(FlagUpdate::all(false, false, false, carry));
            }
            Self::RotateRightAccumulatorThruCarry => {
                let (value, carry) =
                    rotate_right_thru_carry(cpu_registers.accumulator, cpu_registers.c_flag());
                cpu_registers.accumulator = value;
                cpu_registers.update_flags(FlagUpdate::all(false, false, false, carry));
            }
            Self::RotateLeft(r) => {
                apply_shift_register(cpu_registers, r, rotate_left);
            }
            Self::RotateLeftIndirectHL => {
                apply_shift_indirect_hl(address_space, cpu_registers, ppu_state, rotate_left);
            }
            Self::RotateLeftThruCarry(r) => {
                let carry = cpu_registers.c_flag();
                apply_shift_register(cpu_registers, r, |value| {
                    rotate_left_thru_carry(value, carry)
                });
            }
            Self::RotateLeftIndirectHLThruCarry => {
                let carry = cpu_registers.c_flag();
                apply_shift_indirect_hl(address_space, cpu_registers, ppu_state, |value| {
                    rotate_left_thru_carry(value, carry)
                });
            }
            Self::RotateRight(r) => {
                apply_shift_register(cpu_registers, r, rotate_right);
            }
            Self::RotateRightIndirectHL => {
                apply_shift_indirect_hl(address_space, cpu_registers, ppu_state, rotate_right);
            }
            Self::RotateRightThruCarry(r) => {
                let carry = cpu_registers.c_flag();
                apply_shift_register(cpu_registers, r, |value| {
                    rotate_right_thru_carry(value, carry)
                });
            }
            Self::RotateRightIndirectHLThruCarry => {
                let carry = cpu_registers.c_flag();
                apply_shift_indirect_hl(address_space, cpu_registers, ppu_state, |value| {
                    rotate_right_thru_carry(value, carry)
                });
            }
            Self::ShiftLeft(r) => {
                apply_shift_register(cpu_registers, r, shift_left);
            }
            Self::ShiftLeftIndirectHL => {
                apply_shift_indirect_hl(address_space, cpu_registers, ppu_state, shift_left);
            }
            Self::ArithmeticShiftRight(r) => {
                apply_shift_register(cpu_registers, r, shift_right_arithmetic);
            }
            Self::ArithmeticShiftRightIndirectHL => {
                apply_shift_indirect_hl(
                    address_space,
                    cpu_registers,
                    ppu_state,
                    shift_right_arithmetic,
                );
            }
            Self::LogicalShiftRight(r) => {
                apply_shift_register(cpu_registers, r, shift_right_logical);
            }
            Self::LogicalShiftRightIndirectHL => {
                apply_shift_indirect_hl(
                    address_space,
                    cpu_registers,
                    ppu_state,
                    shift_right_logical,
                );
            }
            Self::Swap(r) => {
                apply_shift_register(cpu_registers, r, |value| (swap_nibbles(value), false));
            }
            Self::SwapIndirectHL => {
                apply_shift_indirect_hl(address_space, cpu_registers, ppu_state, |value| {
                    (swap_nibbles(value), false)
                });
            }
            Self::TestBit(n, r) => {
                let value = cpu_registers.read_register(r);
                test_bit(cpu_registers, n, value);
            }
            Self::TestBitIndirectHL(n) => {
                let value = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                test_bit(cpu_registers, n, value);
            }
            Self::ResetBit(n, r) => {
                cpu_registers.set_register(r, cpu_registers.read_register(r) & !(1 << n));
            }
            Self::ResetBitIndirectHL(n) => {
                let value = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                address_space.write_address_u8(cpu_registers.hl(), value & !(1 << n), ppu_state);
            }
            Self::SetBit(n, r) => {
                cpu_registers.set_register(r, cpu_registers.read_register(r) | (1 << n));
            }
            Self::SetBitIndirectHL(n) => {
                let value = address_space.read_address_u8(cpu_registers.hl(), ppu_state);
                address_space.write_address_u8(cpu_registers.hl(), value | (1 << n), ppu_state);
            }
            Self::ComplementCarryFlag => {
                cpu_registers.update_flags(FlagUpdate {
                    z: None,
                    n: Some(false),
                    h: Some(false),
                    c: Some(!cpu_registers.c_flag()),
                });
            }
            Self::SetCarryFlag => {
                cpu_registers.update_flags(FlagUpdate {
                    z: None,
                    n: Some(false),
                    h: Some(false),
                    c: Some(true),
                });
            }
            Self::DecimalAdjustAccumulator => {
                decimal_adjust_accumulator(cpu_registers);
            }
            Self::ComplementAccumulator => {
                cpu_registers.accumulator = !cpu_registers.accumulator;
                cpu_registers.update_flags(FlagUpdate {
                    z: None,
                    n: Some(true),
                    h: Some(true),
                    c: None,
                });
            }
            Self::Jump(nn) => {
                cpu_registers.pc = nn;
            }
            Self::JumpHL => {
                cpu_registers.pc = cpu_registers.hl();
            }
            Self::JumpCond(cc, nn) => {
                if cc.check(cpu_registers) {
                    cpu_registers.pc = nn;
                }
            }
            Self::RelativeJump(e) => {
                // PC already points at the next instruction, which is what the
                // offset is relative to
                cpu_registers.pc = cpu_registers.pc.wrapping_add(e as u16);
            }
            Self::RelativeJumpCond(cc, e) => {
                if cc.check(cpu_registers) {
                    cpu_registers.pc = cpu_registers.pc.wrapping_add(e as u16);
                }
            }
            Self::Call(nn) => {
                let return_address = cpu_registers.pc;
                push_stack(address_space, cpu_registers, return_address, ppu_state);
                cpu_registers.pc = nn;
            }
            Self::CallCond(cc, nn) => {
                if cc.check(cpu_registers) {
                    let return_address = cpu_registers.pc;
                    push_stack(address_space, cpu_registers, return_address, ppu_state);
                    cpu_registers.pc = nn;
                }
            }
            Self::Return => {
                cpu_registers.pc = pop_stack(address_space, cpu_registers, ppu_state);
            }
            Self::ReturnCond(cc) => {
                if cc.check(cpu_registers) {
                    cpu_registers.pc = pop_stack(address_space, cpu_registers, ppu_state);
                }
            }
            Self::ReturnFromInterruptHandler => {
                cpu_registers.pc = pop_stack(address_space, cpu_registers, ppu_state);
                cpu_registers.ime = true;
            }
            Self::RestartCall(rst_address) => {
                let return_address = cpu_registers.pc;
                push_stack(address_space, cpu_registers, return_address, ppu_state);
                cpu_registers.pc = rst_address.into();
            }
            Self::Halt => {
                let pending = address_space.get_ie_register()
                    & address_space.get_io_registers().privileged_read_register(IoRegister::IF)
                    & 0x1F;
                if !cpu_registers.ime && pending != 0 {
                    // Hardware quirk: HALT with IME clear and an interrupt
                    // already pending makes the next opcode fetch not advance
                    // PC instead of halting
                    cpu_registers.halt_bug_triggered = true;
                } else {
                    cpu_registers.halted = true;
                }
            }
            Self::Stop => {
                log::warn!("STOP executed at PC={:04X}, continuing", cpu_registers.pc);
            }
            Self::DisableInterrupts => {
                cpu_registers.ime = false;
            }
            Self::EnableInterrupts => {
                cpu_registers.ime = true;
                cpu_registers.interrupt_delay = true;

                // Every other instruction clears the delay below
                return;
            }
            Self::NoOp => {}
            Self::Invalid(opcode) => {
                log::warn!(
                    "Ignoring invalid opcode {opcode:02X}h at PC={:04X}",
                    cpu_registers.pc.wrapping_sub(1)
                );
            }
        }

        cpu_registers.interrupt_delay = false;
    }

    /// Return the number of clock cycles (T-states) required to execute this
    /// instruction.
    ///
    /// Takes CPU registers as a parameter because conditional control flow
    /// instructions cost more when the condition passes.
    pub fn cycles_required(self, cpu_registers: &CpuRegisters) -> u32 {
        match self {
            Self::LoadRegisterRegister(..)
            | Self::AddRegister(..)
            | Self::AddCarryRegister(..)
            | Self::SubtractRegister(..)
            | Self::SubtractCarryRegister(..)
            | Self::CompareRegister(..)
            | Self::IncRegister(..)
            | Self::DecRegister(..)
            | Self::AndRegister(..)
            | Self::OrRegister(..)
            | Self::XorRegister(..)
            | Self::RotateLeftAccumulator
            | Self::RotateLeftAccumulatorThruCarry
            | Self::RotateRightAccumulator
            | Self::RotateRightAccumulatorThruCarry
            | Self::ComplementCarryFlag
            | Self::SetCarryFlag
            | Self::DecimalAdjustAccumulator
            | Self::ComplementAccumulator
            | Self::JumpHL
            | Self::Halt
            | Self::Stop
            | Self::DisableInterrupts
            | Self::EnableInterrupts
            | Self::NoOp
            | Self::Invalid(..) => 4,

            Self::LoadRegisterImmediate(..)
            | Self::LoadRegisterIndirectHL(..)
            | Self::LoadIndirectHLRegister(..)
            | Self::LoadAccumulatorIndirectBC
            | Self::LoadAccumulatorIndirectDE
            | Self::LoadIndirectBCAccumulator
            | Self::LoadIndirectDEAccumulator
            | Self::LoadAccumulatorIndirectC
            | Self::LoadIndirectCAccumulator
            | Self::LoadAccumulatorIndirectHLDec
            | Self::LoadIndirectHLDecAccumulator
            | Self::LoadAccumulatorIndirectHLInc
            | Self::LoadIndirectHLIncAccumulator
            | Self::LoadStackPointerHL
            | Self::AddIndirectHL
            | Self::AddImmediate(..)
            | Self::AddCarryIndirectHL
            | Self::AddCarryImmediate(..)
            | Self::SubtractIndirectHL
            | Self::SubtractImmediate(..)
            | Self::SubtractCarryIndirectHL
            | Self::SubtractCarryImmediate(..)
            | Self::CompareIndirectHL
            | Self::CompareImmediate(..)
            | Self::AndIndirectHL
            | Self::AndImmediate(..)
            | Self::OrIndirectHL
            | Self::OrImmediate(..)
            | Self::XorIndirectHL
            | Self::XorImmediate(..)
            | Self::AddHLRegister(..)
            | Self::IncRegisterPair(..)
            | Self::DecRegisterPair(..)
            | Self::RotateLeft(..)
            | Self::RotateLeftThruCarry(..)
            | Self::RotateRight(..)
            | Self::RotateRightThruCarry(..)
            | Self::ShiftLeft(..)
            | Self::ArithmeticShiftRight(..)
            | Self::LogicalShiftRight(..)
            | Self::Swap(..)
            | Self::TestBit(..)
            | Self::ResetBit(..)
            | Self::SetBit(..) => 8,

            Self::LoadIndirectHLImmediate(..)
            | Self::LoadAccumulatorDirect8(..)
            | Self::LoadDirect8Accumulator(..)
            | Self::LoadRegisterPairImmediate(..)
            | Self::LoadHLStackPointerOffset(..)
            | Self::PopStack(..)
            | Self::IncIndirectHL
            | Self::DecIndirectHL
            | Self::TestBitIndirectHL(..)
            | Self::RelativeJump(..) => 12,

            Self::LoadAccumulatorDirect16(..)
            | Self::LoadDirect16Accumulator(..)
            | Self::PushStack(..)
            | Self::AddSPImmediate(..)
            | Self::RotateLeftIndirectHL
            | Self::RotateLeftIndirectHLThruCarry
            | Self::RotateRightIndirectHL
            | Self::RotateRightIndirectHLThruCarry
            | Self::ShiftLeftIndirectHL
            | Self::ArithmeticShiftRightIndirectHL
            | Self::LogicalShiftRightIndirectHL
            | Self::SwapIndirectHL
            | Self::ResetBitIndirectHL(..)
            | Self::SetBitIndirectHL(..)
            | Self::Jump(..)
            | Self::Return
            | Self::ReturnFromInterruptHandler
            | Self::RestartCall(..) => 16,

            Self::LoadDirectStackPointer(..) => 20,

            Self::Call(..) => 24,

            Self::JumpCond(cc, ..) => {
                if cc.check(cpu_registers) {
                    16
                } else {
                    12
                }
            }
            Self::RelativeJumpCond(cc, ..) => {
                if cc.check(cpu_registers) {
                    12
                } else {
                    8
                }
            }
            Self::CallCond(cc, ..) => {
                if cc.check(cpu_registers) {
                    24
                } else {
                    12
                }
            }
            Self::ReturnCond(cc) => {
                if cc.check(cpu_registers) {
                    20
                } else {
                    8
                }
            }
        }
    }
}

fn push_stack(
    address_space: &mut AddressSpace,
    cpu_registers: &mut CpuRegisters,
    value: u16,
    ppu_state: &PpuState,
) {
    cpu_registers.sp = cpu_registers.sp.wrapping_sub(2);
    address_space.write_address_u16(cpu_registers.sp, value, ppu_state);
}

fn pop_stack(
    address_space: &AddressSpace,
    cpu_registers: &mut CpuRegisters,
    ppu_state: &PpuState,
) -> u16 {
    let value = address_space.read_address_u16(cpu_registers.sp, ppu_state);
    cpu_registers.sp = cpu_registers.sp.wrapping_add(2);
    value
}

fn alu_add(cpu_registers: &mut CpuRegisters, operand: u8, with_carry: bool) {
    let carry_in = u8::from(with_carry && cpu_registers.c_flag());
    let accumulator = cpu_registers.accumulator;

    let sum = u16::from(accumulator) + u16::from(operand) + u16::from(carry_in);
    let half_carry = (accumulator & 0x0F) + (operand & 0x0F) + carry_in >= 0x10;

    cpu_registers.accumulator = sum as u8;
    cpu_registers.update_flags(FlagUpdate::all(sum as u8 == 0, false, half_carry, sum >= 0x100));
}

fn alu_subtract(cpu_registers: &mut CpuRegisters, operand: u8, with_carry: bool, store: bool) {
    let carry_in = u8::from(with_carry && cpu_registers.c_flag());
    let accumulator = cpu_registers.accumulator;

    let difference = i32::from(accumulator) - i32::from(operand) - i32::from(carry_in);
    let half_borrow = accumulator & 0x0F < (operand & 0x0F) + carry_in;

    if store {
        cpu_registers.accumulator = difference as u8;
    }
    cpu_registers.update_flags(FlagUpdate::all(
        difference as u8 == 0,
        true,
        half_borrow,
        difference < 0,
    ));
}

fn alu_increment(cpu_registers: &mut CpuRegisters, value: u8) -> u8 {
    let sum = value.wrapping_add(1);
    cpu_registers.update_flags(FlagUpdate {
        z: Some(sum == 0),
        n: Some(false),
        h: Some(value & 0x0F == 0x0F),
        c: None,
    });
    sum
}

fn alu_decrement(cpu_registers: &mut CpuRegisters, value: u8) -> u8 {
    let difference = value.wrapping_sub(1);
    cpu_registers.update_flags(FlagUpdate {
        z: Some(difference == 0),
        n: Some(true),
        h: Some(value & 0x0F == 0x00),
        c: None,
    });
    difference
}

fn alu_and(cpu_registers: &mut CpuRegisters, operand: u8) {
    let value = cpu_registers.accumulator & operand;
    cpu_registers.accumulator = value;
    cpu_registers.update_flags(FlagUpdate::all(value == 0, false, true, false));
}

fn alu_or(cpu_registers: &mut CpuRegisters, operand: u8) {
    let value = cpu_registers.accumulator | operand;
    cpu_registers.accumulator = value;
    cpu_registers.update_flags(FlagUpdate::all(value == 0, false, false, false));
}

fn alu_xor(cpu_registers: &mut CpuRegisters, operand: u8) {
    let value = cpu_registers.accumulator ^ operand;
    cpu_registers.accumulator = value;
    cpu_registers.update_flags(FlagUpdate::all(value == 0, false, false, false));
}

// ADD SP, e and LD HL, SP+e sign-extend the offset for the sum, but the H and
// C flags come from the unsigned low-byte addition
fn add_sp_offset(sp: u16, offset: i8) -> (u16, FlagUpdate) {
    let offset_byte = offset as u8;
    let half_carry = (sp & 0x000F) + u16::from(offset_byte & 0x0F) >= 0x0010;
    let carry = (sp & 0x00FF) + u16::from(offset_byte) >= 0x0100;

    let value = sp.wrapping_add(offset as u16);

    (value, FlagUpdate::all(false, false, half_carry, carry))
}

fn rotate_left(value: u8) -> (u8, bool) {
    let carry = value & 0x80 != 0;
    ((value << 1) | u8::from(carry), carry)
}

fn rotate_left_thru_carry(value: u8, carry_in: bool) -> (u8, bool) {
    ((value << 1) | u8::from(carry_in), value & 0x80 != 0)
}

fn rotate_right(value: u8) -> (u8, bool) {
    let carry = value & 0x01 != 0;
    ((value >> 1) | (u8::from(carry) << 7), carry)
}

fn rotate_right_thru_carry(value: u8, carry_in: bool) -> (u8, bool) {
    ((value >> 1) | (u8::from(carry_in) << 7), value & 0x01 != 0)
}

fn shift_left(value: u8) -> (u8, bool) {
    (value << 1, value & 0x80 != 0)
}

fn shift_right_arithmetic(value: u8) -> (u8, bool) {
    ((value >> 1) | (value & 0x80), value & 0x01 != 0)
}

fn shift_right_logical(value: u8) -> (u8, bool) {
    (value >> 1, value & 0x01 != 0)
}

fn swap_nibbles(value: u8) -> u8 {
    value.rotate_left(4)
}

/// Apply a CB-prefixed shift/rotate/swap to a register, setting Z from the
/// result and C from the shifted-out bit.
fn apply_shift_register(
    cpu_registers: &mut CpuRegisters,
    register: CpuRegister,
    op: impl FnOnce(u8) -> (u8, bool),
) {
    let (value, carry) = op(cpu_registers.read_register(register));
    cpu_registers.set_register(register, value);
    cpu_registers.update_flags(FlagUpdate::all(value == 0, false, false, carry));
}

/// Apply a CB-prefixed shift/rotate/swap to the byte addressed by HL.
fn apply_shift_indirect_hl(
    address_space: &mut AddressSpace,
    cpu_registers: &mut CpuRegisters,
    ppu_state: &PpuState,
    op: impl FnOnce(u8) -> (u8, bool),
) {
    let (value, carry) = op(address_space.read_address_u8(cpu_registers.hl(), ppu_state));
    address_space.write_address_u8(cpu_registers.hl(), value, ppu_state);
    cpu_registers.update_flags(FlagUpdate::all(value == 0, false, false, carry));
}

fn test_bit(cpu_registers: &mut CpuRegisters, bit: u8, value: u8) {
    cpu_registers.update_flags(FlagUpdate {
        z: Some(value & (1 << bit) == 0),
        n: Some(false),
        h: Some(true),
        c: None,
    });
}

fn decimal_adjust_accumulator(cpu_registers: &mut CpuRegisters) {
    if cpu_registers.n_flag() {
        // Last op was a subtraction: undo BCD overshoot
        let mut value = cpu_registers.accumulator;
        if cpu_registers.h_flag() {
            value = value.wrapping_sub(0x06);
        }
        if cpu_registers.c_flag() {
            value = value.wrapping_sub(0x60);
        }

        cpu_registers.accumulator = value;
        cpu_registers.update_flags(FlagUpdate {
            z: Some(value == 0),
            n: None,
            h: Some(false),
            c: None,
        });
    } else {
        // Last op was an addition
        let mut value = cpu_registers.accumulator;
        let mut carry = false;
        if value > 0x99 || cpu_registers.c_flag() {
            value = value.wrapping_add(0x60);
            carry = true;
        }
        if value & 0x0F >= 0x0A || cpu_registers.h_flag() {
            value = value.wrapping_add(0x06);
        }

        cpu_registers.accumulator = value;
        cpu_registers.update_flags(FlagUpdate {
            z: Some(value == 0),
            n: None,
            h: Some(false),
            c: Some(carry),
        });
    }
}
