use crate::cpu::instructions::{Instruction, JumpCondition};
use crate::cpu::registers::{CpuRegister, CpuRegisterPair};
use crate::memory::AddressSpace;
use crate::ppu::PpuState;

/// Decode the instruction at the given PC, returning it along with the
/// address of the following instruction.
///
/// Decoding never fails: the eleven undefined opcodes decode to
/// `Instruction::Invalid`, which executes as a logged single-byte no-op.
pub fn parse_next_instruction(
    address_space: &AddressSpace,
    mut pc: u16,
    ppu_state: &PpuState,
    halt_bug_triggered: bool,
) -> (Instruction, u16) {
    let opcode = address_space.read_address_u8(pc, ppu_state);

    // When the HALT bug has triggered, the opcode fetch does not advance PC,
    // so decode operands as if PC were one byte earlier
    if halt_bug_triggered {
        pc = pc.wrapping_sub(1);
    }

    match opcode {
        0x00 => (Instruction::NoOp, pc.wrapping_add(1)),
        0x01 | 0x11 | 0x21 | 0x31 => {
            let rr = register_pair_for_other_ops(opcode);
            let nn = address_space.read_address_u16(pc.wrapping_add(1), ppu_state);
            (Instruction::LoadRegisterPairImmediate(rr, nn), pc.wrapping_add(3))
        }
        0x02 => (Instruction::LoadIndirectBCAccumulator, pc.wrapping_add(1)),
        0x03 | 0x13 | 0x23 | 0x33 => {
            let rr = register_pair_for_other_ops(opcode);
            (Instruction::IncRegisterPair(rr), pc.wrapping_add(1))
        }
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
            let instruction = CpuRegister::from_mid_opcode_bits(opcode)
                .map_or(Instruction::IncIndirectHL, Instruction::IncRegister);
            (instruction, pc.wrapping_add(1))
        }
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
            let instruction = CpuRegister::from_mid_opcode_bits(opcode)
                .map_or(Instruction::DecIndirectHL, Instruction::DecRegister);
            (instruction, pc.wrapping_add(1))
        }
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            let instruction = match CpuRegister::from_mid_opcode_bits(opcode) {
                Some(r) => Instruction::LoadRegisterImmediate(r, n),
                None => Instruction::LoadIndirectHLImmediate(n),
            };
            (instruction, pc.wrapping_add(2))
        }
        0x07 => (Instruction::RotateLeftAccumulator, pc.wrapping_add(1)),
        0x08 => {
            let nn = address_space.read_address_u16(pc.wrapping_add(1), ppu_state);
            (Instruction::LoadDirectStackPointer(nn), pc.wrapping_add(3))
        }
        0x09 | 0x19 | 0x29 | 0x39 => {
            let rr = register_pair_for_other_ops(opcode);
            (Instruction::AddHLRegister(rr), pc.wrapping_add(1))
        }
        0x0A => (Instruction::LoadAccumulatorIndirectBC, pc.wrapping_add(1)),
        0x0B | 0x1B | 0x2B | 0x3B => {
            let rr = register_pair_for_other_ops(opcode);
            (Instruction::DecRegisterPair(rr), pc.wrapping_add(1))
        }
        0x0F => (Instruction::RotateRightAccumulator, pc.wrapping_add(1)),
        // STOP is encoded as 0x10 0x00
        0x10 => (Instruction::Stop, pc.wrapping_add(2)),
        0x12 => (Instruction::LoadIndirectDEAccumulator, pc.wrapping_add(1)),
        0x17 => (Instruction::RotateLeftAccumulatorThruCarry, pc.wrapping_add(1)),
        0x18 => {
            let e = address_space.read_address_u8(pc.wrapping_add(1), ppu_state) as i8;
            (Instruction::RelativeJump(e), pc.wrapping_add(2))
        }
        0x1A => (Instruction::LoadAccumulatorIndirectDE, pc.wrapping_add(1)),
        0x1F => (Instruction::RotateRightAccumulatorThruCarry, pc.wrapping_add(1)),
        0x20 | 0x28 | 0x30 | 0x38 => {
            let cc = parse_jump_condition(opcode);
            let e = address_space.read_address_u8(pc.wrapping_add(1), ppu_state) as i8;
            (Instruction::RelativeJumpCond(cc, e), pc.wrapping_add(2))
        }
        0x22 => (Instruction::LoadIndirectHLIncAccumulator, pc.wrapping_add(1)),
        0x27 => (Instruction::DecimalAdjustAccumulator, pc.wrapping_add(1)),
        0x2A => (Instruction::LoadAccumulatorIndirectHLInc, pc.wrapping_add(1)),
        0x2F => (Instruction::ComplementAccumulator, pc.wrapping_add(1)),
        0x32 => (Instruction::LoadIndirectHLDecAccumulator, pc.wrapping_add(1)),
        0x37 => (Instruction::SetCarryFlag, pc.wrapping_add(1)),
        0x3A => (Instruction::LoadAccumulatorIndirectHLDec, pc.wrapping_add(1)),
        0x3F => (Instruction::ComplementCarryFlag, pc.wrapping_add(1)),
        0x76 => (Instruction::Halt, pc.wrapping_add(1)),
        opcode @ 0x40..=0x7F => {
            let instruction = match (
                CpuRegister::from_mid_opcode_bits(opcode),
                CpuRegister::from_low_opcode_bits(opcode),
            ) {
                (Some(dst), Some(src)) => Instruction::LoadRegisterRegister(dst, src),
                (Some(dst), None) => Instruction::LoadRegisterIndirectHL(dst),
                (None, Some(src)) => Instruction::LoadIndirectHLRegister(src),
                (None, None) => unreachable!("0x76 (HALT) is matched before this arm"),
            };
            (instruction, pc.wrapping_add(1))
        }
        opcode @ 0x80..=0x87 => {
            let instruction = CpuRegister::from_low_opcode_bits(opcode)
                .map_or(Instruction::AddIndirectHL, Instruction::AddRegister);
            (instruction, pc.wrapping_add(1))
        }
        opcode @ 0x88..=0x8F => {
            let instruction = CpuRegister::from_low_opcode_bits(opcode)
                .map_or(Instruction::AddCarryIndirectHL, Instruction::AddCarryRegister);
            (instruction, pc.wrapping_add(1))
        }
        opcode @ 0x90..=0x97 => {
            let instruction = CpuRegister::from_low_opcode_bits(opcode)
                .map_or(Instruction::SubtractIndirectHL, Instruction::SubtractRegister);
            (instruction, pc.wrapping_add(1))
        }
        opcode @ 0x98..=0x9F => {
            let instruction = CpuRegister::from_low_opcode_bits(opcode)
                .map_or(Instruction::SubtractCarryIndirectHL, Instruction::SubtractCarryRegister);
            (instruction, pc.wrapping_add(1))
        }
        opcode @ 0xA0..=0xA7 => {
            let instruction = CpuRegister::from_low_opcode_bits(opcode)
                .map_or(Instruction::AndIndirectHL, Instruction::AndRegister);
            (instruction, pc.wrapping_add(1))
        }
        opcode @ 0xA8..=0xAF => {
            let instruction = CpuRegister::from_low_opcode_bits(opcode)
                .map_or(Instruction::XorIndirectHL, Instruction::XorRegister);
            (instruction, pc.wrapping_add(1))
        }
        opcode @ 0xB0..=0xB7 => {
            let instruction = CpuRegister::from_low_opcode_bits(opcode)
                .map_or(Instruction::OrIndirectHL, Instruction::OrRegister);
            (instruction, pc.wrapping_add(1))
        }
        opcode @ 0xB8..=0xBF => {
            let instruction = CpuRegister::from_low_opcode_bits(opcode)
                .map_or(Instruction::CompareIndirectHL, Instruction::CompareRegister);
            (instruction, pc.wrapping_add(1))
        }
        0xC0 | 0xC8 | 0xD0 | 0xD8 => {
            let cc = parse_jump_condition(opcode);
            (Instruction::ReturnCond(cc), pc.wrapping_add(1))
        }
        0xC1 | 0xD1 | 0xE1 | 0xF1 => {
            let rr = register_pair_for_push_pop(opcode);
            (Instruction::PopStack(rr), pc.wrapping_add(1))
        }
        0xC2 | 0xCA | 0xD2 | 0xDA => {
            let cc = parse_jump_condition(opcode);
            let nn = address_space.read_address_u16(pc.wrapping_add(1), ppu_state);
            (Instruction::JumpCond(cc, nn), pc.wrapping_add(3))
        }
        0xC3 => {
            let nn = address_space.read_address_u16(pc.wrapping_add(1), ppu_state);
            (Instruction::Jump(nn), pc.wrapping_add(3))
        }
        0xC4 | 0xCC | 0xD4 | 0xDC => {
            let cc = parse_jump_condition(opcode);
            let nn = address_space.read_address_u16(pc.wrapping_add(1), ppu_state);
            (Instruction::CallCond(cc, nn), pc.wrapping_add(3))
        }
        0xC5 | 0xD5 | 0xE5 | 0xF5 => {
            let rr = register_pair_for_push_pop(opcode);
            (Instruction::PushStack(rr), pc.wrapping_add(1))
        }
        0xC6 => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            (Instruction::AddImmediate(n), pc.wrapping_add(2))
        }
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
            (Instruction::RestartCall(opcode & 0x38), pc.wrapping_add(1))
        }
        0xC9 => (Instruction::Return, pc.wrapping_add(1)),
        0xCB => parse_cb_prefixed_opcode(address_space, pc, ppu_state),
        0xCD => {
            let nn = address_space.read_address_u16(pc.wrapping_add(1), ppu_state);
            (Instruction::Call(nn), pc.wrapping_add(3))
        }
        0xCE => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            (Instruction::AddCarryImmediate(n), pc.wrapping_add(2))
        }
        0xD6 => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            (Instruction::SubtractImmediate(n), pc.wrapping_add(2))
        }
        0xD9 => (Instruction::ReturnFromInterruptHandler, pc.wrapping_add(1)),
        0xDE => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            (Instruction::SubtractCarryImmediate(n), pc.wrapping_add(2))
        }
        0xE0 => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            (Instruction::LoadDirect8Accumulator(n), pc.wrapping_add(2))
        }
        0xE2 => (Instruction::LoadIndirectCAccumulator, pc.wrapping_add(1)),
        0xE6 => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            (Instruction::AndImmediate(n), pc.wrapping_add(2))
        }
        0xE8 => {
            let e = address_space.read_address_u8(pc.wrapping_add(1), ppu_state) as i8;
            (Instruction::AddSPImmediate(e), pc.wrapping_add(2))
        }
        0xE9 => (Instruction::JumpHL, pc.wrapping_add(1)),
        0xEA => {
            let nn = address_space.read_address_u16(pc.wrapping_add(1), ppu_state);
            (Instruction::LoadDirect16Accumulator(nn), pc.wrapping_add(3))
        }
        0xEE => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            (Instruction::XorImmediate(n), pc.wrapping_add(2))
        }
        0xF0 => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            (Instruction::LoadAccumulatorDirect8(n), pc.wrapping_add(2))
        }
        0xF2 => (Instruction::LoadAccumulatorIndirectC, pc.wrapping_add(1)),
        0xF3 => (Instruction::DisableInterrupts, pc.wrapping_add(1)),
        0xF6 => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            (Instruction::OrImmediate(n), pc.wrapping_add(2))
        }
        0xF8 => {
            let e = address_space.read_address_u8(pc.wrapping_add(1), ppu_state) as i8;
            (Instruction::LoadHLStackPointerOffset(e), pc.wrapping_add(2))
        }
        0xF9 => (Instruction::LoadStackPointerHL, pc.wrapping_add(1)),
        0xFA => {
            let nn = address_space.read_address_u16(pc.wrapping_add(1), ppu_state);
            (Instruction::LoadAccumulatorDirect16(nn), pc.wrapping_add(3))
        }
        0xFB => (Instruction::EnableInterrupts, pc.wrapping_add(1)),
        0xFE => {
            let n = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
            (Instruction::CompareImmediate(n), pc.wrapping_add(2))
        }
        0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
            (Instruction::Invalid(opcode), pc.wrapping_add(1))
        }
    }
}

fn parse_cb_prefixed_opcode(
    address_space: &AddressSpace,
    pc: u16,
    ppu_state: &PpuState,
) -> (Instruction, u16) {
    let opcode = address_space.read_address_u8(pc.wrapping_add(1), ppu_state);
    let register = CpuRegister::from_low_opcode_bits(opcode);

    let instruction = match opcode {
        0x00..=0x07 => register.map_or(Instruction::RotateLeftIndirectHL, Instruction::RotateLeft),
        0x08..=0x0F => {
            register.map_or(Instruction::RotateRightIndirectHL, Instruction::RotateRight)
        }
        0x10..=0x17 => register.map_or(
            Instruction::RotateLeftIndirectHLThruCarry,
            Instruction::RotateLeftThruCarry,
        ),
        0x18..=0x1F => register.map_or(
            Instruction::RotateRightIndirectHLThruCarry,
            Instruction::RotateRightThruCarry,
        ),
        0x20..=0x27 => register.map_or(Instruction::ShiftLeftIndirectHL, Instruction::ShiftLeft),
        0x28..=0x2F => register.map_or(
            Instruction::ArithmeticShiftRightIndirectHL,
            Instruction::ArithmeticShiftRight,
        ),
        0x30..=0x37 => register.map_or(Instruction::SwapIndirectHL, Instruction::Swap),
        0x38..=0x3F => register.map_or(
            Instruction::LogicalShiftRightIndirectHL,
            Instruction::LogicalShiftRight,
        ),
        opcode @ 0x40..=0x7F => {
            let bit = (opcode & 0x38) >> 3;
            match register {
                Some(r) => Instruction::TestBit(bit, r),
                None => Instruction::TestBitIndirectHL(bit),
            }
        }
        opcode @ 0x80..=0xBF => {
            let bit = (opcode & 0x38) >> 3;
            match register {
                Some(r) => Instruction::ResetBit(bit, r),
                None => Instruction::ResetBitIndirectHL(bit),
            }
        }
        opcode @ 0xC0..=0xFF => {
            let bit = (opcode & 0x38) >> 3;
            match register {
                Some(r) => Instruction::SetBit(bit, r),
                None => Instruction::SetBitIndirectHL(bit),
            }
        }
    };

    (instruction, pc.wrapping_add(2))
}

fn register_pair_for_other_ops(opcode: u8) -> CpuRegisterPair {
    match opcode & 0x30 {
        0x00 => CpuRegisterPair::BC,
        0x10 => CpuRegisterPair::DE,
        0x20 => CpuRegisterPair::HL,
        0x30 => CpuRegisterPair::SP,
        _ => unreachable!("value & 0x30 is always 0x00/0x10/0x20/0x30"),
    }
}

fn register_pair_for_push_pop(opcode: u8) -> CpuRegisterPair {
    match opcode & 0x30 {
        0x00 => CpuRegisterPair::BC,
        0x10 => CpuRegisterPair::DE,
        0x20 => CpuRegisterPair::HL,
        0x30 => CpuRegisterPair::AF,
        _ => unreachable!("value & 0x30 is always 0x00/0x10/0x20/0x30"),
    }
}

fn parse_jump_condition(opcode: u8) -> JumpCondition {
    match opcode & 0x18 {
        0x00 => JumpCondition::NZ,
        0x08 => JumpCondition::Z,
        0x10 => JumpCondition::NC,
        0x18 => JumpCondition::C,
        _ => unreachable!("value & 0x18 is always 0x00/0x08/0x10/0x18"),
    }
}
