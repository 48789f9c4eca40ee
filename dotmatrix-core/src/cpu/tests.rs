mod interrupts;
mod load;

use crate::cpu::{instructions, CpuRegisters};
use crate::memory::{AddressSpace, Cartridge};
use crate::ppu::PpuState;
use std::collections::HashMap;

const PROGRAM_START: u16 = 0x0150;

// Programs that run longer than this have wedged
const MAX_STEPS: u32 = 10_000;

struct ExpectedState {
    a: Option<u8>,
    f: Option<u8>,
    b: Option<u8>,
    c: Option<u8>,
    d: Option<u8>,
    e: Option<u8>,
    h: Option<u8>,
    l: Option<u8>,
    sp: Option<u16>,
    memory: HashMap<u16, u8>,
}

macro_rules! compare_bytes {
    // (expected: Option<T>, actual: T) where T: Eq
    ($([$name:literal, $expected:expr, $actual:expr]),+$(,)?) => {
        {
            let mut match_fails = Vec::new();
            $(
                if let Some(expected) = $expected {
                    let actual = $actual;
                    if expected != actual {
                        match_fails.push(format!("{} mismatch: expected 0x{:02X}, actual 0x{:02X}", $name, expected, actual));
                    }
                }
            )*
            match_fails
        }
    };
}

impl ExpectedState {
    fn empty() -> Self {
        Self {
            a: None,
            f: None,
            b: None,
            c: None,
            d: None,
            e: None,
            h: None,
            l: None,
            sp: None,
            memory: HashMap::new(),
        }
    }

    fn assert_matches(&self, cpu_registers: &CpuRegisters, address_space: &AddressSpace) {
        let mut match_fails = compare_bytes!(
            ["A", self.a, cpu_registers.accumulator],
            ["F", self.f, cpu_registers.flags],
            ["B", self.b, cpu_registers.b],
            ["C", self.c, cpu_registers.c],
            ["D", self.d, cpu_registers.d],
            ["E", self.e, cpu_registers.e],
            ["H", self.h, cpu_registers.h],
            ["L", self.l, cpu_registers.l],
            ["SP", self.sp, cpu_registers.sp],
        );

        let ppu_state = PpuState::new();
        for (&address, &expected) in &self.memory {
            let actual = address_space.read_address_u8(address, &ppu_state);
            if expected != actual {
                match_fails.push(format!(
                    "memory mismatch at 0x{address:04X}: expected 0x{expected:02X}, actual 0x{actual:02X}"
                ));
            }
        }

        if !match_fails.is_empty() {
            let error_msgs: Vec<_> = match_fails.into_iter().map(|s| format!("[{s}]")).collect();
            panic!("Expected state does not match actual state: {}", error_msgs.join(", "));
        }
    }
}

fn decode_program_hex(program_hex: &str) -> Vec<u8> {
    assert!(
        program_hex.len() % 2 == 0,
        "program length must be a multiple of 2, was {}",
        program_hex.len()
    );
    assert!(
        program_hex.chars().all(|c| c.is_ascii_hexdigit()),
        "program contains non-hexadecimal characters: '{program_hex}'"
    );

    (0..program_hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&program_hex[i..i + 2], 16)
                .expect("program should only contain valid hexadecimal digits")
        })
        .collect()
}

/// Execute the given hex-encoded program on a synthesized cartridge and
/// assert the resulting CPU/memory state.
///
/// The program is placed at 0x0150, reached through a JP at the 0x0100 entry
/// point, and runs until PC lands at the end of the program.
fn run_test(program_hex: &str, expected_state: &ExpectedState) {
    let program = decode_program_hex(program_hex);

    let mut rom = vec![0; 0x8000];
    // NOP; JP 0x0150
    rom[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    rom[PROGRAM_START as usize..PROGRAM_START as usize + program.len()].copy_from_slice(&program);

    let program_end = PROGRAM_START + program.len() as u16;

    let mut address_space =
        AddressSpace::new(Cartridge::new(rom, None).expect("synthesized ROM should be valid"));
    let mut cpu_registers = CpuRegisters::new();
    let ppu_state = PpuState::new();

    let mut steps = 0;
    while cpu_registers.pc < program_end {
        let (instruction, pc) = instructions::parse_next_instruction(
            &address_space,
            cpu_registers.pc,
            &ppu_state,
            false,
        );
        cpu_registers.pc = pc;

        instruction.execute(&mut address_space, &mut cpu_registers, &ppu_state);

        steps += 1;
        assert!(steps <= MAX_STEPS, "program did not terminate within {MAX_STEPS} steps");
    }

    expected_state.assert_matches(&cpu_registers, &address_space);
}

macro_rules! hash_map {
    ($($key:literal: $value:expr),+$(,)?) => {
        {
            let mut map = std::collections::HashMap::new();
            $(
                map.insert($key, $value);
            )*
            map
        }
    }
}

use hash_map;
