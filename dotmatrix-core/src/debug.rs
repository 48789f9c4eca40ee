use crate::cpu::CpuRegisters;
use crate::memory::ioregisters::IoRegister;
use crate::memory::AddressSpace;
use crate::ppu::PpuState;
use crate::serial::SerialSink;
use std::fs::{File, OpenOptions};
use std::io;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One human-readable line of CPU and interrupt state, emitted per executed
/// instruction when debug logging is enabled.
pub fn cpu_state_line(
    cpu_registers: &CpuRegisters,
    address_space: &AddressSpace,
    ppu_state: &PpuState,
) -> String {
    let io_registers = address_space.get_io_registers();

    let opcode_bytes: Vec<String> = (0..4)
        .map(|i| {
            let byte =
                address_space.read_address_u8(cpu_registers.pc.wrapping_add(i), ppu_state);
            format!("{byte:02X}")
        })
        .collect();

    format!(
        "PC={:04X} SP={:04X} A={:02X} F={}{}{}{} BC={:04X} DE={:04X} HL={:04X} IME={} IE={:02X} IF={:02X} LY={:02X} | {}",
        cpu_registers.pc,
        cpu_registers.sp,
        cpu_registers.accumulator,
        if cpu_registers.z_flag() { 'Z' } else { '-' },
        if cpu_registers.n_flag() { 'N' } else { '-' },
        if cpu_registers.h_flag() { 'H' } else { '-' },
        if cpu_registers.c_flag() { 'C' } else { '-' },
        cpu_registers.bc(),
        cpu_registers.de(),
        cpu_registers.hl(),
        u8::from(cpu_registers.ime),
        address_space.get_ie_register(),
        io_registers.privileged_read_register(IoRegister::IF),
        io_registers.read_register(IoRegister::LY),
        opcode_bytes.join(" "),
    )
}

/// Serial sink that appends every transferred byte to a file, for capturing
/// test ROM output. Replies with a disconnected line (0xFF).
pub struct FileSerialSink {
    writer: BufWriter<File>,
}

impl FileSerialSink {
    pub fn new(path: &Path) -> Result<Self, io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { writer: BufWriter::new(file) })
    }
}

impl SerialSink for FileSerialSink {
    fn swap(&mut self, out: u8) -> u8 {
        if let Err(err) = self.writer.write_all(&[out]).and_then(|()| self.writer.flush()) {
            log::error!("Failed to write serial byte to file: {err}");
        }
        0xFF
    }
}
