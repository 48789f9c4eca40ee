pub mod address;
pub mod ioregisters;
mod mapper;

use crate::memory::ioregisters::IoRegisters;
use crate::memory::mapper::{Mapper, MapperFeatures};
use crate::ppu::{PpuMode, PpuState};
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartridgeLoadError {
    #[error("ROM size must be a positive multiple of 16384 bytes, was {rom_len} bytes")]
    InvalidSize { rom_len: usize },
    #[error("error reading data from {file_path}: {source}")]
    FileReadError {
        file_path: String,
        #[source]
        source: io::Error,
    },
}

// Every licensed cartridge carries this bitmap at 0x0104-0x0133; the boot ROM
// refuses to start if it is wrong. Emulated loading only reports a mismatch.
const EXPECTED_LOGO: [u8; 48] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00,
    0x0D, 0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E, 0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD,
    0xD9, 0x99, 0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E, 0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB,
    0xB9, 0x33, 0x3E,
];

/// Battery-backed cartridge RAM persisted as a flat byte image next to the
/// ROM file.
struct FsRamBattery {
    dirty: bool,
    sav_path: PathBuf,
}

impl FsRamBattery {
    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn persist_ram(&mut self, ram: &[u8]) -> Result<(), io::Error> {
        if !self.dirty {
            return Ok(());
        }

        let tmp_file = self.sav_path.with_extension("sav.tmp");
        fs::write(&tmp_file, ram)?;
        fs::rename(&tmp_file, &self.sav_path)?;

        self.dirty = false;

        Ok(())
    }
}

fn load_sav_file<P: AsRef<Path>>(sav_path: P) -> Option<Vec<u8>> {
    let sav_path = sav_path.as_ref();
    if !fs::metadata(sav_path).map(|metadata| metadata.is_file()).unwrap_or(false) {
        return None;
    }

    match fs::read(sav_path) {
        Ok(ram) => {
            log::info!("Loaded cartridge RAM from {}", sav_path.display());
            Some(ram)
        }
        Err(err) => {
            log::warn!("Unable to read {}, starting with fresh RAM: {err}", sav_path.display());
            None
        }
    }
}

pub struct Cartridge {
    rom: Vec<u8>,
    mapper: Mapper,
    ram: Vec<u8>,
    ram_battery: Option<FsRamBattery>,
}

impl Cartridge {
    /// Create a new Cartridge from the given ROM image.
    ///
    /// Header validation (logo bitmap, header checksum, global checksum) is
    /// reported through the log but never fails the load; the only
    /// `CartridgeLoadError` from this function is an image whose size is not
    /// a positive multiple of the 16 KiB bank size.
    pub fn new(rom: Vec<u8>, sav_path: Option<PathBuf>) -> Result<Self, CartridgeLoadError> {
        if rom.is_empty() || rom.len() % address::ROM_BANK_LEN != 0 {
            return Err(CartridgeLoadError::InvalidSize { rom_len: rom.len() });
        }

        let features = mapper::parse_cartridge_type(rom[address::CARTRIDGE_TYPE as usize]);
        log_header_summary(&rom, features);

        let ram_len = cart_ram_len(rom[address::RAM_SIZE as usize]);
        let ram = match (features.has_battery, &sav_path) {
            (true, Some(sav_path)) => match load_sav_file(sav_path) {
                Some(mut ram) => {
                    ram.resize(ram_len, 0);
                    ram
                }
                None => vec![0; ram_len],
            },
            _ => vec![0; ram_len],
        };

        let ram_battery = match (features.has_battery, sav_path) {
            (true, Some(sav_path)) => {
                log::info!("Persisting cartridge RAM to {}", sav_path.display());
                Some(FsRamBattery { dirty: false, sav_path })
            }
            _ => None,
        };

        let mapper = Mapper::new(rom.len());

        Ok(Self { rom, mapper, ram, ram_battery })
    }

    pub fn from_file(file_path: &str) -> Result<Self, CartridgeLoadError> {
        log::info!("Loading cartridge from '{file_path}'");

        let rom = fs::read(Path::new(file_path)).map_err(|err| {
            CartridgeLoadError::FileReadError { file_path: file_path.into(), source: err }
        })?;

        let sav_path = Path::new(file_path).with_extension("sav");

        Self::new(rom, Some(sav_path))
    }

    /// Read a value from the given ROM address.
    ///
    /// # Panics
    ///
    /// This method will panic if the address is not in \[0x0000, 0x7FFF\].
    pub fn read_rom_address(&self, address: u16) -> u8 {
        self.rom[self.mapper.map_rom_address(address)]
    }

    /// Write a value to the given ROM address, which sets a cartridge
    /// register (bank select / RAM enable) rather than modifying ROM.
    pub fn write_rom_address(&mut self, address: u16, value: u8) {
        self.mapper.write_rom_address(address, value);
    }

    /// Read a value from the given cartridge RAM address. Returns 0xFF when
    /// cartridge RAM is disabled or not present.
    pub fn read_ram_address(&self, address: u16) -> u8 {
        self.mapper
            .map_ram_address(address)
            .and_then(|mapped_address| self.ram.get(mapped_address).copied())
            .unwrap_or(0xFF)
    }

    /// Write a value to the given cartridge RAM address. Dropped when
    /// cartridge RAM is disabled or not present.
    pub fn write_ram_address(&mut self, address: u16, value: u8) {
        let Some(mapped_address) = self.mapper.map_ram_address(address) else {
            return;
        };

        if let Some(ram_value) = self.ram.get_mut(mapped_address) {
            *ram_value = value;
            if let Some(ram_battery) = &mut self.ram_battery {
                ram_battery.mark_dirty();
            }
        }
    }

    /// If this cartridge has battery-backed RAM, write it to disk if it has
    /// changed since the last call.
    pub fn persist_external_ram(&mut self) -> Result<(), io::Error> {
        match &mut self.ram_battery {
            Some(ram_battery) => ram_battery.persist_ram(&self.ram),
            None => Ok(()),
        }
    }
}

fn cart_ram_len(ram_size_code: u8) -> usize {
    match ram_size_code {
        0x00 => 0,
        0x02 => 8 * 1024,
        0x03 => 32 * 1024,
        0x04 => 128 * 1024,
        0x05 => 64 * 1024,
        _ => {
            log::warn!("Unrecognized RAM size code {ram_size_code:02X}h, assuming no RAM");
            0
        }
    }
}

fn header_checksum(rom: &[u8]) -> u8 {
    rom[address::TITLE_START as usize..=0x014C]
        .iter()
        .fold(0u8, |sum, &byte| sum.wrapping_sub(byte).wrapping_sub(1))
}

fn global_checksum(rom: &[u8]) -> u16 {
    rom.iter()
        .enumerate()
        .filter(|&(i, _)| {
            i != address::GLOBAL_CHECKSUM as usize && i != address::GLOBAL_CHECKSUM as usize + 1
        })
        .fold(0u16, |sum, (_, &byte)| sum.wrapping_add(byte.into()))
}

fn log_header_summary(rom: &[u8], features: MapperFeatures) {
    let title_bytes = &rom[address::TITLE_START as usize..=address::TITLE_END as usize];
    let title_len = title_bytes.iter().position(|&b| b == 0).unwrap_or(title_bytes.len());
    let title = String::from_utf8_lossy(&title_bytes[..title_len]).into_owned();

    let logo_ok = rom[address::LOGO_START as usize..address::TITLE_START as usize] == EXPECTED_LOGO;
    let header_ok = header_checksum(rom) == rom[address::HEADER_CHECKSUM as usize];
    let expected_global = u16::from_be_bytes([
        rom[address::GLOBAL_CHECKSUM as usize],
        rom[address::GLOBAL_CHECKSUM as usize + 1],
    ]);
    let global_ok = global_checksum(rom) == expected_global;

    log::info!("Title: {title}");
    log::info!("Size: {} bytes ({} banks)", rom.len(), rom.len() / address::ROM_BANK_LEN);
    log::info!("Cartridge type: {:02X}h ({features})", rom[address::CARTRIDGE_TYPE as usize]);
    log::info!("RAM size code: {:02X}h", rom[address::RAM_SIZE as usize]);
    log::info!("Logo check: {}", if logo_ok { "ok" } else { "MISMATCH" });
    log::info!("Header checksum: {}", if header_ok { "ok" } else { "MISMATCH" });
    log::info!("Global checksum: {}", if global_ok { "ok" } else { "MISMATCH" });
}

pub struct AddressSpace {
    cartridge: Cartridge,
    vram: [u8; address::VRAM_LEN],
    working_ram: [u8; address::WORKING_RAM_LEN],
    oam: [u8; address::OAM_LEN],
    io_registers: IoRegisters,
    hram: [u8; address::HRAM_LEN],
    ie_register: u8,
}

impl AddressSpace {
    pub fn new(cartridge: Cartridge) -> Self {
        Self {
            cartridge,
            vram: [0; address::VRAM_LEN],
            working_ram: [0; address::WORKING_RAM_LEN],
            oam: [0; address::OAM_LEN],
            io_registers: IoRegisters::new(),
            hram: [0; address::HRAM_LEN],
            ie_register: 0,
        }
    }

    fn is_cpu_access_allowed(address: u16, ppu_state: &PpuState) -> bool {
        // Only HRAM is reachable while an OAM DMA transfer is in flight
        if ppu_state.oam_dma_in_progress()
            && !(address::HRAM_START..=address::HRAM_END).contains(&address)
        {
            return false;
        }

        // OAM is locked during OAM scan and pixel transfer
        if ppu_state.enabled()
            && matches!(ppu_state.mode(), PpuMode::ScanningOam | PpuMode::RenderingScanline)
            && (address::OAM_START..=address::OAM_END).contains(&address)
        {
            return false;
        }

        // VRAM is locked during pixel transfer
        !(ppu_state.enabled()
            && ppu_state.mode() == PpuMode::RenderingScanline
            && (address::VRAM_START..=address::VRAM_END).contains(&address))
    }

    /// Read the value at the given address from the perspective of the CPU.
    /// Returns 0xFF if the PPU currently owns the addressed memory.
    pub fn read_address_u8(&self, address: u16, ppu_state: &PpuState) -> u8 {
        if !Self::is_cpu_access_allowed(address, ppu_state) {
            return 0xFF;
        }

        self.read_address_u8_no_access_check(address)
    }

    fn read_address_u8_no_access_check(&self, address: u16) -> u8 {
        match address {
            address @ address::ROM_START..=address::ROM_END => {
                self.cartridge.read_rom_address(address)
            }
            address @ address::VRAM_START..=address::VRAM_END => {
                self.vram[usize::from(address - address::VRAM_START)]
            }
            address @ address::EXTERNAL_RAM_START..=address::EXTERNAL_RAM_END => {
                self.cartridge.read_ram_address(address)
            }
            address @ address::WORKING_RAM_START..=address::WORKING_RAM_END => {
                self.working_ram[usize::from(address - address::WORKING_RAM_START)]
            }
            address @ address::ECHO_RAM_START..=address::ECHO_RAM_END => {
                self.working_ram[usize::from(address - address::ECHO_RAM_START)]
            }
            address @ address::OAM_START..=address::OAM_END => {
                self.oam[usize::from(address - address::OAM_START)]
            }
            address::UNUSABLE_START..=address::UNUSABLE_END => 0xFF,
            address @ address::IO_REGISTERS_START..=address::IO_REGISTERS_END => {
                self.io_registers.read_address(address)
            }
            address @ address::HRAM_START..=address::HRAM_END => {
                self.hram[usize::from(address - address::HRAM_START)]
            }
            address::IE_REGISTER => self.ie_register,
        }
    }

    /// Read the value at the given address and the following address as a
    /// little-endian 16-bit value.
    pub fn read_address_u16(&self, address: u16, ppu_state: &PpuState) -> u16 {
        let lsb = self.read_address_u8(address, ppu_state);
        let msb = self.read_address_u8(address.wrapping_add(1), ppu_state);
        u16::from_le_bytes([lsb, msb])
    }

    /// Assign a value to the given address from the perspective of the CPU.
    /// The write is dropped if the PPU currently owns the addressed memory.
    pub fn write_address_u8(&mut self, address: u16, value: u8, ppu_state: &PpuState) {
        if !Self::is_cpu_access_allowed(address, ppu_state) {
            return;
        }

        self.write_address_u8_no_access_check(address, value);
    }

    fn write_address_u8_no_access_check(&mut self, address: u16, value: u8) {
        match address {
            address @ address::ROM_START..=address::ROM_END => {
                self.cartridge.write_rom_address(address, value);
            }
            address @ address::VRAM_START..=address::VRAM_END => {
                self.vram[usize::from(address - address::VRAM_START)] = value;
            }
            address @ address::EXTERNAL_RAM_START..=address::EXTERNAL_RAM_END => {
                self.cartridge.write_ram_address(address, value);
            }
            address @ address::WORKING_RAM_START..=address::WORKING_RAM_END => {
                self.working_ram[usize::from(address - address::WORKING_RAM_START)] = value;
            }
            address @ address::ECHO_RAM_START..=address::ECHO_RAM_END => {
                self.working_ram[usize::from(address - address::ECHO_RAM_START)] = value;
            }
            address @ address::OAM_START..=address::OAM_END => {
                self.oam[usize::from(address - address::OAM_START)] = value;
            }
            address::UNUSABLE_START..=address::UNUSABLE_END => {}
            address @ address::IO_REGISTERS_START..=address::IO_REGISTERS_END => {
                self.io_registers.write_address(address, value);
            }
            address @ address::HRAM_START..=address::HRAM_END => {
                self.hram[usize::from(address - address::HRAM_START)] = value;
            }
            address::IE_REGISTER => {
                self.ie_register = value;
            }
        }
    }

    /// Assign a 16-bit value to the given address and the following address,
    /// little-endian.
    pub fn write_address_u16(&mut self, address: u16, value: u16, ppu_state: &PpuState) {
        let [lsb, msb] = value.to_le_bytes();
        self.write_address_u8(address, lsb, ppu_state);
        self.write_address_u8(address.wrapping_add(1), msb, ppu_state);
    }

    /// Read an OAM/VRAM byte from the perspective of the PPU, bypassing the
    /// CPU access check.
    ///
    /// # Panics
    ///
    /// This method will panic if the address is not an OAM or VRAM address.
    pub fn ppu_read_address_u8(&self, address: u16) -> u8 {
        match address {
            address @ address::VRAM_START..=address::VRAM_END => {
                self.vram[usize::from(address - address::VRAM_START)]
            }
            address @ address::OAM_START..=address::OAM_END => {
                self.oam[usize::from(address - address::OAM_START)]
            }
            _ => panic!("PPU reads are restricted to OAM and VRAM: {address:04X}h"),
        }
    }

    /// Copy a byte from the given source address into OAM, bypassing access
    /// checks. Used by the OAM DMA transfer.
    pub fn dma_copy_byte(&mut self, src_address: u16, oam_offset: u8) {
        let byte = self.read_address_u8_no_access_check(src_address);
        self.oam[usize::from(oam_offset)] = byte;
    }

    pub fn get_io_registers(&self) -> &IoRegisters {
        &self.io_registers
    }

    pub fn get_io_registers_mut(&mut self) -> &mut IoRegisters {
        &mut self.io_registers
    }

    /// Retrieve the current value of the IE register (interrupts enabled).
    pub fn get_ie_register(&self) -> u8 {
        self.ie_register
    }

    pub fn persist_cartridge_ram(&mut self) -> Result<(), io::Error> {
        self.cartridge.persist_external_ram()
    }
}
