use crate::memory::address;

/// Capabilities advertised by the cartridge type byte at 0x0147.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperFeatures {
    pub has_ram: bool,
    pub has_battery: bool,
}

impl std::fmt::Display for MapperFeatures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ram={}, battery={}", self.has_ram, self.has_battery)
    }
}

/// Decode the cartridge type byte. Unrecognized values are treated as
/// ROM-only with a warning; cartridge type never gates loading.
pub fn parse_cartridge_type(cartridge_type: u8) -> MapperFeatures {
    match cartridge_type {
        // ROM only / plain MBCs
        0x00 | 0x01 | 0x11 | 0x19 => MapperFeatures { has_ram: false, has_battery: false },
        // MBC variants with RAM
        0x02 | 0x08 | 0x12 | 0x1A => MapperFeatures { has_ram: true, has_battery: false },
        // MBC variants with RAM + battery
        0x03 | 0x09 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E => {
            MapperFeatures { has_ram: true, has_battery: true }
        }
        _ => {
            log::warn!("Unrecognized cartridge type {cartridge_type:02X}h, treating as ROM only");
            MapperFeatures { has_ram: false, has_battery: false }
        }
    }
}

/// The cartridge-side bank select logic: ROM bank switching, cartridge RAM
/// bank switching, and the cartridge RAM enable gate, all driven by writes
/// into ROM address space.
#[derive(Debug, Clone)]
pub struct Mapper {
    rom_bank: u16,
    rom_bank_count: u16,
    ram_bank: u8,
    ram_enabled: bool,
}

impl Mapper {
    /// # Panics
    ///
    /// Panics if `rom_len` is not a positive multiple of the 16 KiB bank
    /// size; `Cartridge::new` validates this before constructing a mapper.
    pub fn new(rom_len: usize) -> Self {
        assert!(
            rom_len > 0 && rom_len % address::ROM_BANK_LEN == 0,
            "ROM length must be a positive multiple of {}, was {rom_len}",
            address::ROM_BANK_LEN
        );

        Self {
            rom_bank: 1,
            rom_bank_count: (rom_len / address::ROM_BANK_LEN) as u16,
            ram_bank: 0,
            ram_enabled: false,
        }
    }

    /// Map a CPU address in 0x0000-0x7FFF to an offset into the ROM image.
    ///
    /// # Panics
    ///
    /// Panics if the address is outside of ROM address space.
    pub fn map_rom_address(&self, address: u16) -> usize {
        assert!(address <= address::ROM_END, "not a ROM address: {address:04X}h");

        if address < address::SWITCHABLE_ROM_START {
            usize::from(address)
        } else {
            usize::from(self.rom_bank) * address::ROM_BANK_LEN
                + usize::from(address - address::SWITCHABLE_ROM_START)
        }
    }

    /// Handle a CPU write into ROM address space, which sets one of the
    /// cartridge registers.
    pub fn write_rom_address(&mut self, address: u16, value: u8) {
        match address {
            // RAM enable gate; only a low nibble of 0xA enables
            0x0000..=0x1FFF => {
                self.ram_enabled = value & 0x0F == 0x0A;
            }
            // ROM bank select; bank 0 is fixed so 0 selects 1
            0x2000..=0x3FFF => {
                let mut bank = u16::from(value);
                if bank == 0 {
                    bank = 1;
                }
                if bank >= self.rom_bank_count {
                    log::warn!(
                        "ROM bank {bank} selected but cartridge only has {} banks, wrapping",
                        self.rom_bank_count
                    );
                }
                self.rom_bank = bank % self.rom_bank_count;
            }
            // Cartridge RAM bank select
            0x4000..=0x5FFF => {
                self.ram_bank = value & 0x03;
            }
            _ => {
                log::debug!("Ignoring write to ROM address {address:04X}h (value {value:02X}h)");
            }
        }
    }

    /// Map a CPU address in 0xA000-0xBFFF to an offset into cartridge RAM.
    /// Returns None when cartridge RAM is disabled.
    pub fn map_ram_address(&self, address: u16) -> Option<usize> {
        if !self.ram_enabled {
            return None;
        }

        Some(
            usize::from(self.ram_bank) * address::CART_RAM_BANK_LEN
                + usize::from(address - address::EXTERNAL_RAM_START),
        )
    }
}
