//! PPU address space.
//!
//! See [PPU memory map](https://www.nesdev.org/wiki/PPU_memory_map):
//! $0000–$1FFF pattern tables (cartridge), $2000–$2FFF nametables (2 KiB internal VRAM,
//! mirrored per the mapper), $3000–$3EFF mirror of $2000–$2EFF, $3F00–$3FFF palette RAM.

use crate::cartridge::mapper::Mapper;
use crate::error::EmulationError;

/// Internal VRAM and palette RAM. Pattern table accesses go to the mapper passed in.
pub struct PpuMemory {
    /// Two physical 1 KiB nametables.
    vram: [u8; 0x800],
    /// Palette RAM $3F00-$3F1F.
    palette: [u8; 32],
}

impl Default for PpuMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl PpuMemory {
    pub fn new() -> Self {
        Self {
            vram: [0; 0x800],
            palette: [0; 32],
        }
    }

    pub fn read(&self, addr: u16, mapper: &dyn Mapper) -> Result<u8, EmulationError> {
        match addr {
            0x0000..=0x1FFF => mapper.read(addr),
            0x2000..=0x3EFF => Ok(self.vram[Self::vram_index(addr, mapper)]),
            0x3F00..=0x3FFF => Ok(self.palette[Self::palette_index(addr)]),
            _ => Err(EmulationError::InvalidPpuAccess { addr }),
        }
    }

    pub fn write(&mut self, addr: u16, data: u8, mapper: &mut dyn Mapper) -> Result<(), EmulationError> {
        match addr {
            0x0000..=0x1FFF => mapper.write(addr, data),
            0x2000..=0x3EFF => {
                self.vram[Self::vram_index(addr, mapper)] = data;
                Ok(())
            }
            // Upper 2 bits do not exist in palette RAM.
            0x3F00..=0x3FFF => {
                self.palette[Self::palette_index(addr)] = data & 0x3F;
                Ok(())
            }
            _ => Err(EmulationError::InvalidPpuAccess { addr }),
        }
    }

    /// Palette RAM read; `addr` is taken modulo 32 like any $3F00–$3FFF access.
    pub fn read_palette(&self, addr: u16) -> u8 {
        self.palette[Self::palette_index(addr)]
    }

    /// Map a nametable address ($2000–$3EFF) to the internal 2 KiB index using mirroring.
    fn vram_index(addr: u16, mapper: &dyn Mapper) -> usize {
        let offset = (addr - 0x2000) & 0x0FFF;
        let table = offset / 0x400;
        let bank = mapper.mirroring().bank(table);
        (bank * 0x400 + (offset & 0x3FF)) as usize
    }

    /// Resolve a palette address to its 32-byte index.
    /// $3F10, $3F14, $3F18, $3F1C mirror $3F00, $3F04, $3F08, $3F0C.
    fn palette_index(addr: u16) -> usize {
        let i = (addr & 0x1F) as usize;
        if i >= 16 && i % 4 == 0 { i - 16 } else { i }
    }
}
