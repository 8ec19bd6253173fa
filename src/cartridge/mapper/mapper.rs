//! Mapper trait: PRG/CHR address translation, mirroring, and PPU-timed IRQs.

use crate::cartridge::cartridge::Cartridge;
use crate::cartridge::mapper::Mirroring;
use crate::error::EmulationError;
use crate::ppu::Dot;

/// Trait for NES cartridge mappers. CPU/PPU use these for all cartridge address space.
///
/// The CPU bus forwards `$4020–$FFFF` and the PPU forwards `$0000–$1FFF`; the two ranges do not
/// overlap, so one `read`/`write` pair serves both buses.
pub trait Mapper {
    /// Read from PRG ROM/RAM ($4020–$FFFF) or CHR ROM/RAM ($0000–$1FFF).
    fn read(&self, addr: u16) -> Result<u8, EmulationError>;
    /// Write to PRG RAM, CHR RAM, or mapper registers.
    fn write(&mut self, addr: u16, data: u8) -> Result<(), EmulationError>;
    /// Current nametable mirroring for the PPU.
    fn mirroring(&self) -> Mirroring;

    /// Called after every PPU dot.
    fn on_ppu_step(&mut self, _dot: Dot) {}

    /// Take a pending IRQ, if the mapper raised one.
    fn poll_irq(&mut self) -> bool {
        false
    }

    fn cartridge(&self) -> &Cartridge;
    fn cartridge_mut(&mut self) -> &mut Cartridge;
}
