//! NES mappers for PRG/CHR memory mapping.
//!
//! Mapper0 (NROM), Mapper1 (MMC1), Mapper2 (UxROM), Mapper4 (MMC3), and common types.

use tracing::info;

use crate::cartridge::cartridge::Cartridge;
use crate::error::CartridgeError;

pub mod mapper;

pub mod mapper0;
pub mod mapper1;
pub mod mapper2;
pub mod mapper4;

pub use mapper::Mapper;

/// Nametable mirroring mode for PPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenLower,
    SingleScreenUpper,
}

impl Mirroring {
    /// Which of the two 1 KiB VRAM banks backs logical nametable `table` (0–3).
    pub fn bank(self, table: u16) -> u16 {
        match self {
            Mirroring::Horizontal => (table >> 1) & 1,
            Mirroring::Vertical => table & 1,
            Mirroring::SingleScreenLower => 0,
            Mirroring::SingleScreenUpper => 1,
        }
    }
}

/// Build the mapper named in the cartridge header. Takes ownership of the cartridge.
pub fn new_mapper(cart: Cartridge) -> Result<Box<dyn Mapper>, CartridgeError> {
    let number = cart.header().mapper;
    let mapper: Box<dyn Mapper> = match number {
        0 => Box::new(mapper0::Mapper0::new(cart)),
        1 => Box::new(mapper1::Mapper1::new(cart)),
        2 => Box::new(mapper2::Mapper2::new(cart)),
        4 => Box::new(mapper4::Mapper4::new(cart)),
        n => return Err(CartridgeError::UnsupportedMapper(n)),
    };
    info!("using mapper {number}");
    Ok(mapper)
}
