//! NES cartridge loading and mapper support.
//!
//! - **cartridge**: Loads iNES (.nes) images, holds PRG ROM, CHR ROM/RAM and PRG RAM.
//! - **mapper**: NROM (0), MMC1 (1), UxROM (2), MMC3 (4); PRG/CHR bank switching and nametable mirroring.

pub mod cartridge;
pub mod mapper;

pub use cartridge::{Cartridge, Header};
pub use mapper::{Mapper, Mirroring};
