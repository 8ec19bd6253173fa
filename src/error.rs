//! Error types.
//!
//! A [`CartridgeError`] means the image was rejected and the console never started.
//! An [`EmulationError`] means a running console hit a state it cannot continue from.

use std::io;

use thiserror::Error;

/// Raised while parsing an iNES image or selecting its mapper.
#[derive(Debug, Error)]
pub enum CartridgeError {
    /// The buffer is shorter than the 16-byte header.
    #[error("header expected 16 bytes, got {actual}")]
    TooShort { actual: usize },
    /// The first four bytes are not `NES\x1A`.
    #[error("missing NES magic bytes (found {found:02X?})")]
    InvalidMagic { found: [u8; 4] },
    /// A trainer/PRG/CHR section is shorter than the header advertises.
    #[error("{section} section expected {expected} bytes, got {actual}")]
    SectionTooShort {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The header advertises zero PRG ROM banks.
    #[error("cartridge has no PRG ROM")]
    NoPrgRom,
    /// The header names a mapper this crate does not implement.
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
    #[error("i/o error while reading cartridge: {0}")]
    Io(#[from] io::Error),
    /// Reading the reset vector failed.
    #[error("cartridge failed to boot: {0}")]
    Boot(#[from] EmulationError),
}

/// Region of the cartridge store an index pointed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    PrgRom,
    PrgRam,
    Chr,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Region::PrgRom => "PRG ROM",
            Region::PrgRam => "PRG RAM",
            Region::Chr => "CHR",
        };
        f.write_str(name)
    }
}

/// Fatal condition hit while the console is running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmulationError {
    #[error("illegal opcode ${opcode:02X} at ${pc:04X}")]
    IllegalOpcode { opcode: u8, pc: u16 },
    /// A cartridge-range address the mapper has nothing wired to.
    #[error("mapper has nothing mapped at ${addr:04X}")]
    UnmappedCartridgeAddress { addr: u16 },
    #[error("invalid PPU memory access at ${addr:04X}")]
    InvalidPpuAccess { addr: u16 },
    #[error("attempted write to CHR ROM at ${addr:04X}")]
    ChrRomWrite { addr: u16 },
    /// A mapper computed an index past the end of the cartridge store.
    #[error("{region} index {index:#X} out of range")]
    CartridgeIndex { region: Region, index: usize },
}
