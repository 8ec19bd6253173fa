//! NES cartridge loading from iNES format (.nes files).
//!
//! Implements the [iNES](https://www.nesdev.org/wiki/INES) format: 16-byte header (magic "NES\x1A",
//! PRG size in 16 KiB units, CHR size in 8 KiB units, flags 6–7 for mapper, etc.), an optional
//! 512-byte trainer, then PRG ROM, then CHR ROM. A CHR size of zero means the board carries 8 KiB
//! of CHR RAM instead.
//!
//! [`Cartridge`] is only the byte store. Bank switching lives in the
//! [mapper](crate::cartridge::mapper), which is the only thing allowed to index into it.

use std::fs;
use std::path::Path;

use bitflags::bitflags;
use tracing::{debug, info};

use crate::cartridge::mapper::Mirroring;
use crate::error::{CartridgeError, EmulationError, Region};

pub const HEADER_LEN: usize = 16;
pub const TRAINER_LEN: usize = 512;
pub const PRG_BANK_LEN: usize = 16 * 1024;
pub const CHR_BANK_LEN: usize = 8 * 1024;
pub const PRG_RAM_LEN: usize = 8 * 1024;

const MAGIC: [u8; 4] = *b"NES\x1A";
/// The trainer is mapped at $7000, i.e. offset $1000 into PRG RAM.
const TRAINER_RAM_OFFSET: usize = 0x1000;

bitflags! {
    /// iNES header byte 6.
    ///
    /// ```text
    /// 7654 3210
    /// NNNN FTBM
    /// ```
    /// - `M`: 0 = horizontal, 1 = vertical nametable mirroring
    /// - `B`: battery-backed PRG RAM at $6000-$7FFF
    /// - `T`: 512-byte trainer before PRG data
    /// - `F`: four-screen VRAM
    /// - `NNNN`: low nibble of the mapper number
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags6: u8 {
        const VERTICAL_MIRRORING = 0b0000_0001;
        const BATTERY = 0b0000_0010;
        const TRAINER = 0b0000_0100;
        const FOUR_SCREEN = 0b0000_1000;
        const MAPPER_LOW = 0b1111_0000;
    }
}

/// Parsed iNES header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Number of 16 KiB PRG ROM banks.
    pub prg_banks: u8,
    /// Number of 8 KiB CHR ROM banks; zero means CHR RAM.
    pub chr_banks: u8,
    pub flags6: Flags6,
    pub mapper: u8,
}

impl Header {
    /// Parse the first 16 bytes of an image.
    pub fn parse(bytes: &[u8]) -> Result<Self, CartridgeError> {
        if bytes.len() < HEADER_LEN {
            return Err(CartridgeError::TooShort {
                actual: bytes.len(),
            });
        }

        let found = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if found != MAGIC {
            return Err(CartridgeError::InvalidMagic { found });
        }

        let flags6 = Flags6::from_bits_truncate(bytes[6]);
        let flags7 = bytes[7];
        // Mapper number: high nibble of flags 7, low nibble from the top of flags 6.
        let mapper = (flags7 & 0xF0) | (bytes[6] >> 4);

        Ok(Self {
            prg_banks: bytes[4],
            chr_banks: bytes[5],
            flags6,
            mapper,
        })
    }

    /// Mirroring soldered on the board (used by mappers without mirroring control).
    pub fn mirroring(&self) -> Mirroring {
        if self.flags6.contains(Flags6::VERTICAL_MIRRORING) {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    pub fn has_battery(&self) -> bool {
        self.flags6.contains(Flags6::BATTERY)
    }

    pub fn has_trainer(&self) -> bool {
        self.flags6.contains(Flags6::TRAINER)
    }

    pub fn uses_chr_ram(&self) -> bool {
        self.chr_banks == 0
    }
}

/// Cartridge store: PRG ROM, CHR ROM or RAM, and 8 KiB of PRG RAM.
pub struct Cartridge {
    header: Header,
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    prg_ram: Vec<u8>,
}

impl Cartridge {
    /// Load a cartridge from an iNES file on disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        info!("loading ROM {}", path.display());
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parse an in-memory iNES image.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        let header = Header::parse(data)?;
        if header.prg_banks == 0 {
            return Err(CartridgeError::NoPrgRom);
        }

        let mut offset = HEADER_LEN;
        let mut prg_ram = vec![0; PRG_RAM_LEN];

        if header.has_trainer() {
            let trainer = section(data, offset, TRAINER_LEN, "trainer")?;
            prg_ram[TRAINER_RAM_OFFSET..TRAINER_RAM_OFFSET + TRAINER_LEN].copy_from_slice(trainer);
            offset += TRAINER_LEN;
            info!("cartridge contains a 512 byte trainer");
        }

        let prg_len = header.prg_banks as usize * PRG_BANK_LEN;
        let prg_rom = section(data, offset, prg_len, "PRG ROM")?.to_vec();
        offset += prg_len;

        let chr = if header.uses_chr_ram() {
            vec![0; CHR_BANK_LEN]
        } else {
            let chr_len = header.chr_banks as usize * CHR_BANK_LEN;
            section(data, offset, chr_len, "CHR ROM")?.to_vec()
        };

        info!(
            "{} KiB PRG ROM, {}, mapper {}, {:?} mirroring",
            16 * header.prg_banks as usize,
            if header.uses_chr_ram() {
                "8 KiB CHR RAM".to_string()
            } else {
                format!("{} KiB CHR ROM", 8 * header.chr_banks as usize)
            },
            header.mapper,
            header.mirroring(),
        );
        if header.has_battery() {
            info!("cartridge contains battery backed persistent memory");
        }

        Ok(Self {
            header,
            prg_rom,
            chr,
            prg_ram,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of 16 KiB PRG ROM banks.
    pub fn prg_banks(&self) -> usize {
        self.header.prg_banks as usize
    }

    /// Size of CHR memory in bytes (8 KiB when CHR RAM is used).
    pub fn chr_len(&self) -> usize {
        self.chr.len()
    }

    pub fn uses_chr_ram(&self) -> bool {
        self.header.uses_chr_ram()
    }

    pub fn read_prg_rom(&self, index: usize) -> Result<u8, EmulationError> {
        self.prg_rom
            .get(index)
            .copied()
            .ok_or(EmulationError::CartridgeIndex {
                region: Region::PrgRom,
                index,
            })
    }

    pub fn read_prg_ram(&self, index: usize) -> Result<u8, EmulationError> {
        self.prg_ram
            .get(index)
            .copied()
            .ok_or(EmulationError::CartridgeIndex {
                region: Region::PrgRam,
                index,
            })
    }

    pub fn write_prg_ram(&mut self, index: usize, data: u8) -> Result<(), EmulationError> {
        let slot = self
            .prg_ram
            .get_mut(index)
            .ok_or(EmulationError::CartridgeIndex {
                region: Region::PrgRam,
                index,
            })?;
        *slot = data;
        Ok(())
    }

    pub fn read_chr(&self, index: usize) -> Result<u8, EmulationError> {
        self.chr.get(index).copied().ok_or(EmulationError::CartridgeIndex {
            region: Region::Chr,
            index,
        })
    }

    /// Write CHR memory. `addr` is the PPU address that produced `index` and is only used
    /// for the error report when the cartridge carries CHR ROM.
    pub fn write_chr(&mut self, addr: u16, index: usize, data: u8) -> Result<(), EmulationError> {
        if !self.uses_chr_ram() {
            return Err(EmulationError::ChrRomWrite { addr });
        }
        let slot = self.chr.get_mut(index).ok_or(EmulationError::CartridgeIndex {
            region: Region::Chr,
            index,
        })?;
        *slot = data;
        Ok(())
    }

    /// PRG RAM contents when the board keeps them alive with a battery.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.header.has_battery().then_some(self.prg_ram.as_slice())
    }

    /// Restore battery-backed PRG RAM from a previous session. Extra bytes are ignored.
    pub fn load_battery_ram(&mut self, data: &[u8]) {
        if !self.header.has_battery() {
            return;
        }
        let len = data.len().min(self.prg_ram.len());
        self.prg_ram[..len].copy_from_slice(&data[..len]);
        debug!("restored {len} bytes of battery RAM");
    }
}

fn section<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    name: &'static str,
) -> Result<&'a [u8], CartridgeError> {
    data.get(offset..offset + len)
        .ok_or(CartridgeError::SectionTooShort {
            section: name,
            expected: len,
            actual: data.len().saturating_sub(offset),
        })
}

/// Build an iNES image in memory: `prg` is padded to `prg_banks` 16 KiB banks and the
/// reset vector is pointed at $8000 unless the caller already wrote one.
#[cfg(test)]
pub(crate) fn test_image(mapper: u8, prg_banks: u8, chr_banks: u8, flags6: u8, prg: &[u8]) -> Vec<u8> {
    let mut image = vec![
        b'N',
        b'E',
        b'S',
        0x1A,
        prg_banks,
        chr_banks,
        flags6 | (mapper << 4),
        mapper & 0xF0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
    ];
    let mut prg_rom = vec![0xEA; prg_banks as usize * PRG_BANK_LEN];
    prg_rom[..prg.len()].copy_from_slice(prg);
    let len = prg_rom.len();
    if prg_rom[len - 4] == 0xEA && prg_rom[len - 3] == 0xEA {
        prg_rom[len - 4] = 0x00;
        prg_rom[len - 3] = 0x80;
    }
    image.extend_from_slice(&prg_rom);
    for bank in 0..chr_banks as usize {
        // Fill each 1 KiB of CHR with its own index so bank switching is observable.
        for kb in 0..8 {
            image.extend(std::iter::repeat_n((bank * 8 + kb) as u8, 1024));
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_fields() {
        let image = test_image(0x41, 2, 1, 0b0000_0011, &[]);
        let cart = Cartridge::from_bytes(&image).unwrap();
        let header = cart.header();
        assert_eq!(header.mapper, 0x41);
        assert_eq!(header.prg_banks, 2);
        assert_eq!(header.chr_banks, 1);
        assert_eq!(header.mirroring(), Mirroring::Vertical);
        assert!(header.has_battery());
        assert!(!header.has_trainer());
        assert_eq!(cart.chr_len(), CHR_BANK_LEN);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut image = test_image(0, 1, 1, 0, &[]);
        image[3] = 0x00;
        assert!(matches!(
            Cartridge::from_bytes(&image),
            Err(CartridgeError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn rejects_truncated_sections() {
        let image = test_image(0, 1, 1, 0, &[]);
        let truncated = &image[..HEADER_LEN + PRG_BANK_LEN + 100];
        match Cartridge::from_bytes(truncated) {
            Err(CartridgeError::SectionTooShort {
                section, expected, ..
            }) => {
                assert_eq!(section, "CHR ROM");
                assert_eq!(expected, CHR_BANK_LEN);
            }
            _ => panic!("expected a short CHR section"),
        }
        assert!(matches!(
            Cartridge::from_bytes(&image[..10]),
            Err(CartridgeError::TooShort { actual: 10 })
        ));
    }

    #[test]
    fn zero_chr_banks_allocates_chr_ram() {
        let image = test_image(0, 1, 0, 0, &[]);
        let mut cart = Cartridge::from_bytes(&image).unwrap();
        assert!(cart.uses_chr_ram());
        cart.write_chr(0x0010, 0x10, 0xAB).unwrap();
        assert_eq!(cart.read_chr(0x10).unwrap(), 0xAB);
    }

    #[test]
    fn chr_rom_rejects_writes() {
        let image = test_image(0, 1, 1, 0, &[]);
        let mut cart = Cartridge::from_bytes(&image).unwrap();
        assert_eq!(
            cart.write_chr(0x0123, 0x123, 1),
            Err(EmulationError::ChrRomWrite { addr: 0x0123 })
        );
    }

    #[test]
    fn trainer_lands_at_7000() {
        let mut image = test_image(0, 1, 1, 0b0000_0100, &[]);
        let trainer = [0x5A; TRAINER_LEN];
        image.splice(HEADER_LEN..HEADER_LEN, trainer);
        let cart = Cartridge::from_bytes(&image).unwrap();
        assert_eq!(cart.read_prg_ram(TRAINER_RAM_OFFSET).unwrap(), 0x5A);
        assert_eq!(cart.read_prg_ram(TRAINER_RAM_OFFSET - 1).unwrap(), 0x00);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let image = test_image(0, 1, 1, 0, &[]);
        let cart = Cartridge::from_bytes(&image).unwrap();
        assert_eq!(
            cart.read_prg_rom(PRG_BANK_LEN),
            Err(EmulationError::CartridgeIndex {
                region: Region::PrgRom,
                index: PRG_BANK_LEN
            })
        );
    }

    #[test]
    fn battery_ram_only_with_battery_flag() {
        let plain = Cartridge::from_bytes(&test_image(0, 1, 1, 0, &[])).unwrap();
        assert!(plain.battery_ram().is_none());

        let mut backed = Cartridge::from_bytes(&test_image(0, 1, 1, 0b10, &[])).unwrap();
        backed.load_battery_ram(&[1, 2, 3]);
        assert_eq!(&backed.battery_ram().unwrap()[..3], &[1, 2, 3]);
    }
}
