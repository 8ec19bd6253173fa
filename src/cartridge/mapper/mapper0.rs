//! Mapper 0 (NROM): no bank switching, 16/32KB PRG, 8KB CHR.

use crate::cartridge::cartridge::{Cartridge, PRG_BANK_LEN};
use crate::cartridge::mapper::{Mirroring, mapper::Mapper};
use crate::error::EmulationError;

/// NROM mapper: fixed PRG and CHR, optionally 16KB PRG mirror.
pub struct Mapper0 {
    cart: Cartridge,
}

impl Mapper0 {
    pub fn new(cart: Cartridge) -> Self {
        Self { cart }
    }
}

impl Mapper for Mapper0 {
    fn read(&self, addr: u16) -> Result<u8, EmulationError> {
        match addr {
            // CHR ROM/RAM: $0000-$1FFF
            0x0000..=0x1FFF => self.cart.read_chr(addr as usize),
            0x6000..=0x7FFF => self.cart.read_prg_ram((addr - 0x6000) as usize),
            // PRG ROM: $8000-$FFFF, mirror if 16KB
            0x8000..=0xFFFF => {
                let mut index = (addr - 0x8000) as usize;
                if self.cart.prg_banks() == 1 {
                    index %= PRG_BANK_LEN;
                }
                self.cart.read_prg_rom(index)
            }
            _ => Err(EmulationError::UnmappedCartridgeAddress { addr }),
        }
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), EmulationError> {
        match addr {
            0x0000..=0x1FFF => self.cart.write_chr(addr, addr as usize, data),
            0x6000..=0x7FFF => self.cart.write_prg_ram((addr - 0x6000) as usize, data),
            0x8000..=0xFFFF => Ok(()), // PRG ROM: no writes
            _ => Err(EmulationError::UnmappedCartridgeAddress { addr }),
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.cart.header().mirroring()
    }

    fn cartridge(&self) -> &Cartridge {
        &self.cart
    }

    fn cartridge_mut(&mut self) -> &mut Cartridge {
        &mut self.cart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::cartridge::test_image;

    fn mapper(prg_banks: u8, chr_banks: u8, prg: &[u8]) -> Mapper0 {
        let image = test_image(0, prg_banks, chr_banks, 0, prg);
        Mapper0::new(Cartridge::from_bytes(&image).unwrap())
    }

    #[test]
    fn sixteen_kib_prg_is_mirrored() {
        let m = mapper(1, 1, &[0x11, 0x22]);
        assert_eq!(m.read(0x8000).unwrap(), 0x11);
        assert_eq!(m.read(0xC000).unwrap(), 0x11);
        assert_eq!(m.read(0xC001).unwrap(), 0x22);
    }

    #[test]
    fn thirty_two_kib_prg_is_linear() {
        let mut prg = vec![0; PRG_BANK_LEN + 1];
        prg[PRG_BANK_LEN] = 0x77;
        let m = mapper(2, 1, &prg);
        assert_eq!(m.read(0xC000).unwrap(), 0x77);
        assert_eq!(m.read(0x8000).unwrap(), 0x00);
    }

    #[test]
    fn prg_ram_round_trips() {
        let mut m = mapper(1, 1, &[]);
        m.write(0x6123, 0x42).unwrap();
        assert_eq!(m.read(0x6123).unwrap(), 0x42);
    }

    #[test]
    fn chr_rom_write_fails() {
        let mut m = mapper(1, 1, &[]);
        assert_eq!(
            m.write(0x0040, 1),
            Err(EmulationError::ChrRomWrite { addr: 0x0040 })
        );
    }

    #[test]
    fn chr_ram_write_succeeds() {
        let mut m = mapper(1, 0, &[]);
        m.write(0x1FFF, 0x99).unwrap();
        assert_eq!(m.read(0x1FFF).unwrap(), 0x99);
    }

    #[test]
    fn expansion_area_is_unmapped() {
        let m = mapper(1, 1, &[]);
        assert_eq!(
            m.read(0x5000),
            Err(EmulationError::UnmappedCartridgeAddress { addr: 0x5000 })
        );
    }
}
