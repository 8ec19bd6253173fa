//! Mapper 2 (UxROM): one switchable 16 KiB PRG bank, last bank fixed, 8 KiB CHR RAM or ROM.
//!
//! [UxROM](https://www.nesdev.org/wiki/UxROM): any write to $8000–$FFFF selects the bank seen at
//! $8000–$BFFF. $C000–$FFFF always shows the last bank. There is no PRG RAM.

use tracing::trace;

use crate::cartridge::cartridge::{Cartridge, PRG_BANK_LEN};
use crate::cartridge::mapper::{Mirroring, mapper::Mapper};
use crate::error::EmulationError;

pub struct Mapper2 {
    cart: Cartridge,
    /// Bank mapped at $8000.
    bank: usize,
}

impl Mapper2 {
    pub fn new(cart: Cartridge) -> Self {
        Self { cart, bank: 0 }
    }

    fn last_bank(&self) -> usize {
        self.cart.prg_banks() - 1
    }
}

impl Mapper for Mapper2 {
    fn read(&self, addr: u16) -> Result<u8, EmulationError> {
        match addr {
            0x0000..=0x1FFF => self.cart.read_chr(addr as usize),
            // No PRG RAM on the board.
            0x6000..=0x7FFF => Ok(0),
            0x8000..=0xBFFF => self
                .cart
                .read_prg_rom(self.bank * PRG_BANK_LEN + (addr - 0x8000) as usize),
            0xC000..=0xFFFF => self
                .cart
                .read_prg_rom(self.last_bank() * PRG_BANK_LEN + (addr - 0xC000) as usize),
            _ => Err(EmulationError::UnmappedCartridgeAddress { addr }),
        }
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), EmulationError> {
        match addr {
            0x0000..=0x1FFF => self.cart.write_chr(addr, addr as usize, data),
            0x6000..=0x7FFF => Ok(()),
            0x8000..=0xFFFF => {
                self.bank = (data & 0x0F) as usize % self.cart.prg_banks();
                trace!("UxROM: PRG bank {} at $8000", self.bank);
                Ok(())
            }
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

    /// Four banks, each starting with its own index.
    fn mapper() -> Mapper2 {
        let mut prg = vec![0; 3 * PRG_BANK_LEN + 1];
        for bank in 0..4 {
            prg[bank * PRG_BANK_LEN] = bank as u8;
        }
        let image = test_image(2, 4, 0, 0b01, &prg);
        Mapper2::new(Cartridge::from_bytes(&image).unwrap())
    }

    #[test]
    fn last_bank_is_fixed() {
        let mut m = mapper();
        assert_eq!(m.read(0xC000).unwrap(), 3);
        m.write(0x8000, 1).unwrap();
        assert_eq!(m.read(0xC000).unwrap(), 3);
    }

    #[test]
    fn switches_low_bank() {
        let mut m = mapper();
        assert_eq!(m.read(0x8000).unwrap(), 0);
        m.write(0xFFFF, 2).unwrap();
        assert_eq!(m.read(0x8000).unwrap(), 2);
        // Bank number wraps to the bank count.
        m.write(0x8000, 0x05).unwrap();
        assert_eq!(m.read(0x8000).unwrap(), 1);
    }

    #[test]
    fn prg_ram_window_reads_zero() {
        let mut m = mapper();
        m.write(0x6000, 0xFF).unwrap();
        assert_eq!(m.read(0x6000).unwrap(), 0);
        assert_eq!(m.mirroring(), Mirroring::Vertical);
    }
}
