//! Mapper 1 (MMC1): bank switching via 5-bit shift register.
//!
//! [MMC1](https://www.nesdev.org/wiki/MMC1): writes to $8000–$9FFF (control), $A000–$BFFF (CHR0),
//! $C000–$DFFF (CHR1), $E000–$FFFF (PRG bank). Any write with bit 7 set resets the shift register.
//! Otherwise, bit 0 is shifted in (LSB first); after 5 writes, the value is latched to the selected
//! register. Control (bits 0–1) = mirroring; bits 2–3 = PRG mode; bit 4 = CHR mode.

use tracing::debug;

use crate::cartridge::cartridge::{Cartridge, PRG_BANK_LEN};
use crate::cartridge::mapper::{Mirroring, mapper::Mapper};
use crate::error::EmulationError;

const CHR_BANK_4K: usize = 0x1000;

/// MMC1 state: 5-bit shift register, control byte (mirroring + PRG/CHR mode), bank selects.
pub struct Mapper1 {
    cart: Cartridge,
    shift_reg: u8,
    shift_count: u8,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
}

impl Mapper1 {
    /// Control defaults to $0C (PRG mode 3: $8000 switchable, $C000 fixed last).
    pub fn new(cart: Cartridge) -> Self {
        Self {
            cart,
            shift_reg: 0,
            shift_count: 0,
            control: 0x0C,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
        }
    }

    /// PRG bank mode from control bits 2–3: 0/1 = 32 KiB mode; 2 = $8000 fixed first, $C000 switchable; 3 = $8000 switchable, $C000 fixed last.
    fn prg_bank_mode(&self) -> u8 {
        (self.control >> 2) & 0b11
    }

    /// CHR bank mode from control bit 4: false = one 8 KiB bank, true = two 4 KiB banks.
    fn chr_4k_mode(&self) -> bool {
        self.control & 0x10 != 0
    }

    /// 16 KiB PRG banks mapped at $8000 and $C000.
    fn prg_banks(&self) -> (usize, usize) {
        let count = self.cart.prg_banks();
        let select = (self.prg_bank & 0x0F) as usize;
        let (low, high) = match self.prg_bank_mode() {
            0 | 1 => {
                let base = select & !1;
                (base, base + 1)
            }
            2 => (0, select),
            _ => (select, count - 1),
        };
        (low % count, high % count)
    }

    /// Store index of CHR address `addr` ($0000–$1FFF).
    fn chr_index(&self, addr: u16) -> usize {
        let count = (self.cart.chr_len() / CHR_BANK_4K).max(1);
        let high_half = addr >= 0x1000;
        let bank = if self.chr_4k_mode() {
            if high_half {
                self.chr_bank1 as usize
            } else {
                self.chr_bank0 as usize
            }
        } else {
            // Lowest bit ignored in 8 KiB mode.
            (self.chr_bank0 & 0x1E) as usize + high_half as usize
        };
        (bank % count) * CHR_BANK_4K + (addr as usize & 0x0FFF)
    }

    fn commit(&mut self, addr: u16, value: u8) {
        match addr {
            0x8000..=0x9FFF => self.control = value,
            0xA000..=0xBFFF => self.chr_bank0 = value,
            0xC000..=0xDFFF => self.chr_bank1 = value,
            _ => self.prg_bank = value,
        }
        debug!(
            "MMC1: control={:02X} chr0={:02X} chr1={:02X} prg={:02X}",
            self.control, self.chr_bank0, self.chr_bank1, self.prg_bank
        );
    }
}

impl Mapper for Mapper1 {
    fn read(&self, addr: u16) -> Result<u8, EmulationError> {
        match addr {
            0x0000..=0x1FFF => self.cart.read_chr(self.chr_index(addr)),
            0x6000..=0x7FFF => self.cart.read_prg_ram((addr - 0x6000) as usize),
            // PRG: bank mode and prg_bank select which 16 KiB bank(s) appear at $8000 and $C000.
            0x8000..=0xFFFF => {
                let (low, high) = self.prg_banks();
                let bank = if addr < 0xC000 { low } else { high };
                self.cart
                    .read_prg_rom(bank * PRG_BANK_LEN + (addr as usize & 0x3FFF))
            }
            _ => Err(EmulationError::UnmappedCartridgeAddress { addr }),
        }
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), EmulationError> {
        match addr {
            0x0000..=0x1FFF => {
                let index = self.chr_index(addr);
                self.cart.write_chr(addr, index, data)
            }
            0x6000..=0x7FFF => self.cart.write_prg_ram((addr - 0x6000) as usize, data),
            0x8000..=0xFFFF => {
                // Bit 7 set resets the shift register and forces PRG mode 3.
                if data & 0x80 != 0 {
                    self.shift_reg = 0;
                    self.shift_count = 0;
                    self.control |= 0x0C;
                    return Ok(());
                }

                // Shift in LSB (bit 0); after 5 writes, latch to the register selected by address.
                self.shift_reg >>= 1;
                self.shift_reg |= (data & 1) << 4;
                self.shift_count += 1;

                if self.shift_count == 5 {
                    let value = self.shift_reg & 0x1F;
                    self.commit(addr, value);
                    self.shift_reg = 0;
                    self.shift_count = 0;
                }
                Ok(())
            }
            _ => Err(EmulationError::UnmappedCartridgeAddress { addr }),
        }
    }

    /// Mirroring from control bits 0–1: 0 = one-screen lower, 1 = one-screen upper, 2 = vertical, 3 = horizontal.
    fn mirroring(&self) -> Mirroring {
        match self.control & 0b11 {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    fn cartridge(&self) -> &Cartridge {
        &self.cart
    }

    fn cartridge_mut(&mut self) -> &mut Cartridge {
        &mut self.cart
    }
}
