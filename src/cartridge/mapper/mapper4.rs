//! Mapper 4 (MMC3): bank switching, switchable mirroring, optional PRG RAM, scanline IRQ.
//!
//! [MMC3](https://www.nesdev.org/wiki/MMC3): Bank select at $8000–$9FFE (even), bank data at
//! $8001–$9FFF (odd). R0/R1 = 2 KiB CHR, R2–R5 = 1 KiB CHR, R6/R7 = 8 KiB PRG. Mirroring at
//! $A000–$BFFE (even), PRG RAM protect at $A001–$BFFF (odd). IRQ latch $C000, reload $C001,
//! disable $E000, enable $E001. The IRQ counter is clocked once per rendered scanline, at dot 260,
//! which is where the sprite fetches raise CHR A12 with the usual pattern table layout.

use tracing::{debug, trace};

use crate::cartridge::cartridge::Cartridge;
use crate::cartridge::mapper::{Mirroring, mapper::Mapper};
use crate::error::EmulationError;
use crate::ppu::Dot;

const PRG_BANK_8K: usize = 0x2000;
const CHR_BANK_1K: usize = 0x400;
const IRQ_CLOCK_DOT: u16 = 260;

/// MMC3 state: bank registers, mirroring, PRG RAM protect, IRQ counter/latch/enable.
pub struct Mapper4 {
    cart: Cartridge,
    /// Bank select ($8000): bits 0–2 = register index, bit 6 = PRG mode, bit 7 = CHR A12 invert.
    bank_select: u8,
    /// R0–R5 CHR, R6–R7 PRG (R0/R1 are 2 KiB, others 1 KiB / 8 KiB).
    regs: [u8; 8],
    mirroring: Mirroring,
    /// PRG RAM write protect (bit 6 of $A001).
    prg_ram_write_protect: bool,
    /// IRQ latch ($C000), counter, reload flag, enabled ($E001).
    irq_latch: u8,
    irq_counter: u8,
    irq_reload_pending: bool,
    irq_enabled: bool,
    irq_pending: bool,
}

impl Mapper4 {
    pub fn new(cart: Cartridge) -> Self {
        let mirroring = cart.header().mirroring();
        Self {
            cart,
            bank_select: 0,
            regs: [0; 8],
            mirroring,
            prg_ram_write_protect: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload_pending: false,
            irq_enabled: false,
            irq_pending: false,
        }
    }

    fn prg_bank_count(&self) -> usize {
        self.cart.prg_banks() * 2
    }

    /// Number of 1 KiB CHR banks.
    fn chr_bank_count(&self) -> usize {
        (self.cart.chr_len() / CHR_BANK_1K).max(1)
    }

    /// Clock IRQ counter once per scanline.
    fn clock_irq(&mut self) {
        if self.irq_counter == 0 || self.irq_reload_pending {
            self.irq_counter = self.irq_latch;
            self.irq_reload_pending = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            trace!("MMC3: IRQ raised");
            self.irq_pending = true;
        }
    }

    /// 1 KiB CHR bank seen through slot `slot` (0–7, one per KiB of $0000–$1FFF).
    fn chr_bank(&self, slot: usize) -> usize {
        // A12 inversion swaps the 2 KiB half and the 1 KiB half.
        let slot = if self.bank_select & 0x80 != 0 {
            slot ^ 4
        } else {
            slot
        };
        let bank = match slot {
            0 => self.regs[0] & 0xFE,
            1 => self.regs[0] | 0x01,
            2 => self.regs[1] & 0xFE,
            3 => self.regs[1] | 0x01,
            n => self.regs[n - 2],
        };
        bank as usize % self.chr_bank_count()
    }

    fn chr_index(&self, addr: u16) -> usize {
        let slot = (addr as usize >> 10) & 7;
        self.chr_bank(slot) * CHR_BANK_1K + (addr as usize & 0x3FF)
    }

    /// 8 KiB PRG bank seen through window `window` (0–3, one per 8 KiB of $8000–$FFFF).
    fn prg_bank(&self, window: usize) -> usize {
        let count = self.prg_bank_count();
        let last = count - 1;
        let second_last = count.saturating_sub(2);
        let r6 = (self.regs[6] & 0x3F) as usize % count;
        let r7 = (self.regs[7] & 0x3F) as usize % count;
        let swap = self.bank_select & 0x40 != 0;
        match (window, swap) {
            (0, false) | (2, true) => r6,
            (0, true) | (2, false) => second_last,
            (1, _) => r7,
            _ => last,
        }
    }
}

impl Mapper for Mapper4 {
    fn read(&self, addr: u16) -> Result<u8, EmulationError> {
        match addr {
            0x0000..=0x1FFF => self.cart.read_chr(self.chr_index(addr)),
            0x6000..=0x7FFF => self.cart.read_prg_ram((addr - 0x6000) as usize),
            0x8000..=0xFFFF => {
                let window = (addr as usize - 0x8000) >> 13;
                let offset = addr as usize & 0x1FFF;
                self.cart
                    .read_prg_rom(self.prg_bank(window) * PRG_BANK_8K + offset)
            }
            _ => Err(EmulationError::UnmappedCartridgeAddress { addr }),
        }
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), EmulationError> {
        let even = addr & 1 == 0;
        match addr {
            0x0000..=0x1FFF => {
                let index = self.chr_index(addr);
                self.cart.write_chr(addr, index, data)?;
            }
            0x6000..=0x7FFF => {
                if !self.prg_ram_write_protect {
                    self.cart.write_prg_ram((addr - 0x6000) as usize, data)?;
                }
            }
            0x8000..=0x9FFF => {
                if even {
                    self.bank_select = data;
                } else {
                    let r = (self.bank_select & 7) as usize;
                    self.regs[r] = data;
                    trace!("MMC3: R{r} = {data:02X}");
                }
            }
            0xA000..=0xBFFF => {
                if even {
                    self.mirroring = if data & 1 != 0 {
                        Mirroring::Horizontal
                    } else {
                        Mirroring::Vertical
                    };
                    debug!("MMC3: {:?} mirroring", self.mirroring);
                } else {
                    self.prg_ram_write_protect = data & 0x40 != 0;
                }
            }
            0xC000..=0xDFFF => {
                if even {
                    self.irq_latch = data;
                } else {
                    self.irq_reload_pending = true;
                    self.irq_counter = 0;
                }
            }
            0xE000..=0xFFFF => {
                if even {
                    // Disabling also acknowledges a raised IRQ.
                    self.irq_enabled = false;
                    self.irq_pending = false;
                } else {
                    self.irq_enabled = true;
                }
            }
            _ => return Err(EmulationError::UnmappedCartridgeAddress { addr }),
        }
        Ok(())
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn on_ppu_step(&mut self, dot: Dot) {
        let counted_line = dot.scanline < 240 || dot.scanline == 261;
        if dot.rendering && counted_line && dot.dot == IRQ_CLOCK_DOT {
            self.clock_irq();
        }
    }

    fn poll_irq(&mut self) -> bool {
        let p = self.irq_pending;
        self.irq_pending = false;
        p
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
    use crate::cartridge::cartridge::{PRG_BANK_LEN, test_image};

    /// 4 × 16 KiB PRG (8 × 8 KiB banks tagged with their index); 32 KiB CHR (32 × 1 KiB tagged).
    fn mapper() -> Mapper4 {
        let mut prg = vec![0; 7 * PRG_BANK_8K + 1];
        for bank in 0..8 {
            prg[bank * PRG_BANK_8K] = bank as u8;
        }
        assert!(prg.len() <= 4 * PRG_BANK_LEN);
        let image = test_image(4, 4, 4, 0, &prg);
        Mapper4::new(Cartridge::from_bytes(&image).unwrap())
    }

    fn set_reg(m: &mut Mapper4, reg: u8, value: u8) {
        m.write(0x8000, reg).unwrap();
        m.write(0x8001, value).unwrap();
    }

    fn scanline(m: &mut Mapper4, line: u16) {
        for dot in 0..341 {
            m.on_ppu_step(Dot {
                scanline: line,
                dot,
                rendering: true,
            });
        }
    }

    #[test]
    fn prg_banking_modes() {
        let mut m = mapper();
        set_reg(&mut m, 6, 2);
        set_reg(&mut m, 7, 3);
        assert_eq!(m.read(0x8000).unwrap(), 2);
        assert_eq!(m.read(0xA000).unwrap(), 3);
        assert_eq!(m.read(0xC000).unwrap(), 6);
        assert_eq!(m.read(0xE000).unwrap(), 7);

        // PRG mode bit swaps $8000 and $C000.
        m.write(0x8000, 0x40).unwrap();
        assert_eq!(m.read(0x8000).unwrap(), 6);
        assert_eq!(m.read(0xC000).unwrap(), 2);
        assert_eq!(m.read(0xE000).unwrap(), 7);
    }

    #[test]
    fn chr_banking_and_inversion() {
        let mut m = mapper();
        set_reg(&mut m, 0, 5); // 2 KiB, low bit ignored
        set_reg(&mut m, 2, 9);
        assert_eq!(m.read(0x0000).unwrap(), 4);
        assert_eq!(m.read(0x0400).unwrap(), 5);
        assert_eq!(m.read(0x1000).unwrap(), 9);

        m.write(0x8000, 0x80).unwrap();
        assert_eq!(m.read(0x0000).unwrap(), 9);
        assert_eq!(m.read(0x1000).unwrap(), 4);
        assert_eq!(m.read(0x1400).unwrap(), 5);
    }

    #[test]
    fn mirroring_register() {
        let mut m = mapper();
        m.write(0xA000, 1).unwrap();
        assert_eq!(m.mirroring(), Mirroring::Horizontal);
        m.write(0xA000, 0).unwrap();
        assert_eq!(m.mirroring(), Mirroring::Vertical);
    }

    #[test]
    fn prg_ram_write_protect() {
        let mut m = mapper();
        m.write(0x6000, 0x11).unwrap();
        m.write(0xA001, 0xC0).unwrap();
        m.write(0x6000, 0x22).unwrap();
        assert_eq!(m.read(0x6000).unwrap(), 0x11);
    }

    #[test]
    fn irq_fires_after_latch_plus_one_scanlines() {
        let mut m = mapper();
        m.write(0xC000, 3).unwrap();
        m.write(0xC001, 0).unwrap();
        m.write(0xE001, 0).unwrap();

        for line in 0..3 {
            scanline(&mut m, line);
            assert!(!m.poll_irq(), "no IRQ after line {line}");
        }
        scanline(&mut m, 3);
        assert!(m.poll_irq());
        // Taken once.
        assert!(!m.poll_irq());
    }

    #[test]
    fn irq_not_clocked_without_rendering_or_in_vblank() {
        let mut m = mapper();
        m.write(0xC000, 0).unwrap();
        m.write(0xE001, 0).unwrap();
        m.on_ppu_step(Dot {
            scanline: 10,
            dot: IRQ_CLOCK_DOT,
            rendering: false,
        });
        scanline(&mut m, 245);
        assert!(!m.poll_irq());
        scanline(&mut m, 261);
        assert!(m.poll_irq());
    }

    #[test]
    fn disable_acknowledges() {
        let mut m = mapper();
        m.write(0xE001, 0).unwrap();
        scanline(&mut m, 0);
        m.write(0xE000, 0).unwrap();
        assert!(!m.poll_irq());
    }
}
