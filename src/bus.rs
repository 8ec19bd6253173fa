//! Memory bus and address decoding for the NES.
//!
//! Maps CPU addresses to RAM, PPU registers, OAM DMA, controllers, and the cartridge mapper.
//! See [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map).

use tracing::trace;

use crate::cartridge::mapper::Mapper;
use crate::controller::Controller;
use crate::error::EmulationError;
use crate::ppu::ppu::PPU;

/// Trait for memory-mapped I/O and bus access used by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> Result<u8, EmulationError>;
    fn write(&mut self, addr: u16, data: u8) -> Result<(), EmulationError>;

    /// Take the "OAM DMA happened" signal raised by a $4014 write.
    fn poll_dma(&mut self) -> bool {
        false
    }

    /// Little-endian 16-bit read.
    fn read_u16(&mut self, addr: u16) -> Result<u16, EmulationError> {
        let lo = self.read(addr)? as u16;
        let hi = self.read(addr.wrapping_add(1))? as u16;
        Ok((hi << 8) | lo)
    }

    /// Little-endian 16-bit read whose high byte comes from the same page
    /// (`$xxFF` pairs with `$xx00`), as the 6502 does for `JMP ($xxFF)` and zero-page pointers.
    fn read_u16_wrapped(&mut self, addr: u16) -> Result<u16, EmulationError> {
        let lo = self.read(addr)? as u16;
        let hi_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let hi = self.read(hi_addr)? as u16;
        Ok((hi << 8) | lo)
    }
}

/// Main NES bus: RAM, PPU, cartridge mapper, and controllers.
pub struct CpuBus {
    pub ram: [u8; 2048],
    pub ppu: PPU,
    pub mapper: Box<dyn Mapper>,
    pub controllers: [Controller; 2],
    dma_pending: bool,
}

impl CpuBus {
    pub fn new(mapper: Box<dyn Mapper>) -> Self {
        Self {
            ram: [0; 2048],
            ppu: PPU::new(),
            mapper,
            controllers: [Controller::new(), Controller::new()],
            dma_pending: false,
        }
    }

    /// Copy page `page` ($XX00–$XXFF) into OAM starting at OAMADDR.
    fn oam_dma(&mut self, page: u8) -> Result<(), EmulationError> {
        trace!("OAM DMA from ${:02X}00", page);
        let base = (page as u16) << 8;
        for i in 0..256 {
            let data = self.read(base + i)?;
            self.ppu.write_oam(data);
        }
        self.dma_pending = true;
        Ok(())
    }
}

impl Bus for CpuBus {
    fn read(&mut self, addr: u16) -> Result<u8, EmulationError> {
        match addr {
            // Internal RAM (mirrored 4x in 0x0000-0x1FFF)
            0x0000..=0x1FFF => Ok(self.ram[(addr & 0x07FF) as usize]),
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => self
                .ppu
                .read_register(0x2000 + (addr & 0x0007), self.mapper.as_ref()),
            0x4016 => Ok(self.controllers[0].read()),
            0x4017 => Ok(self.controllers[1].read()),
            // APU and test registers: no sound hardware
            0x4000..=0x401F => Ok(0),
            // Cartridge: expansion, PRG RAM, PRG ROM
            0x4020..=0xFFFF => self.mapper.read(addr),
        }
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), EmulationError> {
        match addr {
            // Internal RAM
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = data,
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => {
                self.ppu
                    .write_register(0x2000 + (addr & 0x0007), data, self.mapper.as_mut())?
            }
            0x4014 => self.oam_dma(data)?,
            // One strobe line feeds both ports.
            0x4016 => {
                for controller in &mut self.controllers {
                    controller.write(data);
                }
            }
            // APU, frame counter ($4017), test registers: no-op
            0x4000..=0x401F => {}
            // Cartridge: mapper registers, PRG RAM, CHR-independent
            0x4020..=0xFFFF => self.mapper.write(addr, data)?,
        }
        Ok(())
    }

    fn poll_dma(&mut self) -> bool {
        std::mem::take(&mut self.dma_pending)
    }
}
