//! The assembled machine.
//!
//! Owns the CPU, which owns the bus, which owns the PPU, mapper and controllers. Each CPU
//! step is followed by three PPU dots per CPU cycle; every dot is forwarded to the mapper
//! (MMC3 counts scanlines from them), then the PPU's NMI and the mapper's IRQ are routed
//! back into the CPU. See [Cycle reference chart](https://www.nesdev.org/wiki/Cycle_reference_chart).

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::bus::CpuBus;
use crate::cartridge::cartridge::Cartridge;
use crate::cartridge::mapper::new_mapper;
use crate::controller::Controller;
use crate::cpu::cpu::CPU;
use crate::error::{CartridgeError, EmulationError};
use crate::ppu::FrameBuffer;

/// PPU dots per CPU cycle (NTSC).
const DOTS_PER_CYCLE: u32 = 3;

pub struct Console {
    cpu: CPU<CpuBus>,
}

impl Console {
    /// Build the mapper for `cartridge`, wire up the buses and reset.
    pub fn new(cartridge: Cartridge) -> Result<Self, CartridgeError> {
        let mapper = new_mapper(cartridge)?;
        let mut console = Self {
            cpu: CPU::new(CpuBus::new(mapper)),
        };
        console.reset()?;
        Ok(console)
    }

    /// Press the reset button.
    pub fn reset(&mut self) -> Result<(), EmulationError> {
        self.cpu.bus.ppu.reset();
        self.cpu.reset()?;
        info!("reset, PC=${:04X}", self.cpu.pc);
        Ok(())
    }

    /// Run one CPU step and catch the PPU up. Returns the CPU cycles taken.
    pub fn step(&mut self) -> Result<u32, EmulationError> {
        let cycles = self.cpu.step()?;

        let bus = &mut self.cpu.bus;
        for _ in 0..cycles * DOTS_PER_CYCLE {
            let dot = bus.ppu.step(bus.mapper.as_mut())?;
            bus.mapper.on_ppu_step(dot);
        }

        if bus.ppu.poll_nmi() {
            self.cpu.trigger_nmi();
        }
        if self.cpu.bus.mapper.poll_irq() {
            self.cpu.trigger_irq();
        }

        Ok(cycles)
    }

    /// Step until the PPU finishes a frame and return it.
    pub fn run_frame(&mut self) -> Result<&FrameBuffer, EmulationError> {
        self.cpu.bus.ppu.clear_frame_ready();
        while !self.cpu.bus.ppu.frame_ready() {
            self.step()?;
        }
        Ok(self.cpu.bus.ppu.frame())
    }

    /// Run frames until `stop` is set, handing each one to `on_frame`.
    /// `stop` is checked between frames.
    pub fn run<F>(&mut self, stop: &AtomicBool, mut on_frame: F) -> Result<(), EmulationError>
    where
        F: FnMut(&FrameBuffer),
    {
        while !stop.load(Ordering::Relaxed) {
            let frame = self.run_frame()?;
            on_frame(frame);
        }
        debug!("stopped after {} frames", self.frame_count());
        Ok(())
    }

    /// Controller on `port` (0 or 1).
    pub fn controller_mut(&mut self, port: usize) -> Option<&mut Controller> {
        self.cpu.bus.controllers.get_mut(port)
    }

    /// PRG RAM contents when the cartridge has a battery.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.cpu.bus.mapper.cartridge().battery_ram()
    }

    pub fn load_battery_ram(&mut self, data: &[u8]) {
        self.cpu.bus.mapper.cartridge_mut().load_battery_ram(data);
    }

    pub fn frame_count(&self) -> u64 {
        self.cpu.bus.ppu.frame_count()
    }

    pub fn cpu(&self) -> &CPU<CpuBus> {
        &self.cpu
    }
}
