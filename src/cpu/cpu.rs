use std::mem;

use tracing::trace;

use crate::{
    bus::Bus,
    cpu::{
        flags::Flags,
        opcodes::{AddressingMode, OPCODES},
    },
    error::EmulationError,
};

pub(crate) const NMI_VECTOR: u16 = 0xFFFA;
pub(crate) const RESET_VECTOR: u16 = 0xFFFC;
pub(crate) const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles taken by the NMI/IRQ sequence.
const INTERRUPT_CYCLES: u32 = 7;
/// Cycles the CPU is suspended for an OAM DMA, one more when it starts on an odd cycle.
const DMA_CYCLES: u32 = 513;

/// Effective address of an instruction's operand.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Operand {
    /// Memory address, or the branch target for relative mode. Unused for implied/accumulator.
    pub addr: u16,
    /// Indexing (or a taken branch) landed on a different page.
    pub page_crossed: bool,
}

pub struct CPU<B: Bus> {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: Flags,
    pub cycles: u64,
    pub bus: B,
    nmi_pending: bool,
    irq_pending: bool,
    /// Cycles left during which the CPU does nothing (OAM DMA).
    idle_cycles: u32,
}

impl<B: Bus> CPU<B> {
    pub fn new(bus: B) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: Flags::INTERRUPT_DISABLE | Flags::UNUSED,
            cycles: 0,
            bus,
            nmi_pending: false,
            irq_pending: false,
            idle_cycles: 0,
        }
    }

    pub fn reset(&mut self) -> Result<(), EmulationError> {
        self.pc = self.bus.read_u16(RESET_VECTOR)?;

        self.sp = 0xFD; // the reset sequence pushes three phantom bytes
        self.status = Flags::INTERRUPT_DISABLE | Flags::UNUSED;

        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.nmi_pending = false;
        self.irq_pending = false;
        self.idle_cycles = 0;

        self.cycles = 7;
        Ok(())
    }

    /// Run one unit of work: an idle cycle, an interrupt sequence, or one instruction.
    /// Returns the number of CPU cycles it took.
    pub fn step(&mut self) -> Result<u32, EmulationError> {
        if self.idle_cycles > 0 {
            self.idle_cycles -= 1;
            self.cycles += 1;
            return Ok(1);
        }

        if mem::take(&mut self.nmi_pending) {
            self.interrupt(NMI_VECTOR)?;
            return Ok(INTERRUPT_CYCLES);
        }

        if mem::take(&mut self.irq_pending) && !self.status.contains(Flags::INTERRUPT_DISABLE) {
            self.interrupt(IRQ_VECTOR)?;
            return Ok(INTERRUPT_CYCLES);
        }

        let pc = self.pc;
        let opcode = self.bus.read(pc)?;
        let op = OPCODES[opcode as usize].ok_or(EmulationError::IllegalOpcode { opcode, pc })?;

        trace!(
            target: "crema::cpu",
            "{:04X}  {:02X}  {:?}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc,
            opcode,
            op.mnemonic,
            self.a,
            self.x,
            self.y,
            self.status.bits(),
            self.sp,
            self.cycles
        );

        let operand = self.operand(op.mode)?;
        self.pc = pc.wrapping_add(op.size());

        let mut cycles = op.cycles as u32;
        if op.page_penalty && operand.page_crossed {
            cycles += 1;
        }
        cycles += self.execute(op, operand)?;
        self.cycles += cycles as u64;

        // Parity is taken after the triggering store's own cycles are counted.
        if self.bus.poll_dma() {
            self.idle_cycles += DMA_CYCLES + (self.cycles % 2) as u32;
        }

        Ok(cycles)
    }

    /// Request an NMI, serviced before the next instruction.
    pub fn trigger_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Request an IRQ. Ignored while interrupts are disabled.
    pub fn trigger_irq(&mut self) {
        if !self.status.contains(Flags::INTERRUPT_DISABLE) {
            self.irq_pending = true;
        }
    }

    pub fn add_idle_cycles(&mut self, cycles: u32) {
        self.idle_cycles += cycles;
    }

    fn interrupt(&mut self, vector: u16) -> Result<(), EmulationError> {
        self.push_u16(self.pc)?;
        self.push(self.status.pushed(false))?;

        self.status.insert(Flags::INTERRUPT_DISABLE);
        self.pc = self.bus.read_u16(vector)?;

        self.cycles += INTERRUPT_CYCLES as u64;
        Ok(())
    }

    /// Resolve the operand of the instruction at PC. Does not touch the operand itself,
    /// so register side effects only happen when the instruction reads or writes it.
    fn operand(&mut self, mode: AddressingMode) -> Result<Operand, EmulationError> {
        let arg = self.pc.wrapping_add(1);

        let operand = match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => Operand::default(),
            AddressingMode::Immediate => Operand {
                addr: arg,
                page_crossed: false,
            },
            AddressingMode::ZeroPage => Operand {
                addr: self.bus.read(arg)? as u16,
                page_crossed: false,
            },
            AddressingMode::ZeroPageX => Operand {
                addr: self.bus.read(arg)?.wrapping_add(self.x) as u16,
                page_crossed: false,
            },
            AddressingMode::ZeroPageY => Operand {
                addr: self.bus.read(arg)?.wrapping_add(self.y) as u16,
                page_crossed: false,
            },
            AddressingMode::Relative => {
                let offset = self.bus.read(arg)? as i8;
                let next = self.pc.wrapping_add(mode.size());
                let target = next.wrapping_add(offset as u16);
                Operand {
                    addr: target,
                    page_crossed: page_crossed(next, target),
                }
            }
            AddressingMode::Absolute => Operand {
                addr: self.bus.read_u16(arg)?,
                page_crossed: false,
            },
            AddressingMode::AbsoluteX => {
                let base = self.bus.read_u16(arg)?;
                indexed(base, self.x)
            }
            AddressingMode::AbsoluteY => {
                let base = self.bus.read_u16(arg)?;
                indexed(base, self.y)
            }
            AddressingMode::Indirect => {
                let ptr = self.bus.read_u16(arg)?;
                Operand {
                    addr: self.bus.read_u16_wrapped(ptr)?,
                    page_crossed: false,
                }
            }
            AddressingMode::IndexedIndirect => {
                let ptr = self.bus.read(arg)?.wrapping_add(self.x);
                Operand {
                    addr: self.bus.read_u16_wrapped(ptr as u16)?,
                    page_crossed: false,
                }
            }
            AddressingMode::IndirectIndexed => {
                let ptr = self.bus.read(arg)?;
                let base = self.bus.read_u16_wrapped(ptr as u16)?;
                indexed(base, self.y)
            }
        };

        Ok(operand)
    }

    pub(crate) fn push(&mut self, value: u8) -> Result<(), EmulationError> {
        let addr = 0x0100 | self.sp as u16;
        self.bus.write(addr, value)?;
        self.sp = self.sp.wrapping_sub(1);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<u8, EmulationError> {
        self.sp = self.sp.wrapping_add(1);
        let addr = 0x0100 | self.sp as u16;
        self.bus.read(addr)
    }

    pub(crate) fn push_u16(&mut self, value: u16) -> Result<(), EmulationError> {
        self.push((value >> 8) as u8)?;
        self.push(value as u8)
    }

    pub(crate) fn pop_u16(&mut self) -> Result<u16, EmulationError> {
        let lo = self.pop()? as u16;
        let hi = self.pop()? as u16;
        Ok((hi << 8) | lo)
    }
}

fn indexed(base: u16, index: u8) -> Operand {
    let addr = base.wrapping_add(index as u16);
    Operand {
        addr,
        page_crossed: page_crossed(base, addr),
    }
}

fn page_crossed(a: u16, b: u16) -> bool {
    (a & 0xFF00) != (b & 0xFF00)
}
