//! Instruction semantics for the 56 official 6502 mnemonics.
//!
//! See [6502 instructions](https://www.nesdev.org/wiki/Instruction_reference). The 2A03 has
//! no decimal mode, so ADC/SBC are always binary.

use crate::{
    bus::Bus,
    cpu::{
        cpu::{CPU, IRQ_VECTOR, Operand},
        flags::Flags,
        opcodes::{AddressingMode, Mnemonic, Opcode},
    },
    error::EmulationError,
};

impl<B: Bus> CPU<B> {
    /// Execute `op`. PC already points past the instruction.
    /// Returns cycles beyond the base count (taken branches only).
    pub(crate) fn execute(&mut self, op: Opcode, operand: Operand) -> Result<u32, EmulationError> {
        use Mnemonic::*;

        let mode = op.mode;
        let addr = operand.addr;

        match op.mnemonic {
            LDA => {
                self.a = self.load(mode, addr)?;
                self.status.set_zn(self.a);
            }
            LDX => {
                self.x = self.load(mode, addr)?;
                self.status.set_zn(self.x);
            }
            LDY => {
                self.y = self.load(mode, addr)?;
                self.status.set_zn(self.y);
            }
            STA => self.bus.write(addr, self.a)?,
            STX => self.bus.write(addr, self.x)?,
            STY => self.bus.write(addr, self.y)?,

            TAX => {
                self.x = self.a;
                self.status.set_zn(self.x);
            }
            TAY => {
                self.y = self.a;
                self.status.set_zn(self.y);
            }
            TSX => {
                self.x = self.sp;
                self.status.set_zn(self.x);
            }
            TXA => {
                self.a = self.x;
                self.status.set_zn(self.a);
            }
            TXS => self.sp = self.x,
            TYA => {
                self.a = self.y;
                self.status.set_zn(self.a);
            }

            PHA => self.push(self.a)?,
            PHP => self.push(self.status.pushed(true))?,
            PLA => {
                self.a = self.pop()?;
                self.status.set_zn(self.a);
            }
            PLP => self.status = Flags::pulled(self.pop()?),

            ASL => self.modify(mode, addr, |cpu, v| {
                cpu.status.set(Flags::CARRY, v & 0x80 != 0);
                v << 1
            })?,
            LSR => self.modify(mode, addr, |cpu, v| {
                cpu.status.set(Flags::CARRY, v & 0x01 != 0);
                v >> 1
            })?,
            ROL => self.modify(mode, addr, |cpu, v| {
                let carry = cpu.status.contains(Flags::CARRY) as u8;
                cpu.status.set(Flags::CARRY, v & 0x80 != 0);
                (v << 1) | carry
            })?,
            ROR => self.modify(mode, addr, |cpu, v| {
                let carry = cpu.status.contains(Flags::CARRY) as u8;
                cpu.status.set(Flags::CARRY, v & 0x01 != 0);
                (v >> 1) | (carry << 7)
            })?,

            AND => {
                self.a &= self.load(mode, addr)?;
                self.status.set_zn(self.a);
            }
            EOR => {
                self.a ^= self.load(mode, addr)?;
                self.status.set_zn(self.a);
            }
            ORA => {
                self.a |= self.load(mode, addr)?;
                self.status.set_zn(self.a);
            }
            BIT => {
                let value = self.load(mode, addr)?;
                self.status.set(Flags::ZERO, self.a & value == 0);
                self.status.set(Flags::OVERFLOW, value & 0x40 != 0);
                self.status.set(Flags::NEGATIVE, value & 0x80 != 0);
            }

            ADC => {
                let value = self.load(mode, addr)?;
                self.add(value);
            }
            // A - M - (1 - C) == A + !M + C
            SBC => {
                let value = self.load(mode, addr)?;
                self.add(!value);
            }
            CMP => {
                let value = self.load(mode, addr)?;
                self.compare(self.a, value);
            }
            CPX => {
                let value = self.load(mode, addr)?;
                self.compare(self.x, value);
            }
            CPY => {
                let value = self.load(mode, addr)?;
                self.compare(self.y, value);
            }

            INC => self.modify(mode, addr, |_, v| v.wrapping_add(1))?,
            DEC => self.modify(mode, addr, |_, v| v.wrapping_sub(1))?,
            INX => {
                self.x = self.x.wrapping_add(1);
                self.status.set_zn(self.x);
            }
            INY => {
                self.y = self.y.wrapping_add(1);
                self.status.set_zn(self.y);
            }
            DEX => {
                self.x = self.x.wrapping_sub(1);
                self.status.set_zn(self.x);
            }
            DEY => {
                self.y = self.y.wrapping_sub(1);
                self.status.set_zn(self.y);
            }

            BRK => {
                // Skip the padding byte.
                self.push_u16(self.pc.wrapping_add(1))?;
                self.push(self.status.pushed(true))?;
                self.status.insert(Flags::INTERRUPT_DISABLE);
                self.pc = self.bus.read_u16(IRQ_VECTOR)?;
            }
            JMP => self.pc = addr,
            JSR => {
                self.push_u16(self.pc.wrapping_sub(1))?;
                self.pc = addr;
            }
            RTI => {
                self.status = Flags::pulled(self.pop()?);
                self.pc = self.pop_u16()?;
            }
            RTS => self.pc = self.pop_u16()?.wrapping_add(1),

            BCC => return Ok(self.branch(!self.status.contains(Flags::CARRY), operand)),
            BCS => return Ok(self.branch(self.status.contains(Flags::CARRY), operand)),
            BEQ => return Ok(self.branch(self.status.contains(Flags::ZERO), operand)),
            BNE => return Ok(self.branch(!self.status.contains(Flags::ZERO), operand)),
            BMI => return Ok(self.branch(self.status.contains(Flags::NEGATIVE), operand)),
            BPL => return Ok(self.branch(!self.status.contains(Flags::NEGATIVE), operand)),
            BVS => return Ok(self.branch(self.status.contains(Flags::OVERFLOW), operand)),
            BVC => return Ok(self.branch(!self.status.contains(Flags::OVERFLOW), operand)),

            CLC => self.status.remove(Flags::CARRY),
            CLD => self.status.remove(Flags::DECIMAL),
            CLI => self.status.remove(Flags::INTERRUPT_DISABLE),
            CLV => self.status.remove(Flags::OVERFLOW),
            SEC => self.status.insert(Flags::CARRY),
            SED => self.status.insert(Flags::DECIMAL),
            SEI => self.status.insert(Flags::INTERRUPT_DISABLE),
            NOP => {}
        }

        Ok(0)
    }

    fn load(&mut self, mode: AddressingMode, addr: u16) -> Result<u8, EmulationError> {
        match mode {
            AddressingMode::Accumulator => Ok(self.a),
            _ => self.bus.read(addr),
        }
    }

    /// Read-modify-write on the accumulator or memory; sets Z and N from the result.
    fn modify(
        &mut self,
        mode: AddressingMode,
        addr: u16,
        f: impl FnOnce(&mut Self, u8) -> u8,
    ) -> Result<(), EmulationError> {
        let value = self.load(mode, addr)?;
        let result = f(self, value);
        match mode {
            AddressingMode::Accumulator => self.a = result,
            _ => self.bus.write(addr, result)?,
        }
        self.status.set_zn(result);
        Ok(())
    }

    fn add(&mut self, value: u8) {
        let carry_in = self.status.contains(Flags::CARRY) as u16;
        let sum = self.a as u16 + value as u16 + carry_in;
        let result = sum as u8;

        self.status.set(Flags::CARRY, sum > 0xFF);
        self.status
            .set(Flags::OVERFLOW, (!(self.a ^ value) & (self.a ^ result)) & 0x80 != 0);

        self.a = result;
        self.status.set_zn(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.status.set(Flags::CARRY, register >= value);
        self.status.set_zn(register.wrapping_sub(value));
    }

    fn branch(&mut self, condition: bool, target: Operand) -> u32 {
        if !condition {
            return 0;
        }
        self.pc = target.addr;
        1 + target.page_crossed as u32
    }
}
