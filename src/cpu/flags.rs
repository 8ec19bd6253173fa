//! 6502 processor status register (P) flag bits.

use bitflags::bitflags;

bitflags! {
    /// ```text
    /// 7  bit  0
    /// NV1B DIZC
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u8 {
        const CARRY = 1 << 0;
        const ZERO = 1 << 1;
        const INTERRUPT_DISABLE = 1 << 2;
        const DECIMAL = 1 << 3; // Stored but ignored by the 2A03 ALU
        const BREAK = 1 << 4; // Only exists in pushed copies
        const UNUSED = 1 << 5; // Always 1 when read on 6502
        const OVERFLOW = 1 << 6;
        const NEGATIVE = 1 << 7;
    }
}

impl Flags {
    /// Set Z and N from `value`.
    pub fn set_zn(&mut self, value: u8) {
        self.set(Flags::ZERO, value == 0);
        self.set(Flags::NEGATIVE, value & 0x80 != 0);
    }

    /// Status as pushed by PHP/BRK (`brk = true`) or NMI/IRQ (`brk = false`).
    pub fn pushed(self, brk: bool) -> u8 {
        let mut p = self | Flags::UNUSED;
        p.set(Flags::BREAK, brk);
        p.bits()
    }

    /// Status restored by PLP/RTI: B is discarded, U stays set.
    pub fn pulled(value: u8) -> Self {
        (Flags::from_bits_truncate(value) - Flags::BREAK) | Flags::UNUSED
    }
}
