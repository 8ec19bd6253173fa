//! NES controller input handling.
//!
//! Implements the standard NES controller shift register protocol:
//! write $01 to $4016 to latch current state; then read $4016 (port 1) or $4017 (port 2)
//! repeatedly to get one bit per read (A, B, Select, Start, Up, Down, Left, Right).
//! See [Standard controller](https://www.nesdev.org/wiki/Standard_controller).

use bitflags::bitflags;

bitflags! {
    /// Button bits in shift order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Buttons: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const UP = 1 << 4;
        const DOWN = 1 << 5;
        const LEFT = 1 << 6;
        const RIGHT = 1 << 7;
    }
}

/// Upper bits of the data bus left over from the address byte of `LDA $4016`.
const OPEN_BUS: u8 = 0x40;

/// A single standard controller.
#[derive(Debug, Default)]
pub struct Controller {
    /// Buttons currently held, as set by the frontend.
    buttons: Buttons,
    /// Shift register: latched from `buttons` on strobe; shifted out LSB-first on read.
    shift: u8,
    strobe: bool,
}

impl Controller {
    /// Create a new controller with no buttons pressed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_buttons(&mut self, buttons: Buttons) {
        self.buttons = buttons;
    }

    pub fn set_button(&mut self, button: Buttons, pressed: bool) {
        self.buttons.set(button, pressed);
    }

    pub fn buttons(&self) -> Buttons {
        self.buttons
    }

    /// Read one button state. While strobe is high this is always A.
    /// After all 8 buttons have been shifted out, reads return 1.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            self.shift = self.buttons.bits();
        }
        let bit = self.shift & 1;
        self.shift = (self.shift >> 1) | 0x80;
        bit | OPEN_BUS
    }

    /// Write to $4016. Bit 0 is the strobe; the buttons are latched while it is high.
    pub fn write(&mut self, data: u8) {
        self.strobe = data & 1 != 0;
        if self.strobe {
            self.shift = self.buttons.bits();
        }
    }
}
