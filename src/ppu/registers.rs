//! PPU register bit layouts and the loopy `v`/`t` VRAM address.
//!
//! See [PPU registers](https://www.nesdev.org/wiki/PPU_registers) and
//! [PPU scrolling](https://www.nesdev.org/wiki/PPU_scrolling).

use bitflags::bitflags;

bitflags! {
    /// PPUCTRL ($2000).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Control: u8 {
        const NAMETABLE = 0b0000_0011;
        const INCREMENT_32 = 0b0000_0100;
        /// 8x8 sprite pattern table at $1000.
        const SPRITE_TABLE = 0b0000_1000;
        const BACKGROUND_TABLE = 0b0001_0000;
        const SPRITE_SIZE_16 = 0b0010_0000;
        const MASTER_SLAVE = 0b0100_0000;
        const GENERATE_NMI = 0b1000_0000;
    }
}

impl Control {
    pub fn vram_increment(self) -> u16 {
        if self.contains(Control::INCREMENT_32) { 32 } else { 1 }
    }

    pub fn sprite_height(self) -> u16 {
        if self.contains(Control::SPRITE_SIZE_16) { 16 } else { 8 }
    }

    pub fn background_table(self) -> u16 {
        if self.contains(Control::BACKGROUND_TABLE) { 0x1000 } else { 0x0000 }
    }

    pub fn sprite_table(self) -> u16 {
        if self.contains(Control::SPRITE_TABLE) { 0x1000 } else { 0x0000 }
    }
}

bitflags! {
    /// PPUMASK ($2001). Emphasis bits are stored but not applied.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mask: u8 {
        const GREYSCALE = 0b0000_0001;
        const BACKGROUND_LEFT = 0b0000_0010;
        const SPRITES_LEFT = 0b0000_0100;
        const SHOW_BACKGROUND = 0b0000_1000;
        const SHOW_SPRITES = 0b0001_0000;
        const EMPHASIZE_RED = 0b0010_0000;
        const EMPHASIZE_GREEN = 0b0100_0000;
        const EMPHASIZE_BLUE = 0b1000_0000;
    }
}

impl Mask {
    pub fn rendering_enabled(self) -> bool {
        self.intersects(Mask::SHOW_BACKGROUND | Mask::SHOW_SPRITES)
    }
}

bitflags! {
    /// PPUSTATUS ($2002) flag bits. The low five bits are open bus.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u8 {
        const SPRITE_OVERFLOW = 0b0010_0000;
        const SPRITE_ZERO_HIT = 0b0100_0000;
        const VBLANK = 0b1000_0000;
    }
}

// Layout (bits 0-14):
//  14 13 12 11 10 9 8 7 6 5 4 3 2 1 0
//  [fine_y][nt][coarse_y   ][coarse_x   ]
//  yyy     NN   YYYYY         XXXXX
const COARSE_X: u16 = 0x001F;
const COARSE_Y: u16 = 0x03E0;
const NAMETABLE: u16 = 0x0C00;
const FINE_Y: u16 = 0x7000;
const ALL: u16 = 0x7FFF;

/// 15-bit VRAM address used by the PPU internal `v`/`t` registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VramAddr(pub(crate) u16);

impl VramAddr {
    pub fn coarse_x(self) -> u16 {
        self.0 & COARSE_X
    }

    pub fn set_coarse_x(&mut self, cx: u16) {
        self.0 = (self.0 & !COARSE_X) | (cx & 0x1F);
    }

    pub fn coarse_y(self) -> u16 {
        (self.0 & COARSE_Y) >> 5
    }

    pub fn set_coarse_y(&mut self, cy: u16) {
        self.0 = (self.0 & !COARSE_Y) | ((cy & 0x1F) << 5);
    }

    pub fn nametable(self) -> u16 {
        (self.0 & NAMETABLE) >> 10
    }

    pub fn set_nametable(&mut self, nt: u16) {
        self.0 = (self.0 & !NAMETABLE) | ((nt & 0b11) << 10);
    }

    pub fn fine_y(self) -> u16 {
        (self.0 & FINE_Y) >> 12
    }

    pub fn set_fine_y(&mut self, fy: u16) {
        self.0 = (self.0 & !FINE_Y) | ((fy & 0b111) << 12);
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn set_raw(&mut self, v: u16) {
        self.0 = v & ALL;
    }

    /// Address of the nametable byte for the current tile.
    pub fn tile_addr(self) -> u16 {
        0x2000 | (self.0 & 0x0FFF)
    }

    /// Address of the attribute byte covering the current tile.
    pub fn attribute_addr(self) -> u16 {
        0x23C0 | (self.0 & NAMETABLE) | ((self.0 >> 4) & 0x38) | ((self.0 >> 2) & 0x07)
    }

    /// Coarse X increment at the end of each fetched tile; column 31 wraps into the
    /// horizontally adjacent nametable.
    pub fn increment_x(&mut self) {
        if self.coarse_x() == 31 {
            self.set_coarse_x(0);
            self.0 ^= 0x0400;
        } else {
            self.0 += 1;
        }
    }

    /// Fine Y increment at dot 256. Row 29 wraps and switches the vertical nametable;
    /// row 31 (attribute memory) wraps without switching.
    pub fn increment_y(&mut self) {
        if self.fine_y() < 7 {
            self.0 += 0x1000;
            return;
        }
        self.set_fine_y(0);
        match self.coarse_y() {
            29 => {
                self.set_coarse_y(0);
                self.0 ^= 0x0800;
            }
            31 => self.set_coarse_y(0),
            y => self.set_coarse_y(y + 1),
        }
    }

    /// v: ....A.. ...BCDEF <- t: ....A.. ...BCDEF
    pub fn copy_horizontal(&mut self, t: VramAddr) {
        self.0 = (self.0 & !0x041F) | (t.0 & 0x041F);
    }

    /// v: GHIA.BC DEF..... <- t: GHIA.BC DEF.....
    pub fn copy_vertical(&mut self, t: VramAddr) {
        self.0 = (self.0 & !0x7BE0) | (t.0 & 0x7BE0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_x_wraps_into_next_nametable() {
        let mut v = VramAddr(0);
        v.set_coarse_x(31);
        v.increment_x();
        assert_eq!(v.coarse_x(), 0);
        assert_eq!(v.nametable(), 1);
    }

    #[test]
    fn increment_y_row_29_switches_nametable() {
        let mut v = VramAddr(0);
        v.set_fine_y(7);
        v.set_coarse_y(29);
        v.increment_y();
        assert_eq!((v.fine_y(), v.coarse_y(), v.nametable()), (0, 0, 2));
    }

    #[test]
    fn increment_y_row_31_wraps_without_switch() {
        let mut v = VramAddr(0);
        v.set_fine_y(7);
        v.set_coarse_y(31);
        v.increment_y();
        assert_eq!((v.fine_y(), v.coarse_y(), v.nametable()), (0, 0, 0));
    }

    #[test]
    fn increment_y_fine_then_coarse() {
        let mut v = VramAddr(0);
        v.set_coarse_y(4);
        v.increment_y();
        assert_eq!((v.fine_y(), v.coarse_y()), (1, 4));
        v.set_fine_y(7);
        v.increment_y();
        assert_eq!((v.fine_y(), v.coarse_y()), (0, 5));
    }

    #[test]
    fn attribute_address() {
        let mut v = VramAddr(0);
        v.set_nametable(3);
        v.set_coarse_x(31);
        v.set_coarse_y(29);
        assert_eq!(v.attribute_addr(), 0x2FFF);
    }

    #[test]
    fn horizontal_and_vertical_copies() {
        let t = VramAddr(0x7FFF);
        let mut v = VramAddr(0);
        v.copy_horizontal(t);
        assert_eq!(v.raw(), 0x041F);
        v.copy_vertical(t);
        assert_eq!(v.raw(), 0x7FFF);
    }
}
