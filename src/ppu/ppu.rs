//! NES PPU (Picture Processing Unit) implementation.
//!
//! Dot-stepped: each [`PPU::step`] advances one dot of the 341×262 frame, performing the
//! background fetches, scroll updates, sprite evaluation, and pixel output that hardware does on
//! that dot. See [PPU rendering](https://www.nesdev.org/wiki/PPU_rendering) and the
//! [frame timing diagram](https://www.nesdev.org/wiki/File:Ntsc_timing.png).
//! Registers: $2000–$2007 (mirrored by the CPU bus).

use tracing::trace;

use crate::cartridge::mapper::Mapper;
use crate::error::EmulationError;
use crate::ppu::memory::PpuMemory;
use crate::ppu::registers::{Control, Mask, Status, VramAddr};

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;

/// 256×240 palette indices (0..=63), row-major.
pub type FrameBuffer = [u8; WIDTH * HEIGHT];

/// OAM (Object Attribute Memory): 64 sprites × 4 bytes. Each entry: Y, tile, attr, X.
pub const OAM_LEN: usize = 256;

const DOTS_PER_SCANLINE: u16 = 341;
const PRE_RENDER_SCANLINE: u16 = 261;
const VBLANK_SCANLINE: u16 = 241;
const MAX_SPRITES: usize = 8;

/// Position of a dot that has just been processed, handed to the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dot {
    pub scanline: u16,
    pub dot: u16,
    /// Background or sprite rendering was enabled on this dot.
    pub rendering: bool,
}

/// One entry of the active sprite buffer for the next scanline.
#[derive(Debug, Clone, Copy, Default)]
struct ActiveSprite {
    x: u8,
    attr: u8,
    /// Pattern bytes for the row this sprite covers on the next scanline (vertical flip applied).
    pattern_lo: u8,
    pattern_hi: u8,
    /// First entry examined during evaluation.
    sprite_zero: bool,
}

impl ActiveSprite {
    fn palette(&self) -> u8 {
        self.attr & 0x03
    }

    fn behind_background(&self) -> bool {
        self.attr & 0x20 != 0
    }

    /// 2-bit color value at screen column `x`, or `None` when the sprite does not cover it.
    fn color_at(&self, x: u16) -> Option<u8> {
        let offset = x.checked_sub(self.x as u16)?;
        if offset > 7 {
            return None;
        }
        let col = if self.attr & 0x40 != 0 { 7 - offset } else { offset };
        let bit = 7 - col;
        let lo = (self.pattern_lo >> bit) & 1;
        let hi = (self.pattern_hi >> bit) & 1;
        Some((hi << 1) | lo)
    }
}

/// PPU state: timing, loopy registers, VRAM, OAM, and framebuffer.
pub struct PPU {
    pub(crate) scanline: u16,
    pub(crate) dot: u16,
    odd_frame: bool,
    frame_count: u64,
    /// Set at the end of the pre-render scanline; clear after presenting the framebuffer.
    frame_ready: bool,
    nmi_pending: bool,

    pub(crate) ctrl: Control,
    pub(crate) mask: Mask,
    pub(crate) status: Status,
    /// Current VRAM address.
    pub(crate) v: VramAddr,
    /// Temporary VRAM address.
    pub(crate) t: VramAddr,
    /// Fine X scroll (3 bits).
    pub(crate) x: u8,
    /// Write toggle shared by $2005/$2006.
    pub(crate) w: bool,
    /// Last value written to any register; low 5 bits leak into PPUSTATUS reads.
    last_write: u8,
    /// PPUDATA read buffer.
    read_buffer: u8,

    pub(crate) memory: PpuMemory,
    pub(crate) oam: [u8; OAM_LEN],
    pub(crate) oam_addr: u8,
    sprites: [ActiveSprite; MAX_SPRITES],
    sprite_count: usize,

    /// Background fetch latches.
    nametable_byte: u8,
    attribute_byte: u8,
    pattern_lo: u8,
    pattern_hi: u8,
    /// 16 pixels of 4-bit background data (palette << 2 | color); the low 32 bits are on screen.
    tile_shift: u64,

    frame: Box<FrameBuffer>,
}

impl Default for PPU {
    fn default() -> Self {
        Self::new()
    }
}

impl PPU {
    /// Create PPU in its power-on state (scanline 0, dot 0).
    pub fn new() -> Self {
        Self {
            scanline: 0,
            dot: 0,
            odd_frame: false,
            frame_count: 0,
            frame_ready: false,
            nmi_pending: false,
            ctrl: Control::empty(),
            mask: Mask::empty(),
            status: Status::empty(),
            v: VramAddr::default(),
            t: VramAddr::default(),
            x: 0,
            w: false,
            last_write: 0,
            read_buffer: 0,
            memory: PpuMemory::new(),
            oam: [0; OAM_LEN],
            oam_addr: 0,
            sprites: [ActiveSprite::default(); MAX_SPRITES],
            sprite_count: 0,
            nametable_byte: 0,
            attribute_byte: 0,
            pattern_lo: 0,
            pattern_hi: 0,
            tile_shift: 0,
            frame: Box::new([0; WIDTH * HEIGHT]),
        }
    }

    /// Back to power-on state. VRAM, palette and OAM contents survive, as on hardware.
    pub fn reset(&mut self) {
        self.scanline = 0;
        self.dot = 0;
        self.odd_frame = false;
        self.frame_ready = false;
        self.nmi_pending = false;
        self.ctrl = Control::empty();
        self.mask = Mask::empty();
        self.status = Status::empty();
        self.w = false;
        self.read_buffer = 0;
        self.sprite_count = 0;
        self.tile_shift = 0;
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Completed frames since power-on.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// True once a full frame has been drawn.
    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Clear frame_ready after presenting (so the next frame can set it).
    pub fn clear_frame_ready(&mut self) {
        self.frame_ready = false;
    }

    /// Take a pending VBlank NMI request.
    pub fn poll_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }

    pub fn rendering_enabled(&self) -> bool {
        self.mask.rendering_enabled()
    }

    /// Advance PPU by one dot. Returns the dot that was processed.
    pub fn step(&mut self, mapper: &mut dyn Mapper) -> Result<Dot, EmulationError> {
        let scanline = self.scanline;
        let dot = self.dot;
        let rendering = self.rendering_enabled();

        let visible_line = scanline < 240;
        let pre_render = scanline == PRE_RENDER_SCANLINE;

        if scanline == VBLANK_SCANLINE && dot == 1 {
            self.status.insert(Status::VBLANK);
            if self.ctrl.contains(Control::GENERATE_NMI) {
                self.nmi_pending = true;
            }
        }

        if pre_render && dot == 1 {
            self.status
                .remove(Status::VBLANK | Status::SPRITE_ZERO_HIT | Status::SPRITE_OVERFLOW);
        }

        if visible_line && (1..=256).contains(&dot) {
            let color = if rendering {
                self.render_pixel(dot - 1)?
            } else {
                self.memory.read(0x3F00, mapper)?
            };
            self.put_pixel(dot - 1, scanline, color);
        }

        if rendering && (visible_line || pre_render) {
            self.fetch_background(dot, mapper)?;

            if dot == 257 {
                self.v.copy_horizontal(self.t);
                if visible_line {
                    self.evaluate_sprites(scanline, mapper)?;
                } else {
                    self.sprite_count = 0;
                }
            }

            // OAMADDR is cleared during the sprite tile loading interval.
            if (258..=320).contains(&dot) {
                self.oam_addr = 0;
            }

            if pre_render && (280..=304).contains(&dot) {
                self.v.copy_vertical(self.t);
            }
        }

        self.advance(rendering);

        Ok(Dot {
            scanline,
            dot,
            rendering,
        })
    }

    fn advance(&mut self, rendering: bool) {
        // The pre-render line is one dot shorter on odd frames while rendering.
        let last_dot = if self.scanline == PRE_RENDER_SCANLINE && self.odd_frame && rendering {
            DOTS_PER_SCANLINE - 2
        } else {
            DOTS_PER_SCANLINE - 1
        };

        if self.dot < last_dot {
            self.dot += 1;
            return;
        }

        self.dot = 0;
        if self.scanline == PRE_RENDER_SCANLINE {
            self.scanline = 0;
            self.odd_frame = !self.odd_frame;
            self.frame_count += 1;
            self.frame_ready = true;
            trace!("frame {} complete", self.frame_count);
        } else {
            self.scanline += 1;
        }
    }

    /// 8-dot background fetch cycle on dots 1–256 and 321–336.
    fn fetch_background(&mut self, dot: u16, mapper: &dyn Mapper) -> Result<(), EmulationError> {
        if !((1..=256).contains(&dot) || (321..=336).contains(&dot)) {
            return Ok(());
        }

        self.tile_shift >>= 4;
        match dot % 8 {
            1 => self.nametable_byte = self.memory.read(self.v.tile_addr(), mapper)?,
            3 => self.attribute_byte = self.memory.read(self.v.attribute_addr(), mapper)?,
            5 => self.pattern_lo = self.memory.read(self.pattern_addr(), mapper)?,
            7 => self.pattern_hi = self.memory.read(self.pattern_addr() + 8, mapper)?,
            0 => {
                self.load_tile();
                self.v.increment_x();
                if dot == 256 {
                    self.v.increment_y();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn pattern_addr(&self) -> u16 {
        self.ctrl.background_table() + self.nametable_byte as u16 * 16 + self.v.fine_y()
    }

    /// Pack the latched tile into the upper 32 bits of the shift register.
    fn load_tile(&mut self) {
        let shift = (self.v.coarse_x() & 0x02) | ((self.v.coarse_y() & 0x02) << 1);
        let palette = (self.attribute_byte >> shift) & 0x03;

        let mut data: u64 = 0;
        for i in 0..8 {
            let lo = (self.pattern_lo >> (7 - i)) & 1;
            let hi = (self.pattern_hi >> (7 - i)) & 1;
            let pixel = (palette << 2) | (hi << 1) | lo;
            data |= (pixel as u64) << (4 * i);
        }

        self.tile_shift = (self.tile_shift & 0xFFFF_FFFF) | (data << 32);
    }

    /// Scan OAM for sprites on `scanline`, starting at OAMADDR. They are drawn on the next line.
    fn evaluate_sprites(&mut self, scanline: u16, mapper: &dyn Mapper) -> Result<(), EmulationError> {
        let height = self.ctrl.sprite_height();
        let start = self.oam_addr as usize;
        self.sprite_count = 0;

        for i in (start..OAM_LEN).step_by(4) {
            let y = self.oam[i] as u16;
            let Some(row) = scanline.checked_sub(y).filter(|&row| row < height) else {
                continue;
            };

            if self.sprite_count == MAX_SPRITES {
                self.status.insert(Status::SPRITE_OVERFLOW);
                break;
            }

            let tile = self.oam[(i + 1) & 0xFF];
            let attr = self.oam[(i + 2) & 0xFF];
            let x = self.oam[(i + 3) & 0xFF];

            let row = if attr & 0x80 != 0 { height - 1 - row } else { row };
            let addr = if height == 16 {
                // 8x16 sprites pick their pattern table with bit 0 of the tile index.
                let table = (tile as u16 & 1) * 0x1000;
                let tile = (tile as u16 & 0xFE) + (row >> 3);
                table + tile * 16 + (row & 7)
            } else {
                self.ctrl.sprite_table() + tile as u16 * 16 + row
            };

            self.sprites[self.sprite_count] = ActiveSprite {
                x,
                attr,
                pattern_lo: self.memory.read(addr, mapper)?,
                pattern_hi: self.memory.read(addr + 8, mapper)?,
                sprite_zero: i == start,
            };
            self.sprite_count += 1;
        }
        Ok(())
    }

    /// Compose the background and sprite layers at column `x` into a palette index.
    fn render_pixel(&mut self, x: u16) -> Result<u8, EmulationError> {
        let background = if self.mask.contains(Mask::SHOW_BACKGROUND)
            && (x >= 8 || self.mask.contains(Mask::BACKGROUND_LEFT))
        {
            ((self.tile_shift >> (self.x * 4)) & 0x0F) as u8
        } else {
            0
        };

        let sprite = if self.mask.contains(Mask::SHOW_SPRITES)
            && (x >= 8 || self.mask.contains(Mask::SPRITES_LEFT))
        {
            self.sprites[..self.sprite_count]
                .iter()
                .find_map(|s| s.color_at(x).filter(|&c| c != 0).map(|c| (s, c)))
        } else {
            None
        };

        let background_opaque = background & 0x03 != 0;
        let addr = match sprite {
            None if background_opaque => 0x3F00 + background as u16,
            None => 0x3F00,
            Some((s, color)) => {
                let sprite_addr = 0x3F10 + ((s.palette() << 2) | color) as u16;
                if !background_opaque {
                    sprite_addr
                } else {
                    if s.sprite_zero {
                        self.status.insert(Status::SPRITE_ZERO_HIT);
                    }
                    if s.behind_background() {
                        0x3F00 + background as u16
                    } else {
                        sprite_addr
                    }
                }
            }
        };

        // The mapper is not needed for palette reads.
        Ok(self.memory.read_palette(addr))
    }

    fn put_pixel(&mut self, x: u16, y: u16, color: u8) {
        let color = if self.mask.contains(Mask::GREYSCALE) {
            color & 0x30
        } else {
            color
        };
        self.frame[y as usize * WIDTH + x as usize] = color;
    }

    /// Read a PPU register ($2000–$2007). Write-only registers return the last value written.
    pub fn read_register(&mut self, addr: u16, mapper: &dyn Mapper) -> Result<u8, EmulationError> {
        let data = match addr {
            0x2002 => self.read_status(),
            0x2004 => self.oam[self.oam_addr as usize],
            0x2007 => self.read_data(mapper)?,
            _ => self.last_write,
        };
        Ok(data)
    }

    /// Write a PPU register ($2000–$2007).
    pub fn write_register(
        &mut self,
        addr: u16,
        data: u8,
        mapper: &mut dyn Mapper,
    ) -> Result<(), EmulationError> {
        self.last_write = data;
        match addr {
            0x2000 => {
                self.ctrl = Control::from_bits_retain(data);
                // t: ...BA.. ........ = d: ......BA
                self.t.set_nametable(data as u16 & 0x03);
            }
            0x2001 => self.mask = Mask::from_bits_retain(data),
            0x2003 => self.oam_addr = data,
            0x2004 => self.write_oam(data),
            0x2005 => self.write_scroll(data),
            0x2006 => self.write_addr(data),
            0x2007 => {
                self.memory.write(self.v.raw() & 0x3FFF, data, mapper)?;
                self.increment_v();
            }
            _ => {}
        }
        Ok(())
    }

    /// Write one OAM byte at OAMADDR and increment it ($2004 and OAM DMA).
    pub fn write_oam(&mut self, data: u8) {
        self.oam[self.oam_addr as usize] = data;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    /// PPUSTATUS ($2002): flags plus stale low bits; clears VBlank and the write toggle.
    fn read_status(&mut self) -> u8 {
        let data = self.status.bits() | (self.last_write & 0x1F);
        self.status.remove(Status::VBLANK);
        self.w = false;
        data
    }

    /// PPUSCROLL ($2005): first write = coarse X and fine X, second write = coarse Y and fine Y.
    fn write_scroll(&mut self, data: u8) {
        if !self.w {
            // t: ....... ...HGFED = d: HGFED...
            // x:              CBA = d: .....CBA
            self.t.set_coarse_x(data as u16 >> 3);
            self.x = data & 0x07;
        } else {
            // t: CBA..HG FED..... = d: HGFEDCBA
            self.t.set_coarse_y(data as u16 >> 3);
            self.t.set_fine_y(data as u16 & 0x07);
        }
        self.w = !self.w;
    }

    /// PPUADDR ($2006): high byte (6 bits) then low byte; the second write copies `t` into `v`.
    fn write_addr(&mut self, data: u8) {
        if !self.w {
            // t: .FEDCBA ........ = d: ..FEDCBA, bit 14 cleared
            self.t.set_raw((self.t.raw() & 0x00FF) | ((data as u16 & 0x3F) << 8));
        } else {
            self.t.set_raw((self.t.raw() & 0xFF00) | data as u16);
            self.v = self.t;
        }
        self.w = !self.w;
    }

    /// PPUDATA ($2007) read: buffered one byte behind, except palette reads which are immediate
    /// and refill the buffer from the nametable underneath.
    fn read_data(&mut self, mapper: &dyn Mapper) -> Result<u8, EmulationError> {
        let addr = self.v.raw() & 0x3FFF;
        let data = if addr < 0x3F00 {
            let fetched = self.memory.read(addr, mapper)?;
            std::mem::replace(&mut self.read_buffer, fetched)
        } else {
            self.read_buffer = self.memory.read(addr - 0x1000, mapper)?;
            self.memory.read_palette(addr)
        };
        self.increment_v();
        Ok(data)
    }

    fn increment_v(&mut self) {
        let v = self.v.raw().wrapping_add(self.ctrl.vram_increment());
        self.v.set_raw(v);
    }
}
