use crate::{
    cartridge::{
        cartridge::{Cartridge, test_image},
        mapper::{Mapper, mapper0::Mapper0},
    },
    ppu::{
        WIDTH,
        ppu::PPU,
        registers::{Mask, Status},
    },
};

/// NROM with 8 KiB CHR RAM; `flags6` bit 0 selects vertical mirroring.
fn new_mapper(flags6: u8) -> Mapper0 {
    Mapper0::new(Cartridge::from_bytes(&test_image(0, 1, 0, flags6, &[])).unwrap())
}

fn write(ppu: &mut PPU, mapper: &mut dyn Mapper, addr: u16, data: u8) {
    ppu.write_register(addr, data, mapper).unwrap();
}

fn read(ppu: &mut PPU, mapper: &dyn Mapper, addr: u16) -> u8 {
    ppu.read_register(addr, mapper).unwrap()
}

fn set_vram_addr(ppu: &mut PPU, mapper: &mut dyn Mapper, addr: u16) {
    write(ppu, mapper, 0x2006, (addr >> 8) as u8);
    write(ppu, mapper, 0x2006, addr as u8);
}

fn poke(ppu: &mut PPU, mapper: &mut dyn Mapper, addr: u16, data: &[u8]) {
    set_vram_addr(ppu, mapper, addr);
    for &byte in data {
        write(ppu, mapper, 0x2007, byte);
    }
}

/// Step until the dot at (`scanline`, `dot`) has been processed.
fn run_through(ppu: &mut PPU, mapper: &mut dyn Mapper, scanline: u16, dot: u16) {
    loop {
        let d = ppu.step(mapper).unwrap();
        if d.scanline == scanline && d.dot == dot {
            return;
        }
    }
}

/// Number of dots until the next frame is handed over.
fn frame_length(ppu: &mut PPU, mapper: &mut dyn Mapper) -> u32 {
    ppu.clear_frame_ready();
    let mut dots = 0;
    while !ppu.frame_ready() {
        ppu.step(mapper).unwrap();
        dots += 1;
    }
    dots
}

#[test]
fn vblank_flag_clears_on_first_read_only() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    run_through(&mut ppu, &mut mapper, 241, 1);

    assert_ne!(read(&mut ppu, &mapper, 0x2002) & 0x80, 0);
    assert_eq!(read(&mut ppu, &mapper, 0x2002) & 0x80, 0);
}

#[test]
fn vblank_raises_nmi_only_when_enabled() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    run_through(&mut ppu, &mut mapper, 241, 1);
    assert!(!ppu.poll_nmi());

    write(&mut ppu, &mut mapper, 0x2000, 0x80);
    run_through(&mut ppu, &mut mapper, 241, 1);
    assert!(ppu.poll_nmi());
    assert!(!ppu.poll_nmi());
}

#[test]
fn pre_render_line_clears_flags() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    run_through(&mut ppu, &mut mapper, 241, 1);
    ppu.status.insert(Status::SPRITE_ZERO_HIT | Status::SPRITE_OVERFLOW);
    run_through(&mut ppu, &mut mapper, 261, 1);
    assert_eq!(ppu.status, Status::empty());
}

#[test]
fn scroll_writes_fill_t_and_fine_x() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    write(&mut ppu, &mut mapper, 0x2005, 0x7D); // coarse X 15, fine X 5
    assert!(ppu.w);
    write(&mut ppu, &mut mapper, 0x2005, 0x5E); // coarse Y 11, fine Y 6
    read(&mut ppu, &mapper, 0x2002);

    assert!(!ppu.w);
    assert_eq!(ppu.t.raw(), 0x616F);
    assert_eq!(ppu.x, 5);
}

#[test]
fn status_read_resets_write_toggle() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    write(&mut ppu, &mut mapper, 0x2006, 0x21);
    read(&mut ppu, &mapper, 0x2002);
    // Starts over with the high byte.
    set_vram_addr(&mut ppu, &mut mapper, 0x2345);
    assert_eq!(ppu.v.raw(), 0x2345);
}

#[test]
fn ctrl_write_sets_nametable_bits_of_t() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    write(&mut ppu, &mut mapper, 0x2000, 0x03);
    assert_eq!(ppu.t.nametable(), 3);
}

#[test]
fn status_low_bits_come_from_last_write() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    write(&mut ppu, &mut mapper, 0x2003, 0xFF);
    assert_eq!(read(&mut ppu, &mapper, 0x2002), 0x1F);
    // Write-only registers read back the last write.
    assert_eq!(read(&mut ppu, &mapper, 0x2000), 0xFF);
}

#[test]
fn data_reads_are_buffered() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    poke(&mut ppu, &mut mapper, 0x2400, &[0xAA, 0xBB]);

    set_vram_addr(&mut ppu, &mut mapper, 0x2400);
    assert_eq!(read(&mut ppu, &mapper, 0x2007), 0x00); // stale buffer
    assert_eq!(read(&mut ppu, &mapper, 0x2007), 0xAA);
    assert_eq!(read(&mut ppu, &mapper, 0x2007), 0xBB);
}

#[test]
fn palette_reads_are_immediate_and_refill_buffer() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    poke(&mut ppu, &mut mapper, 0x2F05, &[0x42]);
    poke(&mut ppu, &mut mapper, 0x3F05, &[0x17]);

    set_vram_addr(&mut ppu, &mut mapper, 0x3F05);
    assert_eq!(read(&mut ppu, &mapper, 0x2007), 0x17);
    // The buffer now holds the nametable byte under the palette ($2F05).
    set_vram_addr(&mut ppu, &mut mapper, 0x2000);
    assert_eq!(read(&mut ppu, &mapper, 0x2007), 0x42);
}

#[test]
fn increment_32() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    write(&mut ppu, &mut mapper, 0x2000, 0x04);
    poke(&mut ppu, &mut mapper, 0x2000, &[1, 2]);
    assert_eq!(ppu.v.raw(), 0x2040);
    assert_eq!(ppu.memory.read(0x2020, &mapper).unwrap(), 2);
}

#[test]
fn palette_mirrors() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    for (alias, base) in [(0x3F10, 0x3F00), (0x3F14, 0x3F04), (0x3F18, 0x3F08), (0x3F1C, 0x3F0C)] {
        poke(&mut ppu, &mut mapper, alias, &[0x2A]);
        assert_eq!(ppu.memory.read(base, &mapper).unwrap(), 0x2A);
    }
    poke(&mut ppu, &mut mapper, 0x3F11, &[0x01]);
    assert_eq!(ppu.memory.read(0x3F01, &mapper).unwrap(), 0x00);
    assert_eq!(ppu.memory.read(0x3F31, &mapper).unwrap(), 0x01);
}

#[test]
fn nametable_mirroring_follows_mapper() {
    // Horizontal: $2000 and $2400 share a table.
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    poke(&mut ppu, &mut mapper, 0x2000, &[0x11]);
    assert_eq!(ppu.memory.read(0x2400, &mapper).unwrap(), 0x11);
    assert_eq!(ppu.memory.read(0x2800, &mapper).unwrap(), 0x00);
    assert_eq!(ppu.memory.read(0x3000, &mapper).unwrap(), 0x11);

    // Vertical: $2000 and $2800 share a table.
    let mut mapper = new_mapper(1);
    let mut ppu = PPU::new();
    poke(&mut ppu, &mut mapper, 0x2000, &[0x22]);
    assert_eq!(ppu.memory.read(0x2800, &mapper).unwrap(), 0x22);
    assert_eq!(ppu.memory.read(0x2400, &mapper).unwrap(), 0x00);
}

#[test]
fn invalid_ppu_address() {
    let mapper = new_mapper(0);
    let ppu = PPU::new();
    assert_eq!(
        ppu.memory.read(0x4000, &mapper),
        Err(crate::error::EmulationError::InvalidPpuAccess { addr: 0x4000 })
    );
}

#[test]
fn odd_frames_skip_a_dot_while_rendering() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    assert_eq!(frame_length(&mut ppu, &mut mapper), 89342);

    write(&mut ppu, &mut mapper, 0x2001, Mask::SHOW_BACKGROUND.bits());
    assert_eq!(frame_length(&mut ppu, &mut mapper), 89341);
    assert_eq!(frame_length(&mut ppu, &mut mapper), 89342);

    write(&mut ppu, &mut mapper, 0x2001, 0);
    assert_eq!(frame_length(&mut ppu, &mut mapper), 89342);
    assert_eq!(frame_length(&mut ppu, &mut mapper), 89342);
}

#[test]
fn rendering_disabled_draws_backdrop_with_greyscale() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    poke(&mut ppu, &mut mapper, 0x3F00, &[0x2D]);
    write(&mut ppu, &mut mapper, 0x2001, Mask::GREYSCALE.bits());
    frame_length(&mut ppu, &mut mapper);
    assert!(ppu.frame().iter().all(|&p| p == 0x20));
}

/// Tile 0 is solid color 1; every nametable entry is tile 0; palette 1 is $21.
fn solid_background(ppu: &mut PPU, mapper: &mut dyn Mapper) {
    poke(ppu, mapper, 0x0000, &[0xFF; 8]);
    poke(ppu, mapper, 0x3F00, &[0x0F, 0x21]);
    poke(ppu, mapper, 0x3F11, &[0x16]);
    // Sprites off screen.
    ppu.oam = [0xFF; 256];
    set_vram_addr(ppu, mapper, 0x0000);
}

#[test]
fn background_renders_through_palette() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    solid_background(&mut ppu, &mut mapper);
    write(
        &mut ppu,
        &mut mapper,
        0x2001,
        (Mask::SHOW_BACKGROUND | Mask::BACKGROUND_LEFT).bits(),
    );
    // Second frame has the full prefetch from the pre-render line.
    frame_length(&mut ppu, &mut mapper);
    frame_length(&mut ppu, &mut mapper);
    assert_eq!(ppu.frame()[100 * WIDTH + 100], 0x21);
    assert_eq!(ppu.frame()[0], 0x21);
}

#[test]
fn left_column_masking() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    solid_background(&mut ppu, &mut mapper);
    write(&mut ppu, &mut mapper, 0x2001, Mask::SHOW_BACKGROUND.bits());
    frame_length(&mut ppu, &mut mapper);
    frame_length(&mut ppu, &mut mapper);
    assert_eq!(ppu.frame()[50 * WIDTH + 7], 0x0F);
    assert_eq!(ppu.frame()[50 * WIDTH + 8], 0x21);
}

#[test]
fn sprite_zero_hit_and_priority() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    solid_background(&mut ppu, &mut mapper);
    // Sprite 0 at (10, 10): drawn from line 11.
    ppu.oam[..4].copy_from_slice(&[10, 0, 0, 10]);
    write(&mut ppu, &mut mapper, 0x2001, 0x1E);

    run_through(&mut ppu, &mut mapper, 240, 0);
    assert!(ppu.status.contains(Status::SPRITE_ZERO_HIT));
    assert_eq!(ppu.frame()[11 * WIDTH + 12], 0x16);
    assert_eq!(ppu.frame()[10 * WIDTH + 12], 0x21);
    assert_eq!(ppu.frame()[11 * WIDTH + 20], 0x21);
}

#[test]
fn sprite_behind_background() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    solid_background(&mut ppu, &mut mapper);
    ppu.oam[..4].copy_from_slice(&[10, 0, 0x20, 10]);
    write(&mut ppu, &mut mapper, 0x2001, 0x1E);

    run_through(&mut ppu, &mut mapper, 240, 0);
    assert_eq!(ppu.frame()[11 * WIDTH + 12], 0x21);
    // Still a hit: both layers are opaque.
    assert!(ppu.status.contains(Status::SPRITE_ZERO_HIT));
}

#[test]
fn ninth_sprite_sets_overflow() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    ppu.oam = [0xFF; 256];
    for i in 0..9 {
        ppu.oam[i * 4] = 20;
    }
    write(&mut ppu, &mut mapper, 0x2001, Mask::SHOW_SPRITES.bits());
    run_through(&mut ppu, &mut mapper, 19, 257);
    assert!(!ppu.status.contains(Status::SPRITE_OVERFLOW));
    run_through(&mut ppu, &mut mapper, 20, 257);
    assert!(ppu.status.contains(Status::SPRITE_OVERFLOW));
}

#[test]
fn oam_addr_cleared_during_sprite_fetch() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    write(&mut ppu, &mut mapper, 0x2001, Mask::SHOW_SPRITES.bits());
    write(&mut ppu, &mut mapper, 0x2003, 0x40);
    run_through(&mut ppu, &mut mapper, 5, 258);
    assert_eq!(ppu.oam_addr, 0);
}

#[test]
fn oam_data_write_increments_address() {
    let mut mapper = new_mapper(0);
    let mut ppu = PPU::new();
    write(&mut ppu, &mut mapper, 0x2003, 0xFF);
    write(&mut ppu, &mut mapper, 0x2004, 0x12);
    write(&mut ppu, &mut mapper, 0x2004, 0x34);
    assert_eq!(ppu.oam[0xFF], 0x12);
    assert_eq!(ppu.oam[0x00], 0x34);
    write(&mut ppu, &mut mapper, 0x2003, 0xFF);
    assert_eq!(read(&mut ppu, &mapper, 0x2004), 0x12);
}
