//! Framebuffer video: VRAM byte lanes, palette and scanline output
//!
//! VRAM holds two 8-bit pixel planes interleaved in 16-bit words. The CPU
//! sees one plane at a time, picked by the video bank bit of the control
//! register. The display side reads whole words (15-bit palette indices),
//! 512 words per row, and the palette turns indices into host colors.
//!
//! ## Bus windows
//!
//! - 0x00000000-0x003FFFFF: VRAM (bank-selected byte lane)
//! - 0x01800000-0x0187FFFF: palette RAM

use crate::memory::{Memory, Region};
use emu_core::graphics::ColorOps;
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::types::Frame;

pub const SCREEN_WIDTH: usize = 400;
pub const SCREEN_HEIGHT: usize = 254;
pub const PALETTE_ENTRIES: usize = 0x8000;

/// Words per VRAM row; the display wraps columns at this boundary.
const ROW_WORDS: usize = 512;
const ROW_RING_MASK: usize = 0x3FE00;
const COLUMN_MASK: usize = ROW_WORDS - 1;
const VRAM_ADDR_MASK: u32 = 0x3F_FFFF;
const PALETTE_ADDR_MASK: u32 = 0x7_FFFF;
const COLOR_MASK: u16 = 0x7FFF;

/// Display generator output for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanlineParams {
    /// VRAM row (also the destination line)
    pub row: u32,
    /// Starting column, in units of two pixels
    pub col: u32,
    /// End of horizontal blank, in pixels
    pub heblnk: u32,
    /// Start of horizontal blank, in clocks (two pixels per clock)
    pub hsblnk: u32,
}

pub struct Video {
    bank: u32,
    /// Palette indices for the whole screen, filled one scanline at a time
    indices: Vec<u16>,
    recalc_pending: bool,
}

impl Default for Video {
    fn default() -> Self {
        Self::new()
    }
}

impl Video {
    pub fn new() -> Self {
        Self {
            bank: 1,
            indices: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            recalc_pending: false,
        }
    }

    pub fn bank(&self) -> u32 {
        self.bank
    }

    pub fn set_bank(&mut self, bank: u32) {
        self.bank = bank & 1;
    }

    /// Bank as a raw field for the state walker.
    pub(crate) fn bank_mut(&mut self) -> &mut u32 {
        &mut self.bank
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    #[inline]
    fn vram_word_index(addr: u32) -> usize {
        ((addr & VRAM_ADDR_MASK) >> 3) as usize
    }

    /// Each CPU word spans two VRAM words, one byte lane from each.
    pub fn read_vram(&self, mem: &Memory, addr: u32) -> u16 {
        let o = Self::vram_word_index(addr);
        let lo = mem.word(Region::Vram, o);
        let hi = mem.word(Region::Vram, o + 1);
        if self.bank != 0 {
            (lo & 0x00ff) | (hi << 8)
        } else {
            (lo >> 8) | (hi & 0xff00)
        }
    }

    /// Bank 1 writes also stamp the DMA palette latch into the other lane;
    /// bank 0 writes leave the low lane untouched.
    pub fn write_vram(&self, mem: &mut Memory, addr: u32, data: u16, palette_latch: u16) {
        let o = Self::vram_word_index(addr);
        if self.bank != 0 {
            mem.set_word(Region::Vram, o, (data & 0xff) | ((palette_latch & 0xff) << 8));
            mem.set_word(Region::Vram, o + 1, ((data >> 8) & 0xff) | (palette_latch & 0xff00));
        } else {
            let lo = mem.word(Region::Vram, o);
            let hi = mem.word(Region::Vram, o + 1);
            mem.set_word(Region::Vram, o, (lo & 0xff) | ((data & 0xff) << 8));
            mem.set_word(Region::Vram, o + 1, (hi & 0xff) | (data & 0xff00));
        }
    }

    pub fn to_shift(&self, mem: &Memory, addr: u32, dst: &mut [u16]) {
        let start = Self::vram_word_index(addr);
        for (i, word) in dst.iter_mut().enumerate() {
            *word = mem.word(Region::Vram, start + i);
        }
    }

    pub fn from_shift(&self, mem: &mut Memory, addr: u32, src: &[u16]) {
        let start = Self::vram_word_index(addr);
        for (i, &word) in src.iter().enumerate() {
            mem.set_word(Region::Vram, start + i, word);
        }
    }

    #[inline]
    fn palette_entry(addr: u32) -> usize {
        ((addr & PALETTE_ADDR_MASK) >> 4) as usize
    }

    pub fn read_palette(&self, mem: &Memory, addr: u32) -> u16 {
        mem.word(Region::Palette, Self::palette_entry(addr))
    }

    pub fn write_palette(&self, mem: &mut Memory, addr: u32, value: u16) {
        let entry = Self::palette_entry(addr);
        mem.set_word(Region::Palette, entry, value);
        mem.write_u32(Region::PaletteCache, entry * 4, ColorOps::from_rgb555(value));
    }

    /// Host color for a palette index.
    pub fn host_color(&self, mem: &Memory, index: usize) -> u32 {
        mem.read_u32(Region::PaletteCache, index * 4)
    }

    /// Ask for a full palette conversion before the next blit.
    pub fn request_recalc(&mut self) {
        self.recalc_pending = true;
    }

    pub fn recalc_pending(&self) -> bool {
        self.recalc_pending
    }

    /// Rebuild every cached host color from the raw palette.
    pub fn recalc_palette(&self, mem: &mut Memory) {
        for entry in 0..PALETTE_ENTRIES {
            let raw = mem.word(Region::Palette, entry);
            mem.write_u32(Region::PaletteCache, entry * 4, ColorOps::from_rgb555(raw));
        }
    }

    pub fn render_scanline(&mut self, mem: &Memory, params: &ScanlineParams) {
        let row = params.row as usize;
        if row >= SCREEN_HEIGHT {
            return;
        }

        let src = (row << 9) & ROW_RING_MASK;
        let mut col = (params.col as usize) << 1;
        let heblnk = params.heblnk as usize;
        let hsblnk = (params.hsblnk as usize) * 2;

        let dest = &mut self.indices[row * SCREEN_WIDTH..(row + 1) * SCREEN_WIDTH];
        for x in heblnk..hsblnk {
            let Some(pixel) = dest.get_mut(x - heblnk) else {
                break;
            };
            *pixel = mem.word(Region::Vram, src + (col & COLUMN_MASK)) & COLOR_MASK;
            col += 1;
        }
    }

    /// Recalculate the palette if requested, then map the index buffer into `frame`.
    pub fn draw(&mut self, mem: &mut Memory, frame: &mut Frame) {
        if self.recalc_pending {
            log(LogCategory::Video, LogLevel::Info, || {
                "Video: recalculating the palette".to_string()
            });
            self.recalc_palette(mem);
            self.recalc_pending = false;
        }
        self.blit(mem, frame);
    }

    pub fn blit(&self, mem: &Memory, frame: &mut Frame) {
        debug_assert_eq!(frame.pixels.len(), self.indices.len());
        let cache = mem.region(Region::PaletteCache);
        for (pixel, &index) in frame.pixels.iter_mut().zip(&self.indices) {
            let at = index as usize * 4;
            *pixel = u32::from_le_bytes([cache[at], cache[at + 1], cache[at + 2], cache[at + 3]]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Video, Memory) {
        (Video::new(), Memory::allocate().unwrap())
    }

    /// Bit address of the n-th CPU word in VRAM
    fn vram_addr(n: u32) -> u32 {
        n << 4
    }

    #[test]
    fn test_bank1_roundtrip_and_latch_stamp() {
        let (video, mut mem) = setup();
        video.write_vram(&mut mem, vram_addr(3), 0xA1B2, 0x5566);

        assert_eq!(video.read_vram(&mem, vram_addr(3)), 0xA1B2);
        // Upper lanes carry the palette latch
        assert_eq!(mem.word(Region::Vram, 6), 0x66B2);
        assert_eq!(mem.word(Region::Vram, 7), 0x55A1);
    }

    #[test]
    fn test_bank0_write_preserves_low_lane() {
        let (mut video, mut mem) = setup();
        video.write_vram(&mut mem, vram_addr(0), 0x1234, 0x0000);

        video.set_bank(0);
        video.write_vram(&mut mem, vram_addr(0), 0xCDEF, 0xFFFF);
        assert_eq!(video.read_vram(&mem, vram_addr(0)), 0xCDEF);

        video.set_bank(1);
        assert_eq!(video.read_vram(&mem, vram_addr(0)), 0x1234);
    }

    #[test]
    fn test_bank1_write_overwrites_bank0_lane_with_latch() {
        let (mut video, mut mem) = setup();
        video.set_bank(0);
        video.write_vram(&mut mem, vram_addr(1), 0x9988, 0);

        video.set_bank(1);
        video.write_vram(&mut mem, vram_addr(1), 0x0102, 0x4433);

        video.set_bank(0);
        assert_eq!(video.read_vram(&mem, vram_addr(1)), 0x4433);
    }

    #[test]
    fn test_shift_register_roundtrip() {
        let (video, mut mem) = setup();
        let row: Vec<u16> = (0..crate::cpu::SHIFT_REGISTER_WORDS as u16).collect();
        video.from_shift(&mut mem, 0x1000 << 3, &row);
        assert_eq!(mem.word(Region::Vram, 0x1000), 0);
        assert_eq!(mem.word(Region::Vram, 0x1000 + 1023), 1023);

        let mut back = vec![0u16; row.len()];
        video.to_shift(&mem, 0x1000 << 3, &mut back);
        assert_eq!(back, row);
    }

    #[test]
    fn test_palette_write_updates_raw_and_cache() {
        let (video, mut mem) = setup();
        let addr = 0x0180_0000 + (5 << 4);
        video.write_palette(&mut mem, addr, 0x7C1F);
        assert_eq!(video.read_palette(&mem, addr), 0x7C1F);
        assert_eq!(video.host_color(&mem, 5), 0xFFF800F8);
    }

    #[test]
    fn test_incremental_and_full_recalc_agree() {
        let (video, mut mem) = setup();
        // Two passes so every 16-bit value lands in some entry
        for half in [0u32, 0x8000] {
            for entry in 0..PALETTE_ENTRIES as u32 {
                video.write_palette(&mut mem, entry << 4, (half + entry) as u16);
            }
            let incremental = mem.region(Region::PaletteCache).to_vec();

            mem.region_mut(Region::PaletteCache).fill(0);
            video.recalc_palette(&mut mem);
            assert_eq!(mem.region(Region::PaletteCache), &incremental[..]);
        }
    }

    #[test]
    fn test_scanline_reads_ring_and_masks_color() {
        let (mut video, mut mem) = setup();
        let base = (10usize << 9) & ROW_RING_MASK;
        for c in 0..ROW_WORDS {
            mem.set_word(Region::Vram, base + c, 0x8000 | c as u16);
        }

        video.render_scanline(
            &mem,
            &ScanlineParams { row: 10, col: 250, heblnk: 4, hsblnk: 10 },
        );

        let line = &video.indices()[10 * SCREEN_WIDTH..11 * SCREEN_WIDTH];
        // col 250 << 1 = 500, wraps at 512
        let expected: Vec<u16> = (500..516).map(|c| (c & 0x1FF) as u16).collect();
        assert_eq!(&line[..16], &expected[..]);
        assert_eq!(line[16], 0);
    }

    #[test]
    fn test_scanline_outside_screen_is_ignored() {
        let (mut video, mut mem) = setup();
        mem.set_word(Region::Vram, (254 << 9) & ROW_RING_MASK, 0x1234);
        video.render_scanline(
            &mem,
            &ScanlineParams { row: 254, col: 0, heblnk: 0, hsblnk: 200 },
        );
        assert!(video.indices().iter().all(|&i| i == 0));
    }

    #[test]
    fn test_scanline_clamps_to_row_width() {
        let (mut video, mut mem) = setup();
        for c in 0..ROW_WORDS {
            mem.set_word(Region::Vram, ((1usize << 9) & ROW_RING_MASK) + c, 0x0001);
        }
        video.render_scanline(
            &mem,
            &ScanlineParams { row: 0, col: 0, heblnk: 0, hsblnk: 400 },
        );
        // Row 1 untouched even though 800 pixels were requested
        assert!(video.indices()[SCREEN_WIDTH..2 * SCREEN_WIDTH].iter().all(|&i| i == 0));
    }

    #[test]
    fn test_draw_recalcs_once_then_blits() {
        let (mut video, mut mem) = setup();
        mem.set_word(Region::Palette, 0, 0x03E0);
        let mut frame = Frame::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);

        video.request_recalc();
        video.draw(&mut mem, &mut frame);
        assert!(!video.recalc_pending());
        assert!(frame.pixels.iter().all(|&p| p == 0xFF00F800));
    }
}
