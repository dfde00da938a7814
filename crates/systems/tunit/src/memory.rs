//! Backing store for every ROM and RAM region on the board
//!
//! All regions live in one allocation. The layout is computed twice, once as a
//! dry run to size the allocation and once against the allocated buffer, and
//! both passes must agree.

use crate::TUnitError;

/// Named regions, in allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// TMS34010 program ROM, two byte-interleaved chips
    BootRom,
    /// ADPCM sample ROMs for the sound board
    SoundRom,
    /// Graphics ROM, four byte-interleaved lanes per bank
    GfxRom,
    /// M6809 program ROM
    SoundProgRom,
    /// M6809 work RAM (first region of the RAM block)
    SoundProgRam,
    /// TMS34010 work RAM
    WorkRam,
    /// Battery-backed CMOS
    Nvram,
    /// Raw RGB555 palette words
    Palette,
    /// Palette converted to host ARGB, one u32 per entry
    PaletteCache,
    /// Video RAM, two byte lanes per word (last region of the RAM block)
    Vram,
}

impl Region {
    pub const ALL: [Region; 10] = [
        Region::BootRom,
        Region::SoundRom,
        Region::GfxRom,
        Region::SoundProgRom,
        Region::SoundProgRam,
        Region::WorkRam,
        Region::Nvram,
        Region::Palette,
        Region::PaletteCache,
        Region::Vram,
    ];

    /// Size of the region in bytes
    pub const fn size(self) -> usize {
        match self {
            Region::BootRom => 0x0800000,
            Region::SoundRom => 0x1000000,
            Region::GfxRom => 0x2000000,
            Region::SoundProgRom => 0x0040000,
            Region::SoundProgRam => 0x0002000,
            Region::WorkRam => 0x0400000 * 2,
            Region::Nvram => 0x0060000 * 2,
            Region::Palette => 0x0020000,
            Region::PaletteCache => 0x0008000 * 4,
            Region::Vram => 0x0400000 * 2,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Byte range of one region inside the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Offsets of every region plus the total size they occupy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLayout {
    spans: [Span; 10],
    ram_start: usize,
    ram_end: usize,
    total: usize,
}

impl MemoryLayout {
    /// Dry run: compute offsets without touching memory.
    pub fn measure() -> Self {
        let mut next = 0usize;
        let mut spans = [Span { offset: 0, len: 0 }; 10];
        let mut ram_start = 0;

        for region in Region::ALL {
            if region == Region::SoundProgRam {
                ram_start = next;
            }
            spans[region.index()] = Span {
                offset: next,
                len: region.size(),
            };
            next += region.size();
        }

        Self {
            spans,
            ram_start,
            ram_end: next,
            total: next,
        }
    }

    pub fn span(&self, region: Region) -> Span {
        self.spans[region.index()]
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Range of the contiguous RAM block (sound RAM through VRAM)
    pub fn ram_span(&self) -> Span {
        Span {
            offset: self.ram_start,
            len: self.ram_end - self.ram_start,
        }
    }
}

/// The single allocation holding every region.
pub struct Memory {
    layout: MemoryLayout,
    data: Vec<u8>,
}

impl Memory {
    /// Measure, allocate, then lay out again against the real buffer.
    pub fn allocate() -> Result<Self, TUnitError> {
        let dry_run = MemoryLayout::measure();
        let bytes = dry_run.total();

        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| TUnitError::Allocation { bytes })?;
        data.resize(bytes, 0);

        let layout = MemoryLayout::measure();
        debug_assert_eq!(layout, dry_run);
        if layout.total() != data.len() {
            return Err(TUnitError::Allocation { bytes });
        }

        Ok(Self { layout, data })
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub fn region(&self, region: Region) -> &[u8] {
        let span = self.layout.span(region);
        &self.data[span.offset..span.end()]
    }

    pub fn region_mut(&mut self, region: Region) -> &mut [u8] {
        let span = self.layout.span(region);
        &mut self.data[span.offset..span.end()]
    }

    /// Every RAM region as one slice, for save states.
    pub fn ram_block(&self) -> &[u8] {
        let span = self.layout.ram_span();
        &self.data[span.offset..span.end()]
    }

    pub fn ram_block_mut(&mut self) -> &mut [u8] {
        let span = self.layout.ram_span();
        &mut self.data[span.offset..span.end()]
    }

    #[inline]
    fn locate(&self, region: Region, offset: usize, width: usize) -> usize {
        let span = self.layout.span(region);
        debug_assert!(
            offset + width <= span.len,
            "{:?} access at {:#X} overruns region of {:#X} bytes",
            region,
            offset,
            span.len
        );
        span.offset + offset
    }

    #[inline]
    pub fn read_u8(&self, region: Region, offset: usize) -> u8 {
        self.data[self.locate(region, offset, 1)]
    }

    #[inline]
    pub fn write_u8(&mut self, region: Region, offset: usize, value: u8) {
        let at = self.locate(region, offset, 1);
        self.data[at] = value;
    }

    /// Little-endian word at a byte offset
    #[inline]
    pub fn read_u16(&self, region: Region, offset: usize) -> u16 {
        let at = self.locate(region, offset, 2);
        u16::from_le_bytes([self.data[at], self.data[at + 1]])
    }

    #[inline]
    pub fn write_u16(&mut self, region: Region, offset: usize, value: u16) {
        let at = self.locate(region, offset, 2);
        self.data[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn read_u32(&self, region: Region, offset: usize) -> u32 {
        let at = self.locate(region, offset, 4);
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[at..at + 4]);
        u32::from_le_bytes(bytes)
    }

    #[inline]
    pub fn write_u32(&mut self, region: Region, offset: usize, value: u32) {
        let at = self.locate(region, offset, 4);
        self.data[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Word-indexed view helpers for regions organised as 16-bit words
    #[inline]
    pub fn word(&self, region: Region, index: usize) -> u16 {
        self.read_u16(region, index * 2)
    }

    #[inline]
    pub fn set_word(&mut self, region: Region, index: usize, value: u16) {
        self.write_u16(region, index * 2, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_matches_allocation() {
        let dry = MemoryLayout::measure();
        let mem = Memory::allocate().unwrap();
        assert_eq!(mem.layout(), &dry);
        assert_eq!(dry.total(), Region::ALL.iter().map(|r| r.size()).sum::<usize>());
    }

    #[test]
    fn test_regions_do_not_overlap() {
        let layout = MemoryLayout::measure();
        for (i, a) in Region::ALL.iter().enumerate() {
            for b in &Region::ALL[i + 1..] {
                assert!(
                    !layout.span(*a).overlaps(&layout.span(*b)),
                    "{:?} overlaps {:?}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_regions_in_fixed_order() {
        let layout = MemoryLayout::measure();
        let mut expected = 0;
        for region in Region::ALL {
            assert_eq!(layout.span(region).offset, expected);
            expected += region.size();
        }
    }

    #[test]
    fn test_ram_block_spans_sound_ram_to_vram() {
        let layout = MemoryLayout::measure();
        let ram = layout.ram_span();
        assert_eq!(ram.offset, layout.span(Region::SoundProgRam).offset);
        assert_eq!(ram.end(), layout.span(Region::Vram).end());
        assert_eq!(ram.end(), layout.total());
    }

    #[test]
    fn test_word_access_is_little_endian() {
        let mut mem = Memory::allocate().unwrap();
        mem.write_u16(Region::WorkRam, 0x10, 0xBEEF);
        assert_eq!(mem.read_u8(Region::WorkRam, 0x10), 0xEF);
        assert_eq!(mem.read_u8(Region::WorkRam, 0x11), 0xBE);
        assert_eq!(mem.word(Region::WorkRam, 8), 0xBEEF);

        mem.write_u32(Region::PaletteCache, 4, 0x11223344);
        assert_eq!(mem.read_u32(Region::PaletteCache, 4), 0x11223344);
    }

    #[test]
    fn test_regions_are_isolated() {
        let mut mem = Memory::allocate().unwrap();
        let last = Region::Palette.size() - 1;
        mem.write_u8(Region::Palette, last, 0xAA);
        assert_eq!(mem.read_u8(Region::PaletteCache, 0), 0);
        assert_eq!(mem.region(Region::Palette)[last], 0xAA);
    }
}
