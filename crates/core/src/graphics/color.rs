//! Palette color conversion
//!
//! Host pixels are opaque ARGB8888 (0xAARRGGBB). Arcade palettes store
//! packed 15-bit RGB which is widened here.

pub struct ColorOps;

impl ColorOps {
    /// Pack 8-bit channels into an opaque host pixel.
    #[inline]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> u32 {
        0xFF00_0000 | u32::from_be_bytes([0, r, g, b])
    }

    /// Split a host pixel into (r, g, b); alpha is dropped.
    #[inline]
    pub fn channels(color: u32) -> (u8, u8, u8) {
        let [_, r, g, b] = color.to_be_bytes();
        (r, g, b)
    }

    /// Widen a packed xRRRRRGGGGGBBBBB color to opaque ARGB.
    ///
    /// Each 5-bit channel lands in the top bits of its byte and the low three
    /// bits stay clear, the same as a plain shift into the DACs.
    ///
    /// ```
    /// use emu_core::graphics::ColorOps;
    ///
    /// assert_eq!(ColorOps::from_rgb555(0x7FFF), 0xFFF8F8F8);
    /// assert_eq!(ColorOps::from_rgb555(0x001F), 0xFF0000F8);
    /// ```
    #[inline]
    pub fn from_rgb555(value: u16) -> u32 {
        let v = value as u32;
        let r = (v >> 7) & 0xF8;
        let g = (v >> 2) & 0xF8;
        let b = (v << 3) & 0xF8;
        Self::from_rgb(r as u8, g as u8, b as u8)
    }
}
