//! Processor collaborators
//!
//! The TMS34010 and M6809 interpreters live outside this crate. The board
//! drives them through these traits and hands each one a view of its bus.

use crate::scan::StateWalker;
use crate::video::ScanlineParams;

/// Number of 16-bit words moved by one VRAM shift-register transfer.
pub const SHIFT_REGISTER_WORDS: usize = 1024;

/// Bus as seen by the TMS34010. Addresses are bit addresses.
pub trait MainBus {
    fn read_word(&mut self, addr: u32) -> u16;
    fn write_word(&mut self, addr: u32, value: u16);

    /// Copy a VRAM row into the shift register (`dst` holds [`SHIFT_REGISTER_WORDS`]).
    fn to_shift(&mut self, addr: u32, dst: &mut [u16]);

    /// Copy the shift register back into a VRAM row.
    fn from_shift(&mut self, addr: u32, src: &[u16]);
}

/// Bus as seen by the M6809.
pub trait SoundBus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);

    /// Level of the FIRQ input, driven by the FM chip's timer IRQ.
    fn firq(&self) -> bool;
}

/// Graphics/system processor.
pub trait MainCpu {
    fn reset(&mut self);

    /// Called once at the top of every frame before any slice runs.
    fn new_frame(&mut self) {}

    /// Run for roughly `cycles`; returns the cycles actually executed.
    fn run(&mut self, bus: &mut dyn MainBus, cycles: i32) -> i32;

    /// Advance the display generator to `line`. Returns the scanline to
    /// draw when the line is inside the active display.
    fn scanline(&mut self, line: u32) -> Option<ScanlineParams>;

    /// Save or restore internal registers.
    fn scan(&mut self, _walker: &mut dyn StateWalker) {}
}

/// Sound processor.
pub trait SoundCpu {
    fn reset(&mut self);

    fn new_frame(&mut self) {}

    fn run(&mut self, bus: &mut dyn SoundBus, cycles: i32) -> i32;

    fn scan(&mut self, _walker: &mut dyn StateWalker) {}
}

/// Stand-in for the TMS34010 when no interpreter is attached.
///
/// Consumes its budget exactly and presents a fixed raster: each visible
/// line shows VRAM row `line` from column 0 across the full 400 pixels.
#[derive(Debug, Default)]
pub struct IdleMainCpu {
    cycles: u64,
}

impl IdleMainCpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_cycles(&self) -> u64 {
        self.cycles
    }
}

impl MainCpu for IdleMainCpu {
    fn reset(&mut self) {
        self.cycles = 0;
    }

    fn run(&mut self, _bus: &mut dyn MainBus, cycles: i32) -> i32 {
        self.cycles += cycles.max(0) as u64;
        cycles
    }

    fn scanline(&mut self, line: u32) -> Option<ScanlineParams> {
        (line < crate::video::SCREEN_HEIGHT as u32).then_some(ScanlineParams {
            row: line,
            col: 0,
            heblnk: 0,
            hsblnk: crate::video::SCREEN_WIDTH as u32 / 2,
        })
    }

    fn scan(&mut self, walker: &mut dyn StateWalker) {
        walker.area("idle_main_cycles", bytemuck::bytes_of_mut(&mut self.cycles));
    }
}

/// Stand-in for the M6809 when no interpreter is attached.
#[derive(Debug, Default)]
pub struct IdleSoundCpu {
    cycles: u64,
}

impl IdleSoundCpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_cycles(&self) -> u64 {
        self.cycles
    }
}

impl SoundCpu for IdleSoundCpu {
    fn reset(&mut self) {
        self.cycles = 0;
    }

    fn run(&mut self, _bus: &mut dyn SoundBus, cycles: i32) -> i32 {
        self.cycles += cycles.max(0) as u64;
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBus;

    impl MainBus for NullBus {
        fn read_word(&mut self, _addr: u32) -> u16 {
            0xFFFF
        }
        fn write_word(&mut self, _addr: u32, _value: u16) {}
        fn to_shift(&mut self, _addr: u32, _dst: &mut [u16]) {}
        fn from_shift(&mut self, _addr: u32, _src: &[u16]) {}
    }

    #[test]
    fn test_idle_cpu_consumes_exact_budget() {
        let mut cpu = IdleMainCpu::new();
        assert_eq!(cpu.run(&mut NullBus, 397), 397);
        assert_eq!(cpu.run(&mut NullBus, 3), 3);
        assert_eq!(cpu.total_cycles(), 400);
        cpu.reset();
        assert_eq!(cpu.total_cycles(), 0);
    }

    #[test]
    fn test_idle_raster_covers_visible_lines_only() {
        let mut cpu = IdleMainCpu::new();
        let first = cpu.scanline(0).unwrap();
        assert_eq!(first.row, 0);
        assert_eq!(first.hsblnk * 2 - first.heblnk, 400);
        assert!(cpu.scanline(253).is_some());
        assert!(cpu.scanline(254).is_none());
    }
}
