//! Board configuration

use crate::input::DEFAULT_DIPS;
use crate::timing;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TUnitConfig {
    pub refresh_hz: f64,
    pub main_clock_hz: u32,
    pub sound_clock_hz: u32,
    /// Scheduler slices per frame
    pub interleave: u32,
    pub sample_rate: u32,
    /// Enables the upper graphics bank selected by control bit 7
    pub gfx_rom_large: bool,
    pub dip_switches: [u8; 2],
}

impl Default for TUnitConfig {
    fn default() -> Self {
        Self {
            refresh_hz: 54.71,
            main_clock_hz: 6_250_000,
            sound_clock_hz: 2_000_000,
            interleave: 288,
            sample_rate: 44_100,
            gfx_rom_large: false,
            dip_switches: DEFAULT_DIPS,
        }
    }
}

impl TUnitConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn main_cycles_per_frame(&self) -> i64 {
        timing::frame_budget(self.main_clock_hz, self.refresh_hz)
    }

    pub fn sound_cycles_per_frame(&self) -> i64 {
        timing::frame_budget(self.sound_clock_hz, self.refresh_hz)
    }

    pub fn samples_per_frame(&self) -> usize {
        timing::frame_samples(self.sample_rate, self.refresh_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_hardware() {
        let cfg = TUnitConfig::default();
        assert_eq!(cfg.main_cycles_per_frame(), 114_238);
        assert_eq!(cfg.sound_cycles_per_frame(), 36_556);
        assert_eq!(cfg.samples_per_frame(), 806);
        assert_eq!(cfg.dip_switches, [0x7d, 0xf0]);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = TUnitConfig::from_json(r#"{ "sample_rate": 48000, "gfx_rom_large": true }"#)
            .unwrap();
        assert_eq!(cfg.sample_rate, 48_000);
        assert!(cfg.gfx_rom_large);
        assert_eq!(cfg.interleave, 288);
    }
}
