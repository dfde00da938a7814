//! Midway T-Unit arcade board (Mortal Kombat)
//!
//! # Architecture
//!
//! - **Main CPU**: TMS34010 @ 6.25 MHz (50 MHz input), bit-addressed bus
//! - **Sound CPU**: Motorola 6809 @ 2 MHz with a YM2151 FM chip
//! - **Video**: 400x254 framebuffer at 54.71 Hz, 15-bit palette
//! - **Protection**: sequence-generating security chip
//! - **CMOS**: battery-backed, write-enable latch
//!
//! The CPU interpreters and the FM chip are supplied by the embedder through
//! the traits in [`cpu`] and [`sound`]. Idle stand-ins are provided so the
//! board can run without them.

pub mod bus;
pub mod config;
pub mod cpu;
pub mod input;
pub mod memory;
pub mod protection;
pub mod roms;
pub mod scan;
pub mod sound;
pub mod system;
pub mod timing;
pub mod video;

use thiserror::Error;

pub use bus::TUnitBus;
pub use config::TUnitConfig;
pub use input::Button;
pub use roms::RomProvider;
pub use scan::{ScanAction, Snapshot, StateWalker};
pub use system::TUnitSystem;

#[derive(Error, Debug)]
pub enum TUnitError {
    #[error("Failed to allocate {bytes} bytes of board memory")]
    Allocation { bytes: usize },
    #[error("ROM not found: {0}")]
    MissingRom(String),
    #[error("ROM {name} is {actual} bytes, expected {expected}")]
    RomSize {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("NVRAM image is {actual} bytes, expected {expected}")]
    NvramSize { expected: usize, actual: usize },
    #[error("Unknown DIP switch setting: {0}")]
    InvalidDipSetting(String),
    #[error("Invalid mount point: {0}")]
    InvalidMountPoint(String),
}
