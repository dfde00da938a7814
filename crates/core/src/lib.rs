//! Core emulator primitives and traits shared by system crates.

pub mod graphics;
pub mod logging;

pub mod types {
    use serde::{Deserialize, Serialize};

    /// A host-ready framebuffer of opaque ARGB8888 pixels.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; (width * height) as usize],
            }
        }

        /// Borrow one row of pixels.
        pub fn row(&self, y: u32) -> &[u32] {
            let start = (y * self.width) as usize;
            &self.pixels[start..start + self.width as usize]
        }
    }

    /// Interleaved stereo samples are stored as consecutive left/right pairs.
    pub type AudioSample = i16;
}

use serde_json::Value;

/// A slot a system accepts media into (a cartridge port, or one ROM chip).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPointInfo {
    /// Key passed to [`System::mount`], e.g. "mkt-uj12.bin"
    pub id: String,
    pub name: String,
    /// Accepted file extensions, without the dot
    pub extensions: Vec<String>,
    /// The system cannot boot while this slot is empty
    pub required: bool,
}

/// Everything a frontend needs to drive one emulated machine.
pub trait System {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Soft reset. Battery-backed memory survives.
    fn reset(&mut self);

    /// Run one video frame and hand back the finished picture.
    fn step_frame(&mut self) -> Result<types::Frame, Self::Error>;

    /// Register state as JSON. ROM contents are never included.
    fn save_state(&self) -> Value;

    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error>;

    fn supports_save_states(&self) -> bool {
        false
    }

    fn mount_points(&self) -> Vec<MountPointInfo>;

    /// Copy `data` into the slot named `mount_point_id`.
    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error>;

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error>;

    fn is_mounted(&self, mount_point_id: &str) -> bool;
}
