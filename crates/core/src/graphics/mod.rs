//! Reusable graphics utilities for emulator systems
//!
//! Color conversion shared by system crates that present a palette-mapped
//! framebuffer to the host.

pub mod color;

pub use color::ColorOps;
