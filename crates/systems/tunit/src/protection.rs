//! Mortal Kombat protection chip
//!
//! The chip answers reads with successive values from a fixed sequence. Boot
//! code writes a value from the sequence to resynchronise, then checks that
//! the following reads continue from that point.

use emu_core::logging::{log, LogCategory, LogLevel};

/// Two passes of a 31-step 6-bit sequence, terminated by 0xFF.
pub const RESPONSES: [u8; 57] = [
    0x13, 0x27, 0x0f, 0x1f, 0x3e, 0x3d, 0x3b, 0x37, //
    0x2e, 0x1c, 0x38, 0x31, 0x22, 0x05, 0x0a, 0x15, //
    0x2b, 0x16, 0x2d, 0x1a, 0x34, 0x28, 0x10, 0x21, //
    0x03, 0x06, 0x0c, 0x19, 0x32, 0x24, 0x09, 0x13, //
    0x27, 0x0f, 0x1f, 0x3e, 0x3d, 0x3b, 0x37, 0x2e, //
    0x1c, 0x38, 0x31, 0x22, 0x05, 0x0a, 0x15, 0x2b, //
    0x16, 0x2d, 0x1a, 0x34, 0x28, 0x10, 0x21, 0x03, //
    0xff,
];

/// Response bits live in D9..D14 of the bus word.
const VALUE_SHIFT: u32 = 9;
const KEY_MASK: u16 = 0x3f;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Protection {
    index: u8,
}

impl Protection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    /// Restore a cursor from a save state; out-of-range values wrap to 0.
    pub fn set_index(&mut self, index: u8) {
        self.index = if (index as usize) < RESPONSES.len() {
            index
        } else {
            0
        };
    }

    pub fn read(&mut self) -> u16 {
        let value = RESPONSES[self.index as usize];
        self.index = ((self.index as usize + 1) % RESPONSES.len()) as u8;
        (value as u16) << VALUE_SHIFT
    }

    pub fn write(&mut self, data: u16) {
        let key = ((data >> VALUE_SHIFT) & KEY_MASK) as u8;
        self.index = RESPONSES
            .iter()
            .position(|&v| v == key)
            .unwrap_or(0) as u8;

        log(LogCategory::Protection, LogLevel::Trace, || {
            format!("Protection: key {:02X} -> index {}", key, self.index)
        });
    }
}
