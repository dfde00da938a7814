//! Mortal Kombat control panel and DIP switches

use crate::TUnitError;

/// Controls wired to the three input ports. Ports are active-low on the
/// bus; here a set bit means pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Coin1,
    Coin2,
    Coin3,
    Coin4,
    P1Start,
    P1Up,
    P1Down,
    P1Left,
    P1Right,
    P1Button1,
    P1Button2,
    P1Button3,
    P1Button4,
    P1Button5,
    P1Button6,
    P2Start,
    P2Up,
    P2Down,
    P2Left,
    P2Right,
    P2Button1,
    P2Button2,
    P2Button3,
    P2Button4,
    P2Button5,
    P2Button6,
    Service,
    ServiceMode,
    Tilt,
}

const JOY1: usize = 0;
const JOY2: usize = 1;

impl Button {
    /// Input port and bit the button drives.
    pub const fn location(self) -> (usize, u16) {
        use Button::*;
        match self {
            Coin1 => (JOY2, 0),
            Coin2 => (JOY2, 1),
            Coin3 => (JOY2, 7),
            Coin4 => (JOY2, 8),
            P1Start => (JOY2, 2),
            P1Up => (JOY1, 0),
            P1Down => (JOY1, 1),
            P1Left => (JOY1, 2),
            P1Right => (JOY1, 3),
            P1Button1 => (JOY1, 4),
            P1Button2 => (JOY1, 5),
            P1Button3 => (JOY1, 6),
            P1Button4 => (JOY2, 12),
            P1Button5 => (JOY2, 13),
            P1Button6 => (JOY2, 15),
            P2Start => (JOY2, 5),
            P2Up => (JOY1, 8),
            P2Down => (JOY1, 9),
            P2Left => (JOY1, 10),
            P2Right => (JOY1, 11),
            P2Button1 => (JOY1, 12),
            P2Button2 => (JOY1, 13),
            P2Button3 => (JOY1, 14),
            P2Button4 => (JOY2, 9),
            P2Button5 => (JOY2, 10),
            P2Button6 => (JOY2, 11),
            Service => (JOY2, 6),
            ServiceMode => (JOY2, 4),
            Tilt => (JOY2, 3),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    ports: [u16; 3],
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let (port, bit) = button.location();
        if pressed {
            self.ports[port] |= 1 << bit;
        } else {
            self.ports[port] &= !(1 << bit);
        }
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        let (port, bit) = button.location();
        self.ports[port] & (1 << bit) != 0
    }

    pub fn release_all(&mut self) {
        self.ports = [0; 3];
    }

    /// Port words as latched at the top of a frame.
    pub fn snapshot(&self) -> [u16; 3] {
        self.ports
    }
}

/// One DIP switch setting: a masked field in one of the two banks.
#[derive(Debug, Clone, Copy)]
pub struct DipSetting {
    pub name: &'static str,
    pub bank: usize,
    pub mask: u8,
    pub options: &'static [(&'static str, u8)],
}

pub const DEFAULT_DIPS: [u8; 2] = [0x7d, 0xf0];

pub const MK_DIPS: &[DipSetting] = &[
    DipSetting {
        name: "Test Switch",
        bank: 0,
        mask: 0x01,
        options: &[("Off", 0x01), ("On", 0x00)],
    },
    DipSetting {
        name: "Counters",
        bank: 0,
        mask: 0x02,
        options: &[("One", 0x02), ("Two", 0x00)],
    },
    DipSetting {
        name: "Coinage",
        bank: 0,
        mask: 0x7c,
        options: &[
            ("USA-1", 0x7c),
            ("USA-2", 0x3c),
            ("USA-3", 0x5c),
            ("USA-4", 0x1c),
            ("USA-ECA", 0x6c),
            ("USA-Free Play", 0x0c),
            ("German-1", 0x74),
            ("German-2", 0x34),
            ("German-3", 0x54),
            ("German-4", 0x14),
            ("German-5", 0x64),
            ("German-ECA", 0x24),
            ("German-Free Play", 0x04),
            ("French-1", 0x78),
            ("French-2", 0x38),
            ("French-3", 0x58),
            ("French-4", 0x18),
            ("French-ECA", 0x68),
            ("French-Free Play", 0x08),
        ],
    },
    DipSetting {
        name: "Coinage Source",
        bank: 0,
        mask: 0x80,
        options: &[("Dipswitch", 0x80), ("CMOS", 0x00)],
    },
    DipSetting {
        name: "Skip Powerup Test",
        bank: 1,
        mask: 0x01,
        options: &[("Off", 0x01), ("On", 0x00)],
    },
    DipSetting {
        name: "Comic Book Offer",
        bank: 1,
        mask: 0x08,
        options: &[("Off", 0x00), ("On", 0x08)],
    },
    DipSetting {
        name: "Attract Sound",
        bank: 1,
        mask: 0x10,
        options: &[("Off", 0x00), ("On", 0x10)],
    },
    DipSetting {
        name: "Low Blows",
        bank: 1,
        mask: 0x20,
        options: &[("Off", 0x00), ("On", 0x20)],
    },
    DipSetting {
        name: "Blood",
        bank: 1,
        mask: 0x40,
        options: &[("Off", 0x00), ("On", 0x40)],
    },
    DipSetting {
        name: "Violence",
        bank: 1,
        mask: 0x80,
        options: &[("Off", 0x00), ("On", 0x80)],
    },
];

/// Apply a named option to a pair of DIP banks.
pub fn set_dip(banks: &mut [u8; 2], name: &str, option: &str) -> Result<(), TUnitError> {
    let setting = MK_DIPS
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| TUnitError::InvalidDipSetting(name.to_string()))?;
    let (_, value) = setting
        .options
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(option))
        .ok_or_else(|| TUnitError::InvalidDipSetting(format!("{}={}", name, option)))?;

    let bank = &mut banks[setting.bank];
    *bank = (*bank & !setting.mask) | (value & setting.mask);
    Ok(())
}

/// Current option label of a setting, if the bits match one.
pub fn dip_option(banks: &[u8; 2], name: &str) -> Option<&'static str> {
    let setting = MK_DIPS.iter().find(|d| d.name.eq_ignore_ascii_case(name))?;
    let bits = banks[setting.bank] & setting.mask;
    setting
        .options
        .iter()
        .find(|(_, v)| *v == bits)
        .map(|(label, _)| *label)
}
