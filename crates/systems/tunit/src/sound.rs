//! Sound board bridge: M6809 address space, YM2151 ports and the sound latch
//!
//! Sound CPU memory map:
//! - 0x0000-0x1FFF: program RAM
//! - 0x2400: YM2151 register select (write)
//! - 0x2401: YM2151 register data (write)
//! - 0x4000-0xFFFF: program ROM window
//!
//! The YM2151 timer IRQ drives the 6809 FIRQ line.

use crate::cpu::SoundBus;
use crate::memory::{Memory, Region};
use emu_core::logging::{log, LogCategory, LogLevel};

const RAM_END: u16 = 0x1FFF;
const ROM_BASE: u16 = 0x4000;
const FM_SELECT: u16 = 0x2400;
const FM_DATA: u16 = 0x2401;

/// Status polls answered "ready" after each sound command.
pub const SOUND_ACK_POLLS: u8 = 128;

/// YM2151 collaborator.
pub trait FmSynth {
    fn reset(&mut self);
    fn select_register(&mut self, reg: u8);
    fn write_register(&mut self, data: u8);

    /// Render `out.len() / 2` interleaved stereo samples.
    fn render(&mut self, out: &mut [i16]);

    /// Current level of the timer IRQ output.
    fn irq(&self) -> bool;
}

/// FM chip stand-in: keeps the register file, renders silence, never
/// raises its IRQ.
#[derive(Debug, Clone)]
pub struct SilentFm {
    selected: u8,
    registers: [u8; 256],
}

impl Default for SilentFm {
    fn default() -> Self {
        Self {
            selected: 0,
            registers: [0; 256],
        }
    }
}

impl SilentFm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.registers[reg as usize]
    }
}

impl FmSynth for SilentFm {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn select_register(&mut self, reg: u8) {
        self.selected = reg;
    }

    fn write_register(&mut self, data: u8) {
        self.registers[self.selected as usize] = data;
    }

    fn render(&mut self, out: &mut [i16]) {
        out.fill(0);
    }

    fn irq(&self) -> bool {
        false
    }
}

pub struct SoundBridge {
    fm: Box<dyn FmSynth>,
    firq: bool,
    ack_polls: u8,
    command: u8,
}

impl SoundBridge {
    pub fn new(fm: Box<dyn FmSynth>) -> Self {
        Self {
            fm,
            firq: false,
            ack_polls: 0,
            command: 0,
        }
    }

    pub fn reset(&mut self) {
        self.fm.reset();
        self.ack_polls = 0;
        self.sync_irq();
    }

    pub fn fm(&self) -> &dyn FmSynth {
        self.fm.as_ref()
    }

    pub fn firq(&self) -> bool {
        self.firq
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    pub fn ack_polls(&self) -> u8 {
        self.ack_polls
    }

    pub(crate) fn ack_polls_mut(&mut self) -> &mut u8 {
        &mut self.ack_polls
    }

    pub(crate) fn command_mut(&mut self) -> &mut u8 {
        &mut self.command
    }

    /// Follow the FM chip's IRQ output onto the FIRQ line.
    fn sync_irq(&mut self) {
        let level = self.fm.irq();
        if level != self.firq {
            log(LogCategory::Sound, LogLevel::Trace, || {
                format!("Sound: FIRQ {}", if level { "asserted" } else { "cleared" })
            });
            self.firq = level;
        }
    }

    pub fn render(&mut self, out: &mut [i16]) {
        if out.is_empty() {
            return;
        }
        self.fm.render(out);
        self.sync_irq();
    }

    /// Main CPU status poll: "ready" (0) while the ack counter runs, else 0xFFFF.
    pub fn read_status(&mut self) -> u16 {
        if self.ack_polls > 0 {
            self.ack_polls -= 1;
            0
        } else {
            0xFFFF
        }
    }

    /// Main CPU command write. Arms the ack counter so the game's busy-wait
    /// on the status port completes without a real handshake.
    pub fn write_command(&mut self, data: u16) {
        self.command = (data & 0xff) as u8;
        self.ack_polls = SOUND_ACK_POLLS;
        log(LogCategory::Sound, LogLevel::Debug, || {
            format!("Sound: command {:02X}", data & 0xff)
        });
    }

    /// Sound CPU view of the board
    pub fn port<'a>(&'a mut self, mem: &'a mut Memory) -> SoundPort<'a> {
        SoundPort { bridge: self, mem }
    }
}

/// Borrowed M6809 bus over the shared backing store.
pub struct SoundPort<'a> {
    bridge: &'a mut SoundBridge,
    mem: &'a mut Memory,
}

impl SoundBus for SoundPort<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=RAM_END => self.mem.read_u8(Region::SoundProgRam, addr as usize),
            ROM_BASE..=0xFFFF => self
                .mem
                .read_u8(Region::SoundProgRom, (addr - ROM_BASE) as usize),
            _ => {
                log(LogCategory::Sound, LogLevel::Debug, || {
                    format!("M6809 Read Byte -> {:04X}", addr)
                });
                0
            }
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            ROM_BASE..=0xFFFF => {}
            0x0000..=RAM_END => self.mem.write_u8(Region::SoundProgRam, addr as usize, value),
            FM_SELECT => {
                self.bridge.fm.select_register(value);
                self.bridge.sync_irq();
            }
            FM_DATA => {
                self.bridge.fm.write_register(value);
                self.bridge.sync_irq();
            }
            _ => log(LogCategory::Sound, LogLevel::Debug, || {
                format!("M6809 Write Byte -> {:04X}, {:02X}", addr, value)
            }),
        }
    }

    fn firq(&self) -> bool {
        self.bridge.firq
    }
}
