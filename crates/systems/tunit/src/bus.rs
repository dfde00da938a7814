//! T-Unit main CPU bus
//!
//! Every TMS34010 access is resolved through an address map of tagged
//! handlers. A catch-all `Unmapped` entry is registered first; later entries
//! take priority over the ranges they cover. Reads and writes resolve
//! independently, so a read-only window lets writes fall through to whatever
//! was registered beneath it.
//!
//! Memory Map (bit addresses):
//! - 0x00000000-0x003FFFFF: VRAM
//! - 0x01000000-0x013FFFFF: work RAM
//! - 0x01400000-0x0141FFFF: CMOS
//! - 0x01480000-0x014FFFFF: CMOS write enable (write)
//! - 0x01600000-0x0160003F: inputs / DIP switches (read)
//! - 0x01800000-0x0187FFFF: palette
//! - 0x01A80000-0x01A800FF: DMA registers
//! - 0x01B00000-0x01B6FFFF: protection chip
//! - 0x01D00000-0x01D0001F: sound status (read)
//! - 0x01D01020-0x01D0103F: sound command
//! - 0x01F00000-0x01F0001F: control register (write)
//! - 0x02000000-0x07FFFFFF: graphics ROM window (read)
//! - 0x1F800000-0x1FFFFFFF: boot ROM mirror (read)
//! - 0xFF800000-0xFFFFFFFF: boot ROM (read)

use crate::cpu::{MainBus, SHIFT_REGISTER_WORDS};
use crate::memory::{Memory, Region};
use crate::protection::Protection;
use crate::sound::SoundBridge;
use crate::video::Video;
use emu_core::logging::{log, LogCategory, LogLevel};

pub const WATCHDOG_ADDR: u32 = 0x01d8_1070;
const UNKNOWN_STATUS_ADDR: u32 = 0x0160_0040;

pub const DMA_REGISTERS: usize = 32;
pub const DMA_COMMAND: usize = 1;
pub const DMA_PALETTE: usize = 8;

const BOOT_ROM_BASE: u32 = 0xFF80_0000;
const BOOT_ROM_MIRROR: u32 = 0x1F80_0000;
const WORK_RAM_BASE: u32 = 0x0100_0000;
const DMA_BASE: u32 = 0x01a8_0000;
const SOUND_BASE: u32 = 0x01d0_1020;
const GFX_ROM_BASE: u32 = 0x0200_0000;

const CMOS_ADDR_MASK: u32 = 0x1_FFFF;

/// Control register bits
const CTRL_GFX_BANK: u16 = 0x0080;
const CTRL_VIDEO_BANK_SHIFT: u16 = 5;

/// Graphics bank offsets. Only slot 0 is ever selected.
const GFX_BANK_SLOTS: [u32; 2] = [0x000000, 0x400000];
const GFX_HIGH_BANK: u32 = 0x800000;

/// Which side of the board services an access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Unmapped,
    BootRom,
    WorkRam,
    Vram,
    Cmos,
    CmosWriteEnable,
    Input,
    Palette,
    Dma,
    Protection,
    SoundStatus,
    Sound,
    Control,
    GfxRom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    fn reads(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    fn writes(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub start: u32,
    pub end: u32,
    pub handler: Handler,
    pub access: Access,
}

/// Ordered handler table; the most recently registered match wins.
#[derive(Debug, Clone, Default)]
pub struct AddressMap {
    mappings: Vec<Mapping>,
}

impl AddressMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers see addresses relative to `start`.
    pub fn register(&mut self, start: u32, end: u32, handler: Handler, access: Access) {
        debug_assert!(start <= end);
        self.mappings.push(Mapping {
            start,
            end,
            handler,
            access,
        });
    }

    pub fn resolve_read(&self, addr: u32) -> Option<&Mapping> {
        self.mappings
            .iter()
            .rev()
            .find(|m| m.access.reads() && (m.start..=m.end).contains(&addr))
    }

    pub fn resolve_write(&self, addr: u32) -> Option<&Mapping> {
        self.mappings
            .iter()
            .rev()
            .find(|m| m.access.writes() && (m.start..=m.end).contains(&addr))
    }

    /// The T-Unit board map.
    pub fn tunit() -> Self {
        use Access::*;
        let mut map = Self::new();
        map.register(0x0000_0000, 0xFFFF_FFFF, Handler::Unmapped, ReadWrite);
        map.register(BOOT_ROM_BASE, 0xFFFF_FFFF, Handler::BootRom, Read);
        map.register(BOOT_ROM_MIRROR, 0x1FFF_FFFF, Handler::BootRom, Read);
        map.register(WORK_RAM_BASE, 0x013F_FFFF, Handler::WorkRam, ReadWrite);
        map.register(0x0000_0000, 0x003F_FFFF, Handler::Vram, ReadWrite);
        map.register(0x0140_0000, 0x0141_FFFF, Handler::Cmos, ReadWrite);
        map.register(0x0148_0000, 0x014F_FFFF, Handler::CmosWriteEnable, Write);
        map.register(0x0160_0000, 0x0160_003F, Handler::Input, Read);
        map.register(0x0180_0000, 0x0187_FFFF, Handler::Palette, ReadWrite);
        map.register(DMA_BASE, 0x01A8_00FF, Handler::Dma, ReadWrite);
        map.register(0x01B0_0000, 0x01B6_FFFF, Handler::Protection, ReadWrite);
        map.register(0x01D0_0000, 0x01D0_001F, Handler::SoundStatus, Read);
        map.register(SOUND_BASE, 0x01D0_103F, Handler::Sound, ReadWrite);
        map.register(0x01F0_0000, 0x01F0_001F, Handler::Control, Write);
        map.register(GFX_ROM_BASE, 0x07FF_FFFF, Handler::GfxRom, Read);
        map
    }
}

/// The board: every piece of state the main CPU can reach.
pub struct TUnitBus {
    pub(crate) mem: Memory,
    pub(crate) video: Video,
    pub(crate) protection: Protection,
    pub(crate) sound: SoundBridge,
    pub(crate) dma: [u16; DMA_REGISTERS],
    pub(crate) control: u16,
    pub(crate) cmos_write_enable: bool,
    gfx_bank_offset: [u32; 2],
    gfx_rom_large: bool,
    inputs: [u16; 3],
    dip: [u8; 2],
    map: AddressMap,
}

impl TUnitBus {
    pub fn new(mem: Memory, sound: SoundBridge, gfx_rom_large: bool) -> Self {
        Self {
            mem,
            video: Video::new(),
            protection: Protection::new(),
            sound,
            dma: [0; DMA_REGISTERS],
            control: 0,
            cmos_write_enable: false,
            gfx_bank_offset: GFX_BANK_SLOTS,
            gfx_rom_large,
            inputs: [0; 3],
            dip: [0; 2],
            map: AddressMap::tunit(),
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn video(&self) -> &Video {
        &self.video
    }

    pub fn map(&self) -> &AddressMap {
        &self.map
    }

    pub fn control(&self) -> u16 {
        self.control
    }

    pub fn cmos_write_enabled(&self) -> bool {
        self.cmos_write_enable
    }

    pub fn gfx_bank_offset(&self) -> u32 {
        self.gfx_bank_offset[0]
    }

    pub fn dma_register(&self, reg: usize) -> u16 {
        self.dma[reg % DMA_REGISTERS]
    }

    /// Latch the per-frame input snapshot (active-high button words).
    pub fn latch_inputs(&mut self, buttons: [u16; 3], dip: [u8; 2]) {
        self.inputs = buttons;
        self.dip = dip;
    }

    pub fn set_gfx_rom_large(&mut self, large: bool) {
        self.gfx_rom_large = large;
        self.apply_control(self.control);
    }

    /// Decode the control register into bank selections.
    pub(crate) fn apply_control(&mut self, value: u16) {
        self.control = value;
        self.gfx_bank_offset[0] = if value & CTRL_GFX_BANK != 0 && self.gfx_rom_large {
            GFX_HIGH_BANK
        } else {
            GFX_BANK_SLOTS[0]
        };
        self.video.set_bank(((value >> CTRL_VIDEO_BANK_SHIFT) & 1) as u32);
    }

    fn read_unmapped(&self, addr: u32) -> u16 {
        match addr {
            UNKNOWN_STATUS_ADDR | WATCHDOG_ADDR => 0x00ff,
            _ => {
                log(LogCategory::Bus, LogLevel::Debug, || format!("Read {:x}", addr));
                0xffff
            }
        }
    }

    fn write_unmapped(&self, addr: u32, value: u16) {
        if addr == WATCHDOG_ADDR {
            return;
        }
        log(LogCategory::Bus, LogLevel::Debug, || {
            format!("Write {:x}, {:x}", addr, value)
        });
    }

    fn read_input(&self, addr: u32) -> u16 {
        match (addr & 0xff) >> 4 {
            port @ 0..=2 => !self.inputs[port as usize],
            3 => self.dip[0] as u16 | ((self.dip[1] as u16) << 8),
            _ => 0xffff,
        }
    }

    fn cmos_index(addr: u32) -> usize {
        ((addr & CMOS_ADDR_MASK) >> 1) as usize
    }

    fn write_dma(&mut self, offset: u32, value: u16) {
        let reg = ((offset >> 4) as usize) % DMA_REGISTERS;
        self.dma[reg] = value;
        if reg == DMA_COMMAND && value & 0x8000 != 0 {
            log(LogCategory::Stubs, LogLevel::Warn, || {
                format!("DMA: blit requested (command {:04X}), no blitter attached", value)
            });
        }
    }

    fn read_gfx(&self, offset: u32) -> u16 {
        let o = (self.gfx_bank_offset[0] + (offset >> 3)) as usize;
        let rom = self.mem.region(Region::GfxRom);
        rom[o] as u16 | ((rom[o + 1] as u16) << 8)
    }

    fn read_with(&mut self, mapping: Mapping, addr: u32) -> u16 {
        let offset = addr.wrapping_sub(mapping.start);
        match mapping.handler {
            Handler::Unmapped => self.read_unmapped(addr),
            Handler::BootRom => self.mem.read_u16(Region::BootRom, (offset >> 3) as usize),
            Handler::WorkRam => self.mem.read_u16(Region::WorkRam, (offset >> 3) as usize),
            Handler::Vram => self.video.read_vram(&self.mem, addr),
            Handler::Cmos => self.mem.word(Region::Nvram, Self::cmos_index(addr)),
            Handler::Input => self.read_input(addr),
            Handler::Palette => self.video.read_palette(&self.mem, addr),
            Handler::Dma => self.dma[((offset >> 4) as usize) % DMA_REGISTERS],
            Handler::Protection => self.protection.read(),
            Handler::SoundStatus => self.sound.read_status(),
            Handler::Sound => {
                log(LogCategory::Sound, LogLevel::Debug, || format!("Sound Read {:x}", addr));
                0xffff
            }
            Handler::GfxRom => self.read_gfx(offset),
            Handler::CmosWriteEnable | Handler::Control => self.read_unmapped(addr),
        }
    }

    fn write_with(&mut self, mapping: Mapping, addr: u32, value: u16) {
        let offset = addr.wrapping_sub(mapping.start);
        match mapping.handler {
            Handler::Unmapped => self.write_unmapped(addr, value),
            Handler::WorkRam => self.mem.write_u16(Region::WorkRam, (offset >> 3) as usize, value),
            Handler::Vram => {
                let latch = self.dma[DMA_PALETTE];
                self.video.write_vram(&mut self.mem, addr, value, latch);
            }
            Handler::Cmos => {
                if self.cmos_write_enable {
                    self.mem.set_word(Region::Nvram, Self::cmos_index(addr), value);
                }
            }
            Handler::CmosWriteEnable => self.cmos_write_enable = true,
            Handler::Palette => self.video.write_palette(&mut self.mem, addr, value),
            Handler::Dma => self.write_dma(offset, value),
            Handler::Protection => self.protection.write(value),
            Handler::Sound => {
                if offset >> 4 != 0 {
                    log(LogCategory::Sound, LogLevel::Warn, || {
                        format!("Unexpected write to sound (hi) {:x} = {:04X}", addr, value)
                    });
                    return;
                }
                log(LogCategory::Sound, LogLevel::Debug, || {
                    format!("Sound Write {:x}, {:x}", addr, value)
                });
                self.sound.write_command(value);
            }
            Handler::Control => self.apply_control(value),
            Handler::BootRom
            | Handler::Input
            | Handler::SoundStatus
            | Handler::GfxRom => self.write_unmapped(addr, value),
        }
    }
}

impl MainBus for TUnitBus {
    fn read_word(&mut self, addr: u32) -> u16 {
        match self.map.resolve_read(addr).copied() {
            Some(mapping) => self.read_with(mapping, addr),
            None => self.read_unmapped(addr),
        }
    }

    fn write_word(&mut self, addr: u32, value: u16) {
        match self.map.resolve_write(addr).copied() {
            Some(mapping) => self.write_with(mapping, addr, value),
            None => self.write_unmapped(addr, value),
        }
    }

    fn to_shift(&mut self, addr: u32, dst: &mut [u16]) {
        let len = dst.len().min(SHIFT_REGISTER_WORDS);
        self.video.to_shift(&self.mem, addr, &mut dst[..len]);
    }

    fn from_shift(&mut self, addr: u32, src: &[u16]) {
        let len = src.len().min(SHIFT_REGISTER_WORDS);
        self.video.from_shift(&mut self.mem, addr, &src[..len]);
    }
}
