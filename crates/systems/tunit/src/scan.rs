//! Save-state plumbing
//!
//! State is exposed to an external walker as named byte areas. The same walk
//! serves capture and restore; the walker decides which way bytes flow.

use crate::bus::{TUnitBus, DMA_REGISTERS};
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

/// Receives every named area during a scan.
///
/// On capture the walker reads `data`; on restore it overwrites it.
pub trait StateWalker {
    fn area(&mut self, name: &str, data: &mut [u8]);
}

/// Which parts of the state a scan visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanAction {
    /// The contiguous RAM block
    pub volatile: bool,
    /// CPU registers and board latches
    pub driver_data: bool,
    /// Set when the walker is writing state back
    pub restoring: bool,
}

impl ScanAction {
    pub const SAVE: ScanAction = ScanAction {
        volatile: true,
        driver_data: true,
        restoring: false,
    };

    pub const LOAD: ScanAction = ScanAction {
        volatile: true,
        driver_data: true,
        restoring: true,
    };
}

/// Walk the board latches. When restoring, derived state is rebuilt from
/// the control register afterwards.
pub(crate) fn scan_board(bus: &mut TUnitBus, walker: &mut dyn StateWalker, restoring: bool) {
    walker.area("video_bank", bytemuck::bytes_of_mut(bus.video.bank_mut()));
    walker.area("dma", bytemuck::cast_slice_mut(&mut bus.dma[..]));
    walker.area("control", bytemuck::bytes_of_mut(&mut bus.control));

    let mut cmos_we = bus.cmos_write_enable as u8;
    walker.area("cmos_write_enable", bytemuck::bytes_of_mut(&mut cmos_we));

    let mut prot = bus.protection.index();
    walker.area("protection_index", bytemuck::bytes_of_mut(&mut prot));

    walker.area("sound_ack", bytemuck::bytes_of_mut(bus.sound.ack_polls_mut()));
    walker.area("sound_command", bytemuck::bytes_of_mut(bus.sound.command_mut()));

    if restoring {
        bus.cmos_write_enable = cmos_we != 0;
        bus.protection.set_index(prot);
        let bank = bus.video.bank();
        bus.apply_control(bus.control);
        // The bank is scanned independently of the control register
        bus.video.set_bank(bank);
    }
}

/// In-memory copy of every scanned area, for rollback and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    areas: Vec<(String, Vec<u8>)>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn areas(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.areas.iter().map(|(n, d)| (n.as_str(), d.as_slice()))
    }

    pub fn area(&self, name: &str) -> Option<&[u8]> {
        self.areas
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_slice())
    }

    pub fn total_bytes(&self) -> usize {
        self.areas.iter().map(|(_, d)| d.len()).sum()
    }

    pub fn recorder(&mut self) -> SnapshotRecorder<'_> {
        self.areas.clear();
        SnapshotRecorder { snapshot: self }
    }

    pub fn player(&self) -> SnapshotPlayer<'_> {
        SnapshotPlayer {
            snapshot: self,
            cursor: 0,
        }
    }
}

pub struct SnapshotRecorder<'a> {
    snapshot: &'a mut Snapshot,
}

impl StateWalker for SnapshotRecorder<'_> {
    fn area(&mut self, name: &str, data: &mut [u8]) {
        self.snapshot.areas.push((name.to_string(), data.to_vec()));
    }
}

/// Writes a snapshot back. Areas are matched in order, falling back to a
/// search by name; areas with a different length are skipped.
pub struct SnapshotPlayer<'a> {
    snapshot: &'a Snapshot,
    cursor: usize,
}

impl StateWalker for SnapshotPlayer<'_> {
    fn area(&mut self, name: &str, data: &mut [u8]) {
        let areas = &self.snapshot.areas;
        let found = match areas.get(self.cursor) {
            Some((n, _)) if n == name => Some(self.cursor),
            _ => areas.iter().position(|(n, _)| n == name),
        };

        match found {
            Some(i) if areas[i].1.len() == data.len() => {
                data.copy_from_slice(&areas[i].1);
                self.cursor = i + 1;
            }
            Some(i) => log(LogCategory::Stubs, LogLevel::Warn, || {
                format!(
                    "State: area '{}' is {} bytes, expected {}",
                    name,
                    areas[i].1.len(),
                    data.len()
                )
            }),
            None => log(LogCategory::Stubs, LogLevel::Warn, || {
                format!("State: area '{}' missing from snapshot", name)
            }),
        }
    }
}

/// Board latches in a serializable form for JSON save states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRegisters {
    pub video_bank: u32,
    pub dma: Vec<u16>,
    pub control: u16,
    pub cmos_write_enable: bool,
    pub protection_index: u8,
    pub sound_ack: u8,
    pub sound_command: u8,
    #[serde(default)]
    pub frame: u64,
}

impl DriverRegisters {
    pub(crate) fn capture(bus: &TUnitBus, frame: u64) -> Self {
        Self {
            video_bank: bus.video.bank(),
            dma: bus.dma.to_vec(),
            control: bus.control,
            cmos_write_enable: bus.cmos_write_enable,
            protection_index: bus.protection.index(),
            sound_ack: bus.sound.ack_polls(),
            sound_command: bus.sound.command(),
            frame,
        }
    }

    pub(crate) fn apply(&self, bus: &mut TUnitBus) {
        for (dst, &src) in bus.dma.iter_mut().zip(self.dma.iter().take(DMA_REGISTERS)) {
            *dst = src;
        }
        bus.apply_control(self.control);
        bus.video.set_bank(self.video_bank & 1);
        bus.cmos_write_enable = self.cmos_write_enable;
        bus.protection.set_index(self.protection_index);
        *bus.sound.ack_polls_mut() = self.sound_ack;
        *bus.sound.command_mut() = self.sound_command;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::MainBus;
    use crate::memory::Memory;
    use crate::sound::{SilentFm, SoundBridge};

    fn bus() -> TUnitBus {
        TUnitBus::new(
            Memory::allocate().unwrap(),
            SoundBridge::new(Box::new(SilentFm::new())),
            true,
        )
    }

    #[derive(Default)]
    struct Names(Vec<(String, usize)>);

    impl StateWalker for Names {
        fn area(&mut self, name: &str, data: &mut [u8]) {
            self.0.push((name.to_string(), data.len()));
        }
    }

    #[test]
    fn test_board_areas_in_order() {
        let mut bus = bus();
        let mut names = Names::default();
        scan_board(&mut bus, &mut names, false);
        let got: Vec<_> = names.0.iter().map(|(n, l)| (n.as_str(), *l)).collect();
        assert_eq!(
            got,
            vec![
                ("video_bank", 4),
                ("dma", DMA_REGISTERS * 2),
                ("control", 2),
                ("cmos_write_enable", 1),
                ("protection_index", 1),
                ("sound_ack", 1),
                ("sound_command", 1),
            ]
        );
    }

    #[test]
    fn test_restore_rederives_bank_offset() {
        let mut bus = bus();
        bus.write_word(0x01F0_0000, 0x00A0);
        bus.write_word(0x0148_0000, 0);
        bus.read_word(0x01B0_0000);

        let mut snap = Snapshot::new();
        scan_board(&mut bus, &mut snap.recorder(), false);

        let mut other = self::bus();
        assert_eq!(other.gfx_bank_offset(), 0);
        scan_board(&mut other, &mut snap.player(), true);
        assert_eq!(other.control(), 0x00A0);
        assert_eq!(other.gfx_bank_offset(), 0x800000);
        assert_eq!(other.video().bank(), 1);
        assert!(other.cmos_write_enabled());
        assert_eq!(other.protection.index(), 1);
    }

    #[test]
    fn test_player_skips_mismatched_areas() {
        let mut snap = Snapshot::new();
        {
            let mut rec = snap.recorder();
            rec.area("a", &mut [1, 2]);
            rec.area("b", &mut [3]);
        }
        assert_eq!(snap.total_bytes(), 3);

        let mut a = [0u8; 3];
        let mut b = [0u8; 1];
        let mut player = snap.player();
        player.area("a", &mut a);
        player.area("b", &mut b);
        assert_eq!(a, [0, 0, 0]);
        assert_eq!(b, [3]);
    }

    #[test]
    fn test_driver_registers_json_roundtrip() {
        let mut bus = bus();
        bus.write_word(0x01A8_0080, 0x0102);
        bus.write_word(0x01D0_1020, 0x0033);

        let regs = DriverRegisters::capture(&bus, 7);
        let json = serde_json::to_value(&regs).unwrap();
        let back: DriverRegisters = serde_json::from_value(json).unwrap();
        assert_eq!(back, regs);

        let mut other = self::bus();
        back.apply(&mut other);
        assert_eq!(other.dma_register(8), 0x0102);
        assert_eq!(other.sound.command(), 0x33);
        assert_eq!(other.sound.ack_polls(), crate::sound::SOUND_ACK_POLLS);
    }
}
