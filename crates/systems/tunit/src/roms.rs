//! ROM set description and loading
//!
//! Program ROMs are byte-interleaved in pairs, graphics ROMs in groups of
//! four lanes per 1 MiB bank. Sound data goes to fixed offsets in the sample
//! region and the sound program is loaded linearly.

use crate::memory::{Memory, Region};
use crate::TUnitError;
use emu_core::logging::{log, LogCategory, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomClass {
    /// TMS34010 program, byte lane 0 or 1
    Program { lane: u8 },
    /// ADPCM sample data
    SoundData { offset: u32 },
    /// Graphics, lane 0..=3 of a bank
    Graphics { bank: u8, lane: u8 },
    /// M6809 program
    SoundProgram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomInfo {
    pub name: &'static str,
    pub size: usize,
    pub crc: u32,
    pub class: RomClass,
}

impl RomInfo {
    pub fn region(&self) -> Region {
        match self.class {
            RomClass::Program { .. } => Region::BootRom,
            RomClass::SoundData { .. } => Region::SoundRom,
            RomClass::Graphics { .. } => Region::GfxRom,
            RomClass::SoundProgram => Region::SoundProgRom,
        }
    }

    /// First destination byte and the distance between consecutive bytes.
    fn placement(&self) -> (usize, usize) {
        match self.class {
            RomClass::Program { lane } => (lane as usize, 2),
            RomClass::SoundData { offset } => (offset as usize, 1),
            RomClass::Graphics { bank, lane } => (((bank as usize) << 20) + lane as usize, 4),
            RomClass::SoundProgram => (0, 1),
        }
    }
}

const fn gfx(name: &'static str, crc: u32, bank: u8, lane: u8) -> RomInfo {
    RomInfo {
        name,
        size: 0x80000,
        crc,
        class: RomClass::Graphics { bank, lane },
    }
}

/// Mortal Kombat (rev 5.0 T-Unit 03/19/93)
pub const MK_ROMS: &[RomInfo] = &[
    RomInfo {
        name: "mkt-uj12.bin",
        size: 0x80000,
        crc: 0xf4990bf2,
        class: RomClass::Program { lane: 0 },
    },
    RomInfo {
        name: "mkt-ug12.bin",
        size: 0x80000,
        crc: 0xb06aeac1,
        class: RomClass::Program { lane: 1 },
    },
    RomInfo {
        name: "sl1_mortal_kombat_u12_sound_rom.u12",
        size: 0x40000,
        crc: 0x258bd7f9,
        class: RomClass::SoundData { offset: 0 },
    },
    RomInfo {
        name: "sl1_mortal_kombat_u13_sound_rom.u13",
        size: 0x40000,
        crc: 0x7b7ec3b6,
        class: RomClass::SoundData { offset: 0x40000 },
    },
    gfx("mkt-ug14.bin", 0x9e00834e, 0x00, 0),
    gfx("mkt-uj14.bin", 0xf4b0aaa7, 0x00, 1),
    gfx("mkt-ug19.bin", 0x2d8c7ba1, 0x00, 2),
    gfx("mkt-uj19.bin", 0x33b9b7a4, 0x00, 3),
    gfx("mkt-ug16.bin", 0x52c9d1e5, 0x02, 0),
    gfx("mkt-uj16.bin", 0xc94c58cf, 0x02, 1),
    gfx("mkt-ug20.bin", 0x2f7e55d3, 0x02, 2),
    gfx("mkt-uj20.bin", 0xeae96df0, 0x02, 3),
    gfx("mkt-ug17.bin", 0xe34fe253, 0x04, 0),
    gfx("mkt-uj17.bin", 0xa56e12f5, 0x04, 1),
    gfx("mkt-ug22.bin", 0xb537bb4e, 0x04, 2),
    gfx("mkt-uj22.bin", 0x5e12523b, 0x04, 3),
    RomInfo {
        name: "sl1_mortal_kombat_u3_sound_rom.u3",
        size: 0x40000,
        crc: 0xc615844c,
        class: RomClass::SoundProgram,
    },
];

pub fn find_rom(name: &str) -> Option<&'static RomInfo> {
    MK_ROMS.iter().find(|r| r.name == name)
}

/// Source of ROM images by file name.
pub trait RomProvider {
    fn rom(&mut self, name: &str) -> Option<Vec<u8>>;
}

/// Copy one ROM image into its region. A CRC mismatch is reported but the
/// image is still used.
pub fn load_rom(mem: &mut Memory, info: &RomInfo, data: &[u8]) -> Result<(), TUnitError> {
    if data.len() != info.size {
        return Err(TUnitError::RomSize {
            name: info.name.to_string(),
            expected: info.size,
            actual: data.len(),
        });
    }

    let crc = crc32fast::hash(data);
    if crc != info.crc {
        log(LogCategory::Stubs, LogLevel::Warn, || {
            format!(
                "ROM {}: CRC {:08x}, expected {:08x}",
                info.name, crc, info.crc
            )
        });
    }

    let (start, step) = info.placement();
    let dest = mem.region_mut(info.region());
    let needed = start + (data.len() - 1) * step + 1;
    if needed > dest.len() {
        return Err(TUnitError::RomSize {
            name: info.name.to_string(),
            expected: dest.len().saturating_sub(start) / step,
            actual: data.len(),
        });
    }

    if step == 1 {
        dest[start..start + data.len()].copy_from_slice(data);
    } else {
        for (i, &byte) in data.iter().enumerate() {
            dest[start + i * step] = byte;
        }
    }
    Ok(())
}

/// Load every ROM of `set`, failing on the first one the provider lacks.
pub fn load_rom_set(
    mem: &mut Memory,
    provider: &mut dyn RomProvider,
    set: &[RomInfo],
) -> Result<(), TUnitError> {
    for info in set {
        let data = provider
            .rom(info.name)
            .ok_or_else(|| TUnitError::MissingRom(info.name.to_string()))?;
        load_rom(mem, info, &data)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapRoms(HashMap<&'static str, Vec<u8>>);

    impl RomProvider for MapRoms {
        fn rom(&mut self, name: &str) -> Option<Vec<u8>> {
            self.0.get(name).cloned()
        }
    }

    fn filled(info: &RomInfo, seed: u8) -> Vec<u8> {
        (0..info.size).map(|i| (i as u8).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_mk_set_shape() {
        assert_eq!(MK_ROMS.len(), 17);
        let gfx = MK_ROMS
            .iter()
            .filter(|r| matches!(r.class, RomClass::Graphics { .. }))
            .count();
        assert_eq!(gfx, 12);
        assert!(find_rom("mkt-uj12.bin").is_some());
        assert!(find_rom("nope.bin").is_none());
    }

    #[test]
    fn test_program_roms_interleave() {
        let mut mem = Memory::allocate().unwrap();
        load_rom(&mut mem, &MK_ROMS[0], &vec![0xAA; 0x80000]).unwrap();
        load_rom(&mut mem, &MK_ROMS[1], &vec![0x55; 0x80000]).unwrap();
        assert_eq!(mem.read_u16(Region::BootRom, 0), 0x55AA);
        assert_eq!(mem.read_u16(Region::BootRom, 0xFFFFE), 0x55AA);
        assert_eq!(mem.read_u8(Region::BootRom, 0x100000), 0);
    }

    #[test]
    fn test_graphics_lanes_and_banks() {
        let mut mem = Memory::allocate().unwrap();
        let info = find_rom("mkt-ug20.bin").unwrap();
        load_rom(&mut mem, info, &filled(info, 1)).unwrap();
        let gfx = mem.region(Region::GfxRom);
        assert_eq!(gfx[(2 << 20) + 2], 1);
        assert_eq!(gfx[(2 << 20) + 2 + 4], 2);
        assert_eq!(gfx[(2 << 20) + 3], 0);
    }

    #[test]
    fn test_sound_data_offsets() {
        let mut mem = Memory::allocate().unwrap();
        load_rom(&mut mem, &MK_ROMS[3], &vec![0x13; 0x40000]).unwrap();
        assert_eq!(mem.read_u8(Region::SoundRom, 0x3FFFF), 0);
        assert_eq!(mem.read_u8(Region::SoundRom, 0x40000), 0x13);
    }

    #[test]
    fn test_wrong_size_is_rejected() {
        let mut mem = Memory::allocate().unwrap();
        let err = load_rom(&mut mem, &MK_ROMS[0], &[0u8; 16]).unwrap_err();
        assert!(matches!(err, TUnitError::RomSize { expected: 0x80000, actual: 16, .. }));
    }

    #[test]
    fn test_crc_mismatch_is_tolerated() {
        let mut mem = Memory::allocate().unwrap();
        let info = find_rom("sl1_mortal_kombat_u3_sound_rom.u3").unwrap();
        load_rom(&mut mem, info, &vec![0x7E; info.size]).unwrap();
        assert_eq!(mem.read_u8(Region::SoundProgRom, 0x3FFFF), 0x7E);
    }

    #[test]
    fn test_missing_rom_names_the_file() {
        let mut mem = Memory::allocate().unwrap();
        let mut roms = MapRoms(HashMap::new());
        roms.0.insert(MK_ROMS[0].name, filled(&MK_ROMS[0], 0));
        let err = load_rom_set(&mut mem, &mut roms, MK_ROMS).unwrap_err();
        match err {
            TUnitError::MissingRom(name) => assert_eq!(name, "mkt-ug12.bin"),
            other => panic!("unexpected error {other}"),
        }
    }
}
