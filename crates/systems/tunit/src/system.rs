//! T-Unit board: frame scheduling and the `System` front door

use crate::bus::TUnitBus;
use crate::config::TUnitConfig;
use crate::cpu::{IdleMainCpu, IdleSoundCpu, MainCpu, SoundCpu};
use crate::input::{self, Button, InputState};
use crate::memory::{Memory, Region};
use crate::roms::{self, RomProvider, MK_ROMS};
use crate::scan::{self, DriverRegisters, ScanAction, Snapshot, StateWalker};
use crate::sound::{FmSynth, SilentFm, SoundBridge};
use crate::timing::{AudioSlicer, CycleBudget};
use crate::video::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::TUnitError;
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::types::{AudioSample, Frame};
use emu_core::{MountPointInfo, System};
use serde_json::Value;
use std::collections::HashSet;

const FRAME_LOG_INTERVAL: u64 = 60;

/// Midway T-Unit (Mortal Kombat)
pub struct TUnitSystem {
    config: TUnitConfig,
    bus: TUnitBus,
    main_cpu: Box<dyn MainCpu>,
    sound_cpu: Box<dyn SoundCpu>,

    input: InputState,
    dips: [u8; 2],
    reset_pending: bool,

    main_budget: CycleBudget,
    sound_budget: CycleBudget,

    // Audio surface for `System::step_frame`
    audio: Vec<AudioSample>,

    mounted: HashSet<&'static str>,
    frame_count: u64,
}

impl TUnitSystem {
    /// Board with idle processors and a silent FM chip.
    pub fn new(config: TUnitConfig) -> Result<Self, TUnitError> {
        Self::with_chips(
            config,
            Box::new(IdleMainCpu::new()),
            Box::new(IdleSoundCpu::new()),
            Box::new(SilentFm::new()),
        )
    }

    pub fn with_chips(
        config: TUnitConfig,
        main_cpu: Box<dyn MainCpu>,
        sound_cpu: Box<dyn SoundCpu>,
        fm: Box<dyn FmSynth>,
    ) -> Result<Self, TUnitError> {
        let mem = Memory::allocate()?;
        let bus = TUnitBus::new(mem, SoundBridge::new(fm), config.gfx_rom_large);

        let mut sys = Self {
            main_budget: CycleBudget::new(config.main_cycles_per_frame(), config.interleave),
            sound_budget: CycleBudget::new(config.sound_cycles_per_frame(), config.interleave),
            audio: vec![0; config.samples_per_frame() * 2],
            dips: config.dip_switches,
            config,
            bus,
            main_cpu,
            sound_cpu,
            input: InputState::new(),
            reset_pending: false,
            mounted: HashSet::new(),
            frame_count: 0,
        };
        sys.reset_board();
        sys.bus.video.request_recalc();
        Ok(sys)
    }

    pub fn config(&self) -> &TUnitConfig {
        &self.config
    }

    pub fn bus(&self) -> &TUnitBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut TUnitBus {
        &mut self.bus
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Audio rendered by the last `step_frame`, interleaved stereo.
    pub fn audio(&self) -> &[AudioSample] {
        &self.audio
    }

    pub fn load_rom_set(&mut self, provider: &mut dyn RomProvider) -> Result<(), TUnitError> {
        roms::load_rom_set(&mut self.bus.mem, provider, MK_ROMS)?;
        self.mounted.extend(MK_ROMS.iter().map(|r| r.name));
        Ok(())
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.input.set_button(button, pressed);
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn dips(&self) -> [u8; 2] {
        self.dips
    }

    pub fn set_dips(&mut self, dips: [u8; 2]) {
        self.dips = dips;
    }

    pub fn set_dip(&mut self, name: &str, option: &str) -> Result<(), TUnitError> {
        input::set_dip(&mut self.dips, name, option)
    }

    /// Reset line: the board resets at the top of the next frame.
    pub fn request_reset(&mut self) {
        self.reset_pending = true;
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Host palette format changed; rebuild the cache before the next blit.
    pub fn request_palette_recalc(&mut self) {
        self.bus.video.request_recalc();
    }

    pub fn nvram(&self) -> &[u8] {
        self.bus.mem.region(Region::Nvram)
    }

    pub fn load_nvram(&mut self, data: &[u8]) -> Result<(), TUnitError> {
        let nvram = self.bus.mem.region_mut(Region::Nvram);
        if data.len() != nvram.len() {
            return Err(TUnitError::NvramSize {
                expected: nvram.len(),
                actual: data.len(),
            });
        }
        nvram.copy_from_slice(data);
        Ok(())
    }

    /// Soft reset. CMOS and RAM contents survive.
    fn reset_board(&mut self) {
        self.main_cpu.reset();
        self.sound_cpu.reset();
        self.bus.sound.reset();
        self.bus.protection.reset();
        self.reset_pending = false;
        log(LogCategory::CPU, LogLevel::Info, || "T-Unit: reset".to_string());
    }

    /// Emulate one frame. Scanlines and the final blit go to `video` when
    /// bound; `audio` receives interleaved stereo samples.
    pub fn run_frame(
        &mut self,
        mut video: Option<&mut Frame>,
        mut audio: Option<&mut [AudioSample]>,
    ) {
        if self.reset_pending {
            self.reset_board();
        }

        self.bus.latch_inputs(self.input.snapshot(), self.dips);

        self.main_cpu.new_frame();
        self.sound_cpu.new_frame();
        self.main_budget.clear();
        self.sound_budget.clear();

        let slices = self.config.interleave.max(1);
        let mut slicer = AudioSlicer::new(audio.as_deref().map_or(0, |a| a.len() / 2), slices);

        for i in 0..slices {
            let quantum = self.main_budget.quantum(i);
            if quantum > 0 {
                let ran = self.main_cpu.run(&mut self.bus, quantum as i32);
                self.main_budget.consume(ran as i64);
            }

            let quantum = self.sound_budget.quantum(i);
            if quantum > 0 {
                let mut port = self.bus.sound.port(&mut self.bus.mem);
                let ran = self.sound_cpu.run(&mut port, quantum as i32);
                self.sound_budget.consume(ran as i64);
            }

            if let Some(params) = self.main_cpu.scanline(i) {
                if video.is_some() {
                    self.bus.video.render_scanline(&self.bus.mem, &params);
                }
            }

            if let Some(buf) = audio.as_deref_mut() {
                let range = slicer.next_slice();
                self.bus.sound.render(&mut buf[range.start * 2..range.end * 2]);
            }
        }

        if let Some(buf) = audio.as_deref_mut() {
            let range = slicer.flush();
            self.bus.sound.render(&mut buf[range.start * 2..range.end * 2]);
        }

        if let Some(frame) = video.as_deref_mut() {
            self.bus.video.draw(&mut self.bus.mem, frame);
        }

        self.frame_count += 1;
        if self.frame_count % FRAME_LOG_INTERVAL == 0 {
            log(LogCategory::CPU, LogLevel::Debug, || {
                format!(
                    "T-Unit: frame {} complete (main {} cycles, sound {} cycles)",
                    self.frame_count,
                    self.main_budget.done(),
                    self.sound_budget.done()
                )
            });
        }
    }

    pub fn main_cycles_run(&self) -> i64 {
        self.main_budget.done()
    }

    pub fn sound_cycles_run(&self) -> i64 {
        self.sound_budget.done()
    }

    /// Walk the state selected by `action`. Restores must happen between frames.
    pub fn scan(&mut self, walker: &mut dyn StateWalker, action: ScanAction) {
        if action.volatile {
            walker.area("All RAM", self.bus.mem.ram_block_mut());
        }

        if action.driver_data {
            self.main_cpu.scan(walker);
            self.sound_cpu.scan(walker);
            scan::scan_board(&mut self.bus, walker, action.restoring);
        }
    }

    pub fn snapshot(&mut self) -> Snapshot {
        let mut snap = Snapshot::new();
        self.scan(&mut snap.recorder(), ScanAction::SAVE);
        snap
    }

    pub fn restore(&mut self, snap: &Snapshot) {
        self.scan(&mut snap.player(), ScanAction::LOAD);
    }
}

impl System for TUnitSystem {
    type Error = TUnitError;

    fn reset(&mut self) {
        self.reset_board();
    }

    fn step_frame(&mut self) -> Result<Frame, Self::Error> {
        let mut frame = Frame::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);
        let mut audio = std::mem::take(&mut self.audio);
        self.run_frame(Some(&mut frame), Some(audio.as_mut_slice()));
        self.audio = audio;
        Ok(frame)
    }

    /// Board registers only. RAM rollback goes through `snapshot`/`restore`.
    fn save_state(&self) -> Value {
        serde_json::to_value(DriverRegisters::capture(&self.bus, self.frame_count))
            .unwrap_or(Value::Null)
    }

    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
        let regs: DriverRegisters = serde_json::from_value(v.clone())?;
        regs.apply(&mut self.bus);
        self.frame_count = regs.frame;
        Ok(())
    }

    fn supports_save_states(&self) -> bool {
        true
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        MK_ROMS
            .iter()
            .map(|r| MountPointInfo {
                id: r.name.to_string(),
                name: r.name.to_string(),
                extensions: vec![r
                    .name
                    .rsplit('.')
                    .next()
                    .unwrap_or("bin")
                    .to_string()],
                required: true,
            })
            .collect()
    }

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        let info = roms::find_rom(mount_point_id)
            .ok_or_else(|| TUnitError::InvalidMountPoint(mount_point_id.to_string()))?;
        roms::load_rom(&mut self.bus.mem, info, data)?;
        self.mounted.insert(info.name);
        Ok(())
    }

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
        let info = roms::find_rom(mount_point_id)
            .ok_or_else(|| TUnitError::InvalidMountPoint(mount_point_id.to_string()))?;
        self.mounted.remove(info.name);
        Ok(())
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        self.mounted.contains(mount_point_id)
    }
}
