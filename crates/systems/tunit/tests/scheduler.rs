//! Frame scheduling with recording processors

use emu_tunit::cpu::{MainBus, MainCpu, SoundBus, SoundCpu};
use emu_tunit::sound::FmSynth;
use emu_tunit::video::ScanlineParams;
use emu_tunit::{TUnitConfig, TUnitSystem};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Main(i32),
    Sound(i32),
    Line(u32),
    Audio(usize),
}

type Trace = Rc<RefCell<Vec<Event>>>;

struct RecordingMain {
    trace: Trace,
    /// Extra cycles reported on top of every request
    overrun: i32,
}

impl MainCpu for RecordingMain {
    fn reset(&mut self) {}

    fn run(&mut self, bus: &mut dyn MainBus, cycles: i32) -> i32 {
        self.trace.borrow_mut().push(Event::Main(cycles));
        // Poke the watchdog like real code does
        bus.write_word(0x01d8_1070, 0);
        cycles + self.overrun
    }

    fn scanline(&mut self, line: u32) -> Option<ScanlineParams> {
        self.trace.borrow_mut().push(Event::Line(line));
        None
    }
}

struct RecordingSound {
    trace: Trace,
}

impl SoundCpu for RecordingSound {
    fn reset(&mut self) {}

    fn run(&mut self, bus: &mut dyn SoundBus, cycles: i32) -> i32 {
        self.trace.borrow_mut().push(Event::Sound(cycles));
        bus.read(0x4000);
        cycles
    }
}

struct RecordingFm {
    trace: Trace,
}

impl FmSynth for RecordingFm {
    fn reset(&mut self) {}
    fn select_register(&mut self, _reg: u8) {}
    fn write_register(&mut self, _data: u8) {}
    fn render(&mut self, out: &mut [i16]) {
        self.trace.borrow_mut().push(Event::Audio(out.len()));
        out.fill(1);
    }
    fn irq(&self) -> bool {
        false
    }
}

fn board(overrun: i32) -> (TUnitSystem, Trace) {
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let sys = TUnitSystem::with_chips(
        TUnitConfig::default(),
        Box::new(RecordingMain {
            trace: Rc::clone(&trace),
            overrun,
        }),
        Box::new(RecordingSound {
            trace: Rc::clone(&trace),
        }),
        Box::new(RecordingFm {
            trace: Rc::clone(&trace),
        }),
    )
    .unwrap();
    (sys, trace)
}

#[test]
fn test_cumulative_cycles_match_floor_schedule() {
    let (mut sys, trace) = board(0);
    let mut audio = vec![0i16; 806 * 2];
    sys.run_frame(None, Some(&mut audio[..]));

    let events = trace.borrow();
    let main: Vec<i64> = events
        .iter()
        .filter_map(|e| match e {
            Event::Main(c) => Some(*c as i64),
            _ => None,
        })
        .collect();
    assert_eq!(main.len(), 288);

    let mut sum = 0;
    for (i, q) in main.iter().enumerate() {
        sum += q;
        assert_eq!(sum, 114_238 * (i as i64 + 1) / 288);
    }
    assert_eq!(sys.main_cycles_run(), 114_238);
    assert_eq!(sys.sound_cycles_run(), 36_556);
}

#[test]
fn test_slice_order_is_main_sound_line_audio() {
    let (mut sys, trace) = board(0);
    let mut audio = vec![0i16; 806 * 2];
    sys.run_frame(None, Some(&mut audio[..]));

    let events = trace.borrow();
    for (i, slice) in events.chunks(4).take(288).enumerate() {
        assert!(matches!(slice[0], Event::Main(_)), "slice {}: {:?}", i, slice);
        assert!(matches!(slice[1], Event::Sound(_)), "slice {}: {:?}", i, slice);
        assert_eq!(slice[2], Event::Line(i as u32));
        assert_eq!(slice[3], Event::Audio(4));
    }
    // Final flush renders the remainder: 806 - 288 * 2 samples
    assert_eq!(events[288 * 4], Event::Audio((806 - 576) * 2));
    assert_eq!(events.len(), 288 * 4 + 1);
    assert!(audio.iter().all(|&s| s == 1));
}

#[test]
fn test_overrunning_cpu_skips_slices() {
    let (mut sys, trace) = board(1000);
    sys.run_frame(None, None);

    let main: Vec<i32> = trace
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Main(c) => Some(*c),
            _ => None,
        })
        .collect();
    assert!(main.len() < 288);
    assert!(main.iter().all(|&c| c > 0));
    assert!(sys.main_cycles_run() >= 114_238);
    assert!(sys.main_cycles_run() < 114_238 + 1000 + 397);
}

#[test]
fn test_no_audio_buffer_renders_nothing() {
    let (mut sys, trace) = board(0);
    sys.run_frame(None, None);
    assert!(!trace.borrow().iter().any(|e| matches!(e, Event::Audio(_))));
    assert_eq!(sys.frame_count(), 1);
}

#[test]
fn test_every_frame_restarts_the_budget() {
    let (mut sys, trace) = board(0);
    sys.run_frame(None, None);
    trace.borrow_mut().clear();
    sys.run_frame(None, None);
    assert_eq!(sys.main_cycles_run(), 114_238);
    assert_eq!(trace.borrow()[0], Event::Main(114_238 / 288));
}
