//! Per-frame cycle accounting
//!
//! Each processor gets a whole-frame budget that is handed out across the
//! interleave slices with a catch-up scheme: after slice `i` the cumulative
//! cycles run equal `floor(total * (i + 1) / slices)` exactly, so rounding
//! never drifts across a frame.

/// Cycles per frame for a clock at `clock_hz` refreshed at `refresh_hz`.
pub fn frame_budget(clock_hz: u32, refresh_hz: f64) -> i64 {
    (clock_hz as f64 / refresh_hz).floor() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBudget {
    total: i64,
    slices: u32,
    done: i64,
}

impl CycleBudget {
    pub fn new(total: i64, slices: u32) -> Self {
        Self {
            total,
            slices: slices.max(1),
            done: 0,
        }
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn done(&self) -> i64 {
        self.done
    }

    /// Start a new frame.
    pub fn clear(&mut self) {
        self.done = 0;
    }

    /// Cycles still owed after slice `slice`.
    pub fn quantum(&self, slice: u32) -> i64 {
        self.total * (slice as i64 + 1) / self.slices as i64 - self.done
    }

    /// Account for cycles a processor reports having run.
    pub fn consume(&mut self, cycles: i64) {
        self.done += cycles;
    }
}

/// Audio samples per frame: `sample_rate / refresh_hz`, truncated.
pub fn frame_samples(sample_rate: u32, refresh_hz: f64) -> usize {
    (sample_rate as f64 / refresh_hz) as usize
}

/// Splits one frame's audio into equal slices plus a final flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSlicer {
    len: usize,
    per_slice: usize,
    done: usize,
}

impl AudioSlicer {
    pub fn new(len: usize, slices: u32) -> Self {
        Self {
            len,
            per_slice: len / slices.max(1) as usize,
            done: 0,
        }
    }

    pub fn clear(&mut self) {
        self.done = 0;
    }

    /// Sample range for the next slice.
    pub fn next_slice(&mut self) -> std::ops::Range<usize> {
        let start = self.done.min(self.len);
        let end = (start + self.per_slice).min(self.len);
        self.done = end;
        start..end
    }

    /// Remaining samples after the last slice.
    pub fn flush(&mut self) -> std::ops::Range<usize> {
        let start = self.done.min(self.len);
        self.done = self.len;
        start..self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budgets_for_tunit_clocks() {
        assert_eq!(frame_budget(6_250_000, 54.71), 114_238);
        assert_eq!(frame_budget(2_000_000, 54.71), 36_556);
        assert_eq!(frame_samples(44_100, 54.71), 806);
    }

    #[test]
    fn test_catch_up_sums_exactly() {
        let mut budget = CycleBudget::new(1_000_000, 288);
        for i in 0..288 {
            let q = budget.quantum(i);
            budget.consume(q);
            assert_eq!(budget.done(), 1_000_000 * (i as i64 + 1) / 288);
        }
        assert_eq!(budget.done(), 1_000_000);
    }

    #[test]
    fn test_overrun_is_absorbed() {
        let mut budget = CycleBudget::new(2880, 288);
        // Ran 15 cycles on a 10 cycle slice
        budget.consume(15);
        assert_eq!(budget.quantum(1), 5);
        budget.consume(40);
        // Still owed nothing until the schedule catches up
        assert!(budget.quantum(2) <= 0);
        assert_eq!(budget.quantum(5), 5);
    }

    #[test]
    fn test_audio_slices_then_flush() {
        let mut audio = AudioSlicer::new(806, 288);
        let mut covered = 0;
        for _ in 0..288 {
            let r = audio.next_slice();
            assert_eq!(r.start, covered);
            assert_eq!(r.len(), 2);
            covered = r.end;
        }
        let rest = audio.flush();
        assert_eq!(rest, 576..806);
        assert!(audio.flush().is_empty());
    }
}
