//! Frame timing statistics.

use std::time::Duration;

/// Timing record for a single engine tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    /// Frame number (monotonic).
    pub frame: u64,
    /// Simulated delta time handed to the world, seconds.
    pub delta_time: f32,
    /// Wall-clock cost of the world tick, microseconds.
    pub tick_us: u64,
    /// Wall-clock cost of presentation, microseconds.
    pub present_us: u64,
}

impl FrameStats {
    /// Total wall-clock cost of the frame, microseconds.
    #[must_use]
    pub fn total_us(&self) -> u64 {
        self.tick_us + self.present_us
    }
}

/// Running aggregate of frame timings against a target budget.
#[derive(Clone, Copy, Debug)]
pub struct FrameStatsAccumulator {
    budget_us: u64,
    frames: u64,
    total_us: u64,
    min_us: u64,
    max_us: u64,
    over_budget: u64,
}

impl FrameStatsAccumulator {
    /// Accumulator with a budget of one frame at `target_fps`.
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let budget = Duration::from_secs(1) / target_fps.max(1);
        Self {
            budget_us: budget.as_micros() as u64,
            frames: 0,
            total_us: 0,
            min_us: u64::MAX,
            max_us: 0,
            over_budget: 0,
        }
    }

    /// Folds one frame into the aggregate.
    pub fn record(&mut self, stats: FrameStats) {
        let total = stats.total_us();
        self.frames += 1;
        self.total_us += total;
        self.min_us = self.min_us.min(total);
        self.max_us = self.max_us.max(total);
        if total > self.budget_us {
            self.over_budget += 1;
        }
    }

    /// Frames recorded so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Mean frame cost in microseconds, zero before any frame.
    #[must_use]
    pub fn average_us(&self) -> u64 {
        if self.frames == 0 {
            0
        } else {
            self.total_us / self.frames
        }
    }

    /// Cheapest frame seen, microseconds.
    #[must_use]
    pub fn min_us(&self) -> u64 {
        if self.frames == 0 {
            0
        } else {
            self.min_us
        }
    }

    /// Most expensive frame seen, microseconds.
    #[must_use]
    pub fn max_us(&self) -> u64 {
        self.max_us
    }

    /// Frames that blew the budget.
    #[must_use]
    pub fn over_budget(&self) -> u64 {
        self.over_budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tick_us: u64) -> FrameStats {
        FrameStats {
            tick_us,
            ..FrameStats::default()
        }
    }

    #[test]
    fn test_aggregates() {
        let mut acc = FrameStatsAccumulator::new(60); // ~16666us budget
        acc.record(frame(1_000));
        acc.record(frame(3_000));
        acc.record(frame(20_000));

        assert_eq!(acc.frames(), 3);
        assert_eq!(acc.average_us(), 8_000);
        assert_eq!(acc.min_us(), 1_000);
        assert_eq!(acc.max_us(), 20_000);
        assert_eq!(acc.over_budget(), 1);
    }

    #[test]
    fn test_empty_accumulator() {
        let acc = FrameStatsAccumulator::new(60);
        assert_eq!(acc.average_us(), 0);
        assert_eq!(acc.min_us(), 0);
    }
}
