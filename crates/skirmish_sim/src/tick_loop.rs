//! # Decision Tick Pacing
//!
//! Wall-clock pacing for the decision phase. The simulation itself only ever
//! sees tick numbers; this is the one place that looks at `Instant`.
//!
//! ```text
//! loop {
//!     while pacer.should_tick() {        // catch up, bounded
//!         let start = pacer.begin_tick();
//!         simulation.step();
//!         pacer.end_tick(start);
//!     }
//!     pacer.wait_for_next_tick();
//! }
//! ```

use std::time::{Duration, Instant};

use skirmish_core::TickRate;

/// Backlog beyond this many ticks is dropped instead of replayed.
const MAX_CATCH_UP_TICKS: u32 = 8;

/// Fixed-rate pacer for the decision phase.
#[derive(Debug)]
pub struct TickLoop {
    tick_duration: Duration,
    last_poll: Instant,
    accumulator: Duration,
    tick_count: u64,
    stats: TickStats,
}

/// Decision-phase timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Fastest tick.
    pub min_tick_us: u64,
    /// Slowest tick.
    pub max_tick_us: u64,
    /// Rolling average.
    pub avg_tick_us: u64,
    /// Ticks that overran their budget.
    pub late_ticks: u64,
    /// Ticks measured.
    pub total_ticks: u64,
    /// Ticks skipped because the backlog grew too large.
    pub dropped_ticks: u64,
}

impl TickStats {
    #[allow(clippy::cast_possible_truncation)]
    fn fresh(budget: Duration) -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: budget.as_micros() as u64,
            late_ticks: 0,
            total_ticks: 0,
            dropped_ticks: 0,
        }
    }
}

impl TickLoop {
    /// A pacer for `rate`.
    #[must_use]
    pub fn new(rate: TickRate) -> Self {
        let tick_duration = Duration::from_micros(1_000_000 / u64::from(rate.rate().max(1)));
        Self {
            tick_duration,
            last_poll: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
            stats: TickStats::fresh(tick_duration),
        }
    }

    /// True while a tick is owed. Call until it returns false.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_poll);
        self.last_poll = now;

        let cap = self.tick_duration * MAX_CATCH_UP_TICKS;
        if self.accumulator > cap {
            let dropped = ((self.accumulator - cap).as_micros() / self.tick_duration.as_micros().max(1)) as u64;
            self.stats.dropped_ticks += dropped;
            self.accumulator = cap;
            tracing::warn!(dropped, "decision phase fell behind, dropping backlog");
        }
        self.accumulator >= self.tick_duration
    }

    /// Starts a tick. Pass the result to [`TickLoop::end_tick`].
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
        self.tick_count += 1;
        Instant::now()
    }

    /// Finishes a tick. Returns true if it overran its budget.
    #[allow(clippy::cast_possible_truncation)]
    pub fn end_tick(&mut self, start: Instant) -> bool {
        let duration = start.elapsed();
        let duration_us = duration.as_micros() as u64;

        self.stats.total_ticks += 1;
        self.stats.min_tick_us = self.stats.min_tick_us.min(duration_us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(duration_us);
        self.stats.avg_tick_us = (self.stats.avg_tick_us * 15 + duration_us) / 16;

        let late = duration > self.tick_duration;
        if late {
            self.stats.late_ticks += 1;
            tracing::warn!(
                tick = self.tick_count,
                took_us = duration_us,
                budget_us = self.tick_duration.as_micros() as u64,
                "late tick"
            );
        }
        late
    }

    /// Sleeps, then spins, until the next tick is due.
    pub fn wait_for_next_tick(&self) {
        let owed = self.last_poll.elapsed() + self.accumulator;
        let Some(remaining) = self.tick_duration.checked_sub(owed) else {
            return;
        };
        let deadline = Instant::now() + remaining;
        if remaining > Duration::from_micros(1000) {
            std::thread::sleep(remaining - Duration::from_micros(500));
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }

    /// Ticks started so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Timing so far.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Budget per tick.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Forgets timing.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::fresh(self.tick_duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_from_rate() {
        let pacer = TickLoop::new(TickRate::new(60));
        assert_eq!(pacer.tick_count(), 0);
        assert_eq!(pacer.tick_duration(), Duration::from_micros(16666));
    }

    #[test]
    fn test_owed_tick_runs() {
        let mut pacer = TickLoop::new(TickRate::new(1000));
        std::thread::sleep(Duration::from_millis(5));
        assert!(pacer.should_tick());

        let start = pacer.begin_tick();
        pacer.end_tick(start);
        assert_eq!(pacer.tick_count(), 1);
        assert_eq!(pacer.stats().total_ticks, 1);
    }

    #[test]
    fn test_backlog_is_bounded() {
        let mut pacer = TickLoop::new(TickRate::new(1000));
        std::thread::sleep(Duration::from_millis(30));
        let mut ran = 0;
        while pacer.should_tick() {
            let start = pacer.begin_tick();
            pacer.end_tick(start);
            ran += 1;
        }
        assert!(ran < 2 * MAX_CATCH_UP_TICKS, "ran {ran}");
        assert!(pacer.stats().dropped_ticks > 0);
    }
}
