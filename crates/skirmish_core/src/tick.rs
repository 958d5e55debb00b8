//! # Ticks and Tick Timers
//!
//! All cooldown math on the authority is tick-quantized: a duration becomes a
//! whole number of ticks from "now", so fire rates are identical at any frame
//! rate and on every peer.
//!
//! ## Timer semantics
//!
//! ```text
//!   not running ──start──> running ──tick >= target──> expired
//!        ^                                                │
//!        └──────────────────── reset ─────────────────────┘
//! ```
//!
//! `expired` is only true for a timer that was started; `expired_or_not_running`
//! is the usual "may I act?" check.

use std::ops::{Add, Sub};

/// A simulation tick number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tick(pub u32);

impl Tick {
    /// First tick of a match.
    pub const ZERO: Self = Self(0);

    /// Ticks elapsed since `earlier` (zero if `earlier` is in the future).
    #[inline]
    #[must_use]
    pub const fn since(self, earlier: Self) -> u32 {
        self.0.saturating_sub(earlier.0)
    }

    /// The following tick.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl Add<u32> for Tick {
    type Output = Self;
    fn add(self, rhs: u32) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub<u32> for Tick {
    type Output = Self;
    fn sub(self, rhs: u32) -> Self {
        Self(self.0.saturating_sub(rhs))
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Fixed tick rate and the conversions that depend on it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickRate {
    rate: u32,
    dt: f32,
}

impl TickRate {
    /// Creates a tick rate. A zero rate is clamped to 1Hz.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(rate: u32) -> Self {
        let rate = rate.max(1);
        Self {
            rate,
            dt: 1.0 / rate as f32,
        }
    }

    /// Ticks per second.
    #[inline]
    #[must_use]
    pub const fn rate(self) -> u32 {
        self.rate
    }

    /// Seconds per tick.
    #[inline]
    #[must_use]
    pub const fn dt(self) -> f32 {
        self.dt
    }

    /// Whole ticks covering `secs`, rounded up. Non-positive durations are 0.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn ticks_for_secs(self, secs: f32) -> u32 {
        if secs <= 0.0 {
            return 0;
        }
        // Tolerate float noise so 1.0s at 60Hz is 60 ticks, not 61
        (secs * self.rate as f32 - 1e-3).ceil().max(1.0) as u32
    }

    /// Ticks between executions for a per-minute rate: `ceil((60 / rate) / dt)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ticks_for_rate_per_minute(self, per_minute: u32) -> u32 {
        if per_minute == 0 {
            return 0;
        }
        self.ticks_for_secs(60.0 / per_minute as f32)
    }

    /// Seconds spanned by `ticks`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn secs(self, ticks: u32) -> f32 {
        ticks as f32 * self.dt
    }
}

impl Default for TickRate {
    fn default() -> Self {
        Self::new(skirmish_shared::TICK_RATE)
    }
}

/// A tick-quantized countdown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickTimer {
    target: Option<Tick>,
}

impl TickTimer {
    /// A timer that is not running.
    pub const NONE: Self = Self { target: None };

    /// Starts a timer that expires `ticks` after `now`.
    #[must_use]
    pub fn from_ticks(now: Tick, ticks: u32) -> Self {
        Self {
            target: Some(now + ticks),
        }
    }

    /// Starts a timer that expires `secs` after `now`, rounded up to ticks.
    #[must_use]
    pub fn from_secs(now: Tick, rate: TickRate, secs: f32) -> Self {
        Self::from_ticks(now, rate.ticks_for_secs(secs))
    }

    /// True once started.
    #[inline]
    #[must_use]
    pub const fn is_running(self) -> bool {
        self.target.is_some()
    }

    /// True if started and the target tick has been reached.
    #[inline]
    #[must_use]
    pub fn expired(self, now: Tick) -> bool {
        matches!(self.target, Some(target) if now >= target)
    }

    /// True if never started or already expired.
    #[inline]
    #[must_use]
    pub fn expired_or_not_running(self, now: Tick) -> bool {
        match self.target {
            Some(target) => now >= target,
            None => true,
        }
    }

    /// Ticks left, or `None` if not running.
    #[must_use]
    pub fn remaining_ticks(self, now: Tick) -> Option<u32> {
        self.target.map(|target| target.since(now))
    }

    /// Seconds left, or `None` if not running.
    #[must_use]
    pub fn remaining_secs(self, now: Tick, rate: TickRate) -> Option<f32> {
        self.remaining_ticks(now).map(|t| rate.secs(t))
    }

    /// Target tick, if running.
    #[inline]
    #[must_use]
    pub const fn target(self) -> Option<Tick> {
        self.target
    }

    /// Stops the timer.
    pub fn reset(&mut self) {
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_for_secs_rounds_up() {
        let rate = TickRate::new(60);
        assert_eq!(rate.ticks_for_secs(1.0), 60);
        assert_eq!(rate.ticks_for_secs(0.25), 15);
        assert_eq!(rate.ticks_for_secs(0.0), 0);
        // 0.15 ticks worth still costs a whole tick
        assert_eq!(rate.ticks_for_secs(0.0025), 1);
    }

    #[test]
    fn test_fire_rate_quantization() {
        let rate = TickRate::new(60);
        // 400/min -> 0.15s -> 9 ticks
        assert_eq!(rate.ticks_for_rate_per_minute(400), 9);
        // 200/min -> 0.3s -> 18 ticks
        assert_eq!(rate.ticks_for_rate_per_minute(200), 18);
        // 100/min -> 0.6s -> 36 ticks
        assert_eq!(rate.ticks_for_rate_per_minute(100), 36);
        assert_eq!(rate.ticks_for_rate_per_minute(0), 0);
    }

    #[test]
    fn test_timer_lifecycle() {
        let mut timer = TickTimer::NONE;
        assert!(!timer.is_running());
        assert!(!timer.expired(Tick(100)));
        assert!(timer.expired_or_not_running(Tick(100)));

        timer = TickTimer::from_ticks(Tick(10), 5);
        assert!(!timer.expired(Tick(14)));
        assert_eq!(timer.remaining_ticks(Tick(12)), Some(3));
        assert!(timer.expired(Tick(15)));
        assert!(timer.expired_or_not_running(Tick(20)));

        timer.reset();
        assert!(!timer.expired(Tick(20)));
    }

    #[test]
    fn test_tick_arithmetic() {
        assert_eq!(Tick(5) + 3, Tick(8));
        assert_eq!(Tick(2) - 5, Tick(0));
        assert_eq!(Tick(10).since(Tick(4)), 6);
        assert_eq!(Tick(4).since(Tick(10)), 0);
    }
}
