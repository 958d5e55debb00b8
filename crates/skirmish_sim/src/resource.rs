//! # Resource / Cooldown Record
//!
//! The one model every action-bearing item shares: a clip, a reserve, a
//! single tick timer and a busy flag.
//!
//! ```text
//!            try_execute (clip > 0, timer free)
//!   Ready ─────────────────────────────────────> Cooldown ──expired──> Ready
//!     │                                                                  ▲
//!     │ clip == 0 / explicit reload (timer free, reserve > 0)            │
//!     ▼                                                                  │
//!   Reloading ──expired──> refill clip, post-reload cooldown ────────────┘
//! ```
//!
//! Cooldown-only actions (`max_clip == 0`) never consume charge; if they
//! have a reload time, every execution enters `Reloading` instead.
//!
//! All durations are whole ticks computed once from the configured tick
//! rate. Presentation may interpolate [`ResourceRecord::progress`] but never
//! writes back.

use skirmish_core::{Tick, TickRate, TickTimer};
use skirmish_shared::ActionConfig;

/// Charge, reserve and cooldown state for one action.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceRecord {
    clip: u32,
    max_clip: u32,
    reserve: u32,
    start_ammo: u32,
    reloading: bool,
    timer: TickTimer,
    executions: u32,
    fire_ticks: u32,
    reload_ticks: u32,
    post_reload_ticks: u32,
    rate: TickRate,
}

impl ResourceRecord {
    /// Creates a fully armed record.
    #[must_use]
    pub fn new(config: &ActionConfig, rate: TickRate) -> Self {
        let mut record = Self {
            clip: 0,
            max_clip: config.max_clip,
            reserve: 0,
            start_ammo: config.start_ammo,
            reloading: false,
            timer: TickTimer::NONE,
            executions: 0,
            fire_ticks: rate.ticks_for_rate_per_minute(config.rate_per_minute),
            reload_ticks: rate.ticks_for_secs(config.reload_secs),
            post_reload_ticks: rate.ticks_for_secs(config.post_reload_secs),
            rate,
        };
        record.rearm();
        record
    }

    /// Refills to starting values: `clip = min(start, max)`, the rest in reserve.
    /// Also clears any reload or cooldown in flight.
    pub fn rearm(&mut self) {
        self.clip = self.start_ammo.min(self.max_clip);
        self.reserve = self.start_ammo - self.clip;
        self.reset_timers();
    }

    /// Drops any cooldown or reload in flight.
    pub fn reset_timers(&mut self) {
        self.reloading = false;
        self.timer.reset();
    }

    /// True if executions consume charge.
    #[inline]
    #[must_use]
    pub const fn is_consumable(&self) -> bool {
        self.max_clip > 0
    }

    /// Attempts one execution.
    ///
    /// Fails while reloading, while the cooldown runs, or with an empty clip
    /// (which also requests a reload). On success charge drops by one, the
    /// cooldown starts and the execution counter advances.
    pub fn try_execute(&mut self, now: Tick) -> bool {
        if self.reloading || !self.timer.expired_or_not_running(now) {
            return false;
        }
        if self.is_consumable() {
            if self.clip == 0 {
                self.request_reload(now);
                return false;
            }
            self.clip -= 1;
        }

        self.executions = self.executions.wrapping_add(1);
        if !self.is_consumable() && self.reload_ticks > 0 {
            self.reloading = true;
            self.timer = TickTimer::from_ticks(now, self.reload_ticks.max(self.fire_ticks));
        } else {
            self.timer = TickTimer::from_ticks(now, self.fire_ticks);
        }
        true
    }

    /// Starts a reload. Returns false if the clip is full, the reserve is
    /// empty, a reload is already running, or the cooldown is busy.
    pub fn request_reload(&mut self, now: Tick) -> bool {
        if !self.is_consumable()
            || self.clip >= self.max_clip
            || self.reserve == 0
            || self.reloading
            || !self.timer.expired_or_not_running(now)
        {
            return false;
        }
        self.reloading = true;
        self.timer = TickTimer::from_ticks(now, self.reload_ticks);
        true
    }

    /// Per-tick upkeep: finishes reloads and starts the automatic one.
    ///
    /// Returns true on the tick a reload or recharge completes.
    pub fn update(&mut self, now: Tick) -> bool {
        if self.reloading {
            if !self.timer.expired_or_not_running(now) {
                return false;
            }
            self.reloading = false;
            if self.is_consumable() {
                let moved = (self.max_clip - self.clip).min(self.reserve);
                self.clip += moved;
                self.reserve -= moved;
            }
            self.timer = if self.post_reload_ticks > 0 {
                TickTimer::from_ticks(now, self.post_reload_ticks)
            } else {
                TickTimer::NONE
            };
            return true;
        }
        if self.is_consumable() && self.clip == 0 {
            self.request_reload(now);
        }
        false
    }

    /// 1.0 when idle, otherwise the elapsed fraction of the reload.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self, now: Tick) -> f32 {
        if !self.reloading || self.reload_ticks == 0 {
            return 1.0;
        }
        let remaining = self.timer.remaining_ticks(now).unwrap_or(0);
        let total = if self.is_consumable() {
            self.reload_ticks
        } else {
            self.reload_ticks.max(self.fire_ticks)
        };
        (1.0 - remaining as f32 / total as f32).clamp(0.0, 1.0)
    }

    /// Rounds left in the clip.
    #[inline]
    #[must_use]
    pub const fn clip(&self) -> u32 {
        self.clip
    }

    /// Clip size (0 for cooldown-only actions).
    #[inline]
    #[must_use]
    pub const fn max_clip(&self) -> u32 {
        self.max_clip
    }

    /// Rounds in reserve.
    #[inline]
    #[must_use]
    pub const fn reserve(&self) -> u32 {
        self.reserve
    }

    /// True while reloading or recharging.
    #[inline]
    #[must_use]
    pub const fn is_reloading(&self) -> bool {
        self.reloading
    }

    /// Executions since spawn. Presentation-only.
    #[inline]
    #[must_use]
    pub const fn executions(&self) -> u32 {
        self.executions
    }

    /// True if an execution would pass the timer checks this tick.
    #[must_use]
    pub fn is_ready(&self, now: Tick) -> bool {
        !self.reloading && self.timer.expired_or_not_running(now)
    }

    /// Seconds left on the current reload, if any.
    #[must_use]
    pub fn reload_remaining_secs(&self, now: Tick) -> Option<f32> {
        if self.reloading {
            self.timer.remaining_secs(now, self.rate)
        } else {
            None
        }
    }

    /// Ticks between executions.
    #[inline]
    #[must_use]
    pub const fn fire_ticks(&self) -> u32 {
        self.fire_ticks
    }

    /// Ticks a reload takes.
    #[inline]
    #[must_use]
    pub const fn reload_ticks(&self) -> u32 {
        self.reload_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rifle() -> ResourceRecord {
        let config = ActionConfig {
            max_clip: 64,
            start_ammo: 384,
            rate_per_minute: 400,
            reload_secs: 1.5,
            post_reload_secs: 0.25,
        };
        ResourceRecord::new(&config, TickRate::new(60))
    }

    fn cooldown_only(reload_secs: f32, rate_per_minute: u32) -> ResourceRecord {
        let config = ActionConfig {
            max_clip: 0,
            start_ammo: 0,
            rate_per_minute,
            reload_secs,
            post_reload_secs: 0.5,
        };
        ResourceRecord::new(&config, TickRate::new(60))
    }

    #[test]
    fn test_spawn_values() {
        let r = rifle();
        assert_eq!(r.clip(), 64);
        assert_eq!(r.reserve(), 320);
        assert_eq!(r.fire_ticks(), 9);
        assert_eq!(r.reload_ticks(), 90);
        assert!((r.progress(Tick(0)) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fire_respects_cooldown() {
        let mut r = rifle();
        assert!(r.try_execute(Tick(0)));
        assert_eq!(r.clip(), 63);
        assert_eq!(r.reserve(), 320);
        assert!(!r.try_execute(Tick(8)));
        assert!(r.try_execute(Tick(9)));
        assert_eq!(r.executions(), 2);
    }

    #[test]
    fn test_empty_clip_reloads() {
        let mut r = rifle();
        let mut now = Tick(0);
        while r.clip() > 0 {
            assert!(r.try_execute(now));
            now = now + r.fire_ticks();
        }
        assert!(!r.try_execute(now));
        assert!(r.is_reloading());

        let halfway = now + 45;
        assert!(!r.update(halfway));
        assert!((r.progress(halfway) - 0.5).abs() < 1e-3);

        assert!(r.update(now + 90));
        assert_eq!(r.clip(), 64);
        assert_eq!(r.reserve(), 256);
        // Post-reload cooldown of 0.25s (15 ticks)
        assert!(!r.try_execute(now + 100));
        assert!(r.try_execute(now + 105));
    }

    #[test]
    fn test_automatic_reload_waits_for_cooldown() {
        let mut r = rifle();
        let mut now = Tick(0);
        for _ in 0..64 {
            assert!(r.try_execute(now));
            now = now + 9;
        }
        let last = now - 9;
        r.update(last + 1);
        assert!(!r.is_reloading());
        r.update(last + 9);
        assert!(r.is_reloading());
    }

    #[test]
    fn test_reload_blocked() {
        let mut r = rifle();
        assert!(!r.request_reload(Tick(0)), "full clip");

        assert!(r.try_execute(Tick(0)));
        assert!(!r.request_reload(Tick(1)), "cooldown running");
        assert!(r.request_reload(Tick(9)));
        assert!(!r.request_reload(Tick(10)), "already reloading");
        assert!(!r.try_execute(Tick(20)), "cannot fire while reloading");
    }

    #[test]
    fn test_partial_reserve() {
        let config = ActionConfig {
            max_clip: 12,
            start_ammo: 17,
            rate_per_minute: 200,
            reload_secs: 1.5,
            post_reload_secs: 0.25,
        };
        let mut r = ResourceRecord::new(&config, TickRate::new(60));
        assert_eq!((r.clip(), r.reserve()), (12, 5));
        let mut now = Tick(0);
        for _ in 0..12 {
            assert!(r.try_execute(now));
            now = now + r.fire_ticks();
        }
        assert!(r.request_reload(now));
        assert!(r.update(now + 90));
        assert_eq!((r.clip(), r.reserve()), (5, 0));
    }

    #[test]
    fn test_charge_never_negative() {
        let config = ActionConfig {
            max_clip: 2,
            start_ammo: 2,
            rate_per_minute: 0,
            reload_secs: 1.0,
            post_reload_secs: 0.0,
        };
        let mut r = ResourceRecord::new(&config, TickRate::new(60));
        let mut fired = 0;
        for t in 0..200 {
            if r.try_execute(Tick(t)) {
                fired += 1;
            }
            r.update(Tick(t));
        }
        assert_eq!(fired, 2);
        assert_eq!(r.clip(), 0);
        assert_eq!(r.reserve(), 0);
    }

    #[test]
    fn test_cooldown_only_with_recharge() {
        let mut r = cooldown_only(1.5, 0);
        assert!(!r.is_consumable());
        assert!(r.try_execute(Tick(0)));
        assert!(r.is_reloading());
        assert!(!r.try_execute(Tick(10)));
        assert!(r.progress(Tick(45)) > 0.49);

        assert!(r.update(Tick(90)));
        // Settles for 0.5s after the recharge
        assert!(!r.try_execute(Tick(100)));
        assert!(r.try_execute(Tick(120)));
    }

    #[test]
    fn test_cooldown_only_rate_limited() {
        let mut r = cooldown_only(0.0, 100);
        assert!(r.try_execute(Tick(0)));
        assert!(!r.is_reloading());
        assert!(!r.try_execute(Tick(35)));
        assert!(r.try_execute(Tick(36)));
        assert!(!r.request_reload(Tick(100)));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut r = cooldown_only(5.0, 0);
        assert!(r.try_execute(Tick(0)));
        let mut last = -1.0;
        for t in 0..=300 {
            let p = r.progress(Tick(t));
            assert!(p >= last);
            last = p;
        }
    }
}
