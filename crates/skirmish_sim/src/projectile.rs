//! # Projectiles and Area Effects
//!
//! A projectile is a closed-form ballistic path, so its position at any tick
//! is recomputed from the launch state instead of integrated. Each decision
//! tick sweeps the segment flown since the previous tick against the
//! lag-compensated index.
//!
//! ```text
//!   Flying ──contact──> Lingering ──linger elapsed──> Spent
//!     │
//!     └──lifetime elapsed──────────────────────────> Spent
//! ```
//!
//! An area effect pulses on the tick it is created and then once per
//! interval while its duration lasts.

use skirmish_core::{Tick, TickRate};
use skirmish_shared::config::{AreaConfig, ProjectileConfig};
use skirmish_shared::constants::GRAVITY;
use skirmish_shared::Vec3;

use crate::action::Impact;
use crate::hitreg::{Attacker, HitMask, HitRecord, LagCompensator, Ray, SpatialIndex};

/// Flight state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightState {
    /// Still travelling.
    Flying,
    /// Landed; kept around for presentation until the tick given.
    Lingering(Tick),
    /// Ready for removal.
    Spent,
}

/// What happened to a projectile this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FlightEvent {
    /// Nothing yet.
    None,
    /// The sweep touched something.
    Landed(HitRecord),
    /// Lifetime ran out in the air.
    Expired,
}

/// A launched projectile.
#[derive(Clone, Debug)]
pub struct Projectile {
    attacker: Attacker,
    origin: Vec3,
    velocity: Vec3,
    gravity_scale: f32,
    fired_at: Tick,
    lifetime_ticks: u32,
    linger_ticks: u32,
    impact: Impact,
    state: FlightState,
}

impl Projectile {
    /// Launches toward `target` at the configured speed.
    #[must_use]
    pub fn launch(
        attacker: Attacker,
        origin: Vec3,
        target: Vec3,
        flight: &ProjectileConfig,
        impact: Impact,
        now: Tick,
        rate: TickRate,
    ) -> Self {
        let mut direction = (target - origin).normalized();
        if direction.is_zero() {
            direction = Vec3::Z;
        }
        Self {
            attacker,
            origin,
            velocity: direction * flight.speed,
            gravity_scale: flight.gravity_scale,
            fired_at: now,
            lifetime_ticks: rate.ticks_for_secs(flight.lifetime_secs),
            linger_ticks: rate.ticks_for_secs(flight.linger_secs),
            impact,
            state: FlightState::Flying,
        }
    }

    /// Position `t` seconds after launch.
    #[must_use]
    pub fn position_at(&self, t: f32) -> Vec3 {
        let gravity = Vec3::new(0.0, -GRAVITY, 0.0) * self.gravity_scale;
        self.origin + self.velocity * t + gravity * (t * t)
    }

    /// Advances one decision tick.
    pub fn step<I: SpatialIndex + ?Sized>(
        &mut self,
        index: &I,
        lag: &mut LagCompensator,
        now: Tick,
        rate: TickRate,
    ) -> FlightEvent {
        match self.state {
            FlightState::Spent => FlightEvent::None,
            FlightState::Lingering(until) => {
                if now >= until {
                    self.state = FlightState::Spent;
                }
                FlightEvent::None
            }
            FlightState::Flying => {
                let elapsed = now.since(self.fired_at);
                if elapsed == 0 {
                    return FlightEvent::None;
                }
                let from = self.position_at(rate.secs(elapsed - 1));
                let to = self.position_at(rate.secs(elapsed));
                let ray = Ray::between(from, to);
                if let Some(hit) = lag.raycast(index, &ray, &self.attacker, now, HitMask::ALL) {
                    self.state = FlightState::Lingering(now + self.linger_ticks);
                    return FlightEvent::Landed(hit);
                }
                if elapsed >= self.lifetime_ticks {
                    self.state = FlightState::Spent;
                    return FlightEvent::Expired;
                }
                FlightEvent::None
            }
        }
    }

    /// Flight state.
    #[must_use]
    pub const fn state(&self) -> FlightState {
        self.state
    }

    /// True once it can be removed.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.state == FlightState::Spent
    }

    /// Who fired it.
    #[must_use]
    pub const fn attacker(&self) -> &Attacker {
        &self.attacker
    }

    /// Landing behaviour.
    #[must_use]
    pub const fn impact(&self) -> &Impact {
        &self.impact
    }
}

/// A lingering damage zone.
#[derive(Clone, Debug)]
pub struct AreaEffect {
    attacker: Attacker,
    center: Vec3,
    radius: f32,
    damage: f32,
    interval_ticks: u32,
    next_pulse: Tick,
    ends_at: Tick,
    pulses: u32,
}

impl AreaEffect {
    /// A zone starting at `now`. The first pulse is due immediately.
    #[must_use]
    pub fn new(attacker: Attacker, center: Vec3, config: &AreaConfig, now: Tick, rate: TickRate) -> Self {
        Self {
            attacker,
            center,
            radius: config.radius,
            damage: config.damage,
            interval_ticks: rate.ticks_for_secs(config.interval_secs).max(1),
            next_pulse: now,
            ends_at: now + rate.ticks_for_secs(config.duration_secs),
            pulses: 0,
        }
    }

    /// True if a pulse fires this tick; advances the schedule when it does.
    pub fn poll(&mut self, now: Tick) -> bool {
        if now < self.next_pulse || self.next_pulse >= self.ends_at {
            return false;
        }
        self.pulses += 1;
        self.next_pulse = self.next_pulse + self.interval_ticks;
        true
    }

    /// True once every pulse has fired.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.next_pulse >= self.ends_at
    }

    /// Who created it.
    #[must_use]
    pub const fn attacker(&self) -> &Attacker {
        &self.attacker
    }

    /// Zone center.
    #[must_use]
    pub const fn center(&self) -> Vec3 {
        self.center
    }

    /// Zone radius.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Damage per pulse.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Pulses fired so far.
    #[must_use]
    pub const fn pulses(&self) -> u32 {
        self.pulses
    }
}
