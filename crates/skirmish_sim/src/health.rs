//! # Health
//!
//! Damage bookkeeping for anything that can be hurt: avatars and NPCs carry a
//! [`Health`], placed objects a [`Destroyable`]. Who may damage whom is not
//! decided here; hit registration rejects protected pairs before any damage
//! is computed.

use skirmish_core::{EntityId, Tick, TickTimer};
use skirmish_shared::Vec3;

/// One damage application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageHit {
    /// Damage after multipliers.
    pub amount: f32,
    /// World-space contact point.
    pub point: Vec3,
    /// Direction the damage travelled.
    pub direction: Vec3,
    /// Critical hits get their own presentation.
    pub critical: bool,
}

/// Result of [`Health::apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Dead, invulnerable, or zero damage. Nothing changed.
    Rejected,
    /// Health dropped but stayed above zero.
    Damaged,
    /// This hit took health to zero.
    Killed,
}

/// Health pool with presentation counters.
#[derive(Clone, Debug, PartialEq)]
pub struct Health {
    current: f32,
    max: f32,
    hit_count: u32,
    critical_count: u32,
    last_hit_offset: Vec3,
    last_hit_direction: Vec3,
    invulnerable: TickTimer,
}

impl Health {
    /// Full health.
    #[must_use]
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            hit_count: 0,
            critical_count: 0,
            last_hit_offset: Vec3::ZERO,
            last_hit_direction: Vec3::ZERO,
            invulnerable: TickTimer::NONE,
        }
    }

    /// Applies one hit to an actor standing at `origin`.
    pub fn apply(&mut self, hit: &DamageHit, origin: Vec3, now: Tick) -> DamageOutcome {
        if self.current <= 0.0 || hit.amount <= 0.0 {
            return DamageOutcome::Rejected;
        }
        if self.invulnerable.is_running() && !self.invulnerable.expired(now) {
            return DamageOutcome::Rejected;
        }

        self.current -= hit.amount;
        self.last_hit_offset = hit.point - origin;
        self.last_hit_direction = -hit.direction;
        self.hit_count = self.hit_count.wrapping_add(1);
        if hit.critical {
            self.critical_count = self.critical_count.wrapping_add(1);
        }

        if self.current <= 0.0 {
            self.current = 0.0;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Damaged
        }
    }

    /// Back to full health.
    pub fn restore(&mut self) {
        self.current = self.max;
    }

    /// Ignores damage until `timer` expires.
    pub fn set_invulnerable(&mut self, timer: TickTimer) {
        self.invulnerable = timer;
    }

    /// True while the invulnerability window is open.
    #[must_use]
    pub fn is_invulnerable(&self, now: Tick) -> bool {
        self.invulnerable.is_running() && !self.invulnerable.expired(now)
    }

    /// True above zero.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Current health.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[inline]
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Hits taken. Presentation-only.
    #[inline]
    #[must_use]
    pub const fn hit_count(&self) -> u32 {
        self.hit_count
    }

    /// Critical hits taken. Presentation-only.
    #[inline]
    #[must_use]
    pub const fn critical_count(&self) -> u32 {
        self.critical_count
    }

    /// Last contact point relative to the actor.
    #[inline]
    #[must_use]
    pub const fn last_hit_offset(&self) -> Vec3 {
        self.last_hit_offset
    }

    /// Reversed direction of the last hit.
    #[inline]
    #[must_use]
    pub const fn last_hit_direction(&self) -> Vec3 {
        self.last_hit_direction
    }
}

/// A placed object that blasts can destroy.
#[derive(Clone, Debug, PartialEq)]
pub struct Destroyable {
    /// Entity id.
    pub id: EntityId,
    /// Collider center.
    pub position: Vec3,
    /// Collider half extents.
    pub half_extents: Vec3,
    /// Ignores all damage.
    pub invincible: bool,
    health: f32,
    destroyed: bool,
}

impl Destroyable {
    /// A fresh object.
    #[must_use]
    pub fn new(id: EntityId, position: Vec3, half_extents: Vec3, health: f32) -> Self {
        Self {
            id,
            position,
            half_extents,
            invincible: false,
            health,
            destroyed: false,
        }
    }

    /// Applies blast damage. Returns true only on the hit that destroys it.
    pub fn apply_blast(&mut self, amount: f32) -> bool {
        if self.invincible || self.destroyed {
            return false;
        }
        self.health -= amount;
        if self.health <= 0.0 {
            self.health = 0.0;
            self.destroyed = true;
            return true;
        }
        false
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// True once destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
