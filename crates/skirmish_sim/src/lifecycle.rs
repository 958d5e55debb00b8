//! # Avatar Lifecycle
//!
//! ```text
//!            respawn due + free spawn point
//!   New ─────────────────────────────────────> TeleportIn ──timer──> Active
//!    │                                           ▲                    │  │
//!    │ level transition                          │ respawn due +      │  │ health hits 0
//!    ▼                                           │ free spawn point   │  ▼
//!   TeleportOut <────── level transition ────────┼────────────────────┘ Dead
//!                                                └──────────────────────┘
//! ```
//!
//! - A respawn with no free spawn point stalls and is re-polled every tick.
//! - `Dead` is only entered from `Active`.
//! - `TeleportOut` is never entered from `Dead` and re-entering it is a no-op.
//! - Only the authority holds a [`Lifecycle`]; observers see the replicated
//!   stage.

use skirmish_core::{Tick, TickTimer};

/// Lifecycle stage, replicated as an integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Just created, never placed.
    #[default]
    New = 0,
    /// Leaving the level.
    TeleportOut = 1,
    /// Placed, waiting for the teleport-in timer.
    TeleportIn = 2,
    /// In play.
    Active = 3,
    /// Waiting to respawn.
    Dead = 4,
}

impl Stage {
    /// Replicated integer encoding.
    #[must_use]
    pub const fn to_raw(self) -> i64 {
        self as i64
    }

    /// Decodes the replicated integer encoding.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Self::TeleportOut,
            2 => Self::TeleportIn,
            3 => Self::Active,
            4 => Self::Dead,
            _ => Self::New,
        }
    }
}

/// Authority-side lifecycle state of one avatar.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lifecycle {
    stage: Stage,
    respawn_at: TickTimer,
    teleport_timer: TickTimer,
    deaths: u32,
}

impl Lifecycle {
    /// A new avatar, with an immediate respawn pending.
    #[must_use]
    pub fn spawned(now: Tick) -> Self {
        let mut lifecycle = Self::default();
        lifecycle.schedule_respawn(now, 0);
        lifecycle
    }

    /// Current stage.
    #[inline]
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Deaths so far. Presentation-only.
    #[inline]
    #[must_use]
    pub const fn deaths(&self) -> u32 {
        self.deaths
    }

    /// Requests a respawn `ticks` from now.
    pub fn schedule_respawn(&mut self, now: Tick, ticks: u32) {
        self.respawn_at = TickTimer::from_ticks(now, ticks);
    }

    /// True while a respawn is scheduled but not yet placed.
    #[must_use]
    pub const fn respawn_pending(&self) -> bool {
        self.respawn_at.is_running()
    }

    /// True if the scheduled respawn should try to claim a spawn point.
    #[must_use]
    pub fn respawn_due(&self, now: Tick) -> bool {
        self.respawn_at.expired(now)
    }

    /// Records a successful placement: starts the teleport-in timer and
    /// enters `TeleportIn` unless already `Active`.
    pub fn placed(&mut self, now: Tick, teleport_ticks: u32) {
        self.respawn_at.reset();
        self.teleport_timer = TickTimer::from_ticks(now, teleport_ticks);
        if self.stage != Stage::Active {
            self.stage = Stage::TeleportIn;
        }
    }

    /// `TeleportIn -> Active` once the teleport timer expired.
    pub fn try_activate(&mut self, now: Tick) -> bool {
        if self.stage == Stage::TeleportIn && self.teleport_timer.expired(now) {
            self.stage = Stage::Active;
            return true;
        }
        false
    }

    /// `Active -> Dead`, scheduling the respawn. Returns false from any other
    /// stage.
    pub fn die(&mut self, now: Tick, respawn_ticks: u32) -> bool {
        if self.stage != Stage::Active {
            return false;
        }
        self.stage = Stage::Dead;
        self.deaths = self.deaths.wrapping_add(1);
        self.schedule_respawn(now, respawn_ticks);
        true
    }

    /// Enters `TeleportOut`. No-op when `Dead` or already leaving.
    pub fn teleport_out(&mut self) -> bool {
        if matches!(self.stage, Stage::Dead | Stage::TeleportOut) {
            return false;
        }
        self.stage = Stage::TeleportOut;
        true
    }

    /// True if the avatar may move.
    #[must_use]
    pub const fn grants_movement(&self) -> bool {
        !matches!(self.stage, Stage::Dead | Stage::TeleportOut)
    }

    /// True if hit volumes are live.
    #[must_use]
    pub const fn is_targetable(&self) -> bool {
        matches!(self.stage, Stage::Active)
    }
}
