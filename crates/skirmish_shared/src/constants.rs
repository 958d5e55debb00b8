//! # Simulation Constants
//!
//! Values that are baked into both the authority and observer builds.
//! Tunables that designers change live in [`crate::config`] instead.

// =============================================================================
// TICK
// =============================================================================

/// Default decision-phase tick rate (ticks per second).
pub const TICK_RATE: u32 = 60;

/// Default lag-compensation history depth, in ticks.
///
/// Two seconds at 60Hz is well past any round trip we accept.
pub const HISTORY_TICKS: u32 = 120;

// =============================================================================
// SESSION
// =============================================================================

/// Maximum participants per match.
pub const MAX_PARTICIPANTS: usize = 10;

/// Minimum population before anyone may ready up.
pub const MIN_READY_POPULATION: usize = 2;

/// Depth of the per-participant input ring.
pub const INPUT_HISTORY_SIZE: usize = 64;

// =============================================================================
// EVENT RELAY
// =============================================================================

/// Ring-buffer slots for queued relay events.
pub const RELAY_MAX_EVENTS: usize = 10;

/// Maximum encoded payload of a single relay event, in bytes.
pub const RELAY_MAX_EVENT_SIZE: usize = 24;

// =============================================================================
// PHYSICS
// =============================================================================

/// Gravity acceleration (m/s^2, pointing down the Y axis).
pub const GRAVITY: f32 = 9.81;
