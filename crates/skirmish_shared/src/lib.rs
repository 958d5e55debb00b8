//! # SKIRMISH Shared
//!
//! Common types used by both the authoritative peer and its observers.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on simulation state. If a type needs to know
//! about sessions, avatars or hit registration, it belongs in `skirmish_sim`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod constants;
pub mod input;
pub mod math;
pub mod team;

pub use config::{
    ActionConfig, ConfigError, ConfigResult, ProgressionConfig, ScoringConfig, SessionConfig,
    SimConfig, TickConfig,
};
pub use constants::{MAX_PARTICIPANTS, TICK_RATE};
pub use input::{Button, Buttons, TickInput};
pub use math::{clamp01, lerp, Quat, Vec2, Vec3};
pub use team::{Character, Side};
