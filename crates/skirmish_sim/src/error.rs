//! # Simulation Error Types
//!
//! Only capacity problems, unknown identifiers and per-entity faults are
//! errors. Cooldowns, missing spawn points and invalid actions are ordinary
//! no-ops and never surface here.

use skirmish_core::{CoreError, EntityId, PeerId};
use skirmish_shared::ConfigError;
use thiserror::Error;

use crate::ids::ParticipantId;

/// Errors raised by the match simulation.
#[derive(Error, Debug)]
pub enum SimError {
    /// Every slot is taken.
    #[error("session full: capacity {capacity}")]
    CapacityExceeded {
        /// Configured capacity.
        capacity: usize,
    },

    /// The participant already holds a slot.
    #[error("participant {0} already joined")]
    AlreadyJoined(ParticipantId),

    /// The participant holds no slot.
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    /// The entity is not (or no longer) part of the match.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// Only the authoritative peer may run the simulation.
    #[error("{0} is an observer and cannot run the simulation")]
    NotAuthority(PeerId),

    /// The session was torn down.
    #[error("session closed")]
    SessionClosed,

    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The replicated store refused a write.
    #[error(transparent)]
    Replication(#[from] CoreError),

    /// One entity's decision step failed; the rest of the tick still ran.
    #[error("decision fault on {entity}: {reason}")]
    Fault {
        /// Entity whose step failed.
        entity: EntityId,
        /// What went wrong.
        reason: String,
    },
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
