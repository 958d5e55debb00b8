//! # Core Error Types
//!
//! Errors raised by the replicated property store.

use thiserror::Error;

use crate::authority::PeerId;
use crate::entity::EntityId;

/// Errors that can occur in the replicated store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A peer tried to write state it does not own.
    #[error("{writer} is not the authority for entity {entity} (owned by {owner})")]
    NotAuthority {
        /// The offending writer.
        writer: PeerId,
        /// The owning peer.
        owner: PeerId,
        /// Entity being written.
        entity: EntityId,
    },

    /// The entity was never spawned in the store, or has been despawned.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// A write targeted a property that was never declared.
    #[error("property {property} was not declared on entity {entity}")]
    Undeclared {
        /// Entity being written.
        entity: EntityId,
        /// Debug rendering of the property key.
        property: String,
    },

    /// A write changed the value kind of a declared property.
    #[error("property {property} on entity {entity} holds {expected}, got {found}")]
    KindMismatch {
        /// Entity being written.
        entity: EntityId,
        /// Debug rendering of the property key.
        property: String,
        /// Declared kind.
        expected: &'static str,
        /// Written kind.
        found: &'static str,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
