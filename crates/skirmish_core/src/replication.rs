//! # Replicated Property Store
//!
//! Per-entity typed fields whose authoritative value is owned by exactly one
//! peer and mirrored to everyone else.
//!
//! ## Design
//!
//! ```text
//!   authority                                    observers
//!   ─────────                                    ─────────
//!   declare / write ──> ReplicatedStore ──commit──> StoreSnapshot (immutable)
//!        ▲                    │                          │
//!   WriteCapability      owner per entity           read-only projection
//! ```
//!
//! - Every mutation takes a [`WriteCapability`]; observers cannot mint one.
//! - Each entity records its owning peer; a capability minted for another
//!   peer is a contract violation. It panics when debug assertions are on,
//!   and is reported as [`CoreError::NotAuthority`] otherwise.
//! - The property key type is supplied by the simulation, so this crate
//!   stays ignorant of what an avatar or a score is.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use skirmish_shared::Vec3;

use crate::authority::{PeerId, WriteCapability};
use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::tick::Tick;

/// A replicated value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyValue {
    /// Counters, enums, ammo.
    Int(i64),
    /// Health, scores.
    Float(f32),
    /// Flags.
    Bool(bool),
    /// Positions, hit directions.
    Vec3(Vec3),
}

impl PropertyValue {
    /// Name of the value kind, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Vec3(_) => "vec3",
        }
    }

    /// Integer payload, if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float payload, if this is a `Float`.
    #[must_use]
    pub const fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Bool payload, if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Vector payload, if this is a `Vec3`.
    #[must_use]
    pub const fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

/// The authoritative copy of every replicated property.
#[derive(Debug)]
pub struct ReplicatedStore<P> {
    /// Owning peer per live entity.
    owners: HashMap<EntityId, PeerId>,
    /// Current values.
    values: HashMap<(EntityId, P), PropertyValue>,
    /// Writes since the last commit.
    pending_writes: u32,
}

impl<P> Default for ReplicatedStore<P> {
    fn default() -> Self {
        Self {
            owners: HashMap::new(),
            values: HashMap::new(),
            pending_writes: 0,
        }
    }
}

impl<P: Copy + Eq + Hash + Debug> ReplicatedStore<P> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity owned by the capability holder. Re-spawning a live
    /// entity is a no-op.
    pub fn spawn(&mut self, cap: &WriteCapability, entity: EntityId) {
        self.owners.entry(entity).or_insert(cap.holder());
    }

    /// Removes an entity and all of its properties.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownEntity`] or [`CoreError::NotAuthority`].
    pub fn despawn(&mut self, cap: &WriteCapability, entity: EntityId) -> CoreResult<()> {
        self.check_owner(cap, entity)?;
        self.owners.remove(&entity);
        self.values.retain(|(e, _), _| *e != entity);
        self.pending_writes += 1;
        Ok(())
    }

    /// Declares a property with its initial value. Declaring twice resets it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownEntity`] or [`CoreError::NotAuthority`].
    pub fn declare(
        &mut self,
        cap: &WriteCapability,
        entity: EntityId,
        property: P,
        initial: PropertyValue,
    ) -> CoreResult<()> {
        self.check_owner(cap, entity)?;
        self.values.insert((entity, property), initial);
        self.pending_writes += 1;
        Ok(())
    }

    /// Writes a declared property. Returns whether the value changed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownEntity`], [`CoreError::NotAuthority`],
    /// [`CoreError::Undeclared`] or [`CoreError::KindMismatch`].
    pub fn write(
        &mut self,
        cap: &WriteCapability,
        entity: EntityId,
        property: P,
        value: PropertyValue,
    ) -> CoreResult<bool> {
        self.check_owner(cap, entity)?;
        let slot = self
            .values
            .get_mut(&(entity, property))
            .ok_or_else(|| CoreError::Undeclared {
                entity,
                property: format!("{property:?}"),
            })?;
        if slot.kind() != value.kind() {
            return Err(CoreError::KindMismatch {
                entity,
                property: format!("{property:?}"),
                expected: slot.kind(),
                found: value.kind(),
            });
        }
        if *slot == value {
            return Ok(false);
        }
        *slot = value;
        self.pending_writes += 1;
        Ok(true)
    }

    /// Reads a property.
    #[must_use]
    pub fn read(&self, entity: EntityId, property: P) -> Option<PropertyValue> {
        self.values.get(&(entity, property)).copied()
    }

    /// True if the entity is registered.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.owners.contains_key(&entity)
    }

    /// Owner of an entity.
    #[must_use]
    pub fn owner(&self, entity: EntityId) -> Option<PeerId> {
        self.owners.get(&entity).copied()
    }

    /// Writes applied since the last commit.
    #[must_use]
    pub const fn pending_writes(&self) -> u32 {
        self.pending_writes
    }

    /// Freezes the current values into an immutable snapshot for `tick`.
    pub fn commit(&mut self, cap: &WriteCapability, tick: Tick) -> Arc<StoreSnapshot<P>> {
        tracing::trace!(
            holder = %cap.holder(),
            %tick,
            writes = self.pending_writes,
            "committing replicated snapshot"
        );
        self.pending_writes = 0;
        let mut entities: Vec<EntityId> = self.owners.keys().copied().collect();
        entities.sort_unstable();
        Arc::new(StoreSnapshot {
            tick,
            entities,
            values: self.values.clone(),
        })
    }

    /// Drops every entity and value.
    pub fn clear(&mut self, _cap: &WriteCapability) {
        self.owners.clear();
        self.values.clear();
        self.pending_writes = 0;
    }

    fn check_owner(&self, cap: &WriteCapability, entity: EntityId) -> CoreResult<()> {
        let owner = *self
            .owners
            .get(&entity)
            .ok_or(CoreError::UnknownEntity(entity))?;
        if owner != cap.holder() {
            let err = CoreError::NotAuthority {
                writer: cap.holder(),
                owner,
                entity,
            };
            // Divergent writes cannot self-correct; refuse loudly while developing
            if cfg!(debug_assertions) {
                panic!("replication contract violated: {err}");
            }
            tracing::error!(%err, "replicated write rejected");
            return Err(err);
        }
        Ok(())
    }
}

/// Immutable view of every replicated value at the end of one tick.
#[derive(Clone, Debug)]
pub struct StoreSnapshot<P> {
    tick: Tick,
    entities: Vec<EntityId>,
    values: HashMap<(EntityId, P), PropertyValue>,
}

impl<P: Copy + Eq + Hash> StoreSnapshot<P> {
    /// An empty snapshot, used before the first commit.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tick: Tick::ZERO,
            entities: Vec::new(),
            values: HashMap::new(),
        }
    }

    /// Tick this snapshot was committed at.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Live entities, sorted.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// True if the entity was live at commit time.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.binary_search(&entity).is_ok()
    }

    /// Raw value.
    #[must_use]
    pub fn get(&self, entity: EntityId, property: P) -> Option<PropertyValue> {
        self.values.get(&(entity, property)).copied()
    }

    /// Integer value.
    #[must_use]
    pub fn int(&self, entity: EntityId, property: P) -> Option<i64> {
        self.get(entity, property).and_then(|v| v.as_int())
    }

    /// Float value.
    #[must_use]
    pub fn float(&self, entity: EntityId, property: P) -> Option<f32> {
        self.get(entity, property).and_then(|v| v.as_float())
    }

    /// Bool value.
    #[must_use]
    pub fn bool(&self, entity: EntityId, property: P) -> Option<bool> {
        self.get(entity, property).and_then(|v| v.as_bool())
    }

    /// Vector value.
    #[must_use]
    pub fn vec3(&self, entity: EntityId, property: P) -> Option<Vec3> {
        self.get(entity, property).and_then(|v| v.as_vec3())
    }
}
