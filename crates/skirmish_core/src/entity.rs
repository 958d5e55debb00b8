//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into per-entity tables
//! - A generation counter for safe reuse
//!
//! A despawned index is recycled with a bumped generation, so a stale id held
//! by an in-flight projectile or relay event can never alias the newcomer.

/// Unique identifier for an entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index into per-entity tables
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity ID from index and generation.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw 64-bit value, as carried in relay headers.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Rebuilds an id from [`EntityId::to_bits`].
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Hands out entity ids and recycles freed indices.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current generation per index.
    generations: Vec<u32>,
    /// Liveness per index.
    alive: Vec<bool>,
    /// Freed indices ready for reuse.
    free: Vec<u32>,
}

impl EntityAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh id, reusing a freed index when one is available.
    #[allow(clippy::cast_possible_truncation)]
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return EntityId::new(index, self.generations[slot]);
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        EntityId::new(index, 0)
    }

    /// Frees an id. Returns false if it was already stale.
    pub fn free(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let slot = id.index() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(id.index());
        true
    }

    /// Returns true if `id` refers to a live entity.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        let slot = id.index() as usize;
        !id.is_null()
            && slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == id.generation()
    }

    /// Number of live entities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    /// Frees everything.
    pub fn clear(&mut self) {
        self.generations.clear();
        self.alive.clear();
        self.free.clear();
    }
}
