//! # Snapshot Publication
//!
//! The authority builds tick N while observers render tick N-1.
//!
//! ```text
//! Tick N:
//!   Authority mutates the store
//!   Observers read the last published snapshot
//!
//! End of tick N:
//!   publish (pointer swap under a short write lock)
//!   Observers pick up snapshot N on their next read
//! ```
//!
//! Readers clone an `Arc`, so a reader never blocks the authority for longer
//! than that clone and can never observe a half-applied tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::authority::WriteCapability;

struct Slot<T> {
    current: RwLock<Arc<T>>,
    generation: AtomicU64,
}

/// Authority-side handle that swaps in new snapshots.
pub struct SnapshotPublisher<T> {
    slot: Arc<Slot<T>>,
}

impl<T> SnapshotPublisher<T> {
    /// Creates a publisher seeded with `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            slot: Arc::new(Slot {
                current: RwLock::new(Arc::new(initial)),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Replaces the published snapshot.
    pub fn publish(&self, _cap: &WriteCapability, snapshot: Arc<T>) {
        *self.slot.current.write() = snapshot;
        self.slot.generation.fetch_add(1, Ordering::Release);
    }

    /// A new read handle.
    #[must_use]
    pub fn reader(&self) -> SnapshotReader<T> {
        SnapshotReader {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Number of snapshots published so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.slot.generation.load(Ordering::Acquire)
    }
}

/// Observer-side handle. Cheap to clone.
pub struct SnapshotReader<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for SnapshotReader<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> SnapshotReader<T> {
    /// The most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> Arc<T> {
        Arc::clone(&self.slot.current.read())
    }

    /// Number of snapshots published so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.slot.generation.load(Ordering::Acquire)
    }
}
