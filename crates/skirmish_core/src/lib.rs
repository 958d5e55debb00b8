//! # SKIRMISH Core
//!
//! The replicated-state engine underneath the match simulation:
//! - Generational entity identifiers
//! - Tick arithmetic and tick-quantized timers
//! - A single-writer property store guarded by a write capability
//! - Atomic snapshot publication for observers
//!
//! ## Architecture Rules
//!
//! 1. **One writer per entity** - Only the owning authoritative peer may write
//! 2. **Ticks, not frames** - Every timer is expressed in simulation ticks
//! 3. **Whole snapshots only** - Observers never see a half-applied tick
//!
//! ## Example
//!
//! ```rust
//! use skirmish_core::{EntityAllocator, Peer, PropertyValue, ReplicatedStore, Tick};
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum Prop { Health }
//!
//! let host = Peer::authority(0);
//! let cap = host.write_capability().unwrap();
//! let mut entities = EntityAllocator::new();
//! let mut store = ReplicatedStore::new();
//!
//! let avatar = entities.allocate();
//! store.spawn(&cap, avatar);
//! store.declare(&cap, avatar, Prop::Health, PropertyValue::Float(100.0)).unwrap();
//! store.write(&cap, avatar, Prop::Health, PropertyValue::Float(90.0)).unwrap();
//!
//! let snapshot = store.commit(&cap, Tick(1));
//! assert_eq!(snapshot.float(avatar, Prop::Health), Some(90.0));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod authority;
pub mod entity;
pub mod error;
pub mod replication;
pub mod sync;
pub mod tick;

pub use authority::{Peer, PeerId, PeerRole, WriteCapability};
pub use entity::{EntityAllocator, EntityId};
pub use error::{CoreError, CoreResult};
pub use replication::{PropertyValue, ReplicatedStore, StoreSnapshot};
pub use sync::{SnapshotPublisher, SnapshotReader};
pub use tick::{Tick, TickRate, TickTimer};
