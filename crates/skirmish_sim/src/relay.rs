//! # Tick-Aligned Event Relay
//!
//! Delivers small typed events to an entity's listeners whether or not the
//! raising peer has local reach to it.
//!
//! ```text
//!  raise(target, Local, e)  ──encode──> listeners (same call)
//!
//!  raise(target, Remote, e) ──encode──> RelayRing slot id % 10
//!                                         │  published with the tick
//!                                         ▼
//!                           RelayReceiver::drain  (presentation phase)
//!                             dispatches ids > last handled, once each
//! ```
//!
//! ## Payload contract
//!
//! Every event type has an explicit fixed layout ([`RelayEvent::encode`] /
//! [`RelayEvent::decode`], little endian, declared field order). Its size is
//! checked against [`RELAY_MAX_EVENT_SIZE`] when the type is registered and
//! again when an event is raised; an oversized type is a programming error
//! and panics.
//!
//! Type ids are assigned in registration order, so every peer must register
//! the same types in the same order.
//!
//! ## Overflow
//!
//! The ring keeps the last [`RELAY_MAX_EVENTS`] events. A receiver that falls
//! further behind loses the older ones; [`DrainReport::lost`] counts them.

use std::any::TypeId;
use std::collections::HashMap;

use skirmish_core::EntityId;
use skirmish_shared::constants::{RELAY_MAX_EVENTS, RELAY_MAX_EVENT_SIZE};
use skirmish_shared::Vec3;

/// A relayable event with a fixed byte layout.
pub trait RelayEvent: Sized + 'static {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Writes exactly [`Self::SIZE`] bytes into `out`.
    fn encode(&self, out: &mut [u8]);

    /// Reads an event back. `None` if the bytes are malformed.
    fn decode(bytes: &[u8]) -> Option<Self>;
}

/// How the raising peer reaches the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reach {
    /// The target's listeners live in this process.
    Local,
    /// The target is observed elsewhere; go through the ring.
    Remote,
}

/// Header of one queued event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayHeader {
    /// Sequence id, starting at 1.
    pub id: u64,
    /// Registration-order type id.
    pub type_id: u16,
    /// Target entity.
    pub target: EntityId,
}

/// Bounded history of remote events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayRing {
    headers: [Option<RelayHeader>; RELAY_MAX_EVENTS],
    payloads: [[u8; RELAY_MAX_EVENT_SIZE]; RELAY_MAX_EVENTS],
    last_id: u64,
}

impl Default for RelayRing {
    fn default() -> Self {
        Self {
            headers: [None; RELAY_MAX_EVENTS],
            payloads: [[0; RELAY_MAX_EVENT_SIZE]; RELAY_MAX_EVENTS],
            last_id: 0,
        }
    }
}

/// Ring position of sequence `id`.
#[allow(clippy::cast_possible_truncation)]
const fn ring_slot(id: u64) -> usize {
    (id % RELAY_MAX_EVENTS as u64) as usize
}

impl RelayRing {
    /// An empty ring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, type_id: u16, target: EntityId, payload: &[u8]) -> u64 {
        self.last_id += 1;
        let id = self.last_id;
        let slot = ring_slot(id);
        self.headers[slot] = Some(RelayHeader { id, type_id, target });
        let buf = &mut self.payloads[slot];
        buf.fill(0);
        buf[..payload.len()].copy_from_slice(payload);
        id
    }

    /// Highest id ever queued (0 if none).
    #[must_use]
    pub const fn last_id(&self) -> u64 {
        self.last_id
    }

    /// The event with sequence `id`, if it has not been overwritten.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<(RelayHeader, &[u8])> {
        let slot = ring_slot(id);
        let header = self.headers[slot]?;
        (header.id == id).then_some((header, &self.payloads[slot][..]))
    }

    /// Drops every queued event. Ids keep counting.
    pub fn clear(&mut self) {
        self.headers = [None; RELAY_MAX_EVENTS];
    }
}

type Listener = Box<dyn FnMut(EntityId, &[u8]) + Send>;

/// Type registry and listeners. Shared by both ends of the relay.
#[derive(Default)]
pub struct Dispatcher {
    types: HashMap<TypeId, u16>,
    listeners: Vec<Vec<Listener>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("types", &self.types.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `E` and returns its type id. Re-registering is a no-op.
    ///
    /// # Panics
    ///
    /// If `E::SIZE` exceeds [`RELAY_MAX_EVENT_SIZE`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn register_type<E: RelayEvent>(&mut self) -> u16 {
        assert!(
            E::SIZE <= RELAY_MAX_EVENT_SIZE,
            "relay payload of {} is {} bytes, limit is {RELAY_MAX_EVENT_SIZE}",
            std::any::type_name::<E>(),
            E::SIZE
        );
        if let Some(&id) = self.types.get(&TypeId::of::<E>()) {
            return id;
        }
        let id = self.listeners.len() as u16;
        self.types.insert(TypeId::of::<E>(), id);
        self.listeners.push(Vec::new());
        id
    }

    /// Adds a listener for `E`, registering the type if needed.
    pub fn listen<E, F>(&mut self, mut listener: F)
    where
        E: RelayEvent,
        F: FnMut(EntityId, &E) + Send + 'static,
    {
        let id = self.register_type::<E>();
        self.listeners[usize::from(id)].push(Box::new(move |target, bytes| {
            if let Some(event) = E::decode(bytes) {
                listener(target, &event);
            }
        }));
    }

    /// Type id of `E`, if registered.
    #[must_use]
    pub fn type_id_of<E: RelayEvent>(&self) -> Option<u16> {
        self.types.get(&TypeId::of::<E>()).copied()
    }

    fn dispatch(&mut self, type_id: u16, target: EntityId, bytes: &[u8]) -> bool {
        let Some(listeners) = self.listeners.get_mut(usize::from(type_id)) else {
            return false;
        };
        for listener in listeners.iter_mut() {
            listener(target, bytes);
        }
        true
    }

    fn clear_listeners(&mut self) {
        for listeners in &mut self.listeners {
            listeners.clear();
        }
    }
}

/// Raising end, held by the authority.
#[derive(Debug, Default)]
pub struct EventRelay {
    dispatcher: Dispatcher,
    ring: RelayRing,
}

impl EventRelay {
    /// An empty relay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Type registry and local listeners.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Raises `event` at `target`. Returns the ring id for remote events.
    ///
    /// # Panics
    ///
    /// If `E` was never registered or its encoded size exceeds
    /// [`RELAY_MAX_EVENT_SIZE`].
    pub fn raise<E: RelayEvent>(&mut self, target: EntityId, reach: Reach, event: &E) -> Option<u64> {
        assert!(
            E::SIZE <= RELAY_MAX_EVENT_SIZE,
            "relay payload of {} bytes exceeds {RELAY_MAX_EVENT_SIZE}",
            E::SIZE
        );
        let Some(type_id) = self.dispatcher.type_id_of::<E>() else {
            panic!("relay event {} was never registered", std::any::type_name::<E>());
        };
        let mut buf = [0u8; RELAY_MAX_EVENT_SIZE];
        event.encode(&mut buf[..E::SIZE]);

        match reach {
            Reach::Local => {
                self.dispatcher.dispatch(type_id, target, &buf[..E::SIZE]);
                None
            }
            Reach::Remote => Some(self.ring.push(type_id, target, &buf[..E::SIZE])),
        }
    }

    /// Queued remote events.
    #[must_use]
    pub const fn ring(&self) -> &RelayRing {
        &self.ring
    }

    /// Drops queued events and local listeners. Type ids survive so
    /// observers stay in step.
    pub fn clear(&mut self) {
        self.ring.clear();
        self.dispatcher.clear_listeners();
    }
}

/// Result of one [`RelayReceiver::drain`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Events dispatched.
    pub delivered: u64,
    /// Events overwritten before they could be read.
    pub lost: u64,
}

/// Receiving end, one per observer.
#[derive(Debug, Default)]
pub struct RelayReceiver {
    dispatcher: Dispatcher,
    last_handled: u64,
}

impl RelayReceiver {
    /// A receiver that has handled nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A receiver that has already handled everything up to `id`.
    #[must_use]
    pub fn starting_after(id: u64) -> Self {
        Self {
            last_handled: id,
            ..Self::default()
        }
    }

    /// Type registry and listeners.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Highest id handled so far.
    #[must_use]
    pub const fn last_handled(&self) -> u64 {
        self.last_handled
    }

    /// Dispatches every event newer than the last one handled, in id order.
    pub fn drain(&mut self, ring: &RelayRing) -> DrainReport {
        let latest = ring.last_id();
        if latest <= self.last_handled {
            return DrainReport::default();
        }
        let first = self.last_handled + 1;
        let oldest_kept = latest.saturating_sub(RELAY_MAX_EVENTS as u64 - 1).max(1);
        let mut report = DrainReport {
            delivered: 0,
            lost: oldest_kept.saturating_sub(first),
        };
        if report.lost > 0 {
            tracing::warn!(
                lost = report.lost,
                first,
                latest,
                "relay events overwritten before delivery"
            );
        }

        for id in first.max(oldest_kept)..=latest {
            match ring.get(id) {
                Some((header, bytes)) => {
                    if self.dispatcher.dispatch(header.type_id, header.target, bytes) {
                        report.delivered += 1;
                    }
                }
                None => report.lost += 1,
            }
        }
        self.last_handled = latest;
        report
    }
}

// =============================================================================
// SIMULATION EVENTS
// =============================================================================

/// Shown to an attacker when one of its hits lands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitMarker {
    /// Damage dealt.
    pub damage: f32,
    /// World-space contact point.
    pub point: Vec3,
    /// Critical hit.
    pub critical: bool,
    /// The hit killed the target.
    pub lethal: bool,
}

impl RelayEvent for HitMarker {
    const SIZE: usize = 18;

    fn encode(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.damage.to_le_bytes());
        out[4..8].copy_from_slice(&self.point.x.to_le_bytes());
        out[8..12].copy_from_slice(&self.point.y.to_le_bytes());
        out[12..16].copy_from_slice(&self.point.z.to_le_bytes());
        out[16] = u8::from(self.critical);
        out[17] = u8::from(self.lethal);
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let f = |at: usize| f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        Some(Self {
            damage: f(0),
            point: Vec3::new(f(4), f(8), f(12)),
            critical: bytes[16] != 0,
            lethal: bytes[17] != 0,
        })
    }
}

/// Registers every simulation event type, in wire order.
pub fn register_sim_events(dispatcher: &mut Dispatcher) {
    dispatcher.register_type::<HitMarker>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    impl RelayEvent for Ping {
        const SIZE: usize = 4;
        fn encode(&self, out: &mut [u8]) {
            out.copy_from_slice(&self.0.to_le_bytes());
        }
        fn decode(bytes: &[u8]) -> Option<Self> {
            Some(Self(u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?)))
        }
    }

    struct Huge;

    impl RelayEvent for Huge {
        const SIZE: usize = 64;
        fn encode(&self, _out: &mut [u8]) {}
        fn decode(_bytes: &[u8]) -> Option<Self> {
            Some(Self)
        }
    }

    fn target() -> EntityId {
        EntityId::new(4, 0)
    }

    fn collecting_receiver() -> (RelayReceiver, Arc<Mutex<Vec<u32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut rx = RelayReceiver::new();
        let sink = Arc::clone(&seen);
        rx.dispatcher_mut().listen::<Ping, _>(move |_, e| sink.lock().push(e.0));
        (rx, seen)
    }

    #[test]
    fn test_local_dispatch_is_synchronous() {
        let mut relay = EventRelay::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        relay
            .dispatcher_mut()
            .listen::<Ping, _>(move |t, e| sink.lock().push((t, e.0)));

        assert_eq!(relay.raise(target(), Reach::Local, &Ping(7)), None);
        assert_eq!(*seen.lock(), vec![(target(), 7)]);
        assert_eq!(relay.ring().last_id(), 0);
    }

    #[test]
    fn test_remote_delivered_once_in_order() {
        let mut relay = EventRelay::new();
        relay.dispatcher_mut().register_type::<Ping>();
        let (mut rx, seen) = collecting_receiver();

        for i in 1..=3 {
            relay.raise(target(), Reach::Remote, &Ping(i));
        }
        assert_eq!(rx.drain(relay.ring()), DrainReport { delivered: 3, lost: 0 });
        assert_eq!(rx.drain(relay.ring()), DrainReport::default());
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_overflow_loses_oldest() {
        let mut relay = EventRelay::new();
        relay.dispatcher_mut().register_type::<Ping>();
        let (mut rx, seen) = collecting_receiver();

        for i in 1..=15 {
            relay.raise(target(), Reach::Remote, &Ping(i));
        }
        let report = rx.drain(relay.ring());
        assert_eq!(report, DrainReport { delivered: 10, lost: 5 });
        assert_eq!(*seen.lock(), (6..=15).collect::<Vec<_>>());
        assert!(relay.ring().get(1).is_none());
    }

    #[test]
    #[should_panic(expected = "limit is 24")]
    fn test_oversized_type_rejected() {
        let mut d = Dispatcher::new();
        d.register_type::<Huge>();
    }

    #[test]
    #[should_panic(expected = "never registered")]
    fn test_unregistered_raise_panics() {
        let mut relay = EventRelay::new();
        relay.raise(target(), Reach::Remote, &Ping(1));
    }

    #[test]
    fn test_hit_marker_layout() {
        let marker = HitMarker {
            damage: 87.5,
            point: Vec3::new(1.0, 2.0, 3.0),
            critical: true,
            lethal: false,
        };
        let mut buf = [0u8; HitMarker::SIZE];
        marker.encode(&mut buf);
        assert_eq!(&buf[0..4], &87.5f32.to_le_bytes());
        assert_eq!(HitMarker::decode(&buf), Some(marker));
        assert_eq!(HitMarker::decode(&buf[..10]), None);
    }
}
