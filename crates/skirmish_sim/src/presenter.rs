//! # Presentation Phase
//!
//! Runs at display rate on every peer, the authority included. Reads the
//! latest published [`Frame`], turns counter increases and stage changes into
//! effect cues, drains the relay, and interpolates positions between the
//! last two ticks. Holds no write capability, so it cannot touch replicated
//! state even by accident.

use std::collections::HashMap;
use std::sync::Arc;

use skirmish_core::{EntityId, SnapshotReader, Tick};
use skirmish_shared::Vec3;

use crate::driver::Frame;
use crate::lifecycle::Stage;
use crate::props::{Prop, COUNTERS};
use crate::relay::{register_sim_events, Dispatcher, DrainReport, RelayReceiver};
use crate::session::Phase;

/// An effect to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// A counter went up by `delta` (fire, hit, jump, death...).
    Counter {
        /// Entity the counter belongs to.
        entity: EntityId,
        /// Which counter.
        prop: Prop,
        /// Increase since the last frame.
        delta: i64,
    },
    /// A lifecycle stage changed.
    Stage {
        /// Avatar.
        entity: EntityId,
        /// Previous stage.
        from: Stage,
        /// New stage.
        to: Stage,
    },
    /// The match phase changed.
    Phase {
        /// Previous phase.
        from: Phase,
        /// New phase.
        to: Phase,
    },
}

/// Output of one [`Presenter::frame`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PresentFrame {
    /// Tick the frame shows.
    pub tick: Tick,
    /// Effects to start this frame.
    pub cues: Vec<Cue>,
    /// Relay delivery this frame.
    pub relay: DrainReport,
}

/// One observer's presentation state.
pub struct Presenter {
    reader: SnapshotReader<Frame>,
    current: Option<Arc<Frame>>,
    previous: Option<Arc<Frame>>,
    counters: HashMap<(EntityId, Prop), i64>,
    stages: HashMap<EntityId, Stage>,
    phase: Option<Phase>,
    relay: RelayReceiver,
}

impl std::fmt::Debug for Presenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("tick", &self.current.as_ref().map(|c| c.snapshot.tick()))
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

impl Presenter {
    /// A presenter that starts from whatever is published now. Relay events
    /// already in the ring are not replayed.
    #[must_use]
    pub fn new(reader: SnapshotReader<Frame>) -> Self {
        let latest = reader.latest();
        let mut relay = RelayReceiver::starting_after(latest.relay.last_id());
        register_sim_events(relay.dispatcher_mut());
        Self {
            reader,
            current: None,
            previous: None,
            counters: HashMap::new(),
            stages: HashMap::new(),
            phase: None,
            relay,
        }
    }

    /// Relay listeners.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        self.relay.dispatcher_mut()
    }

    /// Reads the latest frame and reports what to play.
    pub fn frame(&mut self) -> PresentFrame {
        let latest = self.reader.latest();
        let tick = latest.snapshot.tick();
        let is_new = self
            .current
            .as_ref()
            .map_or(true, |c| !Arc::ptr_eq(c, &latest));

        let mut cues = Vec::new();
        if is_new {
            self.diff(&latest, &mut cues);
            self.previous = self.current.replace(Arc::clone(&latest));
        }
        let relay = self.relay.drain(&latest.relay);
        PresentFrame { tick, cues, relay }
    }

    fn diff(&mut self, frame: &Frame, cues: &mut Vec<Cue>) {
        let snapshot = &frame.snapshot;
        for &entity in snapshot.entities() {
            for prop in COUNTERS {
                let Some(value) = snapshot.int(entity, prop) else {
                    continue;
                };
                match self.counters.insert((entity, prop), value) {
                    Some(last) if value > last => cues.push(Cue::Counter {
                        entity,
                        prop,
                        delta: value - last,
                    }),
                    _ => {}
                }
            }
            if let Some(raw) = snapshot.int(entity, Prop::Stage) {
                let to = Stage::from_raw(raw);
                match self.stages.insert(entity, to) {
                    Some(from) if from != to => cues.push(Cue::Stage { entity, from, to }),
                    _ => {}
                }
            }
            if let Some(raw) = snapshot.int(entity, Prop::Phase) {
                let to = Phase::from_raw(raw);
                match self.phase.replace(to) {
                    Some(from) if from != to => cues.push(Cue::Phase { from, to }),
                    _ => {}
                }
            }
        }
        self.counters
            .retain(|(entity, _), _| snapshot.contains(*entity));
        self.stages.retain(|entity, _| snapshot.contains(*entity));
    }

    /// Position of `entity` blended between the last two ticks;
    /// `alpha` 0 is the older tick, 1 the newer.
    #[must_use]
    pub fn interpolated_position(&self, entity: EntityId, alpha: f32) -> Option<Vec3> {
        let current = self.current.as_ref()?.snapshot.vec3(entity, Prop::Position)?;
        let previous = self
            .previous
            .as_ref()
            .and_then(|p| p.snapshot.vec3(entity, Prop::Position))
            .unwrap_or(current);
        Some(previous.lerp(current, alpha.clamp(0.0, 1.0)))
    }

    /// Last counter value seen for `entity`.
    #[must_use]
    pub fn counter(&self, entity: EntityId, prop: Prop) -> Option<i64> {
        self.counters.get(&(entity, prop)).copied()
    }

    /// Last stage seen for `entity`.
    #[must_use]
    pub fn stage(&self, entity: EntityId) -> Option<Stage> {
        self.stages.get(&entity).copied()
    }
}
