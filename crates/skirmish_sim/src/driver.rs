//! # Simulation Driver
//!
//! Runs the decision phase on the authoritative peer, one fixed tick at a
//! time, and publishes the result for every presentation phase to read.
//!
//! ## Step order
//!
//! ```text
//! 1. drain remote invocations        (nothing mid-tick can change this tick)
//! 2. spawn avatars for unbound slots
//! 3. respawn placement + upkeep
//! 4. per-avatar decision, slot order  (a fault is logged, the rest still run)
//! 5. projectiles and area effects
//! 6. NPCs wander
//! 7. outcomes -> score, notifications, hit markers
//! 8. phase machine (transition, match timer)
//! 9. record hit volumes for lag compensation
//! 10. mirror into the replicated store, commit, publish
//! ```
//!
//! A failed mirror withholds the frame: observers keep the previous one.
//!
//! Only this type holds the [`WriteCapability`]. Observers get a
//! [`SnapshotReader`] and never see a half-applied tick.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use skirmish_core::{
    EntityId, Peer, PropertyValue, ReplicatedStore, SnapshotPublisher, SnapshotReader, StoreSnapshot, Tick,
    WriteCapability,
};
use skirmish_shared::{SimConfig, TickInput};

use crate::error::{SimError, SimResult};
use crate::ids::{ParticipantId, Slot};
use crate::input::{InputBuffer, InvocationQueue, Invoker};
use crate::notify::NotificationReceiver;
use crate::props::{EntityKind, Prop};
use crate::relay::RelayRing;
use crate::session::{LeaveOutcome, Session};
use crate::tick_loop::TickLoop;

/// Everything an observer needs for one tick: replicated state plus the
/// relay ring as of the same tick.
#[derive(Debug)]
pub struct Frame {
    /// Replicated property values.
    pub snapshot: Arc<StoreSnapshot<Prop>>,
    /// Remote relay events.
    pub relay: RelayRing,
}

impl Frame {
    fn empty() -> Self {
        Self {
            snapshot: Arc::new(StoreSnapshot::empty()),
            relay: RelayRing::new(),
        }
    }
}

/// What one [`Simulation::step`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Tick that was simulated.
    pub tick: Tick,
    /// Avatars that ran a decision step.
    pub decided: usize,
    /// Decision steps that failed and were skipped.
    pub faults: usize,
    /// A consistent frame was published for this tick.
    pub published: bool,
}

/// The authoritative decision loop.
pub struct Simulation {
    session: Session,
    store: ReplicatedStore<Prop>,
    cap: WriteCapability,
    publisher: SnapshotPublisher<Frame>,
    inputs: Vec<InputBuffer>,
    invocations: InvocationQueue,
    mirrored: HashMap<EntityId, EntityKind>,
    tick: Tick,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("holder", &self.cap.holder())
            .field("entities", &self.mirrored.len())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates the simulation on `host`.
    ///
    /// # Errors
    ///
    /// [`SimError::Config`] if `config` does not validate, or
    /// [`SimError::NotAuthority`] if `host` is an observer.
    pub fn new(config: SimConfig, host: Peer) -> SimResult<Self> {
        config.validate()?;
        let cap = host
            .write_capability()
            .ok_or(SimError::NotAuthority(host.id()))?;
        let capacity = config.session.capacity;
        Ok(Self {
            session: Session::new(config),
            store: ReplicatedStore::new(),
            cap,
            publisher: SnapshotPublisher::new(Frame::empty()),
            inputs: vec![InputBuffer::new(); capacity],
            invocations: InvocationQueue::new(),
            mirrored: HashMap::new(),
            tick: Tick::ZERO,
        })
    }

    // =========================================================================
    // BOUNDARY
    // =========================================================================

    /// Registers `participant`.
    ///
    /// # Errors
    ///
    /// See [`Session::join`].
    pub fn join(&mut self, participant: ParticipantId, token: impl Into<String>) -> SimResult<Slot> {
        let slot = self.session.join(participant, token)?;
        if let Some(buffer) = self.inputs.get_mut(slot.index()) {
            buffer.clear();
        }
        Ok(slot)
    }

    /// Removes `participant`. A closing session is published empty at once.
    ///
    /// # Errors
    ///
    /// See [`Session::leave`].
    pub fn leave(&mut self, participant: ParticipantId) -> SimResult<LeaveOutcome> {
        let slot = self.session.slot_of(participant);
        let outcome = self.session.leave(participant)?;
        if let Some(buffer) = slot.and_then(|s| self.inputs.get_mut(s.index())) {
            buffer.clear();
        }
        if outcome == LeaveOutcome::SessionClosed {
            self.store.clear(&self.cap);
            self.mirrored.clear();
            for buffer in &mut self.inputs {
                buffer.clear();
            }
            self.publish();
        }
        Ok(outcome)
    }

    /// Buffers one tick of input from `participant`.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownParticipant`].
    pub fn submit_input(&mut self, participant: ParticipantId, input: TickInput) -> SimResult<()> {
        let slot = self
            .session
            .slot_of(participant)
            .ok_or(SimError::UnknownParticipant(participant))?;
        if let Some(buffer) = self.inputs.get_mut(slot.index()) {
            buffer.push(input);
        }
        Ok(())
    }

    /// Records `participant`'s round trip in ticks.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownParticipant`].
    pub fn set_latency(&mut self, participant: ParticipantId, ticks: u32) -> SimResult<()> {
        let slot = self
            .session
            .slot_of(participant)
            .ok_or(SimError::UnknownParticipant(participant))?;
        self.session.world_mut().set_latency(slot, ticks);
        Ok(())
    }

    /// Handle for remote invocations.
    #[must_use]
    pub fn invoker(&self) -> Invoker {
        self.invocations.invoker()
    }

    /// Subscribes to session notifications.
    pub fn subscribe(&mut self) -> NotificationReceiver {
        self.session.subscribe()
    }

    /// Read handle for presentation phases.
    #[must_use]
    pub fn reader(&self) -> SnapshotReader<Frame> {
        self.publisher.reader()
    }

    /// The session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable session, for level setup between ticks.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Next tick to simulate.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    // =========================================================================
    // DECISION PHASE
    // =========================================================================

    /// Simulates one tick and publishes it.
    pub fn step(&mut self) -> StepReport {
        let now = self.tick;
        let mut report = StepReport {
            tick: now,
            ..StepReport::default()
        };
        if self.session.is_closed() {
            return report;
        }

        for invocation in self.invocations.drain() {
            self.session.apply_invocation(invocation, now);
        }
        self.session.spawn_avatars_for_unbound_slots(now);
        self.session.world_mut().upkeep(now);

        for slot in self.session.slots() {
            let Some(input) = self
                .inputs
                .get(slot.index())
                .and_then(|b| b.for_tick(now.0))
                .copied()
            else {
                continue;
            };
            report.decided += 1;
            if let Err(error) = self.session.decide(slot, &input, now) {
                report.faults += 1;
                tracing::warn!(%slot, %error, tick = now.0, "decision step failed");
            }
        }

        self.session.world_mut().step_projectiles(now);
        self.session.world_mut().step_npcs();
        self.session.apply_outcomes();
        self.session.update_phase(now);
        self.session.world_mut().record_history(now);

        match self.mirror(now) {
            Ok(()) => {
                self.publish();
                report.published = true;
            }
            Err(error) => {
                // Observers keep the last good frame; the next tick rebuilds the store
                tracing::warn!(%error, tick = now.0, "replication mirror failed, frame withheld");
                self.store.clear(&self.cap);
                self.mirrored.clear();
            }
        }
        self.tick = now.next();
        report
    }

    /// Steps at the configured rate until `ticks` more ticks have run.
    pub fn run(&mut self, pacer: &mut TickLoop, ticks: u64) {
        let target = pacer.tick_count() + ticks;
        while pacer.tick_count() < target && !self.session.is_closed() {
            while pacer.should_tick() && pacer.tick_count() < target {
                let start = pacer.begin_tick();
                self.step();
                pacer.end_tick(start);
            }
            pacer.wait_for_next_tick();
        }
    }

    fn publish(&mut self) {
        let snapshot = self.store.commit(&self.cap, self.tick);
        let frame = Frame {
            snapshot,
            relay: self.session.relay().ring().clone(),
        };
        self.publisher.publish(&self.cap, Arc::new(frame));
    }

    fn mirror(&mut self, now: Tick) -> SimResult<()> {
        let rows = collect_rows(&self.session, now);
        let live: HashSet<EntityId> = rows.iter().map(|row| row.entity).collect();

        let stale: Vec<EntityId> = self
            .mirrored
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for id in stale {
            self.store.despawn(&self.cap, id)?;
            self.mirrored.remove(&id);
        }

        for row in &rows {
            if !self.mirrored.contains_key(&row.entity) {
                self.store.spawn(&self.cap, row.entity);
                for (prop, initial) in row.kind.declarations() {
                    self.store.declare(&self.cap, row.entity, prop, initial)?;
                }
                self.mirrored.insert(row.entity, row.kind);
            }
            for &(prop, value) in &row.values {
                self.store.write(&self.cap, row.entity, prop, value)?;
            }
        }
        Ok(())
    }
}

struct Row {
    entity: EntityId,
    kind: EntityKind,
    values: Vec<(Prop, PropertyValue)>,
}

fn collect_rows(session: &Session, now: Tick) -> Vec<Row> {
    use PropertyValue::{Bool, Float, Int};

    let world = session.world();
    let mut rows = Vec::new();

    let score = session.score();
    let remaining = session
        .timer()
        .remaining_secs(now, session.rate())
        .unwrap_or(0.0);
    rows.push(Row {
        entity: session.entity(),
        kind: EntityKind::Session,
        values: vec![
            (Prop::Phase, Int(session.phase().to_raw())),
            (Prop::AttackersPoints, Float(score.attackers)),
            (Prop::DefendersPoints, Float(score.defenders)),
            (Prop::RemainingSecs, Float(remaining)),
            (Prop::Winner, Int(i64::from(session.winner().to_raw()))),
        ],
    });

    for avatar in world.avatars() {
        let binding = avatar.binding();
        let primary = avatar.loadout().primary.resource();
        let secondary = avatar.loadout().secondary.resource();
        let health = avatar.health();
        rows.push(Row {
            entity: avatar.id(),
            kind: EntityKind::Avatar,
            values: vec![
                (Prop::Stage, Int(avatar.lifecycle().stage().to_raw())),
                (Prop::Slot, Int(i64::from(binding.slot.0))),
                (Prop::Side, Int(i64::from(binding.side.to_raw()))),
                (Prop::Character, Int(i64::from(binding.character as u8))),
                (Prop::Ready, Bool(avatar.is_ready())),
                (Prop::Rank, Int(i64::from(binding.profile.rank))),
                (Prop::RankXp, Int(i64::from(binding.profile.rank_xp))),
                (Prop::Balance, Int(binding.profile.balance)),
                (Prop::PrimaryClip, Int(i64::from(primary.clip()))),
                (Prop::PrimaryReserve, Int(i64::from(primary.reserve()))),
                (Prop::PrimaryReloading, Bool(primary.is_reloading())),
                (Prop::PrimaryCount, Int(i64::from(primary.executions()))),
                (Prop::PrimaryProgress, Float(primary.progress(now))),
                (Prop::SecondaryCount, Int(i64::from(secondary.executions()))),
                (Prop::SecondaryProgress, Float(secondary.progress(now))),
                (Prop::Combo, Int(i64::from(avatar.loadout().primary.combo()))),
                (Prop::JumpCount, Int(i64::from(avatar.jumps()))),
                (Prop::Position, PropertyValue::Vec3(avatar.position())),
                (Prop::Health, Float(health.current())),
                (Prop::HitCount, Int(i64::from(health.hit_count()))),
                (Prop::CriticalCount, Int(i64::from(health.critical_count()))),
                (Prop::DeathCount, Int(i64::from(avatar.lifecycle().deaths()))),
            ],
        });
    }

    for npc in world.npcs() {
        let health = npc.health();
        rows.push(Row {
            entity: npc.id(),
            kind: EntityKind::Npc,
            values: vec![
                (Prop::Position, PropertyValue::Vec3(npc.position())),
                (Prop::Health, Float(health.current())),
                (Prop::HitCount, Int(i64::from(health.hit_count()))),
                (Prop::CriticalCount, Int(i64::from(health.critical_count()))),
                (Prop::DeathCount, Int(i64::from(npc.deaths()))),
                (Prop::JumpCount, Int(i64::from(npc.jumps()))),
            ],
        });
    }

    for object in world.destroyables() {
        rows.push(Row {
            entity: object.id,
            kind: EntityKind::Destroyable,
            values: vec![
                (Prop::Position, PropertyValue::Vec3(object.position)),
                (Prop::Health, Float(object.health())),
                (Prop::Destroyed, Bool(object.is_destroyed())),
            ],
        });
    }
    rows
}
