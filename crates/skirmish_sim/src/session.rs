//! # Session Registry
//!
//! The match-wide singleton. Owns the participant table, the match phase, the
//! score and the match timer, plus the [`World`] those participants play in.
//!
//! ## Slot assignment
//!
//! ```text
//! join  -> lowest free slot < capacity (or CapacityExceeded)
//! leave -> slot freed; reusable by the next joiner
//!          population == 1 afterwards -> teardown, SessionClosed
//! ```
//!
//! A slot never changes while its holder stays connected.
//!
//! ## Phases
//!
//! ```text
//!   Lobby ──all ready──> Level ──timer──> Endgame
//!     │                    ▲
//!     └──load_level──> Transition ──done──┘
//! ```

use skirmish_core::{EntityId, Tick, TickRate, TickTimer};
use skirmish_shared::constants::MIN_READY_POPULATION;
use skirmish_shared::{Character, ScoringConfig, Side, SimConfig, TickInput};

use crate::avatar::{Avatar, Binding, Intent};
use crate::error::{SimError, SimResult};
use crate::ids::{ParticipantId, Slot};
use crate::input::Invocation;
use crate::notify::{Notification, NotificationReceiver, Notifier};
use crate::progression::Profile;
use crate::relay::{register_sim_events, EventRelay, HitMarker, Reach};
use crate::transition::{Transition, TransitionStep};
use crate::world::{Outcome, Victim, World};

/// A running level transition and who it teleports out.
#[derive(Debug)]
struct PendingTransition {
    sequence: Transition,
    target: Phase,
    /// Avatars present when the transition started, in teleport order.
    roster: Vec<EntityId>,
}

/// Match phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Picking characters and readying up.
    #[default]
    Lobby = 0,
    /// Match running.
    Level = 1,
    /// Moving everyone to a new level.
    Transition = 2,
    /// Timer ran out; results shown.
    Endgame = 3,
}

impl Phase {
    /// Replicated representation.
    #[must_use]
    pub const fn to_raw(self) -> i64 {
        self as i64
    }

    /// Inverse of [`Phase::to_raw`]. Unknown values read as `Lobby`.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Self::Level,
            2 => Self::Transition,
            3 => Self::Endgame,
            _ => Self::Lobby,
        }
    }
}

/// Result of [`Session::leave`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The slot was freed; the match goes on.
    Left,
    /// Only one participant remained, so the session was torn down.
    SessionClosed,
}

/// Points per side.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Score {
    /// Attackers' points.
    pub attackers: f32,
    /// Defenders' points.
    pub defenders: f32,
}

impl Score {
    /// Adds `points` to `side`. `Side::None` earns nothing.
    pub fn award(&mut self, side: Side, points: f32) {
        match side {
            Side::Attackers => self.attackers += points,
            Side::Defenders => self.defenders += points,
            Side::None => {}
        }
    }

    /// Points of `side`.
    #[must_use]
    pub fn points(&self, side: Side) -> f32 {
        match side {
            Side::Attackers => self.attackers,
            Side::Defenders => self.defenders,
            Side::None => 0.0,
        }
    }
}

#[derive(Clone, Debug)]
struct Participant {
    binding: Binding,
    avatar: Option<EntityId>,
    local: bool,
}

/// The match.
#[derive(Debug)]
pub struct Session {
    config: SimConfig,
    rate: TickRate,
    entity: EntityId,
    participants: Vec<Option<Participant>>,
    phase: Phase,
    score: Score,
    timer: TickTimer,
    transition: Option<PendingTransition>,
    winner: Side,
    world: World,
    notifier: Notifier,
    relay: EventRelay,
    closed: bool,
}

impl Session {
    /// A fresh session in the Lobby.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let rate = TickRate::new(config.tick.rate);
        let mut world = World::new(&config, rate);
        let entity = world.allocate();
        let mut relay = EventRelay::new();
        register_sim_events(relay.dispatcher_mut());
        tracing::info!(capacity = config.session.capacity, "session created");
        Self {
            participants: vec![None; config.session.capacity],
            config,
            rate,
            entity,
            phase: Phase::Lobby,
            score: Score::default(),
            timer: TickTimer::NONE,
            transition: None,
            winner: Side::None,
            world,
            notifier: Notifier::new(),
            relay,
            closed: false,
        }
    }

    // =========================================================================
    // REGISTRY
    // =========================================================================

    /// Assigns `participant` the lowest free slot.
    ///
    /// # Errors
    ///
    /// [`SimError::SessionClosed`], [`SimError::AlreadyJoined`] or
    /// [`SimError::CapacityExceeded`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn join(&mut self, participant: ParticipantId, token: impl Into<String>) -> SimResult<Slot> {
        if self.closed {
            return Err(SimError::SessionClosed);
        }
        if self.slot_of(participant).is_some() {
            return Err(SimError::AlreadyJoined(participant));
        }
        let index = self
            .participants
            .iter()
            .position(Option::is_none)
            .ok_or(SimError::CapacityExceeded {
                capacity: self.config.session.capacity,
            })?;
        let slot = Slot(index as u8);
        let character = Character::default();
        self.participants[index] = Some(Participant {
            binding: Binding {
                participant,
                slot,
                side: character.side(),
                character,
                profile: Profile::new(token),
            },
            avatar: None,
            local: false,
        });
        tracing::info!(%participant, %slot, "participant joined");
        Ok(slot)
    }

    /// Frees `participant`'s slot, tearing the session down if only one
    /// participant remains.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownParticipant`].
    pub fn leave(&mut self, participant: ParticipantId) -> SimResult<LeaveOutcome> {
        let slot = self
            .slot_of(participant)
            .ok_or(SimError::UnknownParticipant(participant))?;
        self.world.despawn_avatar(slot);
        self.world.release_spawn_points(participant);
        self.world.clear_latency(slot);
        self.participants[slot.index()] = None;
        tracing::info!(%participant, %slot, "participant left");

        if self.population() == 1 {
            self.teardown();
            return Ok(LeaveOutcome::SessionClosed);
        }
        Ok(LeaveOutcome::Left)
    }

    /// Marks `participant` as living on this process, so its hit markers
    /// dispatch synchronously instead of through the ring.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownParticipant`].
    pub fn set_local(&mut self, participant: ParticipantId, local: bool) -> SimResult<()> {
        let slot = self
            .slot_of(participant)
            .ok_or(SimError::UnknownParticipant(participant))?;
        if let Some(p) = self.participants[slot.index()].as_mut() {
            p.local = local;
        }
        Ok(())
    }

    /// Slot held by `participant`.
    #[must_use]
    pub fn slot_of(&self, participant: ParticipantId) -> Option<Slot> {
        self.participants
            .iter()
            .flatten()
            .find(|p| p.binding.participant == participant)
            .map(|p| p.binding.slot)
    }

    /// Participant in `slot`.
    #[must_use]
    pub fn participant_at(&self, slot: Slot) -> Option<ParticipantId> {
        self.participants
            .get(slot.index())?
            .as_ref()
            .map(|p| p.binding.participant)
    }

    /// Connected participants.
    #[must_use]
    pub fn population(&self) -> usize {
        self.participants.iter().flatten().count()
    }

    /// Occupied slots in order.
    #[must_use]
    pub fn slots(&self) -> Vec<Slot> {
        self.participants
            .iter()
            .flatten()
            .map(|p| p.binding.slot)
            .collect()
    }

    /// Binding of `participant` as the avatar carries it.
    #[must_use]
    pub fn binding(&self, participant: ParticipantId) -> Option<&Binding> {
        let slot = self.slot_of(participant)?;
        self.participants[slot.index()].as_ref().map(|p| &p.binding)
    }

    /// Avatar bound to `participant`.
    #[must_use]
    pub fn avatar_of(&self, participant: ParticipantId) -> Option<EntityId> {
        let slot = self.slot_of(participant)?;
        self.participants[slot.index()].as_ref()?.avatar
    }

    /// Creates avatars for participants without one. Skipped while a match
    /// is running or finished.
    pub fn spawn_avatars_for_unbound_slots(&mut self, now: Tick) {
        if matches!(self.phase, Phase::Level | Phase::Endgame) {
            return;
        }
        for p in self.participants.iter_mut().flatten() {
            if p.avatar.is_none() {
                p.avatar = Some(self.world.spawn_avatar(p.binding.clone(), now));
            }
        }
    }

    /// Destroys `participant`'s avatar and spawns a replacement from the
    /// current binding. Identity, slot, side, character and progression
    /// carry over; action timers start fresh.
    ///
    /// # Errors
    ///
    /// [`SimError::SessionClosed`] or [`SimError::UnknownParticipant`].
    pub fn rebind(&mut self, participant: ParticipantId, now: Tick) -> SimResult<EntityId> {
        if self.closed {
            return Err(SimError::SessionClosed);
        }
        let slot = self
            .slot_of(participant)
            .ok_or(SimError::UnknownParticipant(participant))?;
        self.rebind_slot(slot, now)
            .ok_or(SimError::UnknownParticipant(participant))
    }

    fn rebind_slot(&mut self, slot: Slot, now: Tick) -> Option<EntityId> {
        let p = self.participants.get_mut(slot.index())?.as_mut()?;
        let id = self.world.spawn_avatar(p.binding.clone(), now);
        tracing::debug!(%slot, entity = %id, character = ?p.binding.character, "avatar rebound");
        p.avatar = Some(id);
        Some(id)
    }

    fn rebind_all(&mut self, now: Tick) {
        for slot in self.slots() {
            self.rebind_slot(slot, now);
        }
    }

    // =========================================================================
    // LOBBY
    // =========================================================================

    /// Flips `participant`'s readiness. Ignored outside the Lobby, below two
    /// participants, or with unbalanced sides. Starts the level once every
    /// avatar is ready.
    pub fn toggle_ready(&mut self, participant: ParticipantId, now: Tick) -> bool {
        if self.phase != Phase::Lobby || !self.readiness_allowed() {
            tracing::debug!(%participant, "readiness ignored");
            return false;
        }
        let Some(slot) = self.slot_of(participant) else {
            return false;
        };
        let Some(avatar) = self.world.avatar_mut(slot) else {
            return false;
        };
        avatar.set_ready(!avatar.is_ready());

        let all_ready = self.participants.iter().flatten().all(|p| {
            self.world
                .avatar(p.binding.slot)
                .is_some_and(crate::avatar::Avatar::is_ready)
        });
        if all_ready {
            self.start_level(now);
        }
        true
    }

    fn readiness_allowed(&self) -> bool {
        let (attackers, defenders) = self.side_counts();
        attackers + defenders >= MIN_READY_POPULATION && attackers == defenders
    }

    /// Participants per side: (attackers, defenders).
    #[must_use]
    pub fn side_counts(&self) -> (usize, usize) {
        self.participants
            .iter()
            .flatten()
            .fold((0, 0), |(a, d), p| match p.binding.side {
                Side::Attackers => (a + 1, d),
                Side::Defenders => (a, d + 1),
                Side::None => (a, d),
            })
    }

    /// Changes `participant`'s character and side, then rebinds. Lobby only.
    pub fn switch_character(&mut self, participant: ParticipantId, character: Character, now: Tick) -> bool {
        if self.phase != Phase::Lobby {
            return false;
        }
        let Some(slot) = self.slot_of(participant) else {
            return false;
        };
        if let Some(p) = self.participants[slot.index()].as_mut() {
            p.binding.character = character;
            p.binding.side = character.side();
        }
        self.rebind_slot(slot, now).is_some()
    }

    /// Installs progression fetched by the account service.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownParticipant`].
    pub fn apply_profile(&mut self, participant: ParticipantId, profile: Profile) -> SimResult<()> {
        let slot = self
            .slot_of(participant)
            .ok_or(SimError::UnknownParticipant(participant))?;
        if let Some(avatar) = self.world.avatar_mut(slot) {
            *avatar.profile_mut() = profile.clone();
        }
        if let Some(p) = self.participants[slot.index()].as_mut() {
            p.binding.profile = profile;
        }
        Ok(())
    }

    /// Applies a queued invocation.
    pub fn apply_invocation(&mut self, invocation: Invocation, now: Tick) {
        match invocation {
            Invocation::ApplyProfile { participant, profile } => {
                if let Err(error) = self.apply_profile(participant, profile) {
                    tracing::warn!(%participant, %error, "profile not applied");
                }
            }
            Invocation::SwitchCharacter {
                participant,
                character,
            } => {
                self.switch_character(participant, character, now);
            }
            Invocation::ToggleReady { participant } => {
                self.toggle_ready(participant, now);
            }
        }
    }

    // =========================================================================
    // DECISION PHASE
    // =========================================================================

    /// Runs the decision step for the avatar in `slot`.
    ///
    /// # Errors
    ///
    /// Whatever the avatar's step reported; the caller isolates it.
    pub fn decide(&mut self, slot: Slot, input: &TickInput, now: Tick) -> SimResult<()> {
        let in_lobby = self.phase == Phase::Lobby;
        let intents = self.world.decide(slot, input, now, in_lobby)?;
        let Some(participant) = self.participant_at(slot) else {
            return Ok(());
        };
        for intent in intents {
            match intent {
                Intent::ToggleReady => {
                    self.toggle_ready(participant, now);
                }
                Intent::SwitchCharacter => {
                    let next = self
                        .binding(participant)
                        .map_or(Character::default(), |b| b.character.next());
                    self.switch_character(participant, next, now);
                }
                Intent::Execute { .. } | Intent::Revive { .. } => {}
            }
        }
        Ok(())
    }

    fn start_level(&mut self, now: Tick) {
        self.phase = Phase::Level;
        self.score = Score::default();
        self.winner = Side::None;
        self.rebind_all(now);
        self.world.spawn_npcs(self.config.session.npc_count);
        self.timer = TickTimer::from_secs(now, self.rate, self.config.session.match_duration_secs);
        tracing::info!(%now, population = self.population(), "level started");
    }

    /// Starts the level transition. Once it finishes the session enters
    /// `target`; a Level target starts a fresh match.
    pub fn load_level(&mut self, target: Phase, now: Tick) {
        let roster: Vec<EntityId> = self.world.avatars().map(Avatar::id).collect();
        self.transition = Some(PendingTransition {
            sequence: Transition::start(now, roster.len(), &self.config.transition, self.rate),
            target,
            roster,
        });
        self.phase = Phase::Transition;
        tracing::info!(%now, ?target, "level transition started");
    }

    /// Advances the transition and the match timer.
    pub fn update_phase(&mut self, now: Tick) {
        if let Some(pending) = self.transition.as_mut() {
            match pending.sequence.poll(now) {
                TransitionStep::Wait => {}
                TransitionStep::TeleportOut(index) => {
                    // Avatars that left or were rebound since the start are skipped
                    let avatar = pending
                        .roster
                        .get(index)
                        .and_then(|&id| self.world.avatar_by_id_mut(id));
                    if let Some(avatar) = avatar {
                        avatar.lifecycle_mut().teleport_out();
                    }
                }
                TransitionStep::Finished => {
                    let target = pending.target;
                    self.transition = None;
                    self.world.release_all_spawn_points();
                    for avatar in self.world.avatars_mut() {
                        avatar.lifecycle_mut().schedule_respawn(now, 0);
                    }
                    tracing::info!(%now, ?target, "level transition finished");
                    if target == Phase::Level {
                        self.start_level(now);
                    } else {
                        self.phase = target;
                    }
                }
            }
        }

        if self.phase != Phase::Endgame && self.timer.expired(now) {
            self.end_match(now);
        }
    }

    fn end_match(&mut self, now: Tick) {
        self.phase = Phase::Endgame;
        self.timer.reset();
        self.winner = if self.score.attackers >= self.score.defenders {
            Side::Attackers
        } else {
            Side::Defenders
        };
        let winner = self.winner;
        for p in self.participants.iter_mut().flatten() {
            p.binding
                .profile
                .apply_result(p.binding.side == winner, &self.config.progression);
        }
        self.rebind_all(now);
        self.notifier.publish(&Notification::GameEnded { winner });
        tracing::info!(
            %now,
            ?winner,
            attackers = self.score.attackers,
            defenders = self.score.defenders,
            "match ended"
        );
    }

    /// Applies the world's queued outcomes: score, notifications and hit
    /// markers.
    pub fn apply_outcomes(&mut self) {
        let scoring = self.config.scoring.clone();
        for outcome in self.world.take_outcomes() {
            match outcome {
                Outcome::Hit {
                    attacker: Some(slot),
                    damage,
                    point,
                    critical,
                    lethal,
                    ..
                } => self.raise_hit_marker(slot, HitMarker {
                    damage,
                    point,
                    critical,
                    lethal,
                }),
                Outcome::Hit { attacker: None, .. } => {}
                Outcome::Killed { killer, victim, kind } => {
                    let (side, points) = award_for_kill(&scoring, kind);
                    self.score.award(side, points);
                    self.notifier
                        .publish(&Notification::KillConfirmed { killer, victim });
                }
                Outcome::Revived { .. } => self.score.award(Side::Defenders, scoring.npc_revive),
                Outcome::Destroyed { .. } => {
                    self.score.award(Side::Attackers, scoring.destroyable_destroyed);
                }
            }
        }
    }

    fn raise_hit_marker(&mut self, slot: Slot, marker: HitMarker) {
        let Some(p) = self.participants.get(slot.index()).and_then(Option::as_ref) else {
            return;
        };
        let Some(target) = p.avatar else {
            return;
        };
        let reach = if p.local { Reach::Local } else { Reach::Remote };
        self.relay.raise(target, reach, &marker);
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Releases everything the session owns. Irreversible.
    pub fn teardown(&mut self) {
        for p in &mut self.participants {
            *p = None;
        }
        self.world.clear();
        self.timer.reset();
        self.transition = None;
        self.notifier.close();
        self.relay.clear();
        self.phase = Phase::Lobby;
        self.closed = true;
        tracing::info!("session torn down");
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Subscribes to kill and match-end notifications.
    pub fn subscribe(&mut self) -> NotificationReceiver {
        self.notifier.subscribe()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Score so far.
    #[must_use]
    pub const fn score(&self) -> Score {
        self.score
    }

    /// Winner of the last match, `Side::None` before one ended.
    #[must_use]
    pub const fn winner(&self) -> Side {
        self.winner
    }

    /// Match timer.
    #[must_use]
    pub const fn timer(&self) -> TickTimer {
        self.timer
    }

    /// True once torn down.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// The session's own replicated entity.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Tick rate.
    #[must_use]
    pub const fn rate(&self) -> TickRate {
        self.rate
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Event relay.
    #[must_use]
    pub const fn relay(&self) -> &EventRelay {
        &self.relay
    }

    /// Mutable event relay, for local listeners.
    pub fn relay_mut(&mut self) -> &mut EventRelay {
        &mut self.relay
    }
}

fn award_for_kill(scoring: &ScoringConfig, victim: Victim) -> (Side, f32) {
    match victim {
        Victim::Avatar(Side::Attackers) => (Side::Defenders, scoring.attacker_death),
        Victim::Avatar(Side::Defenders) => (Side::Attackers, scoring.defender_death),
        Victim::Avatar(Side::None) => (Side::None, 0.0),
        Victim::Npc => (Side::Attackers, scoring.npc_death),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Stage;

    fn session() -> Session {
        Session::new(SimConfig::default())
    }

    #[test]
    fn test_lowest_free_slot() {
        let mut s = session();
        assert_eq!(s.join(ParticipantId(1), "a").unwrap(), Slot(0));
        assert_eq!(s.join(ParticipantId(2), "b").unwrap(), Slot(1));
        assert_eq!(s.join(ParticipantId(3), "c").unwrap(), Slot(2));
        assert_eq!(s.leave(ParticipantId(2)).unwrap(), LeaveOutcome::Left);
        assert_eq!(s.join(ParticipantId(4), "d").unwrap(), Slot(1));
        assert!(matches!(
            s.join(ParticipantId(4), "d"),
            Err(SimError::AlreadyJoined(_))
        ));
    }

    #[test]
    fn test_capacity() {
        let mut s = session();
        for i in 0..10 {
            s.join(ParticipantId(i), "x").unwrap();
        }
        assert!(matches!(
            s.join(ParticipantId(99), "x"),
            Err(SimError::CapacityExceeded { capacity: 10 })
        ));
    }

    #[test]
    fn test_last_but_one_leaving_closes() {
        let mut s = session();
        s.join(ParticipantId(1), "a").unwrap();
        s.join(ParticipantId(2), "b").unwrap();
        let rx = s.subscribe();
        assert_eq!(s.leave(ParticipantId(1)).unwrap(), LeaveOutcome::SessionClosed);
        assert!(s.is_closed());
        assert_eq!(s.population(), 0);
        assert!(rx.is_closed());
        assert!(matches!(s.join(ParticipantId(3), "c"), Err(SimError::SessionClosed)));
    }

    #[test]
    fn test_unbalanced_ready_is_ignored() {
        let mut s = session();
        s.join(ParticipantId(1), "a").unwrap();
        s.join(ParticipantId(2), "b").unwrap();
        s.spawn_avatars_for_unbound_slots(Tick(0));
        // Both default to Maverick on the Defenders side
        assert!(!s.toggle_ready(ParticipantId(1), Tick(0)));
        assert!(s.switch_character(ParticipantId(2), Character::Nadja, Tick(0)));
        assert!(s.toggle_ready(ParticipantId(1), Tick(0)));
        assert_eq!(s.phase(), Phase::Lobby);
        assert!(s.toggle_ready(ParticipantId(2), Tick(0)));
        assert_eq!(s.phase(), Phase::Level);
        assert_eq!(s.world().npcs().len(), 20);
        assert!(!s.switch_character(ParticipantId(2), Character::Zaphyr, Tick(1)));
    }

    #[test]
    fn test_kill_scoring_table() {
        let scoring = ScoringConfig::default();
        assert_eq!(award_for_kill(&scoring, Victim::Avatar(Side::Attackers)), (Side::Defenders, 100.0));
        assert_eq!(award_for_kill(&scoring, Victim::Avatar(Side::Defenders)), (Side::Attackers, 0.0));
        assert_eq!(award_for_kill(&scoring, Victim::Npc), (Side::Attackers, 25.0));
    }

    #[test]
    fn test_timer_expiry_ends_match() {
        let mut s = session();
        s.join(ParticipantId(1), "a").unwrap();
        s.join(ParticipantId(2), "b").unwrap();
        s.spawn_avatars_for_unbound_slots(Tick(0));
        s.switch_character(ParticipantId(2), Character::Nadja, Tick(0));
        let rx = s.subscribe();
        s.toggle_ready(ParticipantId(1), Tick(0));
        s.toggle_ready(ParticipantId(2), Tick(0));

        s.update_phase(Tick(3599));
        assert_eq!(s.phase(), Phase::Level);
        s.update_phase(Tick(3600));
        assert_eq!(s.phase(), Phase::Endgame);
        // 0 >= 0 goes to the attackers
        assert_eq!(s.winner(), Side::Attackers);
        assert_eq!(rx.drain(), vec![Notification::GameEnded { winner: Side::Attackers }]);

        let nadja = s.binding(ParticipantId(2)).unwrap();
        assert_eq!(nadja.profile.rank_xp, 30);
        assert_eq!(nadja.profile.balance, 100);
        let maverick = s.binding(ParticipantId(1)).unwrap();
        assert_eq!(maverick.profile.rank, 1);
        assert_eq!(maverick.profile.rank_xp, 0);
    }

    #[test]
    fn test_transition_follows_avatars_not_positions() {
        let mut s = session();
        for i in 1..=3 {
            s.join(ParticipantId(i), "x").unwrap();
        }
        s.spawn_avatars_for_unbound_slots(Tick(0));
        s.load_level(Phase::Lobby, Tick(0));
        // Slot 0 leaves before anyone is teleported
        assert_eq!(s.leave(ParticipantId(1)).unwrap(), LeaveOutcome::Left);

        let stage = |s: &Session, slot: u8| s.world().avatar(Slot(slot)).unwrap().lifecycle().stage();
        s.update_phase(Tick(60));
        assert_ne!(stage(&s, 1), Stage::TeleportOut);
        s.update_phase(Tick(66));
        assert_eq!(stage(&s, 1), Stage::TeleportOut);
        assert_ne!(stage(&s, 2), Stage::TeleportOut);
        s.update_phase(Tick(72));
        assert_eq!(stage(&s, 2), Stage::TeleportOut);
    }

    #[test]
    fn test_phase_raw_round_trip() {
        for phase in [Phase::Lobby, Phase::Level, Phase::Transition, Phase::Endgame] {
            assert_eq!(Phase::from_raw(phase.to_raw()), phase);
        }
    }
}
