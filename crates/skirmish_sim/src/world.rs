//! # World
//!
//! Every simulated entity on the authority and the rules that make them
//! interact:
//!
//! - respawn placement (stalls while no spawn point is free)
//! - action resolution through the [`LagCompensator`]
//! - projectile flight, blasts and area pulses
//! - NPC wandering, revives and placed-object destruction
//!
//! Anything the rest of the match must react to (score, notifications, hit
//! markers) is queued as an [`Outcome`] and taken by the session at the end
//! of the tick.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_core::{EntityAllocator, EntityId, Tick, TickRate};
use skirmish_shared::config::{BlastConfig, WeaponsConfig};
use skirmish_shared::{SessionConfig, Side, SimConfig, TickInput, Vec3};

use crate::action::{Delivery, Execution, Impact};
use crate::avatar::{Avatar, Binding, Intent, Npc};
use crate::error::{SimError, SimResult};
use crate::health::{DamageHit, DamageOutcome, Destroyable};
use crate::history::{Collider, HistoryIndex};
use crate::hitreg::{dedup_by_target, Attacker, HitMask, LagCompensator, Ray, TargetKind, TargetedHit};
use crate::ids::{ParticipantId, Slot};
use crate::projectile::{AreaEffect, FlightEvent, Projectile};
use crate::spawn::SpawnPoints;

/// Distance an area effect is lifted off the surface it landed on.
const AREA_SURFACE_OFFSET: f32 = 0.1;

/// Who died.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Victim {
    /// A participant's avatar on a side.
    Avatar(Side),
    /// An NPC.
    Npc,
}

/// Something the session must react to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    /// Damage landed.
    Hit {
        /// Authoring participant.
        attacker: Option<Slot>,
        /// Damaged entity.
        target: EntityId,
        /// Damage dealt.
        damage: f32,
        /// Contact point.
        point: Vec3,
        /// Critical hit.
        critical: bool,
        /// The hit killed the target.
        lethal: bool,
    },
    /// An avatar or NPC died.
    Killed {
        /// Killing participant.
        killer: Option<Slot>,
        /// Entity that died.
        victim: EntityId,
        /// What it was.
        kind: Victim,
    },
    /// A dead NPC was revived.
    Revived {
        /// The NPC.
        npc: EntityId,
        /// Reviving participant.
        by: Slot,
    },
    /// A placed object was destroyed.
    Destroyed {
        /// The object.
        structure: EntityId,
        /// Destroying participant.
        by: Option<Slot>,
    },
}

/// All entities of one match.
#[derive(Debug)]
pub struct World {
    rate: TickRate,
    session: SessionConfig,
    weapons: WeaponsConfig,
    entities: EntityAllocator,
    avatars: BTreeMap<Slot, Avatar>,
    npcs: Vec<Npc>,
    destroyables: Vec<Destroyable>,
    spawn_points: SpawnPoints,
    index: HistoryIndex,
    lag: LagCompensator,
    projectiles: Vec<Projectile>,
    areas: Vec<AreaEffect>,
    rng: ChaCha8Rng,
    outcomes: Vec<Outcome>,
}

impl World {
    /// An empty world on the default arena layout.
    #[must_use]
    pub fn new(config: &SimConfig, rate: TickRate) -> Self {
        Self {
            rate,
            session: config.session.clone(),
            weapons: config.weapons.clone(),
            entities: EntityAllocator::new(),
            avatars: BTreeMap::new(),
            npcs: Vec::new(),
            destroyables: Vec::new(),
            spawn_points: SpawnPoints::arena(config.session.capacity),
            index: HistoryIndex::new(config.tick.history_ticks),
            lag: LagCompensator::new(config.tick.history_ticks),
            projectiles: Vec::new(),
            areas: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.session.seed),
            outcomes: Vec::new(),
        }
    }

    /// Tick rate.
    #[must_use]
    pub const fn rate(&self) -> TickRate {
        self.rate
    }

    /// Allocates an id for an entity the world does not simulate.
    pub fn allocate(&mut self) -> EntityId {
        self.entities.allocate()
    }

    // =========================================================================
    // AVATARS
    // =========================================================================

    /// Creates an avatar for `binding`, replacing any avatar in that slot.
    pub fn spawn_avatar(&mut self, binding: Binding, now: Tick) -> EntityId {
        let slot = binding.slot;
        self.despawn_avatar(slot);
        let id = self.entities.allocate();
        let avatar = Avatar::new(id, binding, &self.session, &self.weapons, self.rate, now);
        self.avatars.insert(slot, avatar);
        tracing::debug!(entity = %id, %slot, "avatar spawned");
        id
    }

    /// Removes the avatar in `slot`.
    pub fn despawn_avatar(&mut self, slot: Slot) -> Option<Avatar> {
        let avatar = self.avatars.remove(&slot)?;
        self.entities.free(avatar.id());
        tracing::debug!(entity = %avatar.id(), %slot, "avatar despawned");
        Some(avatar)
    }

    /// Avatar in `slot`.
    #[must_use]
    pub fn avatar(&self, slot: Slot) -> Option<&Avatar> {
        self.avatars.get(&slot)
    }

    /// Mutable avatar in `slot`.
    pub fn avatar_mut(&mut self, slot: Slot) -> Option<&mut Avatar> {
        self.avatars.get_mut(&slot)
    }

    /// Mutable avatar with entity id `id`.
    pub fn avatar_by_id_mut(&mut self, id: EntityId) -> Option<&mut Avatar> {
        self.avatars.values_mut().find(|avatar| avatar.id() == id)
    }

    /// Avatars in slot order.
    pub fn avatars(&self) -> impl Iterator<Item = &Avatar> {
        self.avatars.values()
    }

    /// Mutable avatars in slot order.
    pub fn avatars_mut(&mut self) -> impl Iterator<Item = &mut Avatar> {
        self.avatars.values_mut()
    }

    /// Releases spawn points held by `participant`.
    pub fn release_spawn_points(&mut self, participant: ParticipantId) {
        self.spawn_points.release(participant);
    }

    /// Releases every spawn point.
    pub fn release_all_spawn_points(&mut self) {
        self.spawn_points.release_all();
    }

    /// Replaces the level layout.
    pub fn set_spawn_points(&mut self, points: SpawnPoints) {
        self.spawn_points = points;
    }

    /// Records a participant's round trip.
    pub fn set_latency(&mut self, slot: Slot, ticks: u32) {
        self.lag.set_latency(slot, ticks);
    }

    /// Forgets a participant's round trip.
    pub fn clear_latency(&mut self, slot: Slot) {
        self.lag.clear_latency(slot);
    }

    // =========================================================================
    // NPCS AND PLACED OBJECTS
    // =========================================================================

    /// Replaces every NPC with `count` fresh ones at seeded positions.
    pub fn spawn_npcs(&mut self, count: usize) {
        for npc in self.npcs.drain(..) {
            self.entities.free(npc.id());
        }
        let positions = self.spawn_points.npc_positions(count, &mut self.rng);
        for position in positions {
            let id = self.entities.allocate();
            self.npcs.push(Npc::new(
                id,
                position,
                self.session.npc_max_health,
                self.session.avatar_radius,
            ));
        }
        tracing::debug!(count = self.npcs.len(), "npcs spawned");
    }

    /// NPCs.
    #[must_use]
    pub fn npcs(&self) -> &[Npc] {
        &self.npcs
    }

    /// Places a destroyable object with a box collider.
    pub fn place_destroyable(&mut self, position: Vec3, half_extents: Vec3, invincible: bool) -> EntityId {
        let id = self.entities.allocate();
        let mut object = Destroyable::new(id, position, half_extents, self.session.destroyable_health);
        object.invincible = invincible;
        self.destroyables.push(object);
        self.index
            .add_collider(Collider::from_center(position, half_extents, Some(id)));
        id
    }

    /// Adds static geometry.
    pub fn add_wall(&mut self, center: Vec3, half_extents: Vec3) {
        self.index
            .add_collider(Collider::from_center(center, half_extents, None));
    }

    /// Placed objects.
    #[must_use]
    pub fn destroyables(&self) -> &[Destroyable] {
        &self.destroyables
    }

    /// In-flight projectiles.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Active area effects.
    #[must_use]
    pub fn areas(&self) -> &[AreaEffect] {
        &self.areas
    }

    // =========================================================================
    // DECISION PHASE
    // =========================================================================

    /// Respawns due avatars and runs per-avatar upkeep.
    pub fn upkeep(&mut self, now: Tick) {
        for avatar in self.avatars.values_mut() {
            if avatar.lifecycle().respawn_due(now) {
                let binding = avatar.binding();
                match self.spawn_points.claim(binding.side, binding.participant) {
                    Some((position, yaw)) => avatar.place(position, yaw, now, &self.session, self.rate),
                    None => tracing::trace!(entity = %avatar.id(), "no free spawn point"),
                }
            }
            avatar.upkeep(now);
        }
    }

    /// Runs one avatar's decision step. Lobby intents are returned to the
    /// caller; everything else is resolved here.
    ///
    /// # Errors
    ///
    /// [`SimError::Fault`] for non-finite input.
    pub fn decide(&mut self, slot: Slot, input: &TickInput, now: Tick, in_lobby: bool) -> SimResult<Vec<Intent>> {
        let Some(avatar) = self.avatars.get_mut(&slot) else {
            return Ok(Vec::new());
        };
        if !input_is_finite(input) {
            return Err(SimError::Fault {
                entity: avatar.id(),
                reason: "non-finite input".into(),
            });
        }
        let attacker = Attacker {
            entity: avatar.id(),
            side: avatar.binding().side,
            author: Some(slot),
        };
        let intents = avatar.process_input(input, now, in_lobby, &self.session, self.rate);

        let mut lobby = Vec::new();
        for intent in intents {
            match intent {
                Intent::Execute {
                    execution,
                    origin,
                    aim,
                    ..
                } => self.execute(&attacker, &execution, origin, aim, now),
                Intent::Revive { center } => self.revive(&attacker, center, now),
                Intent::SwitchCharacter | Intent::ToggleReady => lobby.push(intent),
            }
        }
        Ok(lobby)
    }

    fn execute(&mut self, attacker: &Attacker, execution: &Execution, origin: Vec3, aim: Vec3, now: Tick) {
        let direction = (aim - origin).normalized();
        if direction.is_zero() {
            return;
        }
        match &execution.delivery {
            Delivery::Hitscan {
                damage,
                max_distance,
                rays,
                dispersion_degrees,
            } => {
                let rays: Vec<Ray> = (0..*rays)
                    .map(|_| Ray::new(origin, self.spread(direction, *dispersion_degrees), *max_distance))
                    .collect();
                let (avatars, npcs) = (&self.avatars, &self.npcs);
                let hits = self
                    .lag
                    .resolve_hitscan(&self.index, attacker, &rays, *damage, now, |id| {
                        classify(avatars, npcs, id)
                    });
                self.apply_hits(attacker, &hits, now);
            }
            Delivery::Projectile { flight, impact } => {
                self.projectiles.push(Projectile::launch(
                    *attacker,
                    origin,
                    aim,
                    flight,
                    impact.clone(),
                    now,
                    self.rate,
                ));
            }
            Delivery::Melee { damage, radius, .. } => {
                let forward = Vec3::new(direction.x, 0.0, direction.z).normalized();
                let center = origin + forward * *radius;
                let amount = damage * f32::from(execution.combo.max(1));
                let (avatars, npcs) = (&self.avatars, &self.npcs);
                let hits = self.lag.resolve_melee(
                    &self.index,
                    attacker,
                    center,
                    *radius,
                    amount,
                    execution.critical,
                    now,
                    |id| classify(avatars, npcs, id),
                );
                self.apply_hits(attacker, &hits, now);
            }
            // Applied by the avatar itself
            Delivery::Boost { .. } => {}
        }
    }

    fn spread(&mut self, direction: Vec3, degrees: f32) -> Vec3 {
        if degrees <= 0.0 {
            return direction;
        }
        let cone = degrees.to_radians().tan();
        let jitter = Vec3::new(
            self.rng.gen_range(-1.0..=1.0),
            self.rng.gen_range(-1.0..=1.0),
            self.rng.gen_range(-1.0..=1.0),
        ) * cone;
        (direction + jitter).normalized()
    }

    fn revive(&mut self, reviver: &Attacker, center: Vec3, now: Tick) {
        let Some(by) = reviver.author else { return };
        let mut found = self.lag.overlap(
            &self.index,
            center,
            self.session.revive_radius,
            reviver,
            now,
            HitMask::DAMAGEABLE,
        );
        dedup_by_target(&mut found);
        for target in found.iter().filter_map(|hit| hit.target) {
            let Some(npc) = self.npcs.iter_mut().find(|n| n.id() == target) else {
                continue;
            };
            if npc.revive() {
                self.outcomes.push(Outcome::Revived { npc: target, by });
            }
        }
    }

    fn apply_hits(&mut self, attacker: &Attacker, hits: &[TargetedHit], now: Tick) {
        let respawn_ticks = self.rate.ticks_for_secs(self.session.respawn_delay_secs);
        for hit in hits {
            let damage = DamageHit {
                amount: hit.damage,
                point: hit.point,
                direction: hit.direction,
                critical: hit.critical,
            };
            let (outcome, victim) = match hit.kind {
                TargetKind::Avatar(side) => {
                    let Some(avatar) = self.avatars.values_mut().find(|a| a.id() == hit.target) else {
                        continue;
                    };
                    if !avatar.lifecycle().is_targetable() {
                        continue;
                    }
                    let origin = avatar.position();
                    let outcome = avatar.health_mut().apply(&damage, origin, now);
                    if outcome == DamageOutcome::Killed {
                        avatar.lifecycle_mut().die(now, respawn_ticks);
                        tracing::debug!(entity = %avatar.id(), "avatar died");
                    }
                    (outcome, Victim::Avatar(side))
                }
                TargetKind::Npc => {
                    let Some(npc) = self.npcs.iter_mut().find(|n| n.id() == hit.target) else {
                        continue;
                    };
                    let origin = npc.position();
                    let outcome = npc.health_mut().apply(&damage, origin, now);
                    if outcome == DamageOutcome::Killed {
                        npc.record_death();
                    }
                    (outcome, Victim::Npc)
                }
                TargetKind::Structure => continue,
            };
            if outcome == DamageOutcome::Rejected {
                continue;
            }
            let lethal = outcome == DamageOutcome::Killed;
            self.outcomes.push(Outcome::Hit {
                attacker: attacker.author,
                target: hit.target,
                damage: hit.damage,
                point: hit.point,
                critical: hit.critical,
                lethal,
            });
            if lethal {
                self.outcomes.push(Outcome::Killed {
                    killer: attacker.author,
                    victim: hit.target,
                    kind: victim,
                });
            }
        }
    }

    fn detonate(&mut self, attacker: &Attacker, point: Vec3, blast: &BlastConfig, now: Tick) {
        let (avatars, npcs) = (&self.avatars, &self.npcs);
        let outcome = self.lag.resolve_blast(
            &self.index,
            attacker,
            point,
            blast.radius,
            (blast.min_damage, blast.max_damage),
            blast.structure_radius,
            now,
            |id| classify(avatars, npcs, id),
        );
        self.apply_hits(attacker, &outcome.hits, now);

        for structure in outcome.structures {
            let Some(object) = self.destroyables.iter_mut().find(|d| d.id == structure) else {
                continue;
            };
            if object.apply_blast(blast.max_damage) {
                self.index.remove_structure(structure);
                self.outcomes.push(Outcome::Destroyed {
                    structure,
                    by: attacker.author,
                });
                tracing::debug!(entity = %structure, "structure destroyed");
            }
        }
    }

    /// Advances projectiles and area effects.
    pub fn step_projectiles(&mut self, now: Tick) {
        let mut landed = Vec::new();
        for projectile in &mut self.projectiles {
            if let FlightEvent::Landed(hit) = projectile.step(&self.index, &mut self.lag, now, self.rate) {
                landed.push((*projectile.attacker(), projectile.impact().clone(), hit));
            }
        }
        self.projectiles.retain(|p| !p.is_spent());

        for (attacker, impact, hit) in landed {
            match impact {
                Impact::Blast(blast) => {
                    let point = hit.point + hit.normal * blast.surface_offset;
                    self.detonate(&attacker, point, &blast, now);
                }
                Impact::Area(area) => {
                    let center = hit.point + hit.normal * AREA_SURFACE_OFFSET;
                    self.areas
                        .push(AreaEffect::new(attacker, center, &area, now, self.rate));
                }
            }
        }

        let mut pulses = Vec::new();
        for area in &mut self.areas {
            if area.poll(now) {
                pulses.push((*area.attacker(), area.center(), area.radius(), area.damage()));
            }
        }
        self.areas.retain(|a| !a.is_finished());

        for (attacker, center, radius, damage) in pulses {
            let (avatars, npcs) = (&self.avatars, &self.npcs);
            let hits = self
                .lag
                .resolve_pulse(&self.index, &attacker, center, radius, damage, now, |id| {
                    classify(avatars, npcs, id)
                });
            self.apply_hits(&attacker, &hits, now);
        }
    }

    /// Moves every NPC one tick, blocked by static geometry.
    pub fn step_npcs(&mut self) {
        let walls = self.index.colliders();
        for npc in &mut self.npcs {
            npc.step(&self.session, self.rate, &mut self.rng, walls);
        }
    }

    /// Stores this tick's hit volumes for lag compensation.
    pub fn record_history(&mut self, now: Tick) {
        let hitboxes: Vec<_> = self
            .avatars
            .values()
            .flat_map(|a| a.hitboxes())
            .chain(self.npcs.iter().map(Npc::hitbox))
            .collect();
        self.index.record(now, hitboxes);
    }

    /// Takes the outcomes queued this tick.
    pub fn take_outcomes(&mut self) -> Vec<Outcome> {
        std::mem::take(&mut self.outcomes)
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.avatars.clear();
        self.npcs.clear();
        self.destroyables.clear();
        self.projectiles.clear();
        self.areas.clear();
        self.outcomes.clear();
        self.index.clear();
        self.spawn_points.release_all();
        self.entities.clear();
    }
}

fn classify(avatars: &BTreeMap<Slot, Avatar>, npcs: &[Npc], id: EntityId) -> Option<TargetKind> {
    if let Some(avatar) = avatars.values().find(|a| a.id() == id) {
        return avatar
            .lifecycle()
            .is_targetable()
            .then_some(TargetKind::Avatar(avatar.binding().side));
    }
    npcs.iter()
        .find(|n| n.id() == id && n.health().is_alive())
        .map(|_| TargetKind::Npc)
}

fn input_is_finite(input: &TickInput) -> bool {
    let v = |p: Vec3| p.x.is_finite() && p.y.is_finite() && p.z.is_finite();
    input.move_direction.x.is_finite() && input.move_direction.y.is_finite() && v(input.aim_point) && v(input.aim_rig_point)
}
