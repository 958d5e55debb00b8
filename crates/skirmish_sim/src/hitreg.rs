//! # Lag-Compensated Hit Registration
//!
//! Attacks are resolved against the world *as the attacker saw it*: every
//! query runs at a view tick of `now - latency(author)`, looked up in a
//! [`SpatialIndex`] that keeps a short history of hit volumes.
//!
//! ## Resolution rules
//!
//! 1. Protected pairs are rejected before any spatial query: same side, or a
//!    defender attacking an NPC.
//! 2. A blocking contact nearer than a damageable one hides it. For area
//!    attacks every target gets its own blocking ray from the blast origin.
//! 3. One execution damages each target at most once, no matter how many of
//!    its volumes were touched (deduplicated by target, not by volume).
//! 4. Blast damage is `lerp(min, max, 1 - clamp01(distance / radius))`,
//!    scaled by the volume's damage multiplier; a multiplier above 1 is a
//!    critical hit.
//!
//! Only the authority runs these queries. Observers see the resulting
//! counters.

use std::collections::HashMap;

use skirmish_core::{EntityId, Tick};
use skirmish_shared::{clamp01, lerp, Side, Vec3};

use crate::ids::Slot;

// =============================================================================
// QUERY VOCABULARY
// =============================================================================

/// What a contact is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitClass {
    /// Environment geometry. Stops rays, takes no damage.
    Blocking,
    /// A hit volume attached to a damageable actor.
    Damageable,
}

/// Which contact classes a query reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitMask(u8);

impl HitMask {
    /// Environment only.
    pub const BLOCKING: Self = Self(1);
    /// Hit volumes only.
    pub const DAMAGEABLE: Self = Self(2);
    /// Everything.
    pub const ALL: Self = Self(3);

    /// True if `class` is reported.
    #[inline]
    #[must_use]
    pub const fn contains(self, class: HitClass) -> bool {
        let bit = match class {
            HitClass::Blocking => 1,
            HitClass::Damageable => 2,
        };
        self.0 & bit != 0
    }
}

/// Ephemeral result of one spatial query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitRecord {
    /// Damageable owner, or the structure a blocking collider belongs to.
    pub target: Option<EntityId>,
    /// Contact point.
    pub point: Vec3,
    /// Contact normal.
    pub normal: Vec3,
    /// Distance from the query origin (ray) or center (overlap).
    pub distance: f32,
    /// Contact class.
    pub class: HitClass,
    /// Damage multiplier of the volume (1 for plain volumes).
    pub multiplier: f32,
    /// Center of the touched volume.
    pub center: Vec3,
}

/// A ray with a unit direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
    /// Length.
    pub max_distance: f32,
}

impl Ray {
    /// Normalizes `direction`. A zero direction yields a zero-length ray.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        let unit = direction.normalized();
        Self {
            origin,
            direction: unit,
            max_distance: if unit.is_zero() { 0.0 } else { max_distance },
        }
    }

    /// The segment from `from` to `to`.
    #[must_use]
    pub fn between(from: Vec3, to: Vec3) -> Self {
        let delta = to - from;
        Self::new(from, delta, delta.length())
    }

    /// Point at distance `t`.
    #[inline]
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Per-query filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryFilter {
    /// Tick to reconstruct.
    pub view: Tick,
    /// Reported classes.
    pub mask: HitMask,
    /// Volumes owned by this entity are skipped (the attacker itself).
    pub ignore: Option<EntityId>,
}

/// Historical spatial queries.
///
/// Implementations report *every* contact; choosing the nearest, blocking
/// and deduplication happen in [`LagCompensator`].
pub trait SpatialIndex {
    /// All contacts along `ray` at `filter.view`, in any order.
    fn raycast_all(&self, ray: &Ray, filter: &QueryFilter, out: &mut Vec<HitRecord>);

    /// All volumes within `radius` of `center` at `filter.view`, in any order.
    fn overlap_all(&self, center: Vec3, radius: f32, filter: &QueryFilter, out: &mut Vec<HitRecord>);
}

// =============================================================================
// PROTECTION
// =============================================================================

/// What a damageable target is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    /// A participant's avatar on a side.
    Avatar(Side),
    /// A non-player actor.
    Npc,
    /// A placed object.
    Structure,
}

/// The author of an attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attacker {
    /// Attacking entity (its own volumes are ignored).
    pub entity: EntityId,
    /// Attacker's side.
    pub side: Side,
    /// Authoring participant, for latency lookup.
    pub author: Option<Slot>,
}

/// True if `attacker` may not damage `target` at all.
#[must_use]
pub fn is_protected(attacker: Side, target: TargetKind) -> bool {
    match target {
        TargetKind::Avatar(side) => side == attacker,
        TargetKind::Npc => attacker == Side::Defenders,
        TargetKind::Structure => false,
    }
}

/// Linear blast falloff.
#[must_use]
pub fn blast_damage(distance: f32, radius: f32, min_damage: f32, max_damage: f32) -> f32 {
    let t = if radius > 0.0 { distance / radius } else { 1.0 };
    lerp(min_damage, max_damage, 1.0 - clamp01(t))
}

/// Keeps the nearest record per target and drops untargeted ones.
pub fn dedup_by_target(hits: &mut Vec<HitRecord>) {
    hits.retain(|h| h.target.is_some());
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    let mut seen: Vec<EntityId> = Vec::with_capacity(hits.len());
    hits.retain(|h| match h.target {
        Some(t) if !seen.contains(&t) => {
            seen.push(t);
            true
        }
        _ => false,
    });
}

/// One resolved damage application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetedHit {
    /// Damaged entity.
    pub target: EntityId,
    /// What it is.
    pub kind: TargetKind,
    /// Damage after falloff and multipliers.
    pub damage: f32,
    /// Contact point.
    pub point: Vec3,
    /// Direction from the attack origin to the target.
    pub direction: Vec3,
    /// Critical hit.
    pub critical: bool,
}

/// Everything a blast touched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlastOutcome {
    /// Damaged actors.
    pub hits: Vec<TargetedHit>,
    /// Placed objects within full-damage range.
    pub structures: Vec<EntityId>,
}

// =============================================================================
// LAG COMPENSATOR
// =============================================================================

/// Resolves attacks against world history.
#[derive(Debug)]
pub struct LagCompensator {
    history_ticks: u32,
    latency: HashMap<Slot, u32>,
    scratch: Vec<HitRecord>,
}

impl LagCompensator {
    /// A compensator that can look `history_ticks` into the past.
    #[must_use]
    pub fn new(history_ticks: u32) -> Self {
        Self {
            history_ticks: history_ticks.max(1),
            latency: HashMap::new(),
            scratch: Vec::with_capacity(64),
        }
    }

    /// Records a participant's round-trip latency in ticks.
    pub fn set_latency(&mut self, slot: Slot, ticks: u32) {
        self.latency.insert(slot, ticks);
    }

    /// Forgets a participant.
    pub fn clear_latency(&mut self, slot: Slot) {
        self.latency.remove(&slot);
    }

    /// Round-trip latency in ticks (0 if unknown).
    #[must_use]
    pub fn latency(&self, slot: Slot) -> u32 {
        self.latency.get(&slot).copied().unwrap_or(0)
    }

    /// The tick an attack by `author` is resolved at.
    #[must_use]
    pub fn view_tick(&self, author: Option<Slot>, now: Tick) -> Tick {
        let behind = author.map_or(0, |slot| self.latency(slot));
        now - behind.min(self.history_ticks - 1)
    }

    fn filter(&self, attacker: &Attacker, now: Tick, mask: HitMask) -> QueryFilter {
        QueryFilter {
            view: self.view_tick(attacker.author, now),
            mask,
            ignore: Some(attacker.entity),
        }
    }

    /// Nearest contact along `ray`. A blocking contact in front hides
    /// everything behind it.
    pub fn raycast<I: SpatialIndex + ?Sized>(
        &mut self,
        index: &I,
        ray: &Ray,
        attacker: &Attacker,
        now: Tick,
        mask: HitMask,
    ) -> Option<HitRecord> {
        let filter = self.filter(attacker, now, mask);
        self.scratch.clear();
        index.raycast_all(ray, &filter, &mut self.scratch);
        self.scratch
            .iter()
            .filter(|h| h.distance <= ray.max_distance)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .copied()
    }

    /// Every contact within `radius` of `center`, unordered.
    pub fn overlap<I: SpatialIndex + ?Sized>(
        &mut self,
        index: &I,
        center: Vec3,
        radius: f32,
        attacker: &Attacker,
        now: Tick,
        mask: HitMask,
    ) -> Vec<HitRecord> {
        let filter = self.filter(attacker, now, mask);
        let mut out = Vec::new();
        index.overlap_all(center, radius, &filter, &mut out);
        out
    }

    /// True if environment geometry lies between `from` and `to`.
    pub fn is_blocked<I: SpatialIndex + ?Sized>(
        &mut self,
        index: &I,
        from: Vec3,
        to: Vec3,
        attacker: &Attacker,
        now: Tick,
    ) -> bool {
        let ray = Ray::between(from, to);
        let filter = self.filter(attacker, now, HitMask::BLOCKING);
        self.scratch.clear();
        index.raycast_all(&ray, &filter, &mut self.scratch);
        self.scratch
            .iter()
            .any(|h| h.class == HitClass::Blocking && h.distance < ray.max_distance)
    }

    /// Casts a ray at one known target. Protected pairs are rejected before
    /// the index is touched.
    pub fn raycast_target<I: SpatialIndex + ?Sized>(
        &mut self,
        index: &I,
        attacker: &Attacker,
        target: EntityId,
        kind: TargetKind,
        ray: &Ray,
        now: Tick,
    ) -> Option<HitRecord> {
        if is_protected(attacker.side, kind) {
            return None;
        }
        let filter = self.filter(attacker, now, HitMask::ALL);
        self.scratch.clear();
        index.raycast_all(ray, &filter, &mut self.scratch);

        let on_target = self
            .scratch
            .iter()
            .filter(|h| h.class == HitClass::Damageable && h.target == Some(target))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .copied()?;
        let blocked = self
            .scratch
            .iter()
            .any(|h| h.class == HitClass::Blocking && h.distance < on_target.distance);
        (!blocked && on_target.distance <= ray.max_distance).then_some(on_target)
    }

    /// Hitscan execution of one or more rays. Damage from several rays on
    /// the same target is summed into a single application.
    pub fn resolve_hitscan<I, F>(
        &mut self,
        index: &I,
        attacker: &Attacker,
        rays: &[Ray],
        damage: f32,
        now: Tick,
        classify: F,
    ) -> Vec<TargetedHit>
    where
        I: SpatialIndex + ?Sized,
        F: Fn(EntityId) -> Option<TargetKind>,
    {
        let mut hits: Vec<TargetedHit> = Vec::new();
        for ray in rays {
            let Some(record) = self.raycast(index, ray, attacker, now, HitMask::ALL) else {
                continue;
            };
            if record.class != HitClass::Damageable {
                continue;
            }
            let Some(target) = record.target else { continue };
            let Some(kind) = classify(target) else { continue };
            if is_protected(attacker.side, kind) {
                continue;
            }
            let amount = damage * record.multiplier;
            let critical = record.multiplier > 1.0;
            if let Some(existing) = hits.iter_mut().find(|h| h.target == target) {
                existing.damage += amount;
                existing.critical |= critical;
            } else {
                hits.push(TargetedHit {
                    target,
                    kind,
                    damage: amount,
                    point: record.point,
                    direction: ray.direction,
                    critical,
                });
            }
        }
        hits
    }

    /// Melee overlap. Every target touched takes `damage` once.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_melee<I, F>(
        &mut self,
        index: &I,
        attacker: &Attacker,
        center: Vec3,
        radius: f32,
        damage: f32,
        critical: bool,
        now: Tick,
        classify: F,
    ) -> Vec<TargetedHit>
    where
        I: SpatialIndex + ?Sized,
        F: Fn(EntityId) -> Option<TargetKind>,
    {
        let mut records = self.overlap(index, center, radius, attacker, now, HitMask::DAMAGEABLE);
        dedup_by_target(&mut records);
        records
            .into_iter()
            .filter_map(|record| {
                let target = record.target?;
                let kind = classify(target)?;
                if is_protected(attacker.side, kind) {
                    return None;
                }
                Some(TargetedHit {
                    target,
                    kind,
                    damage,
                    point: record.point,
                    direction: (record.point - center).normalized(),
                    critical,
                })
            })
            .collect()
    }

    /// Area damage: overlap, then a blocking ray per target.
    ///
    /// `damage_at(distance)` computes each target's unscaled damage.
    #[allow(clippy::too_many_arguments)]
    fn resolve_area_with<I, F, D>(
        &mut self,
        index: &I,
        attacker: &Attacker,
        center: Vec3,
        radius: f32,
        now: Tick,
        classify: F,
        damage_at: D,
    ) -> Vec<TargetedHit>
    where
        I: SpatialIndex + ?Sized,
        F: Fn(EntityId) -> Option<TargetKind>,
        D: Fn(f32) -> f32,
    {
        let mut records = self.overlap(index, center, radius, attacker, now, HitMask::DAMAGEABLE);
        dedup_by_target(&mut records);

        let mut hits = Vec::with_capacity(records.len());
        for record in records {
            let Some(target) = record.target else { continue };
            let Some(kind) = classify(target) else { continue };
            if is_protected(attacker.side, kind) {
                continue;
            }
            if self.is_blocked(index, center, record.center, attacker, now) {
                continue;
            }
            hits.push(TargetedHit {
                target,
                kind,
                damage: damage_at(record.distance) * record.multiplier,
                point: record.point,
                direction: (record.center - center).normalized(),
                critical: record.multiplier > 1.0,
            });
        }
        hits
    }

    /// Blast with linear falloff. Placed objects within `structure_radius`
    /// are reported separately and take `max_damage`.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_blast<I, F>(
        &mut self,
        index: &I,
        attacker: &Attacker,
        center: Vec3,
        radius: f32,
        (min_damage, max_damage): (f32, f32),
        structure_radius: f32,
        now: Tick,
        classify: F,
    ) -> BlastOutcome
    where
        I: SpatialIndex + ?Sized,
        F: Fn(EntityId) -> Option<TargetKind>,
    {
        let hits = self.resolve_area_with(index, attacker, center, radius, now, classify, |d| {
            blast_damage(d, radius, min_damage, max_damage)
        });

        let mut structures: Vec<EntityId> = self
            .overlap(index, center, structure_radius, attacker, now, HitMask::BLOCKING)
            .into_iter()
            .filter_map(|r| r.target)
            .collect();
        structures.sort_unstable();
        structures.dedup();

        BlastOutcome { hits, structures }
    }

    /// Flat damage to everything unblocked within `radius`.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_pulse<I, F>(
        &mut self,
        index: &I,
        attacker: &Attacker,
        center: Vec3,
        radius: f32,
        damage: f32,
        now: Tick,
        classify: F,
    ) -> Vec<TargetedHit>
    where
        I: SpatialIndex + ?Sized,
        F: Fn(EntityId) -> Option<TargetKind>,
    {
        self.resolve_area_with(index, attacker, center, radius, now, classify, |_| damage)
    }
}

impl Default for LagCompensator {
    fn default() -> Self {
        Self::new(skirmish_shared::constants::HISTORY_TICKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Index with fixed contacts that counts how often it is queried.
    struct Fixed {
        records: Vec<HitRecord>,
        calls: Cell<u32>,
    }

    impl SpatialIndex for Fixed {
        fn raycast_all(&self, _ray: &Ray, filter: &QueryFilter, out: &mut Vec<HitRecord>) {
            self.calls.set(self.calls.get() + 1);
            out.extend(self.records.iter().filter(|r| filter.mask.contains(r.class)));
        }

        fn overlap_all(&self, _c: Vec3, _r: f32, filter: &QueryFilter, out: &mut Vec<HitRecord>) {
            self.calls.set(self.calls.get() + 1);
            out.extend(self.records.iter().filter(|r| filter.mask.contains(r.class)));
        }
    }

    fn record(target: Option<u32>, distance: f32, class: HitClass) -> HitRecord {
        HitRecord {
            target: target.map(|i| EntityId::new(i, 0)),
            point: Vec3::new(distance, 0.0, 0.0),
            normal: -Vec3::X,
            distance,
            class,
            multiplier: 1.0,
            center: Vec3::new(distance, 0.0, 0.0),
        }
    }

    fn attacker(side: Side) -> Attacker {
        Attacker {
            entity: EntityId::new(99, 0),
            side,
            author: Some(Slot(0)),
        }
    }

    #[test]
    fn test_protection_table() {
        assert!(is_protected(Side::Attackers, TargetKind::Avatar(Side::Attackers)));
        assert!(!is_protected(Side::Attackers, TargetKind::Avatar(Side::Defenders)));
        assert!(is_protected(Side::Defenders, TargetKind::Npc));
        assert!(!is_protected(Side::Attackers, TargetKind::Npc));
        assert!(!is_protected(Side::Defenders, TargetKind::Structure));
    }

    #[test]
    fn test_falloff() {
        assert!((blast_damage(3.75, 7.5, 25.0, 150.0) - 87.5).abs() < 1e-4);
        assert!((blast_damage(0.0, 7.5, 25.0, 150.0) - 150.0).abs() < 1e-4);
        assert!((blast_damage(20.0, 7.5, 25.0, 150.0) - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_view_tick_clamped_to_history() {
        let mut lag = LagCompensator::new(120);
        lag.set_latency(Slot(1), 6);
        lag.set_latency(Slot(2), 500);
        assert_eq!(lag.view_tick(Some(Slot(1)), Tick(100)), Tick(94));
        assert_eq!(lag.view_tick(Some(Slot(2)), Tick(1000)), Tick(881));
        assert_eq!(lag.view_tick(None, Tick(10)), Tick(10));
    }

    #[test]
    fn test_nearest_blocking_hides_target() {
        let index = Fixed {
            records: vec![
                record(Some(1), 10.0, HitClass::Damageable),
                record(None, 5.0, HitClass::Blocking),
            ],
            calls: Cell::new(0),
        };
        let mut lag = LagCompensator::default();
        let ray = Ray::new(Vec3::ZERO, Vec3::X, 100.0);
        let hit = lag.raycast(&index, &ray, &attacker(Side::Attackers), Tick(0), HitMask::ALL);
        assert_eq!(hit.map(|h| h.class), Some(HitClass::Blocking));

        let hits = lag.resolve_hitscan(&index, &attacker(Side::Attackers), &[ray], 10.0, Tick(0), |_| {
            Some(TargetKind::Avatar(Side::Defenders))
        });
        assert!(hits.is_empty());
    }

    #[test]
    fn test_dedup_keeps_nearest_volume() {
        let mut hits = vec![
            record(Some(1), 3.0, HitClass::Damageable),
            record(Some(1), 1.0, HitClass::Damageable),
            record(Some(2), 2.0, HitClass::Damageable),
            record(None, 0.5, HitClass::Blocking),
        ];
        dedup_by_target(&mut hits);
        assert_eq!(hits.len(), 2);
        assert!((hits[0].distance - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_targeted_query_rejects_before_lookup() {
        let index = Fixed {
            records: vec![record(Some(1), 10.0, HitClass::Damageable)],
            calls: Cell::new(0),
        };
        let mut lag = LagCompensator::default();
        let ray = Ray::new(Vec3::ZERO, Vec3::X, 100.0);
        let result = lag.raycast_target(
            &index,
            &attacker(Side::Defenders),
            EntityId::new(1, 0),
            TargetKind::Avatar(Side::Defenders),
            &ray,
            Tick(0),
        );
        assert!(result.is_none());
        assert_eq!(index.calls.get(), 0);

        let result = lag.raycast_target(
            &index,
            &attacker(Side::Attackers),
            EntityId::new(1, 0),
            TargetKind::Avatar(Side::Defenders),
            &ray,
            Tick(0),
        );
        assert!(result.is_some());
        assert_eq!(index.calls.get(), 1);
    }

    #[test]
    fn test_multi_ray_sums_into_one_application() {
        let index = Fixed {
            records: vec![record(Some(1), 10.0, HitClass::Damageable)],
            calls: Cell::new(0),
        };
        let mut lag = LagCompensator::default();
        let ray = Ray::new(Vec3::ZERO, Vec3::X, 100.0);
        let hits = lag.resolve_hitscan(&index, &attacker(Side::Attackers), &[ray, ray, ray], 10.0, Tick(0), |_| {
            Some(TargetKind::Npc)
        });
        assert_eq!(hits.len(), 1);
        assert!((hits[0].damage - 30.0).abs() < f32::EPSILON);
    }
}
