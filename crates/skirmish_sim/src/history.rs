//! # World History
//!
//! In-memory [`SpatialIndex`]: static box colliders plus a ring of per-tick
//! frames holding every live hit volume. The driver records one frame at the
//! end of each decision tick; queries for an older tick read the frame that
//! was live then.
//!
//! ```text
//!   frames[tick % depth]
//!   ┌──────┬──────┬──────┬─────┬──────┐
//!   │ t-4  │ t-3  │ t-2  │ t-1 │  t   │   <- record(t) overwrites t-depth
//!   └──────┴──────┴──────┴─────┴──────┘
//! ```
//!
//! Colliders never move. Destroyed structures are removed outright.

use skirmish_core::{EntityId, Tick};
use skirmish_shared::Vec3;

use crate::hitreg::{HitClass, HitRecord, QueryFilter, Ray, SpatialIndex};

/// A damageable sphere owned by an actor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hitbox {
    /// Owning actor.
    pub owner: EntityId,
    /// Sphere center.
    pub center: Vec3,
    /// Sphere radius.
    pub radius: f32,
    /// Damage multiplier (head volumes > 1).
    pub multiplier: f32,
}

/// Axis-aligned blocking geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
    /// Placed object this collider belongs to.
    pub structure: Option<EntityId>,
}

impl Collider {
    /// A box around `center`.
    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3, structure: Option<EntityId>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
            structure,
        }
    }

    /// Box center.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Point of the box closest to `p`.
    #[must_use]
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
            p.z.clamp(self.min.z, self.max.z),
        )
    }

    /// True if the segment from `from` to `to` touches the box.
    #[must_use]
    pub fn intersects_segment(&self, from: Vec3, to: Vec3) -> bool {
        self.raycast(&Ray::between(from, to)).is_some()
    }

    /// Slab test. Returns the entry distance and the entry face normal.
    fn raycast(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        let origin = ray.origin.to_array();
        let dir = ray.direction.to_array();
        let min = self.min.to_array();
        let max = self.max.to_array();

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut axis = 0;
        for i in 0..3 {
            if dir[i].abs() < 1e-8 {
                if origin[i] < min[i] || origin[i] > max[i] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[i];
            let (t0, t1) = {
                let a = (min[i] - origin[i]) * inv;
                let b = (max[i] - origin[i]) * inv;
                if a <= b { (a, b) } else { (b, a) }
            };
            if t0 > t_enter {
                t_enter = t0;
                axis = i;
            }
            t_exit = t_exit.min(t1);
        }
        if t_exit < t_enter.max(0.0) {
            return None;
        }
        let t = t_enter.max(0.0);
        if t > ray.max_distance {
            return None;
        }
        let mut normal = [0.0; 3];
        normal[axis] = -dir[axis].signum();
        Some((t, Vec3::from_array(normal)))
    }
}

#[derive(Clone, Debug, Default)]
struct Frame {
    tick: Option<Tick>,
    hitboxes: Vec<Hitbox>,
}

/// Static colliders plus per-tick hit-volume history.
#[derive(Clone, Debug)]
pub struct HistoryIndex {
    colliders: Vec<Collider>,
    frames: Vec<Frame>,
    latest: Option<Tick>,
}

impl HistoryIndex {
    /// Keeps `depth` ticks of history.
    #[must_use]
    pub fn new(depth: u32) -> Self {
        Self {
            colliders: Vec::new(),
            frames: vec![Frame::default(); depth.max(1) as usize],
            latest: None,
        }
    }

    /// Adds static geometry.
    pub fn add_collider(&mut self, collider: Collider) {
        self.colliders.push(collider);
    }

    /// Removes every collider of a placed object.
    pub fn remove_structure(&mut self, structure: EntityId) {
        self.colliders.retain(|c| c.structure != Some(structure));
    }

    /// Static geometry.
    #[must_use]
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Stores the hit volumes live at `tick`.
    pub fn record(&mut self, tick: Tick, hitboxes: impl IntoIterator<Item = Hitbox>) {
        let slot = tick.0 as usize % self.frames.len();
        let frame = &mut self.frames[slot];
        frame.tick = Some(tick);
        frame.hitboxes.clear();
        frame.hitboxes.extend(hitboxes);
        self.latest = Some(self.latest.map_or(tick, |t| t.max(tick)));
    }

    /// Hit volumes as of `view`. Falls back to the newest frame at or before
    /// `view`, then to the oldest one kept.
    #[must_use]
    pub fn frame(&self, view: Tick) -> &[Hitbox] {
        let slot = view.0 as usize % self.frames.len();
        if self.frames[slot].tick == Some(view) {
            return &self.frames[slot].hitboxes;
        }
        let before = self
            .frames
            .iter()
            .filter(|f| f.tick.is_some_and(|t| t <= view))
            .max_by_key(|f| f.tick);
        let fallback = before.or_else(|| {
            self.frames
                .iter()
                .filter(|f| f.tick.is_some())
                .min_by_key(|f| f.tick)
        });
        fallback.map_or(&[], |f| &f.hitboxes)
    }

    /// Newest recorded tick.
    #[must_use]
    pub const fn latest(&self) -> Option<Tick> {
        self.latest
    }

    /// Forgets history and geometry.
    pub fn clear(&mut self) {
        self.colliders.clear();
        for frame in &mut self.frames {
            frame.tick = None;
            frame.hitboxes.clear();
        }
        self.latest = None;
    }
}

fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.direction);
    let c = oc.length_squared() - radius * radius;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()).max(0.0);
    (t <= ray.max_distance).then_some(t)
}

impl SpatialIndex for HistoryIndex {
    fn raycast_all(&self, ray: &Ray, filter: &QueryFilter, out: &mut Vec<HitRecord>) {
        if ray.max_distance <= 0.0 {
            return;
        }
        if filter.mask.contains(HitClass::Blocking) {
            for collider in &self.colliders {
                if let Some((t, normal)) = collider.raycast(ray) {
                    out.push(HitRecord {
                        target: collider.structure,
                        point: ray.at(t),
                        normal,
                        distance: t,
                        class: HitClass::Blocking,
                        multiplier: 1.0,
                        center: collider.center(),
                    });
                }
            }
        }
        if filter.mask.contains(HitClass::Damageable) {
            for hitbox in self.frame(filter.view) {
                if filter.ignore == Some(hitbox.owner) {
                    continue;
                }
                if let Some(t) = ray_sphere(ray, hitbox.center, hitbox.radius) {
                    let point = ray.at(t);
                    let normal = (point - hitbox.center).normalized();
                    out.push(HitRecord {
                        target: Some(hitbox.owner),
                        point,
                        normal: if normal.is_zero() { -ray.direction } else { normal },
                        distance: t,
                        class: HitClass::Damageable,
                        multiplier: hitbox.multiplier,
                        center: hitbox.center,
                    });
                }
            }
        }
    }

    fn overlap_all(&self, center: Vec3, radius: f32, filter: &QueryFilter, out: &mut Vec<HitRecord>) {
        if filter.mask.contains(HitClass::Blocking) {
            for collider in &self.colliders {
                let closest = collider.closest_point(center);
                let distance = closest.distance(center);
                if distance <= radius {
                    out.push(HitRecord {
                        target: collider.structure,
                        point: closest,
                        normal: (center - closest).normalized(),
                        distance,
                        class: HitClass::Blocking,
                        multiplier: 1.0,
                        center: collider.center(),
                    });
                }
            }
        }
        if filter.mask.contains(HitClass::Damageable) {
            for hitbox in self.frame(filter.view) {
                if filter.ignore == Some(hitbox.owner) {
                    continue;
                }
                let distance = hitbox.center.distance(center);
                if distance <= radius + hitbox.radius {
                    out.push(HitRecord {
                        target: Some(hitbox.owner),
                        point: hitbox.center,
                        normal: (hitbox.center - center).normalized(),
                        distance,
                        class: HitClass::Damageable,
                        multiplier: hitbox.multiplier,
                        center: hitbox.center,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hitreg::HitMask;

    fn filter(view: u32, mask: HitMask) -> QueryFilter {
        QueryFilter {
            view: Tick(view),
            mask,
            ignore: None,
        }
    }

    fn hitbox(owner: u32, x: f32) -> Hitbox {
        Hitbox {
            owner: EntityId::new(owner, 0),
            center: Vec3::new(x, 0.0, 0.0),
            radius: 0.5,
            multiplier: 1.0,
        }
    }

    #[test]
    fn test_rewinds_to_recorded_frame() {
        let mut index = HistoryIndex::new(8);
        index.record(Tick(10), [hitbox(1, 10.0)]);
        index.record(Tick(11), [hitbox(1, 20.0)]);

        let ray = Ray::new(Vec3::ZERO, Vec3::X, 100.0);
        let mut out = Vec::new();
        index.raycast_all(&ray, &filter(10, HitMask::DAMAGEABLE), &mut out);
        assert_eq!(out.len(), 1);
        assert!((out[0].distance - 9.5).abs() < 1e-4);

        out.clear();
        index.raycast_all(&ray, &filter(11, HitMask::DAMAGEABLE), &mut out);
        assert!((out[0].distance - 19.5).abs() < 1e-4);

        // Future view falls back to the newest frame
        out.clear();
        index.raycast_all(&ray, &filter(50, HitMask::DAMAGEABLE), &mut out);
        assert!((out[0].distance - 19.5).abs() < 1e-4);
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let mut index = HistoryIndex::new(2);
        index.record(Tick(1), [hitbox(1, 1.0)]);
        index.record(Tick(2), [hitbox(1, 2.0)]);
        index.record(Tick(3), [hitbox(1, 3.0)]);
        // Tick 1 is gone; the oldest kept frame answers
        assert!((index.frame(Tick(1))[0].center.x - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_box_raycast_and_overlap() {
        let mut index = HistoryIndex::new(4);
        let wall = EntityId::new(5, 0);
        index.add_collider(Collider::from_center(
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(0.5, 2.0, 2.0),
            Some(wall),
        ));

        let ray = Ray::new(Vec3::ZERO, Vec3::X, 100.0);
        let mut out = Vec::new();
        index.raycast_all(&ray, &filter(0, HitMask::ALL), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].class, HitClass::Blocking);
        assert!((out[0].distance - 4.5).abs() < 1e-4);
        assert_eq!(out[0].normal, -Vec3::X);

        out.clear();
        index.overlap_all(Vec3::new(3.8, 0.0, 0.0), 1.0, &filter(0, HitMask::BLOCKING), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, Some(wall));

        index.remove_structure(wall);
        out.clear();
        index.raycast_all(&ray, &filter(0, HitMask::ALL), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_ignore_owner() {
        let mut index = HistoryIndex::new(4);
        index.record(Tick(0), [hitbox(1, 0.0), hitbox(2, 5.0)]);
        let mut out = Vec::new();
        let query = QueryFilter {
            ignore: Some(EntityId::new(1, 0)),
            ..filter(0, HitMask::DAMAGEABLE)
        };
        index.overlap_all(Vec3::ZERO, 10.0, &query, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, Some(EntityId::new(2, 0)));
    }
}
