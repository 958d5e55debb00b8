//! # Spawn Points
//!
//! Avatars spawn at side-specific points. A point is claimed by the first
//! participant placed there and stays reserved for that participant until
//! the level is reset or the participant leaves, so respawns land at a
//! familiar spot while everyone else looks elsewhere.
//!
//! NPC points are unowned; placement draws from them with the session's
//! deterministic generator.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use skirmish_shared::{Side, Vec3};

use crate::ids::ParticipantId;

/// A player spawn location.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnPoint {
    /// Placement position.
    pub position: Vec3,
    /// Facing, radians around +Y.
    pub yaw: f32,
    /// Side allowed to use it.
    pub side: Side,
    owner: Option<ParticipantId>,
}

impl SpawnPoint {
    /// An unclaimed point.
    #[must_use]
    pub const fn new(position: Vec3, yaw: f32, side: Side) -> Self {
        Self {
            position,
            yaw,
            side,
            owner: None,
        }
    }

    /// Participant holding the point.
    #[must_use]
    pub const fn owner(&self) -> Option<ParticipantId> {
        self.owner
    }
}

/// Every spawn location of the current level.
#[derive(Clone, Debug, Default)]
pub struct SpawnPoints {
    players: Vec<SpawnPoint>,
    npcs: Vec<Vec3>,
}

impl SpawnPoints {
    /// Creates a level layout.
    #[must_use]
    pub fn new(players: Vec<SpawnPoint>, npcs: Vec<Vec3>) -> Self {
        Self { players, npcs }
    }

    /// A small symmetric arena with `per_side` points for each side.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn arena(per_side: usize) -> Self {
        let mut players = Vec::with_capacity(per_side * 2);
        for i in 0..per_side {
            let offset = i as f32 * 2.0;
            players.push(SpawnPoint::new(Vec3::new(offset, 0.0, -20.0), 0.0, Side::Attackers));
            players.push(SpawnPoint::new(
                Vec3::new(offset, 0.0, 20.0),
                std::f32::consts::PI,
                Side::Defenders,
            ));
        }
        let npcs = (0..8)
            .map(|i| Vec3::new(-10.0 + i as f32 * 3.0, 0.0, 5.0))
            .collect();
        Self { players, npcs }
    }

    /// Claims the first point on `side` that is free or already held by
    /// `participant`. `None` means the caller stalls and retries next tick.
    pub fn claim(&mut self, side: Side, participant: ParticipantId) -> Option<(Vec3, f32)> {
        let point = self.players.iter_mut().find(|p| {
            p.side == side && (p.owner.is_none() || p.owner == Some(participant))
        })?;
        point.owner = Some(participant);
        Some((point.position, point.yaw))
    }

    /// Releases every point held by `participant`.
    pub fn release(&mut self, participant: ParticipantId) {
        for point in &mut self.players {
            if point.owner == Some(participant) {
                point.owner = None;
            }
        }
    }

    /// Releases every point.
    pub fn release_all(&mut self) {
        for point in &mut self.players {
            point.owner = None;
        }
    }

    /// Picks `count` NPC positions. Points repeat only once every point has
    /// been used.
    pub fn npc_positions(&self, count: usize, rng: &mut ChaCha8Rng) -> Vec<Vec3> {
        if self.npcs.is_empty() {
            return Vec::new();
        }
        let mut pool: Vec<Vec3> = Vec::with_capacity(self.npcs.len());
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            if pool.is_empty() {
                pool.extend_from_slice(&self.npcs);
            }
            let pick = rng.gen_range(0..pool.len());
            out.push(pool.swap_remove(pick));
        }
        out
    }

    /// Player points.
    #[must_use]
    pub fn players(&self) -> &[SpawnPoint] {
        &self.players
    }
}
