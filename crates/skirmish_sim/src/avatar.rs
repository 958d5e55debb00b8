//! # Avatars and NPCs
//!
//! An [`Avatar`] is the authority-side state of one participant's actor:
//! binding (side, character, progression), movement, health, lifecycle and
//! loadout. Reading input produces [`Intent`]s; resolving them against the
//! world (hit registration, projectiles, revives) is the world's job, so an
//! avatar never touches another entity.
//!
//! Avatars are never re-bound in place. Changing character builds a fresh
//! avatar from the old one's [`Binding`].

use rand::Rng;
use skirmish_core::{EntityId, Tick, TickRate, TickTimer};
use skirmish_shared::config::WeaponsConfig;
use skirmish_shared::constants::GRAVITY;
use skirmish_shared::{Button, Buttons, Character, SessionConfig, Side, TickInput, Vec3};

use crate::action::{Delivery, Execution, Loadout};
use crate::health::Health;
use crate::history::{Collider, Hitbox};
use crate::ids::{ParticipantId, Slot};
use crate::lifecycle::{Lifecycle, Stage};
use crate::progression::Profile;

/// Height of the aim origin above the feet.
pub const EYE_HEIGHT: f32 = 1.5;
/// Height of the body volume center.
const BODY_HEIGHT: f32 = 1.0;
/// Height and radius of the head volume.
const HEAD_HEIGHT: f32 = 1.7;
const HEAD_RADIUS: f32 = 0.25;
/// Damage multiplier of the head volume.
pub const HEAD_MULTIPLIER: f32 = 2.0;

/// What a participant is bound to. Survives re-binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    /// Owning participant.
    pub participant: ParticipantId,
    /// Owning slot.
    pub slot: Slot,
    /// Side.
    pub side: Side,
    /// Character.
    pub character: Character,
    /// Progression.
    pub profile: Profile,
}

/// Which action an intent came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionSlot {
    /// Primary attack button.
    Primary,
    /// Secondary attack button.
    Secondary,
}

/// Something an avatar wants the world to resolve.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    /// An action executed.
    Execute {
        /// Source button.
        slot: ActionSlot,
        /// What executed.
        execution: Execution,
        /// Aim origin.
        origin: Vec3,
        /// Aim point.
        aim: Vec3,
    },
    /// A defender asked to revive NPCs around `center`.
    Revive {
        /// Reviver position.
        center: Vec3,
    },
    /// Cycle character (lobby).
    SwitchCharacter,
    /// Toggle readiness (lobby).
    ToggleReady,
}

/// Authority-side avatar.
#[derive(Clone, Debug)]
pub struct Avatar {
    id: EntityId,
    binding: Binding,
    ready: bool,
    position: Vec3,
    yaw: f32,
    velocity: Vec3,
    vertical: f32,
    grounded: bool,
    health: Health,
    lifecycle: Lifecycle,
    loadout: Loadout,
    previous_buttons: Buttons,
    block_input: bool,
    jumps: u32,
    speed_bonus: f32,
    boost: TickTimer,
    radius: f32,
}

impl Avatar {
    /// A new avatar waiting for its first placement.
    #[must_use]
    pub fn new(
        id: EntityId,
        binding: Binding,
        session: &SessionConfig,
        weapons: &WeaponsConfig,
        rate: TickRate,
        now: Tick,
    ) -> Self {
        let loadout = Loadout::for_character(binding.character, weapons, rate);
        Self {
            id,
            binding,
            ready: false,
            position: Vec3::ZERO,
            yaw: 0.0,
            velocity: Vec3::ZERO,
            vertical: 0.0,
            grounded: true,
            health: Health::new(session.max_health),
            lifecycle: Lifecycle::spawned(now),
            loadout,
            previous_buttons: Buttons::NONE,
            block_input: false,
            jumps: 0,
            speed_bonus: 0.0,
            boost: TickTimer::NONE,
            radius: session.avatar_radius,
        }
    }

    /// Places the avatar at a claimed spawn point: full health, starting
    /// ammo, invulnerability, teleport-in timer.
    pub fn place(&mut self, position: Vec3, yaw: f32, now: Tick, session: &SessionConfig, rate: TickRate) {
        self.position = position;
        self.yaw = yaw;
        self.velocity = Vec3::ZERO;
        self.vertical = 0.0;
        self.grounded = true;
        self.health.restore();
        self.health
            .set_invulnerable(TickTimer::from_secs(now, rate, session.invulnerability_secs));
        self.loadout.rearm();
        self.lifecycle
            .placed(now, rate.ticks_for_secs(session.teleport_in_secs));
        tracing::debug!(entity = %self.id, slot = %self.binding.slot, "avatar placed");
    }

    /// Per-tick upkeep that runs with or without input.
    pub fn upkeep(&mut self, now: Tick) {
        if self.lifecycle.try_activate(now) {
            tracing::debug!(entity = %self.id, "avatar active");
        }
        self.loadout.update(now);
        if self.boost.expired(now) {
            self.boost.reset();
            self.speed_bonus = 0.0;
        }
    }

    /// Reads one tick of input.
    ///
    /// Lobby-only buttons produce intents only when `in_lobby`.
    pub fn process_input(
        &mut self,
        input: &TickInput,
        now: Tick,
        in_lobby: bool,
        session: &SessionConfig,
        rate: TickRate,
    ) -> Vec<Intent> {
        let buttons = input.buttons;
        let previous = self.previous_buttons;
        self.previous_buttons = buttons;
        let pressed = |b: Button| buttons.was_pressed(previous, b);

        if pressed(Button::Pause) {
            self.block_input = !self.block_input;
        }
        if self.block_input {
            return Vec::new();
        }

        let mut intents = Vec::new();
        if in_lobby {
            if pressed(Button::SwitchCharacter) {
                intents.push(Intent::SwitchCharacter);
            }
            if pressed(Button::Ready) {
                intents.push(Intent::ToggleReady);
            }
        }

        if self.lifecycle.grants_movement() {
            self.walk(input, pressed(Button::Jump), session, rate);
        }

        if self.lifecycle.stage() != Stage::Active {
            return intents;
        }

        if pressed(Button::Reload) && self.loadout.primary.reload(now) {
            tracing::debug!(entity = %self.id, "reload");
        }

        let origin = self.aim_origin();
        let aim = input.aim_point;
        if let Some(execution) = self.loadout.primary.trigger(
            buttons.is_set(Button::PrimaryAttack),
            pressed(Button::PrimaryAttack),
            now,
        ) {
            intents.push(Intent::Execute {
                slot: ActionSlot::Primary,
                execution,
                origin,
                aim,
            });
        }

        let grounded_ok = !self.loadout.secondary.requires_ground() || self.grounded;
        if grounded_ok {
            if let Some(execution) = self.loadout.secondary.trigger(
                buttons.is_set(Button::SecondaryAttack),
                pressed(Button::SecondaryAttack),
                now,
            ) {
                if let Delivery::Boost {
                    impulse,
                    speed_bonus,
                    effect_secs,
                } = execution.delivery
                {
                    self.vertical = impulse;
                    self.grounded = false;
                    self.speed_bonus = speed_bonus;
                    self.boost = TickTimer::from_secs(now, rate, effect_secs);
                } else {
                    intents.push(Intent::Execute {
                        slot: ActionSlot::Secondary,
                        execution,
                        origin,
                        aim,
                    });
                }
            }
        }

        if pressed(Button::Revive) && self.binding.side == Side::Defenders {
            intents.push(Intent::Revive {
                center: self.position,
            });
        }
        intents
    }

    fn walk(&mut self, input: &TickInput, jump: bool, session: &SessionConfig, rate: TickRate) {
        let dt = rate.dt();
        let speed = session.move_speed + self.speed_bonus;
        let desired = Vec3::new(input.move_direction.x, 0.0, input.move_direction.y) * speed;
        let rate_limit = if desired.is_zero() {
            session.ground_deceleration
        } else {
            session.ground_acceleration
        };
        let delta = desired - self.velocity;
        let max_step = rate_limit * dt;
        self.velocity = if delta.length() <= max_step {
            desired
        } else {
            self.velocity + delta.normalized() * max_step
        };

        if jump && self.grounded {
            self.vertical = session.jump_impulse;
            self.grounded = false;
            self.jumps = self.jumps.wrapping_add(1);
        }
        if !self.grounded {
            self.vertical -= GRAVITY * dt;
        }

        self.position += (self.velocity + Vec3::Y * self.vertical) * dt;
        if self.position.y <= 0.0 {
            self.position.y = 0.0;
            self.vertical = 0.0;
            self.grounded = true;
        }
    }

    /// Hit volumes, if targetable.
    pub fn hitboxes(&self) -> impl Iterator<Item = Hitbox> + '_ {
        let live = self.lifecycle.is_targetable();
        let body = Hitbox {
            owner: self.id,
            center: self.position + Vec3::Y * BODY_HEIGHT,
            radius: self.radius,
            multiplier: 1.0,
        };
        let head = Hitbox {
            owner: self.id,
            center: self.position + Vec3::Y * HEAD_HEIGHT,
            radius: HEAD_RADIUS,
            multiplier: HEAD_MULTIPLIER,
        };
        [body, head].into_iter().filter(move |_| live)
    }

    /// Point actions fire from.
    #[must_use]
    pub fn aim_origin(&self) -> Vec3 {
        self.position + Vec3::Y * EYE_HEIGHT
    }

    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Binding.
    #[must_use]
    pub const fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Mutable progression.
    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.binding.profile
    }

    /// Lobby readiness.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Sets lobby readiness.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Feet position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Moves the avatar without physics.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Facing.
    #[must_use]
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    /// True if standing on the ground.
    #[must_use]
    pub const fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Health.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Mutable health.
    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    /// Lifecycle.
    #[must_use]
    pub const fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Mutable lifecycle.
    pub fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    /// Loadout.
    #[must_use]
    pub const fn loadout(&self) -> &Loadout {
        &self.loadout
    }

    /// Jumps taken.
    #[must_use]
    pub const fn jumps(&self) -> u32 {
        self.jumps
    }

    /// True while input is blocked by Pause.
    #[must_use]
    pub const fn input_blocked(&self) -> bool {
        self.block_input
    }

    /// Extra speed from a boost.
    #[must_use]
    pub const fn speed_bonus(&self) -> f32 {
        self.speed_bonus
    }
}

/// A non-player actor. Attackers kill them, defenders revive them.
///
/// While alive it wanders: it walks straight at a target point picked at
/// random within the wander radius of its spawn point, and picks a new one
/// once within the arrive distance. An NPC that was blocked by geometry on
/// the previous tick hops and gives up on its target. Dead NPCs stay where
/// they fell.
#[derive(Clone, Debug)]
pub struct Npc {
    id: EntityId,
    position: Vec3,
    home: Vec3,
    target: Option<Vec3>,
    vertical: f32,
    grounded: bool,
    stalled: bool,
    jumps: u32,
    health: Health,
    deaths: u32,
    radius: f32,
}

impl Npc {
    /// A living NPC standing on its spawn point.
    #[must_use]
    pub fn new(id: EntityId, position: Vec3, max_health: f32, radius: f32) -> Self {
        Self {
            id,
            position,
            home: position,
            target: None,
            vertical: 0.0,
            grounded: true,
            stalled: false,
            jumps: 0,
            health: Health::new(max_health),
            deaths: 0,
            radius,
        }
    }

    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Where it spawned; the center of its wander area.
    #[must_use]
    pub const fn home(&self) -> Vec3 {
        self.home
    }

    /// Current wander target.
    #[must_use]
    pub const fn target(&self) -> Option<Vec3> {
        self.target
    }

    /// Hops taken. Presentation-only.
    #[must_use]
    pub const fn jumps(&self) -> u32 {
        self.jumps
    }

    /// Health.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Mutable health.
    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    /// Deaths. Presentation-only.
    #[must_use]
    pub const fn deaths(&self) -> u32 {
        self.deaths
    }

    /// Records a death.
    pub fn record_death(&mut self) {
        self.deaths = self.deaths.wrapping_add(1);
        self.target = None;
    }

    /// Back to full health. False if it was not dead.
    pub fn revive(&mut self) -> bool {
        if self.health.is_alive() {
            return false;
        }
        self.health.restore();
        true
    }

    /// One tick of movement. `walls` block horizontal steps.
    pub fn step<R: Rng + ?Sized>(&mut self, session: &SessionConfig, rate: TickRate, rng: &mut R, walls: &[Collider]) {
        let dt = rate.dt();
        if self.health.is_alive() {
            if self.stalled && self.grounded {
                self.vertical = session.npc_jump_impulse;
                self.grounded = false;
                self.jumps = self.jumps.wrapping_add(1);
                self.target = None;
            }
            let target = match self.target {
                Some(target) if flat(target - self.position).length() > session.npc_arrive_distance => target,
                _ => {
                    let target = self.pick_target(session.npc_wander_radius, rng);
                    self.target = Some(target);
                    target
                }
            };

            let to_target = flat(target - self.position);
            let reach = (session.npc_move_speed * dt).min(to_target.length());
            let next = self.position + to_target.normalized() * reach;
            let chest = Vec3::Y * BODY_HEIGHT;
            self.stalled = reach > 0.0
                && walls
                    .iter()
                    .any(|wall| wall.intersects_segment(self.position + chest, next + chest));
            if !self.stalled {
                self.position.x = next.x;
                self.position.z = next.z;
            }
        } else {
            self.stalled = false;
        }

        if !self.grounded {
            self.vertical -= GRAVITY * dt;
        }
        self.position.y += self.vertical * dt;
        if self.position.y <= 0.0 {
            self.position.y = 0.0;
            self.vertical = 0.0;
            self.grounded = true;
        }
    }

    /// Uniform over the disc of `radius` around home.
    fn pick_target<R: Rng + ?Sized>(&self, radius: f32, rng: &mut R) -> Vec3 {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = radius * rng.gen::<f32>().sqrt();
        Vec3::new(
            self.home.x + angle.cos() * distance,
            0.0,
            self.home.z + angle.sin() * distance,
        )
    }

    /// Hit volume. Kept while dead so a revive can find it.
    #[must_use]
    pub fn hitbox(&self) -> Hitbox {
        Hitbox {
            owner: self.id,
            center: self.position + Vec3::Y * BODY_HEIGHT,
            radius: self.radius,
            multiplier: 1.0,
        }
    }
}

fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use skirmish_shared::Vec2;

    fn avatar(character: Character) -> Avatar {
        let binding = Binding {
            participant: ParticipantId(1),
            slot: Slot(0),
            side: character.side(),
            character,
            profile: Profile::new("t"),
        };
        Avatar::new(
            EntityId::new(1, 0),
            binding,
            &SessionConfig::default(),
            &WeaponsConfig::default(),
            TickRate::new(60),
            Tick(0),
        )
    }

    fn activate(a: &mut Avatar) {
        let rate = TickRate::new(60);
        a.place(Vec3::ZERO, 0.0, Tick(0), &SessionConfig::default(), rate);
        a.upkeep(Tick(60));
        assert_eq!(a.lifecycle().stage(), Stage::Active);
    }

    #[test]
    fn test_fire_intent_only_when_active() {
        let rate = TickRate::new(60);
        let cfg = SessionConfig::default();
        let mut a = avatar(Character::Maverick);
        let fire = TickInput::idle(0).with_buttons(&[Button::PrimaryAttack]);
        assert!(a.process_input(&fire, Tick(0), false, &cfg, rate).is_empty());

        activate(&mut a);
        let intents = a.process_input(&fire, Tick(60), false, &cfg, rate);
        assert!(matches!(
            intents.as_slice(),
            [Intent::Execute {
                slot: ActionSlot::Primary,
                ..
            }]
        ));
        assert_eq!(a.loadout().primary.resource().clip(), 63);
    }

    #[test]
    fn test_pause_blocks_input() {
        let rate = TickRate::new(60);
        let cfg = SessionConfig::default();
        let mut a = avatar(Character::Maverick);
        activate(&mut a);
        let pause = TickInput::idle(60).with_buttons(&[Button::Pause]);
        assert!(a.process_input(&pause, Tick(60), false, &cfg, rate).is_empty());
        assert!(a.input_blocked());
        let fire = TickInput::idle(61).with_buttons(&[Button::PrimaryAttack]);
        assert!(a.process_input(&fire, Tick(61), false, &cfg, rate).is_empty());
    }

    #[test]
    fn test_jump_counts_and_lands() {
        let rate = TickRate::new(60);
        let cfg = SessionConfig::default();
        let mut a = avatar(Character::Maverick);
        activate(&mut a);
        let jump = TickInput::idle(60).with_buttons(&[Button::Jump]);
        a.process_input(&jump, Tick(60), false, &cfg, rate);
        assert_eq!(a.jumps(), 1);
        assert!(!a.is_grounded());
        for t in 61..200 {
            a.process_input(&TickInput::idle(t), Tick(t), false, &cfg, rate);
        }
        assert!(a.is_grounded());
        assert!(a.position().y.abs() < f32::EPSILON);
    }

    #[test]
    fn test_walk_accelerates_to_speed() {
        let rate = TickRate::new(60);
        let cfg = SessionConfig::default();
        let mut a = avatar(Character::Bulwark);
        activate(&mut a);
        let mut input = TickInput::idle(60);
        input.move_direction = Vec2::new(0.0, 1.0);
        for t in 60..120 {
            input.tick = t;
            a.process_input(&input, Tick(t), false, &cfg, rate);
        }
        assert!(a.position().z > 4.0);
    }

    #[test]
    fn test_jetpack_boost_grounded_only() {
        let rate = TickRate::new(60);
        let cfg = SessionConfig::default();
        let mut a = avatar(Character::Bulwark);
        activate(&mut a);
        let boost = TickInput::idle(60).with_buttons(&[Button::SecondaryAttack]);
        let intents = a.process_input(&boost, Tick(60), false, &cfg, rate);
        assert!(intents.is_empty());
        assert!(!a.is_grounded());
        assert!((a.speed_bonus() - 10.0).abs() < f32::EPSILON);
        assert_eq!(a.loadout().secondary.resource().executions(), 1);
    }

    #[test]
    fn test_lobby_buttons() {
        let rate = TickRate::new(60);
        let cfg = SessionConfig::default();
        let mut a = avatar(Character::Maverick);
        let input = TickInput::idle(0).with_buttons(&[Button::Ready, Button::SwitchCharacter]);
        let intents = a.process_input(&input, Tick(0), true, &cfg, rate);
        assert_eq!(intents, vec![Intent::SwitchCharacter, Intent::ToggleReady]);
        let again = a.process_input(&input, Tick(1), false, &cfg, rate);
        assert!(again.is_empty());
    }

    #[test]
    fn test_npc_revive() {
        let mut npc = Npc::new(EntityId::new(2, 0), Vec3::ZERO, 100.0, 0.5);
        assert!(!npc.revive());
        let hit = crate::health::DamageHit {
            amount: 200.0,
            point: Vec3::ZERO,
            direction: Vec3::X,
            critical: false,
        };
        npc.health_mut().apply(&hit, Vec3::ZERO, Tick(0));
        // The corpse keeps its volume so revives can find it
        assert_eq!(npc.hitbox().owner, npc.id());
        assert!(npc.revive());
        assert!(!npc.revive());
    }

    #[test]
    fn test_npc_wanders_within_radius() {
        let rate = TickRate::new(60);
        let cfg = SessionConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let home = Vec3::new(4.0, 0.0, -3.0);
        let mut npc = Npc::new(EntityId::new(2, 0), home, 100.0, 0.5);

        let mut targets = Vec::new();
        for _ in 0..1200 {
            npc.step(&cfg, rate, &mut rng, &[]);
            let offset = npc.position() - home;
            let flat = Vec3::new(offset.x, 0.0, offset.z).length();
            assert!(flat <= cfg.npc_wander_radius + 1e-3, "left its area: {flat}");
            if let Some(target) = npc.target() {
                if targets.last() != Some(&target) {
                    targets.push(target);
                }
            }
        }
        assert!(npc.position().distance(home) > 0.0);
        // Arrived at least once and picked again
        assert!(targets.len() > 1);
        assert_eq!(npc.jumps(), 0);
    }

    #[test]
    fn test_npc_step_is_rate_limited() {
        let rate = TickRate::new(60);
        let cfg = SessionConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut npc = Npc::new(EntityId::new(2, 0), Vec3::ZERO, 100.0, 0.5);
        let before = npc.position();
        npc.step(&cfg, rate, &mut rng, &[]);
        assert!(npc.position().distance(before) <= cfg.npc_move_speed * rate.dt() + 1e-4);
    }

    #[test]
    fn test_blocked_npc_hops_and_retargets() {
        let rate = TickRate::new(60);
        let cfg = SessionConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut npc = Npc::new(EntityId::new(2, 0), Vec3::ZERO, 100.0, 0.5);
        // Boxed in on every side
        let cage = [
            Collider::from_center(Vec3::new(0.08, 1.0, 0.0), Vec3::new(0.02, 2.0, 2.0), None),
            Collider::from_center(Vec3::new(-0.08, 1.0, 0.0), Vec3::new(0.02, 2.0, 2.0), None),
            Collider::from_center(Vec3::new(0.0, 1.0, 0.08), Vec3::new(2.0, 2.0, 0.02), None),
            Collider::from_center(Vec3::new(0.0, 1.0, -0.08), Vec3::new(2.0, 2.0, 0.02), None),
        ];

        npc.step(&cfg, rate, &mut rng, &cage);
        let first = npc.target();
        assert_eq!(npc.jumps(), 0);
        assert_eq!(Vec3::new(npc.position().x, 0.0, npc.position().z), Vec3::ZERO);

        npc.step(&cfg, rate, &mut rng, &cage);
        assert_eq!(npc.jumps(), 1);
        assert_ne!(npc.target(), first);
        assert!(npc.position().y > 0.0);
    }

    #[test]
    fn test_dead_npc_stays_put() {
        let rate = TickRate::new(60);
        let cfg = SessionConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut npc = Npc::new(EntityId::new(2, 0), Vec3::ZERO, 100.0, 0.5);
        for _ in 0..30 {
            npc.step(&cfg, rate, &mut rng, &[]);
        }
        let hit = crate::health::DamageHit {
            amount: 200.0,
            point: Vec3::ZERO,
            direction: Vec3::X,
            critical: false,
        };
        let origin = npc.position();
        npc.health_mut().apply(&hit, origin, Tick(30));
        npc.record_death();
        let fallen = npc.position();
        for _ in 0..60 {
            npc.step(&cfg, rate, &mut rng, &[]);
        }
        assert_eq!(npc.position(), fallen);
        assert!(npc.target().is_none());
    }
}
