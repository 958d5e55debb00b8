//! # Actions
//!
//! Actions are composed from a fixed set of capabilities instead of a class
//! hierarchy:
//!
//! | Capability        | Rifle | Rocket | Machete | Molotov | Jetpack |
//! |-------------------|:-----:|:------:|:-------:|:-------:|:-------:|
//! | has clip ammo     |   x   |   x    |         |         |         |
//! | cooldown only     |       |        |    x    |    x    |    x    |
//! | fires projectile  |       |   x    |         |    x    |         |
//! | area effect       |       |   x    |         |    x    |         |
//!
//! Every action owns a [`ResourceRecord`]. Triggering an action only decides
//! *whether* it executes this tick; what the execution does to the world is
//! described by its [`Delivery`] and resolved by the world.

use skirmish_core::{Tick, TickRate};
use skirmish_shared::config::{
    AreaConfig, BlastConfig, ProjectileConfig, WeaponsConfig,
};
use skirmish_shared::Character;

use crate::resource::ResourceRecord;

/// The concrete actions in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionKind {
    /// Automatic hitscan rifle.
    Rifle = 0,
    /// Rocket launcher.
    Rocket = 1,
    /// Melee combo weapon.
    Machete = 2,
    /// Thrown incendiary.
    Molotov = 3,
    /// Grounded boost.
    Jetpack = 4,
}

/// How an action is gated by the trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Executes every tick the button is held.
    Automatic,
    /// Executes only on the tick the button goes down.
    OnPress,
}

/// What happens when a projectile lands.
#[derive(Clone, Debug, PartialEq)]
pub enum Impact {
    /// Instant falloff damage around the impact point.
    Blast(BlastConfig),
    /// A lingering damage zone.
    Area(AreaConfig),
}

/// What an execution does to the world.
#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    /// Instant ray against world history.
    Hitscan {
        /// Damage per ray.
        damage: f32,
        /// Ray length.
        max_distance: f32,
        /// Rays per execution.
        rays: u32,
        /// Random cone half-angle in degrees.
        dispersion_degrees: f32,
    },
    /// A simulated projectile.
    Projectile {
        /// Flight parameters.
        flight: ProjectileConfig,
        /// Landing behaviour.
        impact: Impact,
    },
    /// Overlap in front of the attacker.
    Melee {
        /// Damage per combo step.
        damage: f32,
        /// Overlap radius.
        radius: f32,
        /// Combo length; the last step is critical.
        max_combo: u8,
    },
    /// Self-applied movement boost.
    Boost {
        /// Vertical impulse.
        impulse: f32,
        /// Added move speed while the effect lasts.
        speed_bonus: f32,
        /// Effect duration.
        effect_secs: f32,
    },
}

/// One successful trigger.
#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    /// Which action executed.
    pub kind: ActionKind,
    /// What to resolve.
    pub delivery: Delivery,
    /// Combo step for melee (1-based), 0 otherwise.
    pub combo: u8,
    /// Critical by construction (final combo step).
    pub critical: bool,
}

/// An action and its resource state.
#[derive(Clone, Debug)]
pub struct Action {
    kind: ActionKind,
    trigger: Trigger,
    delivery: Delivery,
    resource: ResourceRecord,
    combo: u8,
}

impl Action {
    /// Builds an action from configuration.
    #[must_use]
    pub fn new(kind: ActionKind, weapons: &WeaponsConfig, rate: TickRate) -> Self {
        let (config, trigger, delivery) = match kind {
            ActionKind::Rifle => {
                let rifle = &weapons.rifle;
                let trigger = if rifle.automatic {
                    Trigger::Automatic
                } else {
                    Trigger::OnPress
                };
                (
                    &rifle.action,
                    trigger,
                    Delivery::Hitscan {
                        damage: rifle.damage,
                        max_distance: rifle.max_distance,
                        rays: rifle.projectiles_per_shot.max(1),
                        dispersion_degrees: rifle.dispersion_degrees,
                    },
                )
            }
            ActionKind::Rocket => (
                &weapons.rocket.action,
                Trigger::OnPress,
                Delivery::Projectile {
                    flight: weapons.rocket.projectile.clone(),
                    impact: Impact::Blast(weapons.rocket.blast.clone()),
                },
            ),
            ActionKind::Machete => (
                &weapons.machete.action,
                Trigger::OnPress,
                Delivery::Melee {
                    damage: weapons.machete.damage,
                    radius: weapons.machete.radius,
                    max_combo: weapons.machete.max_combo.max(1),
                },
            ),
            ActionKind::Molotov => (
                &weapons.molotov.action,
                Trigger::OnPress,
                Delivery::Projectile {
                    flight: weapons.molotov.projectile.clone(),
                    impact: Impact::Area(weapons.molotov.area.clone()),
                },
            ),
            ActionKind::Jetpack => (
                &weapons.jetpack.action,
                Trigger::OnPress,
                Delivery::Boost {
                    impulse: weapons.jetpack.impulse,
                    speed_bonus: weapons.jetpack.speed_bonus,
                    effect_secs: weapons.jetpack.effect_secs,
                },
            ),
        };
        Self {
            kind,
            trigger,
            delivery,
            resource: ResourceRecord::new(config, rate),
            combo: 0,
        }
    }

    /// Runs the trigger gate and the resource check.
    ///
    /// `held` is the button state this tick, `just_pressed` its rising edge.
    pub fn trigger(&mut self, held: bool, just_pressed: bool, now: Tick) -> Option<Execution> {
        let gate = match self.trigger {
            Trigger::Automatic => held,
            Trigger::OnPress => just_pressed,
        };
        if !gate || !self.resource.try_execute(now) {
            return None;
        }

        let (combo, critical) = match self.delivery {
            Delivery::Melee { max_combo, .. } => {
                self.combo = self.combo % max_combo + 1;
                (self.combo, self.combo == max_combo)
            }
            _ => (0, false),
        };
        Some(Execution {
            kind: self.kind,
            delivery: self.delivery.clone(),
            combo,
            critical,
        })
    }

    /// Explicit reload request.
    pub fn reload(&mut self, now: Tick) -> bool {
        self.resource.request_reload(now)
    }

    /// Per-tick resource upkeep.
    pub fn update(&mut self, now: Tick) {
        self.resource.update(now);
    }

    /// Restores starting ammo and clears timers.
    pub fn rearm(&mut self) {
        self.resource.rearm();
    }

    /// Action kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Resource state.
    #[inline]
    #[must_use]
    pub const fn resource(&self) -> &ResourceRecord {
        &self.resource
    }

    /// Delivery description.
    #[inline]
    #[must_use]
    pub const fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Current melee combo step (0 before the first swing).
    #[inline]
    #[must_use]
    pub const fn combo(&self) -> u8 {
        self.combo
    }

    /// Uses clip ammunition.
    #[must_use]
    pub const fn has_clip(&self) -> bool {
        self.resource.is_consumable()
    }

    /// Only limited by its cooldown.
    #[must_use]
    pub const fn is_cooldown_only(&self) -> bool {
        !self.resource.is_consumable()
    }

    /// Spawns a projectile.
    #[must_use]
    pub const fn fires_projectile(&self) -> bool {
        matches!(self.delivery, Delivery::Projectile { .. })
    }

    /// Leaves a lingering damage zone where its projectile lands.
    #[must_use]
    pub const fn is_area_effect(&self) -> bool {
        matches!(
            self.delivery,
            Delivery::Projectile {
                impact: Impact::Area(_),
                ..
            }
        )
    }

    /// Needs the avatar on the ground.
    #[must_use]
    pub const fn requires_ground(&self) -> bool {
        matches!(self.delivery, Delivery::Boost { .. })
    }
}

/// The two actions a character carries.
#[derive(Clone, Debug)]
pub struct Loadout {
    /// Bound to the primary attack button.
    pub primary: Action,
    /// Bound to the secondary attack button.
    pub secondary: Action,
}

impl Loadout {
    /// The fixed loadout for a character.
    #[must_use]
    pub fn for_character(character: Character, weapons: &WeaponsConfig, rate: TickRate) -> Self {
        let (primary, secondary) = match character {
            Character::Bulwark => (ActionKind::Rifle, ActionKind::Jetpack),
            Character::Maverick => (ActionKind::Rifle, ActionKind::Molotov),
            Character::Zaphyr => (ActionKind::Machete, ActionKind::Jetpack),
            Character::Nadja => (ActionKind::Rocket, ActionKind::Molotov),
        };
        Self {
            primary: Action::new(primary, weapons, rate),
            secondary: Action::new(secondary, weapons, rate),
        }
    }

    /// Upkeep for both actions.
    pub fn update(&mut self, now: Tick) {
        self.primary.update(now);
        self.secondary.update(now);
    }

    /// Restores starting ammo on both actions.
    pub fn rearm(&mut self) {
        self.primary.rearm();
        self.secondary.rearm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weapons() -> WeaponsConfig {
        WeaponsConfig::default()
    }

    #[test]
    fn test_loadouts() {
        let rate = TickRate::new(60);
        let nadja = Loadout::for_character(Character::Nadja, &weapons(), rate);
        assert_eq!(nadja.primary.kind(), ActionKind::Rocket);
        assert_eq!(nadja.secondary.kind(), ActionKind::Molotov);
        assert!(nadja.primary.has_clip());
        assert!(nadja.primary.fires_projectile());
        assert!(nadja.secondary.is_cooldown_only());
        assert!(nadja.secondary.fires_projectile());
        assert!(nadja.secondary.is_area_effect());

        let bulwark = Loadout::for_character(Character::Bulwark, &weapons(), rate);
        assert_eq!(bulwark.primary.kind(), ActionKind::Rifle);
        assert!(bulwark.secondary.requires_ground());
        assert!(!bulwark.primary.fires_projectile());
    }

    #[test]
    fn test_only_lingering_impacts_are_area_effects() {
        let rate = TickRate::new(60);
        let rocket = Action::new(ActionKind::Rocket, &weapons(), rate);
        let molotov = Action::new(ActionKind::Molotov, &weapons(), rate);
        let rifle = Action::new(ActionKind::Rifle, &weapons(), rate);
        // Both throw a projectile but only the molotov lingers
        assert!(rocket.fires_projectile() && !rocket.is_area_effect());
        assert!(molotov.fires_projectile() && molotov.is_area_effect());
        assert!(!rifle.is_area_effect());
    }

    #[test]
    fn test_automatic_vs_on_press() {
        let rate = TickRate::new(60);
        let mut rifle = Action::new(ActionKind::Rifle, &weapons(), rate);
        // Held without a fresh press still fires
        assert!(rifle.trigger(true, false, Tick(0)).is_some());

        let mut rocket = Action::new(ActionKind::Rocket, &weapons(), rate);
        assert!(rocket.trigger(true, false, Tick(0)).is_none());
        assert!(rocket.trigger(true, true, Tick(0)).is_some());
        assert_eq!(rocket.resource().clip(), 11);
    }

    #[test]
    fn test_machete_combo_cycles() {
        let rate = TickRate::new(60);
        let mut machete = Action::new(ActionKind::Machete, &weapons(), rate);
        let mut steps = Vec::new();
        let mut now = Tick(0);
        for _ in 0..4 {
            let exec = machete.trigger(true, true, now).unwrap();
            steps.push((exec.combo, exec.critical));
            now = now + machete.resource().fire_ticks();
        }
        assert_eq!(steps, vec![(1, false), (2, false), (3, true), (1, false)]);
    }

    #[test]
    fn test_jetpack_recharges() {
        let rate = TickRate::new(60);
        let mut jetpack = Action::new(ActionKind::Jetpack, &weapons(), rate);
        assert!(jetpack.trigger(true, true, Tick(0)).is_some());
        assert!(jetpack.resource().is_reloading());
        assert!(jetpack.trigger(true, true, Tick(100)).is_none());
        jetpack.update(Tick(300));
        assert!(jetpack.trigger(true, true, Tick(300)).is_some());
    }
}
