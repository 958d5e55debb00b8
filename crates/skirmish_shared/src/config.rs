//! # Simulation Configuration
//!
//! Every tunable of the match lives here, grouped by concern. Files are TOML
//! and only need to name the keys they override:
//!
//! ```toml
//! [tick]
//! rate = 30
//!
//! [session]
//! match_duration_secs = 120.0
//!
//! [weapons.rifle]
//! damage = 12.0
//! ```
//!
//! Durations are authored in seconds and quantized to ticks by the
//! simulation, never the other way round.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{HISTORY_TICKS, MAX_PARTICIPANTS, TICK_RATE};

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed, but the values make no sense together.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// ROOT
// =============================================================================

/// Complete simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Tick rate and lag-compensation depth.
    pub tick: TickConfig,
    /// Match, population and respawn rules.
    pub session: SessionConfig,
    /// Points awarded per event.
    pub scoring: ScoringConfig,
    /// Level-transition pacing.
    pub transition: TransitionConfig,
    /// Per-action tuning.
    pub weapons: WeaponsConfig,
    /// End-of-match progression rules.
    pub progression: ProgressionConfig,
}

impl SimConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`SimConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tick.rate == 0 {
            return Err(ConfigError::Invalid("tick.rate must be > 0".into()));
        }
        if self.tick.history_ticks == 0 {
            return Err(ConfigError::Invalid("tick.history_ticks must be > 0".into()));
        }
        if self.session.capacity == 0 || self.session.capacity > MAX_PARTICIPANTS {
            return Err(ConfigError::Invalid(format!(
                "session.capacity must be in 1..={MAX_PARTICIPANTS}, got {}",
                self.session.capacity
            )));
        }
        if self.session.max_health <= 0.0 {
            return Err(ConfigError::Invalid("session.max_health must be > 0".into()));
        }
        if self.session.npc_move_speed < 0.0 || self.session.npc_wander_radius < 0.0 {
            return Err(ConfigError::Invalid("session npc speed and wander radius must be >= 0".into()));
        }
        let blast = &self.weapons.rocket.blast;
        if blast.min_damage > blast.max_damage {
            return Err(ConfigError::Invalid(format!(
                "weapons.rocket.blast: min_damage {} exceeds max_damage {}",
                blast.min_damage, blast.max_damage
            )));
        }
        if blast.radius <= 0.0 || self.weapons.molotov.area.radius <= 0.0 {
            return Err(ConfigError::Invalid("area radii must be > 0".into()));
        }
        if self.weapons.molotov.area.interval_secs <= 0.0 {
            return Err(ConfigError::Invalid(
                "weapons.molotov.area.interval_secs must be > 0".into(),
            ));
        }
        if self.progression.min_rank == 0 || self.progression.min_rank > self.progression.max_rank {
            return Err(ConfigError::Invalid("progression rank bounds are inverted".into()));
        }
        Ok(())
    }

    /// Length of one tick in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick.rate as f32
    }
}

// =============================================================================
// SECTIONS
// =============================================================================

/// Tick scheduling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Decision ticks per second.
    pub rate: u32,
    /// Ticks of world history kept for lag compensation.
    pub history_ticks: u32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            rate: TICK_RATE,
            history_ticks: HISTORY_TICKS,
        }
    }
}

/// Population, match length and avatar rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Participant slots.
    pub capacity: usize,
    /// Length of the Level phase.
    pub match_duration_secs: f32,
    /// Delay between death and the respawn attempt.
    pub respawn_delay_secs: f32,
    /// Time spent in TeleportIn before becoming Active.
    pub teleport_in_secs: f32,
    /// Damage immunity after a respawn.
    pub invulnerability_secs: f32,
    /// Avatar maximum health.
    pub max_health: f32,
    /// NPCs spawned when the Level phase begins.
    pub npc_count: usize,
    /// NPC maximum health.
    pub npc_max_health: f32,
    /// Reach of a defender's revive.
    pub revive_radius: f32,
    /// Placed-object maximum health.
    pub destroyable_health: f32,
    /// Avatar ground speed (m/s).
    pub move_speed: f32,
    /// Vertical velocity applied by a jump.
    pub jump_impulse: f32,
    /// Ground acceleration towards the desired velocity.
    pub ground_acceleration: f32,
    /// Ground deceleration when there is no move input.
    pub ground_deceleration: f32,
    /// Radius of an avatar's damageable volume.
    pub avatar_radius: f32,
    /// NPC ground speed (m/s).
    pub npc_move_speed: f32,
    /// How far from its spawn point an NPC picks wander targets.
    pub npc_wander_radius: f32,
    /// An NPC this close to its target picks a new one.
    pub npc_arrive_distance: f32,
    /// Vertical velocity of the hop a blocked NPC takes.
    pub npc_jump_impulse: f32,
    /// Seed for NPC placement and wandering.
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_PARTICIPANTS,
            match_duration_secs: 60.0,
            respawn_delay_secs: 5.0,
            teleport_in_secs: 1.0,
            invulnerability_secs: 1.0,
            max_health: 100.0,
            npc_count: 20,
            npc_max_health: 100.0,
            revive_radius: 5.0,
            destroyable_health: 100.0,
            move_speed: 6.0,
            jump_impulse: 10.0,
            ground_acceleration: 55.0,
            ground_deceleration: 25.0,
            avatar_radius: 0.5,
            npc_move_speed: 6.0,
            npc_wander_radius: 30.0,
            npc_arrive_distance: 2.0,
            npc_jump_impulse: 5.0,
            seed: 0x5EED,
        }
    }
}

/// Points awarded to a side when something happens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Awarded to defenders when an attacker dies.
    pub attacker_death: f32,
    /// Awarded to attackers when a defender dies.
    pub defender_death: f32,
    /// Awarded to attackers when an NPC dies.
    pub npc_death: f32,
    /// Awarded to defenders when an NPC is revived.
    pub npc_revive: f32,
    /// Awarded to attackers when a placed object is destroyed.
    pub destroyable_destroyed: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            attacker_death: 100.0,
            defender_death: 0.0,
            npc_death: 25.0,
            npc_revive: 50.0,
            destroyable_destroyed: 200.0,
        }
    }
}

/// Level-transition pacing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Pause before the first teleport.
    pub lead_in_secs: f32,
    /// Gap between consecutive avatar teleports.
    pub spacing_secs: f32,
    /// Total settle budget; the spacing already spent is subtracted.
    pub settle_secs: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            lead_in_secs: 1.0,
            spacing_secs: 0.1,
            settle_secs: 1.5,
        }
    }
}

/// End-of-match progression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// XP gained on a win and lost on a loss.
    pub xp_change: i32,
    /// XP needed for the next rank.
    pub rank_threshold: i32,
    /// Lowest rank.
    pub min_rank: u8,
    /// Highest rank.
    pub max_rank: u8,
    /// Balance credited to winners.
    pub win_bonus: i64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            xp_change: 30,
            rank_threshold: 100,
            min_rank: 1,
            max_rank: 9,
            win_bonus: 100,
        }
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Charge, rate and reload tuning shared by every action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Clip size. Zero makes the action cooldown-only (no ammo).
    pub max_clip: u32,
    /// Ammo on spawn, clip included.
    pub start_ammo: u32,
    /// Executions per minute. Zero means no rate limit.
    pub rate_per_minute: u32,
    /// Reload (or recharge) duration.
    pub reload_secs: f32,
    /// Cooldown after a reload before the next execution.
    pub post_reload_secs: f32,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            max_clip: 0,
            start_ammo: 0,
            rate_per_minute: 0,
            reload_secs: 1.5,
            post_reload_secs: 0.25,
        }
    }
}

/// Ballistic projectile tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    /// Launch speed (m/s).
    pub speed: f32,
    /// Multiplier on gravity; zero flies straight.
    pub gravity_scale: f32,
    /// Flight time before despawn.
    pub lifetime_secs: f32,
    /// Time the projectile lingers after impact.
    pub linger_secs: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 50.0,
            gravity_scale: 0.0,
            lifetime_secs: 4.0,
            linger_secs: 2.0,
        }
    }
}

/// Blast falloff.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastConfig {
    /// Blast radius.
    pub radius: f32,
    /// Damage at the rim.
    pub min_damage: f32,
    /// Damage at the center.
    pub max_damage: f32,
    /// Radius within which placed objects take full damage.
    pub structure_radius: f32,
    /// Offset of the blast point along the impact normal.
    pub surface_offset: f32,
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            radius: 7.5,
            min_damage: 25.0,
            max_damage: 150.0,
            structure_radius: 1.0,
            surface_offset: 0.1,
        }
    }
}

/// Damage zone left by an area-effect projectile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    /// Zone radius.
    pub radius: f32,
    /// Time between damage pulses.
    pub interval_secs: f32,
    /// Total zone lifetime.
    pub duration_secs: f32,
    /// Damage per pulse.
    pub damage: f32,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            radius: 3.25,
            interval_secs: 0.5,
            duration_secs: 2.0,
            damage: 75.0,
        }
    }
}

/// Automatic hitscan rifle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RifleConfig {
    /// Charge and rate.
    pub action: ActionConfig,
    /// Damage per hit before the volume multiplier.
    pub damage: f32,
    /// Hitscan range.
    pub max_distance: f32,
    /// Fires while held, not only on press.
    pub automatic: bool,
    /// Rays per execution.
    pub projectiles_per_shot: u32,
    /// Random cone half-angle in degrees.
    pub dispersion_degrees: f32,
}

impl Default for RifleConfig {
    fn default() -> Self {
        Self {
            action: ActionConfig {
                max_clip: 64,
                start_ammo: 384,
                rate_per_minute: 400,
                ..ActionConfig::default()
            },
            damage: 10.0,
            max_distance: 300.0,
            automatic: true,
            projectiles_per_shot: 1,
            dispersion_degrees: 0.0,
        }
    }
}

/// Rocket launcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RocketConfig {
    /// Charge and rate.
    pub action: ActionConfig,
    /// Rocket flight.
    pub projectile: ProjectileConfig,
    /// Rocket blast.
    pub blast: BlastConfig,
}

impl Default for RocketConfig {
    fn default() -> Self {
        Self {
            action: ActionConfig {
                max_clip: 12,
                start_ammo: 72,
                rate_per_minute: 200,
                ..ActionConfig::default()
            },
            projectile: ProjectileConfig::default(),
            blast: BlastConfig::default(),
        }
    }
}

/// Melee combo weapon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacheteConfig {
    /// Swing rate.
    pub action: ActionConfig,
    /// Damage per combo step.
    pub damage: f32,
    /// Swing reach.
    pub radius: f32,
    /// Combo length; the last step is critical.
    pub max_combo: u8,
}

impl Default for MacheteConfig {
    fn default() -> Self {
        Self {
            action: ActionConfig {
                rate_per_minute: 100,
                reload_secs: 0.0,
                post_reload_secs: 0.0,
                ..ActionConfig::default()
            },
            damage: 10.0,
            radius: 0.8,
            max_combo: 3,
        }
    }
}

/// Thrown area-effect bottle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MolotovConfig {
    /// Cooldown; `post_reload_secs` is the settle time after recharge.
    pub action: ActionConfig,
    /// Bottle flight.
    pub projectile: ProjectileConfig,
    /// Fire zone.
    pub area: AreaConfig,
}

impl Default for MolotovConfig {
    fn default() -> Self {
        Self {
            action: ActionConfig {
                reload_secs: 1.5,
                post_reload_secs: 0.5,
                ..ActionConfig::default()
            },
            projectile: ProjectileConfig {
                speed: 20.0,
                gravity_scale: 1.0,
                ..ProjectileConfig::default()
            },
            area: AreaConfig::default(),
        }
    }
}

/// Jetpack boost ability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JetpackConfig {
    /// Cooldown.
    pub action: ActionConfig,
    /// Vertical velocity applied on boost.
    pub impulse: f32,
    /// Extra move speed while boosting.
    pub speed_bonus: f32,
    /// How long the speed bonus lasts.
    pub effect_secs: f32,
}

impl Default for JetpackConfig {
    fn default() -> Self {
        Self {
            action: ActionConfig {
                reload_secs: 5.0,
                post_reload_secs: 0.0,
                ..ActionConfig::default()
            },
            impulse: 10.0,
            speed_bonus: 10.0,
            effect_secs: 2.0,
        }
    }
}

/// All action tuning.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponsConfig {
    /// Rifle.
    pub rifle: RifleConfig,
    /// Rocket launcher.
    pub rocket: RocketConfig,
    /// Machete.
    pub machete: MacheteConfig,
    /// Molotov.
    pub molotov: MolotovConfig,
    /// Jetpack.
    pub jetpack: JetpackConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.capacity, 10);
        assert_eq!(config.weapons.rifle.action.max_clip, 64);
        assert_eq!(config.weapons.rifle.action.start_ammo, 384);
    }

    #[test]
    fn test_partial_override() {
        let config = SimConfig::from_toml_str(
            r#"
            [tick]
            rate = 30

            [weapons.rifle]
            damage = 12.0
            "#,
        )
        .unwrap();

        assert_eq!(config.tick.rate, 30);
        assert_eq!(config.weapons.rifle.damage, 12.0);
        // Untouched keys keep their defaults
        assert_eq!(config.weapons.rifle.action.max_clip, 64);
        assert_eq!(config.session.match_duration_secs, 60.0);
    }

    #[test]
    fn test_rejects_zero_tick_rate() {
        let err = SimConfig::from_toml_str("[tick]\nrate = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_inverted_blast() {
        let err = SimConfig::from_toml_str(
            "[weapons.rocket.blast]\nmin_damage = 200.0\nmax_damage = 10.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_negative_npc_wander() {
        let err = SimConfig::from_toml_str("[session]\nnpc_wander_radius = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let config = SimConfig::from_toml_str("[session]\nnpc_move_speed = 0.0\n").unwrap();
        assert_eq!(config.session.npc_wander_radius, 30.0);
    }

    #[test]
    fn test_rejects_malformed() {
        let err = SimConfig::from_toml_str("[tick\nrate = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
