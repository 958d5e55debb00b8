//! Replicated property keys.
//!
//! Every value observers can see is one of these, attached to an avatar, an
//! NPC, a placed object or the session entity. The driver declares the set
//! for each kind of entity when it first appears in the store.

use skirmish_core::PropertyValue;
use skirmish_shared::Vec3;

/// A replicated property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prop {
    // Avatar
    /// Lifecycle stage (`Stage::to_raw`).
    Stage,
    /// Owning slot.
    Slot,
    /// Side (`Side::to_raw`).
    Side,
    /// Character (`Character as u8`).
    Character,
    /// Readiness in the lobby.
    Ready,
    /// Progression rank.
    Rank,
    /// XP toward the next rank.
    RankXp,
    /// Currency.
    Balance,
    /// Primary clip.
    PrimaryClip,
    /// Primary reserve.
    PrimaryReserve,
    /// Primary reload in progress.
    PrimaryReloading,
    /// Primary executions (fire counter).
    PrimaryCount,
    /// Primary reload/cooldown progress, 0..=1.
    PrimaryProgress,
    /// Secondary executions.
    SecondaryCount,
    /// Secondary cooldown progress, 0..=1.
    SecondaryProgress,
    /// Melee combo step.
    Combo,
    /// Jumps taken.
    JumpCount,

    // Avatar and NPC
    /// World position.
    Position,
    /// Current health.
    Health,
    /// Hits taken.
    HitCount,
    /// Critical hits taken.
    CriticalCount,
    /// Deaths.
    DeathCount,

    // Placed object
    /// Destroyed flag.
    Destroyed,

    // Session
    /// Match phase (`Phase::to_raw`).
    Phase,
    /// Attackers' points.
    AttackersPoints,
    /// Defenders' points.
    DefendersPoints,
    /// Seconds left on the match timer.
    RemainingSecs,
    /// Winning side once the match ended.
    Winner,
}

/// Kind of entity, which decides its property set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Participant avatar.
    Avatar,
    /// Non-player actor.
    Npc,
    /// Placed object.
    Destroyable,
    /// Match-wide singleton.
    Session,
}

impl EntityKind {
    /// Properties declared for this kind, with their initial values.
    #[must_use]
    pub fn declarations(self) -> Vec<(Prop, PropertyValue)> {
        use PropertyValue::{Bool, Float, Int};
        match self {
            Self::Avatar => vec![
                (Prop::Stage, Int(0)),
                (Prop::Slot, Int(0)),
                (Prop::Side, Int(0)),
                (Prop::Character, Int(0)),
                (Prop::Ready, Bool(false)),
                (Prop::Rank, Int(1)),
                (Prop::RankXp, Int(0)),
                (Prop::Balance, Int(0)),
                (Prop::PrimaryClip, Int(0)),
                (Prop::PrimaryReserve, Int(0)),
                (Prop::PrimaryReloading, Bool(false)),
                (Prop::PrimaryCount, Int(0)),
                (Prop::PrimaryProgress, Float(1.0)),
                (Prop::SecondaryCount, Int(0)),
                (Prop::SecondaryProgress, Float(1.0)),
                (Prop::Combo, Int(0)),
                (Prop::JumpCount, Int(0)),
                (Prop::Position, PropertyValue::Vec3(Vec3::ZERO)),
                (Prop::Health, Float(0.0)),
                (Prop::HitCount, Int(0)),
                (Prop::CriticalCount, Int(0)),
                (Prop::DeathCount, Int(0)),
            ],
            Self::Npc => vec![
                (Prop::Position, PropertyValue::Vec3(Vec3::ZERO)),
                (Prop::Health, Float(0.0)),
                (Prop::HitCount, Int(0)),
                (Prop::CriticalCount, Int(0)),
                (Prop::DeathCount, Int(0)),
                (Prop::JumpCount, Int(0)),
            ],
            Self::Destroyable => vec![
                (Prop::Position, PropertyValue::Vec3(Vec3::ZERO)),
                (Prop::Health, Float(0.0)),
                (Prop::Destroyed, Bool(false)),
            ],
            Self::Session => vec![
                (Prop::Phase, Int(0)),
                (Prop::AttackersPoints, Float(0.0)),
                (Prop::DefendersPoints, Float(0.0)),
                (Prop::RemainingSecs, Float(0.0)),
                (Prop::Winner, Int(i64::from(skirmish_shared::Side::None.to_raw()))),
            ],
        }
    }
}

/// Counters whose increase means "something happened", used by the
/// presentation phase to trigger effects without replaying logic.
pub const COUNTERS: [Prop; 6] = [
    Prop::PrimaryCount,
    Prop::SecondaryCount,
    Prop::HitCount,
    Prop::CriticalCount,
    Prop::JumpCount,
    Prop::DeathCount,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declarations_are_unique() {
        for kind in [EntityKind::Avatar, EntityKind::Npc, EntityKind::Destroyable, EntityKind::Session] {
            let mut props: Vec<Prop> = kind.declarations().into_iter().map(|(p, _)| p).collect();
            let before = props.len();
            props.sort_unstable();
            props.dedup();
            assert_eq!(props.len(), before, "{kind:?}");
        }
    }

    #[test]
    fn test_counters_declared_on_avatars() {
        let avatar: Vec<Prop> = EntityKind::Avatar.declarations().into_iter().map(|(p, _)| p).collect();
        for counter in COUNTERS {
            assert!(avatar.contains(&counter));
        }
    }
}
