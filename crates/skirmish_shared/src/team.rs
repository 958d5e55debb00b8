//! Sides and playable characters.

use serde::{Deserialize, Serialize};

/// Which side of the match an actor fights for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Attacking side. Scores by killing NPCs and destroying objects.
    Attackers = 0,
    /// Defending side. Scores by killing attackers and reviving NPCs.
    #[default]
    Defenders = 1,
    /// No side (NPCs, placed objects, an undecided match).
    None = 2,
}

impl Side {
    /// The side this one scores against. `None` has no opponent.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Attackers => Self::Defenders,
            Self::Defenders => Self::Attackers,
            Self::None => Self::None,
        }
    }

    /// Replicated integer encoding.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        self as u8
    }

    /// Decodes the replicated integer encoding.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Attackers,
            1 => Self::Defenders,
            _ => Self::None,
        }
    }
}

/// Playable characters. Each one pins a side and a loadout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Character {
    /// Defender with a rifle and a jetpack.
    Bulwark = 0,
    /// Defender with a rifle and molotovs. Default pick.
    #[default]
    Maverick = 1,
    /// Attacker with a machete and a jetpack.
    Zaphyr = 2,
    /// Attacker with a rocket launcher and molotovs.
    Nadja = 3,
}

impl Character {
    /// All characters in selection order.
    pub const ALL: [Self; 4] = [Self::Bulwark, Self::Maverick, Self::Zaphyr, Self::Nadja];

    /// The side a character plays for.
    #[must_use]
    pub const fn side(self) -> Side {
        match self {
            Self::Bulwark | Self::Maverick => Side::Defenders,
            Self::Zaphyr | Self::Nadja => Side::Attackers,
        }
    }

    /// Looks up a character by selection index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Next character in selection order, wrapping.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Bulwark => Self::Maverick,
            Self::Maverick => Self::Zaphyr,
            Self::Zaphyr => Self::Nadja,
            Self::Nadja => Self::Bulwark,
        }
    }
}
