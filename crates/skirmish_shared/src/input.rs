//! # Per-Tick Input
//!
//! The fixed-shape struct an input source hands the decision phase for one
//! avatar and one tick.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::math::{Quat, Vec2, Vec3};

/// Logical buttons, in bit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Button {
    /// Jump (grounded only).
    Jump = 0,
    /// Fire / swing the primary action.
    PrimaryAttack = 1,
    /// Trigger the secondary ability.
    SecondaryAttack = 2,
    /// Aim down sights.
    Aiming = 3,
    /// Reload the primary action.
    Reload = 4,
    /// Cycle character (lobby only).
    SwitchCharacter = 5,
    /// Toggle readiness (lobby only).
    Ready = 6,
    /// Revive nearby NPCs (defenders only).
    Revive = 7,
    /// Toggle the input block.
    Pause = 8,
}

impl Button {
    #[inline]
    const fn mask(self) -> u32 {
        1 << self as u32
    }
}

/// Bitset of held buttons.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Buttons(pub u32);

impl Buttons {
    /// No buttons held.
    pub const NONE: Self = Self(0);

    /// Builds a set from a list of held buttons.
    #[must_use]
    pub fn from_held(held: &[Button]) -> Self {
        let mut buttons = Self::NONE;
        for &b in held {
            buttons.set(b, true);
        }
        buttons
    }

    /// Returns true if `button` is held.
    #[inline]
    #[must_use]
    pub const fn is_set(self, button: Button) -> bool {
        self.0 & button.mask() != 0
    }

    /// Sets or clears `button`.
    #[inline]
    pub fn set(&mut self, button: Button, held: bool) {
        if held {
            self.0 |= button.mask();
        } else {
            self.0 &= !button.mask();
        }
    }

    /// Held now but not in `previous`.
    #[inline]
    #[must_use]
    pub const fn was_pressed(self, previous: Self, button: Button) -> bool {
        self.is_set(button) && !previous.is_set(button)
    }

    /// Held in `previous` but not now.
    #[inline]
    #[must_use]
    pub const fn was_released(self, previous: Self, button: Button) -> bool {
        !self.is_set(button) && previous.is_set(button)
    }
}

/// Input for one avatar for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Tick this input was sampled for.
    pub tick: u32,
    /// Planar movement; x strafes, y moves forward. Length <= 1.
    pub move_direction: Vec2,
    /// World point the crosshair rests on. Actions fire toward it.
    pub aim_point: Vec3,
    /// Point the upper-body rig looks at. Zero means "no aim update".
    pub aim_rig_point: Vec3,
    /// Desired look rotation.
    pub look_rotation: Quat,
    /// Held buttons.
    pub buttons: Buttons,
}

impl TickInput {
    /// Empty input for `tick`.
    #[must_use]
    pub fn idle(tick: u32) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// Same input with `held` buttons pressed.
    #[must_use]
    pub fn with_buttons(mut self, held: &[Button]) -> Self {
        self.buttons = Buttons::from_held(held);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_edges() {
        let prev = Buttons::from_held(&[Button::Jump]);
        let now = Buttons::from_held(&[Button::PrimaryAttack]);

        assert!(now.was_pressed(prev, Button::PrimaryAttack));
        assert!(!now.was_pressed(prev, Button::Jump));
        assert!(now.was_released(prev, Button::Jump));
        assert!(!now.was_released(prev, Button::PrimaryAttack));
    }

    #[test]
    fn test_held_is_not_pressed() {
        let held = Buttons::from_held(&[Button::PrimaryAttack]);
        assert!(held.is_set(Button::PrimaryAttack));
        assert!(!held.was_pressed(held, Button::PrimaryAttack));
    }

    #[test]
    fn test_set_clear() {
        let mut b = Buttons::NONE;
        b.set(Button::Pause, true);
        assert!(b.is_set(Button::Pause));
        b.set(Button::Pause, false);
        assert_eq!(b, Buttons::NONE);
    }
}
