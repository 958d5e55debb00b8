//! Mathematical types shared between the authority and observers.
//!
//! These are the canonical representations used by the simulation. All of
//! them are `Pod` so they can be snapshotted without ceremony.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Clamps `value` into `[0, 1]`.
#[inline]
#[must_use]
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Linear interpolation from `a` to `b` by `t` (unclamped).
#[inline]
#[must_use]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// 3D Vector - position, velocity, direction
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit X vector
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit Z vector
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Distance squared (avoids sqrt)
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// Unit vector in the same direction, or zero for a degenerate vector.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len < 1e-6 {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Component-wise linear interpolation.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// True if every component is exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// 2D Vector - planar movement input
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component (strafe)
    pub x: f32,
    /// Y component (forward)
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// Quaternion for rotations
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Quat {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Quat {
    /// Creates a new quaternion
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Identity rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Rotation of `yaw` radians about the Y axis.
    #[must_use]
    pub fn from_yaw(yaw: f32) -> Self {
        let (s, c) = (yaw * 0.5).sin_cos();
        Self::new(0.0, s, 0.0, c)
    }

    /// Rotates a vector by this quaternion.
    #[must_use]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let q = Vec3::new(self.x, self.y, self.z);
        let t = cross(q, v) * 2.0;
        v + t * self.w + cross(q, t)
    }

    /// Normalized linear interpolation; takes the short way round.
    #[must_use]
    pub fn nlerp(self, other: Self, t: f32) -> Self {
        let dot = self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w;
        let sign = if dot < 0.0 { -1.0 } else { 1.0 };
        let q = Self::new(
            lerp(self.x, other.x * sign, t),
            lerp(self.y, other.y * sign, t),
            lerp(self.z, other.z * sign, t),
            lerp(self.w, other.w * sign, t),
        );
        let len = (q.x * q.x + q.y * q.y + q.z * q.z + q.w * q.w).sqrt();
        if len < 1e-6 {
            Self::IDENTITY
        } else {
            Self::new(q.x / len, q.y / len, q.z / len, q.w / len)
        }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}
