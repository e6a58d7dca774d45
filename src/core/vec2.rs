//! Fixed-Point 2D Vector
//!
//! Deterministic 2D vector operations in screen space (+Y points down).

use std::fmt;
use std::ops::{Add, Sub};
use serde::{Deserialize, Serialize};

use super::fixed::{fixed_cos, fixed_lerp, fixed_mul, fixed_sin, to_float, Fixed, FIXED_SCALE};

/// 2D vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point, down is positive)
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Vector of the given magnitude at an angle in degrees.
    ///
    /// Angles are counter-clockwise from +X with up positive, so 90° points
    /// toward negative screen Y.
    #[inline]
    pub fn from_polar(magnitude: Fixed, degrees: i32) -> Self {
        Self {
            x: fixed_mul(magnitude, fixed_cos(degrees)),
            y: fixed_mul(magnitude, fixed_sin(degrees)).wrapping_neg(),
        }
    }

    /// Add another vector.
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_add(other.x),
            y: self.y.wrapping_add(other.y),
        }
    }

    /// Subtract another vector.
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(other.x),
            y: self.y.wrapping_sub(other.y),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
        }
    }

    /// Multiply the X component by a facing direction (±1).
    #[inline]
    pub fn mirror_x(self, direction: i32) -> Self {
        Self {
            x: self.x.wrapping_mul(direction),
            y: self.y,
        }
    }

    /// Squared distance to another point, widened so room-sized
    /// distances cannot overflow.
    #[inline]
    pub fn distance_squared_wide(self, other: Self) -> i64 {
        let dx = (self.x as i64 - other.x as i64) >> (FIXED_SCALE / 2);
        let dy = (self.y as i64 - other.y as i64) >> (FIXED_SCALE / 2);
        dx * dx + dy * dy
    }

    /// Linear interpolation between two vectors.
    /// t = 0 returns self, t = FIXED_ONE returns other.
    #[inline]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: fixed_lerp(self.x, other.x, t),
            y: fixed_lerp(self.y, other.y, t),
        }
    }
}

// Operator overloads for ergonomics
impl Add for FixedVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        FixedVec2::add(self, rhs)
    }
}

impl Sub for FixedVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        FixedVec2::sub(self, rhs)
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec2({:.3}, {:.3})", to_float(self.x), to_float(self.y))
    }
}

impl fmt::Display for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", to_float(self.x), to_float(self.y))
    }
}

// =============================================================================
// TESTS
// =============================================================================
