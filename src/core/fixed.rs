//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for the simulation step.
//! All step-loop operations use integer arithmetic only.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 pixels                     │
//! │  Precision: 1/65536 pixel                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A room is at most 32k pixels on a side, which covers every room the
//! level editor can export at 4x pixel scale.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

/// Largest whole-pixel extent a Q16.16 value can hold
pub const MAX_PIXELS: i32 = i16::MAX as i32;

// =============================================================================
// GAME CONSTANTS (All as integer literals - NO float conversion!)
// =============================================================================

/// Player ground acceleration: 0.75 px/step² = 0.75 * 65536
pub const WALK_ACCEL: Fixed = 49152;

/// Player air acceleration: 0.25 px/step² = 0.25 * 65536
pub const AIR_ACCEL: Fixed = 16384;

/// Player max walk speed: 5.0 px/step
pub const WALK_SPEED: Fixed = 327680;

/// Jump velocity: -12.0 px/step (negative is up)
pub const JUMP_SPEED: Fixed = -786432;

/// Player gravity: 0.75 px/step²
pub const PLAYER_GRAVITY: Fixed = 49152;

/// Player fall speed cap: 12.0 px/step
pub const PLAYER_FALL_SPEED: Fixed = 786432;

/// Acceleration multiplier when steering against current velocity: 4.0
pub const TURNAROUND_MULTIPLIER: Fixed = 262144;

/// Divisor applied to upward velocity on early jump release: 1.25
pub const JUMP_RELEASE_DIVISOR: Fixed = 81920;

/// Analog stick deadzone: 0.4 (floor of 0.4 * 65536)
pub const STICK_DEADZONE: Fixed = 26214;

/// Projectile tile look-ahead factor: 1.2 (floor of 1.2 * 65536)
pub const PROJECTILE_LOOKAHEAD: Fixed = 78643;

/// Camera lerp rate: 0.25
pub const CAMERA_LERP: Fixed = 16384;

// =============================================================================
// TRIGONOMETRY LOOKUP TABLE
// =============================================================================

/// Sine of every whole degree in `[0, 360)`.
///
/// Uses Bhaskara I's rational approximation evaluated in integers, so the
/// table is identical on every platform. Exact at 0, 30, 90, 150, 180.
/// Maximum absolute error is about 0.0016.
pub static SIN_LUT: [Fixed; 360] = {
    let mut lut = [0i32; 360];
    let mut d = 0i64;
    while d < 360 {
        let (deg, sign) = if d < 180 { (d, 1i64) } else { (d - 180, -1i64) };
        let p = deg * (180 - deg);
        lut[d as usize] = (sign * (4 * p * FIXED_ONE as i64) / (40500 - p)) as i32;
        d += 1;
    }
    lut
};

/// Sine of an angle in whole degrees.
#[inline]
pub fn fixed_sin(degrees: i32) -> Fixed {
    SIN_LUT[degrees.rem_euclid(360) as usize]
}

/// Cosine of an angle in whole degrees.
#[inline]
pub fn fixed_cos(degrees: i32) -> Fixed {
    fixed_sin(degrees.wrapping_add(90))
}

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Convert a float to fixed-point, rounding to nearest.
///
/// # Warning
/// Only use at initialization (config parsing, tests). NEVER in the step loop.
#[inline]
pub fn to_fixed(f: f64) -> Fixed {
    (f * FIXED_ONE as f64).round() as Fixed
}

/// Convert fixed-point to float for display/rendering.
///
/// # Warning
/// Only use for visual output. NEVER use result in game logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Whole number to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

/// Floor of a fixed-point number as a whole number.
#[inline]
pub const fn floor_int(f: Fixed) -> i32 {
    f >> FIXED_SCALE
}

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then shifts back.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers.
///
/// Returns 0 on divide-by-zero.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0;
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Sign as a whole number: -1, 0 or 1.
#[inline]
pub fn fixed_sign(x: Fixed) -> i32 {
    x.signum()
}

/// Minimum of two fixed-point numbers.
#[inline]
pub fn fixed_min(a: Fixed, b: Fixed) -> Fixed {
    if a < b { a } else { b }
}

/// Maximum of two fixed-point numbers.
#[inline]
pub fn fixed_max(a: Fixed, b: Fixed) -> Fixed {
    if a > b { a } else { b }
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    fixed_max(min, fixed_min(max, value))
}

/// Linear interpolation: a + (b - a) * t
#[inline]
pub fn fixed_lerp(a: Fixed, b: Fixed, t: Fixed) -> Fixed {
    let diff = b.wrapping_sub(a);
    a.wrapping_add(fixed_mul(diff, t))
}

/// Move `current` toward `target` by at most `delta`, never overshooting.
///
/// A negative `delta` is treated as its magnitude.
#[inline]
pub fn approach(current: Fixed, target: Fixed, delta: Fixed) -> Fixed {
    let delta = fixed_abs(delta);
    if current < target {
        fixed_min(current.saturating_add(delta), target)
    } else {
        fixed_max(current.saturating_sub(delta), target)
    }
}

// =============================================================================
// FIXEDNUM WRAPPER (Config-facing wrapper)
// =============================================================================

/// Ergonomic wrapper around fixed-point with operator overloading.
///
/// Serializes as a decimal number so configuration files stay readable.
/// Conversion happens once at load time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedNum(pub Fixed);

impl FixedNum {
    /// Zero constant
    pub const ZERO: Self = Self(0);

    /// One constant
    pub const ONE: Self = Self(FIXED_ONE);

    /// Create from raw fixed-point value
    #[inline]
    pub const fn from_raw(raw: Fixed) -> Self {
        Self(raw)
    }

    /// Create from integer
    #[inline]
    pub const fn from_int(i: i32) -> Self {
        Self(i << FIXED_SCALE)
    }

    /// Get raw fixed-point value
    #[inline]
    pub const fn raw(self) -> Fixed {
        self.0
    }

    /// Convert to float for display
    #[inline]
    pub fn to_float(self) -> f32 {
        to_float(self.0)
    }

    /// Absolute value
    #[inline]
    pub fn abs(self) -> Self {
        Self(fixed_abs(self.0))
    }
}

impl Add for FixedNum {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for FixedNum {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl Mul for FixedNum {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(fixed_mul(self.0, rhs.0))
    }
}

impl Div for FixedNum {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self(fixed_div(self.0, rhs.0))
    }
}

impl Neg for FixedNum {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl fmt::Debug for FixedNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({:.4})", self.to_float())
    }
}

impl fmt::Display for FixedNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_float())
    }
}

impl Serialize for FixedNum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / FIXED_ONE as f64)
    }
}

impl<'de> Deserialize<'de> for FixedNum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() || value.abs() >= 32768.0 {
            return Err(serde::de::Error::custom(format!(
                "{value} is outside the Q16.16 range"
            )));
        }
        Ok(Self(to_fixed(value)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(FIXED_SCALE, 16);
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(1.0), FIXED_ONE);
        assert_eq!(to_fixed(0.5), FIXED_HALF);
        assert_eq!(to_fixed(-1.0), -FIXED_ONE);
        assert_eq!(to_fixed(0.4), 26214);
    }

    #[test]
    fn test_game_constants() {
        assert_eq!(WALK_ACCEL, to_fixed(0.75));
        assert_eq!(AIR_ACCEL, to_fixed(0.25));
        assert_eq!(WALK_SPEED, 5 * FIXED_ONE);
        assert_eq!(JUMP_SPEED, -12 * FIXED_ONE);
        assert_eq!(PLAYER_FALL_SPEED, 12 * FIXED_ONE);
        assert_eq!(TURNAROUND_MULTIPLIER, 4 * FIXED_ONE);
        assert_eq!(JUMP_RELEASE_DIVISOR, to_fixed(1.25));
    }

    #[test]
    fn test_fixed_mul_div() {
        assert_eq!(fixed_mul(to_fixed(2.0), to_fixed(3.0)), to_fixed(6.0));
        assert_eq!(fixed_mul(FIXED_HALF, FIXED_HALF), to_fixed(0.25));
        assert_eq!(fixed_div(to_fixed(6.0), to_fixed(2.0)), to_fixed(3.0));
        assert_eq!(fixed_div(FIXED_ONE, 0), 0);
    }

    #[test]
    fn test_floor_int() {
        assert_eq!(floor_int(to_fixed(7.9)), 7);
        assert_eq!(floor_int(to_fixed(-0.5)), -1);
        assert_eq!(floor_int(from_int(16)), 16);
    }

    #[test]
    fn test_sin_lut_exact_points() {
        assert_eq!(fixed_sin(0), 0);
        assert_eq!(fixed_sin(30), FIXED_HALF);
        assert_eq!(fixed_sin(90), FIXED_ONE);
        assert_eq!(fixed_sin(180), 0);
        assert_eq!(fixed_sin(270), -FIXED_ONE);
        assert_eq!(fixed_cos(0), FIXED_ONE);
        assert_eq!(fixed_cos(180), -FIXED_ONE);
        assert_eq!(fixed_sin(-90), -FIXED_ONE);
        assert_eq!(fixed_sin(450), FIXED_ONE);
    }

    #[test]
    fn test_sin_lut_accuracy() {
        for d in 0..360 {
            let exact = (d as f64).to_radians().sin();
            let approx = fixed_sin(d) as f64 / FIXED_ONE as f64;
            assert!((exact - approx).abs() < 0.002, "sin({d}) off by {}", exact - approx);
        }
    }

    #[test]
    fn test_approach() {
        assert_eq!(approach(0, from_int(5), to_fixed(0.75)), to_fixed(0.75));
        assert_eq!(approach(to_fixed(4.5), from_int(5), FIXED_ONE), from_int(5));
        assert_eq!(approach(from_int(5), 0, from_int(2)), from_int(3));
        assert_eq!(approach(from_int(1), 0, from_int(3)), 0);
        assert_eq!(approach(from_int(2), from_int(2), FIXED_ONE), from_int(2));
    }

    #[test]
    fn test_fixednum_serde_as_decimal() {
        let json = serde_json::to_string(&FixedNum::from_raw(to_fixed(0.75))).unwrap();
        assert_eq!(json, "0.75");
        let back: FixedNum = serde_json::from_str("1.25").unwrap();
        assert_eq!(back.raw(), JUMP_RELEASE_DIVISOR);
        assert!(serde_json::from_str::<FixedNum>("40000.0").is_err());
    }

    proptest! {
        #[test]
        fn prop_approach_never_overshoots(
            current in -1_000_000i32..1_000_000,
            target in -1_000_000i32..1_000_000,
            delta in 0i32..1_000_000,
        ) {
            let next = approach(current, target, delta);
            let before = (target as i64 - current as i64).abs();
            let after = (target as i64 - next as i64).abs();
            prop_assert!(after <= before);
            prop_assert!((next as i64 - current as i64).abs() <= delta as i64);
            if current <= target {
                prop_assert!(next <= target);
            } else {
                prop_assert!(next >= target);
            }
        }
    }
}
