//! Simulation Configuration
//!
//! Tuning values threaded into every step call. Loaded once from JSON
//! (decimal numbers are converted to fixed-point at load time) and never
//! mutated by the step loop.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::fixed::{
    FixedNum, AIR_ACCEL, CAMERA_LERP, FIXED_ONE, JUMP_RELEASE_DIVISOR, JUMP_SPEED,
    PLAYER_FALL_SPEED, PLAYER_GRAVITY, PROJECTILE_LOOKAHEAD, STICK_DEADZONE, TURNAROUND_MULTIPLIER,
    WALK_ACCEL, WALK_SPEED,
};
use crate::core::rect::Rect;
use crate::error::{SimError, SimResult};

/// Input sampling configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Steps an edge stays queryable after it happens
    pub buffer_steps: u8,
    /// Analog stick threshold for generating digital edges
    pub stick_deadzone: FixedNum,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            buffer_steps: 3,
            stick_deadzone: FixedNum::from_raw(STICK_DEADZONE),
        }
    }
}

/// Player collider in whole pixels, relative to the entity position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColliderSpec {
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: i32,
    pub height: i32,
}

impl ColliderSpec {
    /// Local-space collider rect.
    pub fn to_rect(self) -> Rect {
        Rect::from_ints(self.offset_x, self.offset_y, self.width, self.height)
    }
}

/// Player movement tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub walk_accel: FixedNum,
    pub air_accel: FixedNum,
    pub walk_speed: FixedNum,
    /// Initial jump velocity (negative is up)
    pub jump_speed: FixedNum,
    pub gravity: FixedNum,
    pub fall_speed: FixedNum,
    /// Extra upward push while jump is held is `gravity / divisor`
    pub jump_hold_gravity_divisor: FixedNum,
    /// Upward velocity is divided by this on early release
    pub jump_release_divisor: FixedNum,
    /// Acceleration multiplier when steering against current velocity
    pub turnaround_multiplier: FixedNum,
    /// Steps after leaving the ground during which a jump is still honored
    pub coyote_steps: u8,
    pub collider: ColliderSpec,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            walk_accel: FixedNum::from_raw(WALK_ACCEL),
            air_accel: FixedNum::from_raw(AIR_ACCEL),
            walk_speed: FixedNum::from_raw(WALK_SPEED),
            jump_speed: FixedNum::from_raw(JUMP_SPEED),
            gravity: FixedNum::from_raw(PLAYER_GRAVITY),
            fall_speed: FixedNum::from_raw(PLAYER_FALL_SPEED),
            jump_hold_gravity_divisor: FixedNum::from_int(3),
            jump_release_divisor: FixedNum::from_raw(JUMP_RELEASE_DIVISOR),
            turnaround_multiplier: FixedNum::from_raw(TURNAROUND_MULTIPLIER),
            coyote_steps: 6,
            collider: ColliderSpec {
                offset_x: -16,
                offset_y: -16,
                width: 32,
                height: 48,
            },
        }
    }
}

/// Frame/step scheduling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Upper bound on simulation steps executed for one real frame
    pub max_steps_per_frame: u32,
    /// Time scale the clock starts with
    pub initial_time_scale: FixedNum,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            max_steps_per_frame: 4,
            initial_time_scale: FixedNum::ONE,
        }
    }
}

/// Camera target and update culling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub view_width: i32,
    pub view_height: i32,
    pub lerp: FixedNum,
    /// Entities farther than this (pixels) from the camera target are not
    /// updated unless flagged to update offscreen
    pub update_radius: i32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            view_width: 640,
            view_height: 360,
            lerp: FixedNum::from_raw(CAMERA_LERP),
            update_radius: 1920,
        }
    }
}

/// Combat tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Projectiles check `velocity * factor` ahead for tile contact
    pub projectile_lookahead: FixedNum,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            projectile_lookahead: FixedNum::from_raw(PROJECTILE_LOOKAHEAD),
        }
    }
}

/// Complete simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub input: InputConfig,
    pub player: PlayerTuning,
    pub clock: ClockConfig,
    pub camera: CameraConfig,
    pub combat: CombatConfig,
}

impl SimConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!(path = %path.display(), "loaded simulation config");
        Ok(config)
    }

    /// Check every value the step loop relies on.
    pub fn validate(&self) -> SimResult<()> {
        let fail = |msg: &str| {
            warn!(reason = msg, "rejected simulation config");
            Err(SimError::InvalidConfig(msg.to_string()))
        };

        if self.input.buffer_steps == 0 {
            return fail("input.buffer_steps must be at least 1");
        }
        let deadzone = self.input.stick_deadzone.raw();
        if !(0..FIXED_ONE).contains(&deadzone) {
            return fail("input.stick_deadzone must be in [0, 1)");
        }

        let p = &self.player;
        if p.walk_speed.raw() <= 0 || p.walk_accel.raw() <= 0 || p.air_accel.raw() <= 0 {
            return fail("player walk speed and accelerations must be positive");
        }
        if p.jump_speed.raw() >= 0 {
            return fail("player.jump_speed must be negative (up)");
        }
        if p.gravity.raw() < 0 || p.fall_speed.raw() <= 0 {
            return fail("player gravity must be non-negative and fall_speed positive");
        }
        if p.jump_hold_gravity_divisor.raw() <= 0 || p.jump_release_divisor.raw() <= 0 {
            return fail("player jump divisors must be positive");
        }
        if p.turnaround_multiplier.raw() < FIXED_ONE {
            return fail("player.turnaround_multiplier must be at least 1");
        }
        if p.collider.width <= 0 || p.collider.height <= 0 {
            return fail("player.collider must have positive size");
        }

        if self.clock.max_steps_per_frame == 0 {
            return fail("clock.max_steps_per_frame must be at least 1");
        }
        if self.clock.initial_time_scale.raw() < 0 {
            return fail("clock.initial_time_scale must be non-negative");
        }

        let c = &self.camera;
        if c.view_width <= 0 || c.view_height <= 0 || c.update_radius <= 0 {
            return fail("camera view and update radius must be positive");
        }
        if c.lerp.raw() <= 0 || c.lerp.raw() > FIXED_ONE {
            return fail("camera.lerp must be in (0, 1]");
        }

        if self.combat.projectile_lookahead.raw() < 0 {
            return fail("combat.projectile_lookahead must be non-negative");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = SimConfig::from_json_str(r#"{ "player": { "walk_speed": 6.5 } }"#).unwrap();
        assert_eq!(config.player.walk_speed, FixedNum::from_raw(6 * FIXED_ONE + FIXED_ONE / 2));
        assert_eq!(config.player.coyote_steps, 6);
        assert_eq!(config.input.buffer_steps, 3);
    }

    #[test]
    fn test_rejects_zero_buffer() {
        let err = SimConfig::from_json_str(r#"{ "input": { "buffer_steps": 0 } }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_upward_gravity_jump() {
        let err = SimConfig::from_json_str(r#"{ "player": { "jump_speed": 12.0 } }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = SimConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SimError::Parse(_)));
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = SimConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SimConfig::from_json_str(&json).unwrap(), config);
    }
}
