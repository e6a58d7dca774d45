//! Simulation Clock
//!
//! Decides how many fixed steps each real frame runs and whether those
//! steps are frozen by hitpause.
//!
//! ```text
//! frame ──► accumulator += time_scale ──► steps = min(acc >> 16, max)
//!                                            │
//!            ┌───────────────────────────────┘
//!            ▼
//!   step × N (frozen while hitpause > 0)
//!            │
//!            ▼
//!   end_frame: hitpause -= 1, then hitpause = max(hitpause, prepared)
//! ```
//!
//! Hits landing during a frame only *request* hitpause through
//! [`SimulationClock::request_hitpause`]; the request is promoted once, at
//! the end of the frame, so every hit in the frame extends the same pause.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::fixed::{Fixed, FIXED_ONE, FIXED_SCALE};
use crate::core::hash::StateHasher;
use crate::game::config::ClockConfig;

/// Fixed-step gate for the frame loop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationClock {
    /// Steps per real frame (1.0 = normal speed)
    time_scale: Fixed,
    /// Fractional steps carried between frames
    accumulator: Fixed,
    /// Active freeze countdown, in real frames
    hitpause: u32,
    /// Largest pause requested since the last promotion
    prepared_hitpause: u32,
    max_steps_per_frame: u32,
    /// Simulation steps executed so far (frozen ones included)
    step: u32,
    paused: bool,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(&ClockConfig::default())
    }
}

impl SimulationClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            time_scale: config.initial_time_scale.raw(),
            accumulator: 0,
            hitpause: 0,
            prepared_hitpause: 0,
            max_steps_per_frame: config.max_steps_per_frame,
            step: 0,
            paused: false,
        }
    }

    /// Start a real frame. Returns the number of steps to run.
    ///
    /// Whole units beyond the per-frame cap are dropped so a long stall
    /// cannot snowball into a burst of catch-up steps.
    pub fn begin_frame(&mut self) -> u32 {
        if self.paused {
            return 0;
        }
        self.accumulator = self.accumulator.saturating_add(self.time_scale);
        let whole = (self.accumulator >> FIXED_SCALE).max(0) as u32;
        self.accumulator -= (whole as Fixed) << FIXED_SCALE;
        whole.min(self.max_steps_per_frame)
    }

    /// Finish a real frame: count down, then promote any request.
    pub fn end_frame(&mut self) {
        if self.paused {
            return;
        }
        self.hitpause = self.hitpause.saturating_sub(1);
        if self.prepared_hitpause > self.hitpause {
            debug!(frames = self.prepared_hitpause, "hitpause promoted");
            self.hitpause = self.prepared_hitpause;
        }
        self.prepared_hitpause = 0;
    }

    /// Ask for a freeze of `frames` real frames, starting next frame.
    #[inline]
    pub fn request_hitpause(&mut self, frames: u32) {
        self.prepared_hitpause = self.prepared_hitpause.max(frames);
    }

    /// Mark one step as executed. Returns its index.
    #[inline]
    pub fn advance_step(&mut self) -> u32 {
        let step = self.step;
        self.step = self.step.wrapping_add(1);
        step
    }

    /// Gameplay updates are suppressed this frame.
    #[inline]
    pub fn frozen(&self) -> bool {
        self.hitpause > 0
    }

    /// Whether particles animate this frame.
    #[inline]
    pub fn particles_active(&self, update_during_hitpause: bool) -> bool {
        !self.frozen() || update_during_hitpause
    }

    #[inline]
    pub fn hitpause(&self) -> u32 {
        self.hitpause
    }

    #[inline]
    pub fn prepared_hitpause(&self) -> u32 {
        self.prepared_hitpause
    }

    #[inline]
    pub fn time_scale(&self) -> Fixed {
        self.time_scale
    }

    /// Negative scales are treated as zero.
    pub fn set_time_scale(&mut self, scale: Fixed) {
        self.time_scale = scale.max(0);
    }

    #[inline]
    pub fn step(&self) -> u32 {
        self.step
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Drop any pause in flight (room transitions).
    pub fn clear_hitpause(&mut self) {
        self.hitpause = 0;
        self.prepared_hitpause = 0;
    }

    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_fixed(self.time_scale);
        hasher.update_fixed(self.accumulator);
        hasher.update_u32(self.hitpause);
        hasher.update_u32(self.prepared_hitpause);
        hasher.update_u32(self.step);
        hasher.update_bool(self.paused);
    }
}

/// One real frame at normal speed.
pub const NORMAL_SPEED: Fixed = FIXED_ONE;
