//! Player Controller
//!
//! Turns one controller slot's logical buttons into velocity changes on the
//! player body. Runs before gravity and collision each step.

use crate::core::fixed::{fixed_div, fixed_mul, FIXED_ONE};
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::config::PlayerTuning;
use crate::game::entity::Body;
use crate::game::input::{Button, InputState};
use crate::game::mover::accelerate_x;

/// Jump bookkeeping carried between steps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerController {
    /// Controller slot driving this player
    pub slot: usize,
    /// Steps left in which a jump is still honored after leaving the ground
    coyote: u8,
    /// Rising from a jump that may still be cut short
    jumping: bool,
}

impl PlayerController {
    pub fn new(slot: usize) -> Self {
        Self {
            slot,
            coyote: 0,
            jumping: false,
        }
    }

    #[inline]
    pub fn coyote(&self) -> u8 {
        self.coyote
    }

    #[inline]
    pub fn jumping(&self) -> bool {
        self.jumping
    }

    /// Forget jump state (room transitions, respawn).
    pub fn reset(&mut self) {
        self.coyote = 0;
        self.jumping = false;
    }

    /// Apply one step of player intent to `body`.
    pub fn update(&mut self, body: &mut Body, input: &mut InputState, tuning: &PlayerTuning) {
        let x_dir = i32::from(input.is_down(Button::Right)) - i32::from(input.is_down(Button::Left));
        body.face(x_dir);

        let accel = if body.grounded {
            tuning.walk_accel.raw()
        } else {
            tuning.air_accel.raw()
        };
        let target = fixed_mul(tuning.walk_speed.raw(), x_dir * FIXED_ONE);
        accelerate_x(
            body,
            x_dir,
            target,
            accel,
            tuning.turnaround_multiplier.raw(),
        );

        if body.grounded {
            self.coyote = tuning.coyote_steps;
        } else {
            self.coyote = self.coyote.saturating_sub(1);
        }

        let holding_down = input.is_down(Button::Down);
        if body.grounded && body.on_platform && holding_down && input.consume(Button::Jump) {
            body.fall_through = true;
            body.grounded = false;
            self.coyote = 0;
        } else if (body.grounded || (self.coyote > 0 && !holding_down))
            && input.consume(Button::Jump)
        {
            body.velocity.y = tuning.jump_speed.raw();
            body.grounded = false;
            self.jumping = true;
            self.coyote = 0;
        }

        if self.jumping {
            let hold = fixed_div(body.gravity, tuning.jump_hold_gravity_divisor.raw());
            body.velocity.y = body.velocity.y.saturating_sub(hold);
            if body.velocity.y > -FIXED_ONE {
                self.jumping = false;
            }
            if !input.is_down(Button::Jump) {
                self.jumping = false;
                body.velocity.y = fixed_div(body.velocity.y, tuning.jump_release_divisor.raw());
            }
        }
    }

    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.slot as u32);
        hasher.update_u8(self.coyote);
        hasher.update_bool(self.jumping);
    }
}

/// Body for a freshly spawned player.
pub fn player_body(position: FixedVec2, tuning: &PlayerTuning) -> Body {
    let mut body = Body::new(position, tuning.collider.to_rect());
    body.gravity = tuning.gravity.raw();
    body.fall_speed_cap = tuning.fall_speed.raw();
    body
}
