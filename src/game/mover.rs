//! Mover
//!
//! Per-body kinematics: gravity, horizontal acceleration and the combined
//! integrate-and-resolve step. A body's position is never observable in a
//! post-integration, pre-collision state.

use crate::core::fixed::{approach, fixed_min, fixed_mul, fixed_sign, Fixed};
use crate::game::collision::{self, Blockers};
use crate::game::entity::{Body, Movable};

/// Gravity for one airborne step: `vy = min(vy + gravity, fall_speed_cap)`.
///
/// Skipped while grounded. Velocities already above the cap (knockback)
/// are pulled down to it.
pub fn apply_gravity(body: &mut Body) {
    if body.grounded {
        return;
    }
    body.velocity.y = fixed_min(body.velocity.y.saturating_add(body.gravity), body.fall_speed_cap);
}

/// Steer `velocity.x` toward `target` by `accel`.
///
/// When steering (`x_dir`) opposes the current horizontal velocity the
/// step is multiplied by `turnaround`.
pub fn accelerate_x(body: &mut Body, x_dir: i32, target: Fixed, accel: Fixed, turnaround: Fixed) {
    let vx = body.velocity.x;
    let step = if x_dir != 0 && x_dir == -fixed_sign(vx) {
        fixed_mul(accel, turnaround)
    } else {
        accel
    };
    body.velocity.x = approach(vx, target, step);
}

/// Integrate velocity and resolve against blockers in one call.
pub fn integrate_and_resolve<M: Movable + ?Sized>(mover: &mut M, env: &Blockers<'_>) {
    collision::resolve(mover.body_mut(), env);
}

/// Free integration with no collision (projectiles).
pub fn integrate_free<M: Movable + ?Sized>(mover: &mut M) {
    let body = mover.body_mut();
    body.position = body.position + body.velocity;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{from_int, to_fixed, FIXED_ONE, TURNAROUND_MULTIPLIER, WALK_ACCEL};
    use crate::core::rect::Rect;
    use crate::core::vec2::FixedVec2;
    use crate::game::tiles::TileGrid;
    use proptest::prelude::*;

    fn body() -> Body {
        Body::new(FixedVec2::ZERO, Rect::from_ints(0, -16, 16, 16))
    }

    #[test]
    fn test_gravity_skipped_while_grounded() {
        let mut b = body();
        b.grounded = true;
        apply_gravity(&mut b);
        assert_eq!(b.velocity.y, 0);
    }

    #[test]
    fn test_gravity_clamps_to_cap() {
        let mut b = body();
        b.gravity = from_int(5);
        b.fall_speed_cap = from_int(12);
        for _ in 0..3 {
            apply_gravity(&mut b);
        }
        assert_eq!(b.velocity.y, from_int(12));
    }

    #[test]
    fn test_accelerate_turnaround_multiplier() {
        let mut b = body();
        b.velocity.x = from_int(2);
        accelerate_x(&mut b, -1, from_int(-5), WALK_ACCEL, TURNAROUND_MULTIPLIER);
        // 2 - 0.75 * 4 = -1
        assert_eq!(b.velocity.x, from_int(-1));

        accelerate_x(&mut b, -1, from_int(-5), WALK_ACCEL, TURNAROUND_MULTIPLIER);
        assert_eq!(b.velocity.x, to_fixed(-1.75));
    }

    #[test]
    fn test_accelerate_no_turnaround_when_releasing() {
        let mut b = body();
        b.velocity.x = from_int(2);
        accelerate_x(&mut b, 0, 0, WALK_ACCEL, TURNAROUND_MULTIPLIER);
        assert_eq!(b.velocity.x, to_fixed(1.25));
    }

    #[test]
    fn test_integrate_and_resolve_moves_body() {
        let grid = TileGrid::empty();
        let mut b = body();
        b.velocity = FixedVec2::from_ints(2, 3);
        integrate_and_resolve(&mut b, &Blockers::tiles(&grid));
        assert_eq!(b.position, FixedVec2::from_ints(2, 3));
    }

    #[test]
    fn test_integrate_free_ignores_tiles() {
        let mut b = body();
        b.velocity = FixedVec2::new(FIXED_ONE / 2, -FIXED_ONE);
        integrate_free(&mut b);
        integrate_free(&mut b);
        assert_eq!(b.position, FixedVec2::from_ints(1, -2));
    }

    proptest! {
        #[test]
        fn prop_gravity_never_exceeds_cap(
            gravity in 0i32..(8 << 16),
            cap in 1i32..(32 << 16),
            start in -(32i32 << 16)..(32 << 16),
            steps in 1usize..200,
        ) {
            let mut b = body();
            b.gravity = gravity;
            b.fall_speed_cap = cap;
            b.velocity.y = start;
            for _ in 0..steps {
                apply_gravity(&mut b);
                prop_assert!(b.velocity.y <= cap);
            }
        }
    }
}
