//! Camera Target
//!
//! The simulation owns the camera target because it decides which entities
//! are close enough to update. Rendering reads `position` and builds its
//! own view transform.

use crate::core::fixed::{from_int, Fixed};
use crate::core::hash::StateHasher;
use crate::core::rect::Rect;
use crate::core::vec2::FixedVec2;
use crate::game::config::CameraConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraTarget {
    /// Where the view wants to be centered this step
    pub target: FixedVec2,
    /// Smoothed view center
    pub position: FixedVec2,
    view_width: Fixed,
    view_height: Fixed,
    lerp: Fixed,
    update_radius: i64,
}

impl CameraTarget {
    pub fn new(config: &CameraConfig) -> Self {
        let radius = i64::from(config.update_radius.max(0));
        Self {
            target: FixedVec2::ZERO,
            position: FixedVec2::ZERO,
            view_width: from_int(config.view_width),
            view_height: from_int(config.view_height),
            lerp: config.lerp.raw(),
            // distance_squared_wide works in 1/65536 px²
            update_radius: (radius * radius) << 16,
        }
    }

    /// Follow `focus` inside `bounds`. `instant` skips smoothing.
    pub fn update(&mut self, focus: FixedVec2, bounds: &Rect, instant: bool) {
        let raised = FixedVec2::new(focus.x, focus.y - self.view_height / 12);
        self.target = bounds.clamp_or_center(raised, self.view_width / 2, self.view_height / 2);
        self.position = if instant {
            self.target
        } else {
            self.position.lerp(self.target, self.lerp)
        };
    }

    /// Whether something at `point` is close enough to simulate.
    #[inline]
    pub fn in_update_range(&self, point: FixedVec2) -> bool {
        self.target.distance_squared_wide(point) <= self.update_radius
    }

    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_vec2(self.target);
        hasher.update_vec2(self.position);
    }
}

impl Default for CameraTarget {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}
