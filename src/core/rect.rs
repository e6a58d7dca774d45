//! Fixed-Point Axis-Aligned Rectangles
//!
//! Half-open boxes: a rect covers `[left, right) x [top, bottom)`.
//! Zero or negative size rects never overlap anything.

use serde::{Deserialize, Serialize};

use super::fixed::{fixed_clamp, Fixed};
use super::vec2::FixedVec2;

/// Axis-aligned rectangle with fixed-point position and size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: Fixed,
    /// Top edge
    pub y: Fixed,
    /// Width
    pub w: Fixed,
    /// Height
    pub h: Fixed,
}

impl Rect {
    /// Create from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed, w: Fixed, h: Fixed) -> Self {
        Self { x, y, w, h }
    }

    /// Create from whole-pixel components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::new(x << 16, y << 16, w << 16, h << 16)
    }

    #[inline]
    pub fn left(&self) -> Fixed {
        self.x
    }

    #[inline]
    pub fn top(&self) -> Fixed {
        self.y
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> Fixed {
        self.x.wrapping_add(self.w)
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> Fixed {
        self.y.wrapping_add(self.h)
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> FixedVec2 {
        FixedVec2::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    /// True when the rect has no area.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Translate by a vector.
    #[inline]
    pub fn offset(self, by: FixedVec2) -> Self {
        Self::new(self.x.wrapping_add(by.x), self.y.wrapping_add(by.y), self.w, self.h)
    }

    /// Half-open overlap test.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// True if the two rects share any horizontal span.
    #[inline]
    pub fn overlaps_x(&self, other: &Rect) -> bool {
        self.x < other.right() && other.x < self.right()
    }

    /// True if the two rects share any vertical span.
    #[inline]
    pub fn overlaps_y(&self, other: &Rect) -> bool {
        self.y < other.bottom() && other.y < self.bottom()
    }

    /// Clamp a point into `[min, max]` on each axis; when a range is
    /// inverted (the allowed span is narrower than zero) that axis falls
    /// back to this rect's center.
    pub fn clamp_or_center(&self, point: FixedVec2, inset_x: Fixed, inset_y: Fixed) -> FixedVec2 {
        let center = self.center();
        let clamp_axis = |value: Fixed, lo: Fixed, hi: Fixed, fallback: Fixed| {
            if lo > hi {
                fallback
            } else {
                fixed_clamp(value, lo, hi)
            }
        };
        FixedVec2::new(
            clamp_axis(point.x, self.left() + inset_x, self.right() - inset_x, center.x),
            clamp_axis(point.y, self.top() + inset_y, self.bottom() - inset_y, center.y),
        )
    }
}
