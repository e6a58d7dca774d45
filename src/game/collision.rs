//! Collision Resolution
//!
//! Axis-separated sweeps of an axis-aligned box against the room grid and
//! against solid entity boxes.
//!
//! ```text
//!   intended (dx, dy)
//!        │
//!        ▼
//!   sweep_x ── solid tiles, solid entities ──► corrected dx ─┐
//!                                                            │ position.x += dx
//!   sweep_y ── solid tiles, solid entities,  ◄───────────────┘
//!              one-way platforms (down only) ──► corrected dy, grounded
//! ```
//!
//! X is always resolved before Y, using the corrected X position. Blockers
//! clamp displacement to the contact point; there is no restitution.

use crate::core::fixed::{fixed_max, fixed_min, floor_int, Fixed};
use crate::core::rect::Rect;
use crate::game::entity::Body;
use crate::game::tiles::TileGrid;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Geometry a body resolves against during one step.
#[derive(Clone, Copy, Debug)]
pub struct Blockers<'a> {
    /// Current room grid
    pub grid: &'a TileGrid,
    /// World-space boxes of solid entities, excluding the mover itself
    pub solids: &'a [Rect],
}

impl<'a> Blockers<'a> {
    pub fn new(grid: &'a TileGrid, solids: &'a [Rect]) -> Self {
        Self { grid, solids }
    }

    /// Tiles only.
    pub fn tiles(grid: &'a TileGrid) -> Self {
        Self { grid, solids: &[] }
    }

    fn blocking_rects(&self, area: &Rect, platforms: bool) -> Vec<(Rect, bool)> {
        let mut out: Vec<(Rect, bool)> = self
            .grid
            .tiles_in(area, |c| c.solid || (platforms && c.platform))
            .into_iter()
            .map(|r| (r, self.is_platform_at(&r)))
            .collect();
        out.extend(
            self.solids
                .iter()
                .filter(|s| !s.is_degenerate())
                .map(|s| (*s, false)),
        );
        out
    }

    fn is_platform_at(&self, tile: &Rect) -> bool {
        let size = self.grid.tile_size();
        let col = floor_int(tile.left()) / size;
        let row = floor_int(tile.top()) / size;
        self.grid
            .get(col, row)
            .is_some_and(|c| c.platform && !c.solid)
    }
}

/// Outcome of the vertical sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerticalHit {
    /// Corrected displacement
    pub dy: Fixed,
    /// A downward block (including resting contact) was found
    pub grounded: bool,
    /// The nearest downward block was a one-way platform only
    pub on_platform: bool,
    /// Upward motion was stopped by a ceiling
    pub head_bump: bool,
}

// =============================================================================
// SWEEPS
// =============================================================================

/// Clamp a horizontal displacement against solid geometry.
pub fn sweep_x(bounds: &Rect, dx: Fixed, env: &Blockers<'_>) -> Fixed {
    if dx == 0 || bounds.is_degenerate() {
        return dx;
    }

    let area = if dx > 0 {
        Rect::new(bounds.left(), bounds.top(), bounds.w + dx, bounds.h)
    } else {
        Rect::new(bounds.left() + dx, bounds.top(), bounds.w - dx, bounds.h)
    };

    let mut dx = dx;
    for (blocker, _) in env.blocking_rects(&area, false) {
        if !bounds.overlaps_y(&blocker) {
            continue;
        }
        if dx > 0 {
            let edge = blocker.left();
            if edge >= bounds.right() && edge < bounds.right() + dx {
                dx = fixed_min(dx, edge - bounds.right());
            }
        } else {
            let edge = blocker.right();
            if edge <= bounds.left() && edge > bounds.left() + dx {
                dx = fixed_max(dx, edge - bounds.left());
            }
        }
    }
    dx
}

/// Clamp a vertical displacement.
///
/// Moving down (or resting, `dy == 0`) is stopped by solid tiles, solid
/// entities and, unless `fall_through` is set, one-way platforms whose top
/// edge is at or below the box bottom. Moving up is stopped only by solid
/// tiles and solid entities.
pub fn sweep_y(bounds: &Rect, dy: Fixed, env: &Blockers<'_>, fall_through: bool) -> VerticalHit {
    let mut hit = VerticalHit {
        dy,
        ..VerticalHit::default()
    };
    if bounds.is_degenerate() {
        return hit;
    }

    if dy >= 0 {
        // One raw unit past the target so a tile starting exactly at the
        // destination bottom counts as contact.
        let area = Rect::new(bounds.left(), bounds.top(), bounds.w, bounds.h + dy + 1);
        let mut nearest: Option<(Fixed, bool)> = None;

        for (blocker, is_platform) in env.blocking_rects(&area, !fall_through) {
            if !bounds.overlaps_x(&blocker) {
                continue;
            }
            let top = blocker.top();
            if top < bounds.bottom() || top > bounds.bottom() + dy {
                continue;
            }
            nearest = match nearest {
                Some((best, platform_only)) if top == best => Some((best, platform_only && is_platform)),
                Some((best, _)) if top > best => nearest,
                _ => Some((top, is_platform)),
            };
        }

        if let Some((top, platform_only)) = nearest {
            hit.dy = top - bounds.bottom();
            hit.grounded = true;
            hit.on_platform = platform_only;
        }
    } else {
        let area = Rect::new(bounds.left(), bounds.top() + dy, bounds.w, bounds.h - dy);
        for (blocker, _) in env.blocking_rects(&area, false) {
            if !bounds.overlaps_x(&blocker) {
                continue;
            }
            let edge = blocker.bottom();
            if edge <= bounds.top() && edge > bounds.top() + hit.dy {
                hit.dy = edge - bounds.top();
                hit.head_bump = true;
            }
        }
    }

    hit
}

/// Apply the body's velocity and resolve it in one step.
///
/// `grounded` and `on_platform` are recomputed from scratch. A horizontal
/// block zeroes `velocity.x`; a floor or ceiling zeroes `velocity.y`. The
/// fall-through request is consumed.
pub fn resolve(body: &mut Body, env: &Blockers<'_>) {
    let fall_through = body.fall_through;
    body.fall_through = false;

    let bounds = body.bounds();
    let dx = sweep_x(&bounds, body.velocity.x, env);
    if dx != body.velocity.x {
        body.velocity.x = 0;
    }
    body.position.x += dx;

    let bounds = body.bounds();
    let vertical = sweep_y(&bounds, body.velocity.y, env, fall_through);
    body.position.y += vertical.dy;
    body.grounded = vertical.grounded;
    body.on_platform = vertical.on_platform;
    if vertical.grounded || vertical.head_bump {
        body.velocity.y = 0;
    }
}

// =============================================================================
// OVERLAP QUERIES
// =============================================================================

/// True if `rect` overlaps any solid tile.
pub fn touching_solid_tile(grid: &TileGrid, rect: &Rect) -> bool {
    !grid.tiles_in(rect, |c| c.solid).is_empty()
}

/// Ids (in input order) of candidates whose boxes overlap `rect`.
pub fn overlapping<'a, I, T>(rect: &Rect, candidates: I) -> Vec<T>
where
    I: IntoIterator<Item = (T, &'a Rect)>,
{
    candidates
        .into_iter()
        .filter(|(_, other)| rect.intersects(other))
        .map(|(id, _)| id)
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{from_int, to_fixed};
    use crate::core::vec2::FixedVec2;
    use crate::game::tiles::TileCell;

    /// 16x16 box whose bottom-left corner sits at the body position.
    fn feet_body(x: i32, y: i32) -> Body {
        Body::new(FixedVec2::from_ints(x, y), Rect::from_ints(0, -16, 16, 16))
    }

    #[test]
    fn test_lands_on_solid_tile() {
        // Solid tile occupying y in [8, 16) under column 0.
        let mut grid = TileGrid::new(4, 4, 8).unwrap();
        grid.set(0, 1, TileCell::SOLID);

        let mut body = feet_body(0, 0);
        body.velocity = FixedVec2::from_ints(0, 10);
        resolve(&mut body, &Blockers::tiles(&grid));

        assert_eq!(body.position, FixedVec2::from_ints(0, 8));
        assert!(body.grounded);
        assert_eq!(body.velocity.y, 0);
    }

    #[test]
    fn test_resting_contact_stays_grounded() {
        let grid = TileGrid::from_rows(&["....", "####"], 16).unwrap();
        let mut body = feet_body(0, 16);
        resolve(&mut body, &Blockers::tiles(&grid));
        assert!(body.grounded);
        assert_eq!(body.position.y, from_int(16));
    }

    #[test]
    fn test_grounded_is_not_sticky() {
        let grid = TileGrid::from_rows(&["....", "#..."], 16).unwrap();
        let mut body = feet_body(0, 16);
        resolve(&mut body, &Blockers::tiles(&grid));
        assert!(body.grounded);

        // Walk off the ledge: the next resolution sees no floor.
        body.position.x = from_int(20);
        resolve(&mut body, &Blockers::tiles(&grid));
        assert!(!body.grounded);
    }

    #[test]
    fn test_wall_clamps_horizontal() {
        let grid = TileGrid::from_rows(&["...#"], 16).unwrap();
        let mut body = feet_body(0, 16);
        body.velocity = FixedVec2::from_ints(40, 0);
        resolve(&mut body, &Blockers::tiles(&grid));
        assert_eq!(body.position.x, from_int(32));
        assert_eq!(body.velocity.x, 0);

        body.velocity = FixedVec2::from_ints(-40, 0);
        let grid = TileGrid::from_rows(&["#..."], 16).unwrap();
        resolve(&mut body, &Blockers::tiles(&grid));
        assert_eq!(body.position.x, from_int(16));
    }

    #[test]
    fn test_ceiling_stops_upward_motion() {
        let grid = TileGrid::from_rows(&["####", "....", "...."], 16).unwrap();
        let mut body = feet_body(0, 48);
        body.velocity = FixedVec2::from_ints(0, -30);
        resolve(&mut body, &Blockers::tiles(&grid));
        // Box top stops at the ceiling bottom (16); feet at 32.
        assert_eq!(body.position.y, from_int(32));
        assert_eq!(body.velocity.y, 0);
        assert!(!body.grounded);
    }

    #[test]
    fn test_platform_is_one_way() {
        let grid = TileGrid::from_rows(&["....", "....", "====", "....", "...."], 16).unwrap();

        // Jumping up through the platform row.
        let mut body = feet_body(0, 72);
        body.velocity = FixedVec2::from_ints(0, -12);
        resolve(&mut body, &Blockers::tiles(&grid));
        assert_eq!(body.position.y, from_int(60));
        assert!(!body.grounded);

        // Falling onto it from above.
        let mut body = feet_body(0, 28);
        body.velocity = FixedVec2::from_ints(0, 10);
        resolve(&mut body, &Blockers::tiles(&grid));
        assert_eq!(body.position.y, from_int(32));
        assert!(body.grounded);
        assert!(body.on_platform);
    }

    #[test]
    fn test_platform_passes_sideways() {
        let grid = TileGrid::from_rows(&["....", "=...", "...."], 16).unwrap();
        let mut body = feet_body(20, 28);
        body.velocity = FixedVec2::from_ints(-20, 0);
        resolve(&mut body, &Blockers::tiles(&grid));
        assert_eq!(body.position.x, 0);
    }

    #[test]
    fn test_fall_through_ignores_platform_once() {
        let grid = TileGrid::from_rows(&["....", "====", "...."], 16).unwrap();
        let mut body = feet_body(0, 16);
        body.velocity = FixedVec2::new(0, to_fixed(0.75));
        body.fall_through = true;
        resolve(&mut body, &Blockers::tiles(&grid));
        assert!(!body.grounded);
        assert!(!body.fall_through);
        assert!(body.position.y > from_int(16));

        // Already below the top edge: the platform no longer applies.
        body.velocity = FixedVec2::from_ints(0, 4);
        resolve(&mut body, &Blockers::tiles(&grid));
        assert!(!body.grounded);
    }

    #[test]
    fn test_solid_entity_blocks_like_a_tile() {
        let grid = TileGrid::empty();
        let crate_box = [Rect::from_ints(0, 20, 32, 8)];
        let mut body = feet_body(0, 0);
        body.velocity = FixedVec2::from_ints(0, 50);
        resolve(&mut body, &Blockers::new(&grid, &crate_box));
        assert_eq!(body.position.y, from_int(20));
        assert!(body.grounded);
        assert!(!body.on_platform);
    }

    #[test]
    fn test_out_of_map_falls_freely() {
        let grid = TileGrid::from_rows(&["####"], 16).unwrap();
        let mut body = feet_body(200, 200);
        body.velocity = FixedVec2::from_ints(0, 12);
        resolve(&mut body, &Blockers::tiles(&grid));
        assert_eq!(body.position.y, from_int(212));
        assert!(!body.grounded);

        let mut body = feet_body(0, 0);
        body.velocity = FixedVec2::from_ints(3, 12);
        resolve(&mut body, &Blockers::tiles(&TileGrid::empty()));
        assert_eq!(body.position, FixedVec2::from_ints(3, 12));
    }

    #[test]
    fn test_degenerate_box_never_collides() {
        let grid = TileGrid::from_rows(&["####"], 16).unwrap();
        let bounds = Rect::from_ints(0, -4, 0, 4);
        let hit = sweep_y(&bounds, from_int(10), &Blockers::tiles(&grid), false);
        assert_eq!(hit.dy, from_int(10));
        assert!(!hit.grounded);
    }

    #[test]
    fn test_overlap_queries() {
        let grid = TileGrid::from_rows(&["..#"], 16).unwrap();
        assert!(touching_solid_tile(&grid, &Rect::from_ints(30, 0, 4, 4)));
        assert!(!touching_solid_tile(&grid, &Rect::from_ints(0, 0, 4, 4)));

        let boxes = [Rect::from_ints(0, 0, 8, 8), Rect::from_ints(100, 0, 8, 8)];
        let hits = overlapping(&Rect::from_ints(4, 4, 8, 8), [(1u32, &boxes[0]), (2u32, &boxes[1])]);
        assert_eq!(hits, vec![1]);
    }
}
