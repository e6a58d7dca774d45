//! Tile Grid
//!
//! Static per-room collision grid. Cells carry only the flags collision
//! needs; `source_region` is presentation data carried through untouched.
//! Lookups outside the grid return nothing, so bodies that leave the map
//! fall freely instead of faulting.

use serde::{Deserialize, Serialize};

use crate::core::fixed::{floor_int, MAX_PIXELS};
use crate::core::rect::Rect;
use crate::error::{SimError, SimResult};

/// One grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCell {
    /// Blocks from every side
    pub solid: bool,
    /// Blocks only bodies moving down onto its top edge
    pub platform: bool,
    /// Atlas region for the renderer `[x, y, w, h]`
    pub source_region: Option<[u16; 4]>,
}

impl TileCell {
    pub const EMPTY: TileCell = TileCell {
        solid: false,
        platform: false,
        source_region: None,
    };

    pub const SOLID: TileCell = TileCell {
        solid: true,
        platform: false,
        source_region: None,
    };

    pub const PLATFORM: TileCell = TileCell {
        solid: false,
        platform: true,
        source_region: None,
    };
}

/// Row-major grid of cells anchored at the room origin.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    width: usize,
    height: usize,
    /// Edge length of a cell in pixels
    tile_size: i32,
    cells: Vec<TileCell>,
}

impl TileGrid {
    /// All-empty grid.
    pub fn new(width: usize, height: usize, tile_size: i32) -> SimResult<Self> {
        if tile_size <= 0 {
            return Err(SimError::InvalidRoom(format!(
                "tile size must be positive, got {tile_size}"
            )));
        }
        let extent = |cells: usize| cells as i64 * i64::from(tile_size);
        if extent(width) > i64::from(MAX_PIXELS) || extent(height) > i64::from(MAX_PIXELS) {
            return Err(SimError::InvalidRoom(format!(
                "{width}x{height} tiles of {tile_size} px exceed {MAX_PIXELS} px"
            )));
        }
        Ok(Self {
            width,
            height,
            tile_size,
            cells: vec![TileCell::EMPTY; width * height],
        })
    }

    /// Grid with no cells; every query misses.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            tile_size: 1,
            cells: Vec::new(),
        }
    }

    /// Build from ASCII rows: `#` solid, `=` platform, `.` or space empty.
    pub fn from_rows(rows: &[&str], tile_size: i32) -> SimResult<Self> {
        let width = rows.first().map_or(0, |r| r.chars().count());
        let mut grid = Self::new(width, rows.len(), tile_size)?;

        for (row, line) in rows.iter().enumerate() {
            if line.chars().count() != width {
                return Err(SimError::InvalidRoom(format!(
                    "row {row} has {} cells, expected {width}",
                    line.chars().count()
                )));
            }
            for (col, ch) in line.chars().enumerate() {
                let cell = match ch {
                    '#' => TileCell::SOLID,
                    '=' => TileCell::PLATFORM,
                    '.' | ' ' => TileCell::EMPTY,
                    other => {
                        return Err(SimError::InvalidRoom(format!(
                            "unknown tile '{other}' at ({col}, {row})"
                        )))
                    }
                };
                grid.cells[row * width + col] = cell;
            }
        }

        Ok(grid)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn tile_size(&self) -> i32 {
        self.tile_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at grid coordinates; `None` outside the grid.
    pub fn get(&self, col: i32, row: i32) -> Option<&TileCell> {
        if col < 0 || row < 0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        self.cells.get(row * self.width + col)
    }

    /// Replace a cell. Out-of-grid writes are ignored.
    pub fn set(&mut self, col: i32, row: i32, cell: TileCell) {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return;
        }
        let idx = row as usize * self.width + col as usize;
        self.cells[idx] = cell;
    }

    /// Pixel rect of a cell.
    #[inline]
    pub fn tile_rect(&self, col: i32, row: i32) -> Rect {
        let s = self.tile_size;
        Rect::from_ints(col * s, row * s, s, s)
    }

    /// Pixel extent of the whole grid.
    pub fn pixel_bounds(&self) -> Rect {
        Rect::from_ints(
            0,
            0,
            self.width as i32 * self.tile_size,
            self.height as i32 * self.tile_size,
        )
    }

    /// Inclusive cell range `(col0, row0, col1, row1)` covering `rect`,
    /// clamped to the grid. `None` when the rect misses the grid.
    pub fn cell_span(&self, rect: &Rect) -> Option<(i32, i32, i32, i32)> {
        if self.is_empty() || rect.is_degenerate() {
            return None;
        }
        let s = self.tile_size;
        let col0 = floor_int(rect.left()).div_euclid(s).max(0);
        let row0 = floor_int(rect.top()).div_euclid(s).max(0);
        // Right/bottom are exclusive: step back one raw unit before flooring.
        let col1 = floor_int(rect.right() - 1).div_euclid(s).min(self.width as i32 - 1);
        let row1 = floor_int(rect.bottom() - 1).div_euclid(s).min(self.height as i32 - 1);
        if col0 > col1 || row0 > row1 {
            return None;
        }
        Some((col0, row0, col1, row1))
    }

    /// Cells overlapping `rect` that satisfy `pred`, as pixel rects.
    pub fn tiles_in<F>(&self, rect: &Rect, pred: F) -> Vec<Rect>
    where
        F: Fn(&TileCell) -> bool,
    {
        let mut out = Vec::new();
        if let Some((c0, r0, c1, r1)) = self.cell_span(rect) {
            for row in r0..=r1 {
                for col in c0..=c1 {
                    if self.get(col, row).is_some_and(&pred) {
                        out.push(self.tile_rect(col, row));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TileGrid {
        TileGrid::from_rows(&["....", "..==", "####"], 8).unwrap()
    }

    #[test]
    fn test_from_rows_flags() {
        let g = grid();
        assert_eq!(g.width(), 4);
        assert_eq!(g.height(), 3);
        assert!(g.get(2, 1).unwrap().platform);
        assert!(g.get(0, 2).unwrap().solid);
        assert_eq!(g.get(0, 0), Some(&TileCell::EMPTY));
    }

    #[test]
    fn test_out_of_bounds_is_none() {
        let g = grid();
        assert!(g.get(-1, 0).is_none());
        assert!(g.get(4, 0).is_none());
        assert!(g.get(0, 3).is_none());
        assert!(TileGrid::empty().get(0, 0).is_none());
    }

    #[test]
    fn test_rejects_ragged_rows_and_unknown_tiles() {
        assert!(matches!(
            TileGrid::from_rows(&["..", "..."], 8),
            Err(SimError::InvalidRoom(_))
        ));
        assert!(matches!(
            TileGrid::from_rows(&[".x"], 8),
            Err(SimError::InvalidRoom(_))
        ));
        assert!(TileGrid::new(1, 1, 0).is_err());
    }

    #[test]
    fn test_rejects_grid_beyond_fixed_range() {
        assert!(matches!(
            TileGrid::new(2048, 4, 16),
            Err(SimError::InvalidRoom(_))
        ));
        assert!(matches!(
            TileGrid::new(4, 2048, 16),
            Err(SimError::InvalidRoom(_))
        ));
        assert!(TileGrid::new(2047, 4, 16).is_ok());
    }

    #[test]
    fn test_cell_span_respects_exclusive_edges() {
        let g = grid();
        // Exactly one tile: [8,16) x [8,16)
        let span = g.cell_span(&Rect::from_ints(8, 8, 8, 8));
        assert_eq!(span, Some((1, 1, 1, 1)));
        // Entirely off-grid
        assert_eq!(g.cell_span(&Rect::from_ints(-20, -20, 8, 8)), None);
    }

    #[test]
    fn test_tiles_in_filters() {
        let g = grid();
        let solids = g.tiles_in(&Rect::from_ints(0, 0, 32, 24), |c| c.solid);
        assert_eq!(solids.len(), 4);
        let platforms = g.tiles_in(&Rect::from_ints(0, 0, 32, 24), |c| c.platform);
        assert_eq!(platforms, vec![Rect::from_ints(16, 8, 8, 8), Rect::from_ints(24, 8, 8, 8)]);
    }
}
