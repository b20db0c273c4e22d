//! Two-dimensional tile grids.
//!
//! A [`TileGrid`] crosses a width plan with a height plan. Tiles are always
//! listed row-major: every tile of row 0 left to right, then row 1, and so on.
//! Progress percentages depend on this order, so it never changes.

use crate::error::Result;
use crate::pixel::Rect;

use super::planner::{plan_axis, AxisPlan};

/// One tile of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpec {
    /// Column index within the grid.
    pub col: usize,
    /// Row index within the grid.
    pub row: usize,
    /// Region of the source image fed to the model. Always `tile_size` square;
    /// it may extend past the source edge when the image is smaller than a tile.
    pub src_rect: Rect,
    /// Kept region in tile-local source coordinates.
    pub trim_rect: Rect,
    /// Where the kept region lands, in source coordinates.
    pub dest_origin: (u32, u32),
}

impl TileSpec {
    /// The kept region in output coordinates for an upscale `factor`.
    pub fn dest_rect(&self, factor: u32) -> Rect {
        Rect::new(
            self.dest_origin.0,
            self.dest_origin.1,
            self.trim_rect.width,
            self.trim_rect.height,
        )
        .scaled(factor)
    }
}

/// Row-major tile layout for a whole image.
#[derive(Debug, Clone)]
pub struct TileGrid {
    columns: AxisPlan,
    rows: AxisPlan,
    tiles: Vec<TileSpec>,
}

impl TileGrid {
    /// Plan a grid for a `width` × `height` image.
    ///
    /// Width and height are planned independently with the same tile size and
    /// minimum overlap.
    ///
    /// # Errors
    ///
    /// Propagates `InvalidDimension` from either axis.
    pub fn plan(width: u32, height: u32, tile_size: u32, min_overlap: u32) -> Result<Self> {
        let columns = plan_axis(width, tile_size, min_overlap)?;
        let rows = plan_axis(height, tile_size, min_overlap)?;
        Ok(Self::from_plans(columns, rows))
    }

    /// Cross two axis plans into a grid.
    pub fn from_plans(columns: AxisPlan, rows: AxisPlan) -> Self {
        let mut tiles = Vec::with_capacity(columns.len() * rows.len());

        for row in 0..rows.len() {
            let (trim_y, trim_h) = rows.kept_span(row);
            let y = rows.origins()[row];
            for col in 0..columns.len() {
                let (trim_x, trim_w) = columns.kept_span(col);
                let x = columns.origins()[col];
                tiles.push(TileSpec {
                    col,
                    row,
                    src_rect: Rect::new(x, y, columns.tile_size(), rows.tile_size()),
                    trim_rect: Rect::new(trim_x, trim_y, trim_w, trim_h),
                    dest_origin: (x + trim_x, y + trim_y),
                });
            }
        }

        Self {
            columns,
            rows,
            tiles,
        }
    }

    pub fn columns(&self) -> &AxisPlan {
        &self.columns
    }

    pub fn rows(&self) -> &AxisPlan {
        &self.rows
    }

    /// Tiles in processing order.
    pub fn tiles(&self) -> &[TileSpec] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_is_row_major() {
        let grid = TileGrid::plan(100, 150, 64, 12).unwrap();
        let order: Vec<(usize, usize)> = grid.tiles().iter().map(|t| (t.row, t.col)).collect();

        let mut expected = Vec::new();
        for row in 0..grid.rows().len() {
            for col in 0..grid.columns().len() {
                expected.push((row, col));
            }
        }
        assert_eq!(order, expected);
    }

    #[test]
    fn test_grid_size_is_product_of_axes() {
        let grid = TileGrid::plan(100, 150, 64, 12).unwrap();
        assert_eq!(grid.columns().len(), 2);
        assert_eq!(grid.rows().len(), 3);
        assert_eq!(grid.len(), 6);
    }

    #[test]
    fn test_dest_rects_partition_output() {
        let factor = 2;
        let (width, height) = (100u32, 77u32);
        let grid = TileGrid::plan(width, height, 32, 6).unwrap();

        let mut covered = vec![0u8; (width * factor * height * factor) as usize];
        for tile in grid.tiles() {
            let rect = tile.dest_rect(factor);
            for y in rect.y..rect.y + rect.height {
                for x in rect.x..rect.x + rect.width {
                    covered[(y * width * factor + x) as usize] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_small_image_single_tile() {
        let grid = TileGrid::plan(10, 20, 64, 12).unwrap();
        assert_eq!(grid.len(), 1);
        let tile = grid.tiles()[0];
        assert_eq!(tile.src_rect, Rect::new(0, 0, 64, 64));
        assert_eq!(tile.trim_rect, Rect::new(0, 0, 10, 20));
        assert_eq!(tile.dest_origin, (0, 0));
    }

    #[test]
    fn test_reference_tile_rects() {
        let grid = TileGrid::plan(100, 64, 64, 12).unwrap();
        let tiles = grid.tiles();
        assert_eq!(tiles[0].trim_rect, Rect::new(0, 0, 50, 64));
        assert_eq!(tiles[1].src_rect, Rect::new(36, 0, 64, 64));
        assert_eq!(tiles[1].trim_rect, Rect::new(14, 0, 50, 64));
        assert_eq!(tiles[1].dest_origin, (50, 0));
        assert_eq!(tiles[1].dest_rect(4), Rect::new(200, 0, 200, 256));
    }
}
