//! Tile planning and compositing.
//!
//! Large images are upscaled in fixed-size tiles. This module covers the
//! geometry: how many tiles an axis needs, where they start, how much of each
//! overlap is discarded, and how tiles are cut out of the source and pasted
//! into the output.
//!
//! # Example
//!
//! ```
//! use tilescale::pixel::PixelBuffer;
//! use tilescale::tiling::{TileCompositor, TileGrid};
//!
//! let source = PixelBuffer::new(100, 80);
//! let grid = TileGrid::plan(100, 80, 64, 12).unwrap();
//! let compositor = TileCompositor::new(1);
//! let mut output = PixelBuffer::new(100, 80);
//!
//! for tile in grid.tiles() {
//!     let crop = compositor.extract(&source, tile.src_rect);
//!     compositor.composite_tile(&mut output, &crop, tile).unwrap();
//! }
//! assert_eq!(output, source);
//! ```

mod compositor;
mod grid;
mod planner;

pub use compositor::TileCompositor;
pub use grid::{TileGrid, TileSpec};
pub use planner::{plan_axis, AxisPlan};
