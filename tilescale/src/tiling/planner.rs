//! One-axis tile planning.
//!
//! A model accepts a fixed `tile_size` input, so an image axis of length
//! `dimension` is covered by `n` tiles that overlap by at least `min_overlap`
//! pixels. The overlap at every seam is split between the two neighbours: the
//! left tile drops `pad_right` pixels from its far edge and the right tile drops
//! `pad_left` from its near edge, so the kept spans tile `[0, dimension)` exactly
//! once.
//!
//! ```text
//!   tile 0  |==============kept==============|--pad_right--|
//!   tile 1                     |--pad_left--|=======kept=======...
//!                              ^ origin[1]
//! ```
//!
//! Tile counts and paddings are pure functions of the three inputs, so the same
//! image always yields the same grid.

use crate::error::{Result, UpscaleError};

/// Tile layout along one spatial axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisPlan {
    dimension: u32,
    tile_size: u32,
    origins: Vec<u32>,
    pad_left: Vec<u32>,
    pad_right: Vec<u32>,
}

impl AxisPlan {
    /// Number of tiles along this axis.
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// Always false; a valid plan has at least one tile.
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Start of each tile in source coordinates.
    pub fn origins(&self) -> &[u32] {
        &self.origins
    }

    /// Pixels trimmed from the near (left/top) edge of each tile.
    pub fn pad_left(&self) -> &[u32] {
        &self.pad_left
    }

    /// Pixels trimmed from the far (right/bottom) edge of each tile.
    pub fn pad_right(&self) -> &[u32] {
        &self.pad_right
    }

    /// Overlap between tile `i` and tile `i + 1` before trimming.
    pub fn seam_overlap(&self, i: usize) -> u32 {
        self.origins[i] + self.tile_size - self.origins[i + 1]
    }

    /// The kept part of tile `i` in tile-local coordinates as `(offset, len)`.
    ///
    /// For a single tile wider than the axis, the span stops at `dimension`;
    /// the remainder of the tile only ever saw zero padding.
    pub fn kept_span(&self, i: usize) -> (u32, u32) {
        let start = self.pad_left[i];
        let end = (self.tile_size - self.pad_right[i]).min(self.dimension - self.origins[i]);
        (start, end - start)
    }

    /// The kept part of tile `i` in source coordinates as `[start, end)`.
    pub fn kept_range(&self, i: usize) -> (u32, u32) {
        let (offset, len) = self.kept_span(i);
        let start = self.origins[i] + offset;
        (start, start + len)
    }
}

/// Plan the tiles covering one axis.
///
/// Picks the smallest tile count whose evenly distributed overlap is at least
/// `min_overlap` per seam, then splits each seam's overlap between its two
/// tiles (`pad_left = overlap / 2`, `pad_right = overlap - pad_left`).
///
/// # Errors
///
/// Returns `InvalidDimension` if `dimension` or `tile_size` is zero, or if the
/// axis needs more than one tile and `min_overlap >= tile_size` (every seam
/// would have to overlap by a whole tile, so no tile count fits).
///
/// # Example
///
/// ```
/// use tilescale::tiling::plan_axis;
///
/// let plan = plan_axis(100, 64, 12).unwrap();
/// assert_eq!(plan.origins(), &[0, 36]);
/// assert_eq!(plan.pad_right(), &[14, 0]);
/// assert_eq!(plan.pad_left(), &[0, 14]);
/// ```
pub fn plan_axis(dimension: u32, tile_size: u32, min_overlap: u32) -> Result<AxisPlan> {
    if dimension == 0 {
        return Err(UpscaleError::InvalidDimension(
            "dimension must be positive".to_string(),
        ));
    }
    if tile_size == 0 {
        return Err(UpscaleError::InvalidDimension(
            "tile size must be positive".to_string(),
        ));
    }

    if tile_size >= dimension {
        return Ok(AxisPlan {
            dimension,
            tile_size,
            origins: vec![0],
            pad_left: vec![0],
            pad_right: vec![0],
        });
    }

    if min_overlap >= tile_size {
        return Err(UpscaleError::InvalidDimension(format!(
            "minimum overlap {} must be smaller than tile size {} to cover {} pixels",
            min_overlap, tile_size, dimension
        )));
    }

    let tiles = tile_count(dimension as u64, tile_size as u64, min_overlap as u64);
    let seams = tiles - 1;
    let total_lap = tile_size as u64 * tiles - dimension as u64;
    let base_lap = total_lap / seams;
    let extra_lap = total_lap % seams;

    let n = tiles as usize;
    let mut origins = Vec::with_capacity(n);
    let mut pad_left = vec![0u32; n];
    let mut pad_right = vec![0u32; n];

    origins.push(0u32);
    for seam in 0..n - 1 {
        let overlap = (base_lap + u64::from((seam as u64) < extra_lap)) as u32;
        origins.push(origins[seam] + tile_size - overlap);

        pad_left[seam + 1] = overlap / 2;
        pad_right[seam] = overlap - pad_left[seam + 1];
    }

    Ok(AxisPlan {
        dimension,
        tile_size,
        origins,
        pad_left,
        pad_right,
    })
}

/// Smallest `n >= 2` with `floor((tile_size*n - dimension) / (n-1)) >= min_overlap`.
///
/// Callers guarantee `tile_size < dimension` and `min_overlap < tile_size`.
/// Since `min_overlap` is an integer the floor can be dropped, and the
/// condition rearranges to `n * (tile_size - min_overlap) >= dimension - min_overlap`.
fn tile_count(dimension: u64, tile_size: u64, min_overlap: u64) -> u64 {
    (dimension - min_overlap)
        .div_ceil(tile_size - min_overlap)
        .max(2)
}
