//! Tile extraction and reassembly.
//!
//! Extraction crops a model-sized tile out of the source, filling anything
//! past the source edge with transparent black. Compositing copies the kept
//! (trimmed) interior of an upscaled tile into the destination image.

use tracing::trace;

use crate::error::{Result, UpscaleError};
use crate::pixel::{PixelBuffer, Rect};

use super::grid::TileSpec;

/// Cuts tiles out of a source image and stitches upscaled tiles together.
#[derive(Debug, Clone, Copy)]
pub struct TileCompositor {
    factor: u32,
}

impl TileCompositor {
    /// Create a compositor for outputs `factor` times larger than the source.
    pub fn new(factor: u32) -> Self {
        Self { factor }
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    /// Copy `rect` of `source` into a fresh `rect.width × rect.height` buffer.
    ///
    /// Pixels of `rect` that fall outside `source` stay zero.
    pub fn extract(&self, source: &PixelBuffer, rect: Rect) -> PixelBuffer {
        let mut tile = PixelBuffer::new(rect.width, rect.height);

        if let Some(visible) = source.bounds().intersect(&rect) {
            let offset_x = visible.x - rect.x;
            let offset_y = visible.y - rect.y;
            for row in 0..visible.height {
                let from = source.row_span(visible.x, visible.y + row, visible.width);
                tile.row_span_mut(offset_x, offset_y + row, visible.width)
                    .copy_from_slice(from);
            }
        }

        tile
    }

    /// Copy the kept part of an upscaled tile into `dest`.
    ///
    /// `trim_rect` is in tile-local source coordinates and `dest_origin` in
    /// source coordinates; both are multiplied by the factor before touching
    /// the output buffers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBuffer` if the scaled trim region does not fit inside
    /// `tile_output` or the destination region does not fit inside `dest`.
    pub fn composite(
        &self,
        dest: &mut PixelBuffer,
        tile_output: &PixelBuffer,
        trim_rect: Rect,
        dest_origin: (u32, u32),
    ) -> Result<()> {
        let src = trim_rect.scaled(self.factor);
        let dst_x = dest_origin.0 * self.factor;
        let dst_y = dest_origin.1 * self.factor;

        trace!(
            src = %src,
            dst_x,
            dst_y,
            "Compositing tile"
        );

        dest.copy_rect(tile_output, src, dst_x, dst_y)
            .map_err(|e| match e {
                UpscaleError::InvalidBuffer(reason) => {
                    UpscaleError::InvalidBuffer(format!("composite failed: {}", reason))
                }
                other => other,
            })
    }

    /// Composite using the trim and placement recorded in `tile`.
    pub fn composite_tile(
        &self,
        dest: &mut PixelBuffer,
        tile_output: &PixelBuffer,
        tile: &TileSpec,
    ) -> Result<()> {
        self.composite(dest, tile_output, tile.trim_rect, tile.dest_origin)
    }
}
