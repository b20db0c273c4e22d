//! RGBA8 pixel buffers and rectangles.
//!
//! [`PixelBuffer`] is the only image representation the pipeline works with:
//! row-major RGBA with one byte per channel. Conversions to and from
//! [`image::RgbaImage`] exist so callers can plug in whatever codec they
//! already use; the pipeline itself never decodes or encodes.

mod rect;

pub use rect::Rect;

use image::RgbaImage;

use crate::error::{Result, UpscaleError};

/// Bytes per RGBA8 pixel.
pub const CHANNELS: usize = 4;

/// An owned RGBA8 image.
///
/// The invariant `data.len() == width * height * 4` holds for every value;
/// constructors reject anything else.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a zero-filled (transparent black) buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    /// Wrap an existing RGBA byte vector without copying.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBuffer` if the length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = byte_len(width, height);
        if data.len() != expected {
            return Err(UpscaleError::InvalidBuffer(format!(
                "{}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The full extent of this buffer as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning the raw RGBA bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Read one pixel. Returns `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Write one pixel. Writes outside the buffer are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Row `y` restricted to columns `[x, x + width)`.
    pub(crate) fn row_span(&self, x: u32, y: u32, width: u32) -> &[u8] {
        let start = self.offset(x, y);
        &self.data[start..start + width as usize * CHANNELS]
    }

    pub(crate) fn row_span_mut(&mut self, x: u32, y: u32, width: u32) -> &mut [u8] {
        let start = self.offset(x, y);
        &mut self.data[start..start + width as usize * CHANNELS]
    }

    /// Copy `src_rect` of `src` into this buffer with its top-left at
    /// `(dst_x, dst_y)`.
    ///
    /// Both the source region and the destination region must lie fully
    /// inside their buffers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBuffer` if either region is out of bounds.
    pub fn copy_rect(
        &mut self,
        src: &PixelBuffer,
        src_rect: Rect,
        dst_x: u32,
        dst_y: u32,
    ) -> Result<()> {
        if !src.bounds().contains_rect(&src_rect) {
            return Err(UpscaleError::InvalidBuffer(format!(
                "source region {} outside {}x{}",
                src_rect, src.width, src.height
            )));
        }
        let dst_rect = Rect::new(dst_x, dst_y, src_rect.width, src_rect.height);
        if !self.bounds().contains_rect(&dst_rect) {
            return Err(UpscaleError::InvalidBuffer(format!(
                "destination region {} outside {}x{}",
                dst_rect, self.width, self.height
            )));
        }

        for row in 0..src_rect.height {
            let from = src.row_span(src_rect.x, src_rect.y + row, src_rect.width);
            self.row_span_mut(dst_x, dst_y + row, src_rect.width)
                .copy_from_slice(from);
        }
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Payloads run to hundreds of megabytes; never dump them.
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

impl From<PixelBuffer> for RgbaImage {
    fn from(buffer: PixelBuffer) -> Self {
        // The length invariant guarantees from_raw succeeds.
        RgbaImage::from_raw(buffer.width, buffer.height, buffer.data)
            .unwrap_or_else(|| RgbaImage::new(0, 0))
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut buffer = PixelBuffer::new(width, height);
        for y in 0..height {
            for x in 0..width {
                buffer.put_pixel(x, y, [x as u8, y as u8, (x + y) as u8, 255]);
            }
        }
        buffer
    }

    #[test]
    fn test_new_is_zeroed() {
        let buffer = PixelBuffer::new(3, 2);
        assert_eq!(buffer.as_bytes().len(), 24);
        assert!(buffer.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        let result = PixelBuffer::from_raw(2, 2, vec![0; 15]);
        assert!(matches!(result, Err(UpscaleError::InvalidBuffer(_))));
    }

    #[test]
    fn test_from_raw_accepts_exact_length() {
        let buffer = PixelBuffer::from_raw(2, 2, vec![7; 16]).unwrap();
        assert_eq!(buffer.pixel(1, 1), Some([7, 7, 7, 7]));
    }

    #[test]
    fn test_pixel_out_of_bounds() {
        let buffer = PixelBuffer::new(2, 2);
        assert_eq!(buffer.pixel(2, 0), None);
        assert_eq!(buffer.pixel(0, 2), None);
    }

    #[test]
    fn test_copy_rect_moves_region() {
        let src = gradient(8, 8);
        let mut dst = PixelBuffer::new(4, 4);

        dst.copy_rect(&src, Rect::new(2, 3, 2, 2), 1, 1).unwrap();

        assert_eq!(dst.pixel(1, 1), src.pixel(2, 3));
        assert_eq!(dst.pixel(2, 2), src.pixel(3, 4));
        assert_eq!(dst.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(dst.pixel(3, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_copy_rect_rejects_source_overflow() {
        let src = gradient(4, 4);
        let mut dst = PixelBuffer::new(8, 8);
        let result = dst.copy_rect(&src, Rect::new(3, 0, 2, 1), 0, 0);
        assert!(matches!(result, Err(UpscaleError::InvalidBuffer(_))));
    }

    #[test]
    fn test_copy_rect_rejects_destination_overflow() {
        let src = gradient(4, 4);
        let mut dst = PixelBuffer::new(4, 4);
        let result = dst.copy_rect(&src, Rect::new(0, 0, 2, 2), 3, 3);
        assert!(matches!(result, Err(UpscaleError::InvalidBuffer(_))));
    }

    #[test]
    fn test_rgba_image_conversion_keeps_pixels() {
        let buffer = gradient(5, 3);
        let image: RgbaImage = buffer.clone().into();
        assert_eq!(image.dimensions(), (5, 3));
        assert_eq!(image.get_pixel(4, 2).0, buffer.pixel(4, 2).unwrap());

        let back = PixelBuffer::from(image);
        assert_eq!(back, buffer);
    }

    #[test]
    fn test_debug_omits_payload() {
        let debug = format!("{:?}", PixelBuffer::new(10, 10));
        assert!(debug.contains("bytes: 400"));
    }
}
