//! Planar float tensors exchanged with models.

use crate::pixel::{PixelBuffer, CHANNELS};

/// Colour channels fed to models. Alpha never reaches a model.
pub const MODEL_CHANNELS: usize = 3;

/// A single-image NCHW tensor (`N == 1`) of `f32` values.
///
/// Pixel tensors hold RGB scaled to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    channels: usize,
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl Tensor {
    /// Create a zero tensor.
    pub fn zeros(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
            data: vec![0.0; channels * height * width],
        }
    }

    /// Wrap planar data. Returns `None` if the length does not match the shape.
    pub fn from_planar(channels: usize, height: usize, width: usize, data: Vec<f32>) -> Option<Self> {
        if data.len() != channels * height * width {
            return None;
        }
        Some(Self {
            channels,
            height,
            width,
            data,
        })
    }

    /// Build a normalized RGB tensor from an RGBA buffer.
    pub fn from_pixels(pixels: &PixelBuffer) -> Self {
        let width = pixels.width() as usize;
        let height = pixels.height() as usize;
        let plane = width * height;
        let mut data = vec![0.0f32; MODEL_CHANNELS * plane];

        for (i, rgba) in pixels.as_bytes().chunks_exact(CHANNELS).enumerate() {
            for c in 0..MODEL_CHANNELS {
                data[c * plane + i] = rgba[c] as f32 / 255.0;
            }
        }

        Self {
            channels: MODEL_CHANNELS,
            height,
            width,
            data,
        }
    }

    /// Shape as `[N, C, H, W]`.
    pub fn shape(&self) -> [usize; 4] {
        [1, self.channels, self.height, self.width]
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// One channel plane, row-major.
    pub fn plane(&self, channel: usize) -> &[f32] {
        let size = self.height * self.width;
        &self.data[channel * size..(channel + 1) * size]
    }

    /// Convert an RGB tensor back to RGBA bytes.
    ///
    /// Values are clamped to `[0, 1]` and rounded. `alpha` supplies the alpha
    /// channel at this tensor's resolution; `None` means fully opaque.
    pub fn to_pixels(&self, alpha: Option<&[u8]>) -> PixelBuffer {
        let plane = self.height * self.width;
        let mut bytes = vec![255u8; plane * CHANNELS];

        for (i, rgba) in bytes.chunks_exact_mut(CHANNELS).enumerate() {
            for c in 0..MODEL_CHANNELS.min(self.channels) {
                rgba[c] = to_byte(self.data[c * plane + i]);
            }
            if let Some(alpha) = alpha {
                rgba[3] = alpha[i];
            }
        }

        // Length is plane * CHANNELS by construction.
        PixelBuffer::from_raw(self.width as u32, self.height as u32, bytes)
            .unwrap_or_else(|_| PixelBuffer::new(self.width as u32, self.height as u32))
    }
}

fn to_byte(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pixels_normalizes_and_drops_alpha() {
        let mut pixels = PixelBuffer::new(2, 1);
        pixels.put_pixel(0, 0, [255, 0, 51, 10]);
        pixels.put_pixel(1, 0, [0, 255, 102, 20]);

        let tensor = Tensor::from_pixels(&pixels);

        assert_eq!(tensor.shape(), [1, 3, 1, 2]);
        assert_eq!(tensor.plane(0), &[1.0, 0.0]);
        assert_eq!(tensor.plane(1), &[0.0, 1.0]);
        assert!((tensor.plane(2)[0] - 0.2).abs() < 1e-6);
        assert!((tensor.plane(2)[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_to_pixels_clamps_out_of_range() {
        let tensor = Tensor::from_planar(3, 1, 1, vec![1.7, -0.3, f32::NAN]).unwrap();
        let pixels = tensor.to_pixels(None);
        assert_eq!(pixels.pixel(0, 0), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_to_pixels_uses_supplied_alpha() {
        let tensor = Tensor::zeros(3, 1, 2);
        let pixels = tensor.to_pixels(Some(&[7, 9]));
        assert_eq!(pixels.pixel(0, 0), Some([0, 0, 0, 7]));
        assert_eq!(pixels.pixel(1, 0), Some([0, 0, 0, 9]));
    }

    #[test]
    fn test_pixel_round_trip_is_lossless() {
        let mut pixels = PixelBuffer::new(3, 2);
        for y in 0..2 {
            for x in 0..3 {
                pixels.put_pixel(x, y, [(x * 80) as u8, (y * 120) as u8, 33, 255]);
            }
        }
        let back = Tensor::from_pixels(&pixels).to_pixels(None);
        assert_eq!(back, pixels);
    }

    #[test]
    fn test_from_planar_rejects_bad_length() {
        assert!(Tensor::from_planar(3, 2, 2, vec![0.0; 11]).is_none());
    }
}
