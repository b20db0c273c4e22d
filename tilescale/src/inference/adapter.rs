//! Pixel ↔ tensor adapter around a model.

use tracing::debug;

use crate::error::{Result, UpscaleError};
use crate::pixel::PixelBuffer;

use super::tensor::Tensor;
use super::{ModelError, ModelHandle};

/// Runs tiles through a model.
///
/// Every tensor created here is an owned local, so it is released when `run`
/// returns, whether inference succeeded or not.
pub struct InferenceAdapter {
    model: ModelHandle,
}

impl InferenceAdapter {
    pub fn new(model: ModelHandle) -> Self {
        Self { model }
    }

    /// Linear factor of the wrapped model.
    pub fn scale(&self) -> u32 {
        self.model.scale()
    }

    /// Upscale one tile.
    ///
    /// The output is `tile.width * scale × tile.height * scale`. Alpha is not
    /// shown to the model; it is replicated from the input by nearest neighbour.
    ///
    /// # Errors
    ///
    /// Returns `Inference` (tagged with `tile_index`) if the model fails or
    /// returns a tensor of the wrong shape.
    pub async fn run(&self, tile_index: usize, tile: &PixelBuffer) -> Result<PixelBuffer> {
        let scale = self.model.scale() as usize;
        let input = Tensor::from_pixels(tile);
        let expected = [
            1,
            input.channels(),
            input.height() * scale,
            input.width() * scale,
        ];

        let output = self
            .model
            .infer(&input)
            .await
            .map_err(|e| inference_error(tile_index, e))?;
        drop(input);

        if output.shape() != expected {
            return Err(inference_error(
                tile_index,
                ModelError::OutputShape {
                    expected,
                    actual: output.shape(),
                },
            ));
        }

        let alpha = upscale_alpha(tile, scale);
        let pixels = output.to_pixels(Some(&alpha));

        debug!(
            tile = tile_index,
            model = self.model.name(),
            out_width = pixels.width(),
            out_height = pixels.height(),
            "Tile inference complete"
        );

        Ok(pixels)
    }
}

fn inference_error(tile: usize, err: ModelError) -> UpscaleError {
    UpscaleError::Inference {
        tile,
        reason: err.to_string(),
    }
}

/// Nearest-neighbour upscale of the alpha channel.
fn upscale_alpha(tile: &PixelBuffer, scale: usize) -> Vec<u8> {
    let width = tile.width() as usize;
    let height = tile.height() as usize;
    let out_width = width * scale;
    let bytes = tile.as_bytes();
    let mut alpha = Vec::with_capacity(out_width * height * scale);

    for y in 0..height * scale {
        let row = (y / scale) * width;
        for x in 0..out_width {
            alpha.push(bytes[(row + x / scale) * 4 + 3]);
        }
    }
    alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoxFuture;
    use crate::inference::tests::MockModel;
    use crate::inference::UpscaleModel;
    use std::sync::Arc;

    struct ShrinkingModel;

    impl UpscaleModel for ShrinkingModel {
        fn name(&self) -> &str {
            "shrinking"
        }

        fn scale(&self) -> u32 {
            2
        }

        fn infer<'a>(&'a self, input: &'a Tensor) -> BoxFuture<'a, std::result::Result<Tensor, ModelError>> {
            Box::pin(async move { Ok(input.clone()) })
        }
    }

    fn checker(width: u32, height: u32) -> PixelBuffer {
        let mut tile = PixelBuffer::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                tile.put_pixel(x, y, [v, 255 - v, 128, (x * 10) as u8]);
            }
        }
        tile
    }

    #[tokio::test]
    async fn test_run_scales_dimensions() {
        let adapter = InferenceAdapter::new(Arc::new(MockModel::new(3)));
        let out = adapter.run(0, &checker(4, 2)).await.unwrap();
        assert_eq!((out.width(), out.height()), (12, 6));
    }

    #[tokio::test]
    async fn test_run_preserves_colour_and_alpha_for_nearest_model() {
        let tile = checker(4, 4);
        let adapter = InferenceAdapter::new(Arc::new(MockModel::new(2)));
        let out = adapter.run(0, &tile).await.unwrap();

        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(out.pixel(x, y), tile.pixel(x / 2, y / 2));
            }
        }
    }

    #[tokio::test]
    async fn test_model_failure_becomes_inference_error() {
        let adapter = InferenceAdapter::new(Arc::new(MockModel::failing_on(2, 0)));
        let err = adapter.run(5, &checker(2, 2)).await.unwrap_err();
        match err {
            UpscaleError::Inference { tile, reason } => {
                assert_eq!(tile, 5);
                assert!(reason.contains("scripted failure"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_output_shape_is_rejected() {
        let adapter = InferenceAdapter::new(Arc::new(ShrinkingModel));
        let err = adapter.run(1, &checker(2, 2)).await.unwrap_err();
        assert!(matches!(err, UpscaleError::Inference { tile: 1, .. }));
    }

    #[test]
    fn test_upscale_alpha_nearest() {
        let mut tile = PixelBuffer::new(2, 1);
        tile.put_pixel(0, 0, [0, 0, 0, 10]);
        tile.put_pixel(1, 0, [0, 0, 0, 20]);
        assert_eq!(upscale_alpha(&tile, 2), vec![10, 10, 20, 20, 10, 10, 20, 20]);
    }
}
