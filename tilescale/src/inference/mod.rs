//! Model inference abstractions.
//!
//! Models are pluggable: anything implementing [`UpscaleModel`] can upscale a
//! tile. The pipeline only ever talks to models through the
//! [`InferenceAdapter`], which owns the pixel ↔ tensor conversions.
//!
//! ```text
//! ┌──────────────┐   Tensor (NCHW, RGB, [0,1])   ┌──────────────────┐
//! │ PixelBuffer  │ ─────────────────────────────►│ dyn UpscaleModel │
//! │  (RGBA8)     │ ◄─────────────────────────────│   (any backend)  │
//! └──────────────┘        InferenceAdapter       └──────────────────┘
//! ```
//!
//! The crate ships one model runtime, [`KernelModel`], which interprets
//! resampling definitions on the host. Neural runtimes plug in through
//! [`crate::registry::ModelLoader`].

mod adapter;
mod backend;
mod kernel;
mod tensor;

pub use adapter::InferenceAdapter;
pub use backend::{BackendHandle, BackendId, BackendResolver, SystemBackendResolver};
pub use kernel::{KernelModel, ModelDefinition, ResampleKernel, KERNEL_RUNTIME};
pub use tensor::{Tensor, MODEL_CHANNELS};

use std::sync::Arc;

use thiserror::Error;

use crate::cache::BoxFuture;

/// Errors reported by a model implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The input tensor does not have a shape the model accepts.
    #[error("Unsupported input shape {0:?}")]
    UnsupportedShape([usize; 4]),

    /// The model produced a tensor of the wrong shape.
    #[error("Output shape {actual:?} does not match expected {expected:?}")]
    OutputShape {
        expected: [usize; 4],
        actual: [usize; 4],
    },

    /// Failure inside the compute backend.
    #[error("Backend failure: {0}")]
    Backend(String),
}

/// A loaded super-resolution model.
///
/// Implementations take an RGB tensor of shape `[1, 3, H, W]` and return one
/// of shape `[1, 3, H * scale, W * scale]`. Inference may be asynchronous
/// (GPU queues, remote runtimes); the pipeline awaits each call before
/// starting the next tile.
pub trait UpscaleModel: Send + Sync {
    /// Human-readable model name for logs.
    fn name(&self) -> &str;

    /// Linear upscale factor this model applies.
    fn scale(&self) -> u32;

    /// Run the model on one tile.
    fn infer<'a>(&'a self, input: &'a Tensor) -> BoxFuture<'a, Result<Tensor, ModelError>>;
}

/// Shared reference to a loaded model.
pub type ModelHandle = Arc<dyn UpscaleModel>;

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted model for pipeline tests.
    ///
    /// Upscales by nearest neighbour and can be told to fail on a given call.
    pub struct MockModel {
        pub scale: u32,
        pub fail_on_call: Option<usize>,
        pub calls: AtomicUsize,
    }

    impl MockModel {
        pub fn new(scale: u32) -> Self {
            Self {
                scale,
                fail_on_call: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing_on(scale: u32, call: usize) -> Self {
            Self {
                scale,
                fail_on_call: Some(call),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl UpscaleModel for MockModel {
        fn name(&self) -> &str {
            "mock"
        }

        fn scale(&self) -> u32 {
            self.scale
        }

        fn infer<'a>(&'a self, input: &'a Tensor) -> BoxFuture<'a, Result<Tensor, ModelError>> {
            Box::pin(async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_on_call == Some(call) {
                    return Err(ModelError::Backend("scripted failure".to_string()));
                }
                let s = self.scale as usize;
                let (h, w) = (input.height(), input.width());
                let mut out = Tensor::zeros(input.channels(), h * s, w * s);
                let plane_out = h * s * w * s;
                for c in 0..input.channels() {
                    let src = input.plane(c);
                    let dst = &mut out.as_mut_slice()[c * plane_out..(c + 1) * plane_out];
                    for y in 0..h * s {
                        for x in 0..w * s {
                            dst[y * w * s + x] = src[(y / s) * w + x / s];
                        }
                    }
                }
                Ok(out)
            })
        }
    }

    #[test]
    fn test_model_trait_is_object_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn UpscaleModel>();
        let _handle: ModelHandle = Arc::new(MockModel::new(2));
    }

    #[test]
    fn test_model_error_display() {
        let err = ModelError::OutputShape {
            expected: [1, 3, 8, 8],
            actual: [1, 3, 4, 4],
        };
        assert!(err.to_string().contains("[1, 3, 4, 4]"));
    }
}
