//! Resampling-kernel model runtime.
//!
//! A [`ModelDefinition`] is the document the registry downloads and caches.
//! The built-in runtime understands definitions that describe a separable
//! resampling kernel and an integer scale; anything heavier (neural weights)
//! is handled by a different [`crate::registry::ModelLoader`].
//!
//! # Definition Format
//!
//! ```json
//! { "name": "slim-2x", "runtime": "resample-v1", "scale": 2, "kernel": "bicubic" }
//! ```
//!
//! Upscaling is done per channel in two passes (horizontal then vertical).
//! Rows are distributed over the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cache::BoxFuture;

use super::backend::BackendHandle;
use super::tensor::Tensor;
use super::{ModelError, UpscaleModel, MODEL_CHANNELS};

/// Runtime tag understood by [`KernelModel`].
pub const KERNEL_RUNTIME: &str = "resample-v1";

/// Largest scale a definition may request.
const MAX_SCALE: u32 = 8;

fn default_runtime() -> String {
    KERNEL_RUNTIME.to_string()
}

/// Interpolation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleKernel {
    Nearest,
    Bilinear,
    /// Catmull-Rom cubic.
    Bicubic,
}

impl ResampleKernel {
    fn support(&self) -> usize {
        match self {
            ResampleKernel::Nearest => 1,
            ResampleKernel::Bilinear => 2,
            ResampleKernel::Bicubic => 4,
        }
    }
}

/// Serialized model description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    #[serde(default = "default_runtime")]
    pub runtime: String,
    pub scale: u32,
    pub kernel: ResampleKernel,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, scale: u32, kernel: ResampleKernel) -> Self {
        Self {
            name: name.into(),
            runtime: default_runtime(),
            scale,
            kernel,
        }
    }

    /// Parse and validate a JSON definition.
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let definition: ModelDefinition =
            serde_json::from_slice(bytes).map_err(|e| format!("invalid model definition: {}", e))?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn to_json(&self) -> Vec<u8> {
        // Serializing plain strings and integers cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Check the definition can be run by [`KernelModel`].
    pub fn validate(&self) -> Result<(), String> {
        if self.runtime != KERNEL_RUNTIME {
            return Err(format!(
                "unsupported runtime '{}' (expected {})",
                self.runtime, KERNEL_RUNTIME
            ));
        }
        if self.scale == 0 || self.scale > MAX_SCALE {
            return Err(format!("scale {} outside 1..={}", self.scale, MAX_SCALE));
        }
        Ok(())
    }
}

/// Source indices and weights contributing to each output sample on one axis.
struct Taps {
    support: usize,
    index: Vec<usize>,
    weight: Vec<f32>,
}

impl Taps {
    fn new(kernel: ResampleKernel, in_len: usize, scale: usize) -> Self {
        let support = kernel.support();
        let out_len = in_len * scale;
        let mut index = Vec::with_capacity(out_len * support);
        let mut weight = Vec::with_capacity(out_len * support);
        let last = in_len as isize - 1;
        let clamp = |i: isize| i.clamp(0, last) as usize;

        for o in 0..out_len {
            let pos = (o as f32 + 0.5) / scale as f32 - 0.5;
            let base = pos.floor();
            let t = pos - base;
            let base = base as isize;

            match kernel {
                ResampleKernel::Nearest => {
                    index.push(o / scale);
                    weight.push(1.0);
                }
                ResampleKernel::Bilinear => {
                    index.extend([clamp(base), clamp(base + 1)]);
                    weight.extend([1.0 - t, t]);
                }
                ResampleKernel::Bicubic => {
                    let t2 = t * t;
                    let t3 = t2 * t;
                    index.extend([
                        clamp(base - 1),
                        clamp(base),
                        clamp(base + 1),
                        clamp(base + 2),
                    ]);
                    weight.extend([
                        0.5 * (-t3 + 2.0 * t2 - t),
                        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
                        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
                        0.5 * (t3 - t2),
                    ]);
                }
            }
        }

        Self {
            support,
            index,
            weight,
        }
    }

    #[inline]
    fn sample(&self, out: usize, read: impl Fn(usize) -> f32) -> f32 {
        let start = out * self.support;
        (start..start + self.support)
            .map(|k| self.weight[k] * read(self.index[k]))
            .sum()
    }
}

/// Model that upscales with a fixed interpolation kernel.
#[derive(Debug, Clone)]
pub struct KernelModel {
    definition: ModelDefinition,
    device: String,
}

impl KernelModel {
    /// Build a model from a validated definition.
    pub fn new(definition: ModelDefinition, backend: &BackendHandle) -> Result<Self, String> {
        definition.validate()?;
        Ok(Self {
            definition,
            device: backend.device().to_string(),
        })
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    /// Device string of the backend the model was loaded for.
    pub fn device(&self) -> &str {
        &self.device
    }

    fn upscale(&self, input: &Tensor) -> Tensor {
        let scale = self.definition.scale as usize;
        let (h, w) = (input.height(), input.width());
        let (out_h, out_w) = (h * scale, w * scale);
        let cols = Taps::new(self.definition.kernel, w, scale);
        let rows = Taps::new(self.definition.kernel, h, scale);

        let mut output = Tensor::zeros(input.channels(), out_h, out_w);
        let out_plane = out_h * out_w;

        for c in 0..input.channels() {
            let src = input.plane(c);

            let mut horizontal = vec![0.0f32; h * out_w];
            horizontal
                .par_chunks_mut(out_w)
                .enumerate()
                .for_each(|(y, row)| {
                    let line = &src[y * w..(y + 1) * w];
                    for (x, value) in row.iter_mut().enumerate() {
                        *value = cols.sample(x, |i| line[i]);
                    }
                });

            let dst = &mut output.as_mut_slice()[c * out_plane..(c + 1) * out_plane];
            dst.par_chunks_mut(out_w).enumerate().for_each(|(y, row)| {
                for (x, value) in row.iter_mut().enumerate() {
                    *value = rows.sample(y, |i| horizontal[i * out_w + x]);
                }
            });
        }

        output
    }
}

impl UpscaleModel for KernelModel {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn scale(&self) -> u32 {
        self.definition.scale
    }

    fn infer<'a>(&'a self, input: &'a Tensor) -> BoxFuture<'a, Result<Tensor, ModelError>> {
        Box::pin(async move {
            let shape = input.shape();
            if input.channels() != MODEL_CHANNELS || input.height() == 0 || input.width() == 0 {
                return Err(ModelError::UnsupportedShape(shape));
            }
            Ok(self.upscale(input))
        })
    }
}
