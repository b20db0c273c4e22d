//! Tilescale - tile-based image super-resolution.
//!
//! An input image is split into overlapping tiles sized for the model, each
//! tile is upscaled independently, and the results are stitched back into one
//! output image. Models are fetched on demand and cached on disk.
//!
//! # Layout
//!
//! - [`pixel`]: RGBA8 buffers and rectangles
//! - [`tiling`]: tile planning and compositing
//! - [`inference`]: tensors, model trait, compute backends
//! - [`registry`]: model download, caching and loading
//! - [`orchestrator`]: one upscale job, start to finish
//! - [`worker`]: background thread that runs jobs
//! - [`cache`], [`config`], [`logging`], [`telemetry`]: supporting services
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilescale::{
//!     ModelRegistry, PixelBuffer, RegistryConfig, UpscaleConfig, UpscaleWorker,
//!     UpscalingOptions, WorkerRequest, WorkerResponse,
//! };
//! use tilescale::inference::BackendId;
//! use tilescale::registry::ModelId;
//!
//! let registry = ModelRegistry::from_config(RegistryConfig::default()).unwrap();
//! let worker = UpscaleWorker::spawn(Arc::new(registry), UpscaleConfig::default()).unwrap();
//!
//! let options = UpscalingOptions::for_model(ModelId::Slim2x, BackendId::Cpu);
//! let mut job = worker
//!     .submit(WorkerRequest::new(options, PixelBuffer::new(256, 256)))
//!     .unwrap();
//! while let Some(response) = job.recv_blocking() {
//!     if let WorkerResponse::Done { info, .. } = response {
//!         println!("upscaled to {}", info);
//!     }
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod inference;
pub mod logging;
pub mod orchestrator;
pub mod pixel;
pub mod registry;
pub mod telemetry;
pub mod tiling;
pub mod worker;

pub use error::{Result, UpscaleError};
pub use orchestrator::{
    ProgressSink, UpscaleConfig, UpscaleOrchestrator, UpscaleRequest, UpscalingOptions,
    UpscalingProgress,
};
pub use pixel::{PixelBuffer, Rect};
pub use registry::{ModelRegistry, RegistryConfig};
pub use worker::{JobHandle, UpscaleWorker, WorkerRequest, WorkerResponse};
