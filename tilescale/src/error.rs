//! Error taxonomy for upscaling jobs.
//!
//! Every failure a job can hit is expressed as an [`UpscaleError`]. The worker
//! turns any of them into a single terminal failure message; nothing in the
//! pipeline retries on its own.

use thiserror::Error;

use crate::inference::BackendId;
use crate::registry::ModelId;

/// Errors that can terminate an upscaling job.
#[derive(Debug, Error)]
pub enum UpscaleError {
    /// Tile planning was given an unusable dimension or tile size.
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    /// A pixel buffer has the wrong length or a region does not fit.
    #[error("Invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    /// The requested factor differs from the scale the model produces.
    #[error("Factor {requested}x does not match model {model} ({scale}x)")]
    FactorMismatch {
        requested: u32,
        model: ModelId,
        scale: u32,
    },

    /// The compute backend cannot be initialized in this environment.
    #[error("Backend {backend} is not supported: {reason}")]
    UnsupportedBackend { backend: BackendId, reason: String },

    /// Neither the model cache nor the network produced a usable model.
    #[error("Failed to load model {model}: {reason}")]
    ModelLoad { model: ModelId, reason: String },

    /// Inference failed for a tile.
    #[error("Inference failed on tile {tile}: {reason}")]
    Inference { tile: usize, reason: String },

    /// The job was cancelled by its caller.
    #[error("Upscaling cancelled")]
    Cancelled,
}

impl UpscaleError {
    /// Stable integer code for structured logging.
    ///
    /// - 1xx: caller input
    /// - 2xx: environment
    /// - 3xx: inference
    /// - 4xx: lifecycle
    pub fn error_code(&self) -> u32 {
        match self {
            Self::InvalidDimension(_) => 100,
            Self::InvalidBuffer(_) => 101,
            Self::FactorMismatch { .. } => 102,
            Self::UnsupportedBackend { .. } => 200,
            Self::ModelLoad { .. } => 201,
            Self::Inference { .. } => 300,
            Self::Cancelled => 400,
        }
    }

    /// Whether re-submitting the same job could succeed.
    ///
    /// Only model loading depends on transient conditions (network, disk).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ModelLoad { .. })
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, UpscaleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = UpscaleError::FactorMismatch {
            requested: 4,
            model: ModelId::Slim2x,
            scale: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("4x"));
        assert!(msg.contains("slim-2x"));
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(UpscaleError::Cancelled.to_string(), "Upscaling cancelled");
    }

    #[test]
    fn test_error_codes_are_grouped() {
        assert_eq!(UpscaleError::InvalidDimension("x".into()).error_code(), 100);
        assert_eq!(
            UpscaleError::UnsupportedBackend {
                backend: BackendId::Gpu,
                reason: "none".into()
            }
            .error_code(),
            200
        );
        assert_eq!(
            UpscaleError::Inference {
                tile: 0,
                reason: "boom".into()
            }
            .error_code(),
            300
        );
    }

    #[test]
    fn test_only_model_load_is_retryable() {
        assert!(UpscaleError::ModelLoad {
            model: ModelId::Slim2x,
            reason: "offline".into()
        }
        .is_retryable());
        assert!(!UpscaleError::Cancelled.is_retryable());
        assert!(!UpscaleError::InvalidBuffer("short".into()).is_retryable());
    }
}
