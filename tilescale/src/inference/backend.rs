//! Compute backend selection.
//!
//! A backend is resolved once per job, before the model. Resolution probes the
//! environment and either returns a [`BackendHandle`] describing what will run
//! inference or fails with `UnsupportedBackend`. There is no fallback from one
//! backend to another: asking for `gpu` on a machine without an adapter is an
//! error the caller sees.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, UpscaleError};

/// Compute backends a job can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// Host CPU via the rayon thread pool.
    Cpu,
    /// GPU adapter via wgpu (requires the `gpu` feature).
    ///
    /// Resolution requires a working adapter and records its name as the
    /// device label. The built-in kernel models still execute on the rayon
    /// pool; only the label and queue parallelism of the handle differ.
    Gpu,
}

impl BackendId {
    /// All backends, in preference order.
    pub fn all() -> &'static [BackendId] {
        &[BackendId::Cpu, BackendId::Gpu]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Cpu => "cpu",
            BackendId::Gpu => "gpu",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(BackendId::Cpu),
            "gpu" | "webgpu" => Ok(BackendId::Gpu),
            other => Err(format!("unknown backend '{}' (expected cpu or gpu)", other)),
        }
    }
}

/// A successfully initialized backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendHandle {
    id: BackendId,
    device: String,
    parallelism: usize,
}

impl BackendHandle {
    pub fn new(id: BackendId, device: impl Into<String>, parallelism: usize) -> Self {
        Self {
            id,
            device: device.into(),
            parallelism,
        }
    }

    pub fn id(&self) -> BackendId {
        self.id
    }

    /// Adapter or host description.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Worker threads (CPU) or 1 (GPU queue).
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }
}

/// Probes and initializes compute backends.
pub trait BackendResolver: Send + Sync {
    /// Initialize `id` or report why it is unavailable.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedBackend` if the environment cannot provide it.
    fn resolve(&self, id: BackendId) -> Result<BackendHandle>;
}

/// Resolver that inspects the running machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBackendResolver;

impl SystemBackendResolver {
    pub fn new() -> Self {
        Self
    }

    fn resolve_cpu(&self) -> BackendHandle {
        let threads = rayon::current_num_threads();
        BackendHandle::new(BackendId::Cpu, format!("cpu ({} threads)", threads), threads)
    }

    #[cfg(feature = "gpu")]
    fn resolve_gpu(&self) -> Result<BackendHandle> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| UpscaleError::UnsupportedBackend {
            backend: BackendId::Gpu,
            reason: format!("no adapter: {}", e),
        })?;

        let info = adapter.get_info();
        tracing::debug!(adapter = %info.name, api = ?info.backend, "GPU adapter found");
        Ok(BackendHandle::new(
            BackendId::Gpu,
            format!("{} ({:?})", info.name, info.backend),
            1,
        ))
    }

    #[cfg(not(feature = "gpu"))]
    fn resolve_gpu(&self) -> Result<BackendHandle> {
        Err(UpscaleError::UnsupportedBackend {
            backend: BackendId::Gpu,
            reason: "built without the `gpu` feature".to_string(),
        })
    }
}

impl BackendResolver for SystemBackendResolver {
    fn resolve(&self, id: BackendId) -> Result<BackendHandle> {
        let handle = match id {
            BackendId::Cpu => self.resolve_cpu(),
            BackendId::Gpu => self.resolve_gpu()?,
        };
        info!(backend = %id, device = handle.device(), "Backend resolved");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_id_parse() {
        assert_eq!("cpu".parse::<BackendId>().unwrap(), BackendId::Cpu);
        assert_eq!(" GPU ".parse::<BackendId>().unwrap(), BackendId::Gpu);
        assert_eq!("webgpu".parse::<BackendId>().unwrap(), BackendId::Gpu);
        assert!("tpu".parse::<BackendId>().is_err());
    }

    #[test]
    fn test_backend_id_display_round_trips() {
        for id in BackendId::all() {
            assert_eq!(id.to_string().parse::<BackendId>().unwrap(), *id);
        }
    }

    #[test]
    fn test_backend_id_serde_lowercase() {
        assert_eq!(serde_json::to_string(&BackendId::Gpu).unwrap(), "\"gpu\"");
        let id: BackendId = serde_json::from_str("\"cpu\"").unwrap();
        assert_eq!(id, BackendId::Cpu);
    }

    #[test]
    fn test_cpu_always_resolves() {
        let handle = SystemBackendResolver::new().resolve(BackendId::Cpu).unwrap();
        assert_eq!(handle.id(), BackendId::Cpu);
        assert!(handle.parallelism() >= 1);
        assert!(handle.device().starts_with("cpu"));
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn test_gpu_unsupported_without_feature() {
        let err = SystemBackendResolver::new().resolve(BackendId::Gpu).unwrap_err();
        assert!(matches!(
            err,
            UpscaleError::UnsupportedBackend {
                backend: BackendId::Gpu,
                ..
            }
        ));
        assert!(!err.is_retryable());
    }
}
