//! Model and backend resolution.
//!
//! A job names a model and a backend; this module turns those names into a
//! [`BackendHandle`] and a loaded [`ModelHandle`].
//!
//! # Lookup Order
//!
//! ```text
//! resolve_model(id)
//!   │
//!   ├─► in-process map ──────── hit ──► return
//!   │
//!   ├─► persistent cache ────── hit + loads ──► remember, return
//!   │   (key "model:{id}")
//!   │
//!   └─► Progress "Downloading model..."
//!       GET {base_url}/{id}.json ── ok ──► load, remember, return
//!       │                                  └─► background cache write
//!       └── error ──► ModelLoad
//! ```
//!
//! The orchestrator only sees the [`ModelResolver`] trait, so tests can swap
//! the registry for a fake.

mod http;
mod loader;
mod model_registry;

pub use http::{FetchError, HttpClient, ReqwestClient};
pub use loader::{KernelModelLoader, ModelLoader};
pub use model_registry::{ModelRegistry, RegistryConfig, RegistryError, DEFAULT_BASE_URL};

#[cfg(test)]
pub use http::tests::MockHttpClient;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::BoxFuture;
use crate::error::Result;
use crate::inference::{BackendHandle, BackendId, ModelHandle};
use crate::orchestrator::ProgressSink;

/// Models known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "slim-2x")]
    Slim2x,
    #[serde(rename = "slim-4x")]
    Slim4x,
    #[serde(rename = "medium-2x")]
    Medium2x,
    #[serde(rename = "medium-4x")]
    Medium4x,
    #[serde(rename = "thick-4x")]
    Thick4x,
}

impl ModelId {
    pub fn all() -> &'static [ModelId] {
        &[
            ModelId::Slim2x,
            ModelId::Slim4x,
            ModelId::Medium2x,
            ModelId::Medium4x,
            ModelId::Thick4x,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Slim2x => "slim-2x",
            ModelId::Slim4x => "slim-4x",
            ModelId::Medium2x => "medium-2x",
            ModelId::Medium4x => "medium-4x",
            ModelId::Thick4x => "thick-4x",
        }
    }

    /// Linear factor the model applies.
    pub fn scale(&self) -> u32 {
        match self {
            ModelId::Slim2x | ModelId::Medium2x => 2,
            ModelId::Slim4x | ModelId::Medium4x | ModelId::Thick4x => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModelId::Slim2x => "fast 2x, smallest download",
            ModelId::Slim4x => "fast 4x, smallest download",
            ModelId::Medium2x => "balanced 2x",
            ModelId::Medium4x => "balanced 4x",
            ModelId::Thick4x => "highest quality 4x, slowest",
        }
    }

    /// Persistent cache key.
    pub fn cache_key(&self) -> String {
        format!("model:{}", self.as_str())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ModelId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = ModelId::all().iter().map(|id| id.as_str()).collect();
                format!("unknown model '{}' (expected one of {})", s, known.join(", "))
            })
    }
}

/// Resolves backends and models for a job.
pub trait ModelResolver: Send + Sync {
    /// Initialize the requested backend.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedBackend` if the environment cannot run it.
    fn resolve_backend(&self, id: BackendId) -> Result<BackendHandle>;

    /// Load `id` for `backend`, emitting download progress through `progress`.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoad` if neither the cache nor the network can supply it.
    fn resolve_model<'a>(
        &'a self,
        id: ModelId,
        backend: &'a BackendHandle,
        progress: &'a ProgressSink,
    ) -> BoxFuture<'a, Result<ModelHandle>>;

    /// Wait for background work (cache writes) to finish.
    fn flush(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_parse_and_display() {
        for id in ModelId::all() {
            assert_eq!(id.to_string().parse::<ModelId>().unwrap(), *id);
        }
        assert_eq!("THICK-4X".parse::<ModelId>().unwrap(), ModelId::Thick4x);
        let err = "huge-8x".parse::<ModelId>().unwrap_err();
        assert!(err.contains("slim-2x"));
    }

    #[test]
    fn test_model_id_scale_matches_name() {
        for id in ModelId::all() {
            assert!(id.as_str().ends_with(&format!("{}x", id.scale())));
        }
    }

    #[test]
    fn test_model_id_serde_uses_names() {
        assert_eq!(serde_json::to_string(&ModelId::Medium4x).unwrap(), "\"medium-4x\"");
        let id: ModelId = serde_json::from_str("\"slim-4x\"").unwrap();
        assert_eq!(id, ModelId::Slim4x);
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(ModelId::Slim2x.cache_key(), "model:slim-2x");
    }
}
