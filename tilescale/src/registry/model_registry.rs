//! The default [`ModelResolver`]: in-process map, persistent cache, network.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::cache::{BoxFuture, Cache, CacheError, DiskCacheProvider};
use crate::error::{Result, UpscaleError};
use crate::inference::{BackendHandle, BackendId, BackendResolver, ModelHandle, SystemBackendResolver};
use crate::orchestrator::{ProgressSink, UpscalingProgress};
use crate::telemetry::JobMetrics;

use super::http::{FetchError, HttpClient, ReqwestClient};
use super::loader::{KernelModelLoader, ModelLoader};
use super::{ModelId, ModelResolver};

/// Where model definitions are downloaded from by default.
pub const DEFAULT_BASE_URL: &str = "https://models.tilescale.dev/v1";

/// Message emitted when the registry falls back to the network.
const DOWNLOAD_MESSAGE: &str = "Downloading model...";

/// Errors building a registry from configuration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Model cache unavailable: {0}")]
    Cache(#[from] CacheError),

    #[error("HTTP client unavailable: {0}")]
    Http(#[from] FetchError),
}

/// Registry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub base_url: String,
    pub cache_directory: PathBuf,
    pub cache_size: u64,
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_directory: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".tilescale")
                .join("models"),
            cache_size: 512 * 1024 * 1024,
            timeout: Duration::from_secs(60),
        }
    }
}

impl RegistryConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_cache_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.cache_directory = directory.into();
        self
    }

    pub fn with_cache_size(mut self, bytes: u64) -> Self {
        self.cache_size = bytes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Download URL for a model definition.
    pub fn definition_url(&self, id: ModelId) -> String {
        format!("{}/{}.json", self.base_url.trim_end_matches('/'), id)
    }
}

/// Process-wide model store.
///
/// Loaded models stay in memory until [`evict`](Self::evict) or
/// [`clear`](Self::clear). Cache writes after a download run in the
/// background; [`flush`](Self::flush) waits for them.
pub struct ModelRegistry {
    config: RegistryConfig,
    backends: Arc<dyn BackendResolver>,
    cache: Arc<dyn Cache>,
    http: Arc<dyn HttpClient>,
    loader: Arc<dyn ModelLoader>,
    metrics: Arc<JobMetrics>,
    loaded: RwLock<HashMap<(ModelId, BackendId), ModelHandle>>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl ModelRegistry {
    /// Create a registry over the given cache and HTTP client.
    ///
    /// Backends are probed with [`SystemBackendResolver`] and definitions are
    /// loaded with [`KernelModelLoader`] unless overridden.
    pub fn new(config: RegistryConfig, cache: Arc<dyn Cache>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            backends: Arc::new(SystemBackendResolver::new()),
            cache,
            http,
            loader: Arc::new(KernelModelLoader),
            metrics: Arc::new(JobMetrics::new()),
            loaded: RwLock::new(HashMap::new()),
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    /// Registry backed by a disk cache and a reqwest client.
    ///
    /// # Errors
    ///
    /// Fails if the cache directory cannot be created or the HTTP client
    /// cannot be built.
    pub fn from_config(config: RegistryConfig) -> std::result::Result<Self, RegistryError> {
        let cache = DiskCacheProvider::new(&config.cache_directory, config.cache_size)?;
        let http = ReqwestClient::with_timeout(config.timeout)?;
        Ok(Self::new(config, Arc::new(cache), Arc::new(http)))
    }

    pub fn with_backend_resolver(mut self, backends: Arc<dyn BackendResolver>) -> Self {
        self.backends = backends;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<JobMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn is_loaded(&self, id: ModelId) -> bool {
        self.loaded.read().keys().any(|(model, _)| *model == id)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.read().len()
    }

    /// Drop a model from memory. The persistent cache is untouched.
    pub fn evict(&self, id: ModelId) -> bool {
        let mut loaded = self.loaded.write();
        let before = loaded.len();
        loaded.retain(|(model, _), _| *model != id);
        let removed = loaded.len() != before;
        if removed {
            debug!(model = %id, "Model evicted");
        }
        removed
    }

    /// Drop every in-memory model.
    pub fn clear(&self) {
        self.loaded.write().clear();
    }

    /// Wait for background cache writes started so far.
    pub async fn flush(&self) {
        let pending: Vec<JoinHandle<()>> = std::mem::take(&mut *self.pending_writes.lock());
        for handle in pending {
            if let Err(e) = handle.await {
                warn!(error = %e, "Model cache write task failed");
            }
        }
    }

    fn remember(&self, id: ModelId, backend: BackendId, model: ModelHandle) -> ModelHandle {
        self.loaded.write().insert((id, backend), Arc::clone(&model));
        model
    }

    async fn load_from_cache(&self, id: ModelId, backend: &BackendHandle) -> Option<ModelHandle> {
        let bytes = match self.cache.get(&id.cache_key()).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(model = %id, error = %e, "Model cache read failed");
                return None;
            }
        };

        match self.loader.load(id, &bytes, backend) {
            Ok(model) => Some(model),
            Err(reason) => {
                warn!(model = %id, reason = %reason, "Cached model failed to load");
                None
            }
        }
    }

    async fn download(&self, id: ModelId) -> Result<Vec<u8>> {
        let url = self.config.definition_url(id);
        let http = Arc::clone(&self.http);
        info!(model = %id, url = %url, "Downloading model");

        tokio::task::spawn_blocking(move || http.get(&url))
            .await
            .map_err(|e| UpscaleError::ModelLoad {
                model: id,
                reason: format!("download task failed: {}", e),
            })?
            .map_err(|e| UpscaleError::ModelLoad {
                model: id,
                reason: format!("not cached and download failed: {}", e),
            })
    }

    fn spawn_cache_write(&self, id: ModelId, bytes: Vec<u8>) {
        let cache = Arc::clone(&self.cache);
        let handle = tokio::spawn(async move {
            match cache.set(&id.cache_key(), bytes).await {
                Ok(()) => debug!(model = %id, "Model cached"),
                Err(e) => warn!(model = %id, error = %e, "Failed to cache model"),
            }
        });

        let mut pending = self.pending_writes.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    #[instrument(skip(self, backend, progress), fields(backend = %backend.id()))]
    async fn load_model(
        &self,
        id: ModelId,
        backend: &BackendHandle,
        progress: &ProgressSink,
    ) -> Result<ModelHandle> {
        let loaded = self.loaded.read().get(&(id, backend.id())).cloned();
        if let Some(model) = loaded {
            self.metrics.model_cache_hit();
            debug!("Model already loaded");
            return Ok(model);
        }

        if let Some(model) = self.load_from_cache(id, backend).await {
            self.metrics.model_cache_hit();
            info!("Model loaded from cache");
            return Ok(self.remember(id, backend.id(), model));
        }
        self.metrics.model_cache_miss();

        progress.emit(UpscalingProgress::Progress {
            percent: 0.0,
            message: DOWNLOAD_MESSAGE.to_string(),
        });
        let bytes = self.download(id).await?;

        let model = self
            .loader
            .load(id, &bytes, backend)
            .map_err(|reason| UpscaleError::ModelLoad { model: id, reason })?;
        self.metrics.model_downloaded();

        self.spawn_cache_write(id, bytes);
        Ok(self.remember(id, backend.id(), model))
    }
}

impl ModelResolver for ModelRegistry {
    fn resolve_backend(&self, id: BackendId) -> Result<BackendHandle> {
        self.backends.resolve(id)
    }

    fn resolve_model<'a>(
        &'a self,
        id: ModelId,
        backend: &'a BackendHandle,
        progress: &'a ProgressSink,
    ) -> BoxFuture<'a, Result<ModelHandle>> {
        Box::pin(self.load_model(id, backend, progress))
    }

    fn flush(&self) -> BoxFuture<'_, ()> {
        Box::pin(ModelRegistry::flush(self))
    }
}
