//! Core traits for the persistent cache.
//!
//! The [`Cache`] trait is a plain key-value interface over bytes. The model
//! registry stores serialized model definitions through it under keys of the
//! form `model:{id}`; providers decide where the bytes live.
//!
//! # Design
//!
//! - **String keys**: readable in logs, easy to namespace
//! - **`Vec<u8>` values**: providers impose no serialization
//! - **Dyn-compatible**: async methods return [`BoxFuture`] so the registry can
//!   hold an `Arc<dyn Cache>`
//!
//! # Example
//!
//! ```
//! # tokio_test_block_on(async {
//! use tilescale::cache::{Cache, MemoryCacheProvider};
//!
//! let cache = MemoryCacheProvider::new(1024 * 1024, None);
//! cache.set("model:slim-2x", b"{}".to_vec()).await.unwrap();
//! assert_eq!(cache.get("model:slim-2x").await.unwrap(), Some(b"{}".to_vec()));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Longest key a provider accepts.
pub const MAX_KEY_LEN: usize = 512;

/// Outcome of a garbage collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcResult {
    pub entries_removed: usize,
    pub bytes_freed: u64,
    pub duration_ms: u64,
}

impl fmt::Display for GcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GC: removed {} entries, freed {} bytes in {}ms",
            self.entries_removed, self.bytes_freed, self.duration_ms
        )
    }
}

/// Errors from cache providers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key too large: {size} bytes (max: {max})")]
    KeyTooLarge { size: usize, max: usize },

    #[error("Value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: u64, max: u64 },

    /// A blocking task could not be joined.
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Key-value byte cache.
///
/// All implementations are `Send + Sync` and safe to share across tasks.
pub trait Cache: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Providers may evict older entries to stay under their size limit.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if I/O fails or the key/value exceeds limits.
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Fetch the value under `key`, `Ok(None)` if absent.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, CacheError>>;

    /// Remove `key`. Returns whether it existed.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>>;

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>>;

    /// Current stored size in bytes.
    fn size_bytes(&self) -> u64;

    fn entry_count(&self) -> u64;

    fn max_size_bytes(&self) -> u64;

    /// Evict until the provider is within its size limit.
    fn gc(&self) -> BoxFuture<'_, Result<GcResult, CacheError>>;
}

pub(crate) fn check_key(key: &str) -> Result<(), CacheError> {
    if key.len() > MAX_KEY_LEN {
        return Err(CacheError::KeyTooLarge {
            size: key.len(),
            max: MAX_KEY_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gc_result_display() {
        let result = GcResult {
            entries_removed: 10,
            bytes_freed: 1024,
            duration_ms: 50,
        };
        let display = result.to_string();
        assert!(display.contains("10 entries"));
        assert!(display.contains("1024 bytes"));
        assert!(display.contains("50ms"));
    }

    #[test]
    fn test_cache_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CacheError = io_err.into();
        assert!(matches!(err, CacheError::Io(_)));
    }

    #[test]
    fn test_check_key_limit() {
        assert!(check_key("model:slim-2x").is_ok());
        let long = "k".repeat(MAX_KEY_LEN + 1);
        assert!(matches!(
            check_key(&long),
            Err(CacheError::KeyTooLarge { size, max: MAX_KEY_LEN }) if size == MAX_KEY_LEN + 1
        ));
    }
}
