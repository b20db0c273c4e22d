//! In-memory cache provider using moka.
//!
//! Entries are weighted by their byte length; moka evicts least-recently-used
//! entries once the total weight passes the configured maximum. Used in tests
//! and for short-lived processes that do not want a model directory on disk.

use std::time::{Duration, Instant};

use moka::future::Cache as MokaCache;

use crate::cache::traits::{check_key, BoxFuture, Cache, CacheError, GcResult};

/// Size-bounded in-memory cache.
pub struct MemoryCacheProvider {
    cache: MokaCache<String, Vec<u8>>,
    max_size_bytes: u64,
}

impl MemoryCacheProvider {
    /// Create a provider holding at most `max_size_bytes` of values.
    ///
    /// # Arguments
    ///
    /// * `max_size_bytes` - Total weight limit
    /// * `ttl` - Optional time-to-live for entries
    pub fn new(max_size_bytes: u64, ttl: Option<Duration>) -> Self {
        let mut builder = MokaCache::builder()
            .weigher(|_key: &String, value: &Vec<u8>| -> u32 {
                value.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes);

        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            cache: builder.build(),
            max_size_bytes,
        }
    }
}

impl Cache for MemoryCacheProvider {
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), CacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            check_key(&key)?;
            if value.len() as u64 > self.max_size_bytes {
                return Err(CacheError::ValueTooLarge {
                    size: value.len() as u64,
                    max: self.max_size_bytes,
                });
            }
            self.cache.insert(key, value).await;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.get(&key).await) })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.remove(&key).await.is_some()) })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.contains_key(&key)) })
    }

    fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    fn gc(&self) -> BoxFuture<'_, Result<GcResult, CacheError>> {
        Box::pin(async move {
            let start = Instant::now();
            let size_before = self.cache.weighted_size();
            let count_before = self.cache.entry_count();

            self.cache.run_pending_tasks().await;

            Ok(GcResult {
                entries_removed: count_before.saturating_sub(self.cache.entry_count()) as usize,
                bytes_freed: size_before.saturating_sub(self.cache.weighted_size()),
                duration_ms: start.elapsed().as_millis() as u64,
            })
        })
    }
}
