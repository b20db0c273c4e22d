//! Persistent byte cache used by the model registry.
//!
//! ```text
//! ModelRegistry ──► Arc<dyn Cache> ──┬──► DiskCacheProvider   (default)
//!                                    └──► MemoryCacheProvider (tests, ephemeral)
//! ```

mod providers;
mod traits;

pub use providers::{
    clear_disk_cache, disk_cache_stats, ClearResult, DiskCacheProvider, MemoryCacheProvider,
};
pub use traits::{BoxFuture, Cache, CacheError, GcResult, MAX_KEY_LEN};
