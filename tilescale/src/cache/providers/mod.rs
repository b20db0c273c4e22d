//! Cache provider implementations.
//!
//! - [`MemoryCacheProvider`]: in-memory LRU cache using moka
//! - [`DiskCacheProvider`]: one file per entry under a directory

mod disk;
mod memory;

pub use disk::{clear_disk_cache, disk_cache_stats, ClearResult, DiskCacheProvider};
pub use memory::MemoryCacheProvider;
