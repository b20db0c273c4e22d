//! On-disk cache provider.
//!
//! Each entry is one file under the cache directory, named by the SHA-256 of
//! its key:
//!
//! ```text
//! ~/.tilescale/models/
//! ├── 3f1c…9a.bin      ← "model:slim-2x"
//! └── b27e…04.bin      ← "model:thick-4x"
//! ```
//!
//! Writes go to a temporary file that is renamed into place, so readers never
//! see a half-written entry. When the directory grows past `max_size_bytes`
//! the least recently modified files are removed first.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::traits::{check_key, BoxFuture, Cache, CacheError, GcResult};

const ENTRY_EXTENSION: &str = "bin";

/// Outcome of [`clear_disk_cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearResult {
    pub files_deleted: usize,
    pub bytes_freed: u64,
}

struct Entry {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

/// File-per-entry cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct DiskCacheProvider {
    directory: PathBuf,
    max_size_bytes: u64,
}

impl DiskCacheProvider {
    /// Open (creating if needed) a cache directory.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>, max_size_bytes: u64) -> Result<Self, CacheError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            max_size_bytes,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.directory.join(format!("{}.{}", name, ENTRY_EXTENSION))
    }

    /// Remove oldest entries until the directory fits `max_size_bytes`.
    ///
    /// Runs on the blocking pool; an in-budget directory is left untouched.
    fn evict_blocking(directory: &Path, max_size_bytes: u64) -> io::Result<GcResult> {
        let start = Instant::now();
        let mut entries = scan_entries(directory)?;
        let mut total: u64 = entries.iter().map(|e| e.size).sum();
        let mut result = GcResult::default();

        entries.sort_by_key(|e| e.modified);
        for entry in entries {
            if total <= max_size_bytes {
                break;
            }
            match std::fs::remove_file(&entry.path) {
                Ok(()) => {
                    total -= entry.size;
                    result.entries_removed += 1;
                    result.bytes_freed += entry.size;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        if result.entries_removed > 0 {
            debug!(
                removed = result.entries_removed,
                bytes = result.bytes_freed,
                "Disk cache eviction"
            );
        }
        Ok(result)
    }

    async fn run_gc(&self) -> Result<GcResult, CacheError> {
        let directory = self.directory.clone();
        let max = self.max_size_bytes;
        tokio::task::spawn_blocking(move || Self::evict_blocking(&directory, max))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))?
            .map_err(CacheError::from)
    }
}

impl Cache for DiskCacheProvider {
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), CacheError>> {
        let checked = check_key(key);
        let path = self.entry_path(key);
        Box::pin(async move {
            checked?;
            if value.len() as u64 > self.max_size_bytes {
                return Err(CacheError::ValueTooLarge {
                    size: value.len() as u64,
                    max: self.max_size_bytes,
                });
            }

            let tmp = path.with_extension("tmp");
            let written = match tokio::fs::write(&tmp, &value).await {
                Ok(()) => tokio::fs::rename(&tmp, &path).await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(e.into());
            }

            self.run_gc().await?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, CacheError>> {
        let path = self.entry_path(key);
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let path = self.entry_path(key);
        Box::pin(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let path = self.entry_path(key);
        Box::pin(async move { Ok(tokio::fs::try_exists(&path).await?) })
    }

    fn size_bytes(&self) -> u64 {
        disk_cache_stats(&self.directory)
            .map(|(_, bytes)| bytes)
            .unwrap_or(0)
    }

    fn entry_count(&self) -> u64 {
        disk_cache_stats(&self.directory)
            .map(|(files, _)| files as u64)
            .unwrap_or(0)
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    fn gc(&self) -> BoxFuture<'_, Result<GcResult, CacheError>> {
        Box::pin(self.run_gc())
    }
}

fn scan_entries(directory: &Path) -> io::Result<Vec<Entry>> {
    let read_dir = match std::fs::read_dir(directory) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut entries = Vec::new();
    for item in read_dir {
        let item = item?;
        let path = item.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
            continue;
        }
        let metadata = item.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        entries.push(Entry {
            path,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }
    Ok(entries)
}

/// Delete every cache entry under `directory`.
///
/// A missing directory counts as already empty.
pub fn clear_disk_cache(directory: &Path) -> io::Result<ClearResult> {
    let mut result = ClearResult::default();
    for entry in scan_entries(directory)? {
        std::fs::remove_file(&entry.path)?;
        result.files_deleted += 1;
        result.bytes_freed += entry.size;
    }
    Ok(result)
}

/// Count entries and bytes under `directory`.
pub fn disk_cache_stats(directory: &Path) -> io::Result<(usize, u64)> {
    let entries = scan_entries(directory)?;
    let bytes = entries.iter().map(|e| e.size).sum();
    Ok((entries.len(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn provider(max: u64) -> (TempDir, DiskCacheProvider) {
        let dir = TempDir::new().unwrap();
        let cache = DiskCacheProvider::new(dir.path().join("models"), max).unwrap();
        (dir, cache)
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let (_dir, cache) = provider(1_000_000);

        cache.set("model:slim-2x", vec![7; 32]).await.unwrap();
        assert_eq!(cache.get("model:slim-2x").await.unwrap(), Some(vec![7; 32]));
        assert!(cache.contains("model:slim-2x").await.unwrap());

        assert!(cache.delete("model:slim-2x").await.unwrap());
        assert!(cache.get("model:slim-2x").await.unwrap().is_none());
        assert!(!cache.delete("model:slim-2x").await.unwrap());
    }

    #[tokio::test]
    async fn test_entries_are_hashed_files() {
        let (_dir, cache) = provider(1_000_000);
        cache.set("model:thick-4x", vec![1, 2]).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(cache.directory())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].len(), 64 + 4);
        assert!(names[0].ends_with(".bin"));
        assert!(!names[0].contains("thick"));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let (_dir, cache) = provider(1_000_000);
        cache.set("k", vec![1]).await.unwrap();
        cache.set("k", vec![2, 2]).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(vec![2, 2]));
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.size_bytes(), 2);
    }

    #[tokio::test]
    async fn test_evicts_oldest_when_over_limit() {
        let (_dir, cache) = provider(250);

        cache.set("first", vec![0; 100]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.set("second", vec![0; 100]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.set("third", vec![0; 100]).await.unwrap();

        assert!(cache.get("first").await.unwrap().is_none());
        assert!(cache.get("second").await.unwrap().is_some());
        assert!(cache.get("third").await.unwrap().is_some());
        assert!(cache.size_bytes() <= 250);
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let (_dir, cache) = provider(1_000_000);
        let target = cache.entry_path("blocked");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("occupied"), b"x").unwrap();

        assert!(matches!(
            cache.set("blocked", vec![1, 2, 3]).await,
            Err(CacheError::Io(_))
        ));
        assert!(!target.with_extension("tmp").exists());
        assert!(target.join("occupied").exists());
    }

    #[tokio::test]
    async fn test_value_over_limit_rejected() {
        let (_dir, cache) = provider(10);
        let err = cache.set("k", vec![0; 11]).await.unwrap_err();
        assert!(matches!(err, CacheError::ValueTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let (_dir, cache) = provider(1_000_000);
        cache.set("a", vec![0; 10]).await.unwrap();
        cache.set("b", vec![0; 20]).await.unwrap();
        std::fs::write(cache.directory().join("notes.txt"), b"keep").unwrap();

        assert_eq!(disk_cache_stats(cache.directory()).unwrap(), (2, 30));

        let cleared = clear_disk_cache(cache.directory()).unwrap();
        assert_eq!(
            cleared,
            ClearResult {
                files_deleted: 2,
                bytes_freed: 30
            }
        );
        assert_eq!(disk_cache_stats(cache.directory()).unwrap(), (0, 0));
        assert!(cache.directory().join("notes.txt").exists());
    }

    #[test]
    fn test_stats_on_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(disk_cache_stats(&missing).unwrap(), (0, 0));
        assert_eq!(clear_disk_cache(&missing).unwrap(), ClearResult::default());
    }
}
