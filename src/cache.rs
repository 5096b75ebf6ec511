//! Placeholder cache for incremental builds.
//!
//! Decoding an image and generating its blurred placeholder dominates the cost
//! of the image pass, and the same image is usually referenced by both the
//! `path.html` and `path/index.html` variants of a page (and often by many
//! pages). This module lets the pipeline reuse placeholders across files and
//! across builds.
//!
//! # Design
//!
//! The cache is **content-addressed**: a [`CacheKey`] is the SHA-256 of
//! everything that determines the placeholder:
//!
//! - absolute source path
//! - modification time and byte size of the source
//! - placeholder height and blur radius
//! - [`CACHE_FORMAT_VERSION`]
//!
//! Changing any input yields a different key, so entries are never
//! invalidated in place during a build. Stale entries are orphaned, not
//! evicted.
//!
//! ## Storage
//!
//! [`FsCache`] stores one JSON file per key under
//! `<cache_dir>/<first two hex chars>/<key>.json`. Writes are write-if-absent:
//! the value is written to a temp file in the same directory and persisted
//! with a no-clobber rename, so concurrent writers of the same key never tear
//! a file. Unreadable or corrupt entries count as misses.
//!
//! [`MemoryCache`] is the in-process equivalent for tests and one-shot runs.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

/// Version of the cache entry format. Bump this to orphan all existing
/// entries when the placeholder encoding or entry layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key/value store with idempotent writes.
///
/// Implementations must tolerate concurrent `get` and `put` from multiple
/// threads; two `put`s of the same key are equivalent to one.
pub trait ContentCache<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn put(&self, key: &K, value: &V) -> Result<(), CacheError>;
    fn invalidate(&self, key: &K) -> Result<(), CacheError>;
}

/// Hex SHA-256 cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache key for an image placeholder.
pub fn placeholder_key(
    path: &Path,
    modified: SystemTime,
    size: u64,
    placeholder_size: u32,
    blur: u32,
) -> CacheKey {
    let mtime = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let mut hasher = Sha256::new();
    hasher.update(b"placeholder\0");
    hasher.update(CACHE_FORMAT_VERSION.to_le_bytes());
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(b"\0");
    hasher.update(mtime.to_le_bytes());
    hasher.update(size.to_le_bytes());
    hasher.update(placeholder_size.to_le_bytes());
    hasher.update(blur.to_le_bytes());
    CacheKey(format!("{:x}", hasher.finalize()))
}

/// Filesystem-backed cache of JSON entries.
#[derive(Debug, Clone)]
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the entry file for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let shard = key.as_str().get(..2).unwrap_or("00");
        self.dir.join(shard).join(format!("{}.json", key.as_str()))
    }
}

impl<V> ContentCache<CacheKey, V> for FsCache
where
    V: Serialize + DeserializeOwned,
{
    fn get(&self, key: &CacheKey) -> Option<V> {
        let path = self.entry_path(key);
        let content = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }

    fn put(&self, key: &CacheKey, value: &V) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        if path.exists() {
            return Ok(());
        }
        let parent = path.parent().unwrap_or(&self.dir);
        std::fs::create_dir_all(parent)?;

        let json = serde_json::to_vec(value)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        match tmp.persist_noclobber(&path) {
            Ok(_) => Ok(()),
            // Another writer got there first with identical content
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(CacheError::Io(e.error)),
        }
    }

    fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory cache. Nothing survives the process.
#[derive(Debug)]
pub struct MemoryCache<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for MemoryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> MemoryCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> ContentCache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn put(&self, key: &K, value: &V) -> Result<(), CacheError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Ok(())
    }

    fn invalidate(&self, key: &K) -> Result<(), CacheError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
        Ok(())
    }
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    pub write_failures: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }

    pub fn merge(&mut self, other: CacheStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.write_failures += other.write_failures;
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.misses,
                self.total()
            )?;
        } else {
            write!(f, "{} generated", self.misses)?;
        }
        if self.write_failures > 0 {
            write!(f, ", {} cache writes failed", self.write_failures)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        value: String,
    }

    fn entry(v: &str) -> Entry {
        Entry { value: v.into() }
    }

    fn key(n: u64) -> CacheKey {
        placeholder_key(Path::new("/img/a.png"), UNIX_EPOCH, n, 20, 10)
    }

    // =========================================================================
    // Keys
    // =========================================================================

    #[test]
    fn key_is_deterministic_hex() {
        let a = key(100);
        let b = key(100);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn key_varies_with_every_component() {
        let base = placeholder_key(Path::new("/a.png"), UNIX_EPOCH, 10, 20, 10);
        let later = UNIX_EPOCH + Duration::from_secs(1);
        assert_ne!(base, placeholder_key(Path::new("/b.png"), UNIX_EPOCH, 10, 20, 10));
        assert_ne!(base, placeholder_key(Path::new("/a.png"), later, 10, 20, 10));
        assert_ne!(base, placeholder_key(Path::new("/a.png"), UNIX_EPOCH, 11, 20, 10));
        assert_ne!(base, placeholder_key(Path::new("/a.png"), UNIX_EPOCH, 10, 16, 10));
        assert_ne!(base, placeholder_key(Path::new("/a.png"), UNIX_EPOCH, 10, 20, 5));
    }

    // =========================================================================
    // FsCache
    // =========================================================================

    #[test]
    fn fs_cache_miss_then_hit() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCache::new(tmp.path());
        let k = key(1);

        let miss: Option<Entry> = cache.get(&k);
        assert!(miss.is_none());

        cache.put(&k, &entry("a")).unwrap();
        let hit: Option<Entry> = cache.get(&k);
        assert_eq!(hit, Some(entry("a")));
    }

    #[test]
    fn fs_cache_is_sharded_by_key_prefix() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCache::new(tmp.path());
        let k = key(2);
        cache.put(&k, &entry("a")).unwrap();
        let expected = tmp
            .path()
            .join(&k.as_str()[..2])
            .join(format!("{}.json", k.as_str()));
        assert!(expected.exists());
        assert_eq!(cache.entry_path(&k), expected);
    }

    #[test]
    fn fs_cache_put_is_write_if_absent() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCache::new(tmp.path());
        let k = key(3);
        cache.put(&k, &entry("first")).unwrap();
        cache.put(&k, &entry("second")).unwrap();
        let got: Option<Entry> = cache.get(&k);
        assert_eq!(got, Some(entry("first")));
    }

    #[test]
    fn fs_cache_concurrent_puts_do_not_corrupt() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCache::new(tmp.path());
        let k = key(4);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    ContentCache::<CacheKey, Entry>::put(&cache, &k, &entry("same")).unwrap();
                });
            }
        });
        let got: Option<Entry> = cache.get(&k);
        assert_eq!(got, Some(entry("same")));
    }

    #[test]
    fn fs_cache_corrupt_entry_is_miss() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCache::new(tmp.path());
        let k = key(5);
        let path = cache.entry_path(&k);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        let got: Option<Entry> = cache.get(&k);
        assert!(got.is_none());
    }

    #[test]
    fn fs_cache_invalidate() {
        let tmp = TempDir::new().unwrap();
        let cache = FsCache::new(tmp.path());
        let k = key(6);
        cache.put(&k, &entry("a")).unwrap();
        ContentCache::<CacheKey, Entry>::invalidate(&cache, &k).unwrap();
        let got: Option<Entry> = cache.get(&k);
        assert!(got.is_none());
        // Invalidating a missing key is fine
        ContentCache::<CacheKey, Entry>::invalidate(&cache, &k).unwrap();
    }

    // =========================================================================
    // MemoryCache
    // =========================================================================

    #[test]
    fn memory_cache_roundtrip() {
        let cache: MemoryCache<CacheKey, Entry> = MemoryCache::new();
        let k = key(7);
        assert!(cache.get(&k).is_none());
        cache.put(&k, &entry("a")).unwrap();
        cache.put(&k, &entry("b")).unwrap();
        assert_eq!(cache.get(&k), Some(entry("a")));
        assert_eq!(cache.len(), 1);
        cache.invalidate(&k).unwrap();
        assert!(cache.is_empty());
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_hits() {
        let s = CacheStats {
            hits: 5,
            misses: 2,
            write_failures: 0,
        };
        assert_eq!(format!("{}", s), "5 cached, 2 generated (7 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let s = CacheStats {
            misses: 3,
            ..Default::default()
        };
        assert_eq!(format!("{}", s), "3 generated");
    }

    #[test]
    fn cache_stats_display_write_failures() {
        let s = CacheStats {
            hits: 1,
            misses: 1,
            write_failures: 1,
        };
        assert_eq!(
            format!("{}", s),
            "1 cached, 1 generated (2 total), 1 cache writes failed"
        );
    }
}
