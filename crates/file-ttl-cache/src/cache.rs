//! File-backed key-value cache with TTL expiration

use crate::error::{FileCacheError, Result};
use crate::path::shard_path;
use crate::types::{CacheConfig, CacheRecord, CacheStats};
use crate::walk::{is_stale_temp, temp_path_for, walk_files};
use chrono::{Duration, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, info, warn};

/// Extension stripped from file names when recovering keys
const RECORD_EXTENSION: &str = ".json";

/// Distinguishes concurrent temporary files within this process
static WRITE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A key-value cache storing one JSON record per key beneath a hash-sharded
/// directory tree
///
/// There is no in-memory index: every operation goes to the filesystem, so
/// several instances may point at the same directory.
pub struct FileCache {
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    purged: AtomicU64,
}

impl FileCache {
    /// Create a cache rooted at `base_dir` with the default shard layout
    pub async fn new(base_dir: impl Into<PathBuf>, default_ttl: Duration) -> Result<Self> {
        Self::with_config(CacheConfig::new(base_dir, default_ttl)).await
    }

    /// Create a cache from an explicit configuration, creating the base directory
    pub async fn with_config(config: CacheConfig) -> Result<Self> {
        fs::create_dir_all(&config.base_dir)
            .await
            .map_err(|source| FileCacheError::DirectoryCreationFailed {
                path: config.base_dir.clone(),
                source,
            })?;
        info!(
            base_dir = ?config.base_dir,
            default_ttl_secs = config.default_ttl.num_seconds(),
            "File cache initialized"
        );

        Ok(Self {
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            purged: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Path of the file backing `key`
    pub fn resolve_path(&self, key: &str) -> Result<PathBuf> {
        shard_path(
            &self.config.base_dir,
            key,
            self.config.shard_levels,
            self.config.shard_prefix_len,
        )
    }

    /// Store `payload` under `key` with the default TTL
    pub async fn set(&self, key: &str, payload: &[u8]) -> Result<()> {
        self.set_with_ttl(key, payload, self.config.default_ttl).await
    }

    /// Store `payload` under `key`, replacing any existing record
    ///
    /// A zero or negative `ttl` writes a record that is already expired.
    pub async fn set_with_ttl(&self, key: &str, payload: &[u8], ttl: Duration) -> Result<()> {
        let record = CacheRecord::new(key, payload, Utc::now(), ttl);
        let path = self.resolve_path(key)?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| FileCacheError::DirectoryCreationFailed {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let bytes = record
            .encode()
            .map_err(FileCacheError::SerializationFailed)?;
        write_replacing(&path, &bytes).await?;

        debug!(key = %key, size = payload.len(), expires_at = %record.expires_at, "Cached item");
        Ok(())
    }

    /// Read the payload stored under `key`
    ///
    /// Fails with [`FileCacheError::Expired`] once the record's TTL has
    /// passed, deleting the file first when purge-on-read is enabled.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve_path(key)?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache miss");
                return Err(FileCacheError::NotFound(key.to_string()));
            }
            Err(source) => return Err(FileCacheError::ReadFailed { path, source }),
        };

        let record = CacheRecord::decode(&bytes)
            .map_err(|source| FileCacheError::CorruptRecord { path: path.clone(), source })?;

        if record.is_expired_at(Utc::now()) {
            self.expired.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, expires_at = %record.expires_at, "Cache entry expired");
            if self.config.purge_on_read && fs::remove_file(&path).await.is_ok() {
                self.purged.fetch_add(1, Ordering::Relaxed);
            }
            return Err(FileCacheError::Expired(key.to_string()));
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache hit");
        Ok(record.payload)
    }

    /// [`get`](Self::get) decoded as text; invalid UTF-8 is replaced
    pub async fn get_string(&self, key: &str) -> Result<String> {
        let payload = self.get(key).await?;
        Ok(match String::from_utf8(payload) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    /// Whether a live record exists under `key`
    ///
    /// Every failure, including I/O errors, reads as `false`. Use
    /// [`check`](Self::check) to tell absence apart from errors.
    pub async fn exists(&self, key: &str) -> bool {
        self.check(key).await.unwrap_or(false)
    }

    /// Like [`exists`](Self::exists), but propagates errors other than absence
    ///
    /// With purge-on-read enabled this performs a full read so that expired
    /// and corrupt records are not reported as present.
    pub async fn check(&self, key: &str) -> Result<bool> {
        let path = self.resolve_path(key)?;

        match fs::metadata(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(FileCacheError::ReadFailed { path, source }),
        }

        if !self.config.purge_on_read {
            return Ok(true);
        }

        match self.get(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_absent() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove the record under `key` regardless of its expiration
    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, "Deleted cache entry");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FileCacheError::NotFound(key.to_string()))
            }
            Err(source) => Err(FileCacheError::DeleteFailed { path, source }),
        }
    }

    /// Delete every expired, unreadable, or undecodable record file
    ///
    /// Walks the whole tree, so cost is linear in the number of stored
    /// items. Shard directories are left in place. Returns the number of
    /// files removed.
    ///
    /// Every file at or below record depth is judged as a record whatever
    /// its extension, so a foreign file placed inside a shard directory
    /// will be deleted. Temporary files left behind by abandoned writes are
    /// removed once they are old enough not to belong to a write in flight.
    pub async fn purge_expired(&self) -> Result<usize> {
        let files = walk_files(&self.config.base_dir).await?;
        let mut removed = 0;

        for file in files {
            if file.segments.len() <= self.config.shard_levels {
                continue;
            }

            let reason = if file.is_temp() {
                match fs::metadata(&file.path).await.and_then(|m| m.modified()) {
                    Ok(modified) if is_stale_temp(modified, SystemTime::now()) => "abandoned",
                    _ => continue,
                }
            } else {
                match fs::read(&file.path).await {
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(_) => "unreadable",
                    Ok(bytes) => match CacheRecord::decode(&bytes) {
                        Err(_) => "corrupt",
                        Ok(record) if record.is_expired_at(Utc::now()) => "expired",
                        Ok(_) => continue,
                    },
                }
            };

            match fs::remove_file(&file.path).await {
                Ok(()) => {
                    removed += 1;
                    debug!(path = ?file.path, reason, "Purged cache file");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = ?file.path, error = %e, "Failed to purge cache file"),
            }
        }

        self.purged.fetch_add(removed as u64, Ordering::Relaxed);
        info!(removed, base_dir = ?self.config.base_dir, "Purged expired cache entries");
        Ok(removed)
    }

    /// Recover the keys of all stored records from the directory layout
    ///
    /// Walks the whole tree. Expired records that have not been purged yet
    /// are included, and a trailing `.json` is stripped from each name.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let files = walk_files(&self.config.base_dir).await?;
        let levels = self.config.shard_levels;

        let keys = files
            .into_iter()
            .filter(|file| !file.is_temp())
            .filter_map(|file| file.segments.into_iter().nth(levels))
            .map(|name| match name.strip_suffix(RECORD_EXTENSION) {
                Some(stem) => stem.to_string(),
                None => name,
            })
            .collect();

        Ok(keys)
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
        }
    }
}

/// Write to a temporary sibling, then rename it over `path`
async fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp = temp_path_for(path, WRITE_SEQUENCE.fetch_add(1, Ordering::Relaxed));

    let written = match fs::write(&temp, bytes).await {
        Ok(()) => fs::rename(&temp, path).await,
        Err(e) => Err(e),
    };

    if written.is_err() && fs::remove_file(&temp).await.is_ok() {
        debug!(temp = ?temp, "Removed temporary file of failed write");
    }

    written.map_err(|source| FileCacheError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
