//! File-backed key-value cache with per-item TTL expiration
//!
//! Each item is stored as a JSON record under a directory path derived from
//! the SHA-256 digest of its key, sharded into nested directories:
//!
//! ```text
//! <base_dir>/ab/cd/ef/<key>
//! ```
//!
//! Expired records are treated as absent, deleted when a read discovers
//! them, and removed in bulk by [`FileCache::purge_expired`].

mod cache;
mod error;
mod path;
mod types;
mod walk;

pub use cache::FileCache;
pub use error::{FileCacheError, Result};
pub use path::{key_digest, normalize_key};
pub use types::{CacheConfig, CacheRecord, CacheStats};
