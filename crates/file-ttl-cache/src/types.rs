//! Cache types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::path::normalize_key;

/// 9999-12-31T23:59:59Z, the last instant an RFC3339 timestamp can carry
const MAX_EXPIRY_SECS: i64 = 253_402_300_799;

/// A single cached item as persisted on disk
///
/// Field names follow the existing on-disk format: `data` holds the payload
/// as standard base64, `expireAt` and `created` are RFC3339 timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    #[serde(rename = "data", with = "payload_base64")]
    pub payload: Vec<u8>,
    #[serde(rename = "expireAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
}

impl CacheRecord {
    /// Build a record for `key` written at `created_at` that lives for `ttl`
    pub fn new(key: &str, payload: &[u8], created_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            key: normalize_key(key),
            payload: payload.to_vec(),
            expires_at: expiry(created_at, ttl),
            created_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// `created_at + ttl`, clamped into the range a timestamp can be persisted in
fn expiry(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    match created_at.checked_add_signed(ttl) {
        Some(t) if t >= DateTime::<Utc>::UNIX_EPOCH && t.timestamp() <= MAX_EXPIRY_SECS => t,
        _ if ttl < Duration::zero() => DateTime::<Utc>::UNIX_EPOCH,
        _ => DateTime::<Utc>::from_timestamp(MAX_EXPIRY_SECS, 0).unwrap_or(created_at),
    }
}

mod payload_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(payload))
    }

    // `null` is how an absent payload was written by older producers
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD.decode(encoded).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

/// Configuration for a [`FileCache`](crate::FileCache)
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub base_dir: PathBuf,
    pub default_ttl: Duration,
    /// Number of nested shard directories
    pub shard_levels: usize,
    /// Hex characters of the key digest consumed per shard directory
    pub shard_prefix_len: usize,
    /// Delete expired records when a read discovers them
    pub purge_on_read: bool,
}

impl CacheConfig {
    pub fn new(base_dir: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        Self {
            base_dir: base_dir.into(),
            default_ttl,
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./cache/files"),
            default_ttl: Duration::hours(24),
            shard_levels: 3,
            shard_prefix_len: 2,
            purge_on_read: true,
        }
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub purged: u64,
}
