//! Key normalization and hash-sharded path resolution

use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};

use crate::error::{FileCacheError, Result};

/// Suffixes appended by an external naming convention, removed before hashing
const STRIPPED_SUFFIXES: [&str; 2] = ["_info.json", "_toc.json"];

/// Hex characters in a SHA-256 digest
const DIGEST_HEX_LEN: usize = 64;

/// Remove every occurrence of the known suffixes, wherever they appear in the key
pub fn normalize_key(key: &str) -> String {
    STRIPPED_SUFFIXES
        .iter()
        .fold(key.to_string(), |acc, suffix| acc.replace(suffix, ""))
}

/// Lowercase hex SHA-256 digest of the normalized key
pub fn key_digest(key: &str) -> String {
    hex::encode(Sha256::digest(normalize_key(key).as_bytes()))
}

/// `base_dir/<p1>/<p2>/.../<key>` where each `pN` is `prefix_len` digest characters
pub(crate) fn shard_path(
    base_dir: &Path,
    key: &str,
    levels: usize,
    prefix_len: usize,
) -> Result<PathBuf> {
    if levels > 0 && prefix_len == 0 {
        return Err(FileCacheError::InvalidConfiguration(
            "shard prefix length must be positive".to_string(),
        ));
    }
    match levels.checked_mul(prefix_len) {
        Some(needed) if needed <= DIGEST_HEX_LEN => {}
        _ => {
            return Err(FileCacheError::InvalidConfiguration(format!(
                "{levels} shard levels of {prefix_len} characters exceed the {DIGEST_HEX_LEN}-character digest"
            )))
        }
    }
    validate_key(key)?;

    let digest = key_digest(key);
    let mut path = base_dir.to_path_buf();
    for level in 0..levels {
        let start = level * prefix_len;
        path.push(&digest[start..start + prefix_len]);
    }
    path.push(key);

    Ok(path)
}

/// Keys become file names, so they must stay beneath the shard directory
fn validate_key(key: &str) -> Result<()> {
    let escapes = Path::new(key)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    let names_file = Path::new(key)
        .components()
        .any(|c| matches!(c, Component::Normal(_)));

    if escapes || !names_file {
        return Err(FileCacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
