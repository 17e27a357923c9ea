//! Error types for the file cache

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum FileCacheError {
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    SerializationFailed(serde_json::Error),
    WriteFailed { path: PathBuf, source: io::Error },
    ReadFailed { path: PathBuf, source: io::Error },
    NotFound(String),
    Expired(String),
    CorruptRecord { path: PathBuf, source: serde_json::Error },
    DeleteFailed { path: PathBuf, source: io::Error },
    WalkFailed { path: PathBuf, source: io::Error },
    InvalidKey(String),
    InvalidConfiguration(String),
}

impl fmt::Display for FileCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, source } => {
                write!(f, "Failed to create directory {}: {source}", path.display())
            }
            Self::SerializationFailed(err) => write!(f, "Failed to serialize cache record: {err}"),
            Self::WriteFailed { path, source } => {
                write!(f, "Failed to write cache file {}: {source}", path.display())
            }
            Self::ReadFailed { path, source } => {
                write!(f, "Failed to read cache file {}: {source}", path.display())
            }
            Self::NotFound(key) => write!(f, "Cache entry not found: {key}"),
            Self::Expired(key) => write!(f, "Cache entry expired: {key}"),
            Self::CorruptRecord { path, source } => {
                write!(f, "Failed to parse cache file {}: {source}", path.display())
            }
            Self::DeleteFailed { path, source } => {
                write!(f, "Failed to delete cache file {}: {source}", path.display())
            }
            Self::WalkFailed { path, source } => {
                write!(f, "Failed to walk cache directory {}: {source}", path.display())
            }
            Self::InvalidKey(key) => write!(f, "Invalid cache key: {key:?}"),
            Self::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for FileCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DirectoryCreationFailed { source, .. }
            | Self::WriteFailed { source, .. }
            | Self::ReadFailed { source, .. }
            | Self::DeleteFailed { source, .. }
            | Self::WalkFailed { source, .. } => Some(source),
            Self::SerializationFailed(err) | Self::CorruptRecord { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

impl FileCacheError {
    /// True for the two conditions that mean "no live record under this key"
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Expired(_))
    }
}

pub type Result<T> = std::result::Result<T, FileCacheError>;
