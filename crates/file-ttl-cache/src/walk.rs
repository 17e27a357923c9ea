//! Storage tree traversal

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::warn;

use crate::error::{FileCacheError, Result};

/// Name marker of in-flight writes, see [`temp_path_for`]
const TEMP_SUFFIX: &str = ".partial";

/// Age after which a temporary file can no longer belong to a write in flight
const STALE_TEMP_AGE: Duration = Duration::from_secs(10 * 60);

/// A non-directory entry found beneath the storage root
#[derive(Debug)]
pub(crate) struct WalkedFile {
    pub path: PathBuf,
    /// Path segments relative to the storage root, file name last
    pub segments: Vec<String>,
}

impl WalkedFile {
    pub fn is_temp(&self) -> bool {
        self.segments
            .last()
            .is_some_and(|name| name.starts_with('.') && name.ends_with(TEMP_SUFFIX))
    }
}

/// Collect every file beneath `root`
///
/// Only a failure to list `root` itself is an error; unreadable
/// subdirectories are logged and skipped.
pub(crate) async fn walk_files(root: &Path) -> Result<Vec<WalkedFile>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(source) if dir.as_path() == root => {
                return Err(FileCacheError::WalkFailed { path: dir, source });
            }
            Err(e) => {
                warn!(dir = ?dir, error = %e, "Skipping unreadable cache directory");
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = ?dir, error = %e, "Failed to list cache directory");
                    break;
                }
            };
            let path = entry.path();
            match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => pending.push(path),
                Ok(_) => {
                    let segments = relative_segments(root, &path);
                    files.push(WalkedFile { path, segments });
                }
                Err(e) => warn!(path = ?path, error = %e, "Failed to stat cache entry"),
            }
        }
    }

    Ok(files)
}

fn relative_segments(root: &Path, path: &Path) -> Vec<String> {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Sibling path that a write goes to before being renamed over `path`
pub(crate) fn temp_path_for(path: &Path, sequence: u64) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        ".{name}.{}.{sequence}{TEMP_SUFFIX}",
        std::process::id()
    ))
}

/// Whether a temporary file last modified at `modified` was abandoned
pub(crate) fn is_stale_temp(modified: SystemTime, now: SystemTime) -> bool {
    now.duration_since(modified)
        .is_ok_and(|age| age >= STALE_TEMP_AGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_walk_collects_nested_files() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("ab/cd/ef");
        fs::create_dir_all(&nested).await.unwrap();
        fs::write(nested.join("key"), b"{}").await.unwrap();
        fs::write(dir.path().join("stray"), b"").await.unwrap();

        let mut files = walk_files(dir.path()).await.unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].segments, vec!["ab", "cd", "ef", "key"]);
        assert_eq!(files[1].segments, vec!["stray"]);
    }

    #[tokio::test]
    async fn test_walk_skips_directories_only() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("ab/cd/ef")).await.unwrap();

        let files = walk_files(dir.path()).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_walk_missing_root_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");

        let err = walk_files(&missing).await.unwrap_err();
        assert!(matches!(err, FileCacheError::WalkFailed { .. }));
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/cache/ab/cd/ef/key"), 7);
        assert_eq!(temp.parent(), Some(Path::new("/cache/ab/cd/ef")));

        let walked = WalkedFile {
            segments: vec!["ab".into(), "cd".into(), "ef".into(), relative_name(&temp)],
            path: temp,
        };
        assert!(walked.is_temp());
    }

    #[test]
    fn test_regular_file_is_not_temp() {
        let walked = WalkedFile {
            path: PathBuf::from("/cache/ab/cd/ef/key.json"),
            segments: vec!["ab".into(), "cd".into(), "ef".into(), "key.json".into()],
        };
        assert!(!walked.is_temp());
    }

    #[test]
    fn test_stale_temp_age() {
        let now = SystemTime::now();
        assert!(!is_stale_temp(now, now));
        assert!(!is_stale_temp(now - Duration::from_secs(60), now));
        assert!(is_stale_temp(now - STALE_TEMP_AGE, now));
        assert!(is_stale_temp(now - Duration::from_secs(24 * 60 * 60), now));
        // Clock skew puts the file in the future
        assert!(!is_stale_temp(now + Duration::from_secs(60), now));
    }

    fn relative_name(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }
}
