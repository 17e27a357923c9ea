//! Error types for the cache sweeper

use std::fmt;

#[derive(Debug)]
pub enum SweeperError {
    Cache(file_ttl_cache::FileCacheError),
    Config(String),
}

impl fmt::Display for SweeperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweeperError::Cache(err) => write!(f, "Cache error: {}", err),
            SweeperError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for SweeperError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SweeperError::Cache(err) => Some(err),
            _ => None,
        }
    }
}

impl From<file_ttl_cache::FileCacheError> for SweeperError {
    fn from(err: file_ttl_cache::FileCacheError) -> Self {
        SweeperError::Cache(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for SweeperError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        SweeperError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SweeperError>;

#[cfg(test)]
mod tests {
    use super::*;
    use file_ttl_cache::FileCacheError;

    #[test]
    fn test_cache_error_display() {
        let err = SweeperError::Cache(FileCacheError::InvalidConfiguration(
            "bad shard layout".to_string(),
        ));
        assert_eq!(
            format!("{}", err),
            "Cache error: Invalid configuration: bad shard layout"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = SweeperError::Config("bad filter".to_string());
        assert_eq!(format!("{}", err), "Configuration error: bad filter");
    }

    #[test]
    fn test_error_is_debug() {
        let err = SweeperError::Config("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Config"));
    }
}
