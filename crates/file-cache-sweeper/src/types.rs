//! Configuration for the cache sweeper

use std::path::PathBuf;

/// Sweeper configuration parsed from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    pub cache_dir: PathBuf,
    /// Default TTL of the cache handle the sweeper opens
    pub cache_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    /// Run a single sweep and exit, for use from cron-style schedulers
    pub run_once: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache/files"),
            cache_ttl_secs: 24 * 60 * 60, // 24 hours
            sweep_interval_secs: 5 * 60, // 5 minutes
            run_once: false,
        }
    }
}

impl SweeperConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from a variable lookup; missing or unparsable values keep their defaults
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let cache_dir = var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let cache_ttl_secs = var("CACHE_TTL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.cache_ttl_secs);

        let sweep_interval_secs = var("SWEEP_INTERVAL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.sweep_interval_secs);

        let run_once = var("SWEEP_ONCE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.run_once);

        Self {
            cache_dir,
            cache_ttl_secs,
            sweep_interval_secs,
            run_once,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SweeperConfig::default();
        assert_eq!(config.cache_dir, PathBuf::from("./cache/files"));
        assert_eq!(config.cache_ttl_secs, 86_400);
        assert_eq!(config.sweep_interval_secs, 300);
        assert!(!config.run_once);
    }

    #[test]
    fn test_from_vars_empty_uses_defaults() {
        assert_eq!(SweeperConfig::from_vars(lookup(&[])), SweeperConfig::default());
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = SweeperConfig::from_vars(lookup(&[
            ("CACHE_DIR", "/var/cache/files"),
            ("CACHE_TTL_SECS", "3600"),
            ("SWEEP_INTERVAL_SECS", "60"),
            ("SWEEP_ONCE", "true"),
        ]));
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/files"));
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.sweep_interval_secs, 60);
        assert!(config.run_once);
    }

    #[test]
    fn test_from_vars_ignores_bad_ttl() {
        let config = SweeperConfig::from_vars(lookup(&[("CACHE_TTL_SECS", "-5")]));
        assert_eq!(config.cache_ttl_secs, 86_400);
    }

    #[test]
    fn test_from_vars_sweep_once_flag() {
        assert!(SweeperConfig::from_vars(lookup(&[("SWEEP_ONCE", "1")])).run_once);
        assert!(SweeperConfig::from_vars(lookup(&[("SWEEP_ONCE", "TRUE")])).run_once);
        assert!(!SweeperConfig::from_vars(lookup(&[("SWEEP_ONCE", "no")])).run_once);
    }

    #[test]
    fn test_from_vars_ignores_bad_interval() {
        let config = SweeperConfig::from_vars(lookup(&[("SWEEP_INTERVAL_SECS", "soon")]));
        assert_eq!(config.sweep_interval_secs, 300);

        let config = SweeperConfig::from_vars(lookup(&[("SWEEP_INTERVAL_SECS", "0")]));
        assert_eq!(config.sweep_interval_secs, 300);
    }
}
