//! File cache sweeper
//!
//! Periodically walks a file TTL cache directory and removes expired or
//! corrupt records. Stops between sweeps on Ctrl-C.

mod error;
mod types;

use crate::error::Result;
use crate::types::SweeperConfig;
use file_ttl_cache::{CacheConfig, FileCache};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter =
        EnvFilter::from_default_env().add_directive("file_cache_sweeper=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting file cache sweeper...");

    let config = SweeperConfig::from_env();
    info!("Cache dir: {:?}", config.cache_dir);
    info!("Cache TTL: {} seconds", config.cache_ttl_secs);
    info!("Sweep interval: {} seconds", config.sweep_interval_secs);

    let cache = FileCache::with_config(cache_config(&config)).await?;

    if config.run_once {
        sweep(&cache).await?;
        return Ok(());
    }

    run(&cache, Duration::from_secs(config.sweep_interval_secs)).await;
    info!("File cache sweeper stopped");
    Ok(())
}

fn cache_config(config: &SweeperConfig) -> CacheConfig {
    let ttl_secs = i64::try_from(config.cache_ttl_secs).unwrap_or(i64::MAX);
    CacheConfig::new(
        config.cache_dir.clone(),
        chrono::Duration::try_seconds(ttl_secs).unwrap_or(chrono::Duration::MAX),
    )
}

/// Sweep on every tick until Ctrl-C; a failed sweep is logged and retried next tick
async fn run(cache: &FileCache, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = sweep(cache).await {
                    error!("Sweep failed: {}", e);
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }
}

async fn sweep(cache: &FileCache) -> Result<usize> {
    let started = std::time::Instant::now();
    let removed = cache.purge_expired().await?;
    let stats = cache.stats();
    info!(
        removed,
        total_purged = stats.purged,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Sweep complete"
    );
    Ok(removed)
}
