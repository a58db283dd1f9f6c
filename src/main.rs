/// CS Live Tracker: scheduler + per-match trackers
///
/// What it does:
///   1. Every 30s lists unfinished matches from the tracker DB
///   2. Probes each match page; a live one gets its own tracker
///   3. Trackers poll the scoreboard, finalize maps and write win-state announcements
///   4. Finished BO3/BO5 matches are dequeued through tracker-api after 60s
///
/// Run:
///   cargo run --bin live-tracker

use anyhow::{Context, Result};
use dotenv::dotenv;
use live_sampler::HltvSampler;
use logger::EventLogger;
use match_tracker::{ActiveRegistry, HttpQueueClient, MatchScheduler, Store, TrackerConfig, TrackerContext};
use std::env;
use std::fs::File;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let config = TrackerConfig::from_env();

    info!("=== CS Live Tracker ===");
    info!("DB: {}", config.db_path);
    info!("Queue API: {}", config.api_base_url);
    info!("Logs: ./{}/", config.log_dir);

    // Single instance lock
    let lock_file_path = env::temp_dir().join("cs_live_tracker.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of live-tracker is already running! Exiting.");
            return Ok(());
        }
    };

    let store = Store::open(&config.db_path).context("open tracker db")?;
    let queue = HttpQueueClient::new(&config.api_base_url)?;
    let sampler = Arc::new(HltvSampler::new(config.page_load_timeout));

    let ctx = TrackerContext {
        store,
        registry: ActiveRegistry::new(),
        queue: Arc::new(queue),
        events: Arc::new(EventLogger::new(&config.log_dir)),
        config,
    };
    let registry = ctx.registry.clone();

    {
        let registry = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("ctrl_c handler failed: {e}");
                return;
            }
            info!("🛑 Ctrl-C received, stopping trackers...");
            registry.shutdown();
        });
    }

    let scheduler = MatchScheduler::new(ctx, sampler);
    scheduler.run().await;

    // trackers release their entry and close their tab on the way out
    for _ in 0..50 {
        if registry.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    let pending = registry.active_ids();
    if !pending.is_empty() {
        info!("Shutdown with {} tracker(s) still registered: {:?}", pending.len(), pending);
    }
    info!("Bye.");
    Ok(())
}
