mod api;
mod config;
mod daily;
mod db;
mod error;
mod fetcher;
mod parse;
mod state;
mod tracker;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, RuntimeOptions};
use crate::daily::DailyTotals;
use crate::db::KvStore;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::state::RecordStore;
use crate::tracker::FundraiserTracker;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Daily totals store ---
    let daily = if cfg.daily_totals {
        let store = if cfg.db_path == ":memory:" {
            KvStore::in_memory().await?
        } else {
            KvStore::connect(&cfg.db_path).await?
        };
        info!("Daily totals stored in {}", cfg.db_path);
        Some(DailyTotals::new(store))
    } else {
        warn!("DAILY_TOTALS disabled; no per-day history will be kept");
        None
    };

    // --- Shared state ---
    let records = RecordStore::new();
    let options = Arc::new(RuntimeOptions::new(cfg.log_errors));
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());
    let fetcher = Arc::new(Fetcher::new(&cfg)?);

    // --- One tracker per fundraiser ---
    for fundraiser in &cfg.fundraisers {
        let tracker = FundraiserTracker::new(
            fundraiser.clone(),
            Arc::clone(&fetcher),
            Arc::clone(&records),
            daily.clone(),
            Arc::clone(&options),
            Arc::clone(&latency),
            Arc::clone(&health),
            cfg.scan_interval_secs,
        );
        tokio::spawn(async move { tracker.run().await });
    }
    info!(
        "Started {} tracker(s), source={:?}, every {}s",
        cfg.fundraisers.len(),
        fetcher.source(),
        cfg.scan_interval_secs,
    );

    // --- HTTP API server ---
    let app = router(ApiState { records, options, health, latency });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
