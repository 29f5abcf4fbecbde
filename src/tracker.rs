use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::{Fundraiser, RuntimeOptions};
use crate::daily::DailyTotals;
use crate::fetcher::Fetcher;
use crate::state::RecordStore;
use crate::types::FundraiserRecord;

/// Refreshes one campaign on a fixed interval.
///
/// Cycles run one after another inside `run`, so a slow fetch delays the
/// next tick instead of overlapping with it.
pub struct FundraiserTracker {
    fundraiser: Fundraiser,
    fetcher: Arc<Fetcher>,
    records: Arc<RecordStore>,
    daily: Option<DailyTotals>,
    options: Arc<RuntimeOptions>,
    latency: Arc<LatencyStats>,
    health: Arc<HealthState>,
    interval_secs: u64,
}

impl FundraiserTracker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fundraiser: Fundraiser,
        fetcher: Arc<Fetcher>,
        records: Arc<RecordStore>,
        daily: Option<DailyTotals>,
        options: Arc<RuntimeOptions>,
        latency: Arc<LatencyStats>,
        health: Arc<HealthState>,
        interval_secs: u64,
    ) -> Self {
        records.register(&fundraiser);
        Self { fundraiser, fetcher, records, daily, options, latency, health, interval_secs }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            slug = %self.fundraiser.slug,
            source = ?self.fetcher.source(),
            interval_secs = self.interval_secs,
            "Tracking {}",
            self.fundraiser.url,
        );

        loop {
            // First tick completes immediately.
            ticker.tick().await;
            self.refresh().await;
        }
    }

    async fn refresh(&self) {
        let log_errors = self.options.log_errors();
        let slug = &self.fundraiser.slug;
        let started = Instant::now();

        let result = self.fetcher.fetch(&self.fundraiser, log_errors).await;
        self.latency.record(started.elapsed());
        let at = now_ns();

        match result {
            Ok(record) => {
                self.record_daily(&record).await;
                info!(
                    slug = %slug,
                    raised = ?record.raised,
                    goal = ?record.goal,
                    percent = ?record.percent,
                    "Fundraiser updated",
                );
                self.records.set_record(record, at);
                self.health.record_success(at);
            }
            Err(e) => {
                if log_errors {
                    error!(slug = %slug, error = ?e, "Update failed: {e}");
                } else {
                    warn!(slug = %slug, "Update failed: {e}");
                }
                self.records.set_error(slug, e.to_string(), at);
                self.health.record_failure();
            }
        }
    }

    /// Best-effort: a storage failure never blocks publishing the record.
    async fn record_daily(&self, record: &FundraiserRecord) {
        let (Some(daily), Some(raised)) = (&self.daily, record.raised) else {
            return;
        };
        let today = chrono::Local::now().date_naive();
        match daily.record(&record.slug, today, raised).await {
            Ok(summary) => self.records.set_daily(&record.slug, summary),
            Err(e) => warn!(slug = %record.slug, "Daily totals update failed: {e}"),
        }
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};

    use crate::config::{normalize_fundraiser, Config, FetchSource, STORAGE_KEY, STORAGE_VERSION};
    use crate::db::KvStore;

    /// Serves the causes API for "zosia" only; any other slug is a 404.
    async fn spawn_api() -> String {
        async fn cause(Path(slug): Path<String>) -> Result<Json<Value>, StatusCode> {
            if slug != "zosia" {
                return Err(StatusCode::NOT_FOUND);
            }
            Ok(Json(json!({ "data": { "target": { "needy": {
                "constant_helps_count": 3,
                "cause": { "funds_current": 2500, "funds_aim": 10000, "title": "Zosia" }
            }}}})))
        }

        let app = Router::new().route("/causes/:slug", get(cause));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/causes")
    }

    fn config(api_base_url: String) -> Config {
        Config {
            fundraisers: vec![],
            scan_interval_secs: 300,
            log_errors: false,
            fetch_source: FetchSource::Api,
            api_base_url,
            log_level: "info".into(),
            db_path: String::new(),
            daily_totals: true,
            api_port: 0,
        }
    }

    fn tracker(
        slug: &str,
        base: String,
        daily: Option<DailyTotals>,
    ) -> (FundraiserTracker, Arc<RecordStore>, Arc<HealthState>) {
        let records = RecordStore::new();
        let health = Arc::new(HealthState::new());
        let tracker = FundraiserTracker::new(
            normalize_fundraiser(slug).unwrap(),
            Arc::new(Fetcher::new(&config(base)).unwrap()),
            Arc::clone(&records),
            daily,
            Arc::new(RuntimeOptions::new(true)),
            Arc::new(LatencyStats::new()),
            Arc::clone(&health),
            300,
        );
        (tracker, records, health)
    }

    #[tokio::test]
    async fn successful_cycle_publishes_record_and_daily_summary() {
        let base = spawn_api().await;
        let daily = DailyTotals::new(KvStore::in_memory().await.unwrap());
        let (tracker, records, health) = tracker("zosia", base, Some(daily));

        tracker.refresh().await;

        let state = records.get("zosia").unwrap();
        let record = state.record.unwrap();
        assert_eq!(record.raised, Some(2_500));
        assert_eq!(record.percent, Some(25.0));
        assert_eq!(record.steady_supporters, Some(3));
        assert_eq!(state.daily.map(|d| d.raised_today), Some(2_500));
        assert_eq!(health.successes(), 1);
        assert_eq!(tracker.latency.snapshot().0, 1);
    }

    #[tokio::test]
    async fn storage_failure_still_publishes_record() {
        let base = spawn_api().await;
        let store = KvStore::in_memory().await.unwrap();
        // A document of the wrong shape makes every load fail.
        store.save(STORAGE_KEY, STORAGE_VERSION, &"not a totals document").await.unwrap();
        let (tracker, records, health) = tracker("zosia", base, Some(DailyTotals::new(store)));

        tracker.refresh().await;

        let state = records.get("zosia").unwrap();
        assert_eq!(state.record.and_then(|r| r.raised), Some(2_500));
        assert!(state.daily.is_none());
        assert!(state.last_error.is_none());
        assert_eq!(health.successes(), 1);
        assert_eq!(health.failures(), 0);
    }

    #[tokio::test]
    async fn failed_cycle_records_error_and_counts_failure() {
        let base = spawn_api().await;
        let (tracker, records, health) = tracker("kuba", base, None);

        tracker.refresh().await;

        let state = records.get("kuba").unwrap();
        assert!(state.record.is_none());
        assert_eq!(
            state.last_error.as_deref(),
            Some("API returned no fundraiser data for kuba")
        );
        assert_eq!(health.failures(), 1);
        assert_eq!(health.successes(), 0);
    }
}
