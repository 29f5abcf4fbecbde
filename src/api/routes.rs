use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::RuntimeOptions;
use crate::error::AppError;
use crate::state::{FundraiserState, RecordStore};
use crate::types::{Attributes, DailySummary, SENSORS};

#[derive(Clone)]
pub struct ApiState {
    pub records: Arc<RecordStore>,
    pub options: Arc<RuntimeOptions>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/fundraisers", get(get_fundraisers))
        .route("/fundraisers/:slug", get(get_fundraiser))
        .route("/fundraisers/:slug/daily", get(get_fundraiser_daily))
        .route("/options", get(get_options).put(put_options))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SensorResponse {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
    pub value: Value,
}

#[derive(Serialize)]
pub struct FundraiserResponse {
    /// False until the first successful cycle.
    pub available: bool,
    pub sensors: Vec<SensorResponse>,
    pub attributes: Attributes,
    pub last_error: Option<String>,
    pub last_attempt_ns: u64,
    pub last_success_ns: u64,
}

#[derive(Serialize, Deserialize)]
pub struct OptionsBody {
    pub log_errors: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub trackers: usize,
    pub successes: u64,
    pub failures: u64,
    pub last_success_ns: u64,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_fundraisers(State(state): State<ApiState>) -> Json<Vec<FundraiserState>> {
    Json(state.records.all())
}

async fn get_fundraiser(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<Json<FundraiserResponse>, AppError> {
    let fs = lookup(&state, &slug)?;

    let sensors = SENSORS
        .iter()
        .map(|s| SensorResponse {
            key: s.key,
            name: s.name,
            unit: s.unit,
            icon: s.icon,
            value: fs.record.as_ref().map_or(Value::Null, |r| r.sensor_value(s.key)),
        })
        .collect();
    let attributes = match &fs.record {
        Some(r) => r.attributes(),
        None => Attributes { url: fs.url.clone(), slug: fs.slug.clone(), title: None },
    };

    Ok(Json(FundraiserResponse {
        available: fs.record.is_some(),
        sensors,
        attributes,
        last_error: fs.last_error,
        last_attempt_ns: fs.last_attempt_ns,
        last_success_ns: fs.last_success_ns,
    }))
}

async fn get_fundraiser_daily(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<Json<DailySummary>, AppError> {
    lookup(&state, &slug)?
        .daily
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no daily totals for {slug} yet")))
}

async fn get_options(State(state): State<ApiState>) -> Json<OptionsBody> {
    Json(OptionsBody { log_errors: state.options.log_errors() })
}

/// Takes effect on each tracker's next cycle.
async fn put_options(
    State(state): State<ApiState>,
    Json(body): Json<OptionsBody>,
) -> Json<OptionsBody> {
    state.options.set_log_errors(body.log_errors);
    Json(OptionsBody { log_errors: state.options.log_errors() })
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        trackers: state.records.len(),
        successes: state.health.successes(),
        failures: state.health.failures(),
        last_success_ns: state.health.last_success_ns(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (samples, p) = state.latency.snapshot();
    Json(LatencyResponse {
        samples,
        p50_ms: p.map(|p| p.p50_ms),
        p95_ms: p.map(|p| p.p95_ms),
        p99_ms: p.map(|p| p.p99_ms),
    })
}

fn lookup(state: &ApiState, slug: &str) -> Result<FundraiserState, AppError> {
    state
        .records
        .get(&slug.to_lowercase())
        .ok_or_else(|| AppError::NotFound(format!("fundraiser {slug}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Fundraiser;
    use crate::types::FundraiserRecord;

    fn state() -> ApiState {
        let records = RecordStore::new();
        records.register(&Fundraiser {
            slug: "zosia".into(),
            url: "https://www.siepomaga.pl/zosia".into(),
        });
        ApiState {
            records,
            options: Arc::new(RuntimeOptions::new(false)),
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        }
    }

    fn record() -> FundraiserRecord {
        FundraiserRecord {
            raised: Some(400),
            missing: Some(600),
            goal: Some(1_000),
            percent: Some(40.0),
            supporters: Some(9),
            steady_supporters: None,
            start_date: None,
            end_date: None,
            title: Some("Zosia".into()),
            url: "https://www.siepomaga.pl/zosia".into(),
            slug: "zosia".into(),
        }
    }

    #[tokio::test]
    async fn fundraiser_before_first_success_has_null_sensors() {
        let st = state();
        let Json(resp) = get_fundraiser(State(st), Path("zosia".into())).await.unwrap();
        assert!(!resp.available);
        assert_eq!(resp.sensors.len(), SENSORS.len());
        assert!(resp.sensors.iter().all(|s| s.value.is_null()));
        assert_eq!(resp.attributes.slug, "zosia");
        assert!(resp.attributes.title.is_none());
    }

    #[tokio::test]
    async fn fundraiser_sensors_follow_the_record() {
        let st = state();
        st.records.set_record(record(), 42);
        let Json(resp) = get_fundraiser(State(st), Path("Zosia".into())).await.unwrap();
        assert!(resp.available);
        let raised = resp.sensors.iter().find(|s| s.key == "raised").unwrap();
        assert_eq!(raised.value, serde_json::json!(400));
        assert_eq!(resp.attributes.title.as_deref(), Some("Zosia"));
        assert_eq!(resp.last_success_ns, 42);
    }

    #[tokio::test]
    async fn unknown_slug_and_missing_daily_are_not_found() {
        let st = state();
        assert!(matches!(
            get_fundraiser(State(st.clone()), Path("kuba".into())).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            get_fundraiser_daily(State(st), Path("zosia".into())).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn options_toggle_round_trips() {
        let st = state();
        let Json(after) =
            put_options(State(st.clone()), Json(OptionsBody { log_errors: true })).await;
        assert!(after.log_errors);
        assert!(st.options.log_errors());
        let Json(read) = get_options(State(st)).await;
        assert!(read.log_errors);
    }

    #[tokio::test]
    async fn health_counts_trackers() {
        let st = state();
        st.health.record_failure();
        let Json(h) = get_health(State(st)).await;
        assert_eq!(h.trackers, 1);
        assert_eq!(h.failures, 1);
    }
}
