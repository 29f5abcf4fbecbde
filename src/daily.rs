//! Per-day raised amounts and the day-over-day deltas derived from them.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::{RETENTION_DAYS, SERIES_MAX_DAYS, STORAGE_KEY, STORAGE_VERSION};
use crate::db::KvStore;
use crate::error::Result;
use crate::types::{DailyDelta, DailySummary};

/// Persisted shape: `{ "slugs": { <slug>: { <YYYY-MM-DD>: <raised> } } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTotalsDoc {
    #[serde(default)]
    pub slugs: BTreeMap<String, BTreeMap<String, i64>>,
}

/// Handle shared by every tracker. All campaigns live in one stored document,
/// so the load-modify-save sequence runs under `lock`.
#[derive(Clone)]
pub struct DailyTotals {
    store: KvStore,
    lock: Arc<Mutex<()>>,
}

impl DailyTotals {
    pub fn new(store: KvStore) -> Self {
        Self { store, lock: Arc::new(Mutex::new(())) }
    }

    /// Store `raised` as the value for `today` and summarize the campaign.
    pub async fn record(&self, slug: &str, today: NaiveDate, raised: i64) -> Result<DailySummary> {
        let _guard = self.lock.lock().await;

        let mut doc: DailyTotalsDoc =
            self.store.load(STORAGE_KEY, STORAGE_VERSION).await?.unwrap_or_default();
        let days = doc.slugs.entry(slug.to_string()).or_default();
        update_day(days, today, raised);
        let summary = summarize(days, today, raised);

        self.store.save(STORAGE_KEY, STORAGE_VERSION, &doc).await?;
        Ok(summary)
    }
}

/// Set today's entry and keep only the `RETENTION_DAYS` newest dates.
pub fn update_day(days: &mut BTreeMap<String, i64>, today: NaiveDate, raised: i64) {
    days.insert(date_key(today), raised);
    // ISO dates sort lexically, so the map's first keys are the oldest.
    while days.len() > RETENTION_DAYS {
        days.pop_first();
    }
}

pub fn summarize(days: &BTreeMap<String, i64>, today: NaiveDate, raised: i64) -> DailySummary {
    let raised_today = raised - previous_value(days, today);

    let today_key = date_key(today);
    let mut recent_days: Vec<DailyDelta> = days
        .iter()
        .rev()
        .filter(|(k, _)| **k != today_key)
        .filter_map(|(k, &v)| {
            let date = NaiveDate::parse_from_str(k, "%Y-%m-%d").ok()?;
            Some(DailyDelta { date, amount: v - previous_value(days, date) })
        })
        .take(SERIES_MAX_DAYS)
        .collect();
    recent_days.reverse();

    DailySummary { date: today, raised, raised_today, recent_days }
}

/// Stored value for the calendar day before `date`; 0 when there is none.
fn previous_value(days: &BTreeMap<String, i64>, date: NaiveDate) -> i64 {
    date.checked_sub_days(Days::new(1))
        .and_then(|prev| days.get(&date_key(prev)).copied())
        .unwrap_or(0)
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
