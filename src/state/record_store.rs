use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::config::Fundraiser;
use crate::types::{DailySummary, FundraiserRecord};

// ---------------------------------------------------------------------------
// FundraiserState
// ---------------------------------------------------------------------------

/// Everything known about one tracked campaign.
///
/// `record` is the last-known-good value and is only ever replaced by a newer
/// success; a failed cycle touches `last_error` and `last_attempt_ns` only.
#[derive(Debug, Clone, Serialize)]
pub struct FundraiserState {
    pub slug: String,
    pub url: String,
    pub record: Option<FundraiserRecord>,
    pub last_error: Option<String>,
    /// Nanosecond timestamps (0 = never).
    pub last_attempt_ns: u64,
    pub last_success_ns: u64,
    #[serde(skip)]
    pub daily: Option<DailySummary>,
}

impl FundraiserState {
    fn new(fundraiser: &Fundraiser) -> Self {
        Self {
            slug: fundraiser.slug.clone(),
            url: fundraiser.url.clone(),
            record: None,
            last_error: None,
            last_attempt_ns: 0,
            last_success_ns: 0,
            daily: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// slug → campaign state. Written by the trackers, read by the API.
#[derive(Default)]
pub struct RecordStore {
    fundraisers: DashMap<String, FundraiserState>,
}

impl RecordStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start tracking a campaign. Re-registering keeps existing state.
    pub fn register(&self, fundraiser: &Fundraiser) {
        self.fundraisers
            .entry(fundraiser.slug.clone())
            .or_insert_with(|| FundraiserState::new(fundraiser));
    }

    pub fn set_record(&self, record: FundraiserRecord, at_ns: u64) {
        let Some(mut state) = self.fundraisers.get_mut(&record.slug) else {
            return;
        };
        state.last_attempt_ns = at_ns;
        state.last_success_ns = at_ns;
        state.last_error = None;
        state.record = Some(record);
    }

    pub fn set_error(&self, slug: &str, error: String, at_ns: u64) {
        if let Some(mut state) = self.fundraisers.get_mut(slug) {
            state.last_attempt_ns = at_ns;
            state.last_error = Some(error);
        }
    }

    pub fn set_daily(&self, slug: &str, summary: DailySummary) {
        if let Some(mut state) = self.fundraisers.get_mut(slug) {
            state.daily = Some(summary);
        }
    }

    pub fn get(&self, slug: &str) -> Option<FundraiserState> {
        self.fundraisers.get(slug).map(|s| s.clone())
    }

    /// Snapshot of every campaign, sorted by slug.
    pub fn all(&self) -> Vec<FundraiserState> {
        let mut out: Vec<_> = self.fundraisers.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.slug.cmp(&b.slug));
        out
    }

    pub fn len(&self) -> usize {
        self.fundraisers.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
