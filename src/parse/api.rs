//! Dedicated JSON API response (`{base}/{slug}?locale=pl`).

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use super::json_walk::to_amount;
use super::normalize::Amounts;
use super::Strategy;
use crate::config::Fundraiser;
use crate::types::{Details, FundraiserRecord};

/// Fixed-path extraction from `data.target.needy.cause`.
///
/// Percent is always computed from raised and goal here; the API is trusted
/// for raw amounts only.
pub struct ApiPayload;

impl Strategy for ApiPayload {
    fn name(&self) -> &'static str {
        "api"
    }

    fn try_extract(&self, body: &str, fundraiser: &Fundraiser) -> Option<FundraiserRecord> {
        let data: Value = serde_json::from_str(body).ok()?;
        from_api_value(&data, fundraiser)
    }
}

pub fn from_api_value(data: &Value, fundraiser: &Fundraiser) -> Option<FundraiserRecord> {
    let needy = data.pointer("/data/target/needy")?;
    let cause = needy.get("cause")?;

    let amounts = Amounts {
        raised: cause.get("funds_current").and_then(to_amount),
        goal: cause.get("funds_aim").and_then(to_amount),
        percent: None,
        missing: None,
    };
    let details = Details {
        supporters: cause.get("helps_count").and_then(to_amount),
        steady_supporters: needy.get("constant_helps_count").and_then(to_amount),
        start_date: cause.get("accepted_at").and_then(iso_date),
        end_date: cause.get("ends_at").and_then(iso_date),
        title: cause
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    };
    amounts.into_record(details, fundraiser)
}

/// Calendar date of an ISO-8601 timestamp or date string.
///
/// Full timestamps (`Z` or a numeric offset) keep the date as written; anything
/// else is cut to its first ten characters and read as `YYYY-MM-DD`.
fn iso_date(v: &Value) -> Option<NaiveDate> {
    let s = v.as_str()?.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.date_naive());
    }
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}
