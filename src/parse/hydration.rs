//! `__NEXT_DATA__` hydration payloads embedded in skeleton pages.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::json_walk::{amounts_from_object, walk, PAGE_PROPS_KEYS};
use super::normalize::Amounts;
use super::Strategy;
use crate::config::Fundraiser;
use crate::types::{Details, FundraiserRecord};

// Renderer versions disagree on attribute order, so both orders are accepted.
static NEXT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?is)<script[^>]*id=["']__NEXT_DATA__["'][^>]*type=["']application/json["'][^>]*>(.*?)</script>"#,
        r#"|<script[^>]*type=["']application/json["'][^>]*id=["']__NEXT_DATA__["'][^>]*>(.*?)</script>"#,
    ))
    .unwrap()
});

pub struct HydrationJson;

impl Strategy for HydrationJson {
    fn name(&self) -> &'static str {
        "hydration"
    }

    fn try_extract(&self, body: &str, fundraiser: &Fundraiser) -> Option<FundraiserRecord> {
        let data = next_data(body)?;
        if let Some((amounts, details)) = walk(&data) {
            return amounts.into_record(details, fundraiser);
        }
        if let Value::Object(root) = &data {
            let keys: Vec<_> = root.keys().take(20).collect();
            debug!(slug = %fundraiser.slug, ?keys, "__NEXT_DATA__ walk found nothing; trying pageProps");
        }
        let (amounts, details) = page_props_guess(&data)?;
        amounts.into_record(details, fundraiser)
    }
}

/// Inner JSON of the hydration script tag, if present and parseable.
fn next_data(body: &str) -> Option<Value> {
    let caps = NEXT_DATA_RE.captures(body)?;
    let json = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
    if json.is_empty() {
        return None;
    }
    serde_json::from_str(json).ok()
}

/// Look one level below `props.pageProps`, then below the root, for an object
/// with raised/goal-like keys.
fn page_props_guess(data: &Value) -> Option<(Amounts, Details)> {
    let page_props = data.pointer("/props/pageProps").filter(|v| v.is_object());
    [page_props, Some(data)]
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .flat_map(|node| node.values())
        .filter_map(Value::as_object)
        .find_map(|candidate| amounts_from_object(candidate, &PAGE_PROPS_KEYS))
}
