//! Regex scan over a fully rendered campaign page.

use std::sync::LazyLock;

use regex::Regex;

use super::normalize::Amounts;
use super::primitives::{compose_date, parse_grouped_integer, parse_locale_float};
use super::Strategy;
use crate::config::Fundraiser;
use crate::types::{Details, FundraiserRecord};

const START_LABEL: &str = "Rozpoczęcie:";
const END_LABEL: &str = "Zakończenie:";
const MISSING_LABEL: &str = "Brakuje";
const COST_LABEL: &str = "Koszt";

/// Active campaign: "12 345 zł (67,89%)".
static RAISED_WITH_PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9\s\x{00A0}]*[0-9])\s*zł\s*\(\s*([0-9]+,[0-9]+)%\s*\)").unwrap()
});
/// Finished campaign: just "12 345 zł".
static RAISED_PLAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9][0-9\s\x{00A0}]*[0-9])\s*zł\b").unwrap());
static MISSING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Brakuje\s*([0-9\s\x{00A0}]+)\s*zł").unwrap());
static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*([0-9]+,[0-9]+)%\s*\)").unwrap());
static SUPPORTERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Wspar\w*\s*([0-9\s\x{00A0}]+)\s*(?:osob(?:a|y)|osób)").unwrap()
});
static STEADY_SUPPORTERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9\s\x{00A0}]+)\s*Stałych\s+Pomagaczy").unwrap());
static START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Rozpoczęcie:\s*([0-9]{1,2})\s+(\S+)\s+([0-9]{4})").unwrap()
});
static END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Zakończenie:\s*([0-9]{1,2})\s+(\S+)\s+([0-9]{4})").unwrap()
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title>(.*?)</title>").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Extraction from server-rendered HTML or plain text.
///
/// Every pattern takes its first occurrence; later matches are ignored.
pub struct TextScan;

impl Strategy for TextScan {
    fn name(&self) -> &'static str {
        "text"
    }

    fn try_extract(&self, body: &str, fundraiser: &Fundraiser) -> Option<FundraiserRecord> {
        let (raised, line_percent) = scan_raised(body);

        let percent = line_percent.or_else(|| first_capture(&PERCENT_RE, body).and_then(parse_locale_float));
        let amounts = Amounts {
            raised,
            goal: None,
            percent,
            missing: first_capture(&MISSING_RE, body).and_then(parse_grouped_integer),
        };
        let details = Details {
            supporters: first_capture(&SUPPORTERS_RE, body).and_then(parse_grouped_integer),
            steady_supporters: first_capture(&STEADY_SUPPORTERS_RE, body).and_then(parse_grouped_integer),
            start_date: labelled_date(&START_RE, body),
            end_date: labelled_date(&END_RE, body),
            title: first_capture(&TITLE_RE, body)
                .map(|t| WHITESPACE_RE.replace_all(t, " ").trim().to_string())
                .filter(|t| !t.is_empty()),
        };
        amounts.into_record(details, fundraiser)
    }
}

/// Line-restricted search for the raised amount.
///
/// Date-label lines are skipped in both passes since they can carry
/// currency-shaped text. The plain pass also skips "missing" and "cost" lines.
fn scan_raised(body: &str) -> (Option<i64>, Option<f64>) {
    let candidates = || {
        body.lines()
            .filter(|line| !line.contains(START_LABEL) && !line.contains(END_LABEL))
    };

    for line in candidates() {
        if let Some(caps) = RAISED_WITH_PERCENT_RE.captures(line) {
            return (
                parse_grouped_integer(&caps[1]),
                parse_locale_float(&caps[2]),
            );
        }
    }

    tracing::debug!("no 'zł (percent)' line found; trying plain 'zł' line");
    let raised = candidates()
        .filter(|line| !line.contains(MISSING_LABEL) && !line.contains(COST_LABEL))
        .find_map(|line| RAISED_PLAIN_RE.captures(line))
        .and_then(|caps| parse_grouped_integer(&caps[1]));
    (raised, None)
}

fn first_capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn labelled_date(re: &Regex, text: &str) -> Option<chrono::NaiveDate> {
    let caps = re.captures(text)?;
    compose_date(
        caps.get(1).map(|m| m.as_str()),
        caps.get(2).map(|m| m.as_str()),
        caps.get(3).map(|m| m.as_str()),
    )
}
