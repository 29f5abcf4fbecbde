use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, Result, UpdateError};

pub const SITE_BASE_URL: &str = "https://www.siepomaga.pl";
pub const API_BASE_URL: &str = "https://www.siepomaga.pl/api/v1/causes";

pub const USER_AGENT: &str = "siepomaga-tracker/0.1 (+https://www.siepomaga.pl)";

/// Wall-clock bound on one page fetch, request and body read included (seconds).
pub const PAGE_TIMEOUT_SECS: u64 = 20;

/// Wall-clock bound on one JSON API fetch (seconds).
pub const API_TIMEOUT_SECS: u64 = 15;

/// A body shorter than this (after trimming) is treated as a skeleton page.
pub const MIN_PAGE_LEN: usize = 500;

/// Stream payloads shorter than this are skipped without a JSON parse attempt.
pub const MIN_STREAM_PAYLOAD_LEN: usize = 10;

/// Characters of body logged when verbose logging is on and a page is incomplete.
pub const BODY_PREFIX_LOG_CHARS: usize = 400;

/// Default refresh interval (seconds) and the floor applied to SCAN_INTERVAL_SECS.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 300;
pub const MIN_SCAN_INTERVAL_SECS: u64 = 30;

/// Daily totals keep this many most recent dates per campaign.
pub const RETENTION_DAYS: usize = 90;

/// Maximum entries in the recent-days delta series.
pub const SERIES_MAX_DAYS: usize = 31;

pub const STORAGE_KEY: &str = "siepomaga.daily_totals";
pub const STORAGE_VERSION: i64 = 1;

static FUNDRAISER_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(www\.)?siepomaga\.pl/([a-z0-9-]+)/*$").unwrap()
});
static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^[a-z0-9-]+$").unwrap());

/// Where a tracker gets its numbers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Scrape the public campaign page.
    Page,
    /// Query the JSON API at `{api_base_url}/{slug}?locale=pl`.
    Api,
}

impl std::str::FromStr for FetchSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "page" | "" => Ok(FetchSource::Page),
            "api" => Ok(FetchSource::Api),
            other => Err(AppError::Config(format!(
                "FETCH_SOURCE must be 'page' or 'api', got {other:?}"
            ))),
        }
    }
}

/// A campaign identity after config intake: canonical slug and page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fundraiser {
    pub slug: String,
    pub url: String,
}

/// Accept a full campaign URL or a bare slug and return its canonical form.
///
/// Runs before any network call; rejected input never reaches the fetcher.
pub fn normalize_fundraiser(raw: &str) -> std::result::Result<Fundraiser, UpdateError> {
    let raw = raw.trim();
    let slug = if let Some(caps) = FUNDRAISER_URL_RE.captures(raw) {
        caps[2].to_lowercase()
    } else if SLUG_RE.is_match(raw) {
        raw.to_lowercase()
    } else {
        return Err(UpdateError::InvalidFundraiser(raw.to_string()));
    };
    let url = format!("{SITE_BASE_URL}/{slug}");
    Ok(Fundraiser { slug, url })
}

/// Options that may change while trackers are running.
///
/// Trackers hold an `Arc` to this and read it at the start of every cycle.
#[derive(Debug, Default)]
pub struct RuntimeOptions {
    log_errors: AtomicBool,
}

impl RuntimeOptions {
    pub fn new(log_errors: bool) -> Self {
        Self { log_errors: AtomicBool::new(log_errors) }
    }

    pub fn log_errors(&self) -> bool {
        self.log_errors.load(Ordering::Relaxed)
    }

    pub fn set_log_errors(&self, v: bool) {
        self.log_errors.store(v, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Campaigns to track (FUNDRAISERS, comma-separated URLs or slugs).
    pub fundraisers: Vec<Fundraiser>,
    /// Seconds between refresh cycles (SCAN_INTERVAL_SECS)
    pub scan_interval_secs: u64,
    /// Initial value of the verbose error logging toggle (LOG_ERRORS)
    pub log_errors: bool,
    /// Page scraping or JSON API (FETCH_SOURCE)
    pub fetch_source: FetchSource,
    pub api_base_url: String,
    pub log_level: String,
    pub db_path: String,
    /// Track per-day totals in the database (DAILY_TOTALS)
    pub daily_totals: bool,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let fundraisers = parse_fundraisers(&std::env::var("FUNDRAISERS").unwrap_or_default())?;

        Ok(Self {
            fundraisers,
            scan_interval_secs: std::env::var("SCAN_INTERVAL_SECS")
                .unwrap_or_else(|_| DEFAULT_SCAN_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .map_err(|_| AppError::Config("SCAN_INTERVAL_SECS must be a whole number of seconds".to_string()))?
                .max(MIN_SCAN_INTERVAL_SECS),
            log_errors: parse_bool_env("LOG_ERRORS", false)?,
            fetch_source: std::env::var("FETCH_SOURCE")
                .unwrap_or_default()
                .parse::<FetchSource>()?,
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "siepomaga.db".to_string()),
            daily_totals: parse_bool_env("DAILY_TOTALS", true)?,
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }
}

/// Normalize every comma-separated entry; one bad entry fails the whole list.
pub fn parse_fundraisers(raw: &str) -> Result<Vec<Fundraiser>> {
    let mut out: Vec<Fundraiser> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let fundraiser =
            normalize_fundraiser(entry).map_err(|e| AppError::Config(e.to_string()))?;
        if !out.iter().any(|f| f.slug == fundraiser.slug) {
            out.push(fundraiser);
        }
    }
    if out.is_empty() {
        return Err(AppError::Config(
            "FUNDRAISERS must list at least one campaign URL or slug".to_string(),
        ));
    }
    Ok(out)
}

fn parse_bool_env(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config(format!("{name} must be true or false"))),
        },
    }
}
