use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use tracing::{debug, error, warn};

use crate::config::{
    Config, FetchSource, Fundraiser, API_TIMEOUT_SECS, BODY_PREFIX_LOG_CHARS, MIN_PAGE_LEN,
    PAGE_TIMEOUT_SECS, USER_AGENT as UA,
};
use crate::error::{Result, UpdateError};
use crate::parse::{first_match, ApiPayload, HydrationJson, Strategy, StreamPayload, TextScan};
use crate::types::FundraiserRecord;

const CURRENCY_MARKER: &str = "zł";
/// `ł` as a JSON/JS escape; its presence without a literal "zł" means the
/// page text is still escaped.
const ESCAPED_CURRENCY_MARKER: &str = r"\u0142";

/// Strategies for a page that looks fully rendered.
const FULL_PAGE_STRATEGIES: &[&dyn Strategy] = &[&TextScan];
/// Strategies for a skeleton page, in priority order.
const SKELETON_STRATEGIES: &[&dyn Strategy] = &[&HydrationJson, &StreamPayload];
const API_STRATEGIES: &[&dyn Strategy] = &[&ApiPayload];

/// Issues the outbound request for one cycle and turns the body into a record.
///
/// One instance is shared by every tracker; the reqwest client pools connections.
pub struct Fetcher {
    client: reqwest::Client,
    source: FetchSource,
    api_base_url: String,
    page_timeout: Duration,
    api_timeout: Duration,
}

impl Fetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            source: cfg.fetch_source,
            api_base_url: cfg.api_base_url.clone(),
            page_timeout: Duration::from_secs(PAGE_TIMEOUT_SECS),
            api_timeout: Duration::from_secs(API_TIMEOUT_SECS),
        })
    }

    #[cfg(test)]
    fn with_timeouts(mut self, page: Duration, api: Duration) -> Self {
        self.page_timeout = page;
        self.api_timeout = api;
        self
    }

    pub fn source(&self) -> FetchSource {
        self.source
    }

    /// `log_errors` only changes how much is logged, never the outcome.
    pub async fn fetch(
        &self,
        fundraiser: &Fundraiser,
        log_errors: bool,
    ) -> std::result::Result<FundraiserRecord, UpdateError> {
        match self.source {
            FetchSource::Page => self.fetch_page(fundraiser, log_errors).await,
            FetchSource::Api => self.fetch_api(fundraiser, log_errors).await,
        }
    }

    async fn fetch_page(
        &self,
        fundraiser: &Fundraiser,
        log_errors: bool,
    ) -> std::result::Result<FundraiserRecord, UpdateError> {
        let body = self
            .get_text(
                &fundraiser.url,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                self.page_timeout,
            )
            .await?;
        parse_page(body, fundraiser, log_errors)
    }

    /// Every failure on this path collapses into `ApiNoData`.
    async fn fetch_api(
        &self,
        fundraiser: &Fundraiser,
        log_errors: bool,
    ) -> std::result::Result<FundraiserRecord, UpdateError> {
        let url = api_url(&self.api_base_url, &fundraiser.slug);
        let no_data = || UpdateError::ApiNoData { slug: fundraiser.slug.clone() };

        let body = match self
            .get_text(&url, "application/json", self.api_timeout)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                if log_errors {
                    error!(slug = %fundraiser.slug, error = ?e, "API request failed");
                }
                return Err(no_data());
            }
        };

        match first_match(API_STRATEGIES, &body, fundraiser) {
            Some((_, record)) => Ok(record),
            None => {
                if log_errors {
                    error!(slug = %fundraiser.slug, "API body: {}", body_prefix(&body));
                }
                Err(no_data())
            }
        }
    }

    /// GET with browser-like headers, bounded end to end by `timeout`.
    async fn get_text(
        &self,
        url: &str,
        accept: &'static str,
        timeout: Duration,
    ) -> std::result::Result<String, UpdateError> {
        let request = async {
            let resp = self
                .client
                .get(url)
                .headers(request_headers(accept))
                .send()
                .await?
                .error_for_status()?;
            let bytes = resp.bytes().await?;
            Ok::<_, reqwest::Error>(String::from_utf8_lossy(&bytes).into_owned())
        };

        match tokio::time::timeout(timeout, request).await {
            Err(_) => Err(UpdateError::Timeout { url: url.to_string() }),
            Ok(Err(e)) if e.is_timeout() => Err(UpdateError::Timeout { url: url.to_string() }),
            Ok(Err(e)) => Err(UpdateError::Request { url: url.to_string(), reason: e.to_string() }),
            Ok(Ok(body)) => Ok(body),
        }
    }
}

fn request_headers(accept: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(UA));
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("pl,en;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.siepomaga.pl/"));
    headers
}

pub fn api_url(base: &str, slug: &str) -> String {
    format!("{}/{slug}?locale=pl", base.trim_end_matches('/'))
}

/// Pick and run extraction strategies for a page body.
///
/// A page is "complete" when it carries the currency marker and is at least
/// `MIN_PAGE_LEN` long; only the text scan runs on it. Anything else is a
/// skeleton and goes through the embedded-JSON strategies.
pub fn parse_page(
    body: String,
    fundraiser: &Fundraiser,
    log_errors: bool,
) -> std::result::Result<FundraiserRecord, UpdateError> {
    let body = decode_escaped_body(body);

    if is_complete_page(&body) {
        return match first_match(FULL_PAGE_STRATEGIES, &body, fundraiser) {
            Some((name, record)) => {
                debug!(slug = %fundraiser.slug, strategy = name, "parsed page");
                Ok(record)
            }
            None => Err(UpdateError::NoData { url: fundraiser.url.clone() }),
        };
    }

    if let Some((name, record)) = first_match(SKELETON_STRATEGIES, &body, fundraiser) {
        debug!(slug = %fundraiser.slug, strategy = name, "parsed skeleton page");
        return Ok(record);
    }

    warn!(
        slug = %fundraiser.slug,
        len = body.len(),
        "Response looks incomplete; enable LOG_ERRORS for details"
    );
    if log_errors {
        error!(slug = %fundraiser.slug, "Start of response: {}", body_prefix(&body));
    }
    Err(UpdateError::Incomplete { url: fundraiser.url.clone(), len: body.len() })
}

fn is_complete_page(body: &str) -> bool {
    body.contains(CURRENCY_MARKER) && body.trim().len() >= MIN_PAGE_LEN
}

/// One unescape pass over bodies whose text is still JSON/JS-escaped.
fn decode_escaped_body(body: String) -> String {
    if !body.contains(CURRENCY_MARKER) && body.contains(ESCAPED_CURRENCY_MARKER) {
        crate::parse::primitives::unescape_backslashes(&body)
    } else {
        body
    }
}

fn body_prefix(body: &str) -> String {
    body.chars()
        .take(BODY_PREFIX_LOG_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    use crate::config::SITE_BASE_URL;

    fn zosia() -> Fundraiser {
        Fundraiser { slug: "zosia".into(), url: format!("{SITE_BASE_URL}/zosia") }
    }

    fn padded(content: &str) -> String {
        format!("<html><head><title>Zosia</title></head><body>{content}{}</body></html>", " ".repeat(MIN_PAGE_LEN) + "<div></div>")
    }

    #[test]
    fn complete_page_uses_text_scan() {
        let body = padded("<p>12 345 zł (67,89%)</p>\n<p>Brakuje 5 839 zł</p>");
        let r = parse_page(body, &zosia(), false).unwrap();
        assert_eq!(r.raised, Some(12_345));
        assert_eq!(r.goal, Some(18_184));
        assert_eq!(r.title.as_deref(), Some("Zosia"));
    }

    #[test]
    fn complete_page_never_falls_back_to_embedded_json() {
        let body = padded(concat!(
            "<p>Koszt: 100 zł</p>",
            r#"<script id="__NEXT_DATA__" type="application/json">{"raised":1,"goal":2}</script>"#,
        ));
        assert!(matches!(parse_page(body, &zosia(), false), Err(UpdateError::NoData { .. })));
    }

    #[test]
    fn short_page_with_marker_is_a_skeleton() {
        let body = r#"<p>1 zł</p><script type="application/json" id="__NEXT_DATA__">{"props":{"pageProps":{"c":{"raised":100,"goal":200}}}}</script>"#;
        let r = parse_page(body.to_string(), &zosia(), false).unwrap();
        assert_eq!(r.raised, Some(100));
        assert_eq!(r.percent, Some(50.0));
    }

    #[test]
    fn skeleton_falls_through_to_stream_payload() {
        let body = padded(r#"<script>s.enqueue("{\"collected\":300,\"target\":600}")</script>"#);
        let r = parse_page(body, &zosia(), true).unwrap();
        assert_eq!(r.raised, Some(300));
        assert_eq!(r.goal, Some(600));
    }

    #[test]
    fn skeleton_without_data_is_incomplete_with_length() {
        let body = "<html><body><div id=\"root\"></div></body></html>".to_string();
        let len = body.len();
        match parse_page(body, &zosia(), true) {
            Err(UpdateError::Incomplete { len: got, url }) => {
                assert_eq!(got, len);
                assert_eq!(url, "https://www.siepomaga.pl/zosia");
            }
            other => panic!("expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn escaped_body_is_decoded_before_classification() {
        let body = padded(r#"{"html":"<p>2 000 z\u0142 (40,00%)<\/p>\n<p>Brakuje 3 000 z\u0142<\/p>"}"#);
        assert!(!body.contains(CURRENCY_MARKER));
        let r = parse_page(body, &zosia(), false).unwrap();
        assert_eq!(r.raised, Some(2_000));
        assert_eq!(r.goal, Some(5_000));
        assert_eq!(r.percent, Some(40.0));
    }

    async fn spawn_site() -> String {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route(
                "/ok",
                get(|| async { padded("<p>1 500 zł (30,00%)</p>\n<p>Brakuje 3 500 zł</p>") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn fetcher(source: FetchSource, api_base_url: String) -> Fetcher {
        let cfg = Config {
            fundraisers: vec![],
            scan_interval_secs: 300,
            log_errors: false,
            fetch_source: source,
            api_base_url,
            log_level: "info".into(),
            db_path: String::new(),
            daily_totals: false,
            api_port: 0,
        };
        Fetcher::new(&cfg)
            .unwrap()
            .with_timeouts(Duration::from_millis(200), Duration::from_millis(200))
    }

    fn at(base: &str, path: &str) -> Fundraiser {
        Fundraiser { slug: "zosia".into(), url: format!("{base}{path}") }
    }

    #[tokio::test]
    async fn page_fetch_parses_rendered_page() {
        let base = spawn_site().await;
        let r = fetcher(FetchSource::Page, base.clone())
            .fetch(&at(&base, "/ok"), false)
            .await
            .unwrap();
        assert_eq!(r.raised, Some(1_500));
        assert_eq!(r.goal, Some(5_000));
    }

    #[tokio::test]
    async fn slow_page_is_a_timeout() {
        let base = spawn_site().await;
        let err = fetcher(FetchSource::Page, base.clone())
            .fetch(&at(&base, "/slow"), true)
            .await
            .unwrap_err();
        match err {
            UpdateError::Timeout { url } => assert_eq!(url, format!("{base}/slow")),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_a_request_failure() {
        let base = spawn_site().await;
        let err = fetcher(FetchSource::Page, base.clone())
            .fetch(&at(&base, "/broken"), false)
            .await
            .unwrap_err();
        match err {
            UpdateError::Request { url, reason } => {
                assert_eq!(url, format!("{base}/broken"));
                assert!(reason.contains("500"), "reason: {reason}");
            }
            other => panic!("expected Request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn api_transport_failures_collapse_into_no_data() {
        let base = spawn_site().await;
        let err = fetcher(FetchSource::Api, format!("{base}/missing"))
            .fetch(&at(&base, "/ok"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::ApiNoData { slug } if slug == "zosia"));
    }

    #[test]
    fn api_url_shape() {
        assert_eq!(
            api_url("https://api.example.com/causes/", "zosia"),
            "https://api.example.com/causes/zosia?locale=pl"
        );
    }

    #[test]
    fn body_prefix_is_bounded_and_single_line() {
        let p = body_prefix(&"ab\ncd".repeat(500));
        assert_eq!(p.chars().count(), BODY_PREFIX_LOG_CHARS);
        assert!(!p.contains('\n'));
    }
}
