//! Catalog discovery: fetch the listing API and decide what to crawl.
//!
//! The listing API returns a JSON array of records. Each record carries a
//! slug and some metadata; the slug is the identity used everywhere else.
//! [`novel_records`] drops what an earlier run already processed and
//! [`build_worklist`] turns the rest into [`WorkItem`]s for the crawler.

mod worklist;

use std::time::Duration;

use bountyscout_shared::{CatalogConfig, CatalogRecord, Result, ScoutError};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

pub use worklist::{build_worklist, novel_records, read_worklist};

/// Maximum number of redirects to follow on the listing API.
const MAX_REDIRECTS: usize = 3;

/// Largest listing response we accept (50 MB).
const MAX_RESPONSE_SIZE: u64 = 50 * 1024 * 1024;

/// User-Agent string for catalog requests.
const USER_AGENT: &str = concat!("BountyScout/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// CatalogClient
// ---------------------------------------------------------------------------

/// Client for the listing API.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    listings_url: String,
}

impl CatalogClient {
    /// Build a client from the `[catalog]` config section.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(config.timeout_secs))?,
            listings_url: config.listings_url.clone(),
        })
    }

    /// The endpoint this client reads from.
    pub fn listings_url(&self) -> &str {
        &self.listings_url
    }

    /// Fetch every catalog record.
    ///
    /// Entries that are not objects with a slug are skipped with a warning
    /// rather than failing the whole listing.
    #[instrument(skip_all, fields(url = %self.listings_url))]
    pub async fn list_records(&self) -> Result<Vec<CatalogRecord>> {
        let url = &self.listings_url;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(ScoutError::validation(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScoutError::Network(format!("{url}: failed to read body: {e}")))?;

        let records = parse_listing(&body)?;
        info!(records = records.len(), "catalog fetched");
        Ok(records)
    }
}

/// Parse a listing body into records, skipping malformed entries.
pub fn parse_listing(body: &str) -> Result<Vec<CatalogRecord>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| ScoutError::parse(format!("listing is not a JSON array: {e}")))?;

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<CatalogRecord>(entry) {
            Ok(record) => records.push(record),
            Err(e) => warn!(index, error = %e, "skipping malformed catalog entry"),
        }
    }

    debug!(parsed = records.len(), "listing parsed");
    Ok(records)
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .build()
        .map_err(|e| ScoutError::Network(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(server: &wiremock::MockServer) -> CatalogConfig {
        CatalogConfig {
            listings_url: format!("{}/api/listings", server.uri()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_records_with_mock_server() {
        let server = wiremock::MockServer::start().await;
        let body = r#"[
            {"id": "a1", "slug": "first-bounty", "title": "First", "rewardAmount": 1500, "token": "USDC",
             "sponsor": {"name": "Acme"}, "status": "OPEN"},
            {"slug": "second-bounty"}
        ]"#;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/listings"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = CatalogClient::new(&config_for(&server)).unwrap();
        let records = client.list_records().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].slug.as_str(), "first-bounty");
        assert_eq!(records[0].reward_amount, Some(1500.0));
        assert_eq!(records[0].sponsor.as_ref().and_then(|s| s.name.as_deref()), Some("Acme"));
        assert_eq!(records[1].title, None);
    }

    #[tokio::test]
    async fn test_list_records_http_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/listings"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = CatalogClient::new(&config_for(&server)).unwrap();
        let err = client.list_records().await.unwrap_err();
        assert!(matches!(err, ScoutError::Network(ref m) if m.contains("503")), "{err}");
    }

    #[tokio::test]
    async fn test_list_records_rejects_non_array() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/listings"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(r#"{"error":"nope"}"#))
            .mount(&server)
            .await;

        let client = CatalogClient::new(&config_for(&server)).unwrap();
        let err = client.list_records().await.unwrap_err();
        assert!(matches!(err, ScoutError::Parse { .. }), "{err}");
    }

    #[test]
    fn test_parse_listing_skips_malformed_entries() {
        let records = parse_listing(r#"[{"slug":"ok"}, {"title":"no slug"}, 42]"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].slug.as_str(), "ok");
    }
}
