//! Batch fetcher for the remote draw history
//!
//! A [`BatchSource`] answers one paginated request with a list of
//! normalized [`BatchRecord`]s. An empty list means the source has nothing
//! more to offer; any failure is reported as a [`FetchError`] and left to
//! the caller to retry.
//!
//! [`HttpBatchSource`] talks to the draw-history endpoint. The first page
//! of a run is requested with `srchDir=center&srchLtEpsd=<anchor>`, every
//! later page with `srchDir=latest&srchCursorLtEpsd=<cursor>`. Responses
//! look like:
//!
//! ```json
//! {"data": {"list": [
//!     {"ltEpsd": 1, "tm1WnNo": 10, "tm2WnNo": 23, "tm3WnNo": 29,
//!      "tm4WnNo": 33, "tm5WnNo": 37, "tm6WnNo": 40}
//! ]}}
//! ```

use crate::config::SourceConfig;
use crate::error::{Error, FetchError, Result};
use crate::types::{BatchRecord, Combination, PageRequest, Round};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Trait for paginated access to the draw history
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Fetch one page
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on transport, status, or decoding failure.
    /// "No more data" is an empty `Vec`, never an error.
    async fn fetch(
        &self,
        request: PageRequest,
    ) -> std::result::Result<Vec<BatchRecord>, FetchError>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    list: Option<Vec<WireDraw>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDraw {
    lt_epsd: Round,
    tm1_wn_no: i64,
    tm2_wn_no: i64,
    tm3_wn_no: i64,
    tm4_wn_no: i64,
    tm5_wn_no: i64,
    tm6_wn_no: i64,
}

impl WireDraw {
    fn normalize(self) -> std::result::Result<BatchRecord, FetchError> {
        let combination = Combination::new([
            self.tm1_wn_no,
            self.tm2_wn_no,
            self.tm3_wn_no,
            self.tm4_wn_no,
            self.tm5_wn_no,
            self.tm6_wn_no,
        ])
        .map_err(|reason| FetchError::InvalidRecord {
            round: self.lt_epsd,
            reason,
        })?;

        Ok(BatchRecord {
            round: self.lt_epsd,
            combination,
        })
    }
}

/// Decode a response body into normalized records
///
/// A body without `data` or `data.list` is an empty page.
pub fn parse_batch(body: &str) -> std::result::Result<Vec<BatchRecord>, FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    envelope
        .data
        .and_then(|page| page.list)
        .unwrap_or_default()
        .into_iter()
        .map(WireDraw::normalize)
        .collect()
}

/// Query parameters for a page request
fn query_for(request: PageRequest) -> [(&'static str, String); 2] {
    match request {
        PageRequest::Anchor(round) => [
            ("srchDir", "center".into()),
            ("srchLtEpsd", round.to_string()),
        ],
        PageRequest::After(cursor) => [
            ("srchDir", "latest".into()),
            ("srchCursorLtEpsd", cursor.to_string()),
        ],
    }
}

/// Fetches pages from the draw-history HTTP endpoint
pub struct HttpBatchSource {
    http_client: reqwest::Client,
    url: String,
}

impl HttpBatchSource {
    /// Create a source for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: Some("source".to_string()),
            })?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
        })
    }

    /// Endpoint this source queries
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BatchSource for HttpBatchSource {
    async fn fetch(
        &self,
        request: PageRequest,
    ) -> std::result::Result<Vec<BatchRecord>, FetchError> {
        debug!(?request, url = %self.url, "Requesting page");

        let response = self
            .http_client
            .get(&self.url)
            .query(&query_for(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let body = response.text().await?;
        let records = parse_batch(&body)?;

        debug!(count = records.len(), "Page decoded");
        Ok(records)
    }

    fn name(&self) -> &str {
        "http"
    }
}
