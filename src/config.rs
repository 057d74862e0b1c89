//! Configuration types for lotto-archive

use crate::error::{Error, Result};
use crate::types::Round;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Endpoint the draw history is fetched from unless configured otherwise
pub const DEFAULT_SOURCE_URL: &str = "https://www.dhlottery.co.kr/lt645/selectPstLt645InfoNew.do";

/// Remote source settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Paginated draw-history endpoint
    #[serde(default = "default_source_url")]
    pub url: String,

    /// Per-request timeout (default: 10 seconds)
    #[serde(default = "default_timeout", with = "duration_ms")]
    pub timeout: Duration,

    /// User-Agent header sent with each request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Pagination behaviour of the reconciliation loop
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Pause between successive successful requests (default: 100ms)
    #[serde(default = "default_request_delay", with = "duration_ms")]
    pub request_delay: Duration,

    /// How many rounds before the start round the first page is anchored (default: 4)
    ///
    /// The remote source's own indexing is off by a few rounds at page
    /// boundaries, so the first page starts slightly early and the overlap
    /// is skipped while merging.
    #[serde(default = "default_anchor_margin")]
    pub anchor_margin: Round,

    /// Lowest anchor ever requested (default: 5)
    #[serde(default = "default_min_anchor")]
    pub min_anchor: Round,

    /// How far past the archive end a fetched round may lie (default: 1000)
    ///
    /// A page naming a later round is rejected as a failed fetch.
    #[serde(default = "default_max_round_lead")]
    pub max_round_lead: Round,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_delay: default_request_delay(),
            anchor_margin: default_anchor_margin(),
            min_anchor: default_min_anchor(),
            max_round_lead: default_max_round_lead(),
        }
    }
}

/// Retry configuration for transient fetch failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Consecutive failures after which the run stops (default: 3)
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Backoff unit; the n-th consecutive failure waits `n * base_delay` (default: 1s)
    #[serde(default = "default_base_delay", with = "duration_ms")]
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_consecutive_failures(),
            base_delay: default_base_delay(),
        }
    }
}

/// Number generator settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Draws attempted while avoiding historical combinations (default: 100)
    #[serde(default = "default_generator_attempts")]
    pub max_attempts: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_generator_attempts(),
        }
    }
}

/// Main configuration
///
/// Every field has a default, so an empty JSON object is a valid config.
///
/// ```
/// use lotto_archive::Config;
///
/// let config: Config = serde_json::from_str("{}").unwrap();
/// assert_eq!(config.retry.max_consecutive_failures, 3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Archive file (default: "winning_numbers.json")
    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,

    /// Remote source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Pagination behaviour
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Retry behaviour
    #[serde(default)]
    pub retry: RetryConfig,

    /// Number generator settings
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive_path: default_archive_path(),
            source: SourceConfig::default(),
            fetch: FetchConfig::default(),
            retry: RetryConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Config {
    /// Load a JSON configuration file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = url::Url::parse(&self.source.url) {
            return Err(Error::config(
                format!("invalid source URL {:?}: {}", self.source.url, e),
                "source.url",
            ));
        }
        if self.retry.max_consecutive_failures == 0 {
            return Err(Error::config(
                "must allow at least one attempt",
                "retry.max_consecutive_failures",
            ));
        }
        if self.fetch.max_round_lead == 0 {
            return Err(Error::config(
                "must accept at least one round past the archive",
                "fetch.max_round_lead",
            ));
        }
        if self.generator.max_attempts == 0 {
            return Err(Error::config(
                "must allow at least one attempt",
                "generator.max_attempts",
            ));
        }
        if self.archive_path.as_os_str().is_empty() {
            return Err(Error::config("must not be empty", "archive_path"));
        }
        Ok(())
    }
}

fn default_archive_path() -> PathBuf {
    PathBuf::from("winning_numbers.json")
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    concat!("lotto-archive/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_anchor_margin() -> Round {
    4
}

fn default_min_anchor() -> Round {
    5
}

fn default_max_round_lead() -> Round {
    1000
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_generator_attempts() -> u32 {
    100
}

// Durations are written as whole milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
