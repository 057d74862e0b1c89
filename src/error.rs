//! Error types for lotto-archive
//!
//! This module provides the error taxonomy for the library:
//! - Fetch errors, all of which are transient from the loop's point of view
//! - Combination validation errors
//! - Archive persistence errors (an unreadable archive is recovered locally)
//! - Number-generation constraint errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lotto-archive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lotto-archive
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "source.url")
        key: Option<String>,
    },

    /// A batch request against the remote source failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Archive persistence error
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Failure of a single batch request
///
/// Every variant is transient: the reconciliation loop retries the same
/// request with backoff regardless of which one it sees.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote source answered with a non-success HTTP status
    #[error("remote source returned HTTP {status} for {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A record's numbers do not form a valid combination
    #[error("invalid record for round {round}: {reason}")]
    InvalidRecord {
        /// Round the record claimed to describe
        round: u32,
        /// Why normalization failed
        reason: CombinationError,
    },

    /// A record names a round implausibly far past the archive
    #[error("round {round} is beyond the accepted limit of {limit}")]
    ImplausibleRound {
        /// Round the record claimed to describe
        round: u32,
        /// Highest round accepted for this page
        limit: u32,
    },
}

/// Combination validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombinationError {
    /// Wrong number of values
    #[error("expected {expected} numbers, got {actual}")]
    WrongCount {
        /// Required count
        expected: usize,
        /// Count supplied
        actual: usize,
    },

    /// A value outside 1..=45
    #[error("number {0} is outside 1..=45")]
    OutOfRange(i64),

    /// The same value appears more than once
    #[error("number {0} appears more than once")]
    Duplicate(u8),

    /// A textual element could not be parsed as an integer
    #[error("cannot parse {0:?} as a number")]
    Parse(String),
}

/// Archive persistence errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Archive file exists but cannot be used
    #[error("archive at {path} is unreadable: {reason}")]
    Unreadable {
        /// Path of the archive file
        path: PathBuf,
        /// Why the content was rejected
        reason: String,
    },

    /// Writing the archive file failed
    #[error("failed to write archive to {path}: {source}")]
    WriteFailed {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Number-generation request errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// An include or exclude number is outside 1..=45
    #[error("number {0} is outside 1..=45")]
    OutOfRange(u8),

    /// More numbers must be included than fit in one combination
    #[error("cannot include {0} numbers in a 6-number combination")]
    TooManyIncludes(usize),

    /// A number is both required and excluded
    #[error("number {0} is both included and excluded")]
    Conflict(u8),

    /// Exclusions leave too few candidates to complete a draw
    #[error("only {available} numbers available, {needed} needed")]
    NotEnoughCandidates {
        /// Candidates left after exclusions and includes
        available: usize,
        /// Numbers still needed to complete the draw
        needed: usize,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_convert_into_crate_error() {
        let err: Error = FetchError::Status {
            status: 503,
            url: "http://localhost/draws".to_string(),
        }
        .into();

        assert!(matches!(err, Error::Fetch(FetchError::Status { status: 503, .. })));
        assert_eq!(
            err.to_string(),
            "fetch error: remote source returned HTTP 503 for http://localhost/draws"
        );
    }

    #[test]
    fn invalid_record_mentions_round_and_reason() {
        let err = FetchError::InvalidRecord {
            round: 812,
            reason: CombinationError::Duplicate(7),
        };
        assert_eq!(
            err.to_string(),
            "invalid record for round 812: number 7 appears more than once"
        );
    }

    #[test]
    fn implausible_round_names_the_limit() {
        let err: Error = FetchError::ImplausibleRound {
            round: 4_000_000_000,
            limit: 1_120,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "fetch error: round 4000000000 is beyond the accepted limit of 1120"
        );
    }

    #[test]
    fn config_helper_records_key() {
        let err = Error::config("must be positive", "retry.max_consecutive_failures");
        match err {
            Error::Config { message, key } => {
                assert_eq!(message, "must be positive");
                assert_eq!(key.as_deref(), Some("retry.max_consecutive_failures"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
