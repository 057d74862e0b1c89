//! # lotto-archive
//!
//! Keeps a local archive of past 6/45 lottery draws in sync with a paginated
//! remote source, and draws fresh combinations that avoid past results.
//!
//! ## Design
//!
//! - **Incremental** - each run starts after the last archived round
//! - **Append-only** - an archived round is never overwritten by a later page
//! - **Failure tolerant** - transient fetch errors back off and retry; a run
//!   that gives up still keeps what it merged
//! - **One write per run** - the archive file is replaced atomically at the
//!   end, and only when something new arrived
//!
//! ## Quick Start
//!
//! ```no_run
//! use lotto_archive::{Config, HttpBatchSource, JsonFileStore, Reconciler};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let source = Arc::new(HttpBatchSource::new(&config.source)?);
//!     let store = Arc::new(JsonFileStore::new(&config.archive_path));
//!
//!     let report = Reconciler::new(source, store, &config).run().await?;
//!     println!("{} rounds archived ({} new)", report.total_rounds, report.new_rounds);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive value and persistence
pub mod archive;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Paginated fetching from the remote source
pub mod fetcher;
/// Combination generator
pub mod generator;
/// Reconciliation loop
pub mod reconcile;
/// Retry policy and sleeping
pub mod retry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use archive::{Archive, ArchiveStore, JsonFileStore};
pub use config::Config;
pub use error::{ArchiveError, CombinationError, Error, FetchError, GenerateError, Result};
pub use fetcher::{BatchSource, HttpBatchSource};
pub use generator::{GenerateRequest, Generated, Generator, WeightMode};
pub use reconcile::{Reconciler, RunReport};
pub use retry::{BackoffPolicy, Sleeper, TokioSleeper};
pub use types::{BatchRecord, Combination, Event, Outcome, PageRequest, Round};
