//! Reconciliation loop
//!
//! Brings the archive up to date with the remote source:
//!
//! 1. Load the archive and start at `len + 1`.
//! 2. Request a first page anchored a few rounds before the start round,
//!    then follow the cursor (highest round of the previous page).
//! 3. Merge every record that is new: at or above the start round and not
//!    yet archived. Archived rounds are never overwritten.
//! 4. Stop on an empty page (exhausted), a page that does not advance the
//!    cursor (stagnant), a follow-up page that adds nothing (up to date), or
//!    too many consecutive failures (failed).
//! 5. Save once, and only if something was added. A failed run still saves
//!    what it merged before giving up.

use crate::archive::{Archive, ArchiveStore};
use crate::config::{Config, FetchConfig};
use crate::error::{FetchError, Result};
use crate::fetcher::BatchSource;
use crate::retry::{BackoffPolicy, RetryDecision, Sleeper, TokioSleeper};
use crate::types::{BatchRecord, Event, Outcome, PageRequest, Round};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Summary of one reconciliation run
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Why the loop stopped
    pub outcome: Outcome,
    /// Rounds held from 1 upward without a gap, as persisted
    pub total_rounds: usize,
    /// Rounds this run added to the persisted archive
    pub new_rounds: usize,
    /// Rounds merged past a gap; not persisted, fetched again next run
    pub unsaved_rounds: usize,
    /// Page requests issued, retries included
    pub requests: u32,
    /// Whether the archive was written
    pub saved: bool,
    /// Last fetch error when the run failed
    pub last_error: Option<String>,
}

/// Outcome of the loop before persistence
#[derive(Clone, Debug, PartialEq, Eq)]
struct LoopResult {
    outcome: Outcome,
    new_rounds: usize,
    requests: u32,
    last_error: Option<String>,
}

/// Drives batch fetches and merges them into the archive
pub struct Reconciler {
    source: Arc<dyn BatchSource>,
    store: Arc<dyn ArchiveStore>,
    sleeper: Arc<dyn Sleeper>,
    policy: BackoffPolicy,
    fetch: FetchConfig,
    event_tx: broadcast::Sender<Event>,
}

impl Reconciler {
    /// Create a reconciler using the tokio timer for delays
    pub fn new(
        source: Arc<dyn BatchSource>,
        store: Arc<dyn ArchiveStore>,
        config: &Config,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(256);
        Self {
            source,
            store,
            sleeper: Arc::new(TokioSleeper),
            policy: BackoffPolicy::from(&config.retry),
            fetch: config.fetch.clone(),
            event_tx,
        }
    }

    /// Replace the sleeper used for politeness delays and backoff
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Subscribe to progress events
    ///
    /// Events sent while no receiver exists are dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Load, reconcile, and persist the archive
    ///
    /// # Errors
    ///
    /// Only a failed save is an error. Fetch failures end the run with
    /// [`Outcome::Failed`] after persisting whatever was merged.
    pub async fn run(&self) -> Result<RunReport> {
        let mut archive = self.store.load().await;
        let persisted_before = archive.contiguous_len();
        let result = self.reconcile(&mut archive).await;

        let total_rounds = archive.contiguous_len();
        let new_rounds = total_rounds.saturating_sub(persisted_before);
        let unsaved_rounds = result.new_rounds.saturating_sub(new_rounds);
        if unsaved_rounds > 0 {
            warn!(
                unsaved = unsaved_rounds,
                first_missing = total_rounds + 1,
                "Round {} is missing; {} later rounds are left for the next run",
                total_rounds + 1,
                unsaved_rounds
            );
        }

        info!(
            total = total_rounds,
            new = new_rounds,
            "Total rounds: {} ({} new)",
            total_rounds,
            new_rounds
        );

        let saved = if new_rounds > 0 {
            self.store.save(&archive).await?;
            info!(store = %self.store.describe(), "Updated archive");
            true
        } else {
            info!("Already up to date");
            false
        };

        if result.outcome == Outcome::Failed {
            warn!(
                recovered = new_rounds,
                "Run stopped after repeated failures; recovered {} rounds before stopping",
                new_rounds
            );
        }

        self.emit(Event::Finished {
            outcome: result.outcome,
            total_rounds,
            new_rounds,
        });

        Ok(RunReport {
            outcome: result.outcome,
            total_rounds,
            new_rounds,
            unsaved_rounds,
            requests: result.requests,
            saved,
            last_error: result.last_error,
        })
    }

    /// Fetch and merge pages until a termination condition holds
    async fn reconcile(&self, archive: &mut Archive) -> LoopResult {
        let start_round = archive.len() as Round + 1;
        let mut cursor: Option<Round> = None;
        let mut failures = 0u32;
        let mut requests = 0u32;
        let mut new_rounds = 0usize;
        let mut last_error = None;

        debug!(start_round, "Starting reconciliation");

        let outcome = loop {
            let request = match cursor {
                None => PageRequest::first(
                    start_round,
                    self.fetch.anchor_margin,
                    self.fetch.min_anchor,
                ),
                Some(cursor) => PageRequest::After(cursor),
            };

            requests += 1;
            let limit = (archive.len() as Round).saturating_add(self.fetch.max_round_lead);
            let fetched = self
                .source
                .fetch(request)
                .await
                .and_then(|batch| within_limit(batch, limit));
            let batch = match fetched {
                Ok(batch) => {
                    failures = 0;
                    batch
                }
                Err(e) => {
                    failures += 1;
                    match self.policy.on_failure(failures) {
                        RetryDecision::GiveUp => {
                            error!(
                                error = %e,
                                failures,
                                "{} consecutive failures. Stopping.",
                                failures
                            );
                            last_error = Some(e.to_string());
                            break Outcome::Failed;
                        }
                        RetryDecision::RetryAfter(delay) => {
                            warn!(
                                error = %e,
                                attempt = failures,
                                max_failures = self.policy.max_consecutive_failures(),
                                delay_ms = delay.as_millis(),
                                "Fetch failed, retrying"
                            );
                            self.emit(Event::FetchRetrying {
                                attempt: failures,
                                max_failures: self.policy.max_consecutive_failures(),
                                delay_ms: delay.as_millis() as u64,
                                error: e.to_string(),
                            });
                            self.sleeper.sleep(delay).await;
                            continue;
                        }
                    }
                }
            };

            let Some(max_round) = batch.iter().map(|record| record.round).max() else {
                debug!(?request, "Empty page, remote source exhausted");
                break Outcome::Exhausted;
            };

            if let Some(previous) = cursor
                && max_round <= previous
            {
                debug!(previous, max_round, "Cursor did not advance");
                break Outcome::Stagnant;
            }

            let first_request = cursor.is_none();
            let added = self.merge_batch(archive, &batch, start_round);
            new_rounds += added;
            cursor = Some(max_round);

            if added == 0 && !first_request {
                debug!(cursor = max_round, "Page held only known rounds");
                break Outcome::UpToDate;
            }

            self.sleeper.sleep(self.fetch.request_delay).await;
        };

        LoopResult {
            outcome,
            new_rounds,
            requests,
            last_error,
        }
    }

    /// Merge new records in source order, returning how many were added
    fn merge_batch(
        &self,
        archive: &mut Archive,
        batch: &[BatchRecord],
        start_round: Round,
    ) -> usize {
        let mut added = 0;
        for record in batch {
            if record.round < start_round || archive.has(record.round) {
                continue;
            }

            archive.put(record.round, record.combination);
            info!(
                round = record.round,
                "Fetched round {}: [{}]",
                record.round,
                record.combination
            );
            self.emit(Event::RoundArchived {
                round: record.round,
                combination: record.combination,
            });
            added += 1;
        }
        added
    }
}

/// Reject a page naming a round past `limit`
fn within_limit(
    batch: Vec<BatchRecord>,
    limit: Round,
) -> std::result::Result<Vec<BatchRecord>, FetchError> {
    match batch.iter().find(|record| record.round > limit) {
        Some(record) => Err(FetchError::ImplausibleRound {
            round: record.round,
            limit,
        }),
        None => Ok(batch),
    }
}
