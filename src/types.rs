//! Core types and events

use crate::error::CombinationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sequential identifier of one drawing, starting at 1
pub type Round = u32;

/// Smallest number that can be drawn
pub const MIN_NUMBER: u8 = 1;

/// Largest number that can be drawn
pub const MAX_NUMBER: u8 = 45;

/// Count of winning numbers in one drawing
pub const NUMBERS_PER_DRAW: usize = 6;

/// The sorted result of one drawing
///
/// Always holds exactly six distinct values in `1..=45`, ascending. The
/// serialized form is the comma-joined string, e.g. `"3,11,19,25,33,41"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Combination([u8; NUMBERS_PER_DRAW]);

impl Combination {
    /// Build a combination from six raw values in any order
    pub fn new(numbers: [i64; NUMBERS_PER_DRAW]) -> Result<Self, CombinationError> {
        Self::from_slice(&numbers)
    }

    /// Build a combination from a slice of raw values in any order
    ///
    /// Fails unless the slice holds exactly six distinct values in range.
    pub fn from_slice(numbers: &[i64]) -> Result<Self, CombinationError> {
        if numbers.len() != NUMBERS_PER_DRAW {
            return Err(CombinationError::WrongCount {
                expected: NUMBERS_PER_DRAW,
                actual: numbers.len(),
            });
        }

        let mut sorted = [0u8; NUMBERS_PER_DRAW];
        for (slot, &value) in sorted.iter_mut().zip(numbers) {
            if value < i64::from(MIN_NUMBER) || value > i64::from(MAX_NUMBER) {
                return Err(CombinationError::OutOfRange(value));
            }
            *slot = value as u8;
        }
        sorted.sort_unstable();

        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CombinationError::Duplicate(pair[0]));
        }

        Ok(Self(sorted))
    }

    /// The six numbers, ascending
    pub fn numbers(&self) -> &[u8; NUMBERS_PER_DRAW] {
        &self.0
    }

    /// Whether `number` is part of this combination
    pub fn contains(&self, number: u8) -> bool {
        self.0.binary_search(&number).is_ok()
    }

    /// Display band of a number: 1 for 1-10, 2 for 11-20, ... 5 for 41-45
    ///
    /// ```
    /// use lotto_archive::Combination;
    ///
    /// assert_eq!(Combination::color_band(10), 1);
    /// assert_eq!(Combination::color_band(11), 2);
    /// assert_eq!(Combination::color_band(45), 5);
    /// ```
    pub fn color_band(number: u8) -> u8 {
        match number {
            0..=10 => 1,
            11..=20 => 2,
            21..=30 => 3,
            31..=40 => 4,
            _ => 5,
        }
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{n}")?;
        }
        Ok(())
    }
}

impl FromStr for Combination {
    type Err = CombinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<i64>()
                    .map_err(|_| CombinationError::Parse(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_slice(&values)
    }
}

impl TryFrom<String> for Combination {
    type Error = CombinationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Combination> for String {
    fn from(value: Combination) -> Self {
        value.to_string()
    }
}

/// One normalized record returned by the remote source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchRecord {
    /// Round the record describes
    pub round: Round,
    /// Winning numbers, sorted
    pub combination: Combination,
}

/// Pagination parameters for one batch request
///
/// The first request of a run is anchored near the start round; every later
/// request continues after the highest round seen so far (the cursor).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageRequest {
    /// Return a page centred near this round
    Anchor(Round),
    /// Return the page following this cursor
    After(Round),
}

impl PageRequest {
    /// First request of a run: `max(start_round - margin, floor)`
    pub fn first(start_round: Round, margin: Round, floor: Round) -> Self {
        PageRequest::Anchor(start_round.saturating_sub(margin).max(floor))
    }
}

/// How a reconciliation run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Remote source returned an empty page
    Exhausted,
    /// A page did not advance the cursor
    Stagnant,
    /// A follow-up page contained only known rounds
    UpToDate,
    /// Consecutive fetch failures reached the configured maximum
    Failed,
}

impl Outcome {
    /// Whether the run ended without giving up on errors
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed)
    }
}

/// Event emitted while reconciling the archive
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new round was merged into the archive
    RoundArchived {
        /// Round number
        round: Round,
        /// Winning numbers
        combination: Combination,
    },

    /// A batch request failed and will be retried
    FetchRetrying {
        /// Consecutive failure count
        attempt: u32,
        /// Failure count at which the run stops
        max_failures: u32,
        /// Backoff before the retry in milliseconds
        delay_ms: u64,
        /// Error message
        error: String,
    },

    /// Run finished
    Finished {
        /// Termination reason
        outcome: Outcome,
        /// Rounds in the archive after the run
        total_rounds: usize,
        /// Rounds added during the run
        new_rounds: usize,
    },
}
