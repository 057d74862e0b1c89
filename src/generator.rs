//! Number generation against the archived history
//!
//! Draws six distinct numbers honoring must-include and excluded numbers,
//! optionally weighted by how often each number appears in the archive.
//! A draw that reproduces a historical combination is rejected and drawn
//! again, up to a bounded number of attempts; if every attempt collides the
//! last candidate is returned and flagged.

use crate::archive::Archive;
use crate::error::GenerateError;
use crate::types::{Combination, MAX_NUMBER, MIN_NUMBER, NUMBERS_PER_DRAW};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

/// How candidate numbers are weighted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightMode {
    /// Every number equally likely
    #[default]
    Random,
    /// Frequently drawn numbers favored
    Hot,
    /// Rarely drawn numbers favored
    Cold,
}

impl FromStr for WeightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(WeightMode::Random),
            "hot" => Ok(WeightMode::Hot),
            "cold" => Ok(WeightMode::Cold),
            other => Err(format!("unknown weighting mode {other:?}")),
        }
    }
}

/// Constraints for one draw
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Numbers every result must contain
    pub include: BTreeSet<u8>,
    /// Numbers no result may contain
    pub exclude: BTreeSet<u8>,
    /// Candidate weighting
    pub mode: WeightMode,
}

/// A generated combination
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generated {
    /// The drawn numbers
    pub combination: Combination,
    /// Draws made before this one was accepted
    pub attempts: u32,
    /// True when every attempt reproduced a historical combination
    pub is_historical_match: bool,
}

/// Draws combinations that avoid the archived history
#[derive(Clone, Debug)]
pub struct Generator {
    history: HashSet<Combination>,
    frequencies: [u32; MAX_NUMBER as usize + 1],
    max_frequency: u32,
    max_attempts: u32,
}

impl Generator {
    /// Generator over `archive`, trying at most `max_attempts` draws per request
    pub fn new(archive: &Archive, max_attempts: u32) -> Self {
        let frequencies = archive.frequencies();
        Self {
            history: archive.combinations(),
            max_frequency: frequencies.iter().copied().max().unwrap_or(0),
            frequencies,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Times `number` was drawn in the archive
    pub fn frequency(&self, number: u8) -> u32 {
        self.frequencies.get(number as usize).copied().unwrap_or(0)
    }

    /// Whether `combination` was drawn before
    pub fn is_historical(&self, combination: &Combination) -> bool {
        self.history.contains(combination)
    }

    /// Draw one combination satisfying `request`
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] when the constraints are contradictory or
    /// leave too few numbers to complete a draw.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        request: &GenerateRequest,
        rng: &mut R,
    ) -> Result<Generated, GenerateError> {
        let candidates = candidates_for(request)?;
        let needed = NUMBERS_PER_DRAW - request.include.len();
        let unavailable = || GenerateError::NotEnoughCandidates {
            available: candidates.len(),
            needed,
        };

        let mut last = None;
        for attempt in 1..=self.max_attempts {
            let combination = self
                .draw(request, &candidates, needed, rng)
                .ok_or_else(unavailable)?;

            if !self.is_historical(&combination) {
                return Ok(Generated {
                    combination,
                    attempts: attempt,
                    is_historical_match: false,
                });
            }
            last = Some(combination);
        }

        tracing::debug!(
            attempts = self.max_attempts,
            "Every draw matched a past result, keeping the last one"
        );
        let combination = last.ok_or_else(unavailable)?;
        Ok(Generated {
            combination,
            attempts: self.max_attempts,
            is_historical_match: true,
        })
    }

    fn weight(&self, mode: WeightMode, number: u8) -> u32 {
        match mode {
            WeightMode::Random => 1,
            WeightMode::Hot => self.frequency(number) + 1,
            WeightMode::Cold => self.max_frequency - self.frequency(number) + 1,
        }
    }

    fn draw<R: Rng + ?Sized>(
        &self,
        request: &GenerateRequest,
        candidates: &[u8],
        needed: usize,
        rng: &mut R,
    ) -> Option<Combination> {
        let mut pool = candidates.to_vec();
        let mut numbers: Vec<i64> = request.include.iter().map(|&n| i64::from(n)).collect();

        for _ in 0..needed {
            let picked = *pool
                .choose_weighted(rng, |&n| self.weight(request.mode, n))
                .ok()?;
            pool.retain(|&n| n != picked);
            numbers.push(i64::from(picked));
        }

        Combination::from_slice(&numbers).ok()
    }
}

/// Numbers that may fill the slots left after the includes
fn candidates_for(request: &GenerateRequest) -> Result<Vec<u8>, GenerateError> {
    for &n in request.include.iter().chain(&request.exclude) {
        if !(MIN_NUMBER..=MAX_NUMBER).contains(&n) {
            return Err(GenerateError::OutOfRange(n));
        }
    }
    if request.include.len() > NUMBERS_PER_DRAW {
        return Err(GenerateError::TooManyIncludes(request.include.len()));
    }
    if let Some(&n) = request.include.intersection(&request.exclude).next() {
        return Err(GenerateError::Conflict(n));
    }

    let candidates: Vec<u8> = (MIN_NUMBER..=MAX_NUMBER)
        .filter(|n| !request.include.contains(n) && !request.exclude.contains(n))
        .collect();

    let needed = NUMBERS_PER_DRAW - request.include.len();
    if candidates.len() < needed {
        return Err(GenerateError::NotEnoughCandidates {
            available: candidates.len(),
            needed,
        });
    }
    Ok(candidates)
}
