//! Archive of past winning combinations and its persistence
//!
//! The [`Archive`] is an ordered sequence of combinations where position
//! `round - 1` holds the result of `round`. While a run is merging, rounds
//! may arrive out of order and leave transient holes; a persisted archive
//! never contains one.
//!
//! Persistence sits behind the [`ArchiveStore`] trait. [`JsonFileStore`]
//! keeps the archive as a single JSON array of comma-joined strings:
//!
//! ```json
//! ["10,23,29,33,37,40","9,13,21,25,32,42"]
//! ```

use crate::error::{ArchiveError, Result};
use crate::types::{Combination, MAX_NUMBER, Round};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Ordered draw history, indexed by round
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Archive {
    entries: Vec<Option<Combination>>,
}

impl Archive {
    /// Create an empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an archive whose round `i + 1` is `combinations[i]`
    pub fn from_combinations(combinations: Vec<Combination>) -> Self {
        Self {
            entries: combinations.into_iter().map(Some).collect(),
        }
    }

    /// Highest round slot in the archive, holes included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no rounds
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `round` has a combination
    ///
    /// Round 0, rounds past the end, and holes all report `false`.
    pub fn has(&self, round: Round) -> bool {
        self.get(round).is_some()
    }

    /// Combination stored for `round`
    pub fn get(&self, round: Round) -> Option<&Combination> {
        let index = (round as usize).checked_sub(1)?;
        self.entries.get(index)?.as_ref()
    }

    /// Store `combination` for `round`, overwriting any previous value
    ///
    /// Rounds past the end extend the archive; skipped rounds become holes.
    ///
    /// # Panics
    ///
    /// Panics if `round` is 0; rounds are 1-based.
    pub fn put(&mut self, round: Round, combination: Combination) {
        assert!(round > 0, "rounds start at 1");
        let index = round as usize - 1;
        if index >= self.entries.len() {
            self.entries.resize(index + 1, None);
        }
        self.entries[index] = Some(combination);
    }

    /// Number of rounds from 1 upward with no hole
    pub fn contiguous_len(&self) -> usize {
        self.entries
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.entries.len())
    }

    /// Populated rounds in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (Round, &Combination)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.as_ref().map(|c| (i as Round + 1, c)))
    }

    /// Every archived combination, for exact-match lookups
    pub fn combinations(&self) -> HashSet<Combination> {
        self.entries.iter().flatten().copied().collect()
    }

    /// How often each number was drawn; index 0 is unused
    pub fn frequencies(&self) -> [u32; MAX_NUMBER as usize + 1] {
        let mut counts = [0u32; MAX_NUMBER as usize + 1];
        for combination in self.entries.iter().flatten() {
            for &n in combination.numbers() {
                counts[n as usize] += 1;
            }
        }
        counts
    }

    /// The persistable prefix: rounds 1..=contiguous_len
    fn persistable(&self) -> Vec<Combination> {
        self.entries.iter().map_while(|e| *e).collect()
    }
}

/// Trait for loading and saving the archive
///
/// Implementations must make `save` atomic with respect to readers: a
/// concurrent `load` sees either the old or the new archive, never a mix.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Read the persisted archive
    ///
    /// Never fails: a missing or unreadable archive yields an empty one.
    async fn load(&self) -> Archive;

    /// Replace the persisted archive with `archive`
    async fn save(&self, archive: &Archive) -> Result<()>;

    /// Human-readable location for logging
    fn describe(&self) -> String;
}

/// Archive stored as a JSON array in a single file
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the file
    ///
    /// `Ok(None)` means no file exists yet.
    pub async fn try_load(&self) -> std::result::Result<Option<Archive>, ArchiveError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.unreadable(e.to_string())),
        };

        let combinations: Vec<Combination> =
            serde_json::from_str(&raw).map_err(|e| self.unreadable(e.to_string()))?;

        Ok(Some(Archive::from_combinations(combinations)))
    }

    fn unreadable(&self, reason: String) -> ArchiveError {
        ArchiveError::Unreadable {
            path: self.path.clone(),
            reason,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_atomically(&self, body: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        let written = match write_synced(&temp, body).await {
            Ok(()) => tokio::fs::rename(&temp, &self.path).await,
            Err(e) => Err(e),
        };
        if written.is_err() {
            let _ = tokio::fs::remove_file(&temp).await;
        }
        written
    }
}

/// Write `body` to `path` and flush it to disk before returning
async fn write_synced(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(body).await?;
    file.sync_all().await
}

#[async_trait]
impl ArchiveStore for JsonFileStore {
    async fn load(&self) -> Archive {
        match self.try_load().await {
            Ok(Some(archive)) => {
                info!(
                    path = %self.path.display(),
                    rounds = archive.len(),
                    "Found existing data up to round {}",
                    archive.len()
                );
                archive
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No archive found, starting from round 1");
                Archive::new()
            }
            Err(e) => {
                warn!(error = %e, "Error reading existing archive, starting from scratch");
                Archive::new()
            }
        }
    }

    async fn save(&self, archive: &Archive) -> Result<()> {
        let persisted = archive.persistable();
        if persisted.len() < archive.len() {
            warn!(
                kept = persisted.len(),
                dropped = archive.len() - persisted.len(),
                first_missing = persisted.len() + 1,
                "Archive has a gap, saving the contiguous prefix only"
            );
        }

        let body = serde_json::to_vec(&persisted)?;
        self.write_atomically(&body)
            .await
            .map_err(|source| ArchiveError::WriteFailed {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), rounds = persisted.len(), "Archive written");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn combo(s: &str) -> Combination {
        s.parse().unwrap()
    }

    #[test]
    fn has_is_a_safe_probe() {
        let mut archive = Archive::new();
        assert!(!archive.has(0));
        assert!(!archive.has(1));

        archive.put(3, combo("1,2,3,4,5,6"));
        assert_eq!(archive.len(), 3);
        assert!(!archive.has(0));
        assert!(!archive.has(1), "hole must not report as present");
        assert!(!archive.has(2));
        assert!(archive.has(3));
        assert!(!archive.has(4));
        assert!(!archive.has(Round::MAX));
    }

    #[test]
    fn put_overwrites_existing_round() {
        let mut archive = Archive::from_combinations(vec![combo("1,2,3,4,5,6")]);
        archive.put(1, combo("7,8,9,10,11,12"));
        assert_eq!(archive.get(1), Some(&combo("7,8,9,10,11,12")));
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn contiguous_len_stops_at_first_hole() {
        let mut archive = Archive::new();
        archive.put(1, combo("1,2,3,4,5,6"));
        archive.put(2, combo("1,2,3,4,5,7"));
        archive.put(4, combo("1,2,3,4,5,8"));
        assert_eq!(archive.contiguous_len(), 2);
        assert_eq!(archive.len(), 4);

        archive.put(3, combo("1,2,3,4,5,9"));
        assert_eq!(archive.contiguous_len(), 4);
    }

    #[test]
    fn frequencies_count_each_number() {
        let archive = Archive::from_combinations(vec![
            combo("1,2,3,4,5,6"),
            combo("1,2,3,40,44,45"),
        ]);
        let freq = archive.frequencies();
        assert_eq!(freq[1], 2);
        assert_eq!(freq[6], 1);
        assert_eq!(freq[45], 1);
        assert_eq!(freq[20], 0);
        assert_eq!(freq.iter().sum::<u32>(), 12);
    }

    #[test]
    fn iter_skips_holes() {
        let mut archive = Archive::new();
        archive.put(2, combo("1,2,3,4,5,6"));
        let rounds: Vec<Round> = archive.iter().map(|(r, _)| r).collect();
        assert_eq!(rounds, vec![2]);
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("winning_numbers.json"));
        assert!(store.try_load().await.unwrap().is_none());
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn load_unparsable_file_falls_back_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("winning_numbers.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.try_load().await,
            Err(ArchiveError::Unreadable { .. })
        ));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn load_rejects_invalid_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("winning_numbers.json");
        std::fs::write(&path, r#"["1,2,3,4,5,6","1,2,3,4,5,99"]"#).unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.try_load().await.is_err());
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/dir/winning_numbers.json"));
        let archive = Archive::from_combinations(vec![
            combo("10,23,29,33,37,40"),
            combo("9,13,21,25,32,42"),
        ]);

        store.save(&archive).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"["10,23,29,33,37,40","9,13,21,25,32,42"]"#);
        assert_eq!(store.load().await, archive);
        assert!(!store.temp_path().exists(), "temp file must be renamed away");
    }

    #[tokio::test]
    async fn save_replaces_a_longer_existing_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("winning_numbers.json"));
        std::fs::write(store.path(), "x".repeat(4096)).unwrap();
        // a stale temp file from an interrupted save is truncated, not appended to
        std::fs::write(store.temp_path(), "y".repeat(4096)).unwrap();

        let archive = Archive::from_combinations(vec![combo("1,2,3,4,5,6")]);
        store.save(&archive).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            r#"["1,2,3,4,5,6"]"#
        );
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn save_drops_rounds_after_a_hole() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("winning_numbers.json"));
        let mut archive = Archive::new();
        archive.put(1, combo("1,2,3,4,5,6"));
        archive.put(3, combo("1,2,3,4,5,7"));

        store.save(&archive).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.len(), 1);
        assert!(loaded.has(1));
    }
}
