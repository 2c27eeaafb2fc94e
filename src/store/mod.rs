//! # Catalog Stores
//!
//! The catalog lives outside this process. [`CatalogStore`] is the seam the
//! rest of the crate talks to, with three backends:
//!
//! - [`rest::RestStore`] - PostgREST endpoint over HTTP (the production table)
//! - [`sqlite::SqliteStore`] - local file for offline use
//! - [`memory::MemoryStore`] - in-process, for tests and benchmarks
//!
//! On top of the trait sit the two adapters a daily run needs:
//! [`read_snapshot`] and [`RotationCommitter`].

pub mod memory;
pub mod rest;
pub mod sqlite;

use crate::algorithm::SelectionResult;
use crate::error::{DailyError, StoreError};
use crate::song::{CatalogSnapshot, DailyPick, SongKey, SongRecord};
use chrono::NaiveDate;
use log::{debug, info};

/// Read/write access to the song catalog.
pub trait CatalogStore {
    /// Every row of the catalog, in one read.
    ///
    /// # Errors
    ///
    /// Must fail rather than return a partial catalog.
    fn fetch_all(&self) -> Result<Vec<SongRecord>, StoreError>;

    /// Set `last_picked_date = date` for `key`, creating the row if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write did not happen.
    fn upsert_pick(&self, key: &SongKey, date: NaiveDate) -> Result<(), StoreError>;

    /// Insert new songs, leaving rows that already exist untouched.
    /// Returns how many rows were actually inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert failed.
    fn insert_new(&self, songs: &[SongKey]) -> Result<usize, StoreError>;

    /// Every recorded daily pick, oldest first. `None` when the backend keeps
    /// no pick log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log exists but could not be read.
    fn pick_history(&self) -> Result<Option<Vec<DailyPick>>, StoreError> {
        Ok(None)
    }
}

impl<S: CatalogStore + ?Sized> CatalogStore for Box<S> {
    fn fetch_all(&self) -> Result<Vec<SongRecord>, StoreError> {
        (**self).fetch_all()
    }

    fn upsert_pick(&self, key: &SongKey, date: NaiveDate) -> Result<(), StoreError> {
        (**self).upsert_pick(key, date)
    }

    fn insert_new(&self, songs: &[SongKey]) -> Result<usize, StoreError> {
        (**self).insert_new(songs)
    }

    fn pick_history(&self) -> Result<Option<Vec<DailyPick>>, StoreError> {
        (**self).pick_history()
    }
}

/// Take a snapshot of the whole catalog.
///
/// # Errors
///
/// [`DailyError::Fetch`] if the store read failed. An empty catalog is not an
/// error here; the engine decides what to do with it.
pub fn read_snapshot<S: CatalogStore + ?Sized>(store: &S) -> Result<CatalogSnapshot, DailyError> {
    let records = store.fetch_all().map_err(DailyError::Fetch)?;
    debug!("Fetched {} songs from the catalog", records.len());
    Ok(CatalogSnapshot::new(records))
}

/// What the committer did with a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// One row was written.
    Written,
    /// Idempotent hit: today's pick was already stored.
    Skipped,
}

/// Persists a selection as today's pick.
pub struct RotationCommitter<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CatalogStore + ?Sized> RotationCommitter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Write `today` as the selected song's last pick date.
    ///
    /// Does nothing when the selection is an idempotent hit.
    ///
    /// # Errors
    ///
    /// [`DailyError::Commit`] carrying the selection, so the caller can still
    /// report it or retry the write.
    pub fn commit(&self, selection: &SelectionResult, today: NaiveDate) -> Result<CommitOutcome, DailyError> {
        if selection.already_picked_today {
            debug!("Skipping commit, `{}' is already today's pick", selection.selected);
            return Ok(CommitOutcome::Skipped);
        }

        self.store
            .upsert_pick(&selection.selected.key(), today)
            .map_err(|source| DailyError::Commit {
                selection: Box::new(selection.selected.clone()),
                source,
            })?;

        info!("Recorded `{}' as the pick for {today}", selection.selected);
        Ok(CommitOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct BrokenStore;

    impl CatalogStore for BrokenStore {
        fn fetch_all(&self) -> Result<Vec<SongRecord>, StoreError> {
            Err(StoreError::Network("unreachable".to_string()))
        }

        fn upsert_pick(&self, _key: &SongKey, _date: NaiveDate) -> Result<(), StoreError> {
            Err(StoreError::Api(503, "unavailable".to_string()))
        }

        fn insert_new(&self, _songs: &[SongKey]) -> Result<usize, StoreError> {
            Ok(0)
        }
    }

    #[test]
    fn test_read_snapshot_propagates_fetch_error() {
        assert!(matches!(read_snapshot(&BrokenStore), Err(DailyError::Fetch(_))));
    }

    #[test]
    fn test_commit_writes_exactly_one_row() {
        let store = MemoryStore::new(vec![SongRecord::new("A", "X"), SongRecord::new("B", "X")]);
        let selection = SelectionResult {
            selected: SongRecord::new("B", "X"),
            already_picked_today: false,
        };

        let outcome = RotationCommitter::new(&store).commit(&selection, day(2024, 6, 1)).unwrap();
        assert_eq!(outcome, CommitOutcome::Written);

        let rows = store.fetch_all().unwrap();
        assert_eq!(rows[0].last_picked_date, None);
        assert_eq!(rows[1].last_picked_date.as_deref(), Some("2024-06-01"));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_commit_skips_idempotent_hit() {
        let store = MemoryStore::new(vec![SongRecord::new("A", "X").picked_on(day(2024, 6, 1))]);
        let selection = SelectionResult {
            selected: SongRecord::new("A", "X").picked_on(day(2024, 6, 1)),
            already_picked_today: true,
        };

        let outcome = RotationCommitter::new(&store).commit(&selection, day(2024, 6, 1)).unwrap();
        assert_eq!(outcome, CommitOutcome::Skipped);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_commit_failure_carries_selection() {
        let selection = SelectionResult {
            selected: SongRecord::new("A", "X"),
            already_picked_today: false,
        };

        let err = RotationCommitter::new(&BrokenStore)
            .commit(&selection, day(2024, 6, 1))
            .unwrap_err();
        assert_eq!(err.uncommitted_selection(), Some(&selection.selected));
    }

    #[test]
    fn test_boxed_store_delegates() {
        let store: Box<dyn CatalogStore> = Box::new(MemoryStore::new(vec![SongRecord::new("A", "X")]));
        let snapshot = read_snapshot(&store).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.pick_history().unwrap(), None);
    }
}
