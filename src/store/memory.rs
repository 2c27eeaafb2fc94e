//! In-process catalog store.

use super::CatalogStore;
use crate::error::StoreError;
use crate::song::{format_date, SongKey, SongRecord};
use chrono::NaiveDate;
use std::sync::{Arc, Mutex, MutexGuard};

/// Catalog held in memory. Clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<SongRecord>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(rows: Vec<SongRecord>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
            writes: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of successful `upsert_pick` calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn rows(&self) -> MutexGuard<'_, Vec<SongRecord>> {
        self.rows.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CatalogStore for MemoryStore {
    fn fetch_all(&self) -> Result<Vec<SongRecord>, StoreError> {
        Ok(self.rows().clone())
    }

    fn upsert_pick(&self, key: &SongKey, date: NaiveDate) -> Result<(), StoreError> {
        let mut rows = self.rows();
        match rows.iter_mut().find(|r| r.song == key.song && r.artist == key.artist) {
            Some(row) => row.last_picked_date = Some(format_date(date)),
            None => rows.push(SongRecord::new(key.song.clone(), key.artist.clone()).picked_on(date)),
        }
        drop(rows);

        *self.writes.lock().unwrap_or_else(std::sync::PoisonError::into_inner) += 1;
        Ok(())
    }

    fn insert_new(&self, songs: &[SongKey]) -> Result<usize, StoreError> {
        let mut rows = self.rows();
        let mut inserted = 0;
        for key in songs {
            if !rows.iter().any(|r| r.song == key.song && r.artist == key.artist) {
                rows.push(SongRecord::new(key.song.clone(), key.artist.clone()));
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
