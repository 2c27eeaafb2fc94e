//! SQLite catalog for offline use.
//!
//! Besides the `songs` table this store keeps `daily_picks`, one row per
//! calendar day. A pick is written to both tables in one transaction, which
//! makes "one song per day" hold even if two runs race on the same file.

use super::CatalogStore;
use crate::error::StoreError;
use crate::song::{format_date, parse_date, DailyPick, SongKey, SongRecord};
use chrono::NaiveDate;
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS songs (
        song             TEXT NOT NULL,
        artist           TEXT NOT NULL,
        last_picked_date TEXT,
        PRIMARY KEY (song, artist)
    );
    CREATE TABLE IF NOT EXISTS daily_picks (
        pick_date TEXT PRIMARY KEY,
        song      TEXT NOT NULL,
        artist    TEXT NOT NULL
    );
";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and make sure the schema exists.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        debug!("Opening catalog database at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// In-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Fails if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// The song recorded for `date` in `daily_picks`, if any.
    ///
    /// # Errors
    ///
    /// Fails on any SQL error.
    pub fn pick_for(&self, date: NaiveDate) -> Result<Option<SongKey>, StoreError> {
        let pick = self
            .conn
            .query_row(
                "SELECT song, artist FROM daily_picks WHERE pick_date = ?1",
                [format_date(date)],
                |row| Ok(SongKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(pick)
    }
}

impl CatalogStore for SqliteStore {
    fn fetch_all(&self) -> Result<Vec<SongRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT song, artist, last_picked_date FROM songs")?;

        let rows = stmt.query_map([], |row| {
            Ok(SongRecord {
                song: row.get(0)?,
                artist: row.get(1)?,
                last_picked_date: row.get(2)?,
            })
        })?;

        let mut songs = Vec::new();
        for song in rows {
            songs.push(song?);
        }
        Ok(songs)
    }

    fn upsert_pick(&self, key: &SongKey, date: NaiveDate) -> Result<(), StoreError> {
        let date_str = format_date(date);
        let tx = self.conn.unchecked_transaction()?;

        let existing: Option<(String, String)> = tx
            .query_row(
                "SELECT song, artist FROM daily_picks WHERE pick_date = ?1",
                [&date_str],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((song, artist)) if song != key.song || artist != key.artist => {
                let existing = SongKey::new(song, artist);
                warn!("Refusing to pick `{key}' on {date_str}: `{existing}' already holds that day");
                return Err(StoreError::Conflict {
                    date,
                    existing: existing.to_string(),
                });
            }
            Some(_) => debug!("`{key}' already recorded for {date_str}, rewriting"),
            None => {
                tx.execute(
                    "INSERT INTO daily_picks (pick_date, song, artist) VALUES (?1, ?2, ?3)",
                    params![date_str, key.song, key.artist],
                )?;
            }
        }

        tx.execute(
            "INSERT INTO songs (song, artist, last_picked_date) VALUES (?1, ?2, ?3)
             ON CONFLICT (song, artist) DO UPDATE SET last_picked_date = excluded.last_picked_date",
            params![key.song, key.artist, date_str],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn insert_new(&self, songs: &[SongKey]) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO songs (song, artist) VALUES (?1, ?2)")?;
            for key in songs {
                inserted += stmt.execute(params![key.song, key.artist])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn pick_history(&self) -> Result<Option<Vec<DailyPick>>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT pick_date, song, artist FROM daily_picks ORDER BY pick_date")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                SongKey::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
            ))
        })?;

        let mut picks = Vec::new();
        for row in rows {
            let (raw, key) = row?;
            match parse_date(&raw) {
                Some(date) => picks.push(DailyPick { date, key }),
                None => warn!("Skipping daily_picks row with unparseable date {raw:?}"),
            }
        }
        Ok(Some(picks))
    }
}
