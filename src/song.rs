//! # Song Records
//!
//! How a catalog row looks once it has been read from a store, and how its
//! stored pick date is interpreted.
//!
//! Dates are kept exactly as the store returned them. Interpretation happens
//! here, in one place: a missing or unparseable date is treated as the
//! never-picked sentinel so that a corrupt row can never drop out of the
//! rotation.

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire format of `last_picked_date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Effective pick date of a song that has never been picked.
///
/// Fixed at 1900-01-01 so that snapshots stay comparable across runs and
/// tools reading the same table.
pub const NEVER_PICKED: NaiveDate = match NaiveDate::from_ymd_opt(1900, 1, 1) {
    Some(date) => date,
    None => panic!("1900-01-01 is a valid date"),
};

/// Identity of a catalog row. Case-sensitive, exact match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SongKey {
    pub song: String,
    pub artist: String,
}

impl SongKey {
    #[must_use]
    pub fn new(song: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            song: song.into(),
            artist: artist.into(),
        }
    }
}

impl fmt::Display for SongKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.song, self.artist)
    }
}

/// One catalog row as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    pub song: String,
    pub artist: String,
    /// Raw stored value. May be absent, or hold something that is not a date.
    #[serde(default)]
    pub last_picked_date: Option<String>,
}

impl SongRecord {
    #[must_use]
    pub fn new(song: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            song: song.into(),
            artist: artist.into(),
            last_picked_date: None,
        }
    }

    /// Builder-style helper setting the stored date to `date`.
    #[must_use]
    pub fn picked_on(mut self, date: NaiveDate) -> Self {
        self.last_picked_date = Some(format_date(date));
        self
    }

    /// Builder-style helper storing a raw, possibly malformed, date string.
    #[must_use]
    pub fn with_raw_date(mut self, raw: impl Into<String>) -> Self {
        self.last_picked_date = Some(raw.into());
        self
    }

    #[must_use]
    pub fn key(&self) -> SongKey {
        SongKey::new(self.song.clone(), self.artist.clone())
    }

    /// Parsed pick date, `None` when absent or malformed.
    #[must_use]
    pub fn last_picked(&self) -> Option<NaiveDate> {
        self.last_picked_date.as_deref().and_then(parse_date)
    }

    /// Pick date used for ordering. Absent and malformed both map to
    /// [`NEVER_PICKED`].
    #[must_use]
    pub fn effective_date(&self) -> NaiveDate {
        self.last_picked().unwrap_or(NEVER_PICKED)
    }

    /// True if a date is stored but cannot be parsed.
    #[must_use]
    pub fn has_malformed_date(&self) -> bool {
        matches!(self.last_picked_date.as_deref(), Some(raw) if parse_date(raw).is_none())
    }

    #[must_use]
    pub fn was_picked_on(&self, day: NaiveDate) -> bool {
        self.last_picked() == Some(day)
    }
}

impl fmt::Display for SongRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.song, self.artist)
    }
}

/// One entry of a store's pick log: the song chosen for a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPick {
    pub date: NaiveDate,
    pub key: SongKey,
}

/// Parse a stored `YYYY-MM-DD` date. Empty and malformed values yield `None`.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok()
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// The whole catalog, read once at the start of a run.
///
/// Immutable after construction; the engine only ever sees this view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    records: Vec<SongRecord>,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn new(records: Vec<SongRecord>) -> Self {
        for record in records.iter().filter(|r| r.has_malformed_date()) {
            warn!(
                "Unparseable last_picked_date {:?} for `{record}'; treating it as never picked",
                record.last_picked_date.as_deref().unwrap_or_default()
            );
        }
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[SongRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SongRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records ordered most overdue first, ties broken by song then artist.
    #[must_use]
    pub fn by_overdue(&self) -> Vec<&SongRecord> {
        let mut sorted: Vec<&SongRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| {
            a.effective_date()
                .cmp(&b.effective_date())
                .then_with(|| a.song.cmp(&b.song))
                .then_with(|| a.artist.cmp(&b.artist))
        });
        sorted
    }
}

impl From<Vec<SongRecord>> for CatalogSnapshot {
    fn from(records: Vec<SongRecord>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a CatalogSnapshot {
    type Item = &'a SongRecord;
    type IntoIter = std::slice::Iter<'a, SongRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
