//! Error types for the daily rotation.
//!
//! [`DailyError`] is the taxonomy a run can end in. [`StoreError`] describes
//! what went wrong inside a catalog backend and is wrapped by the
//! `Fetch` and `Commit` variants.

use crate::song::SongRecord;
use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised by a [`crate::store::CatalogStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("store returned HTTP {0}: {1}")]
    Api(u16, String),

    #[error("could not parse store response: {0}")]
    Parse(String),

    #[error(
        "store returned {returned} of {total} rows; refusing to work on a partial catalog \
         (raise the server's PostgREST max-rows to at least {total})"
    )]
    Truncated { returned: usize, total: usize },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{date} is already assigned to `{existing}'")]
    Conflict { date: NaiveDate, existing: String },
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Api(status.as_u16(), err.to_string()),
            None if err.is_decode() => Self::Parse(err.to_string()),
            None => Self::Network(err.to_string()),
        }
    }
}

/// Ways a daily run can fail.
#[derive(Debug, Error)]
pub enum DailyError {
    /// Missing or invalid endpoint/credential. Raised before any store call.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to fetch songs: {0}")]
    Fetch(#[source] StoreError),

    #[error("no songs found in the catalog")]
    EmptyCatalog,

    /// The selection is valid; only persisting it failed.
    #[error("failed to record `{selection}' as today's pick: {source}")]
    Commit {
        selection: Box<SongRecord>,
        #[source]
        source: StoreError,
    },
}

impl DailyError {
    /// The song that was chosen but not persisted, if any.
    #[must_use]
    pub fn uncommitted_selection(&self) -> Option<&SongRecord> {
        match self {
            Self::Commit { selection, .. } => Some(selection),
            _ => None,
        }
    }
}
