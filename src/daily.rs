//! The daily run: snapshot, select, commit.

use crate::algorithm::{SelectionEngine, SelectionResult};
use crate::error::DailyError;
use crate::store::{read_snapshot, CatalogStore, CommitOutcome, RotationCommitter};
use chrono::NaiveDate;
use rand::Rng;

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyOutcome {
    pub selection: SelectionResult,
    /// `None` on a dry run.
    pub commit: Option<CommitOutcome>,
}

/// Run the whole pipeline once for `today`.
///
/// The same `today` drives both the idempotency check and the write. With
/// `dry_run` the store is only read.
///
/// # Errors
///
/// - [`DailyError::Fetch`] if the catalog could not be read
/// - [`DailyError::EmptyCatalog`] if it has no rows
/// - [`DailyError::Commit`] if the pick could not be written; the error still
///   carries the selected song
pub fn run_daily<S, R>(store: &S, today: NaiveDate, rng: &mut R, dry_run: bool) -> Result<DailyOutcome, DailyError>
where
    S: CatalogStore + ?Sized,
    R: Rng + ?Sized,
{
    let snapshot = read_snapshot(store)?;
    let selection = SelectionEngine::new(today).select(&snapshot, rng)?;

    let commit = if dry_run {
        None
    } else {
        Some(RotationCommitter::new(store).commit(&selection, today)?)
    };

    Ok(DailyOutcome { selection, commit })
}
