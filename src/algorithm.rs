//! Daily selection algorithm.
//!
//! Picks the most overdue song, uniformly at random among ties, and
//! recognizes a day that already has a pick.

use crate::error::DailyError;
use crate::song::{CatalogSnapshot, SongRecord};
use chrono::NaiveDate;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub selected: SongRecord,
    /// True when the snapshot already records a pick for today, so nothing
    /// needs to be written.
    pub already_picked_today: bool,
}

/// Pure selection over a snapshot for a given day.
///
/// The engine never reads the clock or an ambient RNG: `today` is fixed at
/// construction and the random source is passed to [`SelectionEngine::select`].
///
/// # Algorithm
///
/// ```text
/// if any record.last_picked == today      => that record, already_picked_today
/// oldest   = min(effective_date(record))   (absent/malformed = 1900-01-01)
/// eligible = { record | effective_date(record) == oldest }
/// pick     = uniform(eligible)
/// ```
///
/// Once every song carries a real date, the eligible set is exactly the songs
/// not yet picked in the current rotation cycle, so the catalog is walked in
/// full before anything repeats.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use dailysong::algorithm::SelectionEngine;
/// use dailysong::song::{CatalogSnapshot, SongRecord};
/// use rand::SeedableRng;
///
/// let day = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap();
/// let snapshot = CatalogSnapshot::new(vec![
///     SongRecord::new("A", "X"),
///     SongRecord::new("B", "X").picked_on(day(1, 1)),
///     SongRecord::new("C", "X").picked_on(day(1, 1)),
/// ]);
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let result = SelectionEngine::new(day(6, 1)).select(&snapshot, &mut rng)?;
/// assert_eq!(result.selected.song, "A");
/// assert!(!result.already_picked_today);
/// # Ok::<(), dailysong::error::DailyError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEngine {
    today: NaiveDate,
}

impl SelectionEngine {
    #[must_use]
    pub const fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    #[must_use]
    pub const fn today(&self) -> NaiveDate {
        self.today
    }

    /// Select today's song.
    ///
    /// # Errors
    ///
    /// Returns [`DailyError::EmptyCatalog`] if the snapshot holds no records.
    /// Malformed dates on individual records never cause an error.
    pub fn select<R: Rng + ?Sized>(
        &self,
        snapshot: &CatalogSnapshot,
        rng: &mut R,
    ) -> Result<SelectionResult, DailyError> {
        if snapshot.is_empty() {
            return Err(DailyError::EmptyCatalog);
        }

        if let Some(existing) = todays_pick(snapshot, self.today) {
            info!("`{existing}' was already picked on {}", self.today);
            return Ok(SelectionResult {
                selected: existing.clone(),
                already_picked_today: true,
            });
        }

        let eligible = eligible_set(snapshot);
        debug!(
            "{} of {} songs eligible (oldest effective date {:?})",
            eligible.len(),
            snapshot.len(),
            oldest_effective_date(snapshot)
        );

        let chosen = eligible
            .choose(rng)
            .copied()
            .ok_or(DailyError::EmptyCatalog)?;

        info!("Selected `{chosen}' for {}", self.today);
        Ok(SelectionResult {
            selected: chosen.clone(),
            already_picked_today: false,
        })
    }
}

/// First record in snapshot order whose stored date equals `today`.
#[must_use]
pub fn todays_pick(snapshot: &CatalogSnapshot, today: NaiveDate) -> Option<&SongRecord> {
    snapshot.iter().find(|record| record.was_picked_on(today))
}

/// Oldest effective pick date across the catalog, `None` when empty.
#[must_use]
pub fn oldest_effective_date(snapshot: &CatalogSnapshot) -> Option<NaiveDate> {
    snapshot.iter().map(SongRecord::effective_date).min()
}

/// Every record tied for the oldest effective pick date, in snapshot order.
#[must_use]
pub fn eligible_set(snapshot: &CatalogSnapshot) -> Vec<&SongRecord> {
    match oldest_effective_date(snapshot) {
        Some(oldest) => snapshot
            .iter()
            .filter(|record| record.effective_date() == oldest)
            .collect(),
        None => Vec::new(),
    }
}

/// Rotation progress derived from a snapshot and, when available, the
/// store's pick log.
pub mod statistics {
    use super::*;
    use crate::song::{DailyPick, SongKey, NEVER_PICKED};
    use serde::Serialize;
    use std::collections::HashSet;

    /// Where the catalog stands in its current rotation cycle.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct RotationStats {
        pub total: usize,
        /// Songs with no (or an unreadable) pick date.
        pub never_picked: usize,
        /// Songs tied for the oldest pick date, the candidates for the next pick.
        pub eligible_now: usize,
        /// `None` when the store keeps no pick log.
        pub picked_in_cycle: Option<usize>,
        pub remaining_in_cycle: Option<usize>,
        /// `None` when the oldest songs have never been picked.
        pub oldest_pick: Option<NaiveDate>,
        pub newest_pick: Option<NaiveDate>,
        pub todays_pick: Option<String>,
    }

    /// Songs picked so far in the current cycle, and songs still owed one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct CycleProgress {
        pub picked: usize,
        pub remaining: usize,
    }

    /// Replay the pick log against the current catalog.
    ///
    /// A cycle closes once every catalog song has been picked; the next pick
    /// opens a new one. Picks of songs no longer in the catalog are ignored,
    /// and a song added mid-cycle keeps the cycle open until it is picked.
    #[must_use]
    pub fn cycle_progress(snapshot: &CatalogSnapshot, history: &[DailyPick]) -> CycleProgress {
        let catalog: HashSet<SongKey> = snapshot.iter().map(SongRecord::key).collect();

        let mut ordered: Vec<&DailyPick> = history.iter().collect();
        ordered.sort_by_key(|pick| pick.date);

        let mut picked: HashSet<&SongKey> = HashSet::new();
        for pick in ordered.into_iter().filter(|p| catalog.contains(&p.key)) {
            if picked.len() == catalog.len() {
                picked.clear();
            }
            picked.insert(&pick.key);
        }

        CycleProgress {
            picked: picked.len(),
            remaining: catalog.len() - picked.len(),
        }
    }

    /// Summarize rotation progress for `today`.
    ///
    /// When today's pick is already logged it counts among the songs picked
    /// in the cycle, not among the remaining ones.
    #[must_use]
    pub fn analyze_rotation(
        snapshot: &CatalogSnapshot,
        history: Option<&[DailyPick]>,
        today: NaiveDate,
    ) -> RotationStats {
        let never_picked = snapshot
            .iter()
            .filter(|r| r.effective_date() == NEVER_PICKED)
            .count();
        let cycle = history.map(|log| cycle_progress(snapshot, log));
        let oldest = oldest_effective_date(snapshot);

        RotationStats {
            total: snapshot.len(),
            never_picked,
            eligible_now: eligible_set(snapshot).len(),
            picked_in_cycle: cycle.map(|c| c.picked),
            remaining_in_cycle: cycle.map(|c| c.remaining),
            oldest_pick: oldest.filter(|d| *d != NEVER_PICKED),
            newest_pick: snapshot.iter().filter_map(SongRecord::last_picked).max(),
            todays_pick: todays_pick(snapshot, today).map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::statistics::{analyze_rotation, cycle_progress, CycleProgress};
    use super::*;
    use crate::song::{DailyPick, SongKey};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_empty_catalog_fails() {
        let engine = SelectionEngine::new(day(2024, 6, 1));
        let result = engine.select(&CatalogSnapshot::default(), &mut rng());
        assert!(matches!(result, Err(DailyError::EmptyCatalog)));
    }

    #[test]
    fn test_single_record_always_selected() {
        let snapshot = CatalogSnapshot::new(vec![SongRecord::new("Only", "One").picked_on(day(2024, 5, 1))]);
        let engine = SelectionEngine::new(day(2024, 6, 1));

        for seed in 0..20 {
            let result = engine.select(&snapshot, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert_eq!(result.selected.song, "Only");
            assert!(!result.already_picked_today);
        }
    }

    #[test]
    fn test_documented_example() {
        let snapshot = CatalogSnapshot::new(vec![
            SongRecord::new("A", "X"),
            SongRecord::new("B", "X").picked_on(day(2024, 1, 1)),
            SongRecord::new("C", "X").picked_on(day(2024, 1, 1)),
        ]);

        let eligible: Vec<&str> = eligible_set(&snapshot).iter().map(|r| r.song.as_str()).collect();
        assert_eq!(eligible, vec!["A"]);

        let result = SelectionEngine::new(day(2024, 6, 1)).select(&snapshot, &mut rng()).unwrap();
        assert_eq!(result.selected.song, "A");
        assert!(!result.already_picked_today);
    }

    #[test]
    fn test_idempotent_hit_is_stable() {
        let today = day(2024, 6, 1);
        let snapshot = CatalogSnapshot::new(vec![
            SongRecord::new("Old", "X"),
            SongRecord::new("Today", "Y").picked_on(today),
            SongRecord::new("Older", "Z").picked_on(day(2023, 1, 1)),
        ]);
        let engine = SelectionEngine::new(today);

        let first = engine.select(&snapshot, &mut StdRng::seed_from_u64(1)).unwrap();
        let second = engine.select(&snapshot, &mut StdRng::seed_from_u64(2)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.selected.song, "Today");
        assert!(first.already_picked_today);
    }

    #[test]
    fn test_never_picked_beats_real_date() {
        let snapshot = CatalogSnapshot::new(vec![
            SongRecord::new("Dated", "X").picked_on(day(1901, 1, 1)),
            SongRecord::new("Fresh", "Y"),
        ]);
        let engine = SelectionEngine::new(day(2024, 6, 1));

        for seed in 0..50 {
            let result = engine.select(&snapshot, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert_eq!(result.selected.song, "Fresh");
        }
    }

    #[test]
    fn test_malformed_date_treated_as_never_picked() {
        let snapshot = CatalogSnapshot::new(vec![
            SongRecord::new("Corrupt", "X").with_raw_date("32/13/2024"),
            SongRecord::new("Dated", "Y").picked_on(day(2024, 1, 1)),
        ]);
        let result = SelectionEngine::new(day(2024, 6, 1)).select(&snapshot, &mut rng()).unwrap();
        assert_eq!(result.selected.song, "Corrupt");

        // Malformed and absent tie with each other.
        let tied = CatalogSnapshot::new(vec![
            SongRecord::new("Corrupt", "X").with_raw_date("garbage"),
            SongRecord::new("Never", "Y"),
        ]);
        assert_eq!(eligible_set(&tied).len(), 2);
    }

    #[test]
    fn test_all_tied_makes_everything_eligible() {
        let same = day(2024, 2, 2);
        let snapshot = CatalogSnapshot::new(
            (0..5).map(|i| SongRecord::new(format!("S{i}"), "X").picked_on(same)).collect(),
        );
        assert_eq!(eligible_set(&snapshot).len(), 5);

        let absent = CatalogSnapshot::new((0..4).map(|i| SongRecord::new(format!("S{i}"), "X")).collect());
        assert_eq!(eligible_set(&absent).len(), 4);
    }

    #[test]
    fn test_tie_break_is_roughly_uniform() {
        let snapshot = CatalogSnapshot::new((0..4).map(|i| SongRecord::new(format!("S{i}"), "X")).collect());
        let engine = SelectionEngine::new(day(2024, 6, 1));
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 4000;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..trials {
            let result = engine.select(&snapshot, &mut rng).unwrap();
            *counts.entry(result.selected.song).or_default() += 1;
        }

        assert_eq!(counts.len(), 4, "every tied song must be reachable");
        for (song, count) in &counts {
            // Expected 1000 each; allow a generous band.
            assert!((800..=1200).contains(count), "{song} picked {count} times");
        }
    }

    #[test]
    fn test_same_seed_same_pick() {
        let snapshot = CatalogSnapshot::new((0..10).map(|i| SongRecord::new(format!("S{i}"), "X")).collect());
        let engine = SelectionEngine::new(day(2024, 6, 1));

        let a = engine.select(&snapshot, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = engine.select(&snapshot, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_full_rotation_before_repeat() {
        let n = 12;
        let mut records: Vec<SongRecord> = (0..n).map(|i| SongRecord::new(format!("S{i}"), "X")).collect();
        let engine_start = day(2024, 1, 1);
        let mut rng = rng();
        let mut seen = HashSet::new();

        for offset in 0..n {
            let today = engine_start + chrono::Days::new(offset as u64);
            let snapshot = CatalogSnapshot::new(records.clone());
            let result = SelectionEngine::new(today).select(&snapshot, &mut rng).unwrap();
            assert!(!result.already_picked_today);
            assert!(seen.insert(result.selected.key()), "{} repeated early", result.selected);

            let picked = records.iter_mut().find(|r| r.key() == result.selected.key()).unwrap();
            *picked = picked.clone().picked_on(today);
        }

        assert_eq!(seen.len(), n);
    }

    #[test]
    fn test_future_dates_are_not_overdue() {
        let snapshot = CatalogSnapshot::new(vec![
            SongRecord::new("Future", "X").picked_on(day(2030, 1, 1)),
            SongRecord::new("Past", "Y").picked_on(day(2020, 1, 1)),
        ]);
        let result = SelectionEngine::new(day(2024, 6, 1)).select(&snapshot, &mut rng()).unwrap();
        assert_eq!(result.selected.song, "Past");
    }

    fn log(picks: &[((i32, u32, u32), &str)]) -> Vec<DailyPick> {
        picks
            .iter()
            .map(|&((y, m, d), song)| DailyPick {
                date: day(y, m, d),
                key: SongKey::new(song, "X"),
            })
            .collect()
    }

    #[test]
    fn test_rotation_stats_mid_cycle() {
        let today = day(2024, 6, 3);
        let snapshot = CatalogSnapshot::new(vec![
            SongRecord::new("A", "X").picked_on(day(2024, 6, 1)),
            SongRecord::new("B", "X").picked_on(day(2024, 6, 2)),
            SongRecord::new("C", "X"),
            SongRecord::new("D", "X").with_raw_date("bogus"),
        ]);
        let history = log(&[((2024, 6, 1), "A"), ((2024, 6, 2), "B")]);

        let stats = analyze_rotation(&snapshot, Some(&history), today);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.never_picked, 2);
        assert_eq!(stats.eligible_now, 2);
        assert_eq!(stats.picked_in_cycle, Some(2));
        assert_eq!(stats.remaining_in_cycle, Some(2));
        assert_eq!(stats.oldest_pick, None);
        assert_eq!(stats.newest_pick, Some(day(2024, 6, 2)));
        assert_eq!(stats.todays_pick, None);
    }

    #[test]
    fn test_rotation_stats_with_todays_pick() {
        let today = day(2024, 6, 3);
        let snapshot = CatalogSnapshot::new(vec![
            SongRecord::new("A", "X").picked_on(day(2024, 6, 1)),
            SongRecord::new("B", "X").picked_on(day(2024, 6, 1)),
            SongRecord::new("C", "X").picked_on(today),
        ]);

        let stats = analyze_rotation(&snapshot, None, today);
        assert_eq!(stats.never_picked, 0);
        assert_eq!(stats.eligible_now, 2);
        assert_eq!(stats.oldest_pick, Some(day(2024, 6, 1)));
        assert_eq!(stats.todays_pick.as_deref(), Some("C - X"));
    }

    #[test]
    fn test_second_cycle_counts_only_new_picks() {
        let snapshot = CatalogSnapshot::new(vec![
            SongRecord::new("A", "X").picked_on(day(2024, 6, 4)),
            SongRecord::new("B", "X").picked_on(day(2024, 6, 2)),
            SongRecord::new("C", "X").picked_on(day(2024, 6, 3)),
        ]);
        let history = log(&[
            ((2024, 6, 1), "A"),
            ((2024, 6, 2), "B"),
            ((2024, 6, 3), "C"),
            ((2024, 6, 4), "A"),
        ]);

        let stats = analyze_rotation(&snapshot, Some(&history), day(2024, 6, 5));
        assert_eq!(stats.picked_in_cycle, Some(1));
        assert_eq!(stats.remaining_in_cycle, Some(2));
        assert_eq!(stats.eligible_now, 1);
    }

    #[test]
    fn test_completed_cycle_stays_complete_until_next_pick() {
        let snapshot = CatalogSnapshot::new(vec![
            SongRecord::new("A", "X").picked_on(day(2024, 6, 1)),
            SongRecord::new("B", "X").picked_on(day(2024, 6, 2)),
        ]);
        // Out of order on purpose.
        let history = log(&[((2024, 6, 2), "B"), ((2024, 6, 1), "A")]);

        let progress = cycle_progress(&snapshot, &history);
        assert_eq!(progress, CycleProgress { picked: 2, remaining: 0 });
    }

    #[test]
    fn test_cycle_ignores_removed_songs_and_waits_for_new_ones() {
        let snapshot = CatalogSnapshot::new(vec![
            SongRecord::new("A", "X").picked_on(day(2024, 6, 1)),
            SongRecord::new("B", "X").picked_on(day(2024, 6, 3)),
            SongRecord::new("New", "X"),
        ]);
        let history = log(&[
            ((2024, 6, 1), "A"),
            ((2024, 6, 2), "Gone"),
            ((2024, 6, 3), "B"),
        ]);

        let progress = cycle_progress(&snapshot, &history);
        assert_eq!(progress, CycleProgress { picked: 2, remaining: 1 });
    }

    #[test]
    fn test_cycle_progress_over_a_full_rotation() {
        let n = 6;
        let mut records: Vec<SongRecord> = (0..n).map(|i| SongRecord::new(format!("S{i}"), "X")).collect();
        let mut history = Vec::new();
        let mut rng = rng();

        for offset in 0..(n + 2) {
            let today = day(2024, 1, 1) + chrono::Days::new(offset as u64);
            let result = SelectionEngine::new(today)
                .select(&CatalogSnapshot::new(records.clone()), &mut rng)
                .unwrap();
            let picked = records.iter_mut().find(|r| r.key() == result.selected.key()).unwrap();
            *picked = picked.clone().picked_on(today);
            history.push(DailyPick { date: today, key: result.selected.key() });

            let progress = cycle_progress(&CatalogSnapshot::new(records.clone()), &history);
            let expected = offset % n + 1;
            assert_eq!(progress.picked, expected, "day {offset}");
            assert_eq!(progress.remaining, n - expected);
        }
    }
}
