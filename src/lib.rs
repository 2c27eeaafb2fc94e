//! One song a day from a fixed catalog, every song before any repeat.
//!
//! Core modules:
//! - [`algorithm`] - Daily selection (most overdue first, random among ties)
//! - [`store`] - Catalog backends, snapshot reads and the rotation committer
//! - [`daily`] - The read, select, commit pipeline
//!
//! ### Supporting Modules
//!
//! - [`song`] - Catalog rows and date handling
//! - [`error`] - Error taxonomy
//! - [`config`] - Store settings and data directory management
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`ingest`] - Adding songs from files or Spotify playlists
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use chrono::NaiveDate;
//! use dailysong::daily::run_daily;
//! use dailysong::song::SongRecord;
//! use dailysong::store::memory::MemoryStore;
//! use rand::SeedableRng;
//!
//! let store = MemoryStore::new(vec![
//!     SongRecord::new("Blue in Green", "Miles Davis"),
//!     SongRecord::new("So What", "Miles Davis"),
//! ]);
//! let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//!
//! let outcome = run_daily(&store, today, &mut rng, false)?;
//! println!("{}", outcome.selection.selected);
//!
//! // Same day, same answer, no second write.
//! let again = run_daily(&store, today, &mut rng, false)?;
//! assert!(again.selection.already_picked_today);
//! assert_eq!(store.write_count(), 1);
//! # Ok::<(), dailysong::error::DailyError>(())
//! ```
//!
//! ## Selection Rules
//!
//! - A song whose `last_picked_date` is today is returned as-is, nothing is written
//! - Otherwise the songs with the oldest pick date are eligible
//! - Missing or unreadable dates count as 1900-01-01, so new songs go first
//! - One eligible song is chosen uniformly at random
//!
//! ## Logging
//!
//! Uses the `log` facade; the binary installs `env_logger`, so
//! `RUST_LOG=dailysong=debug dailysong` shows store traffic and selection
//! details on stderr.

pub mod algorithm;
pub mod cli;
pub mod completion;
pub mod config;
pub mod daily;
pub mod error;
pub mod ingest;
pub mod song;
pub mod store;

#[cfg(test)]
mod test_support;
