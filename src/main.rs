//! # Dailysong
//!
//! Picks one song per day from a catalog and records the pick, so that every
//! song comes up once before any song repeats.
//!
//! ## Usage
//!
//! ```bash
//! # Today's song (prints "song - artist")
//! dailysong
//!
//! # Against a local SQLite catalog
//! dailysong --store sqlite import --file songs.json
//! dailysong --store sqlite pick
//! dailysong --store sqlite status
//! ```
//!
//! Exit status is 0 on success and 1 on any failure. When the pick was made
//! but could not be recorded, the song is still printed before the error.

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser};
use dailysong::algorithm::statistics::analyze_rotation;
use dailysong::cli::{self, Command};
use dailysong::config::StoreSettings;
use dailysong::song::SongRecord;
use dailysong::store::{read_snapshot, CatalogStore};
use dailysong::{completion, daily, ingest};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Validate settings and open the configured store. Nothing touches the
/// network before this succeeds.
fn open_store(args: &cli::Args) -> Result<Box<dyn CatalogStore>> {
    let settings = StoreSettings::from_args(args)?;
    debug!("Store settings: {:?}", redact(&settings));
    settings.open()
}

fn redact(settings: &StoreSettings) -> StoreSettings {
    match settings {
        StoreSettings::Rest { url, table, .. } => StoreSettings::Rest {
            url: url.clone(),
            api_key: "<redacted>".to_string(),
            table: table.clone(),
        },
        other => other.clone(),
    }
}

fn pick(store: &dyn CatalogStore, today: NaiveDate, seed: Option<u64>, dry_run: bool) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match daily::run_daily(store, today, &mut rng, dry_run) {
        Ok(outcome) => {
            println!("{}", outcome.selection.selected);
            Ok(())
        }
        Err(err) => {
            // The pick itself is valid; show it before reporting the failed write.
            if let Some(selection) = err.uncommitted_selection() {
                println!("{selection}");
            }
            Err(err.into())
        }
    }
}

fn date_column(record: &SongRecord) -> String {
    match (&record.last_picked_date, record.last_picked()) {
        (_, Some(date)) => date.to_string(),
        (Some(_), None) => "invalid".to_string(),
        (None, None) => "never".to_string(),
    }
}

fn list(store: &dyn CatalogStore, json: bool) -> Result<()> {
    let snapshot = read_snapshot(store)?;
    let records = snapshot.by_overdue();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No songs in the catalog.");
        return Ok(());
    }
    for record in records {
        println!("{:<10}  {record}", date_column(record));
    }
    Ok(())
}

fn status(store: &dyn CatalogStore, today: NaiveDate, json: bool) -> Result<()> {
    let snapshot = read_snapshot(store)?;
    let history = store.pick_history().context("failed to read the pick log")?;
    let stats = analyze_rotation(&snapshot, history.as_deref(), today);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let show = |date: Option<NaiveDate>, none: &str| date.map_or_else(|| none.to_string(), |d| d.to_string());
    let count = |n: Option<usize>| n.map_or_else(|| "unknown (no pick log)".to_string(), |n| n.to_string());
    println!("Songs in catalog:      {}", stats.total);
    println!("Never picked:          {}", stats.never_picked);
    println!("Due next (tied):       {}", stats.eligible_now);
    println!("Picked this cycle:     {}", count(stats.picked_in_cycle));
    println!("Remaining this cycle:  {}", count(stats.remaining_in_cycle));
    println!("Oldest pick:           {}", show(stats.oldest_pick, "never"));
    println!("Newest pick:           {}", show(stats.newest_pick, "none"));
    println!(
        "Pick for {today}:      {}",
        stats.todays_pick.as_deref().unwrap_or("not picked yet")
    );
    Ok(())
}

/// Main entry point.
///
/// Logging goes through `env_logger` (stderr, `RUST_LOG`); stdout carries
/// only command output. Any error returned here ends the process with exit
/// status 1 and the error chain on stderr.
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let today = args.date.unwrap_or_else(|| Local::now().date_naive());
    debug!("Running for {today}");

    match args.command.clone().unwrap_or_default() {
        Command::Pick { dry_run } => {
            let store = open_store(&args)?;
            pick(store.as_ref(), today, args.seed, dry_run)?;
        }
        Command::List { json } => {
            let store = open_store(&args)?;
            list(store.as_ref(), json)?;
        }
        Command::Status { json } => {
            let store = open_store(&args)?;
            status(store.as_ref(), today, json)?;
        }
        Command::Import { file, playlist, spotify_token } => {
            let store = open_store(&args)?;
            let songs = match (file, playlist) {
                (Some(path), _) => ingest::songs_from_file(&path)?,
                (None, Some(playlist)) => {
                    let token = spotify_token
                        .ok_or_else(|| anyhow!("Missing required environment variable: SPOTIFY_ACCESS_TOKEN"))?;
                    ingest::SpotifyClient::new(&token)?.playlist_songs(&playlist)?
                }
                (None, None) => return Err(anyhow!("Nothing to import: pass --file or --playlist")),
            };

            if songs.is_empty() {
                println!("No songs found to import.");
                return Ok(());
            }
            let inserted = ingest::import_songs(store.as_ref(), &songs)?;
            info!("Import finished");
            println!("Inserted {inserted} new row(s). Existing rows were kept.");
        }
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(shell),
                &mut cmd,
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
