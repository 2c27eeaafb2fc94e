//! # Command-Line Interface Module
//!
//! Clap derive definitions. Every store setting can also come from the
//! environment, which is how a scheduler usually runs the tool.
//!
//! ## Commands
//!
//! - `pick`: select (and record) today's song; the default
//! - `list`: show the catalog, most overdue first
//! - `status`: rotation progress
//! - `import`: add songs from a JSON file or a Spotify playlist
//! - `completion`: shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! SUPABASE_URL=https://x.supabase.co SUPABASE_ANON_KEY=... dailysong
//! dailysong --store sqlite list
//! dailysong --store sqlite import --file songs.json
//! ```

use crate::song::parse_date;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Which catalog backend to talk to.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum StoreKind {
    /// PostgREST endpoint (Supabase)
    #[default]
    Rest,
    /// Local SQLite file
    Sqlite,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("'{raw}' is not a YYYY-MM-DD date"))
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "dailysong")]
#[command(about = "Dailysong: one song a day, every song before any repeat")]
#[command(version)]
pub struct Args {
    /// Catalog backend
    #[arg(long, value_enum, env = "DAILYSONG_STORE", default_value_t = StoreKind::Rest, global = true)]
    pub store: StoreKind,

    /// Base URL of the REST catalog
    #[arg(long, env = "SUPABASE_URL", hide_env_values = true, global = true)]
    pub supabase_url: Option<String>,

    /// API key for the REST catalog
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true, global = true)]
    pub supabase_key: Option<String>,

    /// Table holding the songs
    #[arg(long, env = "DAILYSONG_TABLE", default_value = crate::store::rest::DEFAULT_TABLE, global = true)]
    pub table: String,

    /// SQLite catalog file (defaults to the platform data directory)
    #[arg(long, env = "DAILYSONG_DB", global = true)]
    pub db_path: Option<PathBuf>,

    /// Day to pick for, YYYY-MM-DD (defaults to today, local time)
    #[arg(long, value_parser = parse_date_arg, global = true)]
    pub date: Option<NaiveDate>,

    /// Seed for the tie-break between equally overdue songs
    #[arg(long, env = "DAILYSONG_SEED", global = true)]
    pub seed: Option<u64>,

    /// The subcommand to execute; `pick` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pick today's song and print it as "song - artist"
    ///
    /// Running it again on the same day prints the same song and writes
    /// nothing.
    Pick {
        /// Select without recording the pick
        #[arg(long)]
        dry_run: bool,
    },

    /// List all songs, most overdue first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show how far the current rotation cycle has progressed
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Add songs to the catalog; existing rows are kept
    #[command(group = clap::ArgGroup::new("source").required(true).args(["file", "playlist"]))]
    Import {
        /// JSON file with an array of {"song", "artist"} objects
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Spotify playlist ID to import
        #[arg(long)]
        playlist: Option<String>,

        /// Spotify access token used with --playlist
        #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
        spotify_token: Option<String>,
    },

    /// Generate shell completions
    ///
    /// Usage: dailysong completion bash > ~/.local/share/bash-completion/completions/dailysong
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

impl Default for Command {
    fn default() -> Self {
        Self::Pick { dry_run: false }
    }
}
