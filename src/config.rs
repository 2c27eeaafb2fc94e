//! # Configuration Module
//!
//! Turns command-line/environment settings into an opened catalog store.
//!
//! ## Data Storage
//!
//! The SQLite backend defaults to the platform-standard data directory:
//! - Linux: `~/.local/share/dailysong/catalog.db`
//! - macOS: `~/Library/Application Support/dailysong/catalog.db`
//! - Windows: `%APPDATA%\dailysong\catalog.db`
//!
//! The REST backend needs `SUPABASE_URL` and `SUPABASE_ANON_KEY`. Both are
//! checked before any network call is made.

use crate::cli::{Args, StoreKind};
use crate::error::DailyError;
use crate::store::rest::RestStore;
use crate::store::sqlite::SqliteStore;
use crate::store::CatalogStore;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::PathBuf;

/// Returns the platform-appropriate data directory for dailysong, creating it
/// if needed.
///
/// # Errors
///
/// Fails if the system data directory cannot be determined or created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Pass --db-path or set DAILYSONG_DB."
        )
    })?;

    let app_dir = data_dir.join("dailysong");
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Default location of the SQLite catalog.
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("catalog.db"))
}

/// Validated store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    Rest {
        url: String,
        api_key: String,
        table: String,
    },
    Sqlite {
        path: PathBuf,
    },
}

/// Trimmed value, or a configuration error naming the variable.
fn require(value: Option<&str>, name: &str) -> Result<String, DailyError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(DailyError::Configuration(format!(
            "Missing required environment variable: {name}"
        ))),
    }
}

/// Accept only absolute http(s) URLs with a host.
fn validate_url(url: &str) -> Result<(), DailyError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            DailyError::Configuration(format!(
                "SUPABASE_URL must be a full http(s) URL, e.g. 'https://project.supabase.co', got '{url}'"
            ))
        })?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(DailyError::Configuration(format!(
            "SUPABASE_URL has no host: '{url}'"
        )));
    }
    Ok(())
}

impl StoreSettings {
    /// Validate the store-related arguments.
    ///
    /// # Errors
    ///
    /// [`DailyError::Configuration`] for missing credentials or a bad URL.
    pub fn from_args(args: &Args) -> Result<Self, DailyError> {
        match args.store {
            StoreKind::Rest => {
                let url = require(args.supabase_url.as_deref(), "SUPABASE_URL")?;
                let api_key = require(args.supabase_key.as_deref(), "SUPABASE_ANON_KEY")?;
                let table = require(Some(args.table.as_str()), "DAILYSONG_TABLE")?;
                validate_url(&url)?;
                Ok(Self::Rest { url, api_key, table })
            }
            StoreKind::Sqlite => {
                let path = match &args.db_path {
                    Some(path) => path.clone(),
                    None => get_db_path().map_err(|e| DailyError::Configuration(format!("{e:#}")))?,
                };
                Ok(Self::Sqlite { path })
            }
        }
    }

    /// Open the configured backend.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built or the database cannot be
    /// opened.
    pub fn open(&self) -> Result<Box<dyn CatalogStore>> {
        match self {
            Self::Rest { url, api_key, table } => {
                debug!("Using REST catalog at {url} (table {table})");
                let store = RestStore::new(url, api_key, table).context("Failed to set up HTTP client")?;
                Ok(Box::new(store))
            }
            Self::Sqlite { path } => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                let store = SqliteStore::open(path)
                    .with_context(|| format!("Failed to open catalog database {}", path.display()))?;
                Ok(Box::new(store))
            }
        }
    }
}
