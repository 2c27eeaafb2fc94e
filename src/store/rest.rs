//! PostgREST catalog client.
//!
//! Talks to `{base}/rest/v1/{table}` with the anon key sent both as `apikey`
//! and as a bearer token. All calls are blocking; a run makes at most two.
//!
//! The catalog is read in one request. PostgREST caps responses at its
//! `max-rows` setting (1000 on Supabase by default), so a larger catalog comes
//! back truncated and every read fails with [`StoreError::Truncated`] until
//! `max-rows` is raised on the server.

use super::CatalogStore;
use crate::error::StoreError;
use crate::song::{format_date, SongKey, SongRecord};
use chrono::NaiveDate;
use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_RANGE;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_TABLE: &str = "spotify_playlist_songs";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("dailysong/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct PickUpsert<'a> {
    song: &'a str,
    artist: &'a str,
    last_picked_date: String,
}

/// Blocking PostgREST client for the song table.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RestStore {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: table_endpoint(base_url, table),
            api_key: api_key.to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// `{base}/rest/v1/{table}`, tolerating a trailing slash on `base`.
#[must_use]
pub fn table_endpoint(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim().trim_end_matches('/'), table)
}

/// Total row count from a PostgREST `Content-Range` header such as
/// `0-24/3573`. `None` when the total is unknown (`*`) or the header is
/// malformed.
#[must_use]
pub fn content_range_total(header: &str) -> Option<usize> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(StoreError::Api(status.as_u16(), body))
}

impl CatalogStore for RestStore {
    fn fetch_all(&self) -> Result<Vec<SongRecord>, StoreError> {
        debug!("GET {}", self.endpoint);
        let response = self
            .authorized(self.client.get(&self.endpoint))
            .query(&[("select", "song,artist,last_picked_date")])
            .header("Prefer", "count=exact")
            .send()?;
        let response = check_status(response)?;

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(content_range_total);

        let rows: Vec<SongRecord> = response.json().map_err(|e| StoreError::Parse(e.to_string()))?;

        match total {
            Some(total) if total > rows.len() => Err(StoreError::Truncated {
                returned: rows.len(),
                total,
            }),
            _ => Ok(rows),
        }
    }

    fn upsert_pick(&self, key: &SongKey, date: NaiveDate) -> Result<(), StoreError> {
        let payload = PickUpsert {
            song: &key.song,
            artist: &key.artist,
            last_picked_date: format_date(date),
        };

        debug!("POST {} upsert `{key}' -> {}", self.endpoint, payload.last_picked_date);
        let response = self
            .authorized(self.client.post(&self.endpoint))
            .query(&[("on_conflict", "song,artist")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&payload)
            .send()?;
        check_status(response)?;
        Ok(())
    }

    fn insert_new(&self, songs: &[SongKey]) -> Result<usize, StoreError> {
        if songs.is_empty() {
            return Ok(0);
        }

        debug!("POST {} insert {} rows", self.endpoint, songs.len());
        let response = self
            .authorized(self.client.post(&self.endpoint))
            .query(&[("on_conflict", "song,artist")])
            .header("Prefer", "return=representation,resolution=ignore-duplicates")
            .json(songs)
            .send()?;
        let inserted: Vec<serde_json::Value> = check_status(response)?
            .json()
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(inserted.len())
    }
}
