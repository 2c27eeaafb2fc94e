//! # Catalog Ingestion
//!
//! Sources of new catalog rows: a local JSON file, or a Spotify playlist read
//! with an access token obtained elsewhere. Either way the result is a list of
//! [`SongKey`]s handed to [`CatalogStore::insert_new`], so songs already in the
//! catalog keep their pick history.

use crate::song::SongKey;
use crate::store::CatalogStore;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const SPOTIFY_API: &str = "https://api.spotify.com/v1";

/// One page of `GET /playlists/{id}/items`.
#[derive(Debug, Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistEntry>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistEntry {
    /// Newer responses call it `item`, older ones `track`.
    #[serde(default, alias = "track")]
    item: Option<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    #[serde(default)]
    name: String,
}

impl Track {
    /// `None` for unnamed tracks (local files, removed songs).
    fn to_key(&self) -> Option<SongKey> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        let artists = self
            .artists
            .iter()
            .map(|a| a.name.trim())
            .collect::<Vec<_>>()
            .join(", ");
        Some(SongKey::new(name, artists))
    }
}

fn songs_from_page(page: &PlaylistPage) -> impl Iterator<Item = SongKey> + '_ {
    page.items
        .iter()
        .filter_map(|entry| entry.item.as_ref())
        .filter_map(Track::to_key)
}

/// Reads playlists from the Spotify Web API.
pub struct SpotifyClient {
    client: Client,
    token: String,
    api_base: String,
}

impl SpotifyClient {
    /// # Errors
    ///
    /// Fails on an empty token or if the HTTP client cannot be built.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_api_base(token, SPOTIFY_API)
    }

    /// Same as [`SpotifyClient::new`] against a different API root.
    ///
    /// # Errors
    ///
    /// See [`SpotifyClient::new`].
    pub fn with_api_base(token: &str, api_base: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            bail!("Missing required environment variable: SPOTIFY_ACCESS_TOKEN");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to set up HTTP client")?;
        Ok(Self {
            client,
            token: token.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// All named tracks of a playlist, following pagination.
    ///
    /// # Errors
    ///
    /// Fails on any HTTP error or unexpected response shape.
    pub fn playlist_songs(&self, playlist_id: &str) -> Result<Vec<SongKey>> {
        let mut url = Some(format!("{}/playlists/{}/items", self.api_base, playlist_id.trim()));
        let mut songs = Vec::new();

        while let Some(page_url) = url.take() {
            debug!("GET {page_url}");
            let page: PlaylistPage = self
                .client
                .get(&page_url)
                .bearer_auth(&self.token)
                .send()
                .with_context(|| format!("Request to {page_url} failed"))?
                .error_for_status()
                .context("Spotify rejected the playlist request")?
                .json()
                .context("Unexpected playlist response from Spotify")?;

            songs.extend(songs_from_page(&page));
            url = page.next;
        }

        info!("Read {} songs from playlist {playlist_id}", songs.len());
        Ok(songs)
    }
}

/// Read `[{"song": ..., "artist": ...}, ...]` from a file.
///
/// Rows with a blank song name are dropped.
///
/// # Errors
///
/// Fails if the file cannot be read or is not such an array.
pub fn songs_from_file(path: &Path) -> Result<Vec<SongKey>> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let rows: Vec<SongKey> =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON array of songs", path.display()))?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let song = row.song.trim();
            (!song.is_empty()).then(|| SongKey::new(song, row.artist.trim()))
        })
        .collect())
}

/// Insert `songs`, keeping existing rows. Returns the number inserted.
///
/// # Errors
///
/// Fails if the store insert fails.
pub fn import_songs<S: CatalogStore + ?Sized>(store: &S, songs: &[SongKey]) -> Result<usize> {
    if songs.is_empty() {
        info!("No songs found to import");
        return Ok(0);
    }
    let inserted = store
        .insert_new(songs)
        .context("Failed to insert songs into the catalog")?;
    info!("Inserted {inserted} of {} songs", songs.len());
    Ok(inserted)
}
