use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::AppError;
use crate::song_library::LYRICS_EXT;

pub const SOURCE_LRCLIB: &str = "lrclib";
pub const SOURCE_LYRICS_OVH: &str = "lyrics.ovh";

const LRCLIB_ENDPOINT: &str = "https://lrclib.net/api/";
const LYRICS_OVH_ENDPOINT: &str = "https://api.lyrics.ovh/";

const HTTP_TIMEOUT: Duration = Duration::from_secs(7);

/// Characters that must not end up in a lyric file name.
static FILE_NAME_CLEANUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[%.\\/:]").expect("file name pattern is valid"));

/// One search hit a provider offered: what to show, and where to fetch the
/// lyrics blob from later.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LyricsCandidate {
    pub title: String,
    pub source: String,
    pub url: String,
}

/// Queries every configured provider and fetches chosen lyrics.
///
/// Providers are queried in registration order and the merged candidate
/// list keeps the first-registered provider's hits first; a provider that
/// fails contributes nothing and does not fail the search.
pub struct LyricsClient {
    client: reqwest::Client,
}

impl LyricsClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("karaoke-master/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("http client construction cannot fail");
        Self { client }
    }

    pub async fn search(&self, query: &str) -> Vec<LyricsCandidate> {
        let mut merged = Vec::new();
        match self.search_lrclib(query).await {
            Ok(mut hits) => merged.append(&mut hits),
            Err(e) => eprintln!("lrclib search failed: {e}"),
        }
        match self.search_lyrics_ovh(query).await {
            Ok(mut hits) => merged.append(&mut hits),
            Err(e) => eprintln!("lyrics.ovh search failed: {e}"),
        }
        merged
    }

    async fn search_lrclib(&self, query: &str) -> Result<Vec<LyricsCandidate>> {
        let mut url = Url::parse("https://lrclib.net/api/search").expect("valid search endpoint");
        url.query_pairs_mut().append_pair("q", query);

        let value = self.get_json(url).await.context("lrclib search")?;
        Ok(candidates_from_lrclib(&value))
    }

    async fn search_lyrics_ovh(&self, query: &str) -> Result<Vec<LyricsCandidate>> {
        let url = format!(
            "{}suggest/{}",
            LYRICS_OVH_ENDPOINT,
            urlencoding::encode(query)
        );
        let url = Url::parse(&url).context("lyrics.ovh suggest url")?;

        let value = self.get_json(url).await.context("lyrics.ovh suggest")?;
        Ok(candidates_from_lyrics_ovh(&value))
    }

    /// Fetches the lyrics text for a candidate, dispatching on the
    /// provider endpoint its URL points at.
    pub async fn fetch_lyrics(&self, candidate_url: &str) -> Result<String> {
        let url = Url::parse(candidate_url).context("candidate url")?;
        let value = self.get_json(url).await.context("lyrics fetch")?;

        let text = if candidate_url.starts_with(LRCLIB_ENDPOINT) {
            value.get("plainLyrics").and_then(Value::as_str)
        } else if candidate_url.starts_with(LYRICS_OVH_ENDPOINT) {
            value.get("lyrics").and_then(Value::as_str)
        } else {
            return Err(anyhow!("unknown lyrics provider: {candidate_url}"));
        };

        text.map(str::to_string)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("provider returned no lyrics text"))
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("request failed with status {status}"));
        }
        let body = resp.text().await.context("response body read failed")?;
        serde_json::from_str(&body).context("response json parsing failed")
    }
}

impl Default for LyricsClient {
    fn default() -> Self {
        Self::new()
    }
}

fn candidates_from_lrclib(value: &Value) -> Vec<LyricsCandidate> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id").and_then(Value::as_i64)?;
            let track = item.get("trackName").and_then(Value::as_str)?;
            let artist = item.get("artistName").and_then(Value::as_str).unwrap_or("");
            let title = if artist.is_empty() {
                track.to_string()
            } else {
                format!("{track} - {artist}")
            };
            Some(LyricsCandidate {
                title,
                source: SOURCE_LRCLIB.to_string(),
                url: format!("{LRCLIB_ENDPOINT}get/{id}"),
            })
        })
        .collect()
}

fn candidates_from_lyrics_ovh(value: &Value) -> Vec<LyricsCandidate> {
    let Some(items) = value.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let track = item.get("title").and_then(Value::as_str)?;
            let artist = item
                .get("artist")
                .and_then(|a| a.get("name"))
                .and_then(Value::as_str)?;

            let mut url = Url::parse(LYRICS_OVH_ENDPOINT).expect("valid provider endpoint");
            url.path_segments_mut()
                .ok()?
                .push("v1")
                .push(artist)
                .push(track);

            Some(LyricsCandidate {
                title: format!("{track} - {artist}"),
                source: SOURCE_LYRICS_OVH.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Turns a chosen candidate title into a safe lyric file base name:
/// non-breaking spaces become plain spaces and path/extension-hostile
/// characters become spaces.
pub fn sanitize_file_name(name: &str) -> String {
    let name = name.replace('\u{00A0}', " ");
    FILE_NAME_CLEANUP.replace_all(&name, " ").into_owned()
}

/// Writes a fetched lyrics blob into the library under its sanitized name.
pub fn save_lyrics(lyrics_dir: &Path, name: &str, text: &str) -> Result<PathBuf, AppError> {
    let path = lyrics_dir.join(format!("{}.{LYRICS_EXT}", sanitize_file_name(name)));
    fs::write(&path, text).map_err(|e| AppError::file_access(&path, e))?;
    Ok(path)
}
