//! YouTube Data API playlist adapter.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fairway_core::{PlaylistKind, VideoDraft};
use fairway_storage::HttpFetcher;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{AdapterError, PlaylistSource};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

const PAGE_SIZE: &str = "50";
const MAX_PAGES: usize = 200;
const UNAVAILABLE_TITLES: [&str; 2] = ["Private video", "Deleted video"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<DateTime<Utc>>,
    resource_id: Option<ResourceId>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    #[serde(rename = "default")]
    fallback: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistPage {
    pub videos: Vec<VideoDraft>,
    pub next_page_token: Option<String>,
}

impl PlaylistItemsResponse {
    fn into_page(self, kind: PlaylistKind) -> PlaylistPage {
        let videos = self
            .items
            .into_iter()
            .filter_map(|item| item.snippet)
            .filter_map(|snippet| {
                let youtube_id = snippet.resource_id?.video_id?;
                let title = snippet.title?.trim().to_string();
                if title.is_empty() || UNAVAILABLE_TITLES.contains(&title.as_str()) {
                    debug!(%youtube_id, "skipping unavailable playlist entry");
                    return None;
                }
                let thumbnails = snippet.thumbnails;
                let thumbnail_url = thumbnails
                    .high
                    .or(thumbnails.medium)
                    .or(thumbnails.fallback)
                    .map(|t| t.url);
                Some(VideoDraft {
                    youtube_id,
                    title,
                    description: snippet.description.filter(|d| !d.trim().is_empty()),
                    thumbnail_url,
                    published_at: snippet.published_at,
                    playlist_kind: kind,
                })
            })
            .collect();
        PlaylistPage {
            videos,
            next_page_token: self.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

/// Parses one `playlistItems` response body.
pub fn parse_playlist_page(body: &str, kind: PlaylistKind) -> Result<PlaylistPage, AdapterError> {
    let response: PlaylistItemsResponse = serde_json::from_str(body)?;
    Ok(response.into_page(kind))
}

pub struct YoutubeClient {
    http: Arc<HttpFetcher>,
    api_key: String,
    base_url: String,
}

impl YoutubeClient {
    pub fn new(http: Arc<HttpFetcher>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_page(
        &self,
        playlist_id: &str,
        kind: PlaylistKind,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage, AdapterError> {
        let url = format!("{}/playlistItems", self.base_url);
        let mut query = vec![
            ("part", "snippet".to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
            ("playlistId", playlist_id.to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        let response: PlaylistItemsResponse = self.http.get_json(&url, &query).await?;
        Ok(response.into_page(kind))
    }
}

#[async_trait]
impl PlaylistSource for YoutubeClient {
    async fn fetch_playlist(
        &self,
        playlist_id: &str,
        kind: PlaylistKind,
    ) -> Result<Vec<VideoDraft>, AdapterError> {
        let mut videos = Vec::new();
        let mut seen = HashSet::new();
        let mut token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = self.fetch_page(playlist_id, kind, token.as_deref()).await?;
            for video in page.videos {
                if seen.insert(video.youtube_id.clone()) {
                    videos.push(video);
                }
            }
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => {
                    info!(playlist_id, videos = videos.len(), "playlist fetched");
                    return Ok(videos);
                }
            }
        }

        Err(AdapterError::Message(format!(
            "playlist {playlist_id} exceeded {MAX_PAGES} pages"
        )))
    }
}
