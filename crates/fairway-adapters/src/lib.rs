//! Source adapters feeding the Fairway catalog: course CSV files and YouTube playlists.

use std::path::PathBuf;

use async_trait::async_trait;
use fairway_core::{PlaylistKind, VideoDraft};
use fairway_storage::FetchError;
use thiserror::Error;

pub mod courses;
pub mod youtube;

pub use courses::{load_courses_csv, parse_courses_csv, CourseImport};
pub use youtube::{parse_playlist_page, PlaylistPage, YoutubeClient, DEFAULT_API_BASE};

pub const CRATE_NAME: &str = "fairway-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Message(String),
}

/// Anything that can list the videos of a playlist.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    async fn fetch_playlist(
        &self,
        playlist_id: &str,
        kind: PlaylistKind,
    ) -> Result<Vec<VideoDraft>, AdapterError>;
}
