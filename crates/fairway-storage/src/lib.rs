//! Catalog persistence + HTTP fetch utilities for Fairway.

use async_trait::async_trait;
use fairway_core::{CourseDraft, CourseRecord, PlaylistKind, VideoDraft, VideoRecord};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

mod http;
mod memory;
mod postgres;

pub use http::{FetchError, HttpClientConfig, HttpFetcher, RetryPolicy};
pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const CRATE_NAME: &str = "fairway-storage";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("video {0} not found")]
    VideoNotFound(Uuid),
    #[error("course {0} not found")]
    CourseNotFound(Uuid),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    pub inserted: usize,
    pub updated: usize,
}

/// Read/write access to the course catalog.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// All courses in a stable order (the matcher breaks ties by this order).
    async fn list_courses(&self) -> Result<Vec<CourseRecord>, StorageError>;

    async fn upsert_courses(&self, drafts: &[CourseDraft]) -> Result<UpsertCounts, StorageError>;
}

/// Read/write access to synced playlist videos.
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    async fn list_videos(&self, kind: PlaylistKind) -> Result<Vec<VideoRecord>, StorageError>;

    /// Inserts or refreshes video metadata. Existing course assignments are left alone.
    async fn upsert_videos(&self, drafts: &[VideoDraft]) -> Result<UpsertCounts, StorageError>;

    async fn update_course_assignment(
        &self,
        video_id: Uuid,
        course_id: Option<Uuid>,
    ) -> Result<(), StorageError>;
}

pub trait Catalog: CourseCatalog + VideoCatalog {}

impl<T: CourseCatalog + VideoCatalog> Catalog for T {}
