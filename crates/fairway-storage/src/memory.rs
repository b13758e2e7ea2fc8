use std::collections::HashSet;

use async_trait::async_trait;
use fairway_core::{CourseDraft, CourseRecord, PlaylistKind, VideoDraft, VideoRecord};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{CourseCatalog, StorageError, UpsertCounts, VideoCatalog};

#[derive(Debug, Clone)]
struct StoredVideo {
    record: VideoRecord,
    youtube_id: Option<String>,
    kind: PlaylistKind,
}

#[derive(Debug, Default)]
struct MemoryState {
    courses: Vec<CourseRecord>,
    videos: Vec<StoredVideo>,
    rejected_updates: HashSet<Uuid>,
    assignment_writes: usize,
}

/// Process-local catalog used when no database is configured, and by tests.
///
/// Courses keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_course(&self, course: CourseRecord) {
        let mut state = self.state.write().await;
        state.courses.retain(|c| c.id != course.id);
        state.courses.push(course);
    }

    pub async fn seed_video(&self, video: VideoRecord, kind: PlaylistKind) {
        let mut state = self.state.write().await;
        state.videos.retain(|v| v.record.id != video.id);
        state.videos.push(StoredVideo {
            record: video,
            youtube_id: None,
            kind,
        });
    }

    pub async fn video(&self, id: Uuid) -> Option<VideoRecord> {
        let state = self.state.read().await;
        state
            .videos
            .iter()
            .find(|v| v.record.id == id)
            .map(|v| v.record.clone())
    }

    /// Makes every later assignment write for `video_id` fail.
    pub async fn reject_updates_for(&self, video_id: Uuid) {
        self.state.write().await.rejected_updates.insert(video_id);
    }

    /// Number of assignment writes accepted so far.
    pub async fn assignment_writes(&self) -> usize {
        self.state.read().await.assignment_writes
    }
}

#[async_trait]
impl CourseCatalog for MemoryStore {
    async fn list_courses(&self) -> Result<Vec<CourseRecord>, StorageError> {
        Ok(self.state.read().await.courses.clone())
    }

    async fn upsert_courses(&self, drafts: &[CourseDraft]) -> Result<UpsertCounts, StorageError> {
        let mut state = self.state.write().await;
        let mut counts = UpsertCounts::default();
        for draft in drafts {
            let id = draft.stable_id();
            let record = CourseRecord {
                id,
                name: draft.name.clone(),
                location: draft.location.clone(),
            };
            match state.courses.iter_mut().find(|c| c.id == id) {
                Some(existing) => {
                    *existing = record;
                    counts.updated += 1;
                }
                None => {
                    state.courses.push(record);
                    counts.inserted += 1;
                }
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl VideoCatalog for MemoryStore {
    async fn list_videos(&self, kind: PlaylistKind) -> Result<Vec<VideoRecord>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .videos
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| v.record.clone())
            .collect())
    }

    async fn upsert_videos(&self, drafts: &[VideoDraft]) -> Result<UpsertCounts, StorageError> {
        let mut state = self.state.write().await;
        let mut counts = UpsertCounts::default();
        for draft in drafts {
            let existing = state
                .videos
                .iter_mut()
                .find(|v| v.youtube_id.as_deref() == Some(draft.youtube_id.as_str()));
            match existing {
                Some(video) => {
                    video.record.title = draft.title.clone();
                    video.kind = draft.playlist_kind;
                    counts.updated += 1;
                }
                None => {
                    state.videos.push(StoredVideo {
                        record: VideoRecord {
                            id: draft.stable_id(),
                            title: draft.title.clone(),
                            course_id: None,
                        },
                        youtube_id: Some(draft.youtube_id.clone()),
                        kind: draft.playlist_kind,
                    });
                    counts.inserted += 1;
                }
            }
        }
        Ok(counts)
    }

    async fn update_course_assignment(
        &self,
        video_id: Uuid,
        course_id: Option<Uuid>,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if state.rejected_updates.contains(&video_id) {
            return Err(StorageError::Unavailable(format!(
                "writes rejected for video {video_id}"
            )));
        }
        if let Some(course_id) = course_id {
            if !state.courses.iter().any(|c| c.id == course_id) {
                return Err(StorageError::CourseNotFound(course_id));
            }
        }
        let video = state
            .videos
            .iter_mut()
            .find(|v| v.record.id == video_id)
            .ok_or(StorageError::VideoNotFound(video_id))?;
        video.record.course_id = course_id;
        state.assignment_writes += 1;
        Ok(())
    }
}
