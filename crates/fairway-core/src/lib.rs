//! Core domain records shared by the Fairway crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod mention;

pub const CRATE_NAME: &str = "fairway-core";

/// A known golf course, as imported into the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
}

/// A synced playlist video. `course_id` is only ever written by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub title: String,
    pub course_id: Option<Uuid>,
}

/// Playlist classification for synced videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistKind {
    Flyovers,
    Tutorials,
    Setups,
    Reviews,
}

impl PlaylistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistKind::Flyovers => "flyovers",
            PlaylistKind::Tutorials => "tutorials",
            PlaylistKind::Setups => "setups",
            PlaylistKind::Reviews => "reviews",
        }
    }
}

impl fmt::Display for PlaylistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed course row handed from the importer to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDraft {
    pub name: String,
    pub location: Option<String>,
    pub website_url: Option<String>,
}

impl CourseDraft {
    /// Deterministic id so repeated imports of the same course name converge.
    pub fn stable_id(&self) -> Uuid {
        course_id_for_name(&self.name)
    }
}

/// Parsed playlist entry handed from the YouTube adapter to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDraft {
    pub youtube_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub playlist_kind: PlaylistKind,
}

impl VideoDraft {
    pub fn stable_id(&self) -> Uuid {
        video_id_for_youtube_id(&self.youtube_id)
    }
}

pub fn course_id_for_name(name: &str) -> Uuid {
    let key = format!("fairway:course:{}", name.trim().to_lowercase());
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes())
}

pub fn video_id_for_youtube_id(youtube_id: &str) -> Uuid {
    let key = format!("https://www.youtube.com/watch?v={}", youtube_id.trim());
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes())
}

/// Outcome counters of a single matching pass.
///
/// `matched + unmatched` always equals the number of videos considered.
/// `updated` only counts stored assignments that actually changed, and
/// `failed` counts writes that were attempted but rejected by storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub matched: usize,
    pub unmatched: usize,
    pub updated: usize,
    pub failed: usize,
}

impl MatchSummary {
    pub fn total(&self) -> usize {
        self.matched + self.unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_kind_serializes_as_its_text_form() {
        for kind in [
            PlaylistKind::Flyovers,
            PlaylistKind::Tutorials,
            PlaylistKind::Setups,
            PlaylistKind::Reviews,
        ] {
            assert_eq!(serde_json::to_string(&kind).unwrap(), format!("\"{kind}\""));
        }
        let parsed: PlaylistKind = serde_json::from_str("\"setups\"").unwrap();
        assert_eq!(parsed, PlaylistKind::Setups);
        assert!(serde_json::from_str::<PlaylistKind>("\"vlogs\"").is_err());
    }

    #[test]
    fn stable_ids_ignore_case_and_padding() {
        assert_eq!(course_id_for_name("Pinehurst No. 2"), course_id_for_name("  pinehurst no. 2 "));
        assert_ne!(course_id_for_name("Pinehurst No. 2"), course_id_for_name("Pinehurst No. 4"));
        assert_eq!(video_id_for_youtube_id("abc123"), video_id_for_youtube_id(" abc123"));
    }
}
