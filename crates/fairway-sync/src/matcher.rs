//! Flyover video to course matching.
//!
//! Each flyover title is reduced to a handful of normalized candidates and
//! scored against every course name with a Levenshtein-based similarity. The
//! best course wins when it reaches [`MATCH_THRESHOLD`]; otherwise any earlier
//! assignment is cleared. A pass only writes when the stored assignment changes.

use anyhow::{Context, Result};
use fairway_core::{CourseRecord, MatchSummary, PlaylistKind, VideoRecord};
use fairway_storage::Catalog;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const MATCH_THRESHOLD: f64 = 0.70;
pub const LOCATION_BONUS: f64 = 0.10;

static LEADING_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:gspro|flyover|virtual)\b\s*").expect("leading token regex"));

static TRAILING_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?:^|\s+)(?:flyover|gspro|golf course|golf club|cc|g\.c\.|\d{4})|\s*(?:\([^()]*\)|\[[^\[\]]*\]))$",
    )
    .expect("trailing token regex")
});

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("non-word regex"));

static TITLE_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" - | \| |: | at ").expect("title delimiter regex"));

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_boilerplate(input: &str) -> String {
    let mut current = input.trim().to_string();
    loop {
        let stripped = {
            let leading = LEADING_TOKEN.replace(&current, "");
            let trailing = TRAILING_TOKEN.replace(leading.trim_end(), "");
            trailing.trim().to_string()
        };
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

fn normalize_step(input: &str) -> String {
    let stripped = strip_boilerplate(input);
    let spaced = NON_WORD.replace_all(&stripped, " ");
    collapse_whitespace(&spaced)
}

/// Canonical comparison key for course names, titles and locations.
///
/// Boilerplate tokens are stripped repeatedly until the key is stable, so
/// `normalize_name(&normalize_name(x)) == normalize_name(x)`.
pub fn normalize_name(input: &str) -> String {
    let mut current = collapse_whitespace(&input.to_lowercase());
    loop {
        let next = normalize_step(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Normalized, deduplicated comparison candidates for a video title.
///
/// The whole title comes first, followed by every segment between delimiters.
/// A title with several delimiters yields one candidate per segment, not a
/// left/right pair per delimiter.
pub fn title_candidates(title: &str) -> Vec<String> {
    let lowered = title.to_lowercase();
    let mut candidates = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    push(normalize_name(&lowered));
    let parts = TITLE_DELIMITER.split(&lowered).collect::<Vec<_>>();
    if parts.len() > 1 {
        for part in parts {
            push(normalize_name(part));
        }
    }
    candidates
}

pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// `(longest - distance) / longest`, case-insensitive, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let distance = levenshtein_distance(&a, &b);
    (longest - distance) as f64 / longest as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    pub threshold: f64,
    pub location_bonus: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: MATCH_THRESHOLD,
            location_bonus: LOCATION_BONUS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourseMatch {
    pub course_id: Uuid,
    pub score: f64,
}

/// What a pass should do with one video's stored assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchDecision {
    Keep { course_id: Uuid, score: f64 },
    Assign { course_id: Uuid, previous: Option<Uuid>, score: f64 },
    Clear { previous: Uuid, best_score: Option<f64> },
    LeaveUnmatched { best_score: Option<f64> },
}

impl MatchDecision {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchDecision::Keep { .. } | MatchDecision::Assign { .. })
    }

    /// The assignment to store, or `None` when nothing changes.
    pub fn write(&self) -> Option<Option<Uuid>> {
        match self {
            MatchDecision::Assign { course_id, .. } => Some(Some(*course_id)),
            MatchDecision::Clear { .. } => Some(None),
            MatchDecision::Keep { .. } | MatchDecision::LeaveUnmatched { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
struct PreparedCourse {
    id: Uuid,
    key: String,
    location_key: Option<String>,
}

pub struct VideoCourseMatcher {
    courses: Vec<PreparedCourse>,
    config: MatchConfig,
}

impl VideoCourseMatcher {
    /// Courses whose name normalizes to nothing can never be matched and are dropped.
    pub fn new(courses: &[CourseRecord], config: MatchConfig) -> Self {
        let courses = courses
            .iter()
            .filter_map(|course| {
                let key = normalize_name(&course.name);
                if key.is_empty() {
                    debug!(course_id = %course.id, name = %course.name, "course name normalizes to nothing");
                    return None;
                }
                let location_key = course
                    .location
                    .as_deref()
                    .map(normalize_name)
                    .filter(|l| !l.is_empty());
                Some(PreparedCourse {
                    id: course.id,
                    key,
                    location_key,
                })
            })
            .collect();
        Self { courses, config }
    }

    /// Highest-scoring course for `title`, regardless of threshold.
    /// Ties keep the course that comes first.
    pub fn best_match(&self, title: &str) -> Option<CourseMatch> {
        let lowered_title = title.to_lowercase();
        let candidates = title_candidates(title);
        let mut best: Option<CourseMatch> = None;

        for course in &self.courses {
            let bonus = match &course.location_key {
                Some(location) if lowered_title.contains(location.as_str()) => self.config.location_bonus,
                _ => 0.0,
            };
            for candidate in &candidates {
                let score = (similarity(candidate, &course.key) + bonus).min(1.0);
                if best.map_or(true, |b| score > b.score) {
                    best = Some(CourseMatch {
                        course_id: course.id,
                        score,
                    });
                }
            }
        }
        best
    }

    pub fn decide(&self, video: &VideoRecord) -> MatchDecision {
        let best = self.best_match(&video.title);
        match (best, video.course_id) {
            (Some(m), Some(current)) if m.score >= self.config.threshold && m.course_id == current => {
                MatchDecision::Keep {
                    course_id: m.course_id,
                    score: m.score,
                }
            }
            (Some(m), previous) if m.score >= self.config.threshold => MatchDecision::Assign {
                course_id: m.course_id,
                previous,
                score: m.score,
            },
            (best, Some(previous)) => MatchDecision::Clear {
                previous,
                best_score: best.map(|m| m.score),
            },
            (best, None) => MatchDecision::LeaveUnmatched {
                best_score: best.map(|m| m.score),
            },
        }
    }
}

/// Matches every flyover video against the full course list and writes back changes.
///
/// Loading either list is fatal. A failed write for one video is logged,
/// counted in `failed`, and the pass moves on. Passes running concurrently
/// against the same catalog are not isolated from each other; the last write wins.
pub async fn run_match_pass<C>(catalog: &C, config: MatchConfig) -> Result<MatchSummary>
where
    C: Catalog + ?Sized,
{
    let courses = catalog.list_courses().await.context("loading courses")?;
    let videos = catalog
        .list_videos(PlaylistKind::Flyovers)
        .await
        .context("loading flyover videos")?;

    let span = info_span!("match_pass", courses = courses.len(), videos = videos.len());
    async {
        let matcher = VideoCourseMatcher::new(&courses, config);
        let mut summary = MatchSummary::default();

        for video in &videos {
            let decision = matcher.decide(video);
            if decision.is_matched() {
                summary.matched += 1;
            } else {
                summary.unmatched += 1;
            }

            let Some(target) = decision.write() else {
                continue;
            };
            match catalog.update_course_assignment(video.id, target).await {
                Ok(()) => {
                    debug!(video_id = %video.id, ?decision, "course assignment updated");
                    summary.updated += 1;
                }
                Err(err) => {
                    warn!(video_id = %video.id, error = %err, "failed to update course assignment");
                    summary.failed += 1;
                }
            }
        }

        info!(
            matched = summary.matched,
            unmatched = summary.unmatched,
            updated = summary.updated,
            failed = summary.failed,
            "match pass complete"
        );
        Ok(summary)
    }
    .instrument(span)
    .await
}
