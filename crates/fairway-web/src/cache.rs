//! Course list cache backing the search endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fairway_core::CourseRecord;

pub const DEFAULT_COURSE_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone)]
struct CourseSnapshot {
    courses: Arc<Vec<CourseRecord>>,
    expires_at: Instant,
}

/// Holds at most one snapshot of the course list. Callers supply the clock.
#[derive(Debug, Clone)]
pub struct CourseSearchCache {
    ttl: Duration,
    snapshot: Option<CourseSnapshot>,
}

impl CourseSearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, snapshot: None }
    }

    /// The cached courses, if the snapshot has not expired at `now`.
    pub fn fresh(&self, now: Instant) -> Option<Arc<Vec<CourseRecord>>> {
        self.snapshot
            .as_ref()
            .filter(|snapshot| now < snapshot.expires_at)
            .map(|snapshot| Arc::clone(&snapshot.courses))
    }

    pub fn store(&mut self, courses: Vec<CourseRecord>, now: Instant) -> Arc<Vec<CourseRecord>> {
        let courses = Arc::new(courses);
        self.snapshot = Some(CourseSnapshot {
            courses: Arc::clone(&courses),
            expires_at: now + self.ttl,
        });
        courses
    }
}

impl Default for CourseSearchCache {
    fn default() -> Self {
        Self::new(DEFAULT_COURSE_CACHE_TTL)
    }
}

pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT)
}

/// Case-insensitive substring search over course name and location, ordered by name.
pub fn search_courses(courses: &[CourseRecord], query: &str, limit: usize) -> Vec<CourseRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<&CourseRecord> = courses
        .iter()
        .filter(|course| {
            course.name.to_lowercase().contains(&needle)
                || course
                    .location
                    .as_deref()
                    .is_some_and(|loc| loc.to_lowercase().contains(&needle))
        })
        .collect();
    hits.sort_by_cached_key(|course| course.name.to_lowercase());
    hits.into_iter().take(limit).cloned().collect()
}
