//! Course catalog CSV import.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use fairway_core::CourseDraft;
use serde::Deserialize;
use tracing::debug;

use crate::AdapterError;

#[derive(Debug, Deserialize)]
struct CourseCsvRow {
    #[serde(default, alias = "Name", alias = "course_name", alias = "Course")]
    name: Option<String>,
    #[serde(default, alias = "Location", alias = "city")]
    location: Option<String>,
    #[serde(default, alias = "Website", alias = "url")]
    website_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseImport {
    pub drafts: Vec<CourseDraft>,
    /// Rows without a usable name, or repeating an earlier name.
    pub skipped: usize,
}

pub fn parse_courses_csv<R: Read>(reader: R) -> Result<CourseImport, AdapterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut import = CourseImport::default();
    for row in csv_reader.deserialize::<CourseCsvRow>() {
        let row = row?;
        let Some(name) = non_blank(row.name) else {
            import.skipped += 1;
            continue;
        };
        if !seen.insert(name.to_lowercase()) {
            debug!(%name, "skipping duplicate course row");
            import.skipped += 1;
            continue;
        }
        import.drafts.push(CourseDraft {
            name,
            location: non_blank(row.location),
            website_url: non_blank(row.website_url),
        });
    }
    Ok(import)
}

pub fn load_courses_csv(path: impl AsRef<Path>) -> Result<CourseImport, AdapterError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| AdapterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_courses_csv(file)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
