use std::path::PathBuf;

use fairway_adapters::{load_courses_csv, parse_playlist_page};
use fairway_core::PlaylistKind;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn course_fixture_skips_blank_and_duplicate_names() {
    let import = load_courses_csv(fixture("courses.csv")).expect("courses fixture");
    let names = import.drafts.iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Pinehurst No. 2", "St Andrews Old Course", "Augusta National"]);
    assert_eq!(import.skipped, 2);
    assert_eq!(
        import.drafts[0].location.as_deref(),
        Some("Pinehurst, North Carolina")
    );
    assert_eq!(import.drafts[1].website_url, None);
}

#[test]
fn playlist_fixture_maps_snippets_to_drafts() {
    let body = std::fs::read_to_string(fixture("playlist_page.json")).expect("playlist fixture");
    let page = parse_playlist_page(&body, PlaylistKind::Flyovers).expect("parse page");

    assert_eq!(page.next_page_token.as_deref(), Some("CDIQAA"));
    let ids = page.videos.iter().map(|v| v.youtube_id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["pn2", "sta"]);

    let first = &page.videos[0];
    assert_eq!(first.title, "Pinehurst No. 2 - GSPro Flyover");
    assert_eq!(
        first.thumbnail_url.as_deref(),
        Some("https://i.ytimg.com/vi/pn2/hqdefault.jpg")
    );
    assert!(first.published_at.is_some());
    assert_eq!(page.videos[1].published_at, None);
}
