use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Query, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use fairway_adapters::{AdapterError, PlaylistSource, YoutubeClient};
use fairway_core::PlaylistKind;
use fairway_storage::{FetchError, HttpClientConfig, HttpFetcher, RetryPolicy};
use serde_json::{json, Value};
use tokio::net::TcpListener;

fn item(video_id: &str, title: &str) -> Value {
    json!({ "snippet": { "title": title, "resourceId": { "videoId": video_id } } })
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}/")
}

fn client(base_url: String) -> YoutubeClient {
    let http = HttpFetcher::new(HttpClientConfig {
        retry: RetryPolicy {
            retries: 0,
            initial_delay: Duration::from_millis(1),
            ceiling: Duration::from_millis(1),
        },
        ..Default::default()
    })
    .unwrap();
    YoutubeClient::new(Arc::new(http), "test-key").with_base_url(base_url)
}

async fn two_pages(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    if params.get("key").map(String::as_str) != Some("test-key")
        || params.get("playlistId").map(String::as_str) != Some("PLfly")
        || params.get("part").map(String::as_str) != Some("snippet")
    {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad query" })));
    }
    let body = match params.get("pageToken").map(String::as_str) {
        None => json!({
            "items": [item("pn2", "Pinehurst No. 2 Flyover"), item("sta", "St Andrews Old Course")],
            "nextPageToken": "page-2"
        }),
        Some("page-2") => json!({
            "items": [item("sta", "St Andrews Old Course"), item("aug", "Augusta National")]
        }),
        Some(_) => return (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown page" }))),
    };
    (StatusCode::OK, Json(body))
}

#[tokio::test]
async fn follows_page_tokens_and_drops_repeated_videos() {
    let base = serve(Router::new().route("/playlistItems", get(two_pages))).await;
    let videos = client(base)
        .fetch_playlist("PLfly", PlaylistKind::Flyovers)
        .await
        .expect("playlist fetch");

    let ids = videos.iter().map(|v| v.youtube_id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["pn2", "sta", "aug"]);
    assert!(videos.iter().all(|v| v.playlist_kind == PlaylistKind::Flyovers));
}

#[tokio::test]
async fn endless_paging_is_cut_off() {
    let pages = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pages);
    let router = Router::new().route(
        "/playlistItems",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "items": [item(&format!("v{n}"), "Loop Links")],
                    "nextPageToken": format!("page-{}", n + 1)
                }))
            }
        }),
    );
    let base = serve(router).await;

    let err = client(base)
        .fetch_playlist("PLloop", PlaylistKind::Flyovers)
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Message(ref m) if m.contains("exceeded")), "{err}");
    assert_eq!(pages.load(Ordering::SeqCst), 200);
}

#[tokio::test]
async fn rejected_api_key_surfaces_status() {
    let router = Router::new().route(
        "/playlistItems",
        get(|| async { (StatusCode::FORBIDDEN, Json(json!({ "error": "quotaExceeded" }))) }),
    );
    let base = serve(router).await;

    let err = client(base)
        .fetch_playlist("PLfly", PlaylistKind::Flyovers)
        .await
        .unwrap_err();
    assert!(
        matches!(err, AdapterError::Fetch(FetchError::HttpStatus { status: 403, .. })),
        "{err}"
    );
}
