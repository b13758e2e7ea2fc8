//! Axum + Askama web surface for the Fairway catalog.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fairway_core::{mention, CourseRecord, MatchSummary, PlaylistKind};
use fairway_storage::Catalog;
use fairway_sync::{connect_catalog, run_match_pass, MatchConfig, SyncConfig};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub mod cache;
mod error;

pub use cache::{search_courses, CourseSearchCache};
pub use error::ApiError;

pub const CRATE_NAME: &str = "fairway-web";

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    pub course_cache_ttl: Duration,
    pub match_config: MatchConfig,
}

impl WebConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("FAIRWAY_WEB_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);
        let course_cache_ttl = std::env::var("FAIRWAY_COURSE_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(cache::DEFAULT_COURSE_CACHE_TTL);
        Self {
            port,
            course_cache_ttl,
            match_config: MatchConfig::default(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            course_cache_ttl: cache::DEFAULT_COURSE_CACHE_TTL,
            match_config: MatchConfig::default(),
        }
    }
}

pub struct AppState {
    catalog: Arc<dyn Catalog>,
    config: WebConfig,
    course_cache: RwLock<CourseSearchCache>,
    /// Serializes match passes started from this process.
    match_lock: Mutex<()>,
}

impl AppState {
    pub fn new(catalog: Arc<dyn Catalog>, config: WebConfig) -> Self {
        let course_cache = RwLock::new(CourseSearchCache::new(config.course_cache_ttl));
        Self {
            catalog,
            config,
            course_cache,
            match_lock: Mutex::new(()),
        }
    }

    async fn cached_courses(&self) -> Result<Arc<Vec<CourseRecord>>, ApiError> {
        if let Some(courses) = self.course_cache.read().await.fresh(Instant::now()) {
            return Ok(courses);
        }
        let courses = self.catalog.list_courses().await?;
        debug!(courses = courses.len(), "course search cache refreshed");
        Ok(self.course_cache.write().await.store(courses, Instant::now()))
    }
}

#[derive(Debug, Serialize)]
struct MatchResponse {
    success: bool,
    #[serde(flatten)]
    summary: MatchSummary,
}

#[derive(Debug, Deserialize, Default)]
struct CourseSearchQuery {
    q: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct MentionPreviewRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct MentionPreviewResponse {
    html: String,
    usernames: Vec<String>,
    course_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct FlyoversQuery {
    status: Option<String>,
}

#[derive(Debug, Clone)]
struct FlyoverRow {
    title: String,
    course_name: String,
    assigned: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    total_courses: usize,
    total_flyovers: usize,
    assigned_flyovers: usize,
    unassigned_flyovers: usize,
}

#[derive(Template)]
#[template(path = "flyovers.html")]
struct FlyoversTemplate {
    rows: Vec<FlyoverRow>,
    status: String,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/flyovers", get(flyovers_handler))
        .route(
            "/api/sync/match-flyovers",
            post(match_flyovers_handler).get(match_flyovers_handler),
        )
        .route("/api/courses/search", get(course_search_handler))
        .route("/api/mentions/preview", post(mention_preview_handler))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let config = WebConfig::from_env();
    let catalog = connect_catalog(&SyncConfig::from_env()).await?;
    let port = config.port;
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "fairway web listening");
    axum::serve(listener, app(AppState::new(catalog, config))).await?;
    Ok(())
}

async fn match_flyovers_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MatchResponse>, ApiError> {
    let _guard = state.match_lock.lock().await;
    let summary = run_match_pass(state.catalog.as_ref(), state.config.match_config)
        .await
        .map_err(ApiError::MatchFailed)?;
    Ok(Json(MatchResponse {
        success: true,
        summary,
    }))
}

async fn course_search_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CourseSearchQuery>,
) -> Result<Json<Vec<CourseRecord>>, ApiError> {
    let q = query.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }
    let courses = state.cached_courses().await?;
    let limit = cache::clamp_limit(query.limit);
    Ok(Json(search_courses(&courses, &q, limit)))
}

async fn mention_preview_handler(Json(request): Json<MentionPreviewRequest>) -> Json<MentionPreviewResponse> {
    let segments = mention::parse_mentions(&request.text);
    Json(MentionPreviewResponse {
        html: mention::render_html(&segments),
        usernames: mention::mentioned_usernames(&segments),
        course_ids: mention::mentioned_course_ids(&segments),
    })
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let loaded = async {
        let courses = state.catalog.list_courses().await?;
        let flyovers = state.catalog.list_videos(PlaylistKind::Flyovers).await?;
        anyhow::Ok((courses, flyovers))
    };
    match loaded.await {
        Ok((courses, flyovers)) => {
            let assigned = flyovers.iter().filter(|v| v.course_id.is_some()).count();
            render_html(IndexTemplate {
                total_courses: courses.len(),
                total_flyovers: flyovers.len(),
                assigned_flyovers: assigned,
                unassigned_flyovers: flyovers.len() - assigned,
            })
        }
        Err(err) => server_error(err),
    }
}

async fn flyovers_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FlyoversQuery>,
) -> Response {
    let loaded = async {
        let courses = state.catalog.list_courses().await?;
        let flyovers = state.catalog.list_videos(PlaylistKind::Flyovers).await?;
        anyhow::Ok((courses, flyovers))
    };
    let (courses, flyovers) = match loaded.await {
        Ok(lists) => lists,
        Err(err) => return server_error(err),
    };

    let names: HashMap<_, _> = courses.iter().map(|c| (c.id, c.name.as_str())).collect();
    let status = query.status.unwrap_or_default();
    let mut rows: Vec<FlyoverRow> = flyovers
        .into_iter()
        .map(|video| {
            let course_name = video.course_id.and_then(|id| names.get(&id).copied());
            FlyoverRow {
                title: video.title,
                course_name: course_name.unwrap_or_default().to_string(),
                assigned: course_name.is_some(),
            }
        })
        .filter(|row| match status.as_str() {
            "assigned" => row.assigned,
            "unassigned" => !row.assigned,
            _ => true,
        })
        .collect();
    rows.sort_by(|a, b| a.title.cmp(&b.title));

    render_html(FlyoversTemplate { rows, status })
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    tracing::error!(error = %err, "page render failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use async_trait::async_trait;
    use fairway_core::{course_id_for_name, CourseDraft, VideoDraft, VideoRecord};
    use fairway_storage::{CourseCatalog, MemoryStore, StorageError, UpsertCounts, VideoCatalog};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (name, location) in [
            ("Pinehurst No. 2", Some("North Carolina")),
            ("Pebble Beach", Some("California")),
            ("Carnoustie", Some("Scotland")),
        ] {
            store
                .seed_course(CourseRecord {
                    id: course_id_for_name(name),
                    name: name.into(),
                    location: location.map(Into::into),
                })
                .await;
        }
        store
            .seed_video(
                VideoRecord {
                    id: Uuid::new_v4(),
                    title: "Pinehurst No. 2 - GSPro Flyover".into(),
                    course_id: None,
                },
                PlaylistKind::Flyovers,
            )
            .await;
        store
    }

    /// Catalog whose database is unreachable.
    struct OfflineCatalog;

    fn offline() -> StorageError {
        StorageError::Unavailable("db down".into())
    }

    #[async_trait]
    impl CourseCatalog for OfflineCatalog {
        async fn list_courses(&self) -> Result<Vec<CourseRecord>, StorageError> {
            Err(offline())
        }

        async fn upsert_courses(&self, _: &[CourseDraft]) -> Result<UpsertCounts, StorageError> {
            Err(offline())
        }
    }

    #[async_trait]
    impl VideoCatalog for OfflineCatalog {
        async fn list_videos(&self, _: PlaylistKind) -> Result<Vec<VideoRecord>, StorageError> {
            Err(offline())
        }

        async fn upsert_videos(&self, _: &[VideoDraft]) -> Result<UpsertCounts, StorageError> {
            Err(offline())
        }

        async fn update_course_assignment(
            &self,
            _: Uuid,
            _: Option<Uuid>,
        ) -> Result<(), StorageError> {
            Err(offline())
        }
    }

    fn test_app(store: Arc<MemoryStore>) -> Router {
        app(AppState::new(store, WebConfig::default()))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn match_endpoint_reports_counts_and_is_idempotent() {
        let app = test_app(seeded_store().await);
        let first = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sync/match-flyovers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let json = body_json(first).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["matched"], 1);
        assert_eq!(json["unmatched"], 0);
        assert_eq!(json["updated"], 1);
        assert_eq!(json["failed"], 0);

        let second = app
            .oneshot(
                Request::builder()
                    .uri("/api/sync/match-flyovers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(second).await;
        assert_eq!(json["matched"], 1);
        assert_eq!(json["updated"], 0);
    }

    #[tokio::test]
    async fn match_endpoint_reports_unreachable_catalog_as_500() {
        let app = app(AppState::new(Arc::new(OfflineCatalog), WebConfig::default()));
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sync/match-flyovers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Failed to match flyovers");
        let message = json["message"].as_str().unwrap();
        assert!(message.contains("loading courses"), "{message}");
        assert!(message.contains("db down"), "{message}");
        assert!(json.get("matched").is_none());
    }

    #[tokio::test]
    async fn course_search_reports_unreachable_catalog_as_500() {
        let app = app(AppState::new(Arc::new(OfflineCatalog), WebConfig::default()));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/courses/search?q=pebble")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Failed to load catalog");
        assert_eq!(json["message"], "storage unavailable: db down");
    }

    #[tokio::test]
    async fn course_search_filters_and_limits() {
        let app = test_app(seeded_store().await);
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/courses/search?q=scot")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Carnoustie");
        assert_eq!(json[0]["location"], "Scotland");

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/courses/search?q=a&limit=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp).await;
        let names: Vec<_> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["Carnoustie", "Pebble Beach"]);
    }

    #[tokio::test]
    async fn course_search_serves_cached_snapshot() {
        let store = seeded_store().await;
        let app = test_app(Arc::clone(&store));
        let search = || {
            Request::builder()
                .uri("/api/courses/search?q=bethpage")
                .body(Body::empty())
                .unwrap()
        };

        let before = body_json(app.clone().oneshot(search()).await.unwrap()).await;
        assert!(before.as_array().unwrap().is_empty());

        store
            .seed_course(CourseRecord {
                id: course_id_for_name("Bethpage Black"),
                name: "Bethpage Black".into(),
                location: None,
            })
            .await;
        let cached = body_json(app.oneshot(search()).await.unwrap()).await;
        assert!(cached.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_search_is_empty() {
        let app = test_app(seeded_store().await);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/courses/search?q=%20")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(resp).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn mention_preview_renders_links() {
        let app = test_app(seeded_store().await);
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/mentions/preview")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"text":"@ace played @[Carnoustie](course:carn-1) <3"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["usernames"], serde_json::json!(["ace"]));
        assert_eq!(json["course_ids"], serde_json::json!(["carn-1"]));
        let html = json["html"].as_str().unwrap();
        assert!(html.contains("/users/ace"));
        assert!(html.contains("/courses/carn-1"));
        assert!(html.contains("&lt;3"));
    }

    #[tokio::test]
    async fn pages_render() {
        let app = test_app(seeded_store().await);
        let index = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(index.status(), StatusCode::OK);
        assert!(body_text(index).await.contains("Fairway Dashboard"));

        let flyovers = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/flyovers?status=unassigned")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(flyovers.status(), StatusCode::OK);
        assert!(body_text(flyovers).await.contains("Pinehurst No. 2 - GSPro Flyover"));

        let health = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_text(health).await, "ok");
    }
}
