//! Sync pipeline: course import, playlist sync and flyover matching.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fairway_adapters::{load_courses_csv, PlaylistSource, YoutubeClient, DEFAULT_API_BASE};
use fairway_core::{MatchSummary, PlaylistKind};
use fairway_storage::{Catalog, HttpClientConfig, HttpFetcher, MemoryStore, PgStore};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub mod matcher;

pub use matcher::{run_match_pass, MatchConfig, MatchDecision, VideoCourseMatcher};

pub const CRATE_NAME: &str = "fairway-sync";

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistRegistry {
    #[serde(default)]
    pub playlists: Vec<PlaylistConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistConfig {
    pub playlist_id: String,
    pub display_name: String,
    pub kind: PlaylistKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PlaylistRegistry {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing playlist registry")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("loading {}", path.display()))
    }

    pub fn enabled(&self) -> impl Iterator<Item = &PlaylistConfig> {
        self.playlists.iter().filter(|p| p.enabled)
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database_url: Option<String>,
    pub workspace_root: PathBuf,
    pub playlists_path: PathBuf,
    pub courses_csv: Option<PathBuf>,
    pub youtube_api_key: Option<String>,
    pub youtube_api_base: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let workspace_root = std::env::var("FAIRWAY_WORKSPACE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        Self {
            database_url: non_empty_env("DATABASE_URL"),
            playlists_path: non_empty_env("FAIRWAY_PLAYLISTS")
                .map(PathBuf::from)
                .unwrap_or_else(|| workspace_root.join("playlists.yaml")),
            courses_csv: non_empty_env("FAIRWAY_COURSES_CSV").map(PathBuf::from),
            youtube_api_key: non_empty_env("YOUTUBE_API_KEY"),
            youtube_api_base: non_empty_env("YOUTUBE_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            user_agent: std::env::var("FAIRWAY_USER_AGENT")
                .unwrap_or_else(|_| "fairway-sync/0.1".to_string()),
            http_timeout_secs: std::env::var("FAIRWAY_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            workspace_root,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Opens the Postgres catalog when `DATABASE_URL` is set, else an empty in-memory one.
pub async fn connect_catalog(config: &SyncConfig) -> Result<Arc<dyn Catalog>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url).await.context("connecting to postgres")?;
            store.migrate().await.context("running catalog migrations")?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set; using an in-memory catalog");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CourseImportSummary {
    pub rows: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaylistSyncSummary {
    pub playlists: usize,
    pub videos: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed_playlists: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub courses: Option<CourseImportSummary>,
    pub playlists: Option<PlaylistSyncSummary>,
    pub matches: MatchSummary,
}

pub struct SyncPipeline {
    config: SyncConfig,
    catalog: Arc<dyn Catalog>,
    playlist_source: Option<Box<dyn PlaylistSource>>,
    match_config: MatchConfig,
}

impl SyncPipeline {
    pub fn new(config: SyncConfig, catalog: Arc<dyn Catalog>) -> Result<Self> {
        let playlist_source: Option<Box<dyn PlaylistSource>> = match &config.youtube_api_key {
            Some(key) => {
                let http = HttpFetcher::new(HttpClientConfig {
                    timeout: Duration::from_secs(config.http_timeout_secs),
                    user_agent: Some(config.user_agent.clone()),
                    ..Default::default()
                })?;
                let client = YoutubeClient::new(Arc::new(http), key.clone())
                    .with_base_url(config.youtube_api_base.clone());
                Some(Box::new(client))
            }
            None => None,
        };
        Ok(Self {
            config,
            catalog,
            playlist_source,
            match_config: MatchConfig::default(),
        })
    }

    pub fn with_playlist_source(mut self, source: Box<dyn PlaylistSource>) -> Self {
        self.playlist_source = Some(source);
        self
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub async fn import_courses(&self, path: &Path) -> Result<CourseImportSummary> {
        let import = load_courses_csv(path).with_context(|| format!("importing {}", path.display()))?;
        let counts = self
            .catalog
            .upsert_courses(&import.drafts)
            .await
            .context("storing courses")?;
        let summary = CourseImportSummary {
            rows: import.drafts.len() + import.skipped,
            inserted: counts.inserted,
            updated: counts.updated,
            skipped: import.skipped,
        };
        info!(
            path = %path.display(),
            inserted = summary.inserted,
            updated = summary.updated,
            skipped = summary.skipped,
            "course import complete"
        );
        Ok(summary)
    }

    /// Fetches every enabled playlist in the registry. A playlist that fails to
    /// fetch is reported and skipped; storage failures abort.
    pub async fn sync_playlists(&self) -> Result<PlaylistSyncSummary> {
        let source = self
            .playlist_source
            .as_deref()
            .context("playlist sync needs YOUTUBE_API_KEY")?;
        let registry = PlaylistRegistry::load(&self.config.playlists_path).await?;

        let mut summary = PlaylistSyncSummary::default();
        for playlist in registry.enabled() {
            let span = info_span!("playlist_sync", playlist_id = %playlist.playlist_id, kind = %playlist.kind);
            let fetched = source
                .fetch_playlist(&playlist.playlist_id, playlist.kind)
                .instrument(span)
                .await;
            let drafts = match fetched {
                Ok(drafts) => drafts,
                Err(err) => {
                    warn!(playlist_id = %playlist.playlist_id, error = %err, "playlist fetch failed");
                    summary.failed_playlists.push(playlist.playlist_id.clone());
                    continue;
                }
            };

            let counts = self
                .catalog
                .upsert_videos(&drafts)
                .await
                .with_context(|| format!("storing videos for {}", playlist.display_name))?;
            summary.playlists += 1;
            summary.videos += drafts.len();
            summary.inserted += counts.inserted;
            summary.updated += counts.updated;
        }
        Ok(summary)
    }

    pub async fn match_videos(&self) -> Result<MatchSummary> {
        run_match_pass(self.catalog.as_ref(), self.match_config).await
    }

    /// Import (when a CSV is configured), playlist sync (when an API key is
    /// configured), then a match pass.
    pub async fn run_once(&self) -> Result<SyncRunSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id);

        async {
            let courses = match &self.config.courses_csv {
                Some(path) => Some(self.import_courses(path).await?),
                None => None,
            };
            let playlists = if self.playlist_source.is_some() {
                Some(self.sync_playlists().await?)
            } else {
                info!("no playlist source configured; skipping playlist sync");
                None
            };
            let matches = self.match_videos().await?;

            Ok(SyncRunSummary {
                run_id,
                started_at,
                finished_at: Utc::now(),
                courses,
                playlists,
                matches,
            })
        }
        .instrument(span)
        .await
    }
}

pub async fn run_sync_once_from_env() -> Result<SyncRunSummary> {
    let config = SyncConfig::from_env();
    let catalog = connect_catalog(&config).await?;
    SyncPipeline::new(config, catalog)?.run_once().await
}
