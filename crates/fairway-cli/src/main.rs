use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fairway_storage::PgStore;
use fairway_sync::{connect_catalog, SyncConfig, SyncPipeline};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fairway-cli")]
#[command(about = "Fairway flyover catalog command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import courses, sync playlists, then run a match pass.
    Sync,
    /// Upsert courses from a CSV file.
    ImportCourses {
        /// Defaults to FAIRWAY_COURSES_CSV.
        path: Option<PathBuf>,
    },
    SyncPlaylists,
    /// Assign flyover videos to courses.
    Match,
    Migrate,
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Sync);
    info!(?command, "fairway-cli starting");

    match command {
        Commands::Serve => fairway_web::serve_from_env().await,
        Commands::Migrate => migrate().await,
        Commands::Sync => sync().await,
        Commands::ImportCourses { path } => import_courses(path).await,
        Commands::SyncPlaylists => sync_playlists().await,
        Commands::Match => match_videos().await,
    }
}

async fn pipeline_from_env() -> Result<SyncPipeline> {
    let config = SyncConfig::from_env();
    let catalog = connect_catalog(&config).await?;
    SyncPipeline::new(config, catalog)
}

async fn migrate() -> Result<()> {
    let config = SyncConfig::from_env();
    let url = config
        .database_url
        .context("DATABASE_URL is required for migrate")?;
    let store = PgStore::connect(&url).await?;
    store.migrate().await?;
    println!("migrations applied");
    Ok(())
}

async fn sync() -> Result<()> {
    let summary = pipeline_from_env().await?.run_once().await?;
    let m = summary.matches;
    println!(
        "sync complete: run_id={} matched={} unmatched={} updated={} failed={}",
        summary.run_id, m.matched, m.unmatched, m.updated, m.failed
    );
    if let Some(courses) = summary.courses {
        println!(
            "courses: rows={} inserted={} updated={} skipped={}",
            courses.rows, courses.inserted, courses.updated, courses.skipped
        );
    }
    if let Some(playlists) = summary.playlists {
        println!(
            "playlists: synced={} videos={} failed={}",
            playlists.playlists,
            playlists.videos,
            playlists.failed_playlists.len()
        );
    }
    Ok(())
}

async fn import_courses(path: Option<PathBuf>) -> Result<()> {
    let path = path
        .or_else(|| SyncConfig::from_env().courses_csv)
        .context("no CSV path given and FAIRWAY_COURSES_CSV is not set")?;
    let s = pipeline_from_env().await?.import_courses(&path).await?;
    println!(
        "courses imported: rows={} inserted={} updated={} skipped={}",
        s.rows, s.inserted, s.updated, s.skipped
    );
    Ok(())
}

async fn sync_playlists() -> Result<()> {
    let s = pipeline_from_env().await?.sync_playlists().await?;
    println!(
        "playlists synced: playlists={} videos={} inserted={} updated={}",
        s.playlists, s.videos, s.inserted, s.updated
    );
    for id in &s.failed_playlists {
        warn!(playlist_id = %id, "playlist failed");
    }
    Ok(())
}

async fn match_videos() -> Result<()> {
    let s = pipeline_from_env().await?.match_videos().await?;
    println!(
        "match pass: matched={} unmatched={} updated={} failed={}",
        s.matched, s.unmatched, s.updated, s.failed
    );
    Ok(())
}
