use async_trait::async_trait;
use fairway_core::{CourseDraft, CourseRecord, PlaylistKind, VideoDraft, VideoRecord};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::{CourseCatalog, StorageError, UpsertCounts, VideoCatalog};

/// Postgres-backed catalog.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!().run(&self.pool).await?;
        info!("catalog migrations applied");
        Ok(())
    }
}

#[async_trait]
impl CourseCatalog for PgStore {
    async fn list_courses(&self) -> Result<Vec<CourseRecord>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, location
              FROM courses
             ORDER BY created_at, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(CourseRecord {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                location: row.try_get("location")?,
            });
        }
        Ok(out)
    }

    async fn upsert_courses(&self, drafts: &[CourseDraft]) -> Result<UpsertCounts, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut counts = UpsertCounts::default();
        for draft in drafts {
            let inserted: bool = sqlx::query_scalar(
                r#"
                INSERT INTO courses (id, name, location, website_url)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO UPDATE
                   SET name = EXCLUDED.name,
                       location = EXCLUDED.location,
                       website_url = EXCLUDED.website_url,
                       updated_at = NOW()
                RETURNING (xmax = 0)
                "#,
            )
            .bind(draft.stable_id())
            .bind(&draft.name)
            .bind(&draft.location)
            .bind(&draft.website_url)
            .fetch_one(&mut *tx)
            .await?;
            if inserted {
                counts.inserted += 1;
            } else {
                counts.updated += 1;
            }
        }
        tx.commit().await?;
        Ok(counts)
    }
}

#[async_trait]
impl VideoCatalog for PgStore {
    async fn list_videos(&self, kind: PlaylistKind) -> Result<Vec<VideoRecord>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, course_id
              FROM videos
             WHERE playlist_kind = $1
             ORDER BY published_at DESC NULLS LAST, created_at
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(VideoRecord {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                course_id: row.try_get("course_id")?,
            });
        }
        Ok(out)
    }

    async fn upsert_videos(&self, drafts: &[VideoDraft]) -> Result<UpsertCounts, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut counts = UpsertCounts::default();
        for draft in drafts {
            let inserted: bool = sqlx::query_scalar(
                r#"
                INSERT INTO videos (id, youtube_id, title, description, thumbnail_url, published_at, playlist_kind)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (youtube_id) DO UPDATE
                   SET title = EXCLUDED.title,
                       description = EXCLUDED.description,
                       thumbnail_url = EXCLUDED.thumbnail_url,
                       published_at = EXCLUDED.published_at,
                       playlist_kind = EXCLUDED.playlist_kind,
                       updated_at = NOW()
                RETURNING (xmax = 0)
                "#,
            )
            .bind(draft.stable_id())
            .bind(&draft.youtube_id)
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(&draft.thumbnail_url)
            .bind(draft.published_at)
            .bind(draft.playlist_kind.as_str())
            .fetch_one(&mut *tx)
            .await?;
            if inserted {
                counts.inserted += 1;
            } else {
                counts.updated += 1;
            }
        }
        tx.commit().await?;
        Ok(counts)
    }

    async fn update_course_assignment(
        &self,
        video_id: Uuid,
        course_id: Option<Uuid>,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE videos
               SET course_id = $2,
                   updated_at = NOW()
             WHERE id = $1
            "#,
        )
        .bind(video_id)
        .bind(course_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::VideoNotFound(video_id));
        }
        Ok(())
    }
}
