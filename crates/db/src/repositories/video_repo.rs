//! Repository for the `videos` table.

use sqlx::PgPool;
use scenecast_core::types::DbId;

use crate::models::status::VideoStatus;
use crate::models::video::{NewVideo, Video};

/// Column list for `videos` queries.
const COLUMNS: &str = "\
    id, filename, storage_key, content_type, size_bytes, duration_secs, \
    status, created_at, updated_at";

/// Provides CRUD operations for uploaded videos.
pub struct VideoRepo;

impl VideoRepo {
    pub async fn create(pool: &PgPool, input: &NewVideo) -> Result<Video, sqlx::Error> {
        let query = format!(
            "INSERT INTO videos (filename, storage_key, content_type, size_bytes, duration_secs, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(&input.filename)
            .bind(&input.storage_key)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .bind(input.duration_secs)
            .bind(VideoStatus::Uploaded)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Video>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM videos \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: VideoStatus,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!(
            "UPDATE videos SET status = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }
}
