//! Repository for the `scenes` table.

use sqlx::{PgConnection, PgPool};
use scenecast_core::types::DbId;

use crate::models::scene::{NewScene, Scene};

/// Column list for `scenes` queries.
const COLUMNS: &str = "\
    id, video_id, job_id, scene_index, start_secs, end_secs, confidence, created_at";

/// Provides insert/list operations for detected scenes.
pub struct SceneRepo;

impl SceneRepo {
    /// Insert all scenes for a job on `conn`, normally an open transaction
    /// that also settles the job.
    pub async fn insert_all(
        conn: &mut PgConnection,
        video_id: DbId,
        job_id: DbId,
        scenes: &[NewScene],
    ) -> Result<Vec<Scene>, sqlx::Error> {
        let query = format!(
            "INSERT INTO scenes (video_id, job_id, scene_index, start_secs, end_secs, confidence) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );

        let mut created = Vec::with_capacity(scenes.len());
        for scene in scenes {
            let row = sqlx::query_as::<_, Scene>(&query)
                .bind(video_id)
                .bind(job_id)
                .bind(scene.scene_index)
                .bind(scene.start_secs)
                .bind(scene.end_secs)
                .bind(scene.confidence)
                .fetch_one(&mut *conn)
                .await?;
            created.push(row);
        }
        Ok(created)
    }

    pub async fn list_by_video(pool: &PgPool, video_id: DbId) -> Result<Vec<Scene>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scenes WHERE video_id = $1 ORDER BY scene_index ASC, id ASC"
        );
        sqlx::query_as::<_, Scene>(&query)
            .bind(video_id)
            .fetch_all(pool)
            .await
    }
}
