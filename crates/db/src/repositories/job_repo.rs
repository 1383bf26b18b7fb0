//! Repository for the `jobs` table.
//!
//! Every status literal goes through [`JobStatus`]; no raw strings.

use sqlx::{PgExecutor, PgPool};
use scenecast_core::types::DbId;

use crate::models::job::{Job, JobCounts, JobFilter, JobPatch, NewJob};
use crate::models::status::JobStatus;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, video_id, job_type, status, progress, error, payload, data, \
    queued_at, started_at, completed_at, created_at, updated_at";

/// Provides CRUD operations for background jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new `queued` job.
    pub async fn create(pool: &PgPool, input: &NewJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (video_id, job_type, status, payload) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.video_id)
            .bind(input.job_type)
            .bind(JobStatus::Queued)
            .bind(&input.payload)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a partial update, optionally guarded by the current status.
    ///
    /// With `expected = Some(..)` the `UPDATE` only matches while the row's
    /// status is one of the given values, so concurrent orchestrators
    /// cannot both win the same transition. Runs on a pool or inside an
    /// open transaction.
    pub async fn update<'e, E>(
        executor: E,
        id: DbId,
        patch: &JobPatch,
        expected: Option<&[JobStatus]>,
    ) -> Result<Option<Job>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        // Build the SET clause and track the next bind parameter index.
        let mut sets: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        let mut push_set = |column: &str, sets: &mut Vec<String>| {
            sets.push(format!("{column} = ${bind_idx}"));
            bind_idx += 1;
        };

        if patch.status.is_some() {
            push_set("status", &mut sets);
        }
        if patch.progress.is_some() {
            push_set("progress", &mut sets);
        }
        if patch.error.is_some() {
            push_set("error", &mut sets);
        }
        if patch.data.is_some() {
            push_set("data", &mut sets);
        }
        if patch.queued_at.is_some() {
            push_set("queued_at", &mut sets);
        }
        if patch.started_at.is_some() {
            push_set("started_at", &mut sets);
        }
        if patch.completed_at.is_some() {
            push_set("completed_at", &mut sets);
        }
        sets.push("updated_at = NOW()".to_string());

        let id_idx = bind_idx;
        let where_clause = if expected.is_some() {
            format!("id = ${id_idx} AND status = ANY(${})", id_idx + 1)
        } else {
            format!("id = ${id_idx}")
        };

        let query = format!(
            "UPDATE jobs SET {} WHERE {where_clause} RETURNING {COLUMNS}",
            sets.join(", "),
        );

        let mut q = sqlx::query_as::<_, Job>(&query);

        if let Some(status) = patch.status {
            q = q.bind(status);
        }
        if let Some(progress) = patch.progress {
            q = q.bind(progress);
        }
        if let Some(error) = &patch.error {
            q = q.bind(error.clone());
        }
        if let Some(data) = &patch.data {
            q = q.bind(data.clone());
        }
        if let Some(queued_at) = patch.queued_at {
            q = q.bind(queued_at);
        }
        if let Some(started_at) = patch.started_at {
            q = q.bind(started_at);
        }
        if let Some(completed_at) = patch.completed_at {
            q = q.bind(completed_at);
        }

        q = q.bind(id);
        if let Some(expected) = expected {
            let statuses: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();
            q = q.bind(statuses);
        }

        q.fetch_optional(executor).await
    }

    /// Raise the progress of a processing job. The row only matches while
    /// its stored progress does not exceed the new value.
    pub async fn advance_progress(
        pool: &PgPool,
        id: DbId,
        progress: i16,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET progress = $1, updated_at = NOW() \
             WHERE id = $2 AND status = $3 AND progress <= $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(progress)
            .bind(id)
            .bind(JobStatus::Processing)
            .fetch_optional(pool)
            .await
    }

    /// List jobs with optional filters, newest first.
    pub async fn list(pool: &PgPool, filter: &JobFilter) -> Result<Vec<Job>, sqlx::Error> {
        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if filter.status.is_some() {
            conditions.push(format!("status = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.job_type.is_some() {
            conditions.push(format!("job_type = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.video_id.is_some() {
            conditions.push(format!("video_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Job>(&query);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(job_type) = filter.job_type {
            q = q.bind(job_type);
        }
        if let Some(video_id) = filter.video_id {
            q = q.bind(video_id);
        }

        q = q
            .bind(filter.effective_limit())
            .bind(filter.effective_offset());

        q.fetch_all(pool).await
    }

    /// Count jobs grouped by status.
    pub async fn count_by_status(pool: &PgPool) -> Result<JobCounts, sqlx::Error> {
        let rows = sqlx::query_as::<_, (JobStatus, i64)>(
            "SELECT status, COUNT(*) FROM jobs GROUP BY status",
        )
        .fetch_all(pool)
        .await?;

        let mut counts = JobCounts::default();
        for (status, count) in rows {
            counts.add(status, count);
        }
        Ok(counts)
    }

    /// Oldest queued job in FIFO order.
    pub async fn next_queued(pool: &PgPool) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM jobs \
             WHERE status = $1 \
             ORDER BY queued_at ASC, id ASC \
             LIMIT 1",
        )
        .bind(JobStatus::Queued)
        .fetch_optional(pool)
        .await
    }
}
