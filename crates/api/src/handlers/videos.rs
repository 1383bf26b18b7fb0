//! Handlers for the `/videos` resource: upload, lookup and streaming.

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use scenecast_core::error::CoreError;
use scenecast_core::types::DbId;
use scenecast_core::video_files::{content_type_for_extension, validate_video_filename};
use scenecast_db::models::job::{Job, JobFilter, SubmitJob};
use scenecast_db::models::status::JobType;
use scenecast_db::models::video::{NewVideo, Video};
use scenecast_events::LiveEvent;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Largest slice served for an open-ended range (`bytes=N-`).
const MAX_CHUNK_SIZE: u64 = 1024 * 1024;

/// Response body for `POST /api/v1/videos`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub video: Video,
    /// The automatically submitted `scene_detection` job, if any.
    pub job: Option<Job>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_video(state: &AppState, id: DbId) -> AppResult<Video> {
    state
        .store
        .get_video(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Video",
            id,
        }))
}

fn parse_bool(field: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(AppError::BadRequest(format!(
            "{field} must be a boolean, got '{other}'"
        ))),
    }
}

fn parse_duration(value: &str) -> AppResult<f64> {
    match value.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(AppError::BadRequest(format!(
            "duration_secs must be a non-negative number, got '{value}'"
        ))),
    }
}

/// Parse a `Range: bytes=START-[END]` header value.
fn parse_range_header(range: &str) -> Option<(u64, Option<u64>)> {
    let range = range.strip_prefix("bytes=")?;
    let (start, end) = range.split_once('-')?;
    let start = start.trim().parse::<u64>().ok()?;
    let end = match end.trim() {
        "" => None,
        end => Some(end.parse::<u64>().ok()?),
    };
    Some((start, end))
}

/// The blob received from the `file` field.
struct StoredFile {
    filename: String,
    key: String,
    ext: String,
    size: u64,
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// POST /api/v1/videos
///
/// Multipart form with a `file` part plus optional `duration_secs` and
/// `auto_detect` text parts. The file is streamed into blob storage, the
/// video row is created and announced with `video_uploaded`, and a
/// `scene_detection` job is submitted unless auto-detection is off.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut stored: Option<StoredFile> = None;
    let mut duration_secs: Option<f64> = None;
    let mut auto_detect = state.config.auto_detect_scenes;

    let form = async {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    if stored.is_some() {
                        return Err(AppError::BadRequest(
                            "Only one file may be uploaded per request".into(),
                        ));
                    }
                    let filename = field
                        .file_name()
                        .map(str::to_string)
                        .ok_or_else(|| AppError::BadRequest("file part has no filename".into()))?;
                    let ext = validate_video_filename(&filename)?;
                    let key = format!("{}.{ext}", uuid::Uuid::new_v4());

                    let size = state
                        .blobs
                        .store_stream(&key, Box::pin(field), state.config.max_upload_bytes as u64)
                        .await?;
                    stored = Some(StoredFile {
                        filename,
                        key,
                        ext,
                        size,
                    });
                }
                Some("duration_secs") => {
                    duration_secs = Some(parse_duration(&field.text().await?)?);
                }
                Some("auto_detect") => {
                    auto_detect = parse_bool("auto_detect", &field.text().await?)?;
                }
                _ => {}
            }
        }
        Ok::<(), AppError>(())
    }
    .await;

    let file = match (form, stored) {
        (Ok(()), Some(file)) => file,
        (Ok(()), None) => {
            return Err(AppError::BadRequest("Missing 'file' field".into()));
        }
        (Err(e), stored) => {
            if let Some(file) = stored {
                discard_blob(&state, &file.key).await;
            }
            return Err(e);
        }
    };

    if file.size == 0 {
        discard_blob(&state, &file.key).await;
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }

    let created = state
        .store
        .create_video(&NewVideo {
            filename: file.filename,
            storage_key: file.key.clone(),
            content_type: content_type_for_extension(&file.ext).to_string(),
            size_bytes: file.size as i64,
            duration_secs,
        })
        .await;
    let video = match created {
        Ok(video) => video,
        Err(e) => {
            discard_blob(&state, &file.key).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        video_id = video.id,
        size_bytes = video.size_bytes,
        storage_key = %video.storage_key,
        "Video uploaded",
    );
    state.event_bus.publish(LiveEvent::video_uploaded(&video));

    let job = if auto_detect {
        let submitted = state
            .queue
            .submit(SubmitJob {
                video_id: video.id,
                job_type: JobType::SceneDetection.as_str().to_string(),
                payload: None,
            })
            .await;
        match submitted {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::error!(video_id = video.id, error = %e, "Failed to submit scene detection");
                None
            }
        }
    } else {
        None
    };

    // Re-read so the response reflects the status set by the submission.
    let video = state.store.get_video(video.id).await?.unwrap_or(video);

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UploadResponse { video, job },
        }),
    ))
}

async fn discard_blob(state: &AppState, key: &str) {
    if let Err(e) = state.blobs.delete(key).await {
        tracing::warn!(storage_key = key, error = %e, "Failed to remove orphaned upload");
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/videos
pub async fn list_videos(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let videos = state
        .store
        .list_videos(params.limit(), params.offset())
        .await?;
    Ok(Json(DataResponse { data: videos }))
}

/// GET /api/v1/videos/{id}
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let video = find_video(&state, video_id).await?;
    Ok(Json(DataResponse { data: video }))
}

/// GET /api/v1/videos/{id}/scenes
///
/// Scenes ordered by index. Empty until a `scene_detection` job completes.
pub async fn list_scenes(
    State(state): State<AppState>,
    Path(video_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_video(&state, video_id).await?;
    let scenes = state.store.list_scenes(video_id).await?;
    Ok(Json(DataResponse { data: scenes }))
}

/// GET /api/v1/videos/{id}/jobs
pub async fn list_video_jobs(
    State(state): State<AppState>,
    Path(video_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    find_video(&state, video_id).await?;
    let filter = JobFilter {
        video_id: Some(video_id),
        limit: params.limit,
        offset: params.offset,
        ..Default::default()
    };
    let jobs = state.store.get_jobs(&filter).await?;
    Ok(Json(DataResponse { data: jobs }))
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// GET /api/v1/videos/{id}/stream
///
/// Streams the uploaded file with HTTP range request support. A range
/// without an end is served in chunks of at most 1 MiB.
pub async fn stream_video(
    State(state): State<AppState>,
    Path(video_id): Path<DbId>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let video = find_video(&state, video_id).await?;
    let file_size = state.blobs.size(&video.storage_key).await?;

    if let Some(range_value) = headers.get(header::RANGE) {
        let range_str = range_value
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid Range header".into()))?;

        if let Some((start, end)) = parse_range_header(range_str) {
            let last = file_size.saturating_sub(1);
            let end = end
                .map(|e| e.min(last))
                .unwrap_or_else(|| start.saturating_add(MAX_CHUNK_SIZE - 1).min(last));

            if file_size == 0 || start >= file_size || start > end {
                return Ok((
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    [(header::CONTENT_RANGE, format!("bytes */{file_size}"))],
                )
                    .into_response());
            }

            let length = end - start + 1;
            let reader = state
                .blobs
                .open_range(&video.storage_key, start, length)
                .await?;

            return Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, video.content_type.clone()),
                    (header::CONTENT_LENGTH, length.to_string()),
                    (
                        header::CONTENT_RANGE,
                        format!("bytes {start}-{end}/{file_size}"),
                    ),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                Body::from_stream(ReaderStream::new(reader)),
            )
                .into_response());
        }
    }

    let file = state.blobs.open(&video.storage_key).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, video.content_type.clone()),
            (header::CONTENT_LENGTH, file_size.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranges() {
        assert_eq!(parse_range_header("bytes=0-99"), Some((0, Some(99))));
        assert_eq!(parse_range_header("bytes=100-"), Some((100, None)));
        assert_eq!(parse_range_header("bytes=-100"), None);
        assert_eq!(parse_range_header("items=0-1"), None);
        assert_eq!(parse_range_header("bytes=a-b"), None);
    }

    #[test]
    fn parses_form_booleans() {
        assert!(parse_bool("auto_detect", "TRUE").unwrap());
        assert!(!parse_bool("auto_detect", "0").unwrap());
        assert!(parse_bool("auto_detect", "maybe").is_err());
    }

    #[test]
    fn rejects_negative_durations() {
        assert_eq!(parse_duration("12.5").unwrap(), 12.5);
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("NaN").is_err());
    }
}
