//! The `{type, data}` envelope pushed to live-update subscribers.

use serde::{Deserialize, Serialize};
use scenecast_core::job_events::{
    MSG_TYPE_JOB_CANCELLED, MSG_TYPE_JOB_COMPLETED, MSG_TYPE_JOB_FAILED, MSG_TYPE_JOB_PROGRESS,
    MSG_TYPE_JOB_RETRIED, MSG_TYPE_VIDEO_UPLOADED,
};
use scenecast_db::models::job::Job;
use scenecast_db::models::video::Video;

/// Discriminant of a [`LiveEvent`]. Serialized as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveEventKind {
    VideoUploaded,
    JobProgress,
    JobCompleted,
    JobFailed,
    JobCancelled,
    JobRetried,
}

impl LiveEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VideoUploaded => MSG_TYPE_VIDEO_UPLOADED,
            Self::JobProgress => MSG_TYPE_JOB_PROGRESS,
            Self::JobCompleted => MSG_TYPE_JOB_COMPLETED,
            Self::JobFailed => MSG_TYPE_JOB_FAILED,
            Self::JobCancelled => MSG_TYPE_JOB_CANCELLED,
            Self::JobRetried => MSG_TYPE_JOB_RETRIED,
        }
    }

    /// Whether this kind carries `data.job` (every kind but `video_uploaded`).
    pub fn is_job_event(self) -> bool {
        self != Self::VideoUploaded
    }
}

impl std::fmt::Display for LiveEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message on the live channel.
///
/// Job events carry `data.job`, `video_uploaded` carries `data.video`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    #[serde(rename = "type")]
    pub kind: LiveEventKind,
    pub data: serde_json::Value,
}

impl LiveEvent {
    /// Build a job lifecycle event from the persisted row.
    pub fn job(kind: LiveEventKind, job: &Job) -> Self {
        Self {
            kind,
            data: serde_json::json!({ "job": job }),
        }
    }

    pub fn video_uploaded(video: &Video) -> Self {
        Self {
            kind: LiveEventKind::VideoUploaded,
            data: serde_json::json!({ "video": video }),
        }
    }

    /// Id of the job this event is about, if any.
    pub fn job_id(&self) -> Option<i64> {
        self.data.get("job")?.get("id")?.as_i64()
    }

    /// Serialize to the JSON text frame sent over the socket.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenecast_core::job_events::ALL_MSG_TYPES;
    use scenecast_db::models::status::{JobStatus, JobType, VideoStatus};

    fn sample_job() -> Job {
        let now = chrono::Utc::now();
        Job {
            id: 11,
            video_id: 3,
            job_type: JobType::SceneDetection,
            status: JobStatus::Processing,
            progress: 20,
            error: None,
            payload: serde_json::json!({}),
            data: None,
            queued_at: now,
            started_at: Some(now),
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn kind_serializes_to_wire_names() {
        let kinds = [
            LiveEventKind::VideoUploaded,
            LiveEventKind::JobProgress,
            LiveEventKind::JobCompleted,
            LiveEventKind::JobFailed,
            LiveEventKind::JobCancelled,
            LiveEventKind::JobRetried,
        ];
        for (kind, expected) in kinds.iter().zip(ALL_MSG_TYPES) {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, expected);
            assert_eq!(kind.as_str(), expected);
        }
    }

    #[test]
    fn job_event_wraps_job_under_data() {
        let event = LiveEvent::job(LiveEventKind::JobProgress, &sample_job());
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "job_progress");
        assert_eq!(json["data"]["job"]["id"], 11);
        assert_eq!(json["data"]["job"]["status"], "processing");
        assert_eq!(json["data"]["job"]["progress"], 20);
        assert_eq!(event.job_id(), Some(11));
    }

    #[test]
    fn video_event_wraps_video_under_data() {
        let now = chrono::Utc::now();
        let video = Video {
            id: 5,
            filename: "clip.mp4".into(),
            storage_key: "abc.mp4".into(),
            content_type: "video/mp4".into(),
            size_bytes: 10,
            duration_secs: None,
            status: VideoStatus::Uploaded,
            created_at: now,
            updated_at: now,
        };
        let event = LiveEvent::video_uploaded(&video);

        assert_eq!(event.kind, LiveEventKind::VideoUploaded);
        assert!(!event.kind.is_job_event());
        assert_eq!(event.data["video"]["filename"], "clip.mp4");
        assert_eq!(event.job_id(), None);
    }
}
