//! Scene entity models. Scenes are written once, by a completed
//! `scene_detection` job, and never updated.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use scenecast_core::types::{DbId, Timestamp};

/// A row from the `scenes` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Scene {
    pub id: DbId,
    pub video_id: DbId,
    pub job_id: DbId,
    pub scene_index: i32,
    pub start_secs: f64,
    pub end_secs: f64,
    pub confidence: f64,
    pub created_at: Timestamp,
}

/// A detected scene boundary before it is attributed and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScene {
    pub scene_index: i32,
    pub start_secs: f64,
    pub end_secs: f64,
    pub confidence: f64,
}
