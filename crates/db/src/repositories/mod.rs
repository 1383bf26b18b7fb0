//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod scene_repo;
pub mod video_repo;

pub use job_repo::JobRepo;
pub use scene_repo::SceneRepo;
pub use video_repo::VideoRepo;
