//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts
//! - Query/patch types where the entity supports them

pub mod job;
pub mod scene;
pub mod status;
pub mod video;
