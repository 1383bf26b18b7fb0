//! Upload validation and content-type helpers for video files.

use crate::error::CoreError;

/// File extensions accepted by the upload endpoint.
pub const SUPPORTED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "webm", "mov", "mkv", "avi"];

/// Return the lowercase extension of `filename`, if it has one.
pub fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Validate an uploaded filename and return its normalized extension.
pub fn validate_video_filename(filename: &str) -> Result<String, CoreError> {
    let ext = extension(filename).ok_or_else(|| {
        CoreError::Validation(format!("File '{filename}' has no extension"))
    })?;

    if SUPPORTED_VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(CoreError::Validation(format!(
            "Unsupported video format '.{ext}'. Supported: {SUPPORTED_VIDEO_EXTENSIONS:?}"
        )))
    }
}

/// Guess a Content-Type from a file extension.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}
