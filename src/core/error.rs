//! Cutlist Error Definitions
//!
//! Defines error types used throughout the engine.

use thiserror::Error;

use super::{ClipId, TimeMs};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Timeline Errors
    // =========================================================================
    #[error("Invalid clip timing for clip {clip_id}: {detail}")]
    InvalidClipTiming { clip_id: ClipId, detail: String },

    #[error(
        "Clip overlap on main sequence: clip {first} ({first_start}~{first_end}ms) \
         overlaps clip {second} ({second_start}~{second_end}ms)"
    )]
    ClipOverlap {
        first: ClipId,
        first_start: TimeMs,
        first_end: TimeMs,
        second: ClipId,
        second_start: TimeMs,
        second_end: TimeMs,
    },

    // =========================================================================
    // Source Resolution Errors
    // =========================================================================
    #[error("Unsupported source locator: {0}")]
    UnsupportedSource(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;
