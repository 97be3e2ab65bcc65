//! Segment Execution Seam
//!
//! The renderer invokes the encode capability through this trait so the
//! host can swap the external-process implementation for a sandboxed
//! in-process one at startup, instead of branching inside the renderer.

use std::path::Path;

use async_trait::async_trait;

use crate::core::ffmpeg::{FFmpegResult, FFmpegRunner, MediaInfo, MediaOp};

/// Opaque executor for declarative media operations.
#[async_trait]
pub trait SegmentExec: Send + Sync {
    /// Runs one operation to completion; a returned error is the only
    /// signal that triggers the copy-to-re-encode fallback.
    async fn execute(&self, op: &MediaOp) -> FFmpegResult<()>;

    /// Inspects a source file (duration, streams, dimensions).
    async fn probe(&self, input: &Path) -> FFmpegResult<MediaInfo>;
}

#[async_trait]
impl SegmentExec for FFmpegRunner {
    async fn execute(&self, op: &MediaOp) -> FFmpegResult<()> {
        FFmpegRunner::execute(self, op).await
    }

    async fn probe(&self, input: &Path) -> FFmpegResult<MediaInfo> {
        FFmpegRunner::probe(self, input).await
    }
}
