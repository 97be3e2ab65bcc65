//! Segment Renderer
//!
//! Renders one timeline clip, still image or gap into a standalone,
//! independently decodable media file. Every variant normalizes to the
//! same output profile so the concatenation step never transcodes at a
//! segment boundary.

use std::path::PathBuf;

use tracing::warn;

use crate::core::{
    ffmpeg::{FFmpegError, FFmpegResult, MediaOp, OutputProfile},
    project::AssetKind,
    timeline::SeqClip,
    TimeMs,
};

use super::exec::SegmentExec;

/// Renders individual segments into a per-export scratch directory.
///
/// Intermediate filenames embed a per-run monotonic index, which is what
/// keeps concurrently running exports from colliding — there is no locking.
pub struct SegmentRenderer<'a> {
    exec: &'a dyn SegmentExec,
    profile: OutputProfile,
    scratch: PathBuf,
}

impl<'a> SegmentRenderer<'a> {
    pub fn new(exec: &'a dyn SegmentExec, profile: OutputProfile, scratch: impl Into<PathBuf>) -> Self {
        Self {
            exec,
            profile,
            scratch: scratch.into(),
        }
    }

    pub fn profile(&self) -> OutputProfile {
        self.profile
    }

    /// Renders one plan clip (video trim or image loop) as segment `index`.
    pub async fn render_clip(&self, clip: &SeqClip, index: usize) -> FFmpegResult<PathBuf> {
        let dest = self.scratch.join(format!("seg-{index:04}.mp4"));

        match clip.kind {
            AssetKind::Image => {
                self.exec
                    .execute(&MediaOp::ImageLoop {
                        src: clip.src.clone(),
                        duration_ms: clip.timeline_duration_ms(),
                        profile: self.profile,
                        dest: dest.clone(),
                    })
                    .await?;
            }
            AssetKind::Video => {
                self.render_video_trim(clip, &dest).await?;
            }
            AssetKind::Audio => {
                // The plan builder keeps audio clips out of the main sequence.
                return Err(FFmpegError::InvalidInput(format!(
                    "audio clip {} cannot be rendered as a video segment",
                    clip.clip_id
                )));
            }
        }

        Ok(dest)
    }

    /// Synthesizes a solid-color, silent filler segment as segment `index`.
    pub async fn render_gap(&self, duration_ms: TimeMs, index: usize) -> FFmpegResult<PathBuf> {
        let dest = self.scratch.join(format!("gap-{index:04}.mp4"));
        self.exec
            .execute(&MediaOp::ColorClip {
                duration_ms,
                profile: self.profile,
                dest: dest.clone(),
            })
            .await?;
        Ok(dest)
    }

    /// Zero-copy extraction first when no resolution change is required;
    /// on tool failure fall back once to a normalized re-encode. Whether a
    /// container survives stream-copy cannot be predicted up front, so the
    /// non-zero exit is the trigger.
    async fn render_video_trim(&self, clip: &SeqClip, dest: &PathBuf) -> FFmpegResult<()> {
        let info = self.exec.probe(&clip.src).await?;
        let has_audio = info.audio.is_some();

        let (src_w, src_h) = match (clip.width, clip.height) {
            (Some(w), Some(h)) => (Some(w), Some(h)),
            _ => info.video.as_ref().map_or((None, None), |v| (Some(v.width), Some(v.height))),
        };
        let copy_eligible =
            src_w == Some(self.profile.width) && src_h == Some(self.profile.height);

        if copy_eligible {
            let copy = MediaOp::TrimCopy {
                src: clip.src.clone(),
                in_ms: clip.in_ms,
                out_ms: clip.out_ms,
                dest: dest.clone(),
            };
            match self.exec.execute(&copy).await {
                Ok(()) => return Ok(()),
                Err(FFmpegError::ExecutionFailed(e)) => {
                    warn!(
                        clip_id = %clip.clip_id,
                        error = %e,
                        "stream-copy trim failed, re-encoding"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        self.exec
            .execute(&MediaOp::TrimEncode {
                src: clip.src.clone(),
                in_ms: clip.in_ms,
                out_ms: clip.out_ms,
                has_audio,
                profile: self.profile,
                dest: dest.clone(),
            })
            .await
    }
}

// =============================================================================
// Tests
// =============================================================================
