//! Edit Plan Compilation
//!
//! Flattens a project's tracks into one time-ordered clip sequence ready
//! for rendering, and answers the visible-clip query used by scrubbing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{
    project::{AssetKind, Project, TrackRole},
    sources::SourceResolver,
    ClipId, CoreError, CoreResult, ProjectId, TimeMs,
};

// =============================================================================
// Plan Types
// =============================================================================

/// Canvas transform carried by an overlay clip
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayTransform {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub opacity: f64,
}

/// One resolved, renderable unit of an edit plan
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeqClip {
    pub clip_id: ClipId,
    /// Resolved, readable source path
    pub src: PathBuf,
    pub kind: AssetKind,
    pub in_ms: TimeMs,
    pub out_ms: TimeMs,
    pub start_ms: TimeMs,
    pub end_ms: TimeMs,
    /// Natural source width, when known (drives aspect-preserving scale)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Present only for clips on overlay-role tracks with a canvas node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<OverlayTransform>,
}

impl SeqClip {
    /// Source trim duration in ms
    pub fn trim_duration_ms(&self) -> TimeMs {
        self.out_ms - self.in_ms
    }

    /// Timeline duration in ms
    pub fn timeline_duration_ms(&self) -> TimeMs {
        self.end_ms - self.start_ms
    }
}

/// Compiled, time-ordered representation of a timeline ready for rendering.
///
/// Ephemeral: rebuilt fresh per build/export/preview invocation, never
/// persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPlan {
    pub project_id: ProjectId,
    /// Flattened main sequence, sorted ascending by `start_ms`
    pub main: Vec<SeqClip>,
}

impl EditPlan {
    /// Returns the clip covering timestamp `t_ms`, for scrubbing/preview.
    ///
    /// First main-sequence clip with `start_ms <= t < end_ms`; correctness
    /// rests on the non-overlap invariant the builder validates.
    pub fn visible_clip_at(&self, t_ms: TimeMs) -> Option<&SeqClip> {
        self.main
            .iter()
            .find(|c| c.start_ms <= t_ms && t_ms < c.end_ms)
    }

    /// Timeline end of the last clip, in ms
    pub fn duration_ms(&self) -> TimeMs {
        self.main.iter().map(|c| c.end_ms).max().unwrap_or(0)
    }
}

// =============================================================================
// Plan Builder
// =============================================================================

/// Compiles a project into an edit plan with one merged main sequence.
///
/// Tracks are visited in sorted-id order and clips in their track order, so
/// two builds of the same project yield an identical sequence. Clips whose
/// Clip or Asset record is missing are skipped, tolerating partially-synced
/// state; invalid clip timing is fatal and names the offending clip.
pub fn build_plan(project: &Project, sources: &dyn SourceResolver) -> CoreResult<EditPlan> {
    let mut main: Vec<SeqClip> = Vec::new();
    let mut overlay: Vec<SeqClip> = Vec::new();

    let mut track_ids: Vec<&String> = project.tracks.keys().collect();
    track_ids.sort();

    for track_id in track_ids {
        let track = &project.tracks[track_id];
        for clip_id in &track.clip_order {
            let Some(clip) = project.clips.get(clip_id) else {
                warn!(%clip_id, "clip record missing, skipping");
                continue;
            };
            let Some(asset) = project.assets.get(&clip.asset_id) else {
                warn!(%clip_id, asset_id = %clip.asset_id, "asset record missing, skipping");
                continue;
            };
            if asset.kind == AssetKind::Audio {
                // The linearized main sequence is video-only; audio mixing
                // is not part of the segment pipeline.
                warn!(%clip_id, "audio clip not part of the main sequence, skipping");
                continue;
            }

            if clip.out_ms <= clip.in_ms {
                return Err(CoreError::InvalidClipTiming {
                    clip_id: clip.id.clone(),
                    detail: format!("outMs ({}) <= inMs ({})", clip.out_ms, clip.in_ms),
                });
            }
            if clip.end_ms <= clip.start_ms {
                return Err(CoreError::InvalidClipTiming {
                    clip_id: clip.id.clone(),
                    detail: format!("endMs ({}) <= startMs ({})", clip.end_ms, clip.start_ms),
                });
            }

            let src = sources.resolve(&asset.src)?;

            let transform = if track.role == TrackRole::Overlay {
                project
                    .canvas
                    .values()
                    .find(|n| &n.clip_id == clip_id)
                    .map(|n| OverlayTransform {
                        x: n.x,
                        y: n.y,
                        width: n.width,
                        height: n.height,
                        rotation: n.rotation,
                        opacity: n.opacity,
                    })
            } else {
                None
            };

            let seq_clip = SeqClip {
                clip_id: clip.id.clone(),
                src,
                kind: asset.kind,
                in_ms: clip.in_ms,
                out_ms: clip.out_ms,
                start_ms: clip.start_ms,
                end_ms: clip.end_ms,
                width: asset.width,
                height: asset.height,
                transform,
            };

            match track.role {
                TrackRole::Main => main.push(seq_clip),
                TrackRole::Overlay => overlay.push(seq_clip),
            }
        }
    }

    main.sort_by_key(|c| c.start_ms);
    overlay.sort_by_key(|c| c.start_ms);

    validate_non_overlap(&main)?;

    // Overlay clips are merged into the main sequence and played
    // back-to-back instead of composited. Placeholder until true
    // picture-in-picture layering lands in the renderer.
    main.extend(overlay);
    main.sort_by_key(|c| c.start_ms);

    Ok(EditPlan {
        project_id: project.id.clone(),
        main,
    })
}

/// Builds a plan straight from serialized project JSON.
pub fn plan_from_json(json: &str, sources: &dyn SourceResolver) -> CoreResult<EditPlan> {
    let project: Project = serde_json::from_str(json)?;
    build_plan(&project, sources)
}

/// Main-track clips must not overlap. The placement resolver guarantees
/// this upstream; the builder re-checks it so callers that bypassed the
/// resolver cannot silently corrupt a build.
fn validate_non_overlap(sorted: &[SeqClip]) -> CoreResult<()> {
    for pair in sorted.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.start_ms < prev.end_ms {
            return Err(CoreError::ClipOverlap {
                first: prev.clip_id.clone(),
                first_start: prev.start_ms,
                first_end: prev.end_ms,
                second: next.clip_id.clone(),
                second_start: next.start_ms,
                second_end: next.end_ms,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
