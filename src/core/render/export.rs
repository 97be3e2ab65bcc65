//! Export Orchestrator
//!
//! Walks a compiled edit plan, renders one segment per clip and per gap
//! strictly sequentially, then concatenates everything into one output
//! file. A failed build never yields a silently incomplete artifact: any
//! unrecovered segment failure aborts the whole export, and the scratch
//! directory is removed on both success and failure paths.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};

use crate::core::{
    ffmpeg::{FFmpegError, MediaOp, OutputProfile},
    timeline::EditPlan,
    TimeMs,
};

use super::{exec::SegmentExec, segment::SegmentRenderer};

// =============================================================================
// Settings
// =============================================================================

/// Output container format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Mp4,
    Mov,
    Mkv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Mov => "mov",
            ExportFormat::Mkv => "mkv",
        }
    }
}

/// Export settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// Output width; `None` means "use source resolution"
    pub width: Option<u32>,
    /// Output height; `None` means "use source resolution"
    pub height: Option<u32>,
    pub fps: u32,
    /// Video bitrate for the re-encode concat fallback (e.g. "8M")
    pub video_bitrate: String,
    pub output_path: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Mp4,
            width: None,
            height: None,
            fps: 30,
            video_bitrate: "8M".to_string(),
            output_path: PathBuf::from("output.mp4"),
        }
    }
}

impl ExportSettings {
    /// Fast low-resolution settings for playback preview.
    pub fn preview(output_path: PathBuf) -> Self {
        Self {
            format: ExportFormat::Mp4,
            width: Some(1280),
            height: Some(720),
            fps: 30,
            video_bitrate: "2M".to_string(),
            output_path,
        }
    }
}

// =============================================================================
// Progress
// =============================================================================

/// Export phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportPhase {
    Segment,
    ListPrep,
    Finalize,
    Done,
}

/// Progress event delivered to the caller-supplied sink.
///
/// `total = clip count + gap count + 2`, computed up front, so
/// `current / total` is an exact fraction, never an estimate.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    pub phase: ExportPhase,
    pub current: u32,
    pub total: u32,
    pub message: String,
}

// =============================================================================
// Result & Errors
// =============================================================================

/// Export result
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub output_path: PathBuf,
    /// Total duration of the produced file in ms
    pub duration_ms: TimeMs,
    /// File size in bytes
    pub size_bytes: u64,
    /// Wall-clock encoding time in seconds
    pub encoding_time_sec: f64,
}

/// Export error
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No clips to export")]
    NoClips,

    #[error("Segment {scene} ({label}) failed: {source}")]
    SegmentFailed {
        scene: usize,
        label: String,
        source: FFmpegError,
    },

    #[error("Concatenation failed: {0}")]
    ConcatFailed(FFmpegError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export cancelled")]
    Cancelled,
}

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation token, checked only between segment boundaries —
/// an in-flight tool invocation cannot be interrupted without risking a
/// corrupt intermediate file.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// One scheduled render unit: a plan clip or a synthesized gap.
#[derive(Debug)]
enum Scene {
    Clip(usize),
    Gap { duration_ms: TimeMs },
}

/// Sequences segment rendering across a compiled plan and concatenates the
/// result. Rendering is strictly sequential — the encoding tool saturates
/// the machine per call, and sequential order keeps disk usage and
/// progress deterministic.
pub struct ExportOrchestrator<'a> {
    exec: &'a dyn SegmentExec,
}

impl<'a> ExportOrchestrator<'a> {
    pub fn new(exec: &'a dyn SegmentExec) -> Self {
        Self { exec }
    }

    /// Exports a plan to a single output file.
    pub async fn export(
        &self,
        plan: &EditPlan,
        settings: &ExportSettings,
        progress: Option<Sender<ExportProgress>>,
        cancel: Option<CancelToken>,
    ) -> Result<ExportResult, ExportError> {
        if plan.main.is_empty() {
            return Err(ExportError::NoClips);
        }

        // The requested container wins over whatever extension the caller put
        // on the output path; the muxer is inferred from the extension.
        let settings = ExportSettings {
            output_path: settings
                .output_path
                .with_extension(settings.format.extension()),
            ..settings.clone()
        };

        let started = Instant::now();

        // Per-run scratch directory; segment indexes in the filenames keep
        // concurrent export runs from colliding.
        let scratch = std::env::temp_dir().join(format!("cutlist-{}", ulid::Ulid::new()));
        tokio::fs::create_dir_all(&scratch).await?;

        let result = self
            .run(plan, &settings, &scratch, progress, cancel, started)
            .await;

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            warn!(scratch = %scratch.display(), error = %e, "failed to remove scratch directory");
        }

        result
    }

    async fn run(
        &self,
        plan: &EditPlan,
        settings: &ExportSettings,
        scratch: &PathBuf,
        progress: Option<Sender<ExportProgress>>,
        cancel: Option<CancelToken>,
        started: Instant,
    ) -> Result<ExportResult, ExportError> {
        let profile = resolve_profile(plan, settings);
        let scenes = schedule_scenes(plan);
        let total = scenes.len() as u32 + 2;

        let renderer = SegmentRenderer::new(self.exec, profile, scratch.clone());
        let mut segment_paths: Vec<PathBuf> = Vec::with_capacity(scenes.len());
        let mut duration_ms: TimeMs = 0;

        for (index, scene) in scenes.iter().enumerate() {
            if cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                return Err(ExportError::Cancelled);
            }

            let (path, label, scene_duration) = match scene {
                Scene::Clip(i) => {
                    let clip = &plan.main[*i];
                    let path = renderer.render_clip(clip, index).await.map_err(|source| {
                        ExportError::SegmentFailed {
                            scene: index,
                            label: format!("clip {}", clip.clip_id),
                            source,
                        }
                    })?;
                    let rendered = rendered_clip_duration(clip);
                    (path, format!("clip {}", clip.clip_id), rendered)
                }
                Scene::Gap { duration_ms: gap } => {
                    let path = renderer.render_gap(*gap, index).await.map_err(|source| {
                        ExportError::SegmentFailed {
                            scene: index,
                            label: format!("gap {gap}ms"),
                            source,
                        }
                    })?;
                    (path, format!("gap {gap}ms"), *gap)
                }
            };

            segment_paths.push(path);
            duration_ms += scene_duration;

            emit(
                &progress,
                ExportPhase::Segment,
                index as u32 + 1,
                total,
                format!("Rendered {label}"),
            )
            .await;
        }

        if cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(ExportError::Cancelled);
        }

        // Concat demuxer manifest referencing every segment in order.
        let manifest = scratch.join("concat.txt");
        let mut listing = String::new();
        for path in &segment_paths {
            let escaped = path.to_string_lossy().replace('\'', r"'\''");
            listing.push_str(&format!("file '{escaped}'\n"));
        }
        tokio::fs::write(&manifest, listing).await?;

        emit(
            &progress,
            ExportPhase::ListPrep,
            scenes.len() as u32 + 1,
            total,
            "Prepared segment list".to_string(),
        )
        .await;

        self.concatenate(&manifest, settings, profile).await?;

        emit(
            &progress,
            ExportPhase::Finalize,
            total,
            total,
            format!("Wrote {}", settings.output_path.display()),
        )
        .await;

        let size_bytes = tokio::fs::metadata(&settings.output_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        emit(
            &progress,
            ExportPhase::Done,
            total,
            total,
            "Export complete".to_string(),
        )
        .await;

        info!(
            output = %settings.output_path.display(),
            duration_ms,
            size_bytes,
            "export finished"
        );

        Ok(ExportResult {
            output_path: settings.output_path.clone(),
            duration_ms,
            size_bytes,
            encoding_time_sec: started.elapsed().as_secs_f64(),
        })
    }

    /// Stream-copy concat first — valid because every segment was
    /// normalized to one codec/resolution/frame-rate — falling back to a
    /// full re-encode at the requested bitrate.
    async fn concatenate(
        &self,
        manifest: &PathBuf,
        settings: &ExportSettings,
        profile: OutputProfile,
    ) -> Result<(), ExportError> {
        let copy = MediaOp::ConcatCopy {
            manifest: manifest.clone(),
            dest: settings.output_path.clone(),
        };
        match self.exec.execute(&copy).await {
            Ok(()) => return Ok(()),
            Err(FFmpegError::ExecutionFailed(e)) => {
                warn!(error = %e, "stream-copy concat failed, re-encoding");
            }
            Err(other) => return Err(ExportError::ConcatFailed(other)),
        }

        self.exec
            .execute(&MediaOp::ConcatEncode {
                manifest: manifest.clone(),
                profile,
                video_bitrate: settings.video_bitrate.clone(),
                dest: settings.output_path.clone(),
            })
            .await
            .map_err(ExportError::ConcatFailed)
    }
}

/// Target profile: explicit settings win, then the first clip's natural
/// dimensions (the "use source resolution" sentinel), then 1080p.
fn resolve_profile(plan: &EditPlan, settings: &ExportSettings) -> OutputProfile {
    if let (Some(w), Some(h)) = (settings.width, settings.height) {
        return OutputProfile::new(w, h, settings.fps);
    }
    if let Some(clip) = plan.main.iter().find(|c| c.width.is_some() && c.height.is_some()) {
        // Both are Some per the find predicate.
        if let (Some(w), Some(h)) = (clip.width, clip.height) {
            return OutputProfile::new(w, h, settings.fps);
        }
    }
    OutputProfile::new(1920, 1080, settings.fps)
}

/// Interleaves plan clips with the gap segments needed to keep the output
/// continuous, including a lead-in when the first clip starts past zero.
fn schedule_scenes(plan: &EditPlan) -> Vec<Scene> {
    let mut scenes = Vec::new();
    let mut cursor: TimeMs = 0;

    for (i, clip) in plan.main.iter().enumerate() {
        let gap = clip.start_ms - cursor;
        if gap > 0 {
            scenes.push(Scene::Gap { duration_ms: gap });
        }
        scenes.push(Scene::Clip(i));
        cursor = cursor.max(clip.end_ms);
    }

    scenes
}

/// Duration the rendered segment will declare: images play for their
/// timeline duration, video trims for their source trim.
fn rendered_clip_duration(clip: &crate::core::timeline::SeqClip) -> TimeMs {
    match clip.kind {
        crate::core::project::AssetKind::Image => clip.timeline_duration_ms(),
        _ => clip.trim_duration_ms(),
    }
}

async fn emit(
    progress: &Option<Sender<ExportProgress>>,
    phase: ExportPhase,
    current: u32,
    total: u32,
    message: String,
) {
    if let Some(tx) = progress {
        let _ = tx
            .send(ExportProgress {
                phase,
                current,
                total,
                message,
            })
            .await;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::project::{Asset, AssetKind, Clip, Project, Track, TrackMedia, TrackRole};
    use crate::core::render::testing::FakeExec;
    use crate::core::sources::LocalSources;
    use crate::core::timeline::build_plan;
    use tokio::sync::mpsc;

    fn plan_with_clips(clips: &[(TimeMs, TimeMs, TimeMs, TimeMs)]) -> EditPlan {
        let mut project = Project::new();
        let asset_id = project.add_asset(
            Asset::new(AssetKind::Video, "/media/a.mp4").with_dimensions(1920, 1080),
        );
        let track_id = project.add_track(Track::new(TrackRole::Main, TrackMedia::Video));
        for (in_ms, out_ms, start_ms, end_ms) in clips {
            project.add_clip(
                Clip::new(&asset_id, &track_id)
                    .with_trim(*in_ms, *out_ms)
                    .place_at(*start_ms, *end_ms),
            );
        }
        build_plan(&project, &LocalSources::new()).unwrap()
    }

    fn settings(dir: &std::path::Path) -> ExportSettings {
        ExportSettings {
            output_path: dir.join("out.mp4"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_plan_is_rejected() {
        let exec = FakeExec::new();
        let orchestrator = ExportOrchestrator::new(&exec);
        let plan = EditPlan {
            project_id: "p".to_string(),
            main: vec![],
        };
        let err = orchestrator
            .export(&plan, &ExportSettings::default(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NoClips));
    }

    #[tokio::test]
    async fn test_single_clip_round_trip_duration() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = FakeExec::new();
        let orchestrator = ExportOrchestrator::new(&exec);
        let plan = plan_with_clips(&[(0, 2000, 0, 2000)]);

        let result = orchestrator
            .export(&plan, &settings(tmp.path()), None, None)
            .await
            .unwrap();
        assert_eq!(result.duration_ms, 2000);
    }

    #[tokio::test]
    async fn test_gap_between_clips_is_synthesized_exactly_once() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = FakeExec::new();
        let orchestrator = ExportOrchestrator::new(&exec);
        let plan = plan_with_clips(&[(0, 2000, 0, 2000), (0, 2000, 3000, 5000)]);

        let result = orchestrator
            .export(&plan, &settings(tmp.path()), None, None)
            .await
            .unwrap();
        assert_eq!(result.duration_ms, 5000);

        let ops = exec.ops();
        let gaps: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                MediaOp::ColorClip { duration_ms, .. } => Some(*duration_ms),
                _ => None,
            })
            .collect();
        assert_eq!(gaps, vec![1000]);
    }

    #[tokio::test]
    async fn test_progress_events_are_exact_and_monotonic() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = FakeExec::new();
        let orchestrator = ExportOrchestrator::new(&exec);
        let plan = plan_with_clips(&[(0, 2000, 0, 2000), (0, 2000, 3000, 5000)]);

        let (tx, mut rx) = mpsc::channel(32);
        orchestrator
            .export(&plan, &settings(tmp.path()), Some(tx), None)
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }

        // 2 clips + 1 gap + 2 bookkeeping ticks.
        assert!(events.iter().all(|e| e.total == 5));
        let currents: Vec<u32> = events.iter().map(|e| e.current).collect();
        let mut sorted = currents.clone();
        sorted.sort_unstable();
        assert_eq!(currents, sorted, "progress must never go backwards");
        assert_eq!(events.last().unwrap().phase, ExportPhase::Done);
        assert_eq!(events.last().unwrap().current, 5);
        assert_eq!(
            events.iter().filter(|e| e.phase == ExportPhase::Segment).count(),
            3
        );
    }

    #[tokio::test]
    async fn test_concat_copy_failure_falls_back_to_encode() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = FakeExec::new().fail_copy_ops();
        let orchestrator = ExportOrchestrator::new(&exec);
        let plan = plan_with_clips(&[(0, 2000, 0, 2000)]);

        orchestrator
            .export(&plan, &settings(tmp.path()), None, None)
            .await
            .unwrap();

        let ops = exec.ops();
        assert!(ops.iter().any(|op| matches!(op, MediaOp::ConcatCopy { .. })));
        assert!(ops.iter().any(|op| matches!(op, MediaOp::ConcatEncode { .. })));
    }

    #[tokio::test]
    async fn test_segment_failure_aborts_whole_export() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = FakeExec::new().fail_all_ops();
        let orchestrator = ExportOrchestrator::new(&exec);
        let plan = plan_with_clips(&[(0, 2000, 0, 2000), (0, 2000, 3000, 5000)]);

        let err = orchestrator
            .export(&plan, &settings(tmp.path()), None, None)
            .await
            .unwrap_err();
        let ExportError::SegmentFailed { scene, label, .. } = err else {
            panic!("expected SegmentFailed");
        };
        assert_eq!(scene, 0);
        assert!(label.starts_with("clip "));
        // Nothing gets concatenated after a segment failure.
        assert!(!exec
            .ops()
            .iter()
            .any(|op| matches!(op, MediaOp::ConcatCopy { .. } | MediaOp::ConcatEncode { .. })));
    }

    #[tokio::test]
    async fn test_cancellation_between_segments() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = FakeExec::new();
        let orchestrator = ExportOrchestrator::new(&exec);
        let plan = plan_with_clips(&[(0, 2000, 0, 2000)]);

        let token = CancelToken::new();
        token.cancel();
        let err = orchestrator
            .export(&plan, &settings(tmp.path()), None, Some(token))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Cancelled));
        assert!(exec.ops().is_empty());
    }

    #[tokio::test]
    async fn test_leading_gap_fills_from_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = FakeExec::new();
        let orchestrator = ExportOrchestrator::new(&exec);
        let plan = plan_with_clips(&[(0, 2000, 1000, 3000)]);

        let result = orchestrator
            .export(&plan, &settings(tmp.path()), None, None)
            .await
            .unwrap();
        assert_eq!(result.duration_ms, 3000);

        let ops = exec.ops();
        assert!(matches!(ops[0], MediaOp::ColorClip { duration_ms: 1000, .. }));
    }

    #[tokio::test]
    async fn test_requested_container_overrides_output_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = FakeExec::new();
        let orchestrator = ExportOrchestrator::new(&exec);
        let plan = plan_with_clips(&[(0, 2000, 0, 2000)]);

        let mut s = settings(tmp.path());
        s.format = ExportFormat::Mkv;

        let result = orchestrator.export(&plan, &s, None, None).await.unwrap();
        assert_eq!(result.output_path.extension().unwrap(), "mkv");

        let ops = exec.ops();
        let MediaOp::ConcatCopy { dest, .. } = ops
            .iter()
            .find(|op| matches!(op, MediaOp::ConcatCopy { .. }))
            .unwrap()
        else {
            unreachable!();
        };
        assert_eq!(dest.extension().unwrap(), "mkv");
    }

    #[tokio::test]
    async fn test_explicit_resolution_overrides_source() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = FakeExec::new();
        let orchestrator = ExportOrchestrator::new(&exec);
        let plan = plan_with_clips(&[(0, 2000, 0, 2000)]);

        let mut s = settings(tmp.path());
        s.width = Some(1280);
        s.height = Some(720);
        orchestrator.export(&plan, &s, None, None).await.unwrap();

        // Source is 1920x1080 and the target is 720p, so the renderer must
        // re-encode rather than stream-copy.
        let ops = exec.ops();
        assert!(matches!(ops[0], MediaOp::TrimEncode { ref profile, .. } if profile.width == 1280));
    }
}
