//! Rendering pipeline: per-segment rendering and whole-timeline export

mod exec;
mod export;
mod segment;

pub use exec::SegmentExec;
pub use export::{
    CancelToken, ExportError, ExportFormat, ExportOrchestrator, ExportPhase, ExportProgress,
    ExportResult, ExportSettings,
};
pub use segment::SegmentRenderer;

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::core::ffmpeg::{
        AudioStreamInfo, FFmpegError, FFmpegResult, MediaInfo, MediaOp, VideoStreamInfo,
    };

    use super::SegmentExec;

    /// Records every executed operation instead of spawning processes.
    /// Probes always report a 1920x1080 30fps h264 source.
    pub struct FakeExec {
        ops: Mutex<Vec<MediaOp>>,
        fail_copy: bool,
        fail_all: bool,
        has_audio: bool,
    }

    impl FakeExec {
        pub fn new() -> Self {
            Self {
                ops: Mutex::new(Vec::new()),
                fail_copy: false,
                fail_all: false,
                has_audio: true,
            }
        }

        /// Fail stream-copy operations (TrimCopy, ConcatCopy), forcing
        /// the re-encode fallbacks.
        pub fn fail_copy_ops(mut self) -> Self {
            self.fail_copy = true;
            self
        }

        /// Fail every operation.
        pub fn fail_all_ops(mut self) -> Self {
            self.fail_all = true;
            self
        }

        /// Probe reports no audio stream.
        pub fn without_audio(mut self) -> Self {
            self.has_audio = false;
            self
        }

        /// Every operation executed so far, in order.
        pub fn ops(&self) -> Vec<MediaOp> {
            self.ops.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SegmentExec for FakeExec {
        async fn execute(&self, op: &MediaOp) -> FFmpegResult<()> {
            self.ops.lock().unwrap().push(op.clone());
            let is_copy = matches!(op, MediaOp::TrimCopy { .. } | MediaOp::ConcatCopy { .. });
            if self.fail_all || (self.fail_copy && is_copy) {
                return Err(FFmpegError::ExecutionFailed("simulated failure".to_string()));
            }
            Ok(())
        }

        async fn probe(&self, _input: &Path) -> FFmpegResult<MediaInfo> {
            Ok(MediaInfo {
                duration_ms: 60_000,
                video: Some(VideoStreamInfo {
                    width: 1920,
                    height: 1080,
                    fps: 30.0,
                    codec: "h264".to_string(),
                    pixel_format: "yuv420p".to_string(),
                }),
                audio: self.has_audio.then(|| AudioStreamInfo {
                    sample_rate: 48_000,
                    channels: 2,
                    codec: "aac".to_string(),
                }),
                format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                size_bytes: 1_000_000,
            })
        }
    }
}
