//! Declarative Media Operations
//!
//! The renderer speaks in a fixed set of declarative operations; this
//! module turns each one into an ffmpeg argument vector. Keeping argv
//! construction in one place means every segment normalizes to the same
//! frame rate, pixel format and resolution, so concatenation never needs
//! to transcode at a segment boundary.

use std::path::PathBuf;

use crate::core::{ms_to_secs_arg, TimeMs};

/// Uniform target every segment normalizes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for OutputProfile {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
        }
    }
}

impl OutputProfile {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }
}

/// One declarative encode/decode operation
#[derive(Debug, Clone, PartialEq)]
pub enum MediaOp {
    /// Lossless stream-copy trim of an already-encoded source
    TrimCopy {
        src: PathBuf,
        in_ms: TimeMs,
        out_ms: TimeMs,
        dest: PathBuf,
    },
    /// Normalizing re-encode trim (fallback, or when scaling is required)
    TrimEncode {
        src: PathBuf,
        in_ms: TimeMs,
        out_ms: TimeMs,
        has_audio: bool,
        profile: OutputProfile,
        dest: PathBuf,
    },
    /// Loop a still image for a fixed duration, scaled to fit and padded
    ImageLoop {
        src: PathBuf,
        duration_ms: TimeMs,
        profile: OutputProfile,
        dest: PathBuf,
    },
    /// Synthesize a solid-color, silent filler segment
    ColorClip {
        duration_ms: TimeMs,
        profile: OutputProfile,
        dest: PathBuf,
    },
    /// Stream-copy concatenation of uniform segments
    ConcatCopy { manifest: PathBuf, dest: PathBuf },
    /// Re-encode concatenation (fallback) at the requested bitrate
    ConcatEncode {
        manifest: PathBuf,
        profile: OutputProfile,
        video_bitrate: String,
        dest: PathBuf,
    },
}

impl MediaOp {
    /// Destination file the operation produces
    pub fn dest(&self) -> &PathBuf {
        match self {
            MediaOp::TrimCopy { dest, .. }
            | MediaOp::TrimEncode { dest, .. }
            | MediaOp::ImageLoop { dest, .. }
            | MediaOp::ColorClip { dest, .. }
            | MediaOp::ConcatCopy { dest, .. }
            | MediaOp::ConcatEncode { dest, .. } => dest,
        }
    }
}

/// Scale to fit inside the output box, pad the remainder, normalize frame
/// rate and pixel format. Never crops.
fn scale_pad_filter(profile: &OutputProfile) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps},format=yuv420p",
        w = profile.width,
        h = profile.height,
        fps = profile.fps,
    )
}

/// Silent stereo source matching the normalized audio profile.
const SILENCE_SRC: &str = "anullsrc=r=48000:cl=stereo";

fn push_encode_video_args(args: &mut Vec<String>) {
    for a in ["-c:v", "libx264", "-preset", "veryfast", "-crf", "23"] {
        args.push(a.to_string());
    }
}

fn push_encode_audio_args(args: &mut Vec<String>) {
    for a in ["-c:a", "aac", "-ar", "48000", "-ac", "2"] {
        args.push(a.to_string());
    }
}

/// Builds the ffmpeg argument vector for one operation.
pub fn op_args(op: &MediaOp) -> Vec<String> {
    match op {
        MediaOp::TrimCopy {
            src,
            in_ms,
            out_ms,
            dest,
        } => {
            vec![
                "-ss".to_string(),
                ms_to_secs_arg(*in_ms),
                "-t".to_string(),
                ms_to_secs_arg(out_ms - in_ms),
                "-i".to_string(),
                src.to_string_lossy().to_string(),
                "-c".to_string(),
                "copy".to_string(),
                "-avoid_negative_ts".to_string(),
                "make_zero".to_string(),
                "-y".to_string(),
                dest.to_string_lossy().to_string(),
            ]
        }

        MediaOp::TrimEncode {
            src,
            in_ms,
            out_ms,
            has_audio,
            profile,
            dest,
        } => {
            let duration = ms_to_secs_arg(out_ms - in_ms);
            let mut args = vec![
                "-ss".to_string(),
                ms_to_secs_arg(*in_ms),
                "-t".to_string(),
                duration.clone(),
                "-i".to_string(),
                src.to_string_lossy().to_string(),
            ];
            if !has_audio {
                // Sources without an audio stream get synthesized silence so
                // every segment carries matching streams for the concat step.
                args.extend([
                    "-f".to_string(),
                    "lavfi".to_string(),
                    "-t".to_string(),
                    duration,
                    "-i".to_string(),
                    SILENCE_SRC.to_string(),
                ]);
            }
            args.extend(["-vf".to_string(), scale_pad_filter(profile)]);
            args.extend(["-map".to_string(), "0:v:0".to_string()]);
            args.extend([
                "-map".to_string(),
                if *has_audio { "0:a:0" } else { "1:a:0" }.to_string(),
            ]);
            push_encode_video_args(&mut args);
            push_encode_audio_args(&mut args);
            args.extend(["-y".to_string(), dest.to_string_lossy().to_string()]);
            args
        }

        MediaOp::ImageLoop {
            src,
            duration_ms,
            profile,
            dest,
        } => {
            let duration = ms_to_secs_arg(*duration_ms);
            let mut args = vec![
                "-loop".to_string(),
                "1".to_string(),
                "-t".to_string(),
                duration.clone(),
                "-i".to_string(),
                src.to_string_lossy().to_string(),
                "-f".to_string(),
                "lavfi".to_string(),
                "-t".to_string(),
                duration,
                "-i".to_string(),
                SILENCE_SRC.to_string(),
                "-vf".to_string(),
                scale_pad_filter(profile),
                "-map".to_string(),
                "0:v:0".to_string(),
                "-map".to_string(),
                "1:a:0".to_string(),
            ];
            push_encode_video_args(&mut args);
            push_encode_audio_args(&mut args);
            args.extend(["-y".to_string(), dest.to_string_lossy().to_string()]);
            args
        }

        MediaOp::ColorClip {
            duration_ms,
            profile,
            dest,
        } => {
            let duration = ms_to_secs_arg(*duration_ms);
            let mut args = vec![
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!(
                    "color=c=black:s={}x{}:r={}:d={}",
                    profile.width, profile.height, profile.fps, duration
                ),
                "-f".to_string(),
                "lavfi".to_string(),
                "-t".to_string(),
                duration,
                "-i".to_string(),
                SILENCE_SRC.to_string(),
                "-vf".to_string(),
                "format=yuv420p".to_string(),
                "-map".to_string(),
                "0:v:0".to_string(),
                "-map".to_string(),
                "1:a:0".to_string(),
                "-shortest".to_string(),
            ];
            push_encode_video_args(&mut args);
            push_encode_audio_args(&mut args);
            args.extend(["-y".to_string(), dest.to_string_lossy().to_string()]);
            args
        }

        MediaOp::ConcatCopy { manifest, dest } => {
            vec![
                "-f".to_string(),
                "concat".to_string(),
                "-safe".to_string(),
                "0".to_string(),
                "-i".to_string(),
                manifest.to_string_lossy().to_string(),
                "-c".to_string(),
                "copy".to_string(),
                "-y".to_string(),
                dest.to_string_lossy().to_string(),
            ]
        }

        MediaOp::ConcatEncode {
            manifest,
            profile,
            video_bitrate,
            dest,
        } => {
            let mut args = vec![
                "-f".to_string(),
                "concat".to_string(),
                "-safe".to_string(),
                "0".to_string(),
                "-i".to_string(),
                manifest.to_string_lossy().to_string(),
                "-vf".to_string(),
                scale_pad_filter(profile),
            ];
            push_encode_video_args(&mut args);
            args.extend(["-b:v".to_string(), video_bitrate.clone()]);
            push_encode_audio_args(&mut args);
            args.extend(["-b:a".to_string(), "192k".to_string()]);
            args.extend(["-y".to_string(), dest.to_string_lossy().to_string()]);
            args
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
