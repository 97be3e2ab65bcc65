//! FFmpeg Runner Module
//!
//! Spawns ffmpeg/ffprobe processes for declarative media operations and
//! media probing. A non-zero exit is the only failure signal the fallback
//! logic upstream relies on; container compatibility cannot be predicted
//! in advance.

use std::path::Path;
use std::sync::Arc;

use super::{op_args, FFmpegError, FFmpegInfo, FFmpegResult, MediaOp};
use crate::core::TimeMs;

/// Windows flag suppressing a console window per spawned process.
#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

fn configure_command(cmd: &mut tokio::process::Command) {
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

// =============================================================================
// Media Info
// =============================================================================

/// Media information extracted by FFprobe
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Duration in milliseconds
    pub duration_ms: TimeMs,
    /// Video stream info (if present)
    pub video: Option<VideoStreamInfo>,
    /// Audio stream info (if present)
    pub audio: Option<AudioStreamInfo>,
    /// Container format
    pub format: String,
    /// File size in bytes
    pub size_bytes: u64,
}

/// Video stream information
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
    /// Frame rate (frames per second)
    pub fps: f64,
    /// Codec name (e.g. "h264")
    pub codec: String,
    pub pixel_format: String,
}

/// Audio stream information
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStreamInfo {
    pub sample_rate: u32,
    pub channels: u8,
    /// Codec name (e.g. "aac")
    pub codec: String,
}

// =============================================================================
// Runner
// =============================================================================

/// Executes declarative media operations against external ffmpeg binaries.
#[derive(Clone)]
pub struct FFmpegRunner {
    info: Arc<FFmpegInfo>,
}

impl FFmpegRunner {
    pub fn new(info: FFmpegInfo) -> Self {
        Self {
            info: Arc::new(info),
        }
    }

    pub fn info(&self) -> &FFmpegInfo {
        &self.info
    }

    /// Runs one media operation to completion.
    ///
    /// Segment rendering is strictly sequential by design: one invocation
    /// at a time, suspending only at the process boundary.
    pub async fn execute(&self, op: &MediaOp) -> FFmpegResult<()> {
        let args = op_args(op);
        tracing::debug!(?args, "running ffmpeg");

        let mut cmd = tokio::process::Command::new(&self.info.ffmpeg_path);
        configure_command(&mut cmd);
        let output = cmd.args(&args).output().await.map_err(FFmpegError::ProcessError)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FFmpegError::ExecutionFailed(tail(&stderr, 2048)));
        }

        Ok(())
    }

    /// Probe a media file with ffprobe.
    pub async fn probe(&self, input: &Path) -> FFmpegResult<MediaInfo> {
        if !input.exists() {
            return Err(FFmpegError::InvalidInput(format!(
                "Input file does not exist: {}",
                input.display()
            )));
        }

        let mut cmd = tokio::process::Command::new(&self.info.ffprobe_path);
        configure_command(&mut cmd);
        let output = cmd
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                &input.to_string_lossy(),
            ])
            .output()
            .await
            .map_err(FFmpegError::ProcessError)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FFmpegError::ProbeError(format!("FFprobe failed: {stderr}")));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(&json_str)
    }
}

/// Last `max` bytes of a stderr dump; ffmpeg puts the useful line at the end.
fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let start = s.len() - max;
    let start = s
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= start)
        .unwrap_or(0);
    s[start..].to_string()
}

// =============================================================================
// Probe Parsing
// =============================================================================

fn parse_probe_output(json_str: &str) -> FFmpegResult<MediaInfo> {
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FFmpegError::ParseError(format!("Failed to parse FFprobe output: {e}")))?;

    let format = json
        .get("format")
        .ok_or_else(|| FFmpegError::ParseError("Missing format info".to_string()))?;

    let duration_ms = format
        .get("duration")
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .map(|sec| (sec * 1000.0).round() as TimeMs)
        .unwrap_or(0);

    let size_bytes = format
        .get("size")
        .and_then(|s| s.as_str())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let format_name = format
        .get("format_name")
        .and_then(|f| f.as_str())
        .unwrap_or("unknown")
        .to_string();

    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .cloned()
        .unwrap_or_default();

    let mut video_info: Option<VideoStreamInfo> = None;
    let mut audio_info: Option<AudioStreamInfo> = None;

    for stream in streams {
        match stream.get("codec_type").and_then(|c| c.as_str()) {
            Some("video") if video_info.is_none() => {
                video_info = Some(parse_video_stream(&stream));
            }
            Some("audio") if audio_info.is_none() => {
                audio_info = Some(parse_audio_stream(&stream));
            }
            _ => {}
        }
    }

    Ok(MediaInfo {
        duration_ms,
        video: video_info,
        audio: audio_info,
        format: format_name,
        size_bytes,
    })
}

fn parse_video_stream(stream: &serde_json::Value) -> VideoStreamInfo {
    let width = stream.get("width").and_then(|w| w.as_u64()).unwrap_or(0) as u32;
    let height = stream.get("height").and_then(|h| h.as_u64()).unwrap_or(0) as u32;

    // r_frame_rate is a fraction, e.g. "30/1" or "30000/1001".
    let fps = stream
        .get("r_frame_rate")
        .and_then(|f| f.as_str())
        .and_then(|s| {
            let parts: Vec<&str> = s.split('/').collect();
            if parts.len() == 2 {
                let num: f64 = parts[0].parse().ok()?;
                let den: f64 = parts[1].parse().ok()?;
                if den > 0.0 {
                    Some(num / den)
                } else {
                    None
                }
            } else {
                s.parse().ok()
            }
        })
        .unwrap_or(30.0);

    let codec = stream
        .get("codec_name")
        .and_then(|c| c.as_str())
        .unwrap_or("unknown")
        .to_string();

    let pixel_format = stream
        .get("pix_fmt")
        .and_then(|p| p.as_str())
        .unwrap_or("unknown")
        .to_string();

    VideoStreamInfo {
        width,
        height,
        fps,
        codec,
        pixel_format,
    }
}

fn parse_audio_stream(stream: &serde_json::Value) -> AudioStreamInfo {
    let sample_rate = stream
        .get("sample_rate")
        .and_then(|s| s.as_str())
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(44100);

    let channels = stream.get("channels").and_then(|c| c.as_u64()).unwrap_or(2) as u8;

    let codec = stream
        .get("codec_name")
        .and_then(|c| c.as_str())
        .unwrap_or("unknown")
        .to_string();

    AudioStreamInfo {
        sample_rate,
        channels,
        codec,
    }
}

// =============================================================================
// Tests
// =============================================================================
