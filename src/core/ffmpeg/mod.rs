//! FFmpeg Integration Module
//!
//! Drives external ffmpeg/ffprobe binaries for segment rendering,
//! concatenation and media probing. Supports system-installed binaries
//! discovered on PATH or in common install locations.

mod commands;
mod detection;
mod runner;

pub use commands::{op_args, MediaOp, OutputProfile};
pub use detection::{detect_system_ffmpeg, FFmpegInfo};
pub use runner::{AudioStreamInfo, FFmpegRunner, MediaInfo, VideoStreamInfo};

/// FFmpeg-related error types
#[derive(Debug, thiserror::Error)]
pub enum FFmpegError {
    #[error("FFmpeg not found. Install FFmpeg and ensure it is on PATH.")]
    NotFound,

    #[error("FFmpeg execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    #[error("FFprobe error: {0}")]
    ProbeError(String),

    #[error("Process error: {0}")]
    ProcessError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type FFmpegResult<T> = Result<T, FFmpegError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_error_display() {
        let err = FFmpegError::NotFound;
        assert!(err.to_string().contains("FFmpeg not found"));

        let err = FFmpegError::ExecutionFailed("exit code 1".to_string());
        assert!(err.to_string().contains("exit code 1"));
    }
}
