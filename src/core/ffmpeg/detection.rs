//! FFmpeg Detection Module
//!
//! Locates ffmpeg/ffprobe binaries on the system and validates them.

use std::path::PathBuf;
use std::process::Command;

use super::{FFmpegError, FFmpegResult};

/// Information about a detected FFmpeg installation
#[derive(Debug, Clone)]
pub struct FFmpegInfo {
    /// Path to ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// Path to ffprobe binary
    pub ffprobe_path: PathBuf,
    /// FFmpeg version string
    pub version: String,
}

/// Detect FFmpeg from the system PATH and common install locations.
pub fn detect_system_ffmpeg() -> FFmpegResult<FFmpegInfo> {
    let ffmpeg_path = find_binary("ffmpeg")?;
    let ffprobe_path = find_binary("ffprobe")?;
    let version = get_ffmpeg_version(&ffmpeg_path)?;

    Ok(FFmpegInfo {
        ffmpeg_path,
        ffprobe_path,
        version,
    })
}

/// Find a binary in common locations, then fall back to PATH search.
fn find_binary(name: &str) -> FFmpegResult<PathBuf> {
    #[cfg(target_os = "windows")]
    let file_name = format!("{name}.exe");
    #[cfg(not(target_os = "windows"))]
    let file_name = name.to_string();

    for dir in common_install_dirs() {
        let candidate = dir.join(&file_name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    #[cfg(target_os = "windows")]
    let locator = "where";
    #[cfg(not(target_os = "windows"))]
    let locator = "which";

    let output = Command::new(locator)
        .arg(name)
        .output()
        .map_err(|_| FFmpegError::NotFound)?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(first_line) = stdout.lines().next() {
            let path = PathBuf::from(first_line.trim());
            if path.exists() {
                return Ok(path);
            }
        }
    }

    Err(FFmpegError::NotFound)
}

fn common_install_dirs() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/opt/homebrew/bin"),
            PathBuf::from("/usr/local/bin"),
        ]
    }
    #[cfg(target_os = "linux")]
    {
        vec![
            PathBuf::from("/usr/bin"),
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/snap/bin"),
        ]
    }
    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from(r"C:\ffmpeg\bin"),
            PathBuf::from(r"C:\Program Files\ffmpeg\bin"),
        ]
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        vec![]
    }
}

/// Capture the first line of `ffmpeg -version`.
fn get_ffmpeg_version(ffmpeg_path: &PathBuf) -> FFmpegResult<String> {
    let output = Command::new(ffmpeg_path)
        .arg("-version")
        .output()
        .map_err(|_| FFmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FFmpegError::ExecutionFailed(
            "ffmpeg -version returned non-zero".to_string(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let banner = stdout
        .lines()
        .next()
        .unwrap_or("unknown")
        .trim()
        .to_string();
    Ok(banner)
}
