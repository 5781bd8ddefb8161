// utils.rs - FFmpeg/FFprobe helpers and small formatting utilities
use serde_json::Value;
use std::path::Path;
use std::process::Command;

use crate::error::StageError;

/// Format seconds as an SRT timecode: HH:MM:SS,mmm
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Execute FFmpeg command, returning stdout bytes
pub fn execute_ffmpeg_command(mut command: Command) -> Result<Vec<u8>, StageError> {
    tracing::debug!("Executing FFmpeg: {:?}", command);

    let output = command
        .output()
        .map_err(|e| StageError::Ffmpeg(format!("Failed to execute FFmpeg: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StageError::Ffmpeg(tail_lines(&stderr, 20)));
    }

    Ok(output.stdout)
}

/// Execute FFprobe for media analysis
pub fn execute_ffprobe_command(args: &[&str]) -> Result<String, StageError> {
    let output = Command::new("ffprobe")
        .args(args)
        .output()
        .map_err(|e| StageError::Ffmpeg(format!("Failed to execute FFprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StageError::Ffmpeg(format!("FFprobe error: {}", stderr.trim())));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Check if FFmpeg and FFprobe are available
pub fn check_ffmpeg_available() -> Result<(), StageError> {
    for binary in ["ffmpeg", "ffprobe"] {
        Command::new(binary)
            .arg("-version")
            .output()
            .map_err(|_| StageError::Unavailable(format!("{} not found on PATH", binary)))?;
    }
    Ok(())
}

/// Read the container duration of an audio or video file
pub fn probe_media_duration(path: &Path) -> Result<f64, StageError> {
    let path_str = path.to_string_lossy();
    let args = ["-v", "quiet", "-print_format", "json", "-show_format", path_str.as_ref()];
    let ffprobe_output = execute_ffprobe_command(&args)?;
    parse_ffprobe_duration(&ffprobe_output)
}

fn parse_ffprobe_duration(ffprobe_output: &str) -> Result<f64, StageError> {
    let json: Value = serde_json::from_str(ffprobe_output)
        .map_err(|e| StageError::InvalidResponse(format!("Failed to parse ffprobe output: {}", e)))?;

    json["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
        .ok_or_else(|| StageError::InvalidResponse("ffprobe reported no duration".to_string()))
}

/// Pick a file extension from an image's magic bytes
pub fn detect_image_extension(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "png"
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if data.starts_with(&[0x47, 0x49, 0x46]) {
        "gif"
    } else if data.starts_with(&[0x52, 0x49, 0x46, 0x46]) {
        "webp"
    } else {
        "png"
    }
}

/// Shorten `text` to `max_chars` characters, appending "..." when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_srt_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(3.3333333), "00:00:03,333");
        assert_eq!(format_srt_timestamp(3661.5), "01:01:01,500");
        assert_eq!(format_srt_timestamp(59.9996), "00:01:00,000");
    }

    #[test]
    fn test_parse_ffprobe_duration() {
        let output = r#"{"format": {"duration": "12.480000", "format_name": "mp3"}}"#;
        assert!((parse_ffprobe_duration(output).unwrap() - 12.48).abs() < 1e-9);
        assert!(parse_ffprobe_duration(r#"{"format": {}}"#).is_err());
        assert!(parse_ffprobe_duration("not json").is_err());
    }

    #[test]
    fn test_detect_image_extension() {
        assert_eq!(detect_image_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(detect_image_extension(&[0x89, 0x50, 0x4E, 0x47, 0x0D]), "png");
        assert_eq!(detect_image_extension(b"????"), "png");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdefghij", 4), "abcd...");
    }
}
