// src/backends/offline.rs
//! Backends used when no external service is configured.

use async_trait::async_trait;
use std::process::Command;

use crate::error::StageError;
use crate::stages::{ImageBackend, NarrationAudio, NarrationBackend, VoiceParameters};
use crate::utils::execute_ffmpeg_command;

/// Words per second at speed 1.0 (150 wpm)
const WORDS_PER_SECOND: f64 = 2.5;
const MIN_NARRATION_SECONDS: f64 = 1.0;

/// Reading time for `text` at the given speaking rate
pub fn estimate_narration_seconds(text: &str, speed: f64) -> f64 {
    let words = text.split_whitespace().count() as f64;
    let rate = WORDS_PER_SECOND * speed.max(0.1);
    (words / rate).max(MIN_NARRATION_SECONDS)
}

/// Silent WAV track of the estimated reading time
#[derive(Debug, Clone, Default)]
pub struct SilentNarrationBackend;

#[async_trait]
impl NarrationBackend for SilentNarrationBackend {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceParameters,
    ) -> Result<NarrationAudio, StageError> {
        let duration_seconds = estimate_narration_seconds(text, voice.speed);
        tracing::info!("🔇 Generating {:.2}s silent narration track", duration_seconds);

        let mut command = Command::new("ffmpeg");
        command.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "lavfi",
            "-i",
            "anullsrc=r=44100:cl=mono",
            "-t",
            &format!("{:.3}", duration_seconds),
            "-c:a",
            "pcm_s16le",
            "-f",
            "wav",
            "pipe:1",
        ]);

        let bytes = tokio::task::spawn_blocking(move || execute_ffmpeg_command(command))
            .await
            .map_err(|e| StageError::Ffmpeg(format!("ffmpeg task failed: {}", e)))??;

        Ok(NarrationAudio {
            bytes,
            duration_seconds,
            extension: "wav",
        })
    }
}

/// Image backend that always fails, so every scene uses the placeholder
#[derive(Debug, Clone, Default)]
pub struct DisabledImageBackend;

#[async_trait]
impl ImageBackend for DisabledImageBackend {
    async fn generate(&self, _prompt: &str, _width: u32, _height: u32) -> Result<Vec<u8>, StageError> {
        Err(StageError::Unavailable(
            "no image backend configured".to_string(),
        ))
    }
}
