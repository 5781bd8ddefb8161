// src/backends/ffmpeg.rs
use async_trait::async_trait;
use std::process::Command;

use crate::error::StageError;
use crate::stages::{CompositionBackend, CompositionPlan, CompositionRequest};
use crate::utils::execute_ffmpeg_command;

/// Encodes slideshow videos with the system `ffmpeg` binary
#[derive(Debug, Clone, Default)]
pub struct FfmpegCompositionBackend;

impl FfmpegCompositionBackend {
    pub fn command(request: &CompositionRequest) -> Command {
        let plan = CompositionPlan::new(request.images.len(), request.narration_duration);
        let mut command = Command::new("ffmpeg");
        command.args(plan.ffmpeg_args(request));
        command
    }
}

#[async_trait]
impl CompositionBackend for FfmpegCompositionBackend {
    async fn compose(&self, request: &CompositionRequest) -> Result<(), StageError> {
        if request.images.is_empty() {
            return Err(StageError::Ffmpeg("no images to encode".to_string()));
        }

        let command = Self::command(request);
        tracing::info!(
            images = request.images.len(),
            duration = request.narration_duration,
            "🎞️ Encoding video {}",
            request.output.display()
        );

        tokio::task::spawn_blocking(move || execute_ffmpeg_command(command))
            .await
            .map_err(|e| StageError::Ffmpeg(format!("encoder task failed: {}", e)))??;

        Ok(())
    }
}
