// src/backends/music.rs
use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::StageError;
use crate::stages::BackgroundMusicProvider;
use crate::types::VideoConfig;
use crate::utils::probe_media_duration;

/// Serves one audio file as the background track for every video.
/// The composer loops it under the narration.
#[derive(Debug, Clone)]
pub struct FileMusicProvider {
    path: PathBuf,
}

impl FileMusicProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BackgroundMusicProvider for FileMusicProvider {
    async fn track(
        &self,
        _config: &VideoConfig,
        duration_seconds: f64,
    ) -> Result<Option<PathBuf>, StageError> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Err(StageError::Unavailable(format!(
                "background track {} does not exist",
                self.path.display()
            )));
        }

        let path = self.path.clone();
        let track_length = tokio::task::spawn_blocking(move || probe_media_duration(&path))
            .await
            .map_err(|e| StageError::Ffmpeg(format!("ffprobe task failed: {}", e)))??;

        tracing::debug!(
            track_length,
            narration = duration_seconds,
            "🎵 Using background track {}",
            self.path.display()
        );
        Ok(Some(self.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_track_is_unavailable() {
        let provider = FileMusicProvider::new("/definitely/not/here.mp3");
        let err = provider.track(&VideoConfig::default(), 5.0).await.unwrap_err();
        assert!(matches!(err, StageError::Unavailable(_)));
    }
}
