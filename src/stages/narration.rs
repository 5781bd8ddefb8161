// src/stages/narration.rs
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::NarrationBackend;
use crate::artifacts::{Artifact, ArtifactKind, ArtifactStore};
use crate::error::PipelineError;
use crate::types::{Domain, Tone, VideoConfig};

/// Voice settings handed to the narration backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParameters {
    /// Speaking rate multiplier, 1.0 = backend default
    pub speed: f64,
    /// Expressive style label ("neutral", "friendly", ...)
    pub style: String,
    /// Voice steadiness in `0.0..=1.0`; higher reads flatter
    pub stability: f64,
    pub language: String,
}

/// Look up voice settings for a configuration.
///
/// Tone picks rate and style; domain picks stability. Tones without an entry
/// keep the backend defaults.
pub fn voice_parameters(config: &VideoConfig) -> VoiceParameters {
    let (speed, style) = match config.tone {
        Tone::Formal => (0.9, "neutral"),
        Tone::Casual => (1.1, "friendly"),
        Tone::Emotional => (0.8, "empathetic"),
        Tone::Documentary => (0.95, "authoritative"),
        _ => (1.0, "default"),
    };

    let stability = match config.domain {
        Domain::News | Domain::Governance | Domain::Corporate => 0.75,
        Domain::Entertainment => 0.35,
        _ => 0.5,
    };

    VoiceParameters {
        speed,
        style: style.to_string(),
        stability,
        language: config.language.clone(),
    }
}

/// Narration stage: one audio artifact for the full text
#[derive(Clone)]
pub struct NarrationSynthesizer {
    backend: Arc<dyn NarrationBackend>,
}

impl NarrationSynthesizer {
    pub fn new(backend: Arc<dyn NarrationBackend>) -> Self {
        Self { backend }
    }

    /// Returns the narration artifact and its duration in seconds.
    /// Any backend failure is fatal to the job.
    pub async fn synthesize(
        &self,
        job_id: &str,
        text: &str,
        config: &VideoConfig,
        store: &ArtifactStore,
    ) -> Result<(Artifact, f64), PipelineError> {
        let voice = voice_parameters(config);
        tracing::debug!(job_id = %job_id, speed = voice.speed, style = %voice.style, "Synthesizing narration");

        let audio = self
            .backend
            .synthesize(text, &voice)
            .await
            .map_err(|e| PipelineError::Synthesis(e.to_string()))?;

        if audio.bytes.is_empty() {
            return Err(PipelineError::Synthesis("backend returned no audio".to_string()));
        }
        if !audio.duration_seconds.is_finite() || audio.duration_seconds <= 0.0 {
            return Err(PipelineError::Synthesis(format!(
                "backend reported invalid duration {}",
                audio.duration_seconds
            )));
        }

        let file_name = format!("narration.{}", audio.extension);
        let artifact = store
            .write(job_id, ArtifactKind::Narration, &file_name, &audio.bytes)
            .await?;

        Ok((artifact, audio.duration_seconds))
    }
}
