// src/stages/mod.rs
//! Pipeline stages and the backend contracts they delegate to.
//!
//! Each backend is a stage function: typed input in, bytes (or a value) out,
//! or a `StageError`. Backends hold no per-job state; everything a call needs
//! arrives as arguments.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::artifacts::Artifact;
use crate::error::StageError;
use crate::types::{Resolution, VideoConfig};

pub mod composer;
pub mod narration;
pub mod scenes;
pub mod segmenter;
pub mod subtitles;

pub use composer::{CompositionPlan, VideoComposer};
pub use narration::{voice_parameters, NarrationSynthesizer, VoiceParameters};
pub use scenes::{build_scene_prompt, ImageResult, SceneSynthesizer};
pub use segmenter::{key_concepts, SentenceSegmenter, TextSegmenter};
pub use subtitles::{caption_windows, render_srt, CaptionWindow, SubtitleSynthesizer};

/// Splits raw text into bounded-length pieces. Synchronous and side-effect free.
pub trait SegmentationBackend: Send + Sync {
    fn segment(&self, text: &str, max_len: usize) -> Vec<String>;
}

/// Audio produced by a narration backend
#[derive(Debug, Clone)]
pub struct NarrationAudio {
    pub bytes: Vec<u8>,
    pub duration_seconds: f64,
    /// File extension matching the encoding of `bytes` (e.g. "mp3", "wav")
    pub extension: &'static str,
}

#[async_trait]
pub trait NarrationBackend: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceParameters,
    ) -> Result<NarrationAudio, StageError>;
}

#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(&self, prompt: &str, width: u32, height: u32) -> Result<Vec<u8>, StageError>;
}

/// Everything the encoder needs for one video
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub images: Vec<PathBuf>,
    pub narration: PathBuf,
    pub narration_duration: f64,
    pub captions: Option<PathBuf>,
    pub background_music: Option<PathBuf>,
    pub fps: u32,
    pub resolution: Resolution,
    pub output: PathBuf,
}

/// Encodes a video. On `Ok` the file at `request.output` holds the result.
#[async_trait]
pub trait CompositionBackend: Send + Sync {
    async fn compose(&self, request: &CompositionRequest) -> Result<(), StageError>;
}

/// Supplies a background track. `Ok(None)` means "nothing to mix".
#[async_trait]
pub trait BackgroundMusicProvider: Send + Sync {
    async fn track(
        &self,
        config: &VideoConfig,
        duration_seconds: f64,
    ) -> Result<Option<PathBuf>, StageError>;
}

/// Rates how well a generated scene matches its prompt, in `0.0..=1.0`
pub trait SceneScorer: Send + Sync {
    fn score(&self, artifact: &Artifact) -> f64;
}

/// Placeholder scorer: every generated scene gets the same score.
#[derive(Debug, Clone, Copy)]
pub struct FixedSceneScorer(pub f64);

impl Default for FixedSceneScorer {
    fn default() -> Self {
        Self(0.85)
    }
}

impl SceneScorer for FixedSceneScorer {
    fn score(&self, _artifact: &Artifact) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}
