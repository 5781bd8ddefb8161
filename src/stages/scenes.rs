// src/stages/scenes.rs
use image::{Rgb, RgbImage};
use std::path::Path;
use std::sync::Arc;

use super::ImageBackend;
use crate::artifacts::{Artifact, ArtifactKind, ArtifactStore};
use crate::error::PipelineError;
use crate::types::{Domain, Environment, Resolution, TextSegment, Tone, VideoConfig};
use crate::utils::detect_image_extension;

/// Light blue fill used for placeholder scenes
const PLACEHOLDER_COLOR: Rgb<u8> = Rgb([173, 216, 230]);

/// Outcome of generating one scene
#[derive(Debug, Clone, PartialEq)]
pub enum ImageResult {
    Generated(Artifact),
    Fallback { artifact: Artifact, reason: String },
}

impl ImageResult {
    pub fn artifact(&self) -> &Artifact {
        match self {
            ImageResult::Generated(artifact) => artifact,
            ImageResult::Fallback { artifact, .. } => artifact,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ImageResult::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            ImageResult::Fallback { reason, .. } => Some(reason),
            ImageResult::Generated(_) => None,
        }
    }
}

fn environment_phrase(environment: Environment) -> &'static str {
    match environment {
        Environment::Rural => "rural setting, countryside, natural landscape",
        Environment::Urban => "urban environment, city, modern buildings",
        Environment::Futuristic => "futuristic, sci-fi, high-tech environment",
        Environment::Nature => "natural environment, outdoor, scenic",
        Environment::Indoors => "indoor setting, interior space",
        Environment::Studio => "professional studio, clean background",
        Environment::Classroom => "classroom, educational environment",
    }
}

fn domain_phrase(domain: Domain) -> &'static str {
    match domain {
        Domain::Education => "educational, informative, clean design",
        Domain::Health => "medical, healthcare, professional",
        Domain::Governance => "official, governmental, formal",
        Domain::Entertainment => "colorful, engaging, dynamic",
        Domain::News => "news broadcast, professional, serious",
        Domain::Corporate => "business, professional, corporate",
    }
}

fn tone_phrase(tone: Tone) -> &'static str {
    match tone {
        Tone::Formal => "professional, formal composition",
        Tone::Casual => "relaxed, friendly atmosphere",
        Tone::Emotional => "emotional, expressive",
        Tone::Documentary => "documentary style, realistic",
        _ => "balanced composition",
    }
}

/// Prompt for one segment: text, then environment, domain and tone styling
pub fn build_scene_prompt(segment: &str, config: &VideoConfig) -> String {
    format!(
        "{}, {}, {}, {}, high quality, detailed",
        segment,
        environment_phrase(config.environment),
        domain_phrase(config.domain),
        tone_phrase(config.tone)
    )
}

/// Scene stage: one image per segment, same order, placeholder on failure
#[derive(Clone)]
pub struct SceneSynthesizer {
    backend: Arc<dyn ImageBackend>,
}

impl SceneSynthesizer {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }

    /// Generate scenes for every segment.
    ///
    /// A backend failure for one segment yields `ImageResult::Fallback` at that
    /// position. Only a storage failure aborts the stage. Every artifact written
    /// before such a failure is handed to `on_artifact` so the caller can clean up.
    pub async fn synthesize(
        &self,
        job_id: &str,
        segments: &[TextSegment],
        config: &VideoConfig,
        store: &ArtifactStore,
        mut on_artifact: impl FnMut(&Artifact) + Send,
    ) -> Result<Vec<ImageResult>, PipelineError> {
        let Resolution { width, height } = config.resolution;
        let mut results = Vec::with_capacity(segments.len());

        for segment in segments {
            let prompt = build_scene_prompt(&segment.text, config);

            let result = match self.backend.generate(&prompt, width, height).await {
                Ok(bytes) if !bytes.is_empty() => {
                    let file_name = format!(
                        "scene_{:03}.{}",
                        segment.index,
                        detect_image_extension(&bytes)
                    );
                    let artifact = store
                        .write(job_id, ArtifactKind::SceneImage, &file_name, &bytes)
                        .await?;
                    ImageResult::Generated(artifact)
                }
                Ok(_) => {
                    tracing::warn!(job_id = %job_id, segment = segment.index, "Image backend returned no bytes");
                    self.fallback(job_id, segment.index, config.resolution, store, "backend returned an empty image".to_string())
                        .await?
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, segment = segment.index, "Error generating image: {}", e);
                    self.fallback(job_id, segment.index, config.resolution, store, e.to_string())
                        .await?
                }
            };

            on_artifact(result.artifact());
            results.push(result);
        }

        Ok(results)
    }

    async fn fallback(
        &self,
        job_id: &str,
        index: usize,
        resolution: Resolution,
        store: &ArtifactStore,
        reason: String,
    ) -> Result<ImageResult, PipelineError> {
        let artifact = store.allocate(
            job_id,
            ArtifactKind::SceneImage,
            &format!("scene_{:03}_fallback.png", index),
        );
        write_placeholder(&artifact.path, resolution).await?;
        Ok(ImageResult::Fallback { artifact, reason })
    }
}

/// Write a solid-color PNG of the given size
pub async fn write_placeholder(path: &Path, resolution: Resolution) -> std::io::Result<()> {
    if !resolution.is_supported() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("placeholder size {} is out of range", resolution),
        ));
    }
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let image = RgbImage::from_pixel(resolution.width, resolution.height, PLACEHOLDER_COLOR);
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(std::io::Error::other)
    })
    .await
    .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails on the listed call numbers (0-based)
    struct FlakyBackend {
        calls: AtomicUsize,
        failing: Vec<usize>,
    }

    #[async_trait]
    impl ImageBackend for FlakyBackend {
        async fn generate(&self, _prompt: &str, _w: u32, _h: u32) -> Result<Vec<u8>, StageError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&call) {
                Err(StageError::Unavailable("diffusion model crashed".to_string()))
            } else {
                Ok(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00])
            }
        }
    }

    fn segments(n: usize) -> Vec<TextSegment> {
        (1..=n)
            .map(|index| TextSegment { index, text: format!("Sentence {}.", index) })
            .collect()
    }

    #[test]
    fn test_prompt_concatenation_order() {
        let mut config = VideoConfig::default();
        config.environment = Environment::Rural;
        config.domain = Domain::Governance;
        config.tone = Tone::Formal;

        assert_eq!(
            build_scene_prompt("Villages get internet.", &config),
            "Villages get internet., rural setting, countryside, natural landscape, \
             official, governmental, formal, professional, formal composition, high quality, detailed"
        );
    }

    #[test]
    fn test_unmapped_tone_uses_default_phrase() {
        let mut config = VideoConfig::default();
        config.tone = Tone::Informative;
        assert!(build_scene_prompt("x", &config).contains("balanced composition"));
    }

    #[tokio::test]
    async fn test_failed_segment_gets_placeholder_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path().join("work"), tmp.path().join("out"));
        store.prepare("job").await.unwrap();

        let mut config = VideoConfig::default();
        config.resolution = Resolution::new(64, 36);

        let backend = Arc::new(FlakyBackend { calls: AtomicUsize::new(0), failing: vec![1] });
        let synth = SceneSynthesizer::new(backend);

        let mut tracked = Vec::new();
        let results = synth
            .synthesize("job", &segments(3), &config, &store, |a| tracked.push(a.clone()))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(!results[0].is_fallback());
        assert!(results[1].is_fallback());
        assert!(!results[2].is_fallback());
        assert!(results[1].fallback_reason().unwrap().contains("diffusion model crashed"));
        assert_eq!(tracked.len(), 3);

        assert!(results[0].artifact().path.ends_with("scene_001.jpg"));
        let dims = image::image_dimensions(&results[1].artifact().path).unwrap();
        assert_eq!(dims, (64, 36));
    }

    #[tokio::test]
    async fn test_placeholder_refuses_oversized_frame() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("huge.png");

        let err = write_placeholder(&path, Resolution::new(100_000, 100_000))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_image_falls_back() {
        struct EmptyBackend;

        #[async_trait]
        impl ImageBackend for EmptyBackend {
            async fn generate(&self, _prompt: &str, _w: u32, _h: u32) -> Result<Vec<u8>, StageError> {
                Ok(Vec::new())
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path().join("work"), tmp.path().join("out"));
        store.prepare("job").await.unwrap();

        let mut config = VideoConfig::default();
        config.resolution = Resolution::new(16, 16);

        let results = SceneSynthesizer::new(Arc::new(EmptyBackend))
            .synthesize("job", &segments(1), &config, &store, |_| {})
            .await
            .unwrap();
        assert_eq!(results[0].fallback_reason(), Some("backend returned an empty image"));
    }

    #[tokio::test]
    async fn test_all_failures_still_preserve_length() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path().join("work"), tmp.path().join("out"));
        store.prepare("job").await.unwrap();

        let mut config = VideoConfig::default();
        config.resolution = Resolution::new(16, 16);

        let backend = Arc::new(FlakyBackend { calls: AtomicUsize::new(0), failing: vec![0, 1, 2, 3] });
        let results = SceneSynthesizer::new(backend)
            .synthesize("job", &segments(4), &config, &store, |_| {})
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(ImageResult::is_fallback));
    }
}
