// src/stages/composer.rs
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::{
    BackgroundMusicProvider, CompositionBackend, CompositionRequest, FixedSceneScorer,
    ImageResult, SceneScorer,
};
use crate::artifacts::{Artifact, ArtifactKind, ArtifactStore};
use crate::error::PipelineError;
use crate::metrics::{gpu_usage_percent, memory_usage_percent, CostModel};
use crate::types::{TextSegment, VideoConfig, VideoMetrics};

/// Cross-fade length at each image-to-image boundary
pub const CROSSFADE_SECONDS: f64 = 0.5;

/// Gain applied to the background track under the narration
pub const BACKGROUND_MUSIC_VOLUME: f64 = 0.3;

/// Timeline for a slideshow of `image_count` stills over the narration.
///
/// Every image owns `narration / image_count` seconds. All clips except the
/// last are extended by the cross-fade so that each fade starts on a slice
/// boundary and the finished video is exactly as long as the narration.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    pub slice: f64,
    pub crossfade: f64,
    pub clip_durations: Vec<f64>,
    pub transition_offsets: Vec<f64>,
    pub total_duration: f64,
}

impl CompositionPlan {
    pub fn new(image_count: usize, narration_duration: f64) -> Self {
        let count = image_count.max(1);
        let slice = narration_duration / count as f64;
        // Short slices cannot fit a full fade
        let crossfade = if count > 1 {
            CROSSFADE_SECONDS.min(slice / 2.0)
        } else {
            0.0
        };

        let clip_durations = (0..count)
            .map(|i| if i + 1 < count { slice + crossfade } else { slice })
            .collect();
        let transition_offsets = (1..count).map(|k| k as f64 * slice).collect();

        Self {
            slice,
            crossfade,
            clip_durations,
            transition_offsets,
            total_duration: narration_duration,
        }
    }

    /// The `-filter_complex` graph. Video ends on `[vout]`; audio on `[aout]`
    /// when background music is mixed in.
    pub fn filter_complex(&self, request: &CompositionRequest) -> String {
        let (w, h) = (request.resolution.width, request.resolution.height);
        let mut parts = Vec::new();

        for i in 0..self.clip_durations.len() {
            parts.push(format!(
                "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
                 pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p[v{i}]",
                fps = request.fps
            ));
        }

        let mut last = "v0".to_string();
        for (k, offset) in self.transition_offsets.iter().enumerate() {
            let next = format!("x{}", k + 1);
            parts.push(format!(
                "[{last}][v{}]xfade=transition=fade:duration={:.3}:offset={:.3}[{next}]",
                k + 1,
                self.crossfade,
                offset
            ));
            last = next;
        }

        match &request.captions {
            Some(captions) => parts.push(format!(
                "[{last}]subtitles=filename={}[vout]",
                escape_filter_path(captions)
            )),
            None => parts.push(format!("[{last}]null[vout]")),
        }

        if request.background_music.is_some() {
            let narration = self.clip_durations.len();
            parts.push(format!(
                "[{narration}:a]volume=1.0[narr];[{}:a]volume={BACKGROUND_MUSIC_VOLUME}[bg];\
                 [narr][bg]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]",
                narration + 1
            ));
        }

        parts.join(";")
    }

    /// Full ffmpeg argument list for the request
    pub fn ffmpeg_args(&self, request: &CompositionRequest) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into()];

        for (image, duration) in request.images.iter().zip(&self.clip_durations) {
            args.extend([
                "-loop".into(),
                "1".into(),
                "-t".into(),
                format!("{:.3}", duration),
                "-i".into(),
                image.to_string_lossy().into_owned(),
            ]);
        }

        args.extend(["-i".into(), request.narration.to_string_lossy().into_owned()]);

        if let Some(music) = &request.background_music {
            args.extend([
                "-stream_loop".into(),
                "-1".into(),
                "-i".into(),
                music.to_string_lossy().into_owned(),
            ]);
        }

        args.extend(["-filter_complex".into(), self.filter_complex(request)]);
        args.extend(["-map".into(), "[vout]".into()]);
        if request.background_music.is_some() {
            args.extend(["-map".into(), "[aout]".into()]);
        } else {
            args.extend(["-map".into(), format!("{}:a", request.images.len())]);
        }

        args.extend([
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-r".into(),
            request.fps.to_string(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
            "-t".into(),
            format!("{:.3}", self.total_duration),
            "-movflags".into(),
            "+faststart".into(),
            request.output.to_string_lossy().into_owned(),
        ]);

        args
    }
}

/// Escape a path for use as a filtergraph option value
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
        .replace(',', "\\,")
}

/// Composition stage: stills + narration (+ captions, + music) into one video
#[derive(Clone)]
pub struct VideoComposer {
    backend: Arc<dyn CompositionBackend>,
    music: Option<Arc<dyn BackgroundMusicProvider>>,
    scorer: Arc<dyn SceneScorer>,
    cost: CostModel,
}

impl VideoComposer {
    pub fn new(backend: Arc<dyn CompositionBackend>) -> Self {
        Self {
            backend,
            music: None,
            scorer: Arc::new(FixedSceneScorer::default()),
            cost: CostModel::default(),
        }
    }

    pub fn with_background_music(mut self, provider: Arc<dyn BackgroundMusicProvider>) -> Self {
        self.music = Some(provider);
        self
    }

    pub fn with_scene_scorer(mut self, scorer: Arc<dyn SceneScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_cost_model(mut self, cost: CostModel) -> Self {
        self.cost = cost;
        self
    }

    /// Compose the final video into the job's scratch directory.
    ///
    /// Metrics are only produced for a successful composition. Any encoder
    /// failure is a `PipelineError::Composition`; there is no retry.
    #[allow(clippy::too_many_arguments)]
    pub async fn compose(
        &self,
        job_id: &str,
        segments: &[TextSegment],
        images: &[ImageResult],
        narration: &Artifact,
        narration_duration: f64,
        config: &VideoConfig,
        captions: Option<&Artifact>,
        store: &ArtifactStore,
    ) -> Result<(Artifact, VideoMetrics), PipelineError> {
        let started = Instant::now();

        if images.is_empty() {
            return Err(PipelineError::Composition("no scene images to compose".to_string()));
        }
        if images.len() != segments.len() {
            return Err(PipelineError::Composition(format!(
                "{} images for {} segments",
                images.len(),
                segments.len()
            )));
        }

        let background_music = if config.include_background_music {
            self.background_track(job_id, config, narration_duration).await
        } else {
            None
        };

        let captions = if config.include_subtitles {
            captions.map(|c| c.path.clone())
        } else {
            None
        };

        let output = store.allocate(job_id, ArtifactKind::Video, "composed.mp4");
        let request = CompositionRequest {
            images: images.iter().map(|r| r.artifact().path.clone()).collect(),
            narration: narration.path.clone(),
            narration_duration,
            captions,
            background_music,
            fps: config.fps,
            resolution: config.resolution,
            output: output.path.clone(),
        };

        if let Err(e) = self.backend.compose(&request).await {
            if let Err(cleanup) = output.remove().await {
                tracing::warn!(job_id = %job_id, "Could not remove partial video: {}", cleanup);
            }
            return Err(PipelineError::Composition(e.to_string()));
        }

        let written = tokio::fs::metadata(&output.path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(PipelineError::Composition(
                "encoder produced no output".to_string(),
            ));
        }

        let (memory_usage, gpu_usage) =
            tokio::task::spawn_blocking(|| (memory_usage_percent(), gpu_usage_percent()))
                .await
                .unwrap_or((0.0, 0.0));

        let metrics = VideoMetrics {
            inference_time: started.elapsed().as_secs_f64(),
            memory_usage,
            gpu_usage,
            frame_rate: config.fps as f64,
            scene_fidelity_score: self.scene_fidelity(images),
            generation_cost: self.cost.generation_cost(narration_duration, images.len()),
        };

        Ok((output, metrics))
    }

    /// Ask the provider for a track. Absence or failure both mean "no music".
    async fn background_track(
        &self,
        job_id: &str,
        config: &VideoConfig,
        duration: f64,
    ) -> Option<std::path::PathBuf> {
        let provider = self.music.as_ref()?;
        match provider.track(config, duration).await {
            Ok(track) => track,
            Err(e) => {
                tracing::warn!(job_id = %job_id, "Background music unavailable: {}", e);
                None
            }
        }
    }

    /// Mean score over scenes; placeholder scenes score zero
    fn scene_fidelity(&self, images: &[ImageResult]) -> f64 {
        let total: f64 = images
            .iter()
            .map(|result| match result {
                ImageResult::Generated(artifact) => self.scorer.score(artifact).clamp(0.0, 1.0),
                ImageResult::Fallback { .. } => 0.0,
            })
            .sum();
        total / images.len() as f64
    }
}
