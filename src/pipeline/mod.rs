// src/pipeline/mod.rs
//! Per-job orchestration: runs the stages in order and owns the intermediate
//! artifacts until the run ends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;

use crate::artifacts::{Artifact, ArtifactStore};
use crate::error::{PipelineError, StageFailure};
use crate::stages::{
    NarrationSynthesizer, SceneSynthesizer, SubtitleSynthesizer, TextSegmenter, VideoComposer,
};
use crate::types::{VideoConfig, VideoMetrics};

/// States of one orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Segmenting,
    Narrating,
    SceneGenerating,
    Subtitling,
    Composing,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Segmenting => "segmenting",
            PipelineStage::Narrating => "narrating",
            PipelineStage::SceneGenerating => "scene_generating",
            PipelineStage::Subtitling => "subtitling",
            PipelineStage::Composing => "composing",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Final video in the output directory
    pub video: Artifact,
    pub metrics: VideoMetrics,
    /// Non-fatal problems, one entry per fallback scene
    pub warnings: Vec<String>,
    pub segment_count: usize,
}

/// Notified whenever the run enters a new stage
#[async_trait]
pub trait StageObserver: Send + Sync {
    async fn on_stage(&self, stage: PipelineStage);
}

/// Observer that ignores every transition
pub struct NoopObserver;

#[async_trait]
impl StageObserver for NoopObserver {
    async fn on_stage(&self, _stage: PipelineStage) {}
}

/// Runs `Segmenting → Narrating → SceneGenerating → (Subtitling)? → Composing → Done`
pub struct Orchestrator {
    segmenter: TextSegmenter,
    narration: NarrationSynthesizer,
    scenes: SceneSynthesizer,
    subtitles: SubtitleSynthesizer,
    composer: VideoComposer,
    store: ArtifactStore,
}

impl Orchestrator {
    pub fn new(
        segmenter: TextSegmenter,
        narration: NarrationSynthesizer,
        scenes: SceneSynthesizer,
        composer: VideoComposer,
        store: ArtifactStore,
    ) -> Self {
        Self {
            segmenter,
            narration,
            scenes,
            subtitles: SubtitleSynthesizer,
            composer,
            store,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run every stage for one job.
    ///
    /// On failure every artifact written so far is deleted and the error comes
    /// back tagged with the stage it happened in. On success only the promoted
    /// video survives. Cancellation is honoured at stage boundaries.
    pub async fn run(
        &self,
        job_id: &str,
        text: &str,
        config: &VideoConfig,
        cancel: &CancellationToken,
        observer: &dyn StageObserver,
    ) -> Result<PipelineOutput, StageFailure> {
        let mut ledger: Vec<Artifact> = Vec::new();

        let result = self
            .run_stages(job_id, text, config, cancel, observer, &mut ledger)
            .await;

        // Both outcomes leave no scratch files behind
        self.discard(job_id, &ledger).await;

        match result {
            Ok(output) => {
                observer.on_stage(PipelineStage::Done).await;
                tracing::info!(job_id = %job_id, path = %output.video.path.display(), "✅ Pipeline finished");
                Ok(output)
            }
            Err(failure) => {
                if failure.is_cancelled() {
                    tracing::info!(job_id = %job_id, stage = %failure.stage, "🛑 Pipeline cancelled");
                } else {
                    tracing::error!(job_id = %job_id, stage = %failure.stage, "❌ Pipeline failed: {}", failure.error);
                }
                Err(failure)
            }
        }
    }

    async fn run_stages(
        &self,
        job_id: &str,
        text: &str,
        config: &VideoConfig,
        cancel: &CancellationToken,
        observer: &dyn StageObserver,
        ledger: &mut Vec<Artifact>,
    ) -> Result<PipelineOutput, StageFailure> {
        let mut warnings = Vec::new();

        // Segmenting
        let stage = PipelineStage::Segmenting;
        enter(stage, job_id, cancel, observer).await?;
        let segments = self
            .segmenter
            .segment(text)
            .map_err(|e| StageFailure::new(stage, e))?;
        tracing::debug!(job_id = %job_id, segments = segments.len(), "Text segmented");

        // Narrating
        let stage = PipelineStage::Narrating;
        enter(stage, job_id, cancel, observer).await?;
        self.store
            .prepare(job_id)
            .await
            .map_err(|e| StageFailure::new(stage, e.into()))?;
        let (narration, narration_duration) = self
            .narration
            .synthesize(job_id, text, config, &self.store)
            .await
            .map_err(|e| StageFailure::new(stage, e))?;
        ledger.push(narration.clone());
        tracing::debug!(job_id = %job_id, duration = narration_duration, "Narration ready");

        // SceneGenerating
        let stage = PipelineStage::SceneGenerating;
        enter(stage, job_id, cancel, observer).await?;
        let images = self
            .scenes
            .synthesize(job_id, &segments, config, &self.store, |artifact| {
                ledger.push(artifact.clone())
            })
            .await
            .map_err(|e| StageFailure::new(stage, e))?;
        for (segment, image) in segments.iter().zip(&images) {
            if let Some(reason) = image.fallback_reason() {
                warnings.push(format!(
                    "scene {} used a placeholder image: {}",
                    segment.index, reason
                ));
            }
        }

        // Subtitling
        let captions = if config.include_subtitles {
            let stage = PipelineStage::Subtitling;
            enter(stage, job_id, cancel, observer).await?;
            let captions = self
                .subtitles
                .synthesize(job_id, &segments, narration_duration, &self.store)
                .await
                .map_err(|e| StageFailure::new(stage, e))?;
            ledger.push(captions.clone());
            Some(captions)
        } else {
            None
        };

        // Composing
        let stage = PipelineStage::Composing;
        enter(stage, job_id, cancel, observer).await?;
        let (video, metrics) = self
            .composer
            .compose(
                job_id,
                &segments,
                &images,
                &narration,
                narration_duration,
                config,
                captions.as_ref(),
                &self.store,
            )
            .await
            .map_err(|e| StageFailure::new(stage, e))?;
        ledger.push(video.clone());

        // A cancel that lands during encoding still discards the result
        if cancel.is_cancelled() {
            return Err(StageFailure::new(stage, PipelineError::Cancelled));
        }

        let video = self
            .store
            .promote(&video)
            .await
            .map_err(|e| StageFailure::new(stage, e.into()))?;

        Ok(PipelineOutput {
            video,
            metrics,
            warnings,
            segment_count: segments.len(),
        })
    }

    async fn discard(&self, job_id: &str, ledger: &[Artifact]) {
        for artifact in ledger {
            if let Err(e) = artifact.remove().await {
                tracing::warn!(job_id = %job_id, kind = %artifact.kind, "Could not remove artifact {}: {}", artifact.path.display(), e);
            }
        }
        self.store.discard_job_dir(job_id).await;
    }
}

async fn enter(
    stage: PipelineStage,
    job_id: &str,
    cancel: &CancellationToken,
    observer: &dyn StageObserver,
) -> Result<(), StageFailure> {
    if cancel.is_cancelled() {
        return Err(StageFailure::new(stage, PipelineError::Cancelled));
    }
    tracing::info!(job_id = %job_id, stage = %stage, "▶️ Entering stage");
    observer.on_stage(stage).await;
    Ok(())
}
