// Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use text_to_video::artifacts::ArtifactStore;
use text_to_video::stages::{
    CompositionBackend, CompositionRequest, ImageBackend, NarrationAudio, NarrationBackend,
    NarrationSynthesizer, SceneSynthesizer, SentenceSegmenter, TextSegmenter, VideoComposer,
    VoiceParameters,
};
use text_to_video::{Job, JobLimits, JobManager, Orchestrator, StageError};

pub const FAKE_VIDEO: &[u8] = b"fake-mp4-bytes";

/// Short enough that every sentence of the test texts becomes its own segment
pub const SEGMENT_LENGTH: usize = 20;

pub struct FakeNarration {
    pub duration: f64,
    pub delay: Duration,
    pub fail: bool,
}

impl FakeNarration {
    pub fn ok() -> Self {
        Self { duration: 6.0, delay: Duration::ZERO, fail: false }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay, ..Self::ok() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::ok() }
    }
}

#[async_trait]
impl NarrationBackend for FakeNarration {
    async fn synthesize(&self, _text: &str, _voice: &VoiceParameters) -> Result<NarrationAudio, StageError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(StageError::Unavailable("speech service is down".to_string()));
        }
        Ok(NarrationAudio {
            bytes: vec![0x52, 0x49, 0x46, 0x46, 0, 0, 0, 0],
            duration_seconds: self.duration,
            extension: "wav",
        })
    }
}

/// Fails on the listed call numbers (0-based)
pub struct FakeImages {
    calls: AtomicUsize,
    failing: Vec<usize>,
}

impl FakeImages {
    pub fn ok() -> Self {
        Self::failing_on(Vec::new())
    }

    pub fn failing_on(failing: Vec<usize>) -> Self {
        Self { calls: AtomicUsize::new(0), failing }
    }
}

#[async_trait]
impl ImageBackend for FakeImages {
    async fn generate(&self, _prompt: &str, _w: u32, _h: u32) -> Result<Vec<u8>, StageError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&call) {
            return Err(StageError::Unavailable("image model out of memory".to_string()));
        }
        Ok(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A])
    }
}

pub struct FakeEncoder;

#[async_trait]
impl CompositionBackend for FakeEncoder {
    async fn compose(&self, request: &CompositionRequest) -> Result<(), StageError> {
        tokio::fs::write(&request.output, FAKE_VIDEO).await?;
        Ok(())
    }
}

pub fn orchestrator(root: &Path, narration: FakeNarration, images: FakeImages) -> Orchestrator {
    Orchestrator::new(
        TextSegmenter::new(Arc::new(SentenceSegmenter), SEGMENT_LENGTH),
        NarrationSynthesizer::new(Arc::new(narration)),
        SceneSynthesizer::new(Arc::new(images)),
        VideoComposer::new(Arc::new(FakeEncoder)),
        ArtifactStore::new(root.join("work"), root.join("outputs")),
    )
}

pub fn manager_with(
    root: &Path,
    narration: FakeNarration,
    images: FakeImages,
    limits: JobLimits,
) -> Arc<JobManager> {
    Arc::new(JobManager::new(orchestrator(root, narration, images), limits))
}

pub fn manager(root: &Path) -> Arc<JobManager> {
    manager_with(root, FakeNarration::ok(), FakeImages::ok(), JobLimits::default())
}

/// Poll until the job reaches a terminal status
pub async fn wait_for_terminal(manager: &JobManager, job_id: &str) -> Job {
    for _ in 0..500 {
        let job = manager.get_status(job_id).await.expect("job should exist");
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish in time", job_id);
}

/// Poll until the job leaves `queued`
pub async fn wait_for_processing(manager: &JobManager, job_id: &str) -> Job {
    for _ in 0..500 {
        let job = manager.get_status(job_id).await.expect("job should exist");
        if job.status != text_to_video::JobStatus::Queued {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} never started", job_id);
}
