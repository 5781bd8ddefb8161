// src/jobs/mod.rs
//! Background job system for text-to-video generation.
//! Jobs live in process memory only; nothing survives a restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::JobError;
use crate::pipeline::{Orchestrator, PipelineStage};
use crate::types::{Domain, Environment, Tone, VideoConfig, VideoMetrics};
pub use crate::types::JobId;
use crate::utils::preview;

pub mod generation_job;

use generation_job::GenerationJob;

/// Job lifecycle: `queued → processing → completed | failed`, plus `cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked generation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub text: String,
    pub config: VideoConfig,
    pub status: JobStatus,
    pub current_stage: Option<PipelineStage>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub video_path: Option<PathBuf>,
    pub metrics: Option<VideoMetrics>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    /// Submission order; breaks ties between equal `created_at` values
    #[serde(skip)]
    pub sequence: u64,
}

impl Job {
    fn new(text: String, config: VideoConfig, sequence: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            config,
            status: JobStatus::Queued,
            current_stage: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            video_path: None,
            metrics: None,
            error: None,
            warnings: Vec::new(),
            sequence,
        }
    }

    /// Seconds from submission to completion, once terminal
    pub fn processing_time(&self) -> Option<f64> {
        self.completed_at
            .map(|done| (done - self.created_at).num_milliseconds() as f64 / 1000.0)
    }

    pub fn text_preview(&self) -> String {
        preview(&self.text, 100)
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.id.clone(),
            status: self.status,
            created_at: self.created_at,
            completed_at: self.completed_at,
            text_preview: preview(&self.text, 50),
            tone: self.config.tone,
            domain: self.config.domain,
            environment: self.config.environment,
            duration: self.config.duration_seconds,
        }
    }
}

/// Row in the job list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub text_preview: String,
    pub tone: Tone,
    pub domain: Domain,
    pub environment: Environment,
    pub duration: u32,
}

/// Job counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub total: usize,
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// An opened, completed video ready to be streamed
#[derive(Debug)]
pub struct VideoDownload {
    pub file: tokio::fs::File,
    pub path: PathBuf,
    pub size: u64,
}

/// Limits applied to job execution
#[derive(Debug, Clone, Copy)]
pub struct JobLimits {
    /// Orchestrations running at once
    pub max_concurrent: usize,
    /// Queued plus processing jobs accepted before `QueueFull`
    pub max_pending: usize,
}

impl Default for JobLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            max_pending: 16,
        }
    }
}

/// Job manager handles background job execution and state
pub struct JobManager {
    /// All known jobs indexed by job_id
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
    /// Cancellation tokens for jobs that have not finished
    tokens: Arc<RwLock<HashMap<JobId, CancellationToken>>>,
    orchestrator: Arc<Orchestrator>,
    /// Worker slots shared by all running orchestrations
    workers: Arc<Semaphore>,
    limits: JobLimits,
    sequence: AtomicU64,
}

impl JobManager {
    pub fn new(orchestrator: Orchestrator, limits: JobLimits) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tokens: Arc::new(RwLock::new(HashMap::new())),
            orchestrator: Arc::new(orchestrator),
            workers: Arc::new(Semaphore::new(limits.max_concurrent.max(1))),
            limits,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn limits(&self) -> JobLimits {
        self.limits
    }

    /// Validate and enqueue a job. Orchestration runs on a spawned task; this
    /// returns as soon as the `queued` record exists.
    pub async fn submit(self: &Arc<Self>, text: String, config: VideoConfig) -> Result<JobId, JobError> {
        if text.trim().is_empty() {
            return Err(JobError::InvalidConfig("text must not be empty".to_string()));
        }
        config.validate()?;

        let job = Job::new(text, config, self.sequence.fetch_add(1, Ordering::SeqCst));
        let job_id = job.id.clone();
        let token = CancellationToken::new();

        {
            let mut jobs = self.jobs.write().await;
            let in_flight = jobs.values().filter(|j| !j.status.is_terminal()).count();
            if in_flight >= self.limits.max_pending {
                tracing::warn!("🚦 Rejecting submission, {} jobs in flight", in_flight);
                return Err(JobError::QueueFull {
                    capacity: self.limits.max_pending,
                });
            }
            jobs.insert(job_id.clone(), job.clone());
            self.tokens.write().await.insert(job_id.clone(), token.clone());
        }

        tracing::info!(job_id = %job_id, tone = %job.config.tone, domain = %job.config.domain, "🎬 Created job");

        let run = GenerationJob::new(job, Arc::clone(self), self.workers.clone(), token);
        tokio::spawn(run.execute());

        Ok(job_id)
    }

    /// Snapshot of one job
    pub async fn get_status(&self, job_id: &str) -> Result<Job, JobError> {
        let jobs = self.jobs.read().await;
        jobs.get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// All jobs, most recent first
    pub async fn list_jobs(&self) -> Vec<JobSummary> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<&Job> = jobs.values().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.sequence.cmp(&a.sequence))
        });
        all.into_iter().map(Job::summary).collect()
    }

    /// Remove a job. An in-flight run is cancelled and its result discarded.
    pub async fn delete_job(&self, job_id: &str) -> Result<(), JobError> {
        let job = {
            let mut jobs = self.jobs.write().await;
            jobs.remove(job_id)
                .ok_or_else(|| JobError::NotFound(job_id.to_string()))?
        };

        if let Some(token) = self.tokens.write().await.remove(job_id) {
            token.cancel();
        }

        if let Some(path) = &job.video_path {
            remove_video(job_id, path).await;
        }

        tracing::info!(job_id = %job_id, "🗑️ Deleted job");
        Ok(())
    }

    /// Open the finished video for streaming
    pub async fn download_artifact(&self, job_id: &str) -> Result<VideoDownload, JobError> {
        let job = self.get_status(job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(JobError::NotReady {
                job_id: job.id,
                status: job.status.to_string(),
            });
        }

        let path = job
            .video_path
            .ok_or_else(|| JobError::ArtifactMissing(job_id.to_string()))?;

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(JobError::ArtifactMissing(job_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        Ok(VideoDownload { file, path, size })
    }

    /// Cancel a queued or processing job
    pub async fn cancel(&self, job_id: &str) -> Result<(), JobError> {
        {
            let mut jobs = self.jobs.write().await;
            let job = jobs
                .get_mut(job_id)
                .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

            if job.status.is_terminal() {
                return Err(JobError::NotCancellable {
                    job_id: job_id.to_string(),
                    status: job.status.to_string(),
                });
            }

            job.status = JobStatus::Cancelled;
            job.completed_at = Some(Utc::now());
            job.current_stage = None;
        }

        if let Some(token) = self.tokens.write().await.remove(job_id) {
            token.cancel();
        }

        tracing::info!(job_id = %job_id, "🛑 Cancelled job");
        Ok(())
    }

    pub async fn stats(&self) -> JobStats {
        let jobs = self.jobs.read().await;
        let mut stats = JobStats {
            total: jobs.len(),
            ..JobStats::default()
        };
        for job in jobs.values() {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// Remove terminal jobs that finished more than `max_age` ago, with their files.
    /// Returns how many were evicted.
    pub async fn evict_terminal_jobs(&self, max_age: chrono::Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            tracing::warn!("Eviction age {} is out of range, nothing evicted", max_age);
            return 0;
        };

        let evicted: Vec<Job> = {
            let mut jobs = self.jobs.write().await;
            let expired: Vec<JobId> = jobs
                .values()
                .filter(|job| job.status.is_terminal())
                .filter(|job| job.completed_at.map_or(false, |done| done < cutoff))
                .map(|job| job.id.clone())
                .collect();
            expired.iter().filter_map(|id| jobs.remove(id)).collect()
        };

        for job in &evicted {
            if let Some(path) = &job.video_path {
                remove_video(&job.id, path).await;
            }
            tracing::debug!(job_id = %job.id, "🗑️ Evicted old job");
        }

        evicted.len()
    }

    pub(crate) fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    // Transitions used by the running job. None of them touch a terminal record.

    pub(crate) async fn mark_processing(&self, job_id: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(job) if job.status == JobStatus::Queued => {
                job.status = JobStatus::Processing;
                job.started_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    pub(crate) async fn set_stage(&self, job_id: &str, stage: PipelineStage) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            if job.status == JobStatus::Processing {
                job.current_stage = Some(stage);
            }
        }
    }

    /// Record a finished video. Returns false when the job was deleted or
    /// cancelled meanwhile; the caller then owns the file and must remove it.
    pub(crate) async fn complete(
        &self,
        job_id: &str,
        video_path: PathBuf,
        metrics: VideoMetrics,
        warnings: Vec<String>,
    ) -> bool {
        let recorded = {
            let mut jobs = self.jobs.write().await;
            match jobs.get_mut(job_id) {
                Some(job) if !job.status.is_terminal() => {
                    job.status = JobStatus::Completed;
                    job.completed_at = Some(Utc::now());
                    job.current_stage = None;
                    job.video_path = Some(video_path);
                    job.metrics = Some(metrics);
                    job.warnings = warnings;
                    true
                }
                _ => false,
            }
        };
        self.tokens.write().await.remove(job_id);
        recorded
    }

    pub(crate) async fn fail(&self, job_id: &str, error: String) {
        {
            let mut jobs = self.jobs.write().await;
            if let Some(job) = jobs.get_mut(job_id) {
                if !job.status.is_terminal() {
                    job.status = JobStatus::Failed;
                    job.completed_at = Some(Utc::now());
                    job.error = Some(error);
                }
            }
        }
        self.tokens.write().await.remove(job_id);
    }
}

/// Best-effort removal of a video file; errors are only logged
async fn remove_video(job_id: &str, path: &std::path::Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(job_id = %job_id, "Failed to remove video {}: {}", path.display(), e),
    }
}

/// Global job manager instance (stored in AppState)
pub type SharedJobManager = Arc<JobManager>;
