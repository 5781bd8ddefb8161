// src/error.rs
//! Error taxonomy for stage backends, the pipeline and the job manager.

use thiserror::Error;

use crate::pipeline::PipelineStage;
use crate::types::JobId;

/// Failure reported by a backend behind a stage function
#[derive(Error, Debug)]
pub enum StageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),
    #[error("backend returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Fatal pipeline failures. Per-scene image failures never appear here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("narration synthesis failed: {0}")]
    Synthesis(String),
    #[error("subtitle generation failed: {0}")]
    Subtitle(String),
    #[error("video composition failed: {0}")]
    Composition(String),
    #[error("artifact storage failed: {0}")]
    Storage(#[from] std::io::Error),
    #[error("job was cancelled")]
    Cancelled,
}

/// A pipeline error tagged with the stage it originated in
#[derive(Error, Debug)]
#[error("{stage} stage failed: {error}")]
pub struct StageFailure {
    pub stage: PipelineStage,
    #[source]
    pub error: PipelineError,
}

impl StageFailure {
    pub fn new(stage: PipelineStage, error: PipelineError) -> Self {
        Self { stage, error }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, PipelineError::Cancelled)
    }
}

/// Errors surfaced by job submission and queries
#[derive(Error, Debug)]
pub enum JobError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("job {job_id} is not ready (status: {status})")]
    NotReady { job_id: JobId, status: String },
    #[error("video file for job {0} is missing from storage")]
    ArtifactMissing(JobId),
    #[error("job queue is full ({capacity} jobs in flight)")]
    QueueFull { capacity: usize },
    #[error("job {job_id} cannot be cancelled (status: {status})")]
    NotCancellable { job_id: JobId, status: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid startup configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}
