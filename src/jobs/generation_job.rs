// src/jobs/generation_job.rs
//! Background executor for one generation job: waits for a worker slot, runs
//! the pipeline and records the outcome on the job record.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::{Job, JobId, JobManager};
use crate::pipeline::{PipelineStage, StageObserver};

/// Mirrors stage transitions onto the job record
struct JobStageObserver {
    manager: Arc<JobManager>,
    job_id: JobId,
}

#[async_trait]
impl StageObserver for JobStageObserver {
    async fn on_stage(&self, stage: PipelineStage) {
        self.manager.set_stage(&self.job_id, stage).await;
    }
}

/// Generation job that runs in background
pub struct GenerationJob {
    job: Job,
    manager: Arc<JobManager>,
    workers: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl GenerationJob {
    pub fn new(
        job: Job,
        manager: Arc<JobManager>,
        workers: Arc<Semaphore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job,
            manager,
            workers,
            cancel,
        }
    }

    /// Execute the job. Never panics outward; every failure ends on the record.
    pub async fn execute(self) {
        let job_id = self.job.id.clone();

        let _permit = tokio::select! {
            permit = self.workers.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    self.manager.fail(&job_id, "worker pool closed".to_string()).await;
                    return;
                }
            },
            _ = self.cancel.cancelled() => {
                tracing::info!(job_id = %job_id, "Job cancelled while queued");
                return;
            }
        };

        // Cancelled or deleted between the permit and now
        if !self.manager.mark_processing(&job_id).await {
            return;
        }
        tracing::info!(job_id = %job_id, "🚀 Starting generation job");

        let manager = self.manager.clone();
        let cancel = self.cancel.clone();
        let Job { text, config, .. } = self.job;
        let run_id = job_id.clone();

        // Run on its own task so a panic inside a stage surfaces as a JoinError
        let handle = tokio::spawn(async move {
            let observer = JobStageObserver {
                manager: manager.clone(),
                job_id: run_id.clone(),
            };
            manager
                .orchestrator()
                .run(&run_id, &text, &config, &cancel, &observer)
                .await
        });

        match handle.await {
            Ok(Ok(output)) => {
                let path = output.video.path.clone();
                let recorded = self
                    .manager
                    .complete(&job_id, path, output.metrics, output.warnings)
                    .await;
                if recorded {
                    tracing::info!(job_id = %job_id, segments = output.segment_count, "🎉 Job completed");
                } else {
                    tracing::info!(job_id = %job_id, "Discarding result of cancelled or deleted job");
                    if let Err(e) = output.video.remove().await {
                        tracing::warn!(job_id = %job_id, "Failed to remove discarded video: {}", e);
                    }
                }
            }
            Ok(Err(failure)) if failure.is_cancelled() => {
                // Status was already set by cancel() or the record is gone
            }
            Ok(Err(failure)) => {
                self.manager.fail(&job_id, failure.to_string()).await;
            }
            Err(join_error) => {
                tracing::error!(job_id = %job_id, "Generation task aborted: {}", join_error);
                self.manager
                    .fail(&job_id, "internal error during generation".to_string())
                    .await;
                self.manager.orchestrator().store().discard_job_dir(&job_id).await;
            }
        }
    }
}
