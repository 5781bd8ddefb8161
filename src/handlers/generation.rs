// src/handlers/generation.rs
//! Job endpoints: submit, status, download, list, delete, cancel, demo

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Extension, Path},
    http::{header, StatusCode},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::error::JobError;
use crate::jobs::{Job, JobStatus};
use crate::presets::{find_preset, DEFAULT_PRESET};
use crate::types::{GenerationRequest, JobId, VideoConfig};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DemoRequest {
    pub example_type: Option<String>,
}

pub fn generation_routes() -> Router {
    Router::new()
        .route("/api/generate-video", post(generate_video))
        .route("/api/job-status/:job_id", get(get_job_status))
        .route("/api/download-video/:job_id", get(download_video))
        .route("/api/jobs", get(list_jobs))
        .route("/api/job/:job_id", delete(delete_job))
        .route("/api/job/:job_id/cancel", post(cancel_job))
        .route("/api/demo", post(run_demo))
}

fn estimated_time(config: &VideoConfig) -> String {
    format!("{} seconds", config.duration_seconds + 60)
}

/// POST /api/generate-video - Submit a generation job
async fn generate_video(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<Value>, JobError> {
    let Json(request) =
        payload.map_err(|e| JobError::InvalidConfig(format!("malformed request body: {}", e.body_text())))?;

    let (text, config) = request.into_parts()?;
    let estimate = estimated_time(&config);
    let job_id = state.job_manager.submit(text, config).await?;

    Ok(Json(json!({
        "job_id": job_id,
        "status": JobStatus::Queued,
        "message": "Video generation started",
        "estimated_time": estimate,
    })))
}

fn status_body(job: &Job) -> Value {
    let mut body = json!({
        "job_id": job.id,
        "status": job.status,
        "created_at": job.created_at,
        "text_preview": job.text_preview(),
    });

    if let Some(started_at) = job.started_at {
        body["started_at"] = json!(started_at);
    }
    if let Some(stage) = job.current_stage {
        body["current_stage"] = json!(stage);
    }
    if let (Some(completed_at), Some(processing_time)) = (job.completed_at, job.processing_time()) {
        body["completed_at"] = json!(completed_at);
        body["processing_time"] = json!(processing_time);
    }
    if !job.warnings.is_empty() {
        body["warnings"] = json!(job.warnings);
    }
    match job.status {
        JobStatus::Completed => {
            if let Some(metrics) = &job.metrics {
                body["metrics"] = json!(metrics);
            }
            body["download_url"] = json!(format!("/api/download-video/{}", job.id));
        }
        JobStatus::Failed => {
            body["error_message"] = json!(job.error);
        }
        _ => {}
    }
    body
}

/// GET /api/job-status/:job_id - Job snapshot
async fn get_job_status(
    Path(job_id): Path<JobId>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, JobError> {
    let job = state.job_manager.get_status(&job_id).await?;
    Ok(Json(status_body(&job)))
}

/// GET /api/download-video/:job_id - Stream the finished video
async fn download_video(
    Path(job_id): Path<JobId>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, JobError> {
    let download = state.job_manager.download_artifact(&job_id).await?;
    let stream = ReaderStream::new(download.file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, download.size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"generated_video_{}.mp4\"", job_id),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| JobError::Io(std::io::Error::other(e)))
}

/// GET /api/jobs - All jobs, newest first
async fn list_jobs(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let summaries = state.job_manager.list_jobs().await;
    let jobs: Vec<Value> = summaries
        .iter()
        .map(|summary| {
            json!({
                "job_id": summary.job_id,
                "status": summary.status,
                "created_at": summary.created_at,
                "text_preview": summary.text_preview,
                "config": {
                    "tone": summary.tone,
                    "domain": summary.domain,
                    "environment": summary.environment,
                    "duration": summary.duration,
                }
            })
        })
        .collect();

    Json(json!({
        "total_jobs": jobs.len(),
        "jobs": jobs,
    }))
}

/// DELETE /api/job/:job_id - Delete a job and its video
async fn delete_job(
    Path(job_id): Path<JobId>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, JobError> {
    state.job_manager.delete_job(&job_id).await?;
    Ok(Json(json!({ "message": "Job deleted successfully" })))
}

/// POST /api/job/:job_id/cancel - Cancel a queued or processing job
async fn cancel_job(
    Path(job_id): Path<JobId>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, JobError> {
    state.job_manager.cancel(&job_id).await?;
    Ok(Json(json!({
        "job_id": job_id,
        "status": JobStatus::Cancelled,
        "message": "Job cancelled",
    })))
}

/// POST /api/demo - Submit a built-in example
async fn run_demo(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<DemoRequest>>,
) -> Result<Json<Value>, JobError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let example_type = request
        .example_type
        .unwrap_or_else(|| DEFAULT_PRESET.to_string());

    let preset = find_preset(&example_type)
        .ok_or_else(|| JobError::InvalidConfig(format!("Invalid example type '{}'", example_type)))?;

    let job_id = state
        .job_manager
        .submit(preset.text.to_string(), preset.config())
        .await?;

    Ok(Json(json!({
        "job_id": job_id,
        "status": JobStatus::Queued,
        "example_type": preset.name,
        "message": format!("Demo video generation started for {}", preset.name),
        "text_preview": crate::utils::preview(preset.text, 100),
    })))
}
