// lib.rs - Main library file that exports all modules
use axum::{Extension, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod artifacts;
pub mod backends;
pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod presets;
pub mod stages;
pub mod types;
pub mod utils;

// Re-export commonly used types for convenience
pub use error::{JobError, PipelineError, StageError, StageFailure};
pub use jobs::{Job, JobLimits, JobManager, JobStatus, SharedJobManager};
pub use pipeline::{Orchestrator, PipelineStage};
pub use types::*;

// AppState holds the job manager shared by every handler
pub struct AppState {
    pub job_manager: SharedJobManager,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(job_manager: SharedJobManager) -> Self {
        Self {
            job_manager,
            started_at: Utc::now(),
        }
    }
}

/// Build the application with all routes and shared state
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::system::system_routes())
        .merge(handlers::generation::generation_routes())
        .layer(axum::middleware::from_fn(
            middleware::logging::request_logging_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
