// src/handlers/system.rs
//! Service endpoints: health, configuration options and metrics

use axum::{extract::Extension, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::metrics::{system_snapshot, SystemSnapshot};
use crate::types::{Domain, Environment, Tone};
use crate::AppState;

pub const SUPPORTED_LANGUAGES: [&str; 5] = ["en", "hi", "es", "fr", "de"];
pub const RESOLUTION_OPTIONS: [[u32; 2]; 4] = [[1920, 1080], [1280, 720], [854, 480], [640, 360]];
pub const FPS_OPTIONS: [u32; 4] = [24, 25, 30, 60];

pub fn system_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/available-options", get(available_options))
        .route("/api/metrics", get(system_metrics))
}

/// GET /health
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/available-options
async fn available_options() -> Json<Value> {
    Json(json!({
        "tones": Tone::ALL.iter().map(Tone::as_str).collect::<Vec<_>>(),
        "domains": Domain::ALL.iter().map(Domain::as_str).collect::<Vec<_>>(),
        "environments": Environment::ALL.iter().map(Environment::as_str).collect::<Vec<_>>(),
        "languages": SUPPORTED_LANGUAGES,
        "resolutions": RESOLUTION_OPTIONS,
        "fps_options": FPS_OPTIONS,
    }))
}

/// GET /api/metrics - Host resources and job counts
async fn system_metrics(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let snapshot = tokio::task::spawn_blocking(system_snapshot)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("System probe failed: {}", e);
            SystemSnapshot {
                cpu_usage: 0.0,
                memory_usage: 0.0,
                memory_available_gb: 0.0,
                gpu_usage: 0.0,
            }
        });
    let stats = state.job_manager.stats().await;

    Json(json!({
        "system": {
            "cpu_usage": snapshot.cpu_usage,
            "memory_usage": snapshot.memory_usage,
            "memory_available_gb": (snapshot.memory_available_gb * 100.0).round() / 100.0,
        },
        "gpu": {
            "gpu_usage": snapshot.gpu_usage,
        },
        "jobs": {
            "total_jobs": stats.total,
            "queued_jobs": stats.queued,
            "processing_jobs": stats.processing,
            "completed_jobs": stats.completed,
            "failed_jobs": stats.failed,
            "cancelled_jobs": stats.cancelled,
        },
        "uptime_seconds": (Utc::now() - state.started_at).num_seconds(),
    }))
}
