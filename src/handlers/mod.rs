// src/handlers/mod.rs
pub mod generation;
pub mod system;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::JobError;

impl JobError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            JobError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            JobError::NotFound(_) | JobError::ArtifactMissing(_) => StatusCode::NOT_FOUND,
            JobError::NotReady { .. } | JobError::NotCancellable { .. } => StatusCode::CONFLICT,
            JobError::QueueFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
            JobError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            JobError::InvalidConfig(_) => "invalid_config",
            JobError::NotFound(_) => "not_found",
            JobError::NotReady { .. } => "not_ready",
            JobError::ArtifactMissing(_) => "artifact_missing",
            JobError::QueueFull { .. } => "queue_full",
            JobError::NotCancellable { .. } => "not_cancellable",
            JobError::Io(_) => "internal",
        }
    }
}

impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            JobError::Io(e) => {
                tracing::error!("I/O error while serving request: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = json!({ "error": message, "code": self.code() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(JobError::InvalidConfig("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(JobError::NotFound("j".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            JobError::NotReady { job_id: "j".into(), status: "queued".into() }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(JobError::QueueFull { capacity: 1 }.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(JobError::ArtifactMissing("j".into()).code(), "artifact_missing");
    }
}
