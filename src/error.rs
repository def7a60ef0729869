//! Error types for deployment orchestration

use std::time::Duration;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::shared::ProviderKind;

#[derive(Error, Debug)]
pub enum DeployError {
    /// Malformed request; never retried
    #[error("{0}")]
    Validation(String),

    /// Transport or non-2xx failure from a provider or GitHub
    #[error(transparent)]
    Provider(#[from] anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0} integration is not configured")]
    ProviderDisabled(ProviderKind),

    /// Every strategy failed
    #[error("All {attempts} deployment strategies failed. Last error: {last_error}")]
    Exhausted { attempts: usize, last_error: String },

    /// Deployment did not reach a terminal state in time; it may still be running
    #[error("Deployment {deployment_id} still in progress after {}s", .elapsed.as_secs())]
    PollTimeout {
        deployment_id: String,
        elapsed: Duration,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl DeployError {
    /// Whether trying another strategy could change the outcome
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DeployError::Validation(_) | DeployError::Cancelled)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DeployError::Validation(_) => StatusCode::BAD_REQUEST,
            DeployError::NotFound(_) => StatusCode::NOT_FOUND,
            DeployError::ProviderDisabled(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for DeployError {
    fn from(rejection: JsonRejection) -> Self {
        DeployError::Validation(rejection.body_text())
    }
}

impl IntoResponse for DeployError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DeployError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DeployError::NotFound("dpl_1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DeployError::ProviderDisabled(ProviderKind::Render).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            DeployError::Exhausted {
                attempts: 4,
                last_error: "boom".into()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_exhausted_message() {
        let err = DeployError::Exhausted {
            attempts: 5,
            last_error: "Vercel API error 400: invalid framework".into(),
        };
        assert_eq!(
            err.to_string(),
            "All 5 deployment strategies failed. Last error: Vercel API error 400: invalid framework"
        );
    }

    #[test]
    fn test_timeout_is_distinct() {
        let err = DeployError::PollTimeout {
            deployment_id: "dpl_1".into(),
            elapsed: Duration::from_secs(360),
        };
        assert!(err.to_string().contains("still in progress after 360s"));
        assert!(!DeployError::Cancelled.is_retryable());
        assert!(err.is_retryable());
    }
}
