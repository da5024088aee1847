//! Error types for the Gateway

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use blueprint_agent::PipelineError;
use blueprint_core::ErrorClass;
use serde_json::json;
use thiserror::Error;

/// Gateway error type
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(e) => match e {
                PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                PipelineError::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                PipelineError::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                other => match other.class() {
                    ErrorClass::Client => StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorClass::Retryable => StatusCode::SERVICE_UNAVAILABLE,
                    ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                },
            },
            Self::InvalidConfig(_) | Self::Io(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Pipeline(e) => e.kind(),
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Pipeline(e) if e.is_retryable())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() && !self.is_retryable() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            tracing::warn!(
                kind = self.kind(),
                error = %self,
                status = status.as_u16(),
                "request rejected"
            );
            self.to_string()
        };

        let body = json!({
            "success": false,
            "error": {
                "kind": self.kind(),
                "message": message,
                "retryable": self.is_retryable(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Result type for Gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::{BlueprintError, IntegrityError, UnsupportedFeatureError};
    use std::time::Duration;

    fn pipeline(e: PipelineError) -> GatewayError {
        GatewayError::Pipeline(e)
    }

    #[test]
    fn test_status_mapping() {
        let unsupported = pipeline(PipelineError::Core(
            UnsupportedFeatureError::Database("postgres".to_string()).into(),
        ));
        assert_eq!(unsupported.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(unsupported.kind(), "unsupported_feature");

        let timeout = pipeline(PipelineError::ProviderTimeout {
            provider: "openai".to_string(),
            timeout: Duration::from_secs(60),
        });
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(timeout.is_retryable());

        let integrity = pipeline(PipelineError::Core(BlueprintError::Integrity(
            IntegrityError::UnexpectedFile {
                path: "stray.js".into(),
            },
        )));
        assert_eq!(integrity.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!integrity.is_retryable());

        assert_eq!(
            GatewayError::InvalidRequest("bad json".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
