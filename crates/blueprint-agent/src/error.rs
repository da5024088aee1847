//! Pipeline errors
//!
//! Provider failures are kept apart from core failures so the transport can
//! tell a retryable upstream problem from a bad intent.

use blueprint_core::{BlueprintError, ErrorClass};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider `{provider}` did not answer within {}s", timeout.as_secs_f64())]
    ProviderTimeout { provider: String, timeout: Duration },

    #[error("Provider `{provider}` is unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error(transparent)]
    Core(#[from] BlueprintError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidRequest(_) => ErrorClass::Client,
            Self::ProviderTimeout { .. } | Self::ProviderUnavailable { .. } => {
                ErrorClass::Retryable
            }
            Self::Core(e) => e.class(),
            Self::Task(_) => ErrorClass::Internal,
        }
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::ProviderTimeout { .. } => "provider_timeout",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::Core(e) => e.kind(),
            Self::Task(_) => "internal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::MalformedIntentError;

    #[test]
    fn test_classification() {
        let timeout = PipelineError::ProviderTimeout {
            provider: "openai".to_string(),
            timeout: Duration::from_secs(60),
        };
        assert!(timeout.is_retryable());
        assert_eq!(timeout.kind(), "provider_timeout");
        assert!(timeout.to_string().contains("60s"));

        let core: PipelineError = BlueprintError::from(MalformedIntentError::NoEntities).into();
        assert_eq!(core.class(), ErrorClass::Client);
        assert_eq!(core.kind(), "malformed_intent");
        assert!(!core.is_retryable());
    }
}
