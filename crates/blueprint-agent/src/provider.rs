//! Completion provider seam
//!
//! The pipeline only ever needs raw text back from a model. Providers make no
//! promise about its shape; the normalizer copes with whatever comes back.

use anyhow::Result;
use async_trait::async_trait;

/// Per-call provider options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOptions {
    pub model: String,
    /// Ask the provider for a JSON-only reply when it supports that mode
    pub force_structured_output: bool,
}

impl CompletionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            force_structured_output: true,
        }
    }

    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.force_structured_output = enabled;
        self
    }
}

/// Provider trait - implemented by every model backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name, for logs
    fn name(&self) -> &str;

    /// Complete `prompt` and return the raw reply text
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String>;
}
