//! Blueprint Agent - completion providers and the async generation pipeline
//!
//! The core crate is synchronous and never talks to a model. This crate adds
//! the [`CompletionProvider`] seam, an OpenAI-compatible backend, the intent
//! prompt and the [`GenerationPipeline`] that drives a request end to end on
//! the tokio runtime.

pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod providers;

pub use error::PipelineError;
pub use pipeline::{
    GenerationOutcome, GenerationPipeline, GenerationRequest, PipelineConfig, DOWNLOAD_PREFIX,
};
pub use prompt::build_intent_prompt;
pub use provider::{CompletionOptions, CompletionProvider};
pub use providers::OpenAICompatibleProvider;
