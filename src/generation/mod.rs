//! Text-generation backend and the two generators built on top of it.
//!
//! The backend is a plain prompt-in, text-out capability (Gemini or Ollama). Summaries and
//! questions each own a prompt template and a tolerant response parser; a response that cannot
//! be parsed degrades the result instead of failing the run.

mod gemini;
mod ollama;
pub mod parse;
pub mod prompts;
pub mod questions;
pub mod summary;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use questions::{QuestionGenerator, QuestionOutcome, RawQuestion};
pub use summary::{Summary, SummaryGenerator, SummaryOutcome};

use crate::config::{Config, GenerationProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by a generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Backend was misconfigured or unreachable.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Backend returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Backend response envelope could not be decoded.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the generation backend.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier understood by the backend.
    pub model: String,
    /// Fully rendered prompt.
    pub prompt: String,
}

/// Interface implemented by text-generation backends.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

/// Backend selection and endpoints.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Which backend to talk to.
    pub provider: GenerationProvider,
    /// Model identifier.
    pub model: String,
    /// API key for Gemini.
    pub gemini_api_key: Option<String>,
    /// Optional Gemini endpoint override.
    pub gemini_url: Option<String>,
    /// Optional Ollama endpoint override.
    pub ollama_url: Option<String>,
}

impl BackendSettings {
    /// Extract backend settings from the service configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            provider: config.generation_provider,
            model: config.generation_model.clone(),
            gemini_api_key: config.gemini_api_key.clone(),
            gemini_url: config.gemini_url.clone(),
            ollama_url: config.ollama_url.clone(),
        }
    }
}

/// Build the generation client selected by `settings`.
pub fn build_generation_client(
    settings: &BackendSettings,
) -> Result<Arc<dyn GenerationClient>, GenerationError> {
    match settings.provider {
        GenerationProvider::Gemini => {
            let api_key = settings.gemini_api_key.clone().ok_or_else(|| {
                GenerationError::ProviderUnavailable("GEMINI_API_KEY is not set".into())
            })?;
            Ok(Arc::new(GeminiClient::new(settings.gemini_url.clone(), api_key)?))
        }
        GenerationProvider::Ollama => Ok(Arc::new(OllamaClient::new(settings.ollama_url.clone())?)),
    }
}
