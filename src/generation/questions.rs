//! Multiple-choice question generation.

use super::parse::parse_questions;
use super::prompts::QuestionPrompt;
use super::{GenerationClient, GenerationError, GenerationRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Question exactly as the backend produced it; every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestion {
    /// Question stem.
    #[serde(default)]
    pub question_text: Option<String>,
    /// Answer options.
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Index of the correct option.
    #[serde(default)]
    pub correct_index: Option<i64>,
    /// Why the answer is correct.
    #[serde(default)]
    pub explanation: Option<String>,
    /// `easy`, `medium` or `hard`.
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Result of one question-generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionOutcome {
    /// Backend returned a JSON array; items are unvalidated.
    Parsed(Vec<RawQuestion>),
    /// Backend returned something other than a JSON array.
    Empty,
}

impl QuestionOutcome {
    /// Raw items, empty when parsing failed.
    pub fn into_items(self) -> Vec<RawQuestion> {
        match self {
            Self::Parsed(items) => items,
            Self::Empty => Vec::new(),
        }
    }
}

/// Produces multiple-choice questions through a generation backend.
#[derive(Clone)]
pub struct QuestionGenerator {
    client: Arc<dyn GenerationClient>,
    model: String,
    char_limit: usize,
    target_count: usize,
}

impl QuestionGenerator {
    /// Create a generator requesting `target_count` questions per document.
    pub fn new(
        client: Arc<dyn GenerationClient>,
        model: impl Into<String>,
        char_limit: usize,
        target_count: usize,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            char_limit,
            target_count,
        }
    }

    /// Generate questions for `text` in the context of `organization`.
    pub async fn generate_questions(
        &self,
        text: &str,
        organization: &str,
    ) -> Result<QuestionOutcome, GenerationError> {
        let prompt = QuestionPrompt::new(text, organization, self.target_count, self.char_limit);
        let raw = self
            .client
            .generate(GenerationRequest {
                model: self.model.clone(),
                prompt: prompt.render(),
            })
            .await?;
        Ok(parse_questions(&raw))
    }
}
