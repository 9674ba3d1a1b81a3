//! Summary generation over the backend capability.

use super::parse::parse_summary;
use super::prompts::SummaryPrompt;
use super::{GenerationClient, GenerationError, GenerationRequest};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Structured summary of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Prose summary.
    pub summary: String,
    /// Key rules or points, in backend order.
    #[serde(default, deserialize_with = "lenient_key_points")]
    pub key_points: Vec<String>,
}

/// `null` or a non-list decodes as no key points; non-string entries are skipped.
fn lenient_key_points<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let points = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(point) => Some(point),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(points)
}

/// Result of one summarization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Backend returned the requested JSON object.
    Parsed(Summary),
    /// Backend returned something else; the summary is a prefix of the raw response.
    Degraded(Summary),
}

impl SummaryOutcome {
    /// Whether the fallback path was taken.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// The usable summary, regardless of how it was produced.
    pub fn into_summary(self) -> Summary {
        match self {
            Self::Parsed(summary) | Self::Degraded(summary) => summary,
        }
    }
}

/// Produces summaries through a generation backend.
#[derive(Clone)]
pub struct SummaryGenerator {
    client: Arc<dyn GenerationClient>,
    model: String,
    char_limit: usize,
    fallback_chars: usize,
}

impl SummaryGenerator {
    /// Create a generator embedding at most `char_limit` characters per prompt.
    pub fn new(
        client: Arc<dyn GenerationClient>,
        model: impl Into<String>,
        char_limit: usize,
        fallback_chars: usize,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            char_limit,
            fallback_chars,
        }
    }

    /// Summarize `text`. Only transport failures are errors.
    pub async fn summarize(&self, text: &str) -> Result<SummaryOutcome, GenerationError> {
        let prompt = SummaryPrompt::new(text, self.char_limit);
        let raw = self
            .client
            .generate(GenerationRequest {
                model: self.model.clone(),
                prompt: prompt.render(),
            })
            .await?;
        Ok(parse_summary(&raw, self.fallback_chars))
    }
}
