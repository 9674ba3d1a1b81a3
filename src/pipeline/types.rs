//! Request, result and error types for enrichment runs.

use crate::{
    config::Config, extraction::ExtractionError, generation::GenerationError, store::StoreError,
};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Input of one enrichment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRequest {
    /// Row to enrich.
    pub document_id: String,
    /// Object path of the uploaded file inside the bucket.
    pub file_path: String,
    /// Organization context forwarded to question generation.
    pub organization_name: String,
}

/// Outcome reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentStatus {
    /// Document reached `completed`.
    Success,
    /// Document ended `failed`.
    Error,
}

/// Envelope returned by a run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    /// Overall outcome.
    pub status: EnrichmentStatus,
    /// Row the run operated on.
    pub document_id: String,
    /// Failure description, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EnrichmentResult {
    /// Successful run.
    pub fn success(document_id: impl Into<String>) -> Self {
        Self {
            status: EnrichmentStatus::Success,
            document_id: document_id.into(),
            message: None,
        }
    }

    /// Failed run with the error text passed through.
    pub fn error(document_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: EnrichmentStatus::Error,
            document_id: document_id.into(),
            message: Some(message.into()),
        }
    }

    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        self.status == EnrichmentStatus::Success
    }
}

/// Step of a run, used to label timeouts, cancellations and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Flipping the row to `processing`.
    MarkingProcessing,
    /// Fetching the blob into the staging area.
    Downloading,
    /// Running the text extractor.
    Extracting,
    /// Calling the summary generator.
    Summarizing,
    /// Calling the question generator.
    GeneratingQuestions,
    /// Writing questions and the final document update.
    Persisting,
}

impl RunStage {
    /// Stable snake_case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarkingProcessing => "marking_processing",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::Summarizing => "summarizing",
            Self::GeneratingQuestions => "generating_questions",
            Self::Persisting => "persisting",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that end a run. Their text is passed through to the caller unchanged.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source file could not be read or parsed.
    #[error("{path}: {source}")]
    Extraction {
        /// Object path of the source inside the bucket.
        path: String,
        /// Extractor failure.
        #[source]
        source: ExtractionError,
    },
    /// Generation backend transport failure.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// Download or persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A call exceeded the per-call deadline.
    #[error("{stage} timed out after {after:?}")]
    Timeout {
        /// Step that was running.
        stage: RunStage,
        /// Deadline that elapsed.
        after: Duration,
    },
    /// The run was cancelled while a call was in flight.
    #[error("run cancelled during {stage}")]
    Cancelled {
        /// Step that was running.
        stage: RunStage,
    },
}

/// Run-independent settings shared by every run of a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Bucket holding uploaded files.
    pub bucket: String,
    /// Directory for staged downloads.
    pub staging_dir: PathBuf,
    /// Deadline applied to each suspending call.
    pub call_timeout: Duration,
}

impl PipelineSettings {
    /// Derive pipeline settings from the service configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            bucket: config.store_bucket.clone(),
            staging_dir: config.staging_dir.clone(),
            call_timeout: config.call_timeout(),
        }
    }
}

/// Counters describing a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Pages in the source file.
    pub page_count: u32,
    /// Questions written to the store.
    pub questions_inserted: usize,
    /// Generated questions rejected by validation.
    pub questions_dropped: usize,
    /// Whether the summary used the raw-text fallback.
    pub degraded_summary: bool,
}
