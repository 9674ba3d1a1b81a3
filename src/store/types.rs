//! Records, update payloads and errors shared by document store implementations.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::TempPath;
use thiserror::Error;

/// Errors returned while talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Store responded with an unexpected status code.
    #[error("Unexpected store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Staging the downloaded blob on local disk failed.
    #[error("Failed to stage downloaded file: {0}")]
    Staging(#[from] std::io::Error),
    /// Referenced record or blob does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Store refused the operation.
    #[error("Store rejected {0}")]
    Rejected(String),
}

/// Processing status of a document row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Uploaded and waiting for enrichment.
    #[default]
    Pending,
    /// An enrichment run is in progress.
    Processing,
    /// Enrichment finished and all enrichment fields are set.
    Completed,
    /// The last enrichment run failed.
    Failed,
}

impl ProcessingStatus {
    /// Whether a run can end in this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Difficulty label attached to a question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Recall-level question.
    Easy,
    /// Default difficulty.
    #[default]
    Medium,
    /// Question requiring synthesis across the document.
    Hard,
}

impl Difficulty {
    /// Map a backend-provided label onto a difficulty, defaulting to `medium`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|value| value.trim().to_lowercase()).as_deref() {
            Some("easy") => Self::Easy,
            Some("hard") => Self::Hard,
            _ => Self::Medium,
        }
    }
}

/// Uploaded document under enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque row identifier.
    pub id: String,
    /// Object path of the uploaded file inside the bucket.
    pub storage_path: String,
    /// Organization the document belongs to.
    pub organization_name: String,
    /// Current processing status.
    pub processing_status: ProcessingStatus,
    /// Full extracted text.
    pub extracted_text: Option<String>,
    /// Number of pages in the source file.
    pub page_count: Option<u32>,
    /// Generated summary.
    pub ai_summary: Option<String>,
    /// Generated key points, in backend order.
    pub key_points: Option<Vec<String>>,
    /// RFC3339 timestamp of the last successful run.
    pub processed_at: Option<String>,
}

impl Document {
    /// Create a freshly uploaded, not yet processed document.
    pub fn new(
        id: impl Into<String>,
        storage_path: impl Into<String>,
        organization_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            storage_path: storage_path.into(),
            organization_name: organization_name.into(),
            processing_status: ProcessingStatus::Pending,
            extracted_text: None,
            page_count: None,
            ai_summary: None,
            key_points: None,
            processed_at: None,
        }
    }

    /// Merge a partial update into the row. Absent fields are left untouched.
    pub fn apply(&mut self, update: &DocumentUpdate) {
        if let Some(status) = update.processing_status {
            self.processing_status = status;
        }
        if let Some(text) = &update.extracted_text {
            self.extracted_text = Some(text.clone());
        }
        if let Some(pages) = update.page_count {
            self.page_count = Some(pages);
        }
        if let Some(summary) = &update.ai_summary {
            self.ai_summary = Some(summary.clone());
        }
        if let Some(points) = &update.key_points {
            self.key_points = Some(points.clone());
        }
        if let Some(processed_at) = &update.processed_at {
            self.processed_at = Some(processed_at.clone());
        }
    }

    /// A completed document carries every enrichment field.
    pub fn is_consistent(&self) -> bool {
        self.processing_status != ProcessingStatus::Completed
            || (self.extracted_text.is_some()
                && self.page_count.is_some()
                && self.ai_summary.is_some()
                && self.key_points.is_some()
                && self.processed_at.is_some())
    }
}

/// Partial update applied to a document row. Only populated fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentUpdate {
    /// New processing status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<ProcessingStatus>,
    /// Extracted full text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    /// Page count of the source file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Generated summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    /// Generated key points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
    /// Completion timestamp (RFC3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

impl DocumentUpdate {
    /// Update that only flips the processing status.
    pub fn status(status: ProcessingStatus) -> Self {
        Self {
            processing_status: Some(status),
            ..Self::default()
        }
    }

    /// Final update written by a successful run.
    pub fn completed(
        extracted_text: String,
        page_count: u32,
        ai_summary: String,
        key_points: Vec<String>,
        processed_at: String,
    ) -> Self {
        Self {
            processing_status: Some(ProcessingStatus::Completed),
            extracted_text: Some(extracted_text),
            page_count: Some(page_count),
            ai_summary: Some(ai_summary),
            key_points: Some(key_points),
            processed_at: Some(processed_at),
        }
    }
}

/// Validated multiple-choice question ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Document the question was generated from.
    pub document_id: String,
    /// Question prompt.
    pub question_text: String,
    /// Exactly four answer options.
    pub options: Vec<String>,
    /// Index of the correct option, in `0..=3`.
    pub correct_index: u8,
    /// Why the correct option is correct.
    pub explanation: String,
    /// Difficulty label.
    pub difficulty: Difficulty,
}

/// Downloaded blob staged on local disk for the lifetime of one run.
///
/// The file gets a unique name in the staging directory and is removed when the guard is
/// dropped, whichever way the run ends.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    /// Write `bytes` to a new uniquely named file in `staging_dir`, keeping the extension of
    /// `source_path`.
    pub async fn create(
        staging_dir: &Path,
        source_path: &str,
        bytes: &[u8],
    ) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(staging_dir).await?;
        let suffix = Path::new(source_path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let path = tempfile::Builder::new()
            .prefix("staged-")
            .suffix(&suffix)
            .tempfile_in(staging_dir)?
            .into_temp_path();
        tokio::fs::write(&path, bytes).await?;
        Ok(Self { path })
    }

    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staged file now, reporting removal errors.
    pub fn close(self) -> std::io::Result<()> {
        self.path.close()
    }
}
