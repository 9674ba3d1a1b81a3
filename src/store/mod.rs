//! Document store capability: blob download, document updates and question inserts.

pub mod memory;
pub mod rest;
pub mod types;

pub use memory::{MemoryDocumentStore, StoreCall, StoreOperation};
pub use rest::RestDocumentStore;
pub use types::{
    Difficulty, Document, DocumentUpdate, ProcessingStatus, QuestionRecord, StagedFile,
    StoreError,
};

use async_trait::async_trait;
use std::path::Path;

/// Persistence operations consumed by the enrichment pipeline.
///
/// Implementations own retries; the pipeline treats any error as the end of the run.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch `bucket/path` into a scoped file under `staging_dir`.
    async fn download_file(
        &self,
        bucket: &str,
        path: &str,
        staging_dir: &Path,
    ) -> Result<StagedFile, StoreError>;

    /// Merge the populated fields of `update` into the document row.
    async fn update_document(
        &self,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<(), StoreError>;

    /// Append a batch of questions in a single call. An empty batch is a no-op.
    async fn insert_questions(&self, questions: Vec<QuestionRecord>) -> Result<(), StoreError>;
}
