//! In-process document store used by tests and local experiments.

use crate::store::{
    DocumentStore,
    types::{Document, DocumentUpdate, QuestionRecord, StagedFile, StoreError},
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::Mutex;

/// Store operation, used to record calls and to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `download_file`
    Download,
    /// `update_document`
    Update,
    /// `insert_questions`
    InsertQuestions,
}

/// One recorded call against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    /// Blob download.
    Download {
        /// Bucket name.
        bucket: String,
        /// Object path.
        path: String,
    },
    /// Partial document update.
    Update {
        /// Target row.
        document_id: String,
        /// Fields sent.
        update: DocumentUpdate,
    },
    /// Bulk question insert.
    InsertQuestions {
        /// Number of rows in the batch.
        count: usize,
    },
}

#[derive(Default)]
struct MemoryState {
    documents: HashMap<String, Document>,
    questions: Vec<QuestionRecord>,
    blobs: HashMap<String, Vec<u8>>,
    calls: Vec<StoreCall>,
    failing: HashSet<StoreOperation>,
}

/// Document store backed by process memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    state: Mutex<MemoryState>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document row.
    pub async fn put_document(&self, document: Document) {
        let mut state = self.state.lock().await;
        state.documents.insert(document.id.clone(), document);
    }

    /// Store a blob under `bucket/path`.
    pub async fn put_blob(&self, bucket: &str, path: &str, bytes: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().await;
        state.blobs.insert(blob_key(bucket, path), bytes.into());
    }

    /// Make every subsequent call of `operation` fail.
    pub async fn fail_on(&self, operation: StoreOperation) {
        self.state.lock().await.failing.insert(operation);
    }

    /// Current state of a document row.
    pub async fn document(&self, document_id: &str) -> Option<Document> {
        self.state.lock().await.documents.get(document_id).cloned()
    }

    /// Questions stored for a document.
    pub async fn questions_for(&self, document_id: &str) -> Vec<QuestionRecord> {
        self.state
            .lock()
            .await
            .questions
            .iter()
            .filter(|question| question.document_id == document_id)
            .cloned()
            .collect()
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn download_file(
        &self,
        bucket: &str,
        path: &str,
        staging_dir: &Path,
    ) -> Result<StagedFile, StoreError> {
        let bytes = {
            let mut state = self.state.lock().await;
            state.calls.push(StoreCall::Download {
                bucket: bucket.to_string(),
                path: path.to_string(),
            });
            if state.failing.contains(&StoreOperation::Download) {
                return Err(StoreError::Rejected(format!("download of {bucket}/{path}")));
            }
            state
                .blobs
                .get(&blob_key(bucket, path))
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("object {bucket}/{path}")))?
        };
        StagedFile::create(staging_dir, path, &bytes).await
    }

    async fn update_document(
        &self,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Update {
            document_id: document_id.to_string(),
            update: update.clone(),
        });
        if state.failing.contains(&StoreOperation::Update) {
            return Err(StoreError::Rejected(format!("update of {document_id}")));
        }
        let document = state
            .documents
            .get_mut(document_id)
            .ok_or_else(|| StoreError::NotFound(format!("document {document_id}")))?;
        document.apply(&update);
        Ok(())
    }

    async fn insert_questions(&self, questions: Vec<QuestionRecord>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::InsertQuestions {
            count: questions.len(),
        });
        if state.failing.contains(&StoreOperation::InsertQuestions) {
            return Err(StoreError::Rejected("question insert".into()));
        }
        state.questions.extend(questions);
        Ok(())
    }
}

fn blob_key(bucket: &str, path: &str) -> String {
    format!("{bucket}/{}", path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::ProcessingStatus;

    #[tokio::test]
    async fn updates_merge_into_seeded_rows() {
        let store = MemoryDocumentStore::new();
        store
            .put_document(Document::new("doc-1", "org/a.pdf", "Ministry"))
            .await;

        store
            .update_document(
                "doc-1",
                DocumentUpdate::status(ProcessingStatus::Processing),
            )
            .await
            .expect("update");

        let document = store.document("doc-1").await.expect("document");
        assert_eq!(document.processing_status, ProcessingStatus::Processing);
        assert_eq!(store.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_rows_and_blobs_are_not_found() {
        let store = MemoryDocumentStore::new();
        let dir = tempfile::tempdir().expect("tempdir");

        let update = store
            .update_document("ghost", DocumentUpdate::default())
            .await;
        assert!(matches!(update, Err(StoreError::NotFound(_))));

        let download = store
            .download_file("documents", "ghost.pdf", dir.path())
            .await;
        assert!(matches!(download, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn injected_failures_are_recorded() {
        let store = MemoryDocumentStore::new();
        store.fail_on(StoreOperation::InsertQuestions).await;

        let result = store.insert_questions(Vec::new()).await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));
        assert_eq!(
            store.calls().await,
            vec![StoreCall::InsertQuestions { count: 0 }]
        );
    }
}
