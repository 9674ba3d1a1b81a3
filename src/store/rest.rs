//! HTTP client for the REST document store (row tables plus object storage).

use crate::config::Config;
use crate::store::{
    DocumentStore,
    types::{DocumentUpdate, QuestionRecord, StagedFile, StoreError},
};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::path::Path;

const DOCUMENTS_TABLE: &str = "rest/v1/documents";
const QUESTIONS_TABLE: &str = "rest/v1/questions";
const OBJECT_PREFIX: &str = "storage/v1/object";

/// Lightweight HTTP client for document store operations.
pub struct RestDocumentStore {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) service_key: String,
}

impl RestDocumentStore {
    /// Construct a new client from the service configuration.
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent("doc-enrich/0.1").build()?;
        let base_url = normalize_base_url(&config.store_url).map_err(StoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_service_key = !config.store_service_key.is_empty(),
            "Initialized document store HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            service_key: config.store_service_key.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if !self.service_key.is_empty() {
            req = req
                .header("apikey", &self.service_key)
                .bearer_auth(&self.service_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Document store request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn download_file(
        &self,
        bucket: &str,
        path: &str,
        staging_dir: &Path,
    ) -> Result<StagedFile, StoreError> {
        let object_path = format!("{OBJECT_PREFIX}/{bucket}/{}", path.trim_start_matches('/'));
        let response = self.request(Method::GET, &object_path).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(bucket, path, error = %error, "Failed to download object");
            return Err(error);
        }

        let bytes = response.bytes().await?;
        let staged = StagedFile::create(staging_dir, path, &bytes).await?;
        tracing::debug!(
            bucket,
            path,
            bytes = bytes.len(),
            staged = %staged.path().display(),
            "Object staged"
        );
        Ok(staged)
    }

    async fn update_document(
        &self,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<(), StoreError> {
        let response = self
            .request(Method::PATCH, DOCUMENTS_TABLE)
            .query(&[("id", format!("eq.{document_id}"))])
            .header("Prefer", "return=minimal")
            .json(&update)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                document_id,
                status = ?update.processing_status,
                "Document updated"
            );
        })
        .await
    }

    async fn insert_questions(&self, questions: Vec<QuestionRecord>) -> Result<(), StoreError> {
        if questions.is_empty() {
            return Ok(());
        }

        let count = questions.len();
        let response = self
            .request(Method::POST, QUESTIONS_TABLE)
            .header("Prefer", "return=minimal")
            .json(&questions)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(questions = count, "Questions inserted");
        })
        .await
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
