//! Enrichment run driver: download, extract, summarize, generate, persist.

use crate::{
    config::Config,
    extraction::{PdfTextExtractor, TextExtractor},
    generation::{
        BackendSettings, QuestionGenerator, QuestionOutcome, SummaryGenerator,
        build_generation_client,
    },
    metrics::EnrichmentMetrics,
    pipeline::{
        shaping::shape_questions,
        types::{
            EnrichmentRequest, EnrichmentResult, PipelineError, PipelineSettings, RunReport,
            RunStage,
        },
    },
    store::{DocumentStore, DocumentUpdate, ProcessingStatus, RestDocumentStore},
};
use std::future::Future;
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Composes the store, extractor and generators into one sequential run per document.
///
/// Every run ends with the document row in a terminal status: `completed` after a full pass,
/// `failed` after any error. Capabilities are injected so tests can swap in in-memory fakes.
pub struct EnrichmentPipeline {
    store: Arc<dyn DocumentStore>,
    extractor: Arc<dyn TextExtractor>,
    summaries: SummaryGenerator,
    questions: QuestionGenerator,
    settings: PipelineSettings,
    metrics: Arc<EnrichmentMetrics>,
}

impl EnrichmentPipeline {
    /// Assemble a pipeline from explicit capabilities.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        extractor: Arc<dyn TextExtractor>,
        summaries: SummaryGenerator,
        questions: QuestionGenerator,
        settings: PipelineSettings,
        metrics: Arc<EnrichmentMetrics>,
    ) -> Self {
        Self {
            store,
            extractor,
            summaries,
            questions,
            settings,
            metrics,
        }
    }

    /// Wire the REST store, PDF extractor and configured generation backend.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let client = build_generation_client(&BackendSettings::from_config(config))?;
        let store = RestDocumentStore::new(config)?;
        tracing::info!(
            provider = ?config.generation_provider,
            model = %config.generation_model,
            bucket = %config.store_bucket,
            "Enrichment pipeline initialized"
        );
        Ok(Self::new(
            Arc::new(store),
            Arc::new(PdfTextExtractor::new()),
            SummaryGenerator::new(
                client.clone(),
                config.generation_model.clone(),
                config.summary_char_limit,
                config.summary_fallback_chars,
            ),
            QuestionGenerator::new(
                client,
                config.generation_model.clone(),
                config.question_char_limit,
                config.question_count,
            ),
            PipelineSettings::from_config(config),
            Arc::new(EnrichmentMetrics::new()),
        ))
    }

    /// Shared metrics registry.
    pub fn metrics(&self) -> &Arc<EnrichmentMetrics> {
        &self.metrics
    }

    /// Enrich one document. Never returns an error: failures are reported in the envelope after
    /// the row has been marked `failed`.
    pub async fn run(
        &self,
        request: EnrichmentRequest,
        cancel: &CancellationToken,
    ) -> EnrichmentResult {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "enrichment_run",
            %run_id,
            document_id = %request.document_id
        );

        async {
            self.metrics.record_started();
            let mut stage = RunStage::MarkingProcessing;
            match self.drive(&request, cancel, &mut stage).await {
                Ok(report) => {
                    self.metrics
                        .record_completed(report.questions_inserted as u64);
                    tracing::info!(
                        pages = report.page_count,
                        questions = report.questions_inserted,
                        dropped = report.questions_dropped,
                        degraded_summary = report.degraded_summary,
                        "Document enriched"
                    );
                    EnrichmentResult::success(&request.document_id)
                }
                Err(error) => {
                    tracing::error!(%stage, error = %error, "Enrichment run failed");
                    self.mark_failed(&request.document_id).await;
                    self.metrics.record_failed();
                    EnrichmentResult::error(&request.document_id, error.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        request: &EnrichmentRequest,
        cancel: &CancellationToken,
        stage: &mut RunStage,
    ) -> Result<RunReport, PipelineError> {
        let document_id = request.document_id.as_str();

        *stage = RunStage::MarkingProcessing;
        self.guarded(
            *stage,
            cancel,
            self.store.update_document(
                document_id,
                DocumentUpdate::status(ProcessingStatus::Processing),
            ),
        )
        .await?;

        *stage = RunStage::Downloading;
        tracing::debug!(%stage, path = %request.file_path, "Stage started");
        let staged = self
            .guarded(
                *stage,
                cancel,
                self.store.download_file(
                    &self.settings.bucket,
                    &request.file_path,
                    &self.settings.staging_dir,
                ),
            )
            .await?;

        *stage = RunStage::Extracting;
        tracing::debug!(%stage, staged = %staged.path().display(), "Stage started");
        let extracted = self
            .guarded(*stage, cancel, async {
                self.extractor
                    .extract(staged.path())
                    .await
                    .map_err(|source| PipelineError::Extraction {
                        path: request.file_path.clone(),
                        source,
                    })
            })
            .await?;

        *stage = RunStage::Summarizing;
        tracing::debug!(%stage, chars = extracted.text.chars().count(), "Stage started");
        let summary = self
            .guarded(*stage, cancel, self.summaries.summarize(&extracted.text))
            .await?;
        let degraded_summary = summary.is_degraded();
        if degraded_summary {
            self.metrics.record_degraded_summary();
            tracing::warn!("Summary degraded to raw backend text");
        }

        *stage = RunStage::GeneratingQuestions;
        tracing::debug!(%stage, "Stage started");
        let outcome = self
            .guarded(
                *stage,
                cancel,
                self.questions
                    .generate_questions(&extracted.text, &request.organization_name),
            )
            .await?;
        if outcome == QuestionOutcome::Empty {
            self.metrics.record_empty_question_set();
            tracing::warn!("Question response unparseable; continuing without questions");
        }
        let shaped = shape_questions(document_id, outcome.into_items());
        let questions_dropped = shaped.dropped.len();
        if questions_dropped > 0 {
            self.metrics
                .record_dropped_questions(questions_dropped as u64);
        }

        *stage = RunStage::Persisting;
        let questions_inserted = shaped.accepted.len();
        tracing::debug!(%stage, questions = questions_inserted, "Stage started");
        if !shaped.accepted.is_empty() {
            self.guarded(*stage, cancel, self.store.insert_questions(shaped.accepted))
                .await?;
        }

        let summary = summary.into_summary();
        let page_count = extracted.page_count;
        let update = DocumentUpdate::completed(
            extracted.text,
            page_count,
            summary.summary,
            summary.key_points,
            current_timestamp_rfc3339(),
        );
        self.guarded(
            *stage,
            cancel,
            self.store.update_document(document_id, update),
        )
        .await?;

        if let Err(error) = staged.close() {
            tracing::warn!(error = %error, "Failed to remove staged file");
        }

        Ok(RunReport {
            page_count,
            questions_inserted,
            questions_dropped,
            degraded_summary,
        })
    }

    /// Await `call` under the per-call deadline, aborting early on cancellation.
    async fn guarded<T, E, F>(
        &self,
        stage: RunStage,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, E>>,
        PipelineError: From<E>,
    {
        let after = self.settings.call_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled { stage }),
            outcome = tokio::time::timeout(after, call) => match outcome {
                Ok(result) => result.map_err(PipelineError::from),
                Err(_) => Err(PipelineError::Timeout { stage, after }),
            },
        }
    }

    /// The single recovery write. Bounded by the deadline but not by cancellation.
    async fn mark_failed(&self, document_id: &str) {
        let update = DocumentUpdate::status(ProcessingStatus::Failed);
        let write = self.store.update_document(document_id, update);
        match tokio::time::timeout(self.settings.call_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::error!(error = %error, "Failed to record failed status");
            }
            Err(_) => {
                tracing::error!("Timed out recording failed status");
            }
        }
    }
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
