//! Service facade shared by the HTTP surface.

use crate::{
    config::Config,
    metrics::MetricsSnapshot,
    pipeline::{
        runner::EnrichmentPipeline,
        types::{EnrichmentRequest, EnrichmentResult, PipelineError},
    },
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Abstraction over the enrichment pipeline used by external surfaces.
#[async_trait]
pub trait EnrichmentApi: Send + Sync {
    /// Run the pipeline for one document and return the caller-facing envelope.
    async fn process_document(&self, request: EnrichmentRequest) -> EnrichmentResult;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Owns the pipeline and the shutdown token every run is derived from.
///
/// Construct once near process start and share through an `Arc`.
pub struct EnrichmentService {
    pipeline: EnrichmentPipeline,
    shutdown: CancellationToken,
}

impl EnrichmentService {
    /// Wrap an assembled pipeline.
    pub fn new(pipeline: EnrichmentPipeline) -> Self {
        Self {
            pipeline,
            shutdown: CancellationToken::new(),
        }
    }

    /// Build the production pipeline from configuration.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        Ok(Self::new(EnrichmentPipeline::from_config(config)?))
    }

    /// Token that cancels every in-flight run when triggered.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

#[async_trait]
impl EnrichmentApi for EnrichmentService {
    async fn process_document(&self, request: EnrichmentRequest) -> EnrichmentResult {
        let run_token = self.shutdown.child_token();
        self.pipeline.run(request, &run_token).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.pipeline.metrics().snapshot()
    }
}
