//! Document enrichment pipeline: status state machine, question shaping and service facade.

mod runner;
mod service;
pub mod shaping;
pub mod types;

pub use runner::EnrichmentPipeline;
pub use service::{EnrichmentApi, EnrichmentService};
pub use shaping::{QuestionDefect, ShapedQuestions, shape_questions};
pub use types::{
    EnrichmentRequest, EnrichmentResult, EnrichmentStatus, PipelineError, PipelineSettings,
    RunReport, RunStage,
};
