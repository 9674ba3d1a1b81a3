#![deny(missing_docs)]

//! Core library for the document enrichment service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from staged source files.
pub mod extraction;
/// Generation backends, prompt templates and response parsing.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Enrichment metrics helpers.
pub mod metrics;
/// Document enrichment pipeline.
pub mod pipeline;
/// Document store capability and implementations.
pub mod store;
