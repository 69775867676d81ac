#![deny(missing_docs)]

//! Core library for the docdigest summarization server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Format-specific raw-text extraction.
pub mod extract;
/// Generative text client used for summarization.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document summarization pipeline.
pub mod processing;
/// Document summary storage.
pub mod store;
