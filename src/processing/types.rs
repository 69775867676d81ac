//! Core data types and error definitions for the summarization pipeline.

use crate::extract::ExtractError;
use crate::generation::GenerationClientError;
use crate::store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// An uploaded document awaiting processing.
///
/// Transient: exists only for the duration of one pipeline invocation.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Raw bytes of the upload.
    pub content: Vec<u8>,
    /// Content type declared by the caller.
    pub content_type: String,
    /// Display name used for error messages and storage.
    pub display_name: String,
}

/// One window of extracted text, before summarization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Zero-based position within the chunk sequence.
    pub ordinal: usize,
    /// Window contents.
    pub text: String,
}

/// A chunk paired with its generated summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummarizedChunk {
    /// Zero-based position within the chunk sequence.
    pub ordinal: usize,
    /// Window contents.
    pub text: String,
    /// Summary produced by the generation service.
    pub summary: String,
}

/// Terminal artifact of one pipeline invocation, immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// Summarized chunks in ordinal order.
    pub chunks: Vec<SummarizedChunk>,
    /// Cohesive whole-document summary.
    pub full_summary: String,
}

/// Errors produced while splitting raw text into windows.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Overlap must stay strictly below the chunk size for the window
    /// offsets to advance.
    #[error("chunk overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidChunkConfig {
        /// Configured window length.
        chunk_size: usize,
        /// Configured overlap length.
        overlap: usize,
    },
}

/// Pipeline stage that produced a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Raw-text extraction from the uploaded bytes.
    Extraction,
    /// Window splitting of the extracted text.
    Chunking,
    /// Per-chunk summarization calls.
    Summarization,
    /// Collapse of chunk summaries into the document summary.
    Reduction,
}

impl PipelineStage {
    /// Stable lowercase name used in API responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Chunking => "chunking",
            Self::Summarization => "summarization",
            Self::Reduction => "reduction",
        }
    }
}

/// First failure encountered by a pipeline invocation.
///
/// Each variant carries the failing stage's own error untranslated; at most
/// one is returned per invocation and no partial result accompanies it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Document bytes could not be turned into raw text.
    #[error("Failed to extract document text: {0}")]
    Extraction(#[from] ExtractError),
    /// Extracted text could not be split into windows.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// A per-chunk summarization call failed.
    #[error("Failed to summarize chunk {ordinal}: {source}")]
    Summarization {
        /// Ordinal of the chunk whose call failed.
        ordinal: usize,
        /// Error returned by the generation service.
        #[source]
        source: GenerationClientError,
    },
    /// The reduction stage's extra summarization call failed.
    #[error("Failed to reduce chunk summaries: {0}")]
    Reduction(#[source] GenerationClientError),
}

impl PipelineError {
    /// Stage at which the pipeline stopped.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Extraction(_) => PipelineStage::Extraction,
            Self::Chunking(_) => PipelineStage::Chunking,
            Self::Summarization { .. } => PipelineStage::Summarization,
            Self::Reduction(_) => PipelineStage::Reduction,
        }
    }
}

/// Errors emitted by the ingestion surface: pipeline failures plus storage
/// failures from the document store collaborator.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The summarization pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The document store rejected a read or write.
    #[error("Document store request failed: {0}")]
    Store(#[from] StoreError),
}
