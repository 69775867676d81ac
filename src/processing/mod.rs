//! Document summarization pipeline: extraction, chunking, per-chunk
//! generation, and reduction.

pub mod chunking;
mod reduce;
mod service;
pub mod types;

pub use service::{ProcessingApi, ProcessingService};
pub use types::{
    ChunkingError, DocumentSummary, IngestError, PipelineError, PipelineStage, RawDocument,
    SummarizedChunk, TextChunk,
};
