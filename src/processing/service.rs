//! Processing service coordinating extraction, chunking, summarization,
//! reduction, and storage.

use crate::{
    config::get_config,
    extract,
    generation::{GenerationClient, SummaryRequest, get_generation_client},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::chunk_text,
        reduce::reduce_summaries,
        types::{DocumentSummary, IngestError, PipelineError, RawDocument, SummarizedChunk},
    },
    store::{DocumentDetail, DocumentRecord, DocumentStore, MemoryDocumentStore, StoredDocument},
};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;

/// Coordinates the full pipeline: extraction, chunking, per-chunk
/// summarization, reduction, and the store write.
///
/// The service owns long-lived handles to the generation client, the
/// document store, and the metrics registry. Construct it once near process
/// start and share it through an `Arc`; invocations hold no cross-invocation
/// state and may run concurrently.
pub struct ProcessingService {
    generation_client: Box<dyn GenerationClient + Send + Sync>,
    store: Arc<dyn DocumentStore + Send + Sync>,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the ingestion surface consumed by HTTP handlers.
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Run the pipeline over an uploaded document and persist the result.
    async fn process_document(&self, document: RawDocument)
        -> Result<DocumentRecord, IngestError>;

    /// Return the most recent stored records, clamped to configured limits.
    async fn recent_documents(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<DocumentRecord>, IngestError>;

    /// Return one stored document with its chunks, or `None` when absent.
    async fn fetch_document(&self, id: &str) -> Result<Option<DocumentDetail>, IngestError>;

    /// Delete a stored document; returns whether a record was removed.
    async fn delete_document(&self, id: &str) -> Result<bool, IngestError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ProcessingService {
    /// Build a new processing service from the loaded configuration.
    pub fn new() -> Self {
        tracing::info!("Initializing generation client");
        Self::with_components(get_generation_client(), Arc::new(MemoryDocumentStore::new()))
    }

    /// Build a processing service from explicit collaborators.
    ///
    /// Used by tests and callers that construct the generation client or
    /// store themselves.
    pub fn with_components(
        generation_client: Box<dyn GenerationClient + Send + Sync>,
        store: Arc<dyn DocumentStore + Send + Sync>,
    ) -> Self {
        Self {
            generation_client,
            store,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Run one pipeline invocation: extract, chunk, summarize, reduce.
    ///
    /// Per-chunk summarization calls fan out with bounded concurrency;
    /// results keep their ordinal association and the first failure (in
    /// ordinal order) aborts the invocation, dropping in-flight calls. The
    /// reduction step starts only after every chunk summary is collected.
    /// Returns the complete summary or the first stage error, never both.
    pub async fn summarize_document(
        &self,
        bytes: &[u8],
        display_name: &str,
        content_type: &str,
    ) -> Result<DocumentSummary, PipelineError> {
        let config = get_config();
        tracing::info!(name = display_name, content_type, "Processing document");

        let raw_text = extract::extract_text(bytes, content_type, display_name)?;
        let chunks = chunk_text(&raw_text, config.chunk_size, config.chunk_overlap)?;
        tracing::debug!(
            name = display_name,
            chunks = chunks.len(),
            chunk_size = config.chunk_size,
            overlap = config.chunk_overlap,
            "Chunked document"
        );

        let client = self.generation_client.as_ref();
        let summarized: Vec<SummarizedChunk> = stream::iter(chunks.into_iter().map(move |chunk| {
            async move {
                let summary = client
                    .generate_summary(SummaryRequest {
                        model: config.summary_model.clone(),
                        text: chunk.text.clone(),
                        max_tokens: config.summary_max_tokens,
                    })
                    .await
                    .map_err(|source| PipelineError::Summarization {
                        ordinal: chunk.ordinal,
                        source,
                    })?;
                Ok::<_, PipelineError>(SummarizedChunk {
                    ordinal: chunk.ordinal,
                    text: chunk.text,
                    summary,
                })
            }
        }))
        .buffered(config.summary_concurrency)
        .try_collect()
        .await?;

        let summaries: Vec<String> = summarized
            .iter()
            .map(|chunk| chunk.summary.clone())
            .collect();
        let full_summary = reduce_summaries(
            client,
            &config.summary_model,
            config.summary_max_tokens,
            config.reduction_threshold(),
            &summaries,
        )
        .await
        .map_err(PipelineError::Reduction)?;

        Ok(DocumentSummary {
            chunks: summarized,
            full_summary,
        })
    }

    /// Run the pipeline and persist the resulting summary.
    pub async fn process_document(
        &self,
        document: RawDocument,
    ) -> Result<DocumentRecord, IngestError> {
        let RawDocument {
            content,
            content_type,
            display_name,
        } = document;
        let summary = self
            .summarize_document(&content, &display_name, &content_type)
            .await?;
        let chunk_count = summary.chunks.len();

        let record = self
            .store
            .insert(StoredDocument {
                display_name,
                content_type,
                chunks: summary.chunks,
                full_summary: summary.full_summary,
            })
            .await?;

        self.metrics.record_document(chunk_count as u64);
        tracing::info!(
            id = %record.id,
            name = %record.display_name,
            chunks = chunk_count,
            "Document summarized and stored"
        );
        Ok(record)
    }

    /// Return the most recent stored records, clamped to configured limits.
    pub async fn recent_documents(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<DocumentRecord>, IngestError> {
        let config = get_config();
        let limit = limit
            .unwrap_or(config.recent_default_limit)
            .clamp(1, config.recent_max_limit);
        Ok(self.store.recent(limit).await?)
    }

    /// Return one stored document with its chunks.
    pub async fn fetch_document(&self, id: &str) -> Result<Option<DocumentDetail>, IngestError> {
        Ok(self.store.fetch(id).await?)
    }

    /// Delete a stored document by id.
    pub async fn delete_document(&self, id: &str) -> Result<bool, IngestError> {
        let removed = self.store.delete(id).await?;
        if removed {
            tracing::info!(id, "Document deleted");
        }
        Ok(removed)
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Default for ProcessingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn process_document(
        &self,
        document: RawDocument,
    ) -> Result<DocumentRecord, IngestError> {
        ProcessingService::process_document(self, document).await
    }

    async fn recent_documents(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<DocumentRecord>, IngestError> {
        ProcessingService::recent_documents(self, limit).await
    }

    async fn fetch_document(&self, id: &str) -> Result<Option<DocumentDetail>, IngestError> {
        ProcessingService::fetch_document(self, id).await
    }

    async fn delete_document(&self, id: &str) -> Result<bool, IngestError> {
        ProcessingService::delete_document(self, id).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ProcessingService::metrics_snapshot(self)
    }
}
