//! Storage of processed document summaries.
//!
//! The pipeline performs one write per successfully processed document; the
//! surrounding CRUD layer reads recent records and deletes by id. The trait
//! is the seam a persistent backend would implement; the bundled
//! implementation keeps everything in process memory.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::RwLock;

use crate::processing::SummarizedChunk;

/// Errors raised by document store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend rejected the operation.
    #[error("{0}")]
    Backend(String),
}

/// Summary artifact handed to the store after a successful pipeline run.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    /// Display name of the original upload.
    pub display_name: String,
    /// Content type declared at upload time.
    pub content_type: String,
    /// Summarized chunks in ordinal order.
    pub chunks: Vec<SummarizedChunk>,
    /// Cohesive whole-document summary.
    pub full_summary: String,
}

/// Stored-document metadata returned by reads and writes.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    /// Opaque generated identifier.
    pub id: String,
    /// Display name of the original upload.
    pub display_name: String,
    /// Content type declared at upload time.
    pub content_type: String,
    /// Number of chunks produced for the document.
    pub chunk_count: usize,
    /// Cohesive whole-document summary.
    pub full_summary: String,
    /// RFC3339 timestamp of the write.
    pub uploaded_at: String,
}

/// Full stored document returned by [`DocumentStore::fetch`].
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail {
    /// Stored-document metadata.
    #[serde(flatten)]
    pub record: DocumentRecord,
    /// Summarized chunks in ordinal order.
    pub chunks: Vec<SummarizedChunk>,
}

/// Interface implemented by document store backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist one processed document and return its record.
    async fn insert(&self, document: StoredDocument) -> Result<DocumentRecord, StoreError>;

    /// Return up to `limit` records, most recent first.
    async fn recent(&self, limit: usize) -> Result<Vec<DocumentRecord>, StoreError>;

    /// Return one document with its chunks, or `None` when absent.
    async fn fetch(&self, id: &str) -> Result<Option<DocumentDetail>, StoreError>;

    /// Delete a document by id; returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

struct StoredEntry {
    record: DocumentRecord,
    chunks: Vec<SummarizedChunk>,
}

/// In-memory document store used by the server and tests.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<Vec<StoredEntry>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, document: StoredDocument) -> Result<DocumentRecord, StoreError> {
        let uploaded_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|error| StoreError::Backend(format!("timestamp formatting: {error}")))?;
        let record = DocumentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: document.display_name,
            content_type: document.content_type,
            chunk_count: document.chunks.len(),
            full_summary: document.full_summary,
            uploaded_at,
        };

        let mut documents = self.documents.write().await;
        documents.push(StoredEntry {
            record: record.clone(),
            chunks: document.chunks,
        });
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<DocumentRecord>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .rev()
            .take(limit)
            .map(|entry| entry.record.clone())
            .collect())
    }

    async fn fetch(&self, id: &str) -> Result<Option<DocumentDetail>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .find(|entry| entry.record.id == id)
            .map(|entry| DocumentDetail {
                record: entry.record.clone(),
                chunks: entry.chunks.clone(),
            }))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|entry| entry.record.id != id);
        Ok(documents.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(name: &str) -> StoredDocument {
        StoredDocument {
            display_name: name.to_string(),
            content_type: "text/plain".to_string(),
            chunks: vec![SummarizedChunk {
                ordinal: 0,
                text: "chunk".to_string(),
                summary: "summary".to_string(),
            }],
            full_summary: "summary".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_distinct_ids() {
        let store = MemoryDocumentStore::new();
        let first = store.insert(stored("a.txt")).await.expect("insert");
        let second = store.insert(stored("b.txt")).await.expect("insert");

        assert_ne!(first.id, second.id);
        assert_eq!(first.chunk_count, 1);
        assert!(!first.uploaded_at.is_empty());
    }

    #[tokio::test]
    async fn recent_returns_most_recent_first_up_to_limit() {
        let store = MemoryDocumentStore::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            store.insert(stored(name)).await.expect("insert");
        }

        let records = store.recent(2).await.expect("recent");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].display_name, "c.txt");
        assert_eq!(records[1].display_name, "b.txt");
    }

    #[tokio::test]
    async fn fetch_returns_chunks_for_known_ids_only() {
        let store = MemoryDocumentStore::new();
        let record = store.insert(stored("a.txt")).await.expect("insert");

        let detail = store
            .fetch(&record.id)
            .await
            .expect("fetch")
            .expect("present");
        assert_eq!(detail.record.id, record.id);
        assert_eq!(detail.chunks.len(), 1);
        assert_eq!(detail.chunks[0].summary, "summary");

        assert!(store.fetch("missing").await.expect("fetch").is_none());
    }

    #[tokio::test]
    async fn delete_removes_and_reports_absence() {
        let store = MemoryDocumentStore::new();
        let record = store.insert(stored("a.txt")).await.expect("insert");

        assert!(store.delete(&record.id).await.expect("delete"));
        assert!(!store.delete(&record.id).await.expect("second delete"));
        assert!(store.recent(10).await.expect("recent").is_empty());
    }
}
