//! HTTP surface for docdigest.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /documents` – Accept a multipart upload, run the summarization
//!   pipeline, persist the result, and return the stored record.
//! - `GET /documents` – List the most recently processed documents.
//! - `GET /documents/{id}` – Return one stored document with its chunks.
//! - `DELETE /documents/{id}` – Remove a stored document.
//! - `GET /metrics` – Observe pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery
//!   by tools/hosts.
//!
//! Upload size and content type are validated here, before the pipeline
//! runs; pipeline failures pass their stage and message through verbatim so
//! operators can tell a bad file from a misbehaving generation service.

use crate::config::get_config;
use crate::extract::DocumentFormat;
use crate::processing::{IngestError, PipelineError, PipelineStage, ProcessingApi, RawDocument};
use crate::store::{DocumentDetail, DocumentRecord};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Headroom added to the body limit for multipart framing around the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the HTTP router exposing the ingestion API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ProcessingApi + 'static,
{
    Router::new()
        .route(
            "/documents",
            post(upload_document::<S>).get(recent_documents::<S>),
        )
        .route(
            "/documents/:id",
            get(get_document::<S>).delete(delete_document::<S>),
        )
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(
            get_config().max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
        .with_state(service)
}

/// Stored-document representation returned by the upload and listing routes.
#[derive(Serialize)]
struct DocumentResponse {
    /// Opaque identifier assigned by the store.
    id: String,
    /// Display name of the original upload.
    display_name: String,
    /// Content type declared at upload time.
    content_type: String,
    /// Number of chunks produced for the document.
    chunk_count: usize,
    /// Cohesive whole-document summary.
    full_summary: String,
    /// RFC3339 timestamp of the store write.
    uploaded_at: String,
}

impl From<DocumentRecord> for DocumentResponse {
    fn from(record: DocumentRecord) -> Self {
        Self {
            id: record.id,
            display_name: record.display_name,
            content_type: record.content_type,
            chunk_count: record.chunk_count,
            full_summary: record.full_summary,
            uploaded_at: record.uploaded_at,
        }
    }
}

/// Accept a document upload and run the summarization pipeline over it.
///
/// Expects a multipart body with a `file` part carrying the filename and
/// content type. The upload is validated against the configured size bound
/// and the supported content types before the pipeline is invoked.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<DocumentResponse>, AppError>
where
    S: ProcessingApi,
{
    let config = get_config();
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|error| {
        AppError::rejection(
            StatusCode::BAD_REQUEST,
            format!("Malformed upload request: {error}"),
        )
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let display_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|error| {
            AppError::rejection(
                StatusCode::BAD_REQUEST,
                format!("Failed to read upload: {error}"),
            )
        })?;
        upload = Some(RawDocument {
            content: bytes.to_vec(),
            content_type,
            display_name,
        });
        break;
    }

    let document = upload.ok_or_else(|| {
        AppError::rejection(StatusCode::BAD_REQUEST, "No file uploaded.".to_string())
    })?;
    if document.content.len() > config.max_upload_bytes {
        return Err(AppError::rejection(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "File size exceeds {} byte limit.",
                config.max_upload_bytes
            ),
        ));
    }
    if DocumentFormat::from_content_type(&document.content_type).is_none() {
        return Err(AppError::rejection(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!(
                "Invalid file type '{}'. Only PDF, DOCX, TXT are allowed.",
                document.content_type
            ),
        ));
    }

    let record = service.process_document(document).await?;
    tracing::info!(
        id = %record.id,
        name = %record.display_name,
        chunks = record.chunk_count,
        "Upload processed"
    );
    Ok(Json(DocumentResponse::from(record)))
}

/// Query parameters accepted by the `GET /documents` listing.
#[derive(Deserialize)]
struct RecentQuery {
    /// Optional cap on the number of returned records.
    #[serde(default)]
    limit: Option<usize>,
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentResponse>,
}

/// List the most recently processed documents.
async fn recent_documents<S>(
    State(service): State<Arc<S>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<DocumentsResponse>, AppError>
where
    S: ProcessingApi,
{
    let records = service.recent_documents(query.limit).await?;
    Ok(Json(DocumentsResponse {
        documents: records.into_iter().map(DocumentResponse::from).collect(),
    }))
}

/// Return one stored document with its chunks and summaries.
async fn get_document<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>, AppError>
where
    S: ProcessingApi,
{
    match service.fetch_document(&id).await? {
        Some(detail) => Ok(Json(detail)),
        None => Err(AppError::rejection(
            StatusCode::NOT_FOUND,
            "Document not found.".to_string(),
        )),
    }
}

/// Delete a stored document by id.
async fn delete_document<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError>
where
    S: ProcessingApi,
{
    if service.delete_document(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::rejection(
            StatusCode::NOT_FOUND,
            "Document not found or already deleted.".to_string(),
        ))
    }
}

/// Return a concise metrics snapshot with pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsResponse>
where
    S: ProcessingApi,
{
    let snapshot = service.metrics_snapshot();
    Json(MetricsResponse {
        documents_processed: snapshot.documents_processed,
        chunks_summarized: snapshot.chunks_summarized,
    })
}

/// Response body for `GET /metrics`.
#[derive(Serialize)]
struct MetricsResponse {
    documents_processed: u64,
    chunks_summarized: u64,
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/documents",
                description: "Upload a PDF, DOCX, or plain-text file as a multipart 'file' part; the document is chunked, each chunk summarized, and the summaries reduced into one document summary.",
                request_example: Some(json!({
                    "file": "multipart file part (filename + content type + bytes)"
                })),
            },
            CommandDescriptor {
                name: "recent",
                method: "GET",
                path: "/documents",
                description: "Return the most recently processed documents, newest first. Accepts an optional 'limit' query parameter.",
                request_example: None,
            },
            CommandDescriptor {
                name: "document",
                method: "GET",
                path: "/documents/{id}",
                description: "Return one stored document including its chunk texts and per-chunk summaries.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete",
                method: "DELETE",
                path: "/documents/{id}",
                description: "Delete a stored document and its summaries.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// API-level error carrying the HTTP status, the verbatim failure message,
/// and the pipeline stage when one failed.
struct AppError {
    status: StatusCode,
    message: String,
    stage: Option<PipelineStage>,
}

impl AppError {
    fn rejection(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            stage: None,
        }
    }
}

impl From<IngestError> for AppError {
    fn from(error: IngestError) -> Self {
        use crate::extract::ExtractError;

        let stage = match &error {
            IngestError::Pipeline(pipeline) => Some(pipeline.stage()),
            IngestError::Store(_) => None,
        };
        let status = match &error {
            IngestError::Pipeline(PipelineError::Extraction(
                ExtractError::UnsupportedFormat(_),
            )) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            IngestError::Pipeline(PipelineError::Extraction(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::Pipeline(PipelineError::Chunking(_)) | IngestError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            IngestError::Pipeline(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: error.to_string(),
            stage,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.message });
        if let Some(stage) = self.stage {
            body["stage"] = json!(stage.as_str());
        }
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::config::{CONFIG, Config};
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{IngestError, ProcessingApi, RawDocument, SummarizedChunk};
    use crate::store::{DocumentDetail, DocumentRecord};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use std::sync::{Arc, Once};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_upload_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let upload = commands
            .iter()
            .find(|cmd| cmd.name == "upload")
            .expect("upload command present");

        assert_eq!(upload.method, "POST");
        assert_eq!(upload.path, "/documents");
        assert!(upload.description.to_lowercase().contains("summar"));

        // ensure catalog exposes multiple commands for host discovery
        assert!(commands.len() >= 4);
    }

    #[tokio::test]
    async fn upload_route_runs_pipeline_and_returns_record() {
        ensure_test_config();
        let service = Arc::new(StubProcessingService::new(sample_record()));
        let app = create_router(service.clone());

        let response = app
            .oneshot(multipart_request("note.txt", "text/plain", b"hello world"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["id"], "doc-1");
        assert_eq!(json["chunk_count"], 2);
        assert_eq!(json["full_summary"], "joined summary");

        let uploads = service.recorded_uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].display_name, "note.txt");
        assert_eq!(uploads[0].content_type, "text/plain");
        assert_eq!(uploads[0].content, b"hello world");
    }

    #[tokio::test]
    async fn upload_route_rejects_unsupported_content_type() {
        ensure_test_config();
        let service = Arc::new(StubProcessingService::new(sample_record()));
        let app = create_router(service.clone());

        let response = app
            .oneshot(multipart_request("image.png", "image/png", b"\x89PNG"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(service.recorded_uploads().await.is_empty());
    }

    #[tokio::test]
    async fn upload_route_rejects_oversized_payload() {
        ensure_test_config();
        let service = Arc::new(StubProcessingService::new(sample_record()));
        let app = create_router(service.clone());

        let payload = vec![b'a'; 2048];
        let response = app
            .oneshot(multipart_request("big.txt", "text/plain", &payload))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(service.recorded_uploads().await.is_empty());
    }

    #[tokio::test]
    async fn recent_route_passes_limit_through() {
        ensure_test_config();
        let service = Arc::new(StubProcessingService::new(sample_record()));
        let app = create_router(service.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/documents?limit=5")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(service.recorded_limits().await, vec![Some(5)]);
    }

    #[tokio::test]
    async fn document_detail_route_returns_chunks() {
        ensure_test_config();
        let service = Arc::new(StubProcessingService::new(sample_record()));
        let app = create_router(service);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/documents/doc-1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["id"], "doc-1");
        assert_eq!(json["chunks"][0]["summary"], "first summary");
    }

    #[tokio::test]
    async fn delete_route_reports_missing_documents() {
        ensure_test_config();
        let service = Arc::new(StubProcessingService::new(sample_record()));
        let app = create_router(service);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/documents/unknown-id")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn sample_record() -> DocumentRecord {
        DocumentRecord {
            id: "doc-1".into(),
            display_name: "note.txt".into(),
            content_type: "text/plain".into(),
            chunk_count: 2,
            full_summary: "joined summary".into(),
            uploaded_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    fn multipart_request(filename: &str, content_type: &str, payload: &[u8]) -> Request<Body> {
        let boundary = "test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/documents")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    struct StubProcessingService {
        uploads: Mutex<Vec<RawDocument>>,
        limits: Mutex<Vec<Option<usize>>>,
        record: DocumentRecord,
    }

    impl StubProcessingService {
        fn new(record: DocumentRecord) -> Self {
            Self {
                uploads: Mutex::new(Vec::new()),
                limits: Mutex::new(Vec::new()),
                record,
            }
        }

        async fn recorded_uploads(&self) -> Vec<RawDocument> {
            self.uploads.lock().await.clone()
        }

        async fn recorded_limits(&self) -> Vec<Option<usize>> {
            self.limits.lock().await.clone()
        }
    }

    #[async_trait]
    impl ProcessingApi for StubProcessingService {
        async fn process_document(
            &self,
            document: RawDocument,
        ) -> Result<DocumentRecord, IngestError> {
            self.uploads.lock().await.push(document);
            Ok(self.record.clone())
        }

        async fn recent_documents(
            &self,
            limit: Option<usize>,
        ) -> Result<Vec<DocumentRecord>, IngestError> {
            self.limits.lock().await.push(limit);
            Ok(vec![self.record.clone()])
        }

        async fn fetch_document(&self, id: &str) -> Result<Option<DocumentDetail>, IngestError> {
            if id == self.record.id {
                Ok(Some(DocumentDetail {
                    record: self.record.clone(),
                    chunks: vec![SummarizedChunk {
                        ordinal: 0,
                        text: "first chunk".into(),
                        summary: "first summary".into(),
                    }],
                }))
            } else {
                Ok(None)
            }
        }

        async fn delete_document(&self, id: &str) -> Result<bool, IngestError> {
            Ok(id == self.record.id)
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_processed: 0,
                chunks_summarized: 0,
            }
        }
    }

    fn ensure_test_config() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = CONFIG.set(Config {
                summary_model: "test-model".into(),
                ollama_url: None,
                chunk_size: 1500,
                chunk_overlap: 200,
                summary_max_tokens: 150,
                summary_concurrency: 2,
                summary_timeout_secs: 5,
                max_upload_bytes: 1024,
                recent_default_limit: 20,
                recent_max_limit: 100,
                server_port: None,
            });
        });
    }
}
