//! Client abstraction for the generative text service used to summarize text.
//!
//! Every summary in the pipeline comes from one request/response call: a
//! fixed system instruction, the text to condense, and a bounded output
//! budget. The Ollama-backed client issues HTTP requests directly to the
//! runtime; the trait seam lets the orchestrator and tests substitute stubs.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::config::get_config;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// System instruction framing every generation request as summarization.
pub const SUMMARIZER_SYSTEM_INSTRUCTION: &str =
    "You are an expert summarizer. Provide a concise summary of the following text.";

/// Errors surfaced while requesting a summary from the generation service.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Service was unreachable or the request timed out.
    #[error("Generation service unavailable: {0}")]
    ProviderUnavailable(String),
    /// Service returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Service response could not be parsed or carried no usable text.
    #[error("Malformed service response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the generation service.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    /// Fully qualified model identifier understood by the service.
    pub model: String,
    /// Text to summarize; chunk text or a joined-summaries string.
    pub text: String,
    /// Maximum number of tokens the service may generate.
    pub max_tokens: u32,
}

/// Interface implemented by summarization backends.
///
/// Implementations must return an empty string for whitespace-only input
/// without contacting the service, and must not retry failed calls.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a concise summary of the request text.
    async fn generate_summary(
        &self,
        request: SummaryRequest,
    ) -> Result<String, GenerationClientError>;
}

/// Build the generation client from the loaded configuration.
pub fn get_generation_client() -> Box<dyn GenerationClient + Send + Sync> {
    let config = get_config();
    let base_url = config
        .ollama_url
        .clone()
        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
    Box::new(OllamaGenerationClient::new(
        base_url,
        Duration::from_secs(config.summary_timeout_secs),
    ))
}

/// Generation client backed by a local Ollama runtime.
pub struct OllamaGenerationClient {
    http: Client,
    base_url: String,
}

impl OllamaGenerationClient {
    /// Construct a client against the given base URL with a per-request timeout.
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("docdigest/summary")
            .timeout(timeout)
            .build()
            .expect("Failed to construct reqwest::Client for summarization");
        Self { http, base_url }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GenerationClient for OllamaGenerationClient {
    async fn generate_summary(
        &self,
        request: SummaryRequest,
    ) -> Result<String, GenerationClientError> {
        if request.text.trim().is_empty() {
            return Ok(String::new());
        }

        let payload = json!({
            "model": request.model,
            "system": SUMMARIZER_SYSTEM_INSTRUCTION,
            "prompt": request.text,
            "stream": false,
            "options": {
                // Lower temperature for deterministic summaries.
                "temperature": 0.1,
                "num_predict": request.max_tokens,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(GenerationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        let summary = body.response.trim();
        if summary.is_empty() {
            return Err(GenerationClientError::InvalidResponse(
                "no content returned".into(),
            ));
        }

        Ok(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn test_client(base_url: String) -> OllamaGenerationClient {
        OllamaGenerationClient::new(base_url, Duration::from_secs(5))
    }

    fn request(text: &str) -> SummaryRequest {
        SummaryRequest {
            model: "llama".into(),
            text: text.into(),
            max_tokens: 150,
        }
    }

    #[tokio::test]
    async fn client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = test_client(server.base_url());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "  Summary text  ",
                    "done": true
                }));
            })
            .await;

        let summary = client
            .generate_summary(request("Long source text"))
            .await
            .expect("summary");

        mock.assert();
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn whitespace_input_short_circuits_without_calling_service() {
        let server = MockServer::start_async().await;
        let client = test_client(server.base_url());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200);
            })
            .await;

        let summary = client
            .generate_summary(request("   \n\t"))
            .await
            .expect("short circuit");

        assert_eq!(summary, "");
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn client_handles_error_status() {
        let server = MockServer::start_async().await;
        let client = test_client(server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .generate_summary(request("text"))
            .await
            .expect_err("error response");

        assert!(
            matches!(error, GenerationClientError::GenerationFailed(message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn empty_generation_is_reported_as_invalid_response() {
        let server = MockServer::start_async().await;
        let client = test_client(server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "   ",
                    "done": true
                }));
            })
            .await;

        let error = client
            .generate_summary(request("text"))
            .await
            .expect_err("empty response");

        assert!(
            matches!(error, GenerationClientError::InvalidResponse(message) if message.contains("no content"))
        );
    }
}
