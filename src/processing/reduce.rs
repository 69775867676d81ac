//! Collapse of per-chunk summaries into one cohesive document summary.

use crate::generation::{GenerationClient, GenerationClientError, SummaryRequest};

/// Separator placed between chunk summaries when they are joined.
pub(crate) const SUMMARY_SEPARATOR: &str = "\n\n";

const REDUCTION_PROMPT: &str = "Summarize the following collection of summaries cohesively:\n";

/// Join chunk summaries in ordinal order and collapse them when too long.
///
/// A joined length of at most `threshold` characters is returned as-is, with
/// no service call. Above the threshold one further summarization call is
/// issued over the joined text. The joined text is passed to the service
/// verbatim; summary content that happens to mimic instruction text is not
/// sanitized.
pub(crate) async fn reduce_summaries(
    client: &dyn GenerationClient,
    model: &str,
    max_tokens: u32,
    threshold: usize,
    summaries: &[String],
) -> Result<String, GenerationClientError> {
    if summaries.is_empty() {
        return Ok(String::new());
    }

    let joined = summaries.join(SUMMARY_SEPARATOR);
    if joined.chars().count() <= threshold {
        return Ok(joined);
    }

    tracing::debug!(
        joined_length = joined.chars().count(),
        threshold,
        "Joined summaries exceed threshold; collapsing"
    );
    client
        .generate_summary(SummaryRequest {
            model: model.to_string(),
            text: format!("{REDUCTION_PROMPT}{joined}"),
            max_tokens,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingClient {
        requests: Mutex<Vec<SummaryRequest>>,
        response: Result<String, ()>,
    }

    impl RecordingClient {
        fn returning(summary: &str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: Ok(summary.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: Err(()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().expect("lock").len()
        }
    }

    #[async_trait]
    impl GenerationClient for RecordingClient {
        async fn generate_summary(
            &self,
            request: SummaryRequest,
        ) -> Result<String, GenerationClientError> {
            self.requests.lock().expect("lock").push(request);
            self.response
                .clone()
                .map_err(|()| GenerationClientError::GenerationFailed("stub failure".into()))
        }
    }

    #[tokio::test]
    async fn empty_sequence_produces_empty_summary() {
        let client = RecordingClient::returning("unused");
        let summary = reduce_summaries(&client, "model", 150, 2250, &[])
            .await
            .expect("reduction");
        assert_eq!(summary, "");
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn compact_summaries_are_joined_without_a_call() {
        let client = RecordingClient::returning("unused");
        let summaries: Vec<String> = (0..5).map(|i| format!("{:0>50}", i)).collect();
        let joined_length = 5 * 50 + 4 * SUMMARY_SEPARATOR.len();
        assert!(joined_length < 2250);

        let summary = reduce_summaries(&client, "model", 150, 2250, &summaries)
            .await
            .expect("reduction");

        assert_eq!(summary, summaries.join(SUMMARY_SEPARATOR));
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn oversized_summaries_trigger_exactly_one_call() {
        let client = RecordingClient::returning("Cohesive document summary");
        let summaries = vec!["a".repeat(1200), "b".repeat(1200)];

        let summary = reduce_summaries(&client, "model", 150, 2250, &summaries)
            .await
            .expect("reduction");

        assert_eq!(summary, "Cohesive document summary");
        assert_eq!(client.request_count(), 1);
        let request = client.requests.lock().expect("lock")[0].clone();
        assert!(request.text.starts_with(REDUCTION_PROMPT));
        assert!(request.text.contains(&"a".repeat(1200)));
    }

    #[tokio::test]
    async fn reduction_call_failure_propagates() {
        let client = RecordingClient::failing();
        let summaries = vec!["a".repeat(3000)];

        let error = reduce_summaries(&client, "model", 150, 2250, &summaries)
            .await
            .expect_err("reduction failure");

        assert!(matches!(error, GenerationClientError::GenerationFailed(_)));
    }
}
