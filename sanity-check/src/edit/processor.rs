//! Sends a single chunk to the editing service and validates the reply.

use llm_client::{LlmProvider, LlmRequest, TokenUsage};
use log::debug;
use serde::Deserialize;
use std::sync::Arc;

use super::EditResult;
use super::prompt::{RESPONSE_SCHEMA_NAME, SYSTEM_PROMPT, build_task_prompt, response_schema};
use crate::error::{ChunkFailure, FailureReason};
use crate::text::TextChunk;

/// Reply shape required from the service.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EditResponse {
    annotated: String,
    clean: String,
}

/// A successfully edited chunk plus what it cost.
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    pub edit: EditResult,
    pub usage: Option<TokenUsage>,
}

/// Edits one chunk per call. Holds no mutable state and is shared by
/// every concurrent call of a dispatch.
#[derive(Clone)]
pub struct ChunkProcessor {
    provider: Arc<dyn LlmProvider>,
    temperature: Option<f32>,
}

impl ChunkProcessor {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            temperature: None,
        }
    }

    /// Override the sampling temperature sent with each request.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Edit `chunk`, failing with the chunk's index on any error.
    ///
    /// Makes exactly one request; retrying is up to the caller.
    pub async fn process(&self, chunk: &TextChunk) -> Result<ProcessedChunk, ChunkFailure> {
        let mut request = LlmRequest::new(build_task_prompt(&chunk.text), SYSTEM_PROMPT)
            .with_json_schema(RESPONSE_SCHEMA_NAME, response_schema());
        request.temperature = self.temperature;

        debug!(
            "Sending chunk {} ({} chars) to {}",
            chunk.index,
            chunk.text.chars().count(),
            self.provider.name()
        );

        let failure = |reason: FailureReason| ChunkFailure {
            index: chunk.index,
            attempts: 1,
            reason,
        };

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| failure(e.into()))?;

        let edit = parse_edit_response(chunk, &response.content).map_err(failure)?;

        debug!("Chunk {} edited", chunk.index);

        Ok(ProcessedChunk {
            edit,
            usage: response.usage,
        })
    }
}

/// Validate the service's reply against the two-field contract.
fn parse_edit_response(chunk: &TextChunk, content: &str) -> Result<EditResult, FailureReason> {
    let json = strip_code_fence(content);
    if json.is_empty() {
        return Err(FailureReason::MalformedResponse("empty response".into()));
    }

    let parsed: EditResponse = serde_json::from_str(json)
        .map_err(|e| FailureReason::MalformedResponse(e.to_string()))?;

    if parsed.clean.trim().is_empty() && !chunk.text.trim().is_empty() {
        return Err(FailureReason::MalformedResponse(
            "`clean` is empty for a non-empty chunk".into(),
        ));
    }

    Ok(EditResult {
        index: chunk.index,
        annotated: parsed.annotated,
        clean: parsed.clean,
    })
}

/// Some endpoints ignore structured output and wrap the JSON in a Markdown fence.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. `json`) on the opening line
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::{LlmError, MockProvider, ResponseFormat};

    fn chunk(index: usize, text: &str) -> TextChunk {
        TextChunk::new(index, text.to_string())
    }

    #[test]
    fn test_parse_valid_response() {
        let edit = parse_edit_response(
            &chunk(2, "Teh cat"),
            r#"{"annotated": "~~Teh~~ ==The== cat", "clean": "The cat"}"#,
        )
        .unwrap();
        assert_eq!(edit.index, 2);
        assert_eq!(edit.annotated, "~~Teh~~ ==The== cat");
        assert_eq!(edit.clean, "The cat");
    }

    #[test]
    fn test_parse_fenced_response() {
        let content = "```json\n{\"annotated\": \"a\", \"clean\": \"a\"}\n```";
        let edit = parse_edit_response(&chunk(0, "a"), content).unwrap();
        assert_eq!(edit.clean, "a");
    }

    #[test]
    fn test_parse_rejects_malformed_shapes() {
        let c = chunk(0, "text");
        for content in [
            "",
            "not json",
            r#"{"annotated": "a"}"#,
            r#"{"annotated": "a", "clean": 5}"#,
            r#"{"markdown": "a", "plainText": "a"}"#,
            r#"{"annotated": "a", "clean": "a", "notes": "extra"}"#,
            r#"{"annotated": "~~text~~", "clean": "  "}"#,
        ] {
            assert!(
                matches!(
                    parse_edit_response(&c, content),
                    Err(FailureReason::MalformedResponse(_))
                ),
                "accepted: {content}"
            );
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {}  "), "{}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_single_line_fence() {
        let c = chunk(0, "a");
        for content in [
            r#"```{"annotated": "a", "clean": "a"}```"#,
            r#"```json {"annotated": "a", "clean": "a"}```"#,
        ] {
            let edit = parse_edit_response(&c, content).unwrap();
            assert_eq!(edit.clean, "a");
        }
    }

    #[tokio::test]
    async fn test_process_sends_prompts_and_schema() {
        let provider = Arc::new(MockProvider::always_succeeds(
            r#"{"annotated": "Hi ==there==", "clean": "Hi there"}"#,
        ));
        let processor = ChunkProcessor::new(provider.clone()).with_temperature(0.2);

        let processed = processor.process(&chunk(4, "Hi")).await.unwrap();
        assert_eq!(processed.edit.index, 4);
        assert_eq!(processed.edit.clean, "Hi there");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_prompt.as_deref(), Some(SYSTEM_PROMPT));
        assert!(requests[0].prompt.ends_with("Hi"));
        assert_eq!(requests[0].temperature, Some(0.2));
        assert!(matches!(
            requests[0].response_format,
            Some(ResponseFormat::JsonSchema { .. })
        ));
    }

    #[tokio::test]
    async fn test_process_reports_chunk_index_on_service_error() {
        let provider = Arc::new(MockProvider::always_fails(LlmError::ApiError {
            message: "invalid key".into(),
            status_code: Some(401),
        }));
        let processor = ChunkProcessor::new(provider);

        let failure = processor.process(&chunk(7, "text")).await.unwrap_err();
        assert_eq!(failure.index, 7);
        assert_eq!(failure.attempts, 1);
        assert!(matches!(failure.reason, FailureReason::Service(_)));
    }

    #[tokio::test]
    async fn test_process_reports_malformed_response() {
        let provider = Arc::new(MockProvider::always_succeeds("Sure! Here is the edit."));
        let failure = ChunkProcessor::new(provider)
            .process(&chunk(1, "text"))
            .await
            .unwrap_err();
        assert_eq!(failure.index, 1);
        assert!(matches!(failure.reason, FailureReason::MalformedResponse(_)));
    }
}
