//! Concurrent fan-out of chunks to the processor.
//!
//! Every chunk is sent at once; results are slotted back by position, so the
//! output order never depends on which call finishes first. A dispatch is
//! all-or-nothing: one failed chunk fails the whole batch.

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use llm_client::{LlmError, TokenUsage};
use log::{debug, info, warn};
use std::time::Duration;

use super::EditResult;
use super::processor::{ChunkProcessor, ProcessedChunk};
use crate::error::{ChunkFailure, ChunkProcessingError, FailureReason};
use crate::text::TextChunk;

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);
const DEFAULT_MAX_RETRY_WAIT: Duration = Duration::from_secs(60);

/// What to do with in-flight chunks once one chunk has failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Drop the remaining calls and report the first failure
    #[default]
    FailFast,
    /// Let every call finish and report every failure
    CollectAll,
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub policy: FailurePolicy,
    /// Extra attempts per chunk for transient service errors (0 = no retry)
    pub max_retries: u32,
    /// Wait before retry `n` is `retry_backoff * n`
    pub retry_backoff: Duration,
    /// Upper bound on any single wait, `Retry-After` included
    pub max_retry_wait: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::default(),
            max_retries: 0,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            max_retry_wait: DEFAULT_MAX_RETRY_WAIT,
        }
    }
}

/// Progress after one chunk finished (successfully or not).
#[derive(Debug, Clone, Copy)]
pub struct DispatchProgress {
    /// Chunks finished so far
    pub completed: usize,
    /// Chunks in the dispatch
    pub total: usize,
    /// Index of the chunk that just finished
    pub index: usize,
}

/// Results of a successful dispatch.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// One result per chunk, in chunk order
    pub results: Vec<EditResult>,
    /// Token usage summed over every chunk that reported it
    pub usage: TokenUsage,
}

/// Process every chunk concurrently and return the results in chunk order.
pub async fn dispatch<F>(
    processor: &ChunkProcessor,
    chunks: &[TextChunk],
    options: &DispatchOptions,
    mut on_progress: F,
) -> Result<DispatchReport, ChunkProcessingError>
where
    F: FnMut(DispatchProgress),
{
    let total = chunks.len();
    info!("Dispatching {} chunk(s)", total);

    let mut in_flight: FuturesUnordered<_> = chunks
        .iter()
        .enumerate()
        .map(|(slot, chunk)| async move {
            (slot, process_with_retry(processor, chunk, options).await)
        })
        .collect();

    let mut slots: Vec<Option<EditResult>> = (0..total).map(|_| None).collect();
    let mut failures = Vec::new();
    let mut usage = TokenUsage::default();
    let mut completed = 0;

    while let Some((slot, outcome)) = in_flight.next().await {
        completed += 1;
        let index = chunks[slot].index;

        match outcome {
            Ok(processed) => {
                if let Some(chunk_usage) = processed.usage {
                    usage += chunk_usage;
                }
                slots[slot] = Some(processed.edit);
            }
            Err(failure) => {
                warn!("{}", failure);
                failures.push(failure);
            }
        }

        on_progress(DispatchProgress {
            completed,
            total,
            index,
        });

        if !failures.is_empty() && options.policy == FailurePolicy::FailFast {
            break;
        }
    }

    if !failures.is_empty() {
        let abandoned = in_flight.len();
        if abandoned > 0 {
            debug!("Cancelling {} in-flight chunk(s)", abandoned);
        }
        drop(in_flight);

        failures.sort_by_key(|f| f.index);
        return Err(ChunkProcessingError { total, failures });
    }

    let results: Vec<EditResult> = slots.into_iter().flatten().collect();
    debug_assert_eq!(results.len(), total);

    info!(
        "All {} chunk(s) edited ({} tokens in, {} out)",
        total, usage.input_tokens, usage.output_tokens
    );

    Ok(DispatchReport { results, usage })
}

/// Run one chunk, retrying transient failures up to `options.max_retries` times.
async fn process_with_retry(
    processor: &ChunkProcessor,
    chunk: &TextChunk,
    options: &DispatchOptions,
) -> Result<ProcessedChunk, ChunkFailure> {
    let mut attempt: u32 = 1;

    loop {
        match processor.process(chunk).await {
            Ok(processed) => return Ok(processed),
            Err(mut failure) => {
                failure.attempts = attempt;
                if attempt > options.max_retries || !failure.reason.is_transient() {
                    return Err(failure);
                }

                let wait = retry_delay(&failure.reason, options, attempt);
                warn!(
                    "Chunk {} failed (attempt {}), retrying in {:?}: {}",
                    chunk.index, attempt, wait, failure.reason
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

/// A server-supplied `Retry-After` wins over the linear backoff; both are
/// capped at `options.max_retry_wait`.
fn retry_delay(reason: &FailureReason, options: &DispatchOptions, attempt: u32) -> Duration {
    let wait = match reason {
        FailureReason::Service(LlmError::RateLimited {
            retry_after: Some(seconds),
        }) => Duration::from_secs(*seconds),
        _ => options.retry_backoff.saturating_mul(attempt),
    };
    wait.min(options.max_retry_wait)
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::{LlmRequest, MockProvider, MockReply};
    use std::sync::Arc;

    /// Chunk texts carry a `[[i]]` marker so the mock can tell them apart.
    fn chunks(n: usize) -> Vec<TextChunk> {
        (0..n)
            .map(|i| TextChunk::new(i, format!("[[{i}]] paragraph")))
            .collect()
    }

    fn marker(request: &LlmRequest) -> usize {
        let start = request.prompt.rfind("[[").expect("prompt should carry a marker") + 2;
        let end = start + request.prompt[start..].find("]]").unwrap();
        request.prompt[start..end].parse().unwrap()
    }

    fn edit_json(i: usize) -> String {
        format!(r#"{{"annotated": "~~p{i}~~ ==P{i}==", "clean": "P{i}"}}"#)
    }

    fn no_retry_options() -> DispatchOptions {
        DispatchOptions {
            retry_backoff: Duration::from_millis(1),
            ..DispatchOptions::default()
        }
    }

    #[tokio::test]
    async fn test_results_follow_chunk_order_not_completion_order() {
        let n = 5;
        // Later chunks answer first
        let provider = Arc::new(MockProvider::scripted(move |request| {
            let i = marker(request);
            MockReply::ok(edit_json(i)).after(Duration::from_millis(((n - i) * 15) as u64))
        }));
        let processor = ChunkProcessor::new(provider.clone());

        let mut finished = Vec::new();
        let report = dispatch(&processor, &chunks(n), &no_retry_options(), |p| {
            finished.push(p.index)
        })
        .await
        .unwrap();

        assert_eq!(finished, vec![4, 3, 2, 1, 0]);
        assert_eq!(report.results.len(), n);
        for (i, result) in report.results.iter().enumerate() {
            assert_eq!(result.index, i);
            assert_eq!(result.clean, format!("P{i}"));
        }
        assert_eq!(provider.call_count(), n);
        assert_eq!(report.usage.input_tokens, n as u32);
    }

    #[tokio::test]
    async fn test_one_failure_fails_the_batch() {
        let provider = Arc::new(MockProvider::scripted(|request| {
            let i = marker(request);
            if i == 1 {
                MockReply::err(LlmError::ApiError {
                    message: "bad request".into(),
                    status_code: Some(400),
                })
            } else {
                MockReply::ok(edit_json(i)).after(Duration::from_millis(20))
            }
        }));
        let processor = ChunkProcessor::new(provider);

        let err = dispatch(&processor, &chunks(3), &no_retry_options(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.total, 3);
        assert_eq!(err.failed_indices(), vec![1]);
    }

    #[tokio::test]
    async fn test_fail_fast_cancels_siblings() {
        let provider = Arc::new(MockProvider::scripted(|request| {
            let i = marker(request);
            if i == 0 {
                MockReply::ok("garbage")
            } else {
                MockReply::ok(edit_json(i)).after(Duration::from_secs(30))
            }
        }));
        let processor = ChunkProcessor::new(provider);

        let started = std::time::Instant::now();
        let mut progress_calls = 0;
        let err = dispatch(&processor, &chunks(4), &no_retry_options(), |_| {
            progress_calls += 1
        })
        .await
        .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(progress_calls, 1);
        assert_eq!(err.failed_indices(), vec![0]);
        assert!(matches!(
            err.failures[0].reason,
            FailureReason::MalformedResponse(_)
        ));
    }

    #[tokio::test]
    async fn test_collect_all_reports_every_failure() {
        let provider = Arc::new(MockProvider::scripted(|request| {
            let i = marker(request);
            if i % 2 == 1 {
                MockReply::err(LlmError::ConfigError("nope".into()))
                    .after(Duration::from_millis((10 * i) as u64))
            } else {
                MockReply::ok(edit_json(i))
            }
        }));
        let processor = ChunkProcessor::new(provider.clone());
        let options = DispatchOptions {
            policy: FailurePolicy::CollectAll,
            ..no_retry_options()
        };

        let err = dispatch(&processor, &chunks(5), &options, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.failed_indices(), vec![1, 3]);
        assert_eq!(provider.call_count(), 5);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let provider = Arc::new(MockProvider::fails_then_succeeds(
            1,
            LlmError::ServerOverloaded {
                message: "busy".into(),
            },
            &edit_json(0),
        ));
        let processor = ChunkProcessor::new(provider.clone());
        let options = DispatchOptions {
            max_retries: 2,
            ..no_retry_options()
        };

        let report = dispatch(&processor, &chunks(1), &options, |_| {})
            .await
            .unwrap();
        assert_eq!(report.results[0].clean, "P0");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let provider = Arc::new(MockProvider::always_fails(LlmError::Timeout { seconds: 1 }));
        let processor = ChunkProcessor::new(provider.clone());
        let options = DispatchOptions {
            max_retries: 2,
            ..no_retry_options()
        };

        let err = dispatch(&processor, &chunks(1), &options, |_| {})
            .await
            .unwrap_err();
        assert_eq!(provider.call_count(), 3);
        assert_eq!(err.failures[0].attempts, 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let provider = Arc::new(MockProvider::always_fails(LlmError::ApiError {
            message: "unauthorized".into(),
            status_code: Some(401),
        }));
        let processor = ChunkProcessor::new(provider.clone());
        let options = DispatchOptions {
            max_retries: 3,
            ..no_retry_options()
        };

        assert!(dispatch(&processor, &chunks(1), &options, |_| {}).await.is_err());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_dispatch() {
        let provider = Arc::new(MockProvider::always_succeeds(""));
        let processor = ChunkProcessor::new(provider.clone());
        let report = dispatch(&processor, &[], &DispatchOptions::default(), |_| {})
            .await
            .unwrap();
        assert!(report.results.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_retry_delay_honors_retry_after() {
        let options = DispatchOptions {
            retry_backoff: Duration::from_millis(100),
            ..DispatchOptions::default()
        };
        let limited = FailureReason::Service(LlmError::RateLimited {
            retry_after: Some(3),
        });
        assert_eq!(retry_delay(&limited, &options, 1), Duration::from_secs(3));
        let overloaded = FailureReason::Service(LlmError::ServerOverloaded {
            message: String::new(),
        });
        assert_eq!(retry_delay(&overloaded, &options, 3), Duration::from_millis(300));
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let options = DispatchOptions {
            retry_backoff: Duration::from_secs(40),
            max_retry_wait: Duration::from_secs(60),
            ..DispatchOptions::default()
        };
        let day_long = FailureReason::Service(LlmError::RateLimited {
            retry_after: Some(86_400),
        });
        assert_eq!(retry_delay(&day_long, &options, 1), Duration::from_secs(60));

        let timeout = FailureReason::Service(LlmError::Timeout { seconds: 1 });
        assert_eq!(retry_delay(&timeout, &options, 1), Duration::from_secs(40));
        assert_eq!(retry_delay(&timeout, &options, 2), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_long_retry_after_does_not_stall_dispatch() {
        let provider = Arc::new(MockProvider::fails_then_succeeds(
            1,
            LlmError::RateLimited {
                retry_after: Some(86_400),
            },
            &edit_json(0),
        ));
        let processor = ChunkProcessor::new(provider.clone());
        let options = DispatchOptions {
            max_retries: 1,
            max_retry_wait: Duration::from_millis(10),
            ..no_retry_options()
        };

        let started = std::time::Instant::now();
        let report = dispatch(&processor, &chunks(1), &options, |_| {})
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.results[0].clean, "P0");
        assert_eq!(provider.call_count(), 2);
    }
}
