//! Deep search: concurrent content extraction for the top results.
//!
//! # Pipeline
//!
//! 1. Truncate the batch to `k` and set every entry's content to `""`
//! 2. Classify entries; only valid, never-failed links get a fetch
//! 3. Run fetches through [`futures::StreamExt::buffer_unordered`] with a
//!    bound of `min(k × factor, cap)`
//! 4. Write each finished extraction back into its original slot
//! 5. At the aggregate deadline, drop the stream (cancelling outstanding
//!    fetches) and mark the unfinished links as failed
//!
//! Output length and order always match the truncated input.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use tokio::time::Instant;

use crate::config::SearchConfig;
use crate::extractor::ContentExtractor;
use crate::types::SearchResult;

/// Fans a [`ContentExtractor`] out over a batch of results.
pub struct DeepSearchOrchestrator {
    extractor: ContentExtractor,
    byte_limit: usize,
    text_limit: usize,
    deadline: Duration,
    concurrency_factor: usize,
    concurrency_cap: usize,
}

impl DeepSearchOrchestrator {
    pub fn new(extractor: ContentExtractor, config: &SearchConfig) -> Self {
        Self {
            extractor,
            byte_limit: config.byte_limit,
            text_limit: config.text_limit,
            deadline: config.deep_search_deadline,
            concurrency_factor: config.concurrency_factor.max(1),
            concurrency_cap: config.concurrency_cap.max(1),
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    fn concurrency_for(&self, k: usize) -> usize {
        k.saturating_mul(self.concurrency_factor)
            .min(self.concurrency_cap)
            .max(1)
    }

    /// Attach extracted page text to the first `k` results.
    ///
    /// Returns exactly `min(k, results.len())` entries in input order, each
    /// with `full_content` set; entries that were ineligible, failed, or did
    /// not finish before the deadline carry `""`.
    pub async fn enrich(&self, mut results: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
        results.truncate(k);
        if results.is_empty() {
            return results;
        }
        let deadline = Instant::now() + self.deadline;
        let cache = self.extractor.cache();

        let mut pending = vec![false; results.len()];
        let mut jobs = Vec::new();
        for (idx, result) in results.iter_mut().enumerate() {
            result.full_content = Some(String::new());
            if cache.is_eligible(&result.link) {
                pending[idx] = true;
                jobs.push((idx, result.link.clone()));
            } else {
                tracing::trace!(link = %result.link, "ineligible for deep search");
            }
        }

        let dispatched = jobs.len();
        let bound = self.concurrency_for(k);
        let (byte_limit, text_limit) = (self.byte_limit, self.text_limit);
        let mut tasks = futures::stream::iter(jobs)
            .map(|(idx, url)| {
                let extractor = self.extractor.clone();
                async move {
                    let outcome = AssertUnwindSafe(extractor.extract(&url, byte_limit, text_limit))
                        .catch_unwind()
                        .await;
                    (idx, outcome)
                }
            })
            .buffer_unordered(bound);

        let mut finished = 0usize;
        loop {
            match tokio::time::timeout_at(deadline, tasks.next()).await {
                Ok(Some((idx, outcome))) => {
                    pending[idx] = false;
                    finished += 1;
                    match outcome {
                        Ok(text) => results[idx].full_content = Some(text),
                        Err(_) => {
                            tracing::warn!(link = %results[idx].link, "extraction task panicked");
                            cache.mark_failed(&results[idx].link);
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::debug!(
                        deadline_ms = self.deadline.as_millis() as u64,
                        finished,
                        dispatched,
                        "deep search deadline exceeded"
                    );
                    break;
                }
            }
        }
        // Cancels every fetch still in flight.
        drop(tasks);

        for (idx, unfinished) in pending.into_iter().enumerate() {
            if unfinished {
                cache.mark_failed(&results[idx].link);
            }
        }

        tracing::debug!(
            entries = results.len(),
            dispatched,
            enriched = results.iter().filter(|r| !r.content().is_empty()).count(),
            "deep search finished"
        );
        results
    }
}
