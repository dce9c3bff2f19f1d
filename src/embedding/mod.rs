//! Embedding providers and adaptive request bisection.
//!
//! `EmbeddingProvider` is the external-collaborator contract: a single
//! process-wide instance is constructed at startup and handed explicitly to
//! the Streamline Processor (no global/lazy-static client). Capability
//! distinction between batchable and non-batchable providers is expressed
//! as a trait method rather than a runtime type check.

pub mod api;
pub mod error;
pub mod local;

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use tracing::warn;

pub use api::ApiEmbeddingProvider;
pub use error::EmbedError;
pub use local::LocalEmbeddingProvider;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Dimension of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Whether `embed_batch` sends one network request for the whole slice.
    /// Non-batching providers still implement `embed_batch` (as a loop over
    /// `embed_one`) so callers never need to branch on this themselves;
    /// `embed_with_bisection` consults it directly to skip bisecting a
    /// provider that was never going to reject on payload size in the first
    /// place.
    fn supports_batching(&self) -> bool;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Embed every text in `texts`, preserving order. Each output slot is
    /// `None` if that one text failed to embed; `Err` is reserved for a
    /// batch-level failure (the single request backing a batching
    /// provider). The default implementation loops over `embed_one`,
    /// isolating each failure to its own slot rather than aborting the rest
    /// of the batch; batching providers override this with a single
    /// request.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, EmbedError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            match self.embed_one(text).await {
                Ok(vector) => out.push(Some(vector)),
                Err(err) => {
                    warn!("chunk embedding failed, omitting: {err}");
                    out.push(None);
                }
            }
        }
        Ok(out)
    }
}

/// Embed `texts` against `provider`, recursively bisecting the batch on
/// `PayloadTooLarge` until it succeeds or bottoms out at a single chunk.
///
/// Returns one slot per input text: `Some(vector)` on success, `None` for a
/// chunk that could not be embedded (logged as it happens). Bisection only
/// ever applies to batching providers (`supports_batching() == true`): a
/// non-batching provider's `embed_batch` already isolates each failure to
/// its own slot and never returns a batch-level `PayloadTooLarge`.
pub fn embed_with_bisection<'a>(
    provider: &'a dyn EmbeddingProvider,
    texts: &'a [String],
    max_depth: u32,
) -> Pin<Box<dyn Future<Output = Vec<Option<Vec<f32>>>> + Send + 'a>> {
    Box::pin(async move {
        if texts.is_empty() {
            return Vec::new();
        }

        match provider.embed_batch(texts).await {
            Ok(results) => results,
            Err(EmbedError::PayloadTooLarge) if provider.supports_batching() && texts.len() > 1 && max_depth > 0 => {
                let mid = texts.len() / 2;
                let (left, right) = texts.split_at(mid);
                let mut left_results = embed_with_bisection(provider, left, max_depth - 1).await;
                let right_results = embed_with_bisection(provider, right, max_depth - 1).await;
                left_results.extend(right_results);
                left_results
            }
            Err(err) => {
                warn!(
                    batch_size = texts.len(),
                    "embedding batch failed, omitting {} chunk(s): {err}",
                    texts.len()
                );
                vec![None; texts.len()]
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyProvider {
        limit: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        fn dimension(&self) -> usize {
            4
        }

        fn supports_batching(&self) -> bool {
            true
        }

        async fn embed_one(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Ok(vec![0.0; 4])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if texts.len() > self.limit {
                Err(EmbedError::PayloadTooLarge)
            } else {
                Ok(texts.iter().map(|_| Some(vec![1.0; 4])).collect())
            }
        }
    }

    #[tokio::test]
    async fn bisects_until_under_limit() {
        let provider = FlakyProvider { limit: 2, calls: AtomicUsize::new(0) };
        let texts: Vec<String> = (0..8).map(|i| i.to_string()).collect();
        let results = embed_with_bisection(&provider, &texts, 10).await;
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(Option::is_some));
    }

    struct AlwaysTooLarge;

    #[async_trait]
    impl EmbeddingProvider for AlwaysTooLarge {
        fn dimension(&self) -> usize {
            4
        }

        fn supports_batching(&self) -> bool {
            true
        }

        async fn embed_one(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Err(EmbedError::PayloadTooLarge)
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, EmbedError> {
            Err(EmbedError::PayloadTooLarge)
        }
    }

    #[tokio::test]
    async fn single_chunk_failure_is_recorded_as_none() {
        let provider = AlwaysTooLarge;
        let texts = vec!["only one".to_string()];
        let results = embed_with_bisection(&provider, &texts, 10).await;
        assert_eq!(results, vec![None]);
    }

    #[tokio::test]
    async fn depth_exhaustion_omits_remaining_batch() {
        let provider = AlwaysTooLarge;
        let texts: Vec<String> = (0..4).map(|i| i.to_string()).collect();
        let results = embed_with_bisection(&provider, &texts, 0).await;
        assert_eq!(results, vec![None; 4]);
    }
}
