//! Local embedding provider: a single in-process (or localhost-sidecar)
//! model served over HTTP, queried one chunk at a time. The model itself is
//! out of scope for this crate (non-goal: re-implementing an ML runtime);
//! this type only speaks the request/response contract.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{EmbedError, EmbeddingProvider};

const MAX_TRANSIENT_RETRIES: u32 = 3;

#[derive(Serialize)]
struct LocalEmbedRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct LocalEmbedResponse {
    embedding: Vec<f32>,
}

pub struct LocalEmbeddingProvider {
    client: Client,
    endpoint: String,
    dimension: usize,
}

impl LocalEmbeddingProvider {
    #[must_use]
    pub fn new(endpoint: String, dimension: usize) -> Self {
        Self { client: Client::new(), endpoint, dimension }
    }

    async fn send(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&LocalEmbedRequest { input: text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbedError::Unavailable
                } else {
                    EmbedError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(EmbedError::Unavailable);
        }

        let body: LocalEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Transport(e.to_string()))?;
        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn supports_batching(&self) -> bool {
        false
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        for attempt in 0..=MAX_TRANSIENT_RETRIES {
            match self.send(text).await {
                Ok(vector) => return Ok(vector),
                Err(err @ (EmbedError::RateLimited | EmbedError::Transport(_) | EmbedError::Unavailable)) => {
                    if attempt == MAX_TRANSIENT_RETRIES {
                        return Err(err);
                    }
                    let jitter_ms = rand::rng().random_range(0..200);
                    let backoff = Duration::from_millis(200 * 2u64.pow(attempt) + jitter_ms);
                    warn!(attempt, "transient embedding error, retrying in {backoff:?}: {err}");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }

        Err(EmbedError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeds_one_chunk_at_a_time() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": [0.5, 0.5]}"#)
            .create_async()
            .await;

        let provider = LocalEmbeddingProvider::new(format!("{}/embed", server.url()), 2);
        assert!(!provider.supports_batching());
        let vector = provider.embed_one("chunk").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.5]);
        mock.assert_async().await;
    }
}
