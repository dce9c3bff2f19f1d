//! HTTP-backed embedding provider: the primary "API embedding provider"
//! from the spec, batched and credential-rotating.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::credentials::CredentialFile;

use super::{EmbedError, EmbeddingProvider};

const MAX_TRANSIENT_RETRIES: u32 = 3;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct ApiEmbeddingProvider {
    client: Client,
    endpoint: String,
    dimension: usize,
    credentials: Option<Arc<CredentialFile>>,
}

impl ApiEmbeddingProvider {
    #[must_use]
    pub fn new(endpoint: String, dimension: usize, credentials: Option<Arc<CredentialFile>>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            dimension,
            credentials,
        }
    }

    async fn send(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut request = self.client.post(&self.endpoint).json(&EmbedRequest { input: texts });

        if let Some(creds) = &self.credentials {
            let token = creds.current().map_err(|_| EmbedError::AuthFailed)?;
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();

        if status.is_success() {
            let body: EmbedResponse = response.json().await.map_err(|e| EmbedError::Transport(e.to_string()))?;
            return Ok(body.embeddings);
        }

        Err(classify_status(status))
    }

    async fn send_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut rotated_once = false;

        for attempt in 0..=MAX_TRANSIENT_RETRIES {
            match self.send(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(EmbedError::AuthFailed) if !rotated_once => {
                    let Some(creds) = &self.credentials else {
                        return Err(EmbedError::AuthFailed);
                    };
                    if creds.invalidate_current().is_err() {
                        return Err(EmbedError::AuthFailed);
                    }
                    rotated_once = true;
                    debug!("rotated embedding credential after auth failure, retrying");
                }
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

#[async_trait]
impl EmbeddingProvider for ApiEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn supports_batching(&self) -> bool {
        true
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let texts = [text.to_string()];
        let vectors = self.send_with_retry(&texts).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Transport("empty response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, EmbedError> {
        self.send_with_retry(texts)
            .await
            .map(|vectors| vectors.into_iter().map(Some).collect())
    }
}

fn classify_status(status: StatusCode) -> EmbedError {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => EmbedError::PayloadTooLarge,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EmbedError::AuthFailed,
        StatusCode::TOO_MANY_REQUESTS => EmbedError::RateLimited,
        s if s.is_server_error() => EmbedError::Unavailable,
        s => EmbedError::Transport(format!("unexpected status {s}")),
    }
}

fn classify_transport(err: reqwest::Error) -> EmbedError {
    if err.is_timeout() {
        EmbedError::Unavailable
    } else {
        EmbedError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn payload_too_large_is_classified() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embed")
            .with_status(413)
            .create_async()
            .await;

        let provider = ApiEmbeddingProvider::new(format!("{}/embed", server.url()), 4, None);
        let err = provider.embed_one("hello").await.unwrap_err();
        assert!(matches!(err, EmbedError::PayloadTooLarge));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn successful_batch_round_trips_vectors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embeddings": [[0.1, 0.2, 0.3, 0.4]]}"#)
            .create_async()
            .await;

        let provider = ApiEmbeddingProvider::new(format!("{}/embed", server.url()), 4, None);
        let vectors = provider.embed_batch(&["hi".to_string()]).await.unwrap();
        assert_eq!(vectors, vec![Some(vec![0.1, 0.2, 0.3, 0.4])]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn auth_failure_rotates_credential_and_retries() {
        let mut server = mockito::Server::new_async().await;
        let first = server.mock("POST", "/embed").with_status(401).expect(1).create_async().await;
        let second = server
            .mock("POST", "/embed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embeddings": [[1.0, 1.0, 1.0, 1.0]]}"#)
            .expect(1)
            .create_async()
            .await;

        let f = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(f.path(), "key-a\nkey-b\n").unwrap();
        let creds = Arc::new(CredentialFile::load(f.path()).unwrap());

        let provider = ApiEmbeddingProvider::new(format!("{}/embed", server.url()), 4, Some(creds.clone()));
        let vectors = provider.embed_one("hi").await.unwrap();
        assert_eq!(vectors, vec![1.0, 1.0, 1.0, 1.0]);
        assert_eq!(creds.current().unwrap(), "key-b");

        first.assert_async().await;
        second.assert_async().await;
    }
}
