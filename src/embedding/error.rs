//! Embedder error taxonomy, per the external embedding service contract.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    /// The request body exceeded the service's limit. Triggers bisection.
    #[error("payload too large")]
    PayloadTooLarge,

    /// The credential was rejected. Rotate and retry if a rotation hook is
    /// configured; otherwise fatal for the call.
    #[error("authentication failed")]
    AuthFailed,

    /// Caller is being throttled. Retry with backoff, bounded.
    #[error("rate limited")]
    RateLimited,

    /// Network-level failure. Retry.
    #[error("transport error: {0}")]
    Transport(String),

    /// Service reported itself unavailable. Retry, then fail.
    #[error("embedding service unavailable")]
    Unavailable,
}

impl EmbedError {
    /// Whether the whole batch should be abandoned rather than retried or
    /// bisected further.
    #[must_use]
    pub fn is_terminal_for_batch(&self) -> bool {
        matches!(self, Self::AuthFailed)
    }
}
