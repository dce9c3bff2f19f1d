//! Error taxonomy for the stealth fetch pool.

use thiserror::Error;

/// Errors surfaced by [`super::FetchPool::fetch`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The underlying browser session itself is broken (closed pipe, dead
    /// process, unable to open a new page). The session is evicted and
    /// replaced; the caller should retry against a different session.
    #[error("permanent session error: {0}")]
    Permanent(String),

    /// A recoverable failure against an otherwise-healthy session
    /// (navigation timeout, transient network error, fetcher-level 5xx).
    /// The session is returned to the pool; the caller may retry in place.
    #[error("transient fetch error: {0}")]
    Transient(String),

    /// Retries against this URL have been exhausted.
    #[error("fetch retries exhausted for {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

impl FetchError {
    /// Classify a raw error message the way the underlying fetch layer does:
    /// keyword match against known session-fatal phrases.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let is_permanent = lower.contains("connection closed")
            || lower.contains("pipe closed")
            || lower.contains("browsercontext.new_page")
            || lower.contains("session closed")
            || lower.contains("target closed");

        if is_permanent {
            Self::Permanent(message.to_string())
        } else {
            Self::Transient(message.to_string())
        }
    }

    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
}
