//! Shared constants used throughout the ingestion engine.

/// Chrome user agent string for stealth mode.
///
/// Reference: <https://chromiumdash.appspot.com/schedule>
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Default vector dimension for chunk embeddings.
pub const DEFAULT_EMBEDDING_DIM: usize = 2560;

/// Phrase indicating the fetched page does not exist. Locale-specific
/// variants are not covered (see spec open question on this).
pub const NOT_FOUND_PHRASE: &str = "The page you're looking for can't be found.";
