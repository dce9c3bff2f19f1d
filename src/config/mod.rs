pub mod env;
pub mod types;

pub use types::{Config, DatabaseConfig, EmbeddingProviderKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_specification() {
        let cfg = Config::default();
        assert_eq!(cfg.worker_batch_size, 5);
        assert_eq!(cfg.content_fetch_size, 50);
        assert_eq!(cfg.storage_threshold, 10);
        assert_eq!(cfg.min_chunk_length, 128);
        assert_eq!(cfg.embedding_dimension, 2560);
        assert!(cfg.enable_crawler);
        assert!(cfg.enable_processor);
        assert_eq!(cfg.embedding_provider, EmbeddingProviderKind::Local);
    }

    #[test]
    fn from_env_overrides_defaults() {
        // SAFETY: test runs single-threaded within this process's env; no
        // other test in this module touches these keys.
        unsafe {
            std::env::set_var("WORKER_BATCH_SIZE", "9");
            std::env::set_var("EMBEDDING_PROVIDER", "api");
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.worker_batch_size, 9);
        assert_eq!(cfg.embedding_provider, EmbeddingProviderKind::Api);
        unsafe {
            std::env::remove_var("WORKER_BATCH_SIZE");
            std::env::remove_var("EMBEDDING_PROVIDER");
        }
    }
}
