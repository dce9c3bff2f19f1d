pub mod browser_pool;
pub mod browser_profile;
pub mod browser_setup;
pub mod chunker;
pub mod config;
pub mod crawler;
pub mod credentials;
pub mod embedding;
pub mod fetch_pool;
pub mod processor;
pub mod storage;
pub mod utils;

pub use browser_pool::{BrowserPool, BrowserPoolConfig, PooledBrowserGuard};
pub use browser_profile::{
    cleanup_stale_lock, cleanup_stale_profiles, create_unique_profile,
    create_unique_profile_with_prefix, is_singleton_lock_stale, BrowserProfile,
};
pub use browser_setup::{
    apply_stealth_measures, download_managed_browser, find_browser_executable, launch_browser,
};
pub use chunker::{chunk_text, chunk_text_with_size, BreakKind, Chunk};
pub use config::Config;
pub use crawler::{run as run_crawler, CrawlerConfig};
pub use embedding::{ApiEmbeddingProvider, EmbedError, EmbeddingProvider, LocalEmbeddingProvider};
pub use fetch_pool::{FetchError, FetchPool, FetchPoolConfig};
pub use processor::{run as run_processor, ProcessorConfig};
pub use storage::{ChunkRow, Page, Storage, StorageError};
