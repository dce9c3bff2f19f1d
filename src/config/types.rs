//! Configuration surface for the ingestion engine.
//!
//! Mirrors the environment-keyed table in the specification: every field has
//! a documented default and can be overridden by an environment variable of
//! the same name.

use std::time::Duration;

use crate::utils::DEFAULT_EMBEDDING_DIM;

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProviderKind {
    /// In-process model, no network round trip, no bisection needed.
    Local,
    /// Remote HTTP embedding service, subject to payload-size limits.
    Api,
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "api" => Ok(Self::Api),
            other => Err(anyhow::anyhow!("unknown EMBEDDING_PROVIDER '{other}', expected 'local' or 'api'")),
        }
    }
}

/// Database connection parameters.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    #[must_use]
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// Top-level, validated configuration for the crawler and processor.
#[derive(Debug, Clone)]
pub struct Config {
    // Crawler Worker Pool
    pub worker_batch_size: usize,
    pub crawler_dual_crawl_enabled: bool,
    pub crawler_delay_before_return: Duration,
    pub crawler_page_timeout: Duration,
    pub storage_check_interval: Duration,
    pub no_urls_sleep_interval: Duration,
    pub url_check_interval: Duration,
    pub allowed_url_prefix: String,
    pub target_url: String,
    pub main_content_selector: Option<String>,

    // Streamline Processor
    pub content_fetch_size: usize,
    pub storage_threshold: usize,
    pub min_chunk_length: usize,
    pub buffer_check_interval: Duration,
    pub no_content_sleep_interval: Duration,
    pub bisection_max_depth: u32,

    // Subsystem toggles
    pub enable_crawler: bool,
    pub enable_processor: bool,

    // Embedding
    pub embedding_provider: EmbeddingProviderKind,
    pub embedding_dimension: usize,
    pub embedding_endpoint: String,
    pub credentials_file: Option<std::path::PathBuf>,

    // Fetch pool
    pub fetch_pool_size: usize,
    pub fetch_max_retries: u32,
    pub headless: bool,

    // Storage
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_batch_size: 5,
            crawler_dual_crawl_enabled: false,
            crawler_delay_before_return: Duration::from_secs(5),
            crawler_page_timeout: Duration::from_millis(5000),
            storage_check_interval: Duration::from_secs(30),
            no_urls_sleep_interval: Duration::from_secs(5),
            url_check_interval: Duration::from_secs(1),
            allowed_url_prefix: "https://developer.apple.com/documentation/".to_string(),
            target_url: "https://developer.apple.com/documentation/".to_string(),
            main_content_selector: Some("main".to_string()),

            content_fetch_size: 50,
            storage_threshold: 10,
            min_chunk_length: 128,
            buffer_check_interval: Duration::from_millis(1000),
            no_content_sleep_interval: Duration::from_secs(3),
            bisection_max_depth: 10,

            enable_crawler: true,
            enable_processor: true,

            embedding_provider: EmbeddingProviderKind::Local,
            embedding_dimension: DEFAULT_EMBEDDING_DIM,
            embedding_endpoint: "http://127.0.0.1:8080/embed".to_string(),
            credentials_file: None,

            fetch_pool_size: 5,
            fetch_max_retries: 2,
            headless: true,

            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 5432,
                database: "docs_ingest".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                max_connections: 10,
            },
        }
    }
}
