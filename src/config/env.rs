//! Environment-variable loading for [`Config`].
//!
//! Plain `std::env::var` parsing with typed defaults, in the teacher's own
//! style of reading configuration without a dedicated env-parsing crate.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use super::types::{Config, DatabaseConfig, EmbeddingProviderKind};

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {key} ('{raw}'): {e}")),
    }
}

fn parse_bool(key: &str, default: bool) -> Result<bool> {
    match var(key) {
        None => Ok(default),
        Some(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(anyhow::anyhow!("invalid boolean for {key}: '{other}'")),
        },
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults in [`Config::default`] for anything unset.
    ///
    /// # Errors
    /// Returns an error if a value is present but fails to parse, or if a
    /// required database parameter is missing.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let database = DatabaseConfig {
            host: var("DOCS_INGEST_DB_HOST").unwrap_or(defaults.database.host),
            port: parse_var("DOCS_INGEST_DB_PORT", defaults.database.port)?,
            database: var("DOCS_INGEST_DB_NAME").unwrap_or(defaults.database.database),
            user: var("DOCS_INGEST_DB_USER").unwrap_or(defaults.database.user),
            password: var("DOCS_INGEST_DB_PASSWORD").unwrap_or(defaults.database.password),
            max_connections: parse_var(
                "DOCS_INGEST_DB_MAX_CONNECTIONS",
                defaults.database.max_connections,
            )?,
        };

        let embedding_provider = match var("EMBEDDING_PROVIDER") {
            None => defaults.embedding_provider,
            Some(raw) => raw.parse::<EmbeddingProviderKind>()?,
        };

        Ok(Self {
            worker_batch_size: parse_var("WORKER_BATCH_SIZE", defaults.worker_batch_size)?,
            crawler_dual_crawl_enabled: parse_bool(
                "CRAWLER_DUAL_CRAWL_ENABLED",
                defaults.crawler_dual_crawl_enabled,
            )?,
            crawler_delay_before_return: Duration::from_secs(parse_var(
                "CRAWLER_DELAY_BEFORE_RETURN",
                defaults.crawler_delay_before_return.as_secs(),
            )?),
            crawler_page_timeout: Duration::from_millis(parse_var(
                "CRAWLER_PAGE_TIMEOUT",
                defaults.crawler_page_timeout.as_millis() as u64,
            )?),
            storage_check_interval: defaults.storage_check_interval,
            no_urls_sleep_interval: defaults.no_urls_sleep_interval,
            url_check_interval: defaults.url_check_interval,
            allowed_url_prefix: var("ALLOWED_URL_PREFIX").unwrap_or(defaults.allowed_url_prefix),
            target_url: var("TARGET_URL").unwrap_or(defaults.target_url),
            main_content_selector: var("MAIN_CONTENT_SELECTOR").map(Some).unwrap_or(defaults.main_content_selector),

            content_fetch_size: parse_var("CONTENT_FETCH_SIZE", defaults.content_fetch_size)?,
            storage_threshold: parse_var("STORAGE_THRESHOLD", defaults.storage_threshold)?,
            min_chunk_length: defaults.min_chunk_length,
            buffer_check_interval: defaults.buffer_check_interval,
            no_content_sleep_interval: defaults.no_content_sleep_interval,
            bisection_max_depth: defaults.bisection_max_depth,

            enable_crawler: parse_bool("ENABLE_CRAWLER", defaults.enable_crawler)?,
            enable_processor: parse_bool("ENABLE_PROCESSOR", defaults.enable_processor)?,

            embedding_provider,
            embedding_dimension: defaults.embedding_dimension,
            embedding_endpoint: var("EMBEDDING_ENDPOINT").unwrap_or(defaults.embedding_endpoint),
            credentials_file: var("EMBEDDING_CREDENTIALS_FILE").map(PathBuf::from),

            fetch_pool_size: parse_var("FETCH_POOL_SIZE", defaults.fetch_pool_size)?,
            fetch_max_retries: defaults.fetch_max_retries,
            headless: parse_bool("CRAWLER_HEADLESS", defaults.headless)?,

            database,
        })
    }
}
