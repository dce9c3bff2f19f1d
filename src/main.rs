//! `docs-ingest`: run the Crawler Worker Pool and/or the Streamline
//! Processor against a configured Postgres/pgvector database.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use docs_ingest::{config::Config, crawler, embedding, fetch_pool, processor, storage};

/// Continuously crawl, chunk, and embed developer documentation into
/// Postgres/pgvector.
#[derive(Parser, Debug)]
#[command(name = "docs-ingest", version, about)]
struct Cli {
    /// Run only the crawler, regardless of ENABLE_PROCESSOR.
    #[arg(long)]
    crawler_only: bool,

    /// Run only the processor, regardless of ENABLE_CRAWLER.
    #[arg(long)]
    processor_only: bool,

    /// Run headed (visible) Chrome instead of headless.
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("loading configuration")?;

    if cli.crawler_only {
        config.enable_processor = false;
    }
    if cli.processor_only {
        config.enable_crawler = false;
    }
    if cli.headed {
        config.headless = false;
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received interrupt, shutting down");
                cancel.cancel();
            }
        });
    }

    let storage = Arc::new(
        storage::Storage::connect(&config.database.connection_string(), config.database.max_connections)
            .await
            .context("connecting to storage")?,
    );

    let mut tasks = Vec::new();

    if config.enable_crawler {
        let fetch_pool = Arc::new(
            fetch_pool::FetchPool::start(fetch_pool::FetchPoolConfig {
                pool_size: config.fetch_pool_size,
                headless: config.headless,
                delay_before_return: config.crawler_delay_before_return,
                page_timeout: config.crawler_page_timeout,
                max_retries: config.fetch_max_retries,
            })
            .await
            .context("starting fetch pool")?,
        );

        let crawler_config = crawler::CrawlerConfig {
            worker_batch_size: config.worker_batch_size,
            dual_crawl_enabled: config.crawler_dual_crawl_enabled,
            storage_check_interval: config.storage_check_interval,
            no_urls_sleep_interval: config.no_urls_sleep_interval,
            url_check_interval: config.url_check_interval,
            allowed_url_prefix: config.allowed_url_prefix.clone(),
            main_content_selector: config.main_content_selector.clone(),
        };

        storage
            .insert_url_if_absent(&config.target_url)
            .await
            .context("seeding target url")?;

        let cancel = cancel.clone();
        let storage = storage.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(err) = crawler::run(storage, fetch_pool, crawler_config, cancel).await {
                warn!("crawler exited with error: {err}");
            }
        }));
    }

    if config.enable_processor {
        let embedder: Arc<dyn embedding::EmbeddingProvider> = match config.embedding_provider {
            docs_ingest::config::EmbeddingProviderKind::Api => {
                let credentials = match &config.credentials_file {
                    Some(path) => Some(Arc::new(
                        docs_ingest::credentials::CredentialFile::load(path)
                            .context("loading embedding credentials")?,
                    )),
                    None => None,
                };
                Arc::new(embedding::ApiEmbeddingProvider::new(
                    config.embedding_endpoint.clone(),
                    config.embedding_dimension,
                    credentials,
                ))
            }
            docs_ingest::config::EmbeddingProviderKind::Local => Arc::new(
                embedding::LocalEmbeddingProvider::new(config.embedding_endpoint.clone(), config.embedding_dimension),
            ),
        };

        let processor_config = processor::ProcessorConfig {
            content_fetch_size: config.content_fetch_size,
            storage_threshold: config.storage_threshold,
            min_chunk_length: config.min_chunk_length,
            buffer_check_interval: config.buffer_check_interval,
            no_content_sleep_interval: config.no_content_sleep_interval,
            bisection_max_depth: config.bisection_max_depth,
        };

        let cancel = cancel.clone();
        let storage = storage.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(err) = processor::run(storage, embedder, processor_config, cancel).await {
                warn!("processor exited with error: {err}");
            }
        }));
    }

    if tasks.is_empty() {
        warn!("neither the crawler nor the processor is enabled, exiting");
        return Ok(());
    }

    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}
