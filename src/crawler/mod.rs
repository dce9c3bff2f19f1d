//! Crawler Worker Pool: URL Supplier, N Workers, and a Storage Manager
//! cooperating over a bounded queue and a mutex-guarded result buffer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::fetch_pool::FetchPool;
use crate::storage::Storage;
use crate::utils::url_utils::canonicalize_url;

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub worker_batch_size: usize,
    pub dual_crawl_enabled: bool,
    pub storage_check_interval: Duration,
    pub no_urls_sleep_interval: Duration,
    pub url_check_interval: Duration,
    pub allowed_url_prefix: String,
    pub main_content_selector: Option<String>,
}

struct CrawlResult {
    url: String,
    content: String,
    links: Vec<String>,
    is_404: bool,
}

type UrlQueue = Mutex<VecDeque<String>>;
type ResultBuffer = Mutex<Vec<CrawlResult>>;

/// Run the Crawler Worker Pool until `cancel` fires. Returns once the
/// supplier, every worker, and the storage manager have exited.
pub async fn run(
    storage: Arc<Storage>,
    fetch_pool: Arc<FetchPool>,
    config: CrawlerConfig,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let queue: Arc<UrlQueue> = Arc::new(Mutex::new(VecDeque::new()));
    let results: Arc<ResultBuffer> = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();

    handles.push(tokio::spawn(supplier_loop(
        storage.clone(),
        queue.clone(),
        config.clone(),
        cancel.clone(),
    )));

    for id in 0..config.worker_batch_size {
        handles.push(tokio::spawn(worker_loop(
            id,
            fetch_pool.clone(),
            storage.clone(),
            queue.clone(),
            results.clone(),
            config.clone(),
            cancel.clone(),
        )));
    }

    handles.push(tokio::spawn(storage_manager_loop(
        storage.clone(),
        results.clone(),
        config.clone(),
        cancel.clone(),
    )));

    for handle in handles {
        if let Err(err) = handle.await {
            error!("crawler task panicked: {err}");
        }
    }

    Ok(())
}

async fn supplier_loop(
    storage: Arc<Storage>,
    queue: Arc<UrlQueue>,
    config: CrawlerConfig,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        let needs_more = {
            let q = queue.lock().await;
            q.len() < config.worker_batch_size
        };

        if needs_more {
            match storage.acquire_crawl_batch(config.worker_batch_size as i64).await {
                Ok(batch) if !batch.is_empty() => {
                    let mut q = queue.lock().await;
                    for (url, _existing_content) in batch {
                        if q.len() >= config.worker_batch_size {
                            // Queue is bounded: drop the tail of this batch,
                            // it will be re-acquired next generation.
                            break;
                        }
                        q.push_back(url);
                    }
                    drop(q);
                    sleep_or_cancel(config.url_check_interval, &cancel).await;
                }
                Ok(_) => sleep_or_cancel(config.no_urls_sleep_interval, &cancel).await,
                Err(err) => {
                    warn!("failed to acquire crawl batch: {err}");
                    sleep_or_cancel(config.no_urls_sleep_interval, &cancel).await;
                }
            }
        } else {
            sleep_or_cancel(config.url_check_interval, &cancel).await;
        }
    }
}

async fn worker_loop(
    id: usize,
    fetch_pool: Arc<FetchPool>,
    storage: Arc<Storage>,
    queue: Arc<UrlQueue>,
    results: Arc<ResultBuffer>,
    config: CrawlerConfig,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        let url = {
            let mut q = queue.lock().await;
            q.pop_front()
        };

        let Some(url) = url else {
            sleep_or_cancel(Duration::from_millis(200), &cancel).await;
            continue;
        };

        match fetch_one(&fetch_pool, &url, &config).await {
            Ok(result) => {
                let should_flush = {
                    let mut buf = results.lock().await;
                    buf.push(result);
                    buf.len() >= config.worker_batch_size
                };
                if should_flush {
                    flush(&storage, &results, &config.allowed_url_prefix).await;
                }
            }
            Err(err) => {
                warn!(worker = id, url, "fetch failed: {err}");
            }
        }
    }
}

async fn fetch_one(
    fetch_pool: &FetchPool,
    url: &str,
    config: &CrawlerConfig,
) -> anyhow::Result<CrawlResult> {
    let selector = config.main_content_selector.as_deref();
    let main = fetch_pool.fetch(url, selector).await?;

    let (links, is_404) = if config.dual_crawl_enabled {
        let full = fetch_pool.fetch(url, None).await?;
        (full.links.internal, full.not_found)
    } else {
        (main.links.internal, main.not_found)
    };

    Ok(CrawlResult {
        url: url.to_string(),
        content: main.text,
        links,
        is_404,
    })
}

async fn storage_manager_loop(
    storage: Arc<Storage>,
    results: Arc<ResultBuffer>,
    config: CrawlerConfig,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        sleep_or_cancel(config.storage_check_interval, &cancel).await;
        let is_empty = results.lock().await.is_empty();
        if !is_empty {
            flush(&storage, &results, &config.allowed_url_prefix).await;
        }
    }
    // Final flush on cancellation so in-flight work is not silently lost.
    if !results.lock().await.is_empty() {
        flush(&storage, &results, &config.allowed_url_prefix).await;
    }
}

/// Copy and clear the result buffer inside the lock, then operate on the
/// copy outside of it.
async fn flush(storage: &Storage, results: &ResultBuffer, allowed_prefix: &str) {
    let batch = {
        let mut buf = results.lock().await;
        std::mem::take(&mut *buf)
    };
    if batch.is_empty() {
        return;
    }

    let mut valid = Vec::new();
    let mut not_found = Vec::new();
    let mut discovered = Vec::new();

    for result in batch {
        if result.is_404 {
            not_found.push(result.url);
        } else {
            discovered.extend(result.links);
            valid.push((result.url, result.content));
        }
    }

    let flushed = valid.len();

    if let Err(err) = storage.update_pages_batch(&valid).await {
        error!("failed to flush {flushed} crawled page(s): {err}");
        return;
    }

    if !not_found.is_empty() {
        if let Err(err) = storage.delete_pages_batch(&not_found).await {
            error!("failed to delete {} 404 page(s): {err}", not_found.len());
        }
    }

    let new_links: Vec<String> = discovered
        .into_iter()
        .filter_map(|link| canonicalize_url(&link))
        .filter(|link| link.starts_with(allowed_prefix))
        .collect();

    if !new_links.is_empty() {
        match storage.insert_urls_batch(&new_links).await {
            Ok(inserted) => debug!(inserted, discovered = new_links.len(), "enqueued new links"),
            Err(err) => error!("failed to insert discovered links: {err}"),
        }
    }

    info!(flushed, not_found = not_found.len(), "crawler flush complete");
}

async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = cancel.cancelled() => {}
    }
}
