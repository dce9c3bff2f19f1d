//! Streamline Processor: Content Supplier, Linear Processor, and Storage
//! Manager cooperating over a content buffer and a result buffer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chunker::chunk_text;
use crate::embedding::{embed_with_bisection, EmbeddingProvider};
use crate::storage::{ChunkRow, Storage};

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub content_fetch_size: usize,
    pub storage_threshold: usize,
    pub min_chunk_length: usize,
    pub buffer_check_interval: Duration,
    pub no_content_sleep_interval: Duration,
    pub bisection_max_depth: u32,
}

struct ProcessResult {
    url: String,
    chunks: Vec<ChunkRow>,
}

type ContentBuffer = Mutex<VecDeque<(String, String)>>;
type ResultBuffer = Mutex<Vec<ProcessResult>>;

/// Run the Streamline Processor until `cancel` fires.
pub async fn run(
    storage: Arc<Storage>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: ProcessorConfig,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let content: Arc<ContentBuffer> = Arc::new(Mutex::new(VecDeque::new()));
    let results: Arc<ResultBuffer> = Arc::new(Mutex::new(Vec::new()));

    let supplier = tokio::spawn(content_supplier_loop(
        storage.clone(),
        content.clone(),
        config.clone(),
        cancel.clone(),
    ));

    let linear = tokio::spawn(linear_processor_loop(
        embedder,
        content.clone(),
        results.clone(),
        config.clone(),
        cancel.clone(),
    ));

    let manager = tokio::spawn(storage_manager_loop(
        storage.clone(),
        results.clone(),
        config.clone(),
        cancel.clone(),
    ));

    for handle in [supplier, linear, manager] {
        if let Err(err) = handle.await {
            error!("processor task panicked: {err}");
        }
    }

    Ok(())
}

async fn content_supplier_loop(
    storage: Arc<Storage>,
    content: Arc<ContentBuffer>,
    config: ProcessorConfig,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        let needs_more = {
            let buf = content.lock().await;
            buf.len() < config.content_fetch_size / 2
        };

        if needs_more {
            match storage.acquire_process_batch(config.content_fetch_size as i64).await {
                Ok(batch) if !batch.is_empty() => {
                    let mut buf = content.lock().await;
                    buf.extend(batch);
                }
                Ok(_) => sleep_or_cancel(config.no_content_sleep_interval, &cancel).await,
                Err(err) => {
                    warn!("failed to acquire process batch: {err}");
                    sleep_or_cancel(config.no_content_sleep_interval, &cancel).await;
                }
            }
        } else {
            sleep_or_cancel(config.buffer_check_interval, &cancel).await;
        }
    }
}

async fn linear_processor_loop(
    embedder: Arc<dyn EmbeddingProvider>,
    content: Arc<ContentBuffer>,
    results: Arc<ResultBuffer>,
    config: ProcessorConfig,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        let next = {
            let mut buf = content.lock().await;
            buf.pop_front()
        };

        let Some((url, page_content)) = next else {
            sleep_or_cancel(config.buffer_check_interval, &cancel).await;
            continue;
        };

        let texts: Vec<String> = chunk_text(&page_content)
            .into_iter()
            .map(|c| c.content)
            .filter(|c| c.len() >= config.min_chunk_length)
            .collect();

        if texts.is_empty() {
            continue;
        }

        let embeddings = embed_with_bisection(embedder.as_ref(), &texts, config.bisection_max_depth).await;

        let chunks: Vec<ChunkRow> = texts
            .into_iter()
            .zip(embeddings)
            .filter_map(|(content, embedding)| {
                embedding.map(|vector| ChunkRow { content, embedding: Some(vector) })
            })
            .collect();

        if chunks.is_empty() {
            warn!(url, "every chunk for this page failed to embed, skipping");
            continue;
        }

        results.lock().await.push(ProcessResult { url, chunks });
    }
}

async fn storage_manager_loop(
    storage: Arc<Storage>,
    results: Arc<ResultBuffer>,
    config: ProcessorConfig,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        sleep_or_cancel(config.buffer_check_interval, &cancel).await;
        let len = results.lock().await.len();
        if len >= config.storage_threshold {
            flush(&storage, &results).await;
        }
    }
    if !results.lock().await.is_empty() {
        flush(&storage, &results).await;
    }
}

async fn flush(storage: &Storage, results: &ResultBuffer) {
    let batch = {
        let mut buf = results.lock().await;
        std::mem::take(&mut *buf)
    };
    if batch.is_empty() {
        return;
    }

    let mut processed_urls = Vec::with_capacity(batch.len());
    for result in &batch {
        if let Err(err) = storage.replace_chunks(&result.url, &result.chunks).await {
            error!(url = %result.url, "failed to replace chunks: {err}");
            continue;
        }
        processed_urls.push(result.url.clone());
    }

    if !processed_urls.is_empty() {
        if let Err(err) = storage.mark_processed(&processed_urls).await {
            error!("failed to mark {} page(s) processed: {err}", processed_urls.len());
            return;
        }
    }

    info!(flushed = processed_urls.len(), "processor flush complete");
}

async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = cancel.cancelled() => {}
    }
}
