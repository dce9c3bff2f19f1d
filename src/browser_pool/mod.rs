//! Fixed-size pre-warmed Chrome browser pool.
//!
//! Maintains exactly `pool_size` Chrome instances for the lifetime of the
//! process. Unlike a demand-scaled pool, sessions are never grown or shrunk:
//! a session is either handed out, returned healthy, or evicted and
//! immediately relaunched so the pool always holds `pool_size` members.

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the fixed-size browser pool
#[derive(Debug, Clone)]
pub struct BrowserPoolConfig {
    /// Number of browser sessions kept alive at all times
    pub pool_size: usize,
    /// Interval between keepalive/health-check pings (default: 30s)
    pub keepalive_interval: Duration,
    /// Run browsers in headless mode (default: true)
    pub headless: bool,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            keepalive_interval: Duration::from_secs(30),
            headless: true,
        }
    }
}

// =============================================================================
// Browser Wrapper (Pool-specific)
// =============================================================================

/// RAII wrapper for a pooled browser instance.
///
/// The browser is stored in an `Arc` to allow sharing across concurrent tasks
/// while the guard manages the lifecycle.
#[derive(Debug)]
pub struct PooledBrowserWrapper {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl PooledBrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser: Arc::new(browser),
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    /// Get reference to inner browser
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Get Arc-wrapped browser for sharing across concurrent tasks
    pub fn browser_arc(&self) -> Arc<Browser> {
        Arc::clone(&self.browser)
    }

    /// Get mutable reference to inner browser (only works if no other Arc refs exist)
    pub fn browser_mut(&mut self) -> Option<&mut Browser> {
        Arc::get_mut(&mut self.browser)
    }

    /// Clean up temp directory (blocking operation)
    pub fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            info!("Cleaning up pool browser temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up temp directory {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for PooledBrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        if self.user_data_dir.is_some() {
            self.cleanup_temp_dir();
        }
    }
}

// =============================================================================
// Pooled Browser Instance
// =============================================================================

/// A browser instance with pool metadata
#[derive(Debug)]
pub struct PooledBrowser {
    /// Unique identifier for this browser instance
    pub id: u64,
    /// The wrapped browser with handler
    pub wrapper: PooledBrowserWrapper,
    /// When this browser was launched
    pub created_at: Instant,
    /// Last time this browser was used (acquired or returned)
    pub last_used: Instant,
    /// Last successful health check
    pub last_health_check: Instant,
}

impl PooledBrowser {
    fn new(id: u64, wrapper: PooledBrowserWrapper) -> Self {
        let now = Instant::now();
        Self {
            id,
            wrapper,
            created_at: now,
            last_used: now,
            last_health_check: now,
        }
    }
}

// =============================================================================
// Browser Pool
// =============================================================================

/// Fixed-size pre-warmed browser pool.
#[derive(Debug)]
pub struct BrowserPool {
    config: BrowserPoolConfig,
    /// Available (ready) browsers
    available: Arc<Mutex<VecDeque<PooledBrowser>>>,
    /// Count of browsers currently checked out
    in_use_count: AtomicUsize,
    /// Counter for unique browser IDs
    next_id: AtomicU64,
    /// Background health-check task handle
    keepalive_handle: Mutex<Option<JoinHandle<()>>>,
    /// Shutdown signal
    shutdown: AtomicBool,
}

impl BrowserPool {
    /// Create a new browser pool (does NOT start background tasks)
    pub fn new(config: BrowserPoolConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            available: Arc::new(Mutex::new(VecDeque::new())),
            in_use_count: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
            keepalive_handle: Mutex::new(None),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Start the pool: launch exactly `pool_size` sessions and start the
    /// background keepalive loop.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        info!("Starting browser pool with config: {:?}", self.config);

        let futs: Vec<_> = (0..self.config.pool_size)
            .map(|_| self.launch_browser_internal())
            .collect();
        let results = futures::future::join_all(futs).await;

        let mut available = self.available.lock().await;
        for result in results {
            match result {
                Ok(browser) => available.push_back(browser),
                Err(e) => warn!("Failed to launch browser for pool: {}", e),
            }
        }
        let launched = available.len();
        drop(available);

        let pool_clone = Arc::clone(self);
        let keepalive = tokio::spawn(async move {
            keepalive_loop(pool_clone).await;
        });
        *self.keepalive_handle.lock().await = Some(keepalive);

        info!("Browser pool started with {} of {} sessions", launched, self.config.pool_size);
        Ok(())
    }

    /// Acquire a session from the pool, blocking briefly if none are
    /// currently available (all checked out).
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledBrowserGuard> {
        loop {
            let mut available = self.available.lock().await;

            if let Some(mut browser) = available.pop_front() {
                browser.last_used = Instant::now();
                self.in_use_count.fetch_add(1, Ordering::Relaxed);
                debug!("Acquired browser {} from pool", browser.id);

                return Ok(PooledBrowserGuard {
                    browser: Some(browser),
                    pool: Arc::clone(self),
                });
            }

            drop(available);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Return a healthy session to the pool.
    fn release(&self, mut browser: PooledBrowser) {
        self.in_use_count.fetch_sub(1, Ordering::Relaxed);
        browser.last_used = Instant::now();

        let available = Arc::clone(&self.available);
        let id = browser.id;

        tokio::spawn(async move {
            available.lock().await.push_back(browser);
            debug!("Released browser {} back to pool", id);
        });
    }

    /// Evict a broken session and relaunch a fresh one to keep the pool at
    /// `pool_size`. Used on permanent fetch errors.
    pub async fn evict_and_replace(self: &Arc<Self>, broken: PooledBrowser) {
        self.in_use_count.fetch_sub(1, Ordering::Relaxed);
        warn!("Evicting broken browser {}", broken.id);
        drop(broken);

        match self.launch_browser_internal().await {
            Ok(fresh) => {
                self.available.lock().await.push_back(fresh);
            }
            Err(e) => {
                warn!("Failed to relaunch browser after eviction: {}", e);
            }
        }
    }

    /// Gracefully shut down the pool, closing every session.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down browser pool");
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(handle) = self.keepalive_handle.lock().await.take() {
            handle.abort();
        }

        let mut available = self.available.lock().await;
        while let Some(mut browser) = available.pop_front() {
            if let Some(b) = browser.wrapper.browser_mut() {
                if let Err(e) = b.close().await {
                    warn!("Failed to close browser {}: {}", browser.id, e);
                }
                let _ = b.wait().await;
            } else {
                warn!("Browser {} has outstanding references, skipping graceful close", browser.id);
            }
            browser.wrapper.cleanup_temp_dir();
        }

        info!("Browser pool shutdown complete");
        Ok(())
    }

    /// Launch a new browser instance using [`browser_setup::launch_browser`].
    async fn launch_browser_internal(&self) -> Result<PooledBrowser> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let profile = crate::browser_profile::create_unique_profile_with_prefix("docs_ingest_pool")
            .context("Failed to create unique pool browser profile")?;
        let user_data_dir = profile.into_path();

        let (browser, handler, _returned_dir) =
            crate::browser_setup::launch_browser(self.config.headless, Some(user_data_dir.clone()))
                .await
                .context("Failed to launch browser for pool")?;

        let wrapper = PooledBrowserWrapper::new(browser, handler, user_data_dir);
        Ok(PooledBrowser::new(id, wrapper))
    }
}

// =============================================================================
// RAII Guard
// =============================================================================

/// RAII guard that returns a session to the pool on drop.
pub struct PooledBrowserGuard {
    browser: Option<PooledBrowser>,
    pool: Arc<BrowserPool>,
}

impl PooledBrowserGuard {
    /// Get reference to the underlying Browser
    pub fn browser(&self) -> &Browser {
        self.browser.as_ref().expect("browser should be present").wrapper.browser()
    }

    /// Get Arc-wrapped browser for sharing across concurrent tasks
    pub fn browser_arc(&self) -> Arc<Browser> {
        self.browser.as_ref().expect("browser should be present").wrapper.browser_arc()
    }

    /// Get the browser's unique pool ID
    pub fn id(&self) -> u64 {
        self.browser.as_ref().expect("browser should be present").id
    }

    /// Consume the guard without returning the session to the pool, handing
    /// ownership to the caller so it can be evicted via
    /// [`BrowserPool::evict_and_replace`].
    pub fn take_for_eviction(mut self) -> PooledBrowser {
        self.browser.take().expect("browser should be present")
    }
}

impl Drop for PooledBrowserGuard {
    fn drop(&mut self) {
        if let Some(browser) = self.browser.take() {
            self.pool.release(browser);
        }
    }
}

// =============================================================================
// Background Tasks
// =============================================================================

/// Background task: periodic health check, evicting and relaunching dead
/// sessions so the pool stays at `pool_size`.
async fn keepalive_loop(pool: Arc<BrowserPool>) {
    let mut interval = tokio::time::interval(pool.config.keepalive_interval);

    while !pool.shutdown.load(Ordering::Relaxed) {
        interval.tick().await;

        let mut available = pool.available.lock().await;
        let mut healthy = VecDeque::new();
        let mut dead = 0usize;

        while let Some(mut browser) = available.pop_front() {
            match browser.wrapper.browser().version().await {
                Ok(_) => {
                    browser.last_health_check = Instant::now();
                    healthy.push_back(browser);
                }
                Err(e) => {
                    warn!("Browser {} failed keepalive health check: {}", browser.id, e);
                    dead += 1;
                }
            }
        }
        *available = healthy;
        drop(available);

        for _ in 0..dead {
            match pool.launch_browser_internal().await {
                Ok(fresh) => pool.available.lock().await.push_back(fresh),
                Err(e) => warn!("Failed to relaunch dead pool session: {}", e),
            }
        }

        debug!(
            "Keepalive complete: {} healthy sessions in pool",
            pool.available.lock().await.len()
        );
    }

    debug!("Keepalive loop exiting");
}
