//! Batch scheduler: periodic and on-demand refresh of the whole catalog.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::catalog::{Catalog, SkuEntry};
use crate::rate_limit::jittered_interval;

use super::refresh::{RefreshOutcome, Refresher};

/// Manual refresh asked for a SKU the catalog does not have.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown SKU: {0}")]
pub struct SkuNotFound(pub String);

/// Counts from one pass over the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Refreshes that stored a store list.
    pub completed: usize,
    /// Refreshes that stored an error, or whose task died.
    pub failed: usize,
    /// SKUs already being refreshed elsewhere.
    pub skipped: usize,
    /// Another pass was running, so this one did nothing.
    pub already_running: bool,
    pub elapsed: Duration,
}

struct Inner {
    catalog: Arc<Catalog>,
    refresher: Refresher,
    batch_running: AtomicBool,
}

/// Marks a pass as running; cleared on drop, including when the pass is
/// cancelled.
struct BatchGuard<'a>(&'a AtomicBool);

impl<'a> BatchGuard<'a> {
    fn try_begin(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives [`Refresher`] across the catalog. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(catalog: Arc<Catalog>, refresher: Refresher) -> Self {
        Self {
            inner: Arc::new(Inner {
                catalog,
                refresher,
                batch_running: AtomicBool::new(false),
            }),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    pub fn refresher(&self) -> &Refresher {
        &self.inner.refresher
    }

    pub fn is_batch_running(&self) -> bool {
        self.inner.batch_running.load(Ordering::Acquire)
    }

    /// Refresh every SKU once, at most `batch_size` at a time.
    ///
    /// `batch_size` is read once at the start of the pass. Only one pass runs
    /// at a time; a call made while another is active returns at once with
    /// `already_running` set.
    pub async fn run_batch(&self) -> BatchSummary {
        let Some(_running) = BatchGuard::try_begin(&self.inner.batch_running) else {
            info!("Batch already in progress, skipping");
            return BatchSummary {
                already_running: true,
                ..BatchSummary::default()
            };
        };

        let started = Instant::now();
        let batch_size = self.inner.refresher.runtime().snapshot().batch_size.max(1);
        let catalog = &self.inner.catalog;

        info!(skus = catalog.len(), batch_size, "Starting stock refresh batch");

        let semaphore = Arc::new(Semaphore::new(batch_size));
        let mut handles: Vec<(String, JoinHandle<RefreshOutcome>)> =
            Vec::with_capacity(catalog.len());

        for sku in catalog.iter() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let refresher = self.inner.refresher.clone();
            let sku = sku.clone();
            let name = sku.name.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                refresher.refresh_one(&sku, true).await
            });
            handles.push((name, handle));
        }

        let mut summary = BatchSummary::default();
        for (name, handle) in handles {
            match handle.await {
                Ok(RefreshOutcome::Skipped) => summary.skipped += 1,
                Ok(RefreshOutcome::Completed { result, .. }) => {
                    if result.is_error() {
                        summary.failed += 1;
                    } else {
                        summary.completed += 1;
                    }
                }
                Err(e) => {
                    error!(sku = %name, "Refresh task failed: {}", e);
                    summary.failed += 1;
                }
            }
        }
        summary.elapsed = started.elapsed();

        info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Batch finished in {:.1}s",
            summary.elapsed.as_secs_f64()
        );
        summary
    }

    /// Run batches forever, sleeping a jittered `refresh_interval` between
    /// passes. The interval is re-read after every batch.
    pub async fn run_forever(&self) {
        loop {
            self.run_batch().await;

            let interval = self.inner.refresher.runtime().snapshot().refresh_interval();
            let wait = jittered_interval(interval);
            debug!("Next batch in {:.1}s", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }

    /// Start the background loop on its own task.
    pub fn spawn_background(&self) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run_forever().await })
    }

    /// Start a batch in the background and return immediately.
    pub fn trigger_batch(&self) -> JoinHandle<BatchSummary> {
        info!("Manual batch refresh requested");
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run_batch().await })
    }

    /// Start a single-SKU refresh (no retries) in the background.
    ///
    /// `key` is a display name or part code.
    pub fn trigger_one(&self, key: &str) -> Result<SkuEntry, SkuNotFound> {
        let sku = self
            .inner
            .catalog
            .find(key)
            .cloned()
            .ok_or_else(|| SkuNotFound(key.to_string()))?;

        info!(sku = %sku.name, "Manual refresh requested");
        let refresher = self.inner.refresher.clone();
        let task_sku = sku.clone();
        tokio::spawn(async move {
            refresher.refresh_one(&task_sku, false).await;
        });
        Ok(sku)
    }
}
