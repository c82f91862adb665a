//! Polling services: the shared stock cache, per-SKU refresh and the batch
//! scheduler that drives them.

pub mod cache;
pub mod refresh;
pub mod scheduler;
#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CheckingGuard, StockCache};
pub use refresh::{RefreshOutcome, Refresher, RetryPolicy};
pub use scheduler::{BatchSummary, Scheduler, SkuNotFound};
