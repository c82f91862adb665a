//! Shared per-SKU stock cache.
//!
//! Holds the last result, last-updated time and in-progress flag for every
//! catalog SKU. Each entry is updated atomically on its own; there is no
//! cross-SKU consistency, so a reader mid-batch sees a mix of old and new
//! entries.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Local};

use crate::catalog::Catalog;
use crate::models::{format_timestamp, StockResult, StockSnapshot};

#[derive(Debug, Default, Clone)]
struct SkuState {
    result: Option<StockResult>,
    updated_at: Option<DateTime<Local>>,
    checking: bool,
}

/// Cache keyed by SKU display name.
#[derive(Debug, Default)]
pub struct StockCache {
    entries: RwLock<HashMap<String, SkuState>>,
}

impl StockCache {
    /// Create a cache with an empty entry for every catalog SKU.
    pub fn new(catalog: &Catalog) -> Self {
        let entries = catalog
            .iter()
            .map(|sku| (sku.name.clone(), SkuState::default()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Latest result per SKU; SKUs never refreshed are absent.
    pub fn results(&self) -> BTreeMap<String, StockResult> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter_map(|(name, s)| s.result.clone().map(|r| (name.clone(), r)))
            .collect()
    }

    pub fn updated_times(&self) -> BTreeMap<String, Option<DateTime<Local>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .map(|(name, s)| (name.clone(), s.updated_at))
            .collect()
    }

    pub fn checking_flags(&self) -> BTreeMap<String, bool> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .map(|(name, s)| (name.clone(), s.checking))
            .collect()
    }

    /// Everything `GET /api/stock` needs, read under a single lock.
    pub fn snapshot(&self) -> StockSnapshot {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = StockSnapshot::default();
        for (name, state) in entries.iter() {
            if let Some(result) = &state.result {
                snapshot.stock.insert(name.clone(), result.clone());
            }
            snapshot
                .last_updated
                .insert(name.clone(), state.updated_at.as_ref().map(format_timestamp));
            snapshot.checking_status.insert(name.clone(), state.checking);
        }
        snapshot
    }

    pub fn is_checking(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).map(|s| s.checking).unwrap_or(false)
    }

    /// Number of SKUs with a refresh in flight.
    pub fn checking_count(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|s| s.checking).count()
    }

    /// Claim the in-progress flag for `name`.
    ///
    /// Returns `None` if a refresh of that SKU is already running or the SKU
    /// is unknown. The flag is released when the guard drops.
    pub fn try_begin(self: &Arc<Self>, name: &str) -> Option<CheckingGuard> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let state = entries.get_mut(name)?;
        if state.checking {
            return None;
        }
        state.checking = true;
        Some(CheckingGuard {
            cache: Arc::clone(self),
            name: name.to_string(),
        })
    }

    /// Replace the stored result for `name`.
    pub(crate) fn put(&self, name: &str, result: StockResult, at: DateTime<Local>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = entries.get_mut(name) {
            state.result = Some(result);
            state.updated_at = Some(at);
        }
    }

    fn finish(&self, name: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = entries.get_mut(name) {
            state.checking = false;
        }
    }
}

/// Holds a SKU's in-progress flag; clears it on drop, including on unwind.
#[derive(Debug)]
pub struct CheckingGuard {
    cache: Arc<StockCache>,
    name: String,
}

impl Drop for CheckingGuard {
    fn drop(&mut self) {
        self.cache.finish(&self.name);
    }
}
