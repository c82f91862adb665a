//! Stock results as stored in the cache and served by the API.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::upstream::UpstreamError;

/// Display format for last-updated timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Pickup availability of one SKU at one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAvailability {
    pub store: String,
    pub status: String,
    pub available: bool,
}

/// Outcome of the most recent refresh of a SKU.
///
/// Serialized untagged: a store list on success, `{"error": "..."}` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StockResult {
    Stores(Vec<StoreAvailability>),
    Failed { error: String },
}

impl StockResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Number of stores reporting the SKU as available.
    pub fn available_count(&self) -> usize {
        match self {
            Self::Stores(stores) => stores.iter().filter(|s| s.available).count(),
            Self::Failed { .. } => 0,
        }
    }
}

impl From<Result<Vec<StoreAvailability>, UpstreamError>> for StockResult {
    fn from(result: Result<Vec<StoreAvailability>, UpstreamError>) -> Self {
        match result {
            Ok(stores) => Self::Stores(stores),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Point-in-time view of the cache, shaped for `GET /api/stock`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StockSnapshot {
    pub stock: BTreeMap<String, StockResult>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: BTreeMap<String, Option<String>>,
    #[serde(rename = "checkingStatus")]
    pub checking_status: BTreeMap<String, bool>,
}
