//! Data models for stock polling.

mod stock;

pub use stock::{format_timestamp, StockResult, StockSnapshot, StoreAvailability};
