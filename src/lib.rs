//! stockwatch - store pickup availability poller.
//!
//! Polls a retail fulfillment endpoint for a fixed catalog of SKUs, keeps the
//! latest result per SKU in memory and serves it through a small web API and
//! dashboard page.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod models;
pub mod rate_limit;
pub mod runtime;
pub mod server;
pub mod services;
pub mod upstream;
