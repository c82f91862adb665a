//! HTTP request handlers for the web server.

mod api;
mod config_api;
mod error;
mod pages;
mod static_files;

// Re-export handlers for use by the router
pub use api::{api_proxy_status, api_refresh_all, api_refresh_one, api_stock, health};
pub use config_api::{api_get_config, api_update_config};
pub use error::ApiError;
pub use pages::index;
pub use static_files::{serve_css, serve_js};
