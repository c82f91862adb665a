//! Static asset constants (CSS and JavaScript).

/// Stylesheet for the dashboard.
pub const CSS: &str = include_str!("styles.css");

/// Polling and control script for the dashboard.
pub const JS: &str = include_str!("dashboard.js");
