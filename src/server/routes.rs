//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // Stock API
        .route("/api/stock", get(handlers::api_stock))
        .route("/api/refresh", post(handlers::api_refresh_all))
        .route("/api/refresh/:sku", post(handlers::api_refresh_one))
        // Runtime configuration
        .route(
            "/api/config",
            get(handlers::api_get_config).post(handlers::api_update_config),
        )
        .route("/api/proxy/status", get(handlers::api_proxy_status))
        // Static assets (CSS/JS)
        .route("/static/style.css", get(handlers::serve_css))
        .route("/static/dashboard.js", get(handlers::serve_js))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
