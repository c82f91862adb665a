//! Web server: the stock dashboard page and its JSON API.
//!
//! Handlers only read the shared cache and runtime configuration, or hand
//! work to the scheduler; no request ever waits on an upstream call.

mod assets;
mod handlers;
mod routes;
mod template_structs;

pub use handlers::ApiError;
pub use routes::create_router;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::catalog::Catalog;
use crate::runtime::RuntimeConfigStore;
use crate::services::{Scheduler, StockCache};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub cache: Arc<StockCache>,
    pub runtime: Arc<RuntimeConfigStore>,
    pub scheduler: Scheduler,
}

impl AppState {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            catalog: Arc::clone(scheduler.catalog()),
            cache: Arc::clone(scheduler.refresher().cache()),
            runtime: Arc::clone(scheduler.refresher().runtime()),
            scheduler,
        }
    }
}

/// Bind a listener. `host` may be an IP address or a resolvable hostname.
pub async fn bind_listener(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))
}

/// Start the web server.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = bind_listener(host, port).await?;
    tracing::info!("Starting server at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
