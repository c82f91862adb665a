//! Dashboard page handler.

use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse},
};

use super::super::template_structs::{ColorGroup, IndexTemplate, SeriesGroup, VariantRow};
use super::super::AppState;

/// Dashboard with the catalog grouped by series and color.
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = &state.catalog;
    let series = catalog
        .series()
        .into_iter()
        .map(|series| SeriesGroup {
            name: series.to_string(),
            colors: catalog
                .colors(series)
                .into_iter()
                .map(|color| ColorGroup {
                    name: color.to_string(),
                    variants: catalog
                        .variants(series, color)
                        .into_iter()
                        .map(|sku| VariantRow {
                            name: sku.name.clone(),
                            capacity: sku.capacity.clone(),
                            code: sku.code.clone(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    let config = state.runtime.snapshot();
    let config_json = serde_json::to_string(&config).unwrap_or_else(|_| "{}".to_string());

    let template = IndexTemplate {
        series,
        sku_count: catalog.len(),
        refresh_interval: config.refresh_interval,
        request_delay: config.request_delay,
        batch_size: config.batch_size,
        proxy_enabled: config.proxy_enabled,
        proxy_count: config.proxies.len(),
        config_json,
    };

    Html(
        template
            .render()
            .unwrap_or_else(|e| format!("Template error: {}", e)),
    )
}
