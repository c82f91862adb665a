//! Askama template structs for the web interface.
//!
//! Each struct corresponds to an HTML template in the templates/ directory.

use askama::Template;

/// One purchasable variant within a color group.
pub struct VariantRow {
    pub name: String,
    pub capacity: String,
    pub code: String,
}

pub struct ColorGroup {
    pub name: String,
    pub variants: Vec<VariantRow>,
}

pub struct SeriesGroup {
    pub name: String,
    pub colors: Vec<ColorGroup>,
}

/// Stock dashboard.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub series: Vec<SeriesGroup>,
    pub sku_count: usize,
    pub refresh_interval: f64,
    pub request_delay: f64,
    pub batch_size: usize,
    pub proxy_enabled: bool,
    pub proxy_count: usize,
    /// Runtime config serialized for the page script.
    pub config_json: String,
}
