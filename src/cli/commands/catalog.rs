//! Catalog listing.

use console::style;

use crate::config::Settings;

pub fn cmd_catalog(settings: &Settings) -> anyhow::Result<()> {
    let catalog = settings.build_catalog();

    for series in catalog.series() {
        println!("{}", style(series).bold());
        for color in catalog.colors(series) {
            println!("  {}", style(color).cyan());
            for sku in catalog.variants(series, color) {
                println!("    {:<8} {}", sku.capacity, style(&sku.code).dim());
            }
        }
    }
    println!("\n{} models", catalog.len());
    Ok(())
}
