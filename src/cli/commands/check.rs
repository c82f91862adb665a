//! One-shot availability check.

use console::style;

use crate::config::Settings;

/// Fetch one SKU through the configured client and print per-store status.
pub async fn cmd_check(settings: &Settings, key: &str) -> anyhow::Result<()> {
    let scheduler = super::build_scheduler(settings)?;
    let Some(sku) = scheduler.catalog().find(key).cloned() else {
        anyhow::bail!("Unknown model: {} (run `stockwatch catalog` to list models)", key);
    };

    println!(
        "{} Checking {} ({})",
        style("→").cyan(),
        style(&sku.name).bold(),
        sku.code
    );

    let stores = scheduler.refresher().fetch_once(&sku).await?;
    if stores.is_empty() {
        println!("  {} No stores returned", style("!").yellow());
        return Ok(());
    }

    for store in &stores {
        let mark = if store.available {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("  {} {:<24} {}", mark, store.store, style(&store.status).dim());
    }

    let available = stores.iter().filter(|s| s.available).count();
    println!(
        "{} Available at {} of {} stores",
        style("→").cyan(),
        available,
        stores.len()
    );
    Ok(())
}
