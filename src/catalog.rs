//! Product catalog: the fixed set of SKUs that get polled.
//!
//! Entries are grouped by series, color and capacity for the page. The
//! catalog never changes after startup; iteration order is definition order.

use serde::{Deserialize, Serialize};

/// A single purchasable product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuEntry {
    /// Display name, also the key in the stock cache.
    pub name: String,
    /// Manufacturer part code sent upstream.
    pub code: String,
    pub series: String,
    pub color: String,
    pub capacity: String,
}

impl SkuEntry {
    pub fn new(series: &str, capacity: &str, color: &str, code: &str) -> Self {
        Self {
            name: format!("{} {} - {}", series, capacity, color),
            code: code.to_string(),
            series: series.to_string(),
            color: color.to_string(),
            capacity: capacity.to_string(),
        }
    }
}

/// Built-in catalog rows: (series, capacity, color, part code).
const DEFAULT_SKUS: &[(&str, &str, &str, &str)] = &[
    ("iPhone 17 Pro Max", "256GB", "Cosmic Orange", "MFYN4ZA/A"),
    ("iPhone 17 Pro Max", "512GB", "Cosmic Orange", "MFYT4ZA/A"),
    ("iPhone 17 Pro Max", "1TB", "Cosmic Orange", "MFYW4ZA/A"),
    ("iPhone 17 Pro Max", "2TB", "Cosmic Orange", "MG004ZA/A"),
    ("iPhone 17 Pro Max", "256GB", "Deep Blue", "MFYP4ZA/A"),
    ("iPhone 17 Pro Max", "512GB", "Deep Blue", "MFYU4ZA/A"),
    ("iPhone 17 Pro Max", "1TB", "Deep Blue", "MFYX4ZA/A"),
    ("iPhone 17 Pro Max", "2TB", "Deep Blue", "MG014ZA/A"),
    ("iPhone 17 Pro Max", "256GB", "Silver", "MFYM4ZA/A"),
    ("iPhone 17 Pro Max", "512GB", "Silver", "MFYQ4ZA/A"),
    ("iPhone 17 Pro Max", "1TB", "Silver", "MFYV4ZA/A"),
    ("iPhone 17 Pro Max", "2TB", "Silver", "MFYY4ZA/A"),
    ("iPhone 17 Pro", "256GB", "Cosmic Orange", "MG8H4ZA/A"),
    ("iPhone 17 Pro", "512GB", "Cosmic Orange", "MG8M4ZA/A"),
    ("iPhone 17 Pro", "1TB", "Cosmic Orange", "MG8Q4ZA/A"),
    ("iPhone 17 Pro", "256GB", "Deep Blue", "MG8J4ZA/A"),
    ("iPhone 17 Pro", "512GB", "Deep Blue", "MG8N4ZA/A"),
    ("iPhone 17 Pro", "1TB", "Deep Blue", "MG8R4ZA/A"),
    ("iPhone 17 Pro", "256GB", "Silver", "MG8G4ZA/A"),
    ("iPhone 17 Pro", "512GB", "Silver", "MG8K4ZA/A"),
    ("iPhone 17 Pro", "1TB", "Silver", "MG8P4ZA/A"),
];

/// Immutable lookup table of SKUs.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<SkuEntry>,
}

impl Catalog {
    /// Build a catalog from entries, dropping repeated names (first wins).
    pub fn new(entries: Vec<SkuEntry>) -> Self {
        let mut unique: Vec<SkuEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if unique.iter().any(|e| e.name == entry.name) {
                tracing::warn!(sku = %entry.name, "Duplicate catalog entry ignored");
                continue;
            }
            unique.push(entry);
        }
        Self { entries: unique }
    }

    pub fn builtin() -> Self {
        Self::new(
            DEFAULT_SKUS
                .iter()
                .map(|(series, capacity, color, code)| {
                    SkuEntry::new(series, capacity, color, code)
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[SkuEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkuEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a SKU by display name or part code, ignoring ASCII case.
    ///
    /// An exact name match wins over a case-insensitive one.
    pub fn find(&self, key: &str) -> Option<&SkuEntry> {
        let key = key.trim();
        self.entries
            .iter()
            .find(|e| e.name == key)
            .or_else(|| self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(key)))
            .or_else(|| self.entries.iter().find(|e| e.code.eq_ignore_ascii_case(key)))
    }

    /// Series names in first-seen order.
    pub fn series(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in &self.entries {
            if !out.contains(&e.series.as_str()) {
                out.push(&e.series);
            }
        }
        out
    }

    /// Colors offered for a series, in first-seen order.
    pub fn colors(&self, series: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in self.entries.iter().filter(|e| e.series == series) {
            if !out.contains(&e.color.as_str()) {
                out.push(&e.color);
            }
        }
        out
    }

    /// Entries of one series and color, in catalog order.
    pub fn variants(&self, series: &str, color: &str) -> Vec<&SkuEntry> {
        self.entries
            .iter()
            .filter(|e| e.series == series && e.color == color)
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
