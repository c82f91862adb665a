//! Startup settings for stockwatch.
//!
//! Resolution order: built-in defaults, then a TOML file, then `STOCKWATCH_*`
//! environment variables. The `[runtime]` section only seeds the live
//! configuration; later changes go through the HTTP API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{Catalog, SkuEntry};
use crate::runtime::{ProxyPool, RuntimeConfig};
use crate::services::RetryPolicy;
use crate::upstream::{FulfillmentClient, DEFAULT_ENDPOINT, DEFAULT_LOCATION};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "stockwatch.toml";
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "STOCKWATCH_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    pub endpoint: String,
    /// Location string sent with every lookup.
    pub location: String,
    pub referer: Option<String>,
    pub timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            referer: Some("https://www.apple.com/hk/shop/buy-iphone".to_string()),
            timeout_secs: 10,
        }
    }
}

impl UpstreamSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn build_client(&self) -> anyhow::Result<FulfillmentClient> {
        FulfillmentClient::new(
            &self.endpoint,
            &self.location,
            self.referer.as_deref(),
            self.timeout(),
        )
        .context("failed to build upstream client")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            backoff_base_ms: policy.backoff_base.as_millis() as u64,
            backoff_jitter_ms: policy.backoff_jitter.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_jitter: Duration::from_millis(self.backoff_jitter_ms),
        }
    }
}

/// One `[[catalog]]` row. The display name is derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub series: String,
    pub capacity: String,
    pub color: String,
    pub code: String,
}

impl From<&CatalogEntry> for SkuEntry {
    fn from(entry: &CatalogEntry) -> Self {
        SkuEntry::new(&entry.series, &entry.capacity, &entry.color, &entry.code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Listen address: `PORT`, `HOST` or `HOST:PORT`.
    pub bind: String,
    pub upstream: UpstreamSettings,
    /// Initial runtime configuration.
    pub runtime: RuntimeConfig,
    pub retry: RetrySettings,
    /// Replaces the built-in catalog when non-empty.
    pub catalog: Vec<CatalogEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            upstream: UpstreamSettings::default(),
            runtime: RuntimeConfig::default(),
            retry: RetrySettings::default(),
            catalog: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (or `stockwatch.toml` if present) and the
    /// process environment, then validate.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path: Option<PathBuf> = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                fallback.is_file().then_some(fallback)
            }
        };

        let mut settings = match &path {
            Some(p) => {
                info!("Loading config from {}", p.display());
                Self::from_file(p)?
            }
            None => {
                debug!("No config file, using defaults");
                Self::default()
            }
        };

        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `STOCKWATCH_*` overrides read through `lookup`. Empty values
    /// are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(bind) = var("BIND") {
            self.bind = bind;
        }
        if let Some(endpoint) = var("ENDPOINT") {
            self.upstream.endpoint = endpoint;
        }
        if let Some(location) = var("LOCATION") {
            self.upstream.location = location;
        }
        if let Some(v) = var("TIMEOUT_SECS") {
            self.upstream.timeout_secs = parse_env("TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("REFRESH_INTERVAL") {
            self.runtime.refresh_interval = parse_env("REFRESH_INTERVAL", &v)?;
        }
        if let Some(v) = var("REQUEST_DELAY") {
            self.runtime.request_delay = parse_env("REQUEST_DELAY", &v)?;
        }
        if let Some(v) = var("BATCH_SIZE") {
            self.runtime.batch_size = parse_env("BATCH_SIZE", &v)?;
        }
        if let Some(v) = var("PROXY_ENABLED") {
            self.runtime.proxy_enabled = parse_bool_env(&v)
                .with_context(|| format!("{}PROXY_ENABLED: expected a boolean", ENV_PREFIX))?;
        }
        if let Some(v) = var("PROXIES") {
            self.runtime.proxies = ProxyPool::from_list(
                v.split(',').map(str::trim).filter(|p| !p.is_empty()),
            )
            .with_context(|| format!("invalid {}PROXIES", ENV_PREFIX))?;
        }
        Ok(())
    }

    /// Check the initial runtime values against live-update bounds.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.runtime
            .validate()
            .context("invalid [runtime] settings")?;
        if self.upstream.timeout_secs == 0 {
            anyhow::bail!("upstream.timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn build_catalog(&self) -> Catalog {
        if self.catalog.is_empty() {
            Catalog::builtin()
        } else {
            Catalog::new(self.catalog.iter().map(SkuEntry::from).collect())
        }
    }
}

fn parse_env<T>(name: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("{}{}={:?}: {}", ENV_PREFIX, name, value, e))
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
