//! Runtime configuration: parameters that can change while the poller runs.
//!
//! Every field has its own bound and is validated on its own. An update that
//! carries several fields commits the valid ones and reports the rest.

mod proxy;

pub use proxy::ProxyPool;

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const REFRESH_INTERVAL_MIN: f64 = 5.0;
pub const REFRESH_INTERVAL_MAX: f64 = 3600.0;
pub const REQUEST_DELAY_MIN: f64 = 0.0;
pub const REQUEST_DELAY_MAX: f64 = 60.0;
pub const BATCH_SIZE_MIN: usize = 1;
pub const BATCH_SIZE_MAX: usize = 20;

/// A rejected configuration field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Current runtime parameters. Intervals are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub refresh_interval: f64,
    pub request_delay: f64,
    pub batch_size: usize,
    pub proxy_enabled: bool,
    pub proxies: ProxyPool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            refresh_interval: 60.0,
            request_delay: 1.0,
            batch_size: 5,
            proxy_enabled: false,
            proxies: ProxyPool::new(),
        }
    }
}

impl RuntimeConfig {
    /// Check every bound; used for startup values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_refresh_interval(self.refresh_interval)?;
        check_request_delay(self.request_delay)?;
        check_batch_size(self.batch_size as u64)?;
        ProxyPool::from_list(self.proxies.as_slice())?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(self.refresh_interval)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.request_delay)
    }

    /// Proxy for the next request, or `None` when disabled or empty.
    pub fn pick_proxy(&self) -> Option<String> {
        if !self.proxy_enabled {
            return None;
        }
        self.proxies.pick_random().map(|p| p.to_string())
    }

    pub fn proxy_status(&self) -> ProxyStatus {
        ProxyStatus {
            enabled: self.proxy_enabled,
            proxy_count: self.proxies.len(),
            proxies: self.proxies.as_slice().to_vec(),
        }
    }
}

/// Body of `GET /api/proxy/status`.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyStatus {
    pub enabled: bool,
    pub proxy_count: usize,
    pub proxies: Vec<String>,
}

/// Outcome of a partial update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    /// Configuration after the update.
    pub config: RuntimeConfig,
    pub applied: Vec<String>,
    /// Rejected field -> reason.
    pub rejected: BTreeMap<String, String>,
}

impl UpdateReport {
    pub fn is_ok(&self) -> bool {
        self.rejected.is_empty()
    }

    /// All rejection reasons joined into one message.
    pub fn error_message(&self) -> Option<String> {
        if self.rejected.is_empty() {
            return None;
        }
        Some(
            self.rejected
                .iter()
                .map(|(field, reason)| format!("{}: {}", field, reason))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Shared, lock-protected runtime configuration.
#[derive(Debug, Default)]
pub struct RuntimeConfigStore {
    inner: RwLock<RuntimeConfig>,
}

impl RuntimeConfigStore {
    pub fn new(initial: RuntimeConfig) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub fn snapshot(&self) -> RuntimeConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply a partial update given as a JSON object.
    ///
    /// Unknown keys are ignored. Each recognized key is validated and, if
    /// valid, committed on its own.
    pub fn apply(&self, update: &Map<String, Value>) -> UpdateReport {
        let mut applied = Vec::new();
        let mut rejected = BTreeMap::new();

        for (key, value) in update {
            let result = match key.as_str() {
                "refresh_interval" => parse_refresh_interval(value)
                    .map(|v| self.write(|cfg| cfg.refresh_interval = v)),
                "request_delay" => {
                    parse_request_delay(value).map(|v| self.write(|cfg| cfg.request_delay = v))
                }
                "batch_size" => {
                    parse_batch_size(value).map(|v| self.write(|cfg| cfg.batch_size = v))
                }
                "proxy_enabled" => {
                    parse_bool(key, value).map(|v| self.write(|cfg| cfg.proxy_enabled = v))
                }
                "proxies" => parse_proxies(value).map(|v| self.write(|cfg| cfg.proxies = v)),
                _ => continue,
            };

            match result {
                Ok(()) => applied.push(key.clone()),
                Err(e) => {
                    warn!(field = %e.field, reason = %e.reason, "Config update rejected");
                    rejected.insert(e.field, e.reason);
                }
            }
        }

        if !applied.is_empty() {
            info!(fields = ?applied, "Runtime config updated");
        }

        UpdateReport {
            config: self.snapshot(),
            applied,
            rejected,
        }
    }

    pub fn set_proxy_enabled(&self, enabled: bool) {
        self.write(|cfg| cfg.proxy_enabled = enabled);
    }

    pub fn add_proxy(&self, proxy: &str) -> Result<bool, ValidationError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.proxies.add(proxy)
    }

    pub fn remove_proxy(&self, proxy: &str) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.proxies.remove(proxy)
    }

    fn write<F: FnOnce(&mut RuntimeConfig)>(&self, f: F) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

fn check_refresh_interval(v: f64) -> Result<f64, ValidationError> {
    if (REFRESH_INTERVAL_MIN..=REFRESH_INTERVAL_MAX).contains(&v) {
        Ok(v)
    } else {
        Err(ValidationError::new(
            "refresh_interval",
            format!(
                "must be between {} and {} seconds, got {}",
                REFRESH_INTERVAL_MIN, REFRESH_INTERVAL_MAX, v
            ),
        ))
    }
}

fn check_request_delay(v: f64) -> Result<f64, ValidationError> {
    if (REQUEST_DELAY_MIN..=REQUEST_DELAY_MAX).contains(&v) {
        Ok(v)
    } else {
        Err(ValidationError::new(
            "request_delay",
            format!(
                "must be between {} and {} seconds, got {}",
                REQUEST_DELAY_MIN, REQUEST_DELAY_MAX, v
            ),
        ))
    }
}

fn check_batch_size(v: u64) -> Result<usize, ValidationError> {
    if (BATCH_SIZE_MIN as u64..=BATCH_SIZE_MAX as u64).contains(&v) {
        Ok(v as usize)
    } else {
        Err(ValidationError::new(
            "batch_size",
            format!(
                "must be between {} and {}, got {}",
                BATCH_SIZE_MIN, BATCH_SIZE_MAX, v
            ),
        ))
    }
}

fn parse_number(field: &str, value: &Value) -> Result<f64, ValidationError> {
    value
        .as_f64()
        .ok_or_else(|| ValidationError::new(field, format!("expected a number, got {}", value)))
}

fn parse_refresh_interval(value: &Value) -> Result<f64, ValidationError> {
    check_refresh_interval(parse_number("refresh_interval", value)?)
}

fn parse_request_delay(value: &Value) -> Result<f64, ValidationError> {
    check_request_delay(parse_number("request_delay", value)?)
}

fn parse_batch_size(value: &Value) -> Result<usize, ValidationError> {
    let n = value.as_u64().ok_or_else(|| {
        ValidationError::new(
            "batch_size",
            format!("expected a positive integer, got {}", value),
        )
    })?;
    check_batch_size(n)
}

fn parse_bool(field: &str, value: &Value) -> Result<bool, ValidationError> {
    value
        .as_bool()
        .ok_or_else(|| ValidationError::new(field, format!("expected a boolean, got {}", value)))
}

fn parse_proxies(value: &Value) -> Result<ProxyPool, ValidationError> {
    let items = value.as_array().ok_or_else(|| {
        ValidationError::new("proxies", format!("expected a list of strings, got {}", value))
    })?;
    let mut proxies = Vec::with_capacity(items.len());
    for item in items {
        let proxy = item.as_str().ok_or_else(|| {
            ValidationError::new("proxies", format!("expected a string, got {}", item))
        })?;
        proxies.push(proxy);
    }
    ProxyPool::from_list(proxies)
}
