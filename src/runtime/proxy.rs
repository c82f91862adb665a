//! Outbound proxy pool.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ValidationError;

const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Ordered, de-duplicated list of proxy URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyPool {
    proxies: Vec<String>,
}

impl ProxyPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from a list, validating every entry and dropping repeats.
    pub fn from_list<I, S>(proxies: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pool = Self::new();
        for proxy in proxies {
            pool.add(proxy.as_ref())?;
        }
        Ok(pool)
    }

    /// Add a proxy. Returns false if it was already present.
    pub fn add(&mut self, proxy: &str) -> Result<bool, ValidationError> {
        let proxy = validate_proxy(proxy)?;
        if self.proxies.contains(&proxy) {
            return Ok(false);
        }
        self.proxies.push(proxy);
        Ok(true)
    }

    /// Remove a proxy. Returns false if it was not present.
    pub fn remove(&mut self, proxy: &str) -> bool {
        let proxy = proxy.trim();
        let before = self.proxies.len();
        self.proxies.retain(|p| p != proxy);
        self.proxies.len() != before
    }

    pub fn clear(&mut self) {
        self.proxies.clear();
    }

    /// Replace the whole list. On error the pool is left untouched.
    pub fn replace<I, S>(&mut self, proxies: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        *self = Self::from_list(proxies)?;
        Ok(())
    }

    pub fn pick_random(&self) -> Option<&str> {
        self.proxies
            .choose(&mut rand::thread_rng())
            .map(|p| p.as_str())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.proxies
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

fn validate_proxy(proxy: &str) -> Result<String, ValidationError> {
    let proxy = proxy.trim();
    if proxy.is_empty() {
        return Err(ValidationError::new("proxies", "proxy URL must not be empty"));
    }

    let url = Url::parse(proxy).map_err(|e| {
        ValidationError::new("proxies", format!("invalid proxy URL '{}': {}", proxy, e))
    })?;
    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(ValidationError::new(
            "proxies",
            format!(
                "unsupported proxy scheme '{}' (expected one of {})",
                url.scheme(),
                PROXY_SCHEMES.join(", ")
            ),
        ));
    }
    if url.host_str().is_none() {
        return Err(ValidationError::new(
            "proxies",
            format!("proxy URL '{}' has no host", proxy),
        ));
    }

    Ok(proxy.to_string())
}
