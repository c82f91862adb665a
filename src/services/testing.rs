//! In-process fakes shared by service and server tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, USER_AGENT};

use crate::models::StoreAvailability;
use crate::upstream::{AvailabilityClient, UpstreamError};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub code: String,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
}

/// Client that replays scripted responses, then a fallback forever.
pub(crate) struct ScriptedClient {
    script: Mutex<VecDeque<Result<Vec<StoreAvailability>, UpstreamError>>>,
    fallback: Result<Vec<StoreAvailability>, UpstreamError>,
    latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub fn always(result: Result<Vec<StoreAvailability>, UpstreamError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: result,
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn in_stock() -> Self {
        Self::always(Ok(vec![store("Causeway Bay", true)]))
    }

    pub fn then(self, result: Result<Vec<StoreAvailability>, UpstreamError>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub(crate) fn store(name: &str, available: bool) -> StoreAvailability {
    StoreAvailability {
        store: name.to_string(),
        status: if available { "Available today" } else { "Unavailable" }.to_string(),
        available,
    }
}

#[async_trait]
impl AvailabilityClient for ScriptedClient {
    async fn fetch_availability(
        &self,
        code: &str,
        headers: HeaderMap,
        proxy: Option<&str>,
    ) -> Result<Vec<StoreAvailability>, UpstreamError> {
        self.calls.lock().unwrap().push(RecordedCall {
            code: code.to_string(),
            proxy: proxy.map(|p| p.to_string()),
            user_agent: headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string()),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Client whose every call panics.
pub(crate) struct PanickingClient;

#[async_trait]
impl AvailabilityClient for PanickingClient {
    async fn fetch_availability(
        &self,
        _code: &str,
        _headers: HeaderMap,
        _proxy: Option<&str>,
    ) -> Result<Vec<StoreAvailability>, UpstreamError> {
        panic!("upstream client panicked");
    }
}
