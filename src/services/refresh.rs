//! Per-SKU refresh: claim the SKU, fetch with retries, store the result.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::catalog::SkuEntry;
use crate::models::{StockResult, StoreAvailability};
use crate::rate_limit::{jittered_backoff, RateGate};
use crate::runtime::RuntimeConfigStore;
use crate::upstream::{random_user_agent, request_headers, AvailabilityClient, UpstreamError};

use super::cache::StockCache;

/// How failed or empty lookups are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_secs(1),
            backoff_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base: Duration::ZERO,
            backoff_jitter: Duration::ZERO,
        }
    }

    pub fn backoff(&self) -> Duration {
        jittered_backoff(self.backoff_base, self.backoff_jitter)
    }
}

/// What a call to [`Refresher::refresh_one`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Another refresh of the same SKU was already in flight.
    Skipped,
    /// The result was stored after `attempts` upstream calls.
    Completed { result: StockResult, attempts: u32 },
}

impl RefreshOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/// Refreshes single SKUs against the upstream client.
///
/// Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Refresher {
    client: Arc<dyn AvailabilityClient>,
    gate: Arc<RateGate>,
    cache: Arc<StockCache>,
    runtime: Arc<RuntimeConfigStore>,
    retry: RetryPolicy,
}

impl Refresher {
    pub fn new(
        client: Arc<dyn AvailabilityClient>,
        cache: Arc<StockCache>,
        runtime: Arc<RuntimeConfigStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            gate: Arc::new(RateGate::new()),
            cache,
            runtime,
            retry,
        }
    }

    pub fn cache(&self) -> &Arc<StockCache> {
        &self.cache
    }

    pub fn runtime(&self) -> &Arc<RuntimeConfigStore> {
        &self.runtime
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// One throttled upstream call using the current runtime config.
    ///
    /// Does not touch the cache.
    pub async fn fetch_once(&self, sku: &SkuEntry) -> Result<Vec<StoreAvailability>, UpstreamError> {
        let config = self.runtime.snapshot();
        self.gate.throttle(config.request_delay()).await;

        let proxy = config.pick_proxy();
        let user_agent = random_user_agent();
        debug!(
            sku = %sku.name,
            code = %sku.code,
            proxy = proxy.as_deref().unwrap_or("direct"),
            "Fetching availability"
        );

        self.client
            .fetch_availability(&sku.code, request_headers(user_agent), proxy.as_deref())
            .await
    }

    /// Refresh one SKU and store the outcome.
    ///
    /// Returns [`RefreshOutcome::Skipped`] without any upstream call when the
    /// SKU is already being refreshed. With `allow_retry`, an error or an
    /// empty store list is retried up to the policy's limit.
    pub async fn refresh_one(&self, sku: &SkuEntry, allow_retry: bool) -> RefreshOutcome {
        let Some(_guard) = self.cache.try_begin(&sku.name) else {
            debug!(sku = %sku.name, "Refresh already in progress, skipping");
            return RefreshOutcome::Skipped;
        };

        let max_attempts = if allow_retry {
            self.retry.max_retries + 1
        } else {
            1
        };

        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            let result = self.fetch_once(sku).await;

            let needs_retry = match &result {
                Err(_) => true,
                Ok(stores) => stores.is_empty(),
            };
            if !needs_retry || attempts >= max_attempts {
                break result;
            }

            let wait = self.retry.backoff();
            match &result {
                Err(e) => warn!(
                    sku = %sku.name,
                    attempt = attempts,
                    error = %e,
                    "Lookup failed, retrying in {:.1}s",
                    wait.as_secs_f64()
                ),
                Ok(_) => warn!(
                    sku = %sku.name,
                    attempt = attempts,
                    "No stores returned, retrying in {:.1}s",
                    wait.as_secs_f64()
                ),
            }
            tokio::time::sleep(wait).await;
        };

        let result = StockResult::from(result);
        match &result {
            StockResult::Stores(stores) => info!(
                sku = %sku.name,
                stores = stores.len(),
                available = result.available_count(),
                attempts,
                "Stock refreshed"
            ),
            StockResult::Failed { error } => warn!(
                sku = %sku.name,
                attempts,
                error = %error,
                "Stock refresh failed"
            ),
        }

        self.cache.put(&sku.name, result.clone(), Local::now());
        RefreshOutcome::Completed { result, attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::runtime::{ProxyPool, RuntimeConfig};
    use crate::services::testing::{store, PanickingClient, ScriptedClient};
    use serde_json::json;

    fn sku() -> SkuEntry {
        SkuEntry::new("Phone", "128GB", "Black", "A1")
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            backoff_base: Duration::from_millis(5),
            backoff_jitter: Duration::from_millis(5),
        }
    }

    fn no_delay() -> RuntimeConfig {
        RuntimeConfig {
            request_delay: 0.0,
            ..RuntimeConfig::default()
        }
    }

    fn refresher(client: Arc<dyn AvailabilityClient>, config: RuntimeConfig) -> Refresher {
        let catalog = Catalog::new(vec![sku()]);
        Refresher::new(
            client,
            Arc::new(StockCache::new(&catalog)),
            Arc::new(RuntimeConfigStore::new(config)),
            fast_retry(),
        )
    }

    #[tokio::test]
    async fn test_success_is_stored_with_timestamp() {
        let client = Arc::new(ScriptedClient::in_stock());
        let refresher = refresher(client.clone(), no_delay());

        let outcome = refresher.refresh_one(&sku(), true).await;
        let RefreshOutcome::Completed { result, attempts } = outcome else {
            panic!("expected completed refresh");
        };
        assert_eq!(attempts, 1);
        assert_eq!(result.available_count(), 1);

        let snapshot = refresher.cache().snapshot();
        assert_eq!(snapshot.stock.get(&sku().name), Some(&result));
        assert!(snapshot.last_updated[&sku().name].is_some());
        assert!(!snapshot.checking_status[&sku().name]);

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].code, "A1");
        assert!(calls[0].user_agent.is_some());
    }

    #[tokio::test]
    async fn test_retries_on_error_then_succeeds() {
        let client = Arc::new(
            ScriptedClient::in_stock()
                .then(Err(UpstreamError::Http(503)))
                .then(Ok(vec![])),
        );
        let refresher = refresher(client.clone(), no_delay());

        let outcome = refresher.refresh_one(&sku(), true).await;
        match outcome {
            RefreshOutcome::Completed { result, attempts } => {
                assert_eq!(attempts, 3);
                assert!(!result.is_error());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let client = Arc::new(ScriptedClient::always(Err(UpstreamError::NoInventoryData(
            "A1".to_string(),
        ))));
        let refresher = refresher(client.clone(), no_delay());

        let outcome = refresher.refresh_one(&sku(), true).await;
        assert!(matches!(
            outcome,
            RefreshOutcome::Completed { attempts: 3, .. }
        ));
        assert_eq!(client.calls().len(), 3);

        let results = refresher.cache().results();
        let stored = &results[&sku().name];
        assert!(stored.is_error());
        assert_eq!(
            serde_json::to_value(stored).unwrap(),
            json!({"error": "no inventory data returned for A1"})
        );
        assert!(refresher.cache().updated_times()[&sku().name].is_some());
    }

    #[tokio::test]
    async fn test_no_retry_when_disallowed() {
        let client = Arc::new(ScriptedClient::always(Err(UpstreamError::Http(500))));
        let refresher = refresher(client.clone(), no_delay());

        let outcome = refresher.refresh_one(&sku(), false).await;
        assert!(matches!(
            outcome,
            RefreshOutcome::Completed { attempts: 1, .. }
        ));
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_list_is_stored_after_retries() {
        let client = Arc::new(ScriptedClient::always(Ok(vec![])));
        let refresher = refresher(client.clone(), no_delay());

        refresher.refresh_one(&sku(), true).await;
        assert_eq!(client.calls().len(), 3);
        assert_eq!(
            refresher.cache().results()[&sku().name],
            StockResult::Stores(vec![])
        );
    }

    #[tokio::test]
    async fn test_skips_while_already_checking() {
        let client = Arc::new(ScriptedClient::in_stock());
        let refresher = refresher(client.clone(), no_delay());

        let guard = refresher.cache().try_begin(&sku().name).unwrap();
        let outcome = refresher.refresh_one(&sku(), true).await;
        assert!(outcome.is_skipped());
        assert!(client.calls().is_empty());
        assert!(refresher.cache().results().is_empty());

        drop(guard);
        assert!(!refresher.refresh_one(&sku(), true).await.is_skipped());
    }

    #[tokio::test]
    async fn test_flag_set_only_while_in_flight() {
        let client =
            Arc::new(ScriptedClient::in_stock().with_latency(Duration::from_millis(200)));
        let refresher = refresher(client, no_delay());

        let task = {
            let refresher = refresher.clone();
            tokio::spawn(async move { refresher.refresh_one(&sku(), false).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(refresher.cache().is_checking(&sku().name));
        assert!(refresher.refresh_one(&sku(), false).await.is_skipped());

        task.await.unwrap();
        assert!(!refresher.cache().is_checking(&sku().name));
    }

    #[tokio::test]
    async fn test_flag_cleared_when_client_panics() {
        let refresher = refresher(Arc::new(PanickingClient), no_delay());

        let task = {
            let refresher = refresher.clone();
            tokio::spawn(async move { refresher.refresh_one(&sku(), true).await })
        };
        assert!(task.await.unwrap_err().is_panic());
        assert!(!refresher.cache().is_checking(&sku().name));
    }

    #[tokio::test]
    async fn test_proxy_used_only_when_enabled() {
        let client = Arc::new(ScriptedClient::in_stock());
        let config = RuntimeConfig {
            request_delay: 0.0,
            proxy_enabled: true,
            proxies: ProxyPool::from_list(&["http://10.0.0.1:8080".to_string()]).unwrap(),
            ..RuntimeConfig::default()
        };
        let refresher = refresher(client.clone(), config);

        refresher.refresh_one(&sku(), false).await;
        refresher.runtime().set_proxy_enabled(false);
        refresher.refresh_one(&sku(), false).await;

        let calls = client.calls();
        assert_eq!(calls[0].proxy.as_deref(), Some("http://10.0.0.1:8080"));
        assert_eq!(calls[1].proxy, None);
    }

    #[tokio::test]
    async fn test_request_delay_spaces_calls() {
        let client = Arc::new(ScriptedClient::always(Ok(vec![store("Central", false)])));
        let config = RuntimeConfig {
            request_delay: 0.1,
            ..RuntimeConfig::default()
        };
        let refresher = refresher(client.clone(), config);

        let start = tokio::time::Instant::now();
        refresher.refresh_one(&sku(), false).await;
        refresher.refresh_one(&sku(), false).await;
        refresher.refresh_one(&sku(), false).await;
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(client.calls().len(), 3);
    }
}
