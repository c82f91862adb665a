//! reqwest-backed [`AvailabilityClient`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, Proxy};
use tracing::{debug, warn};
use url::Url;

use super::response::parse_availability;
use super::{AvailabilityClient, UpstreamError};
use crate::models::StoreAvailability;

pub const DEFAULT_ENDPOINT: &str = "https://www.apple.com/hk/shop/fulfillment-messages";
pub const DEFAULT_LOCATION: &str = "Hong Kong";

/// Client for the store-pickup fulfillment endpoint.
///
/// The direct client is built up front; one client per proxy URL is built
/// lazily and reused.
pub struct FulfillmentClient {
    endpoint: Url,
    location: String,
    referer: Option<String>,
    timeout: Duration,
    direct: Client,
    proxied: Mutex<HashMap<String, Client>>,
}

impl FulfillmentClient {
    pub fn new(
        endpoint: &str,
        location: &str,
        referer: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| UpstreamError::Client(format!("invalid endpoint {}: {}", endpoint, e)))?;
        let referer = referer.map(|r| r.to_string());
        let direct = build_client(timeout, referer.as_deref(), None)?;

        Ok(Self {
            endpoint,
            location: location.to_string(),
            referer,
            timeout,
            direct,
            proxied: Mutex::new(HashMap::new()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<Client, UpstreamError> {
        let Some(proxy) = proxy else {
            return Ok(self.direct.clone());
        };

        let mut clients = self
            .proxied
            .lock()
            .map_err(|_| UpstreamError::Client("proxy client cache poisoned".to_string()))?;
        if let Some(client) = clients.get(proxy) {
            return Ok(client.clone());
        }

        let client = build_client(self.timeout, self.referer.as_deref(), Some(proxy))?;
        clients.insert(proxy.to_string(), client.clone());
        Ok(client)
    }
}

fn build_client(
    timeout: Duration,
    referer: Option<&str>,
    proxy: Option<&str>,
) -> Result<Client, UpstreamError> {
    let mut default_headers = HeaderMap::new();
    if let Some(referer) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
        default_headers.insert(REFERER, referer);
    }

    let mut builder = Client::builder()
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .default_headers(default_headers);

    if let Some(proxy) = proxy {
        let proxy = Proxy::all(proxy)
            .map_err(|e| UpstreamError::Client(format!("invalid proxy {}: {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| UpstreamError::Client(e.to_string()))
}

#[async_trait]
impl AvailabilityClient for FulfillmentClient {
    async fn fetch_availability(
        &self,
        code: &str,
        headers: HeaderMap,
        proxy: Option<&str>,
    ) -> Result<Vec<StoreAvailability>, UpstreamError> {
        let client = self.client_for(proxy)?;

        let start = Instant::now();
        debug!(code, proxy = proxy.unwrap_or("direct"), "Fulfillment request start");

        let response = client
            .get(self.endpoint.clone())
            .query(&[("parts.0", code), ("location", self.location.as_str())])
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                warn!(code, error = %e, "Fulfillment request failed");
                UpstreamError::from_reqwest(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(code, status = status.as_u16(), "Fulfillment request rejected");
            return Err(UpstreamError::Http(status.as_u16()));
        }

        let body = response.bytes().await.map_err(UpstreamError::from_reqwest)?;
        debug!(
            code,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fulfillment response received"
        );

        parse_availability(&body, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::request_headers;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn fulfillment(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<serde_json::Value>) {
        let code = params.get("parts.0").cloned().unwrap_or_default();
        match code.as_str() {
            "EMPTY/A" => (
                StatusCode::OK,
                Json(json!({"body": {"content": {"pickupMessage": {"stores": []}}}})),
            ),
            "BROKEN/A" => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({}))),
            _ => {
                let location = params.get("location").cloned().unwrap_or_default();
                (
                    StatusCode::OK,
                    Json(json!({"body": {"content": {"pickupMessage": {"stores": [{
                        "storeName": location,
                        "partsAvailability": {code.clone(): {
                            "pickupSearchQuote": "Available today",
                            "pickupDisplay": "available"
                        }}
                    }]}}}})),
                )
            }
        }
    }

    async fn spawn_upstream() -> String {
        let app = Router::new().route("/fulfillment-messages", get(fulfillment));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/fulfillment-messages", addr)
    }

    #[tokio::test]
    async fn test_fetch_sends_code_and_location() {
        let endpoint = spawn_upstream().await;
        let client =
            FulfillmentClient::new(&endpoint, "Hong Kong", None, Duration::from_secs(5)).unwrap();

        let stores = client
            .fetch_availability("MG8G4ZA/A", request_headers("test-agent"), None)
            .await
            .unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].store, "Hong Kong");
        assert!(stores[0].available);
    }

    #[tokio::test]
    async fn test_fetch_maps_empty_and_http_errors() {
        let endpoint = spawn_upstream().await;
        let client =
            FulfillmentClient::new(&endpoint, "Hong Kong", None, Duration::from_secs(5)).unwrap();

        let empty = client
            .fetch_availability("EMPTY/A", request_headers("test-agent"), None)
            .await;
        assert_eq!(empty, Err(UpstreamError::NoInventoryData("EMPTY/A".to_string())));

        let broken = client
            .fetch_availability("BROKEN/A", request_headers("test-agent"), None)
            .await;
        assert_eq!(broken, Err(UpstreamError::Http(503)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = FulfillmentClient::new(
            &format!("http://{}/fulfillment-messages", addr),
            "Hong Kong",
            None,
            Duration::from_secs(2),
        )
        .unwrap();
        let result = client
            .fetch_availability("MG8G4ZA/A", request_headers("test-agent"), None)
            .await;
        assert!(matches!(result, Err(UpstreamError::Transport(_))));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = FulfillmentClient::new("not a url", "Hong Kong", None, Duration::from_secs(1));
        assert!(matches!(result, Err(UpstreamError::Client(_))));
    }

    #[tokio::test]
    async fn test_proxy_clients_are_reused() {
        let client = FulfillmentClient::new(
            DEFAULT_ENDPOINT,
            DEFAULT_LOCATION,
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        client.client_for(Some("http://127.0.0.1:8080")).unwrap();
        client.client_for(Some("http://127.0.0.1:8080")).unwrap();
        client.client_for(Some("socks5://127.0.0.1:1080")).unwrap();
        assert_eq!(client.proxied.lock().unwrap().len(), 2);
    }
}
