//! Fulfillment response parsing.

use std::collections::HashMap;

use serde::Deserialize;

use super::UpstreamError;
use crate::models::StoreAvailability;

const AVAILABLE_DISPLAY: &str = "available";
const UNKNOWN_STATUS: &str = "Unknown status";

#[derive(Debug, Deserialize)]
struct FulfillmentResponse {
    #[serde(default)]
    body: Option<FulfillmentBody>,
}

#[derive(Debug, Deserialize)]
struct FulfillmentBody {
    #[serde(default)]
    content: Option<FulfillmentContent>,
}

#[derive(Debug, Deserialize)]
struct FulfillmentContent {
    #[serde(rename = "pickupMessage", default)]
    pickup_message: Option<PickupMessage>,
}

#[derive(Debug, Deserialize)]
struct PickupMessage {
    #[serde(default)]
    stores: Option<Vec<StoreEntry>>,
}

#[derive(Debug, Deserialize)]
struct StoreEntry {
    #[serde(rename = "storeName")]
    store_name: String,
    #[serde(rename = "partsAvailability", default)]
    parts_availability: Option<HashMap<String, PartAvailability>>,
}

#[derive(Debug, Deserialize)]
struct PartAvailability {
    #[serde(rename = "pickupSearchQuote", default)]
    pickup_search_quote: Option<String>,
    #[serde(rename = "pickupDisplay", default)]
    pickup_display: Option<String>,
}

/// Parse a fulfillment body into per-store availability for `code`.
///
/// Stores without an entry for `code` are skipped. A missing or empty store
/// list is [`UpstreamError::NoInventoryData`]; anything of the wrong shape is
/// [`UpstreamError::Format`].
pub fn parse_availability(
    body: &[u8],
    code: &str,
) -> Result<Vec<StoreAvailability>, UpstreamError> {
    let parsed: FulfillmentResponse =
        serde_json::from_slice(body).map_err(|e| UpstreamError::Format(e.to_string()))?;

    let stores = parsed
        .body
        .and_then(|b| b.content)
        .and_then(|c| c.pickup_message)
        .and_then(|p| p.stores)
        .unwrap_or_default();

    if stores.is_empty() {
        return Err(UpstreamError::NoInventoryData(code.to_string()));
    }

    Ok(stores
        .into_iter()
        .filter_map(|store| {
            let mut parts = store.parts_availability?;
            let part = parts.remove(code)?;
            Some(StoreAvailability {
                store: store.store_name,
                status: part
                    .pickup_search_quote
                    .unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
                available: part.pickup_display.as_deref() == Some(AVAILABLE_DISPLAY),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CODE: &str = "MG8G4ZA/A";

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_parse_available_and_unavailable_stores() {
        let data = body(json!({
            "body": {"content": {"pickupMessage": {"stores": [
                {
                    "storeName": "Causeway Bay",
                    "partsAvailability": {CODE: {
                        "pickupSearchQuote": "Available today",
                        "pickupDisplay": "available"
                    }}
                },
                {
                    "storeName": "Central",
                    "partsAvailability": {CODE: {
                        "pickupSearchQuote": "Currently unavailable",
                        "pickupDisplay": "unavailable"
                    }}
                }
            ]}}}
        }));

        let stores = parse_availability(&data, CODE).unwrap();
        assert_eq!(stores.len(), 2);
        assert_eq!(stores[0].store, "Causeway Bay");
        assert!(stores[0].available);
        assert_eq!(stores[1].status, "Currently unavailable");
        assert!(!stores[1].available);
    }

    #[test]
    fn test_store_without_part_entry_is_skipped() {
        let data = body(json!({
            "body": {"content": {"pickupMessage": {"stores": [
                {"storeName": "Festival Walk", "partsAvailability": {"OTHER/A": {}}},
                {"storeName": "IFC Mall"},
                {
                    "storeName": "Canton Road",
                    "partsAvailability": {CODE: {"pickupDisplay": "available"}}
                }
            ]}}}
        }));

        let stores = parse_availability(&data, CODE).unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].store, "Canton Road");
        assert_eq!(stores[0].status, UNKNOWN_STATUS);
        assert!(stores[0].available);
    }

    #[test]
    fn test_empty_or_missing_stores_is_no_inventory() {
        let empty = body(json!({"body": {"content": {"pickupMessage": {"stores": []}}}}));
        assert_eq!(
            parse_availability(&empty, CODE),
            Err(UpstreamError::NoInventoryData(CODE.to_string()))
        );

        let missing = body(json!({"body": {}}));
        assert_eq!(
            parse_availability(&missing, CODE),
            Err(UpstreamError::NoInventoryData(CODE.to_string()))
        );
    }

    #[test]
    fn test_malformed_shapes_are_format_errors() {
        let not_array = body(json!({"body": {"content": {"pickupMessage": {"stores": "x"}}}}));
        assert!(matches!(
            parse_availability(&not_array, CODE),
            Err(UpstreamError::Format(_))
        ));

        let no_name = body(json!({"body": {"content": {"pickupMessage": {"stores": [{}]}}}}));
        assert!(matches!(
            parse_availability(&no_name, CODE),
            Err(UpstreamError::Format(_))
        ));

        assert!(matches!(
            parse_availability(b"<html>blocked</html>", CODE),
            Err(UpstreamError::Format(_))
        ));
    }
}
