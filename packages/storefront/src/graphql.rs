//! Admin GraphQL client for the storefront.
//!
//! - Variant lookup: `productVariants(query: "sku:\"A\" OR sku:\"B\"")`
//! - Locations: `locations(first: 50)`
//! - Quantity write: `inventorySetQuantities`
//! - Bulk price write: `productVariantsBulkUpdate`
//!
//! The SKU search is fuzzy on the storefront side, so results may include
//! variants whose SKU only shares a prefix with a requested one.

use std::str::FromStr as _;
use std::time::Duration;

use async_trait::async_trait;
use inventory_sync_catalog_models::{Attribute, Channel, TargetVariant, body_preview};
use inventory_sync_config::StorefrontSettings;
use rust_decimal::Decimal;

use crate::{Location, PriceUpdate, Storefront, StorefrontError};

/// Page size of the variant search. Larger result sets are paged.
pub const MAX_VARIANTS_PER_QUERY: usize = 250;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const VARIANTS_QUERY: &str = r#"
query VariantsBySku($query: String!, $first: Int!, $after: String, $locationId: ID!) {
  productVariants(first: $first, after: $after, query: $query) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      sku
      price
      product { id }
      selectedOptions { name value }
      inventoryItem {
        id
        inventoryLevel(locationId: $locationId) {
          quantities(names: ["available"]) { name quantity }
        }
      }
    }
  }
}"#;

const LOCATIONS_QUERY: &str = r"
query Locations {
  locations(first: 50) {
    nodes { id name isActive }
  }
}";

const SET_QUANTITY_MUTATION: &str = r"
mutation SetQuantity($input: InventorySetQuantitiesInput!) {
  inventorySetQuantities(input: $input) {
    userErrors { field message }
  }
}";

const BULK_PRICE_MUTATION: &str = r"
mutation BulkPrices($productId: ID!, $variants: [ProductVariantsBulkInput!]!) {
  productVariantsBulkUpdate(productId: $productId, variants: $variants) {
    userErrors { field message }
  }
}";

/// [`Storefront`] backed by an admin GraphQL endpoint.
pub struct GraphqlStorefront {
    client: reqwest::Client,
    graphql_url: String,
    access_token: String,
}

impl GraphqlStorefront {
    /// Creates a client for `graphql_url` using `access_token`.
    #[must_use]
    pub fn new(client: reqwest::Client, graphql_url: &str, access_token: &str) -> Self {
        Self {
            client,
            graphql_url: graphql_url.to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Creates a client from environment-derived settings.
    #[must_use]
    pub fn from_settings(client: reqwest::Client, settings: &StorefrontSettings) -> Self {
        Self::new(client, &settings.graphql_url, &settings.access_token)
    }

    /// Posts one GraphQL document and returns its `data` object.
    async fn execute(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value, StorefrontError> {
        let response = self
            .client
            .post(&self.graphql_url)
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = body_preview(&text);
            log::error!("Storefront request failed\n  status: {status}\n  body: {body}");
            return Err(StorefrontError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = serde_json::from_str(&text)?;
        take_data(body)
    }
}

#[async_trait]
impl Storefront for GraphqlStorefront {
    async fn variants_by_skus(
        &self,
        skus: &[String],
        location_id: &str,
    ) -> Result<Vec<TargetVariant>, StorefrontError> {
        if skus.is_empty() {
            return Ok(Vec::new());
        }

        let search = sku_search(skus);
        let mut variants = Vec::new();
        let mut after: Option<String> = None;
        let mut pages = 0_usize;

        loop {
            let data = self
                .execute(
                    VARIANTS_QUERY,
                    serde_json::json!({
                        "query": search,
                        "first": MAX_VARIANTS_PER_QUERY,
                        "after": after,
                        "locationId": location_id,
                    }),
                )
                .await?;
            pages += 1;

            variants.extend(parse_variants(&data)?);

            match next_page(&data)? {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        if pages > 1 {
            log::debug!(
                "Variant lookup for {} SKUs took {pages} pages ({} variants)",
                skus.len(),
                variants.len()
            );
        }

        Ok(variants)
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StorefrontError> {
        let data = self.execute(LOCATIONS_QUERY, serde_json::json!({})).await?;
        parse_locations(&data)
    }

    async fn set_quantity(
        &self,
        inventory_item_id: &str,
        quantity: i64,
        location_id: &str,
    ) -> Result<(), StorefrontError> {
        let data = self
            .execute(
                SET_QUANTITY_MUTATION,
                serde_json::json!({
                    "input": {
                        "name": "available",
                        "reason": "correction",
                        "ignoreCompareQuantity": true,
                        "quantities": [{
                            "inventoryItemId": inventory_item_id,
                            "locationId": location_id,
                            "quantity": quantity,
                        }],
                    }
                }),
            )
            .await?;
        check_user_errors(&data["inventorySetQuantities"])
    }

    async fn set_prices_bulk(
        &self,
        product_id: &str,
        prices: &[PriceUpdate],
    ) -> Result<(), StorefrontError> {
        let variants: Vec<serde_json::Value> = prices
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.variant_id,
                    "price": p.price.to_string(),
                })
            })
            .collect();

        let data = self
            .execute(
                BULK_PRICE_MUTATION,
                serde_json::json!({ "productId": product_id, "variants": variants }),
            )
            .await?;
        check_user_errors(&data["productVariantsBulkUpdate"])
    }
}

/// Builds the search string `sku:"A" OR sku:"B"`.
fn sku_search(skus: &[String]) -> String {
    skus.iter()
        .map(|sku| format!("sku:\"{}\"", sku.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Extracts `data`, failing on top-level `errors`.
fn take_data(mut body: serde_json::Value) -> Result<serde_json::Value, StorefrontError> {
    if let Some(errors) = body["errors"].as_array().filter(|e| !e.is_empty()) {
        let message = errors
            .iter()
            .map(|e| e["message"].as_str().unwrap_or("unknown error"))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(StorefrontError::GraphQl { message });
    }

    match body.get_mut("data").map(serde_json::Value::take) {
        Some(data) if data.is_object() => Ok(data),
        _ => Err(StorefrontError::Parse {
            message: "response has no data object".to_string(),
        }),
    }
}

/// Fails if a mutation payload carries `userErrors`.
fn check_user_errors(payload: &serde_json::Value) -> Result<(), StorefrontError> {
    if payload.is_null() {
        return Err(StorefrontError::Parse {
            message: "mutation payload missing".to_string(),
        });
    }

    let messages: Vec<String> = payload["userErrors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|e| {
                    let message = e["message"].as_str().unwrap_or("unknown error");
                    match e["field"].as_array() {
                        Some(field) if !field.is_empty() => {
                            let path = field
                                .iter()
                                .filter_map(serde_json::Value::as_str)
                                .collect::<Vec<_>>()
                                .join(".");
                            format!("{path}: {message}")
                        }
                        _ => message.to_string(),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        Ok(())
    } else {
        Err(StorefrontError::UserErrors { messages })
    }
}

fn parse_variants(data: &serde_json::Value) -> Result<Vec<TargetVariant>, StorefrontError> {
    let nodes = data["productVariants"]["nodes"]
        .as_array()
        .ok_or_else(|| StorefrontError::Parse {
            message: "missing productVariants.nodes".to_string(),
        })?;

    let mut variants = Vec::with_capacity(nodes.len());

    for node in nodes {
        let (Some(id), Some(product_id), Some(item_id)) = (
            node["id"].as_str(),
            node["product"]["id"].as_str(),
            node["inventoryItem"]["id"].as_str(),
        ) else {
            log::warn!("Skipping variant with missing ids: {node}");
            continue;
        };

        let current_price = node["price"]
            .as_str()
            .and_then(|p| Decimal::from_str(p).ok())
            .unwrap_or(Decimal::ZERO);

        // No inventory level means the item is not stocked at the location.
        let current_quantity = node["inventoryItem"]["inventoryLevel"]["quantities"]
            .as_array()
            .and_then(|qs| qs.iter().find(|q| q["name"] == "available"))
            .and_then(|q| q["quantity"].as_i64())
            .unwrap_or(0);

        let options = node["selectedOptions"]
            .as_array()
            .map(|opts| {
                opts.iter()
                    .filter_map(|o| {
                        Some(Attribute::new(o["name"].as_str()?, o["value"].as_str()?))
                    })
                    .collect()
            })
            .unwrap_or_default();

        variants.push(TargetVariant {
            id: id.to_string(),
            sku: node["sku"].as_str().unwrap_or_default().to_string(),
            current_quantity,
            current_price,
            parent_product_id: product_id.to_string(),
            inventory_item_id: item_id.to_string(),
            options,
            channel: Channel::Unmapped,
        });
    }

    Ok(variants)
}

/// Cursor of the next variant page, if the search has one.
fn next_page(data: &serde_json::Value) -> Result<Option<String>, StorefrontError> {
    let page_info = &data["productVariants"]["pageInfo"];
    if page_info["hasNextPage"].as_bool() != Some(true) {
        return Ok(None);
    }

    page_info["endCursor"]
        .as_str()
        .map(|cursor| Some(cursor.to_string()))
        .ok_or_else(|| StorefrontError::Parse {
            message: "hasNextPage without endCursor".to_string(),
        })
}

fn parse_locations(data: &serde_json::Value) -> Result<Vec<Location>, StorefrontError> {
    let nodes = data["locations"]["nodes"]
        .as_array()
        .ok_or_else(|| StorefrontError::Parse {
            message: "missing locations.nodes".to_string(),
        })?;

    Ok(nodes
        .iter()
        .filter_map(|node| {
            Some(Location {
                id: node["id"].as_str()?.to_string(),
                name: node["name"].as_str().unwrap_or_default().to_string(),
                is_active: node["isActive"].as_bool().unwrap_or(true),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn builds_or_joined_sku_search() {
        let skus = vec!["ABC".to_string(), "D\"EF".to_string()];
        assert_eq!(sku_search(&skus), r#"sku:"ABC" OR sku:"D\"EF""#);
    }

    #[test]
    fn parses_variant_nodes() {
        let data = serde_json::json!({
            "productVariants": {
                "pageInfo": { "hasNextPage": false },
                "nodes": [
                    {
                        "id": "gid://shopify/ProductVariant/1",
                        "sku": "ABC",
                        "price": "19.99",
                        "product": { "id": "gid://shopify/Product/9" },
                        "selectedOptions": [{ "name": "Channel", "value": "B2C" }],
                        "inventoryItem": {
                            "id": "gid://shopify/InventoryItem/5",
                            "inventoryLevel": {
                                "quantities": [{ "name": "available", "quantity": 5 }]
                            }
                        }
                    },
                    {
                        "id": "gid://shopify/ProductVariant/2",
                        "sku": "ABC",
                        "price": "9.99",
                        "product": { "id": "gid://shopify/Product/9" },
                        "inventoryItem": {
                            "id": "gid://shopify/InventoryItem/6",
                            "inventoryLevel": null
                        }
                    },
                    { "id": "gid://shopify/ProductVariant/3", "sku": "X" }
                ]
            }
        });
        let variants = parse_variants(&data).unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].current_quantity, 5);
        assert_eq!(variants[0].current_price, dec!(19.99));
        assert_eq!(variants[0].options, vec![Attribute::new("Channel", "B2C")]);
        assert_eq!(variants[1].current_quantity, 0);
        assert_eq!(variants[1].parent_product_id, "gid://shopify/Product/9");
        assert!(variants.iter().all(|v| v.channel == Channel::Unmapped));
    }

    #[test]
    fn follows_end_cursor_until_last_page() {
        let more = serde_json::json!({
            "productVariants": {
                "pageInfo": { "hasNextPage": true, "endCursor": "eyJsYXN0X2lkIjo1fQ" },
                "nodes": []
            }
        });
        let last = serde_json::json!({
            "productVariants": {
                "pageInfo": { "hasNextPage": false, "endCursor": "eyJsYXN0X2lkIjo5fQ" },
                "nodes": []
            }
        });
        assert_eq!(next_page(&more).unwrap().as_deref(), Some("eyJsYXN0X2lkIjo1fQ"));
        assert_eq!(next_page(&last).unwrap(), None);
    }

    #[test]
    fn next_page_without_cursor_is_an_error() {
        let data = serde_json::json!({
            "productVariants": { "pageInfo": { "hasNextPage": true }, "nodes": [] }
        });
        assert!(matches!(next_page(&data), Err(StorefrontError::Parse { .. })));
    }

    #[test]
    fn top_level_errors_fail_the_call() {
        let body = serde_json::json!({
            "errors": [{ "message": "Throttled" }],
            "data": null
        });
        assert!(matches!(
            take_data(body),
            Err(StorefrontError::GraphQl { message }) if message == "Throttled"
        ));
    }

    #[test]
    fn user_errors_are_reported_with_field_path() {
        let payload = serde_json::json!({
            "userErrors": [{ "field": ["variants", "0", "price"], "message": "must be positive" }]
        });
        let Err(StorefrontError::UserErrors { messages }) = check_user_errors(&payload) else {
            panic!("expected user errors");
        };
        assert_eq!(messages, vec!["variants.0.price: must be positive"]);
    }

    #[test]
    fn empty_user_errors_succeed() {
        let payload = serde_json::json!({ "userErrors": [] });
        assert!(check_user_errors(&payload).is_ok());
        assert!(check_user_errors(&serde_json::Value::Null).is_err());
    }

    #[test]
    fn parses_locations() {
        let data = serde_json::json!({
            "locations": { "nodes": [
                { "id": "gid://shopify/Location/1", "name": "Warehouse", "isActive": true },
                { "id": "gid://shopify/Location/2", "name": "Old", "isActive": false }
            ]}
        });
        let locations = parse_locations(&data).unwrap();
        assert_eq!(locations.len(), 2);
        assert!(!locations[1].is_active);
    }
}
