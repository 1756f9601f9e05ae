//! REST client for the ERP.
//!
//! - Catalog: `GET {base}/products`
//! - Stock: `GET {base}/stock?location={id}`
//! - Prices: `GET {base}/prices?tier={n}`
//!
//! Every endpoint answers with a JSON array of rows, optionally wrapped in a
//! `{"data": [...]}` envelope. Ids and numbers may arrive as JSON numbers or
//! strings.

use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use inventory_sync_catalog_models::{
    Attribute, PriceSnapshot, ProductId, ProductRecord, QuantitySnapshot,
};
use inventory_sync_config::ErpSettings;
use rust_decimal::Decimal;

use crate::{ErpError, ErpSource, StaticToken, TokenProvider, http};

/// Per-request timeout for ERP listings.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// [`ErpSource`] backed by the ERP's REST API.
pub struct ErpClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ErpClient {
    /// Creates a client for `base_url` authenticating through `tokens`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Creates a client from environment-derived settings using the static
    /// token they carry.
    #[must_use]
    pub fn from_settings(client: reqwest::Client, settings: &ErpSettings) -> Self {
        Self::new(
            client,
            &settings.base_url,
            Arc::new(StaticToken::new(settings.token.clone())),
        )
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, ErpError> {
        let token = self.tokens.valid_token().await?;
        let url = format!("{}/{path}", self.base_url);
        log::debug!("ERP GET {url} {query:?}");
        http::send_json(
            self.client
                .get(&url)
                .query(query)
                .bearer_auth(&token.0)
                .timeout(REQUEST_TIMEOUT),
        )
        .await
    }
}

#[async_trait]
impl ErpSource for ErpClient {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ErpError> {
        let body = self.get("products", &[]).await?;
        parse_products(&body)
    }

    async fn list_quantities(&self, location_id: &str) -> Result<QuantitySnapshot, ErpError> {
        let body = self
            .get("stock", &[("location", location_id.to_string())])
            .await?;
        parse_quantities(&body, location_id)
    }

    async fn list_prices(&self, tier: u32) -> Result<PriceSnapshot, ErpError> {
        let body = self.get("prices", &[("tier", tier.to_string())]).await?;
        parse_prices(&body, tier)
    }
}

/// Returns the row array of a listing, unwrapping a `data` envelope.
fn rows(body: &serde_json::Value) -> Result<&Vec<serde_json::Value>, ErpError> {
    body.as_array()
        .or_else(|| body["data"].as_array())
        .ok_or_else(|| ErpError::Parse {
            message: "expected a JSON array of rows".to_string(),
        })
}

/// Reads a scalar as a string. Numbers keep their JSON spelling.
fn scalar_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

/// Reads a scalar as an exact decimal.
///
/// JSON numbers are parsed from their textual form so `19.99` stays
/// `19.99` instead of passing through binary floating point.
fn scalar_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn parse_products(body: &serde_json::Value) -> Result<Vec<ProductRecord>, ErpError> {
    let mut products = Vec::new();

    for row in rows(body)? {
        let id = scalar_string(&row["id"]).ok_or_else(|| ErpError::Parse {
            message: format!("product row without id: {row}"),
        })?;
        let sku = row["sku"].as_str().map(str::trim).unwrap_or_default();
        if sku.is_empty() {
            log::warn!("Skipping ERP product {id}: empty SKU");
            continue;
        }

        let attributes = row["attributes"]
            .as_array()
            .map(|attrs| {
                attrs
                    .iter()
                    .filter_map(|attr| {
                        let key = attr["key"].as_str()?;
                        let value = scalar_string(&attr["value"]).unwrap_or_default();
                        Some(Attribute::new(key, value))
                    })
                    .collect()
            })
            .unwrap_or_default();

        products.push(ProductRecord {
            id: ProductId(id),
            sku: sku.to_string(),
            attributes,
        });
    }

    Ok(products)
}

fn parse_quantities(
    body: &serde_json::Value,
    location_id: &str,
) -> Result<QuantitySnapshot, ErpError> {
    let mut snapshot = QuantitySnapshot::new();

    for row in rows(body)? {
        // Some ERPs ignore the location filter; drop foreign rows here.
        if scalar_string(&row["locationId"]).is_some_and(|location| location != location_id) {
            continue;
        }
        let Some(id) = scalar_string(&row["productId"]) else {
            log::warn!("Skipping stock row without productId: {row}");
            continue;
        };
        let Some(units) = scalar_decimal(&row["quantity"]) else {
            log::warn!("Skipping stock row for {id}: unreadable quantity");
            continue;
        };
        if !snapshot.insert(ProductId(id.clone()), units) {
            log::debug!("Duplicate stock row for {id} at location {location_id}; keeping first");
        }
    }

    Ok(snapshot)
}

fn parse_prices(body: &serde_json::Value, tier: u32) -> Result<PriceSnapshot, ErpError> {
    let mut snapshot = PriceSnapshot::new();
    let tier = tier.to_string();

    for row in rows(body)? {
        if scalar_string(&row["tier"]).is_some_and(|row_tier| row_tier != tier) {
            continue;
        }
        let Some(id) = scalar_string(&row["productId"]) else {
            log::warn!("Skipping price row without productId: {row}");
            continue;
        };
        let Some(amount) = scalar_decimal(&row["price"]) else {
            log::warn!("Skipping price row for {id}: unreadable price");
            continue;
        };
        snapshot.insert(ProductId(id), amount);
    }

    Ok(snapshot)
}
