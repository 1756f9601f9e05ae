#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Storefront side of the inventory sync.
//!
//! The [`Storefront`] trait is the narrow surface the reconciliation engine
//! needs: look up variants for a batch of SKUs, list locations, set one
//! inventory quantity, and set the prices of several variants of one
//! product in a single call. [`graphql::GraphqlStorefront`] implements it
//! against an admin GraphQL API.

pub mod graphql;

use async_trait::async_trait;
use inventory_sync_catalog_models::TargetVariant;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use graphql::GraphqlStorefront;

/// Errors from storefront calls.
#[derive(Debug, thiserror::Error)]
pub enum StorefrontError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The storefront answered with a non-success status.
    #[error("Storefront returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body preview.
        body: String,
    },

    /// The GraphQL response carried top-level errors.
    #[error("GraphQL error: {message}")]
    GraphQl {
        /// Joined error messages.
        message: String,
    },

    /// A mutation was rejected with user errors.
    #[error("Mutation rejected: {}", messages.join("; "))]
    UserErrors {
        /// One message per user error.
        messages: Vec<String>,
    },

    /// The response parsed but did not have the expected shape.
    #[error("Unexpected storefront payload: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },
}

/// A storefront stock location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Location id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the location currently stocks inventory.
    pub is_active: bool,
}

/// One variant price in a bulk price write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Variant id.
    pub variant_id: String,
    /// New price.
    pub price: Decimal,
}

/// Storefront operations used by the reconciliation engine.
///
/// Every method is a single request with no internal retry.
#[async_trait]
pub trait Storefront: Send + Sync {
    /// Returns variants whose SKU matches one of `skus`, with quantities at
    /// `location_id`.
    ///
    /// Implementations may return near matches (search backends often match
    /// prefixes); callers filter by exact SKU. Returned variants carry
    /// [`Channel::Unmapped`](inventory_sync_catalog_models::Channel::Unmapped)
    /// and keep the backend's order.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError`] on transport, auth, or payload failures.
    async fn variants_by_skus(
        &self,
        skus: &[String],
        location_id: &str,
    ) -> Result<Vec<TargetVariant>, StorefrontError>;

    /// Lists stock locations.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError`] on transport, auth, or payload failures.
    async fn list_locations(&self) -> Result<Vec<Location>, StorefrontError>;

    /// Sets available units of `inventory_item_id` at `location_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::UserErrors`] if the write is rejected, or
    /// another variant on transport failures.
    async fn set_quantity(
        &self,
        inventory_item_id: &str,
        quantity: i64,
        location_id: &str,
    ) -> Result<(), StorefrontError>;

    /// Sets the prices of several variants of `product_id` in one call.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::UserErrors`] if the write is rejected, or
    /// another variant on transport failures.
    async fn set_prices_bulk(
        &self,
        product_id: &str,
        prices: &[PriceUpdate],
    ) -> Result<(), StorefrontError>;
}
