#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! ERP side of the inventory sync.
//!
//! The ERP is the source of truth. Each data provider implements the
//! [`ErpSource`] trait to list the catalog, stock per location, and prices
//! per tier. [`snapshot::load_snapshot`] combines the three listings into
//! the immutable [`SourceSnapshot`](inventory_sync_catalog_models::SourceSnapshot)
//! a chunk works from.

pub mod client;
pub mod http;
pub mod snapshot;

use async_trait::async_trait;
use inventory_sync_catalog_models::{PriceSnapshot, ProductRecord, QuantitySnapshot};

pub use client::ErpClient;

/// Failure to obtain a usable ERP token.
#[derive(Debug, Clone, thiserror::Error)]
#[error("ERP authentication failed: {message}")]
pub struct AuthError {
    /// Description of what went wrong.
    pub message: String,
}

/// Errors that can occur while talking to the ERP.
#[derive(Debug, thiserror::Error)]
pub enum ErpError {
    /// The ERP answered with a non-success status.
    #[error("ERP returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body preview.
        body: String,
    },

    /// No valid token could be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response parsed but did not have the expected shape.
    #[error("Unexpected ERP payload: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },
}

/// A bearer token for the ERP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(pub String);

/// Supplies a currently valid ERP token.
///
/// Token caching and refresh belong to implementations; the engine asks for
/// a token before every ERP call and never stores one itself.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token that is valid right now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if no valid token can be obtained.
    async fn valid_token(&self) -> Result<Token, AuthError>;
}

/// A token that never expires, e.g. a long-lived API key from the
/// environment.
#[derive(Debug, Clone)]
pub struct StaticToken(Token);

impl StaticToken {
    /// Wraps `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(Token(token.into()))
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn valid_token(&self) -> Result<Token, AuthError> {
        if self.0.0.is_empty() {
            return Err(AuthError {
                message: "static token is empty".to_string(),
            });
        }
        Ok(self.0.clone())
    }
}

/// Read access to the ERP's authoritative catalog, stock, and prices.
#[async_trait]
pub trait ErpSource: Send + Sync {
    /// Lists every product in the catalog, in ERP order.
    ///
    /// # Errors
    ///
    /// Returns [`ErpError`] if the listing cannot be fetched or parsed.
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ErpError>;

    /// Lists units on hand per product at `location_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ErpError`] if the listing cannot be fetched or parsed.
    async fn list_quantities(&self, location_id: &str) -> Result<QuantitySnapshot, ErpError>;

    /// Lists prices per product for price tier `tier`.
    ///
    /// # Errors
    ///
    /// Returns [`ErpError`] if the listing cannot be fetched or parsed.
    async fn list_prices(&self, tier: u32) -> Result<PriceSnapshot, ErpError>;
}
