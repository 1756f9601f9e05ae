#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batched reconciliation engine.
//!
//! Brings storefront inventory quantities and prices in line with the ERP,
//! one externally-driven chunk at a time:
//!
//! 1. [`orchestrator::run_chunk`] validates the requested `offset`/`limit`
//!    and loads a fresh ERP snapshot.
//! 2. The requested slice of the catalog is split into sub-chunks; each
//!    sub-chunk's SKUs are resolved to storefront variants by
//!    [`locator::locate_batch`].
//! 3. Per product, [`visibility::resolve`] and [`delta::compute`] decide
//!    the target quantity and price of every channel variant.
//! 4. [`applier::apply`] issues quantity writes and one coalesced price
//!    write per storefront product.
//!
//! The engine never loops on its own. Callers drive consecutive chunks with
//! a [`cursor::ChunkCursor`] fed from each chunk's
//! [`SyncProgress`](inventory_sync_catalog_models::SyncProgress).

pub mod applier;
pub mod context;
pub mod cursor;
pub mod delta;
pub mod locator;
pub mod orchestrator;
pub mod progress;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testing;

use inventory_sync_erp::{AuthError, ErpError};
use inventory_sync_storefront::StorefrontError;

pub use context::SyncContext;
pub use cursor::ChunkCursor;
pub use orchestrator::{ChunkRequest, run_chunk};

/// Errors surfaced by the reconciliation engine.
///
/// Only [`SyncError::Validation`], [`SyncError::Upstream`],
/// [`SyncError::Auth`], [`SyncError::Erp`], [`SyncError::Storefront`] and
/// [`SyncError::NoLocation`] abort a chunk. [`SyncError::Write`] is
/// recorded against a single product and never escapes a chunk.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The chunk request was rejected before any remote call.
    #[error("Invalid chunk request: {message}")]
    Validation {
        /// What is wrong with the request.
        message: String,
    },

    /// A snapshot listing answered with a non-success status.
    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body preview.
        body: String,
    },

    /// The ERP token capability failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// ERP transport or payload failure.
    #[error("ERP error: {0}")]
    Erp(ErpError),

    /// Storefront failure outside of per-product writes.
    #[error("Storefront error: {0}")]
    Storefront(StorefrontError),

    /// The storefront has no active location to sync into.
    #[error("Storefront has no active location")]
    NoLocation,

    /// A single quantity or price write failed.
    #[error("{operation} failed for {target}: {source}")]
    Write {
        /// Which write (`"quantity write"` or `"price write"`).
        operation: &'static str,
        /// Variant or product the write addressed.
        target: String,
        /// Underlying storefront failure.
        source: StorefrontError,
    },
}

impl From<ErpError> for SyncError {
    fn from(value: ErpError) -> Self {
        match value {
            ErpError::Upstream { status, body } => Self::Upstream { status, body },
            ErpError::Auth(e) => Self::Auth(e),
            other => Self::Erp(other),
        }
    }
}

impl From<StorefrontError> for SyncError {
    fn from(value: StorefrontError) -> Self {
        match value {
            StorefrontError::Upstream { status, body } => Self::Upstream { status, body },
            other => Self::Storefront(other),
        }
    }
}
