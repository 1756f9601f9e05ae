#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the inventory sync server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the engine's result types to allow independent evolution of the API
//! contract.

use inventory_sync_catalog_models::{ChunkCounters, ChunkOutcome, ChunkResult, RecordStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body (or query) of a chunk invocation. Missing fields take the server's
/// defaults.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRequestParams {
    /// Index of the first product.
    pub offset: Option<i64>,
    /// Maximum number of products.
    pub limit: Option<i64>,
}

/// Per-status counts for one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiChunkCounters {
    /// Products updated.
    pub updated: u64,
    /// Products already in sync.
    pub no_change: u64,
    /// Products with a failed write or lookup.
    pub errors: u64,
    /// Products missing on the storefront.
    pub not_found: u64,
    /// Products processed.
    pub processed: u64,
}

impl From<ChunkCounters> for ApiChunkCounters {
    fn from(counters: ChunkCounters) -> Self {
        Self {
            updated: counters.updated,
            no_change: counters.no_change,
            errors: counters.errors,
            not_found: counters.not_found,
            processed: counters.processed,
        }
    }
}

/// One product outcome as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiChunkResult {
    /// Outcome.
    pub status: RecordStatus,
    /// ERP SKU.
    pub sku: String,
    /// Whole units from the ERP.
    pub computed_quantity: i64,
    /// Channel A target price.
    pub computed_price_a: Decimal,
    /// Channel B target price.
    pub computed_price_b: Decimal,
    /// Detail, omitted when empty.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub message: String,
}

impl From<ChunkResult> for ApiChunkResult {
    fn from(result: ChunkResult) -> Self {
        Self {
            status: result.status,
            sku: result.sku,
            computed_quantity: result.computed_quantity,
            computed_price_a: result.computed_price_a,
            computed_price_b: result.computed_price_b,
            message: result.message,
        }
    }
}

/// Response of `POST /api/sync/chunk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiChunkResponse {
    /// Whether the chunk ran.
    pub success: bool,
    /// Whether the caller should stop. Always `true` on failure.
    pub is_complete: bool,
    /// Products in the ERP catalog.
    pub total_records: u64,
    /// Products processed by this chunk.
    pub processed_records: u64,
    /// Zero-based chunk index.
    pub current_chunk: u64,
    /// Chunks of this size covering the catalog.
    pub total_chunks: u64,
    /// Per-status counts.
    pub chunk_results: ApiChunkCounters,
    /// Offset for the next call, `null` when complete.
    pub next_offset: Option<u64>,
    /// Leading per-product outcomes.
    pub results: Vec<ApiChunkResult>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ApiChunkResponse {
    /// Successful response carrying at most `preview` results.
    #[must_use]
    pub fn from_outcome(outcome: ChunkOutcome, preview: usize) -> Self {
        let progress = outcome.progress;
        Self {
            success: true,
            is_complete: progress.is_complete,
            total_records: progress.total_records,
            processed_records: progress.processed_records,
            current_chunk: progress.current_chunk_index,
            total_chunks: progress.total_chunks,
            chunk_results: outcome.counters.into(),
            next_offset: progress.next_offset,
            results: outcome
                .results
                .into_iter()
                .take(preview)
                .map(ApiChunkResult::from)
                .collect(),
            error: None,
        }
    }

    /// Failed response. Marked complete so a driving loop stops.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            is_complete: true,
            total_records: 0,
            processed_records: 0,
            current_chunk: 0,
            total_chunks: 0,
            chunk_results: ApiChunkCounters::default(),
            next_offset: None,
            results: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_sync_catalog_models::SyncProgress;
    use rust_decimal_macros::dec;

    fn result(sku: &str) -> ChunkResult {
        ChunkResult {
            status: RecordStatus::NoChange,
            sku: sku.to_string(),
            computed_quantity: 2,
            computed_price_a: dec!(1.50),
            computed_price_b: dec!(0),
            message: String::new(),
        }
    }

    #[test]
    fn outcome_uses_camel_case_and_truncates_results() {
        let outcome = ChunkOutcome {
            progress: SyncProgress {
                total_records: 10,
                processed_records: 3,
                current_chunk_index: 1,
                total_chunks: 4,
                next_offset: Some(6),
                is_complete: false,
            },
            counters: ChunkCounters {
                no_change: 3,
                processed: 3,
                ..ChunkCounters::default()
            },
            results: vec![result("A"), result("B"), result("C")],
        };

        let json = serde_json::to_value(ApiChunkResponse::from_outcome(outcome, 2)).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["isComplete"], false);
        assert_eq!(json["currentChunk"], 1);
        assert_eq!(json["nextOffset"], 6);
        assert_eq!(json["chunkResults"]["noChange"], 3);
        assert_eq!(json["results"].as_array().unwrap().len(), 2);
        assert_eq!(json["results"][0]["status"], "no_change");
        assert!(json["results"][0].get("message").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_stops_the_caller() {
        let json = serde_json::to_value(ApiChunkResponse::failure("limit must be > 0")).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["isComplete"], true);
        assert!(json["nextOffset"].is_null());
        assert_eq!(json["error"], "limit must be > 0");
    }

    #[test]
    fn params_default_to_none() {
        let params: ChunkRequestParams = serde_json::from_str("{\"limit\": 20}").unwrap();
        assert_eq!(params.offset, None);
        assert_eq!(params.limit, Some(20));
    }
}
