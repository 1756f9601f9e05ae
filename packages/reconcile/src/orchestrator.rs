//! One chunk invocation: validate, snapshot, slice, locate, reconcile.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt as _};
use inventory_sync_catalog_models::{
    ChunkCounters, ChunkOutcome, ChunkResult, ProductRecord, RecordStatus, SourceSnapshot,
    SyncProgress, TargetVariant,
};
use inventory_sync_erp::snapshot::load_snapshot;

use crate::progress::ProgressCallback;
use crate::{SyncContext, SyncError, applier, delta, locator, visibility};

/// Which slice of the ERP catalog to reconcile.
///
/// Signed so that out-of-range caller input reaches [`ChunkRequest::validate`]
/// instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    /// Index of the first product in ERP order.
    pub offset: i64,
    /// Maximum number of products.
    pub limit: i64,
}

impl ChunkRequest {
    #[must_use]
    pub const fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }

    /// Returns `(offset, limit)` if `offset >= 0` and `limit > 0`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] otherwise.
    pub fn validate(self) -> Result<(u64, u64), SyncError> {
        let offset = u64::try_from(self.offset).map_err(|_| SyncError::Validation {
            message: format!("offset must be >= 0, got {}", self.offset),
        })?;
        let limit = u64::try_from(self.limit)
            .ok()
            .filter(|&limit| limit > 0)
            .ok_or_else(|| SyncError::Validation {
                message: format!("limit must be > 0, got {}", self.limit),
            })?;
        Ok((offset, limit))
    }
}

/// Reconciles products `offset .. offset + limit` of the ERP catalog.
///
/// The request is validated before any remote call. The ERP snapshot is
/// loaded fresh and the slice is processed in sub-chunks of
/// `sub_chunk_size`, each resolved with one variant lookup pass and then
/// reconciled `concurrency` products at a time. Per-product failures are
/// reported in the results; only validation, location, and snapshot
/// failures abort the chunk.
///
/// `progress` is advanced by one per processed product. It is never
/// finished here so a caller can share one indicator across chunks.
///
/// # Errors
///
/// Returns [`SyncError`] if the request is invalid, the ERP snapshot cannot
/// be loaded, or the slice is non-empty and no storefront location can be
/// resolved.
pub async fn run_chunk(
    ctx: &SyncContext,
    request: ChunkRequest,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> Result<ChunkOutcome, SyncError> {
    let (offset, limit) = request.validate()?;
    let config = ctx.config();

    let snapshot = load_snapshot(ctx.erp(), ctx.erp_location_id(), config.price_tiers).await?;

    let catalog_len = snapshot.products.len();
    let start = usize::try_from(offset).map_or(catalog_len, |o| o.min(catalog_len));
    let end = usize::try_from(limit)
        .map_or(catalog_len, |l| start.saturating_add(l).min(catalog_len));
    let slice = &snapshot.products[start..end];

    let chunk_progress = chunk_progress(offset, limit, catalog_len as u64, slice.len() as u64);

    if slice.is_empty() {
        log::info!(
            "Chunk at offset {offset} (limit {limit}) is past the end of a {catalog_len}-product catalog"
        );
        return Ok(ChunkOutcome {
            progress: chunk_progress,
            ..ChunkOutcome::default()
        });
    }

    let location_id = ctx.storefront_location_id().await?;

    log::info!(
        "Processing products {start}..{end} of {catalog_len} (chunk {} of {})",
        chunk_progress.current_chunk_index + 1,
        chunk_progress.total_chunks
    );

    let mut results = Vec::with_capacity(slice.len());

    for (index, sub_chunk) in slice.chunks(config.sub_chunk_size.max(1)).enumerate() {
        if index > 0 && config.sub_chunk_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.sub_chunk_delay_ms)).await;
        }
        if let Some(p) = progress {
            p.set_message(format!("offset {offset}, sub-chunk {}", index + 1));
        }
        results.extend(process_sub_chunk(ctx, &snapshot, sub_chunk, location_id, progress).await);
    }

    let counters = ChunkCounters::from_results(&results);

    log::info!(
        "Chunk done: {} processed, {} updated, {} unchanged, {} not found, {} errors",
        counters.processed,
        counters.updated,
        counters.no_change,
        counters.not_found,
        counters.errors
    );

    Ok(ChunkOutcome {
        progress: chunk_progress,
        counters,
        results,
    })
}

/// Resumability state for a chunk that processed `processed` products.
const fn chunk_progress(offset: u64, limit: u64, total: u64, processed: u64) -> SyncProgress {
    let end = offset.saturating_add(limit);
    let is_complete = end >= total;

    SyncProgress {
        total_records: total,
        processed_records: processed,
        current_chunk_index: offset / limit,
        total_chunks: total.div_ceil(limit),
        next_offset: if is_complete { None } else { Some(end) },
        is_complete,
    }
}

/// Locates variants for one sub-chunk and reconciles its products with
/// bounded concurrency. Results come back in input order.
async fn process_sub_chunk(
    ctx: &SyncContext,
    snapshot: &SourceSnapshot,
    products: &[ProductRecord],
    location_id: &str,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> Vec<ChunkResult> {
    let config = ctx.config();
    let skus: Vec<String> = products.iter().map(|p| p.sku.clone()).collect();

    let variants = match locator::locate_batch(
        ctx.storefront(),
        &skus,
        config.lookup_batch_size,
        location_id,
        &config.channel_mapping,
    )
    .await
    {
        Ok(variants) => variants,
        Err(e) => {
            log::error!(
                "Variant lookup failed for {} products; marking them as errors: {e}",
                products.len()
            );
            if let Some(p) = progress {
                p.inc(products.len() as u64);
            }
            let message = format!("Variant lookup failed: {e}");
            return products
                .iter()
                .map(|product| lookup_failed(ctx, snapshot, product, &message))
                .collect();
        }
    };

    let mut indexed: Vec<(usize, ChunkResult)> =
        stream::iter(products.iter().enumerate().map(|(index, product)| {
            let found = variants.get(&product.sku).map_or(&[][..], Vec::as_slice);
            async move {
                (
                    index,
                    process_product(ctx, snapshot, product, found, location_id).await,
                )
            }
        }))
        .buffer_unordered(config.concurrency.max(1))
        .inspect(|_| {
            if let Some(p) = progress {
                p.inc(1);
            }
        })
        .collect()
        .await;

    indexed.sort_unstable_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, result)| result).collect()
}

async fn process_product(
    ctx: &SyncContext,
    snapshot: &SourceSnapshot,
    product: &ProductRecord,
    variants: &[TargetVariant],
    location_id: &str,
) -> ChunkResult {
    let config = ctx.config();
    let flags = visibility::resolve(product, &config.visibility_keys);
    let delta = delta::compute(product, &flags, snapshot, variants, config.price_tolerance);

    let (status, message) = match delta.settled_status() {
        Some(RecordStatus::NotFound) => {
            log::debug!("SKU {} not found on the storefront", product.sku);
            (
                RecordStatus::NotFound,
                "No storefront variant with this SKU".to_string(),
            )
        }
        Some(status) if delta.targets.is_empty() => (
            status,
            format!(
                "{} variant(s) found, none bound to a channel",
                delta.variants_found
            ),
        ),
        Some(status) => (status, String::new()),
        None => {
            let outcome = applier::apply(ctx.storefront(), &delta, location_id).await;
            (outcome.status(), outcome.message())
        }
    };

    ChunkResult {
        status,
        sku: delta.sku,
        computed_quantity: delta.computed_quantity,
        computed_price_a: delta.computed_price_a,
        computed_price_b: delta.computed_price_b,
        message,
    }
}

fn lookup_failed(
    ctx: &SyncContext,
    snapshot: &SourceSnapshot,
    product: &ProductRecord,
    message: &str,
) -> ChunkResult {
    let config = ctx.config();
    let flags = visibility::resolve(product, &config.visibility_keys);
    let delta = delta::compute(product, &flags, snapshot, &[], config.price_tolerance);

    ChunkResult {
        status: RecordStatus::Error,
        sku: delta.sku,
        computed_quantity: delta.computed_quantity,
        computed_price_a: delta.computed_price_a,
        computed_price_b: delta.computed_price_b,
        message: message.to_string(),
    }
}
