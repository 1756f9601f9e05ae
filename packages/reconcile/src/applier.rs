//! Issues the storefront writes a [`ProductDelta`] calls for.

use inventory_sync_catalog_models::RecordStatus;
use inventory_sync_storefront::Storefront;

use crate::SyncError;
use crate::delta::ProductDelta;

/// What happened when one product's writes were applied.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    /// Quantity writes issued.
    pub quantity_writes: usize,
    /// Bulk price writes issued.
    pub price_writes: usize,
    /// Writes that failed, each a [`SyncError::Write`].
    pub failures: Vec<SyncError>,
}

impl ApplyOutcome {
    /// [`RecordStatus::Error`] if any write failed, otherwise
    /// [`RecordStatus::Updated`].
    #[must_use]
    pub fn status(&self) -> RecordStatus {
        if self.failures.is_empty() {
            RecordStatus::Updated
        } else {
            RecordStatus::Error
        }
    }

    /// Summary for the per-product result.
    #[must_use]
    pub fn message(&self) -> String {
        if self.failures.is_empty() {
            format!(
                "{} quantity write(s), {} price write(s)",
                self.quantity_writes, self.price_writes
            )
        } else {
            self.failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        }
    }
}

/// Applies `delta` against `storefront` at `location_id`.
///
/// Quantity writes go out one by one in variant order. Price mismatches are
/// sent afterwards as a single bulk write per storefront product. A failed
/// write is recorded and the remaining writes still run.
pub async fn apply(
    storefront: &dyn Storefront,
    delta: &ProductDelta,
    location_id: &str,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();

    for target in delta.quantity_writes() {
        outcome.quantity_writes += 1;
        if let Err(e) = storefront
            .set_quantity(&target.inventory_item_id, target.target_quantity, location_id)
            .await
        {
            log::warn!(
                "SKU {}: quantity write for variant {} failed: {e}",
                delta.sku,
                target.variant_id
            );
            outcome.failures.push(SyncError::Write {
                operation: "quantity write",
                target: target.variant_id.clone(),
                source: e,
            });
        }
    }

    for (product_id, updates) in delta.price_writes() {
        outcome.price_writes += 1;
        if let Err(e) = storefront.set_prices_bulk(&product_id, &updates).await {
            log::warn!(
                "SKU {}: price write for product {product_id} failed: {e}",
                delta.sku
            );
            outcome.failures.push(SyncError::Write {
                operation: "price write",
                target: product_id,
                source: e,
            });
        }
    }

    log::debug!(
        "SKU {}: {} quantity write(s), {} price write(s), {} failure(s)",
        delta.sku,
        outcome.quantity_writes,
        outcome.price_writes,
        outcome.failures.len()
    );

    outcome
}
