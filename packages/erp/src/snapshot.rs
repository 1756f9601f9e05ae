//! Per-chunk snapshot of the ERP's authoritative state.

use futures::future::try_join4;
use inventory_sync_catalog_models::SourceSnapshot;
use inventory_sync_config::PriceTiers;

use crate::{ErpError, ErpSource};

/// Loads the catalog, stock at `location_id`, and both channel price tiers.
///
/// The four listings are fetched concurrently. There is no partial
/// snapshot: the first failing listing fails the whole load. An empty
/// catalog is a valid snapshot.
///
/// # Errors
///
/// Returns the [`ErpError`] of the first listing that fails.
pub async fn load_snapshot(
    source: &dyn ErpSource,
    location_id: &str,
    tiers: PriceTiers,
) -> Result<SourceSnapshot, ErpError> {
    let (products, quantities, prices_a, prices_b) = try_join4(
        source.list_products(),
        source.list_quantities(location_id),
        source.list_prices(tiers.channel_a),
        source.list_prices(tiers.channel_b),
    )
    .await?;

    log::info!(
        "Loaded ERP snapshot: {} products, {} stock rows at location {location_id}, \
         {} tier-{} prices, {} tier-{} prices",
        products.len(),
        quantities.len(),
        prices_a.len(),
        tiers.channel_a,
        prices_b.len(),
        tiers.channel_b,
    );

    Ok(SourceSnapshot {
        products,
        quantities,
        prices_a,
        prices_b,
    })
}
