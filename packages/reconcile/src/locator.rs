//! Resolves storefront variants for a batch of SKUs.
//!
//! The storefront search is fuzzy, so every lookup result is filtered by
//! exact SKU equality before it is bound to a channel. A SKU whose search
//! only returned neighbours is reported with no variants.

use std::collections::{HashMap, HashSet};

use inventory_sync_catalog_models::{Channel, TargetVariant};
use inventory_sync_config::ChannelMapping;
use inventory_sync_storefront::{Storefront, StorefrontError};

/// Variants per requested SKU, in lookup order.
pub type VariantMap = HashMap<String, Vec<TargetVariant>>;

/// Looks up variants for `skus` in sequential queries of at most
/// `batch_size` SKUs and binds each variant to a channel with `mapping`.
///
/// Duplicate and blank SKUs are queried once or not at all. Every queried
/// SKU appears in the result, with an empty list when nothing matched
/// exactly.
///
/// # Errors
///
/// Returns the first [`StorefrontError`] from a lookup query. Missing SKUs
/// are not an error.
pub async fn locate_batch(
    storefront: &dyn Storefront,
    skus: &[String],
    batch_size: usize,
    location_id: &str,
    mapping: &ChannelMapping,
) -> Result<VariantMap, StorefrontError> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = skus
        .iter()
        .filter(|sku| !sku.trim().is_empty())
        .filter(|sku| seen.insert(sku.as_str()))
        .cloned()
        .collect();

    let mut found: VariantMap = unique.iter().map(|sku| (sku.clone(), Vec::new())).collect();

    for batch in unique.chunks(batch_size.max(1)) {
        let variants = storefront.variants_by_skus(batch, location_id).await?;
        let returned = variants.len();
        let mut kept = 0usize;

        for variant in variants {
            // Exact match only; prefix neighbours from the search are dropped.
            if let Some(list) = found.get_mut(&variant.sku) {
                list.push(variant);
                kept += 1;
            }
        }

        log::debug!(
            "Variant lookup: {} SKUs, {returned} variants returned, {kept} exact matches",
            batch.len()
        );
    }

    for (sku, variants) in &mut found {
        bind_channels(sku, variants, mapping);
    }

    Ok(found)
}

/// Assigns channels in lookup order. Each channel is given to at most one
/// variant; later claimants are unmapped.
fn bind_channels(sku: &str, variants: &mut [TargetVariant], mapping: &ChannelMapping) {
    let mut taken: HashSet<Channel> = HashSet::new();

    for (position, variant) in variants.iter_mut().enumerate() {
        let channel = mapping.channel_for(position, &variant.options);
        variant.channel = if channel == Channel::Unmapped || taken.insert(channel) {
            channel
        } else {
            log::debug!(
                "SKU {sku}: variant {} also maps to channel {channel}; leaving it unmapped",
                variant.id
            );
            Channel::Unmapped
        };
    }

    if variants.len() > 2 {
        log::debug!(
            "SKU {sku} has {} storefront variants; only channel-bound variants are synced",
            variants.len()
        );
    }
}
