//! Target quantity and price per channel variant, and whether a write is
//! needed.

use inventory_sync_catalog_models::{
    Channel, ProductRecord, RecordStatus, SourceSnapshot, TargetVariant, VisibilityFlags,
};
use inventory_sync_storefront::PriceUpdate;
use rust_decimal::Decimal;

/// What one channel-bound variant should look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTarget {
    /// Storefront variant id.
    pub variant_id: String,
    /// Inventory item addressed by quantity writes.
    pub inventory_item_id: String,
    /// Storefront product addressed by price writes.
    pub parent_product_id: String,
    /// Channel the variant is bound to.
    pub channel: Channel,
    /// Units the variant should have.
    pub target_quantity: i64,
    /// Price the variant should have.
    pub target_price: Decimal,
    /// Whether the current quantity already equals the target.
    pub quantity_matches: bool,
    /// Whether the current price is within tolerance of the target.
    pub price_matches: bool,
}

/// Computed targets for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDelta {
    /// ERP SKU.
    pub sku: String,
    /// Whole units from the snapshot, before visibility.
    pub computed_quantity: i64,
    /// Channel A price after visibility.
    pub computed_price_a: Decimal,
    /// Channel B price after visibility.
    pub computed_price_b: Decimal,
    /// How many storefront variants the SKU resolved to.
    pub variants_found: usize,
    /// One entry per channel-bound variant, in lookup order.
    pub targets: Vec<VariantTarget>,
}

impl ProductDelta {
    /// Variants whose quantity must be written.
    pub fn quantity_writes(&self) -> impl Iterator<Item = &VariantTarget> {
        self.targets.iter().filter(|t| !t.quantity_matches)
    }

    /// Price writes grouped per storefront product, in first-seen order.
    ///
    /// Variants of one SKU normally share a product, giving a single group.
    #[must_use]
    pub fn price_writes(&self) -> Vec<(String, Vec<PriceUpdate>)> {
        let mut groups: Vec<(String, Vec<PriceUpdate>)> = Vec::new();

        for target in self.targets.iter().filter(|t| !t.price_matches) {
            let update = PriceUpdate {
                variant_id: target.variant_id.clone(),
                price: target.target_price,
            };
            match groups
                .iter_mut()
                .find(|(product_id, _)| *product_id == target.parent_product_id)
            {
                Some((_, updates)) => updates.push(update),
                None => groups.push((target.parent_product_id.clone(), vec![update])),
            }
        }

        groups
    }

    /// Whether any write is needed.
    #[must_use]
    pub fn needs_write(&self) -> bool {
        self.targets
            .iter()
            .any(|t| !t.quantity_matches || !t.price_matches)
    }

    /// Final status when no write is needed: [`RecordStatus::NotFound`]
    /// without variants, [`RecordStatus::NoChange`] when everything
    /// matches. `None` means the outcome depends on the writes.
    #[must_use]
    pub fn settled_status(&self) -> Option<RecordStatus> {
        if self.variants_found == 0 {
            Some(RecordStatus::NotFound)
        } else if self.needs_write() {
            None
        } else {
            Some(RecordStatus::NoChange)
        }
    }
}

/// Computes targets for `product` against its resolved `variants`.
///
/// Hidden channels target zero units at price zero and are written like any
/// other mismatch. Unmapped variants are left out entirely.
#[must_use]
pub fn compute(
    product: &ProductRecord,
    visibility: &VisibilityFlags,
    snapshot: &SourceSnapshot,
    variants: &[TargetVariant],
    price_tolerance: Decimal,
) -> ProductDelta {
    let raw_quantity = snapshot.quantities.whole_units(&product.id);

    let channel_price = |channel: Channel| {
        if visibility.is_visible(channel) {
            snapshot
                .prices_for(channel)
                .map_or(Decimal::ZERO, |prices| prices.get(&product.id))
        } else {
            Decimal::ZERO
        }
    };

    let targets = variants
        .iter()
        .filter(|v| v.channel != Channel::Unmapped)
        .map(|v| {
            let visible = visibility.is_visible(v.channel);
            let target_quantity = if visible { raw_quantity } else { 0 };
            let target_price = channel_price(v.channel);

            VariantTarget {
                variant_id: v.id.clone(),
                inventory_item_id: v.inventory_item_id.clone(),
                parent_product_id: v.parent_product_id.clone(),
                channel: v.channel,
                target_quantity,
                target_price,
                quantity_matches: v.current_quantity == target_quantity,
                price_matches: (v.current_price - target_price).abs() <= price_tolerance,
            }
        })
        .collect();

    ProductDelta {
        sku: product.sku.clone(),
        computed_quantity: raw_quantity,
        computed_price_a: channel_price(Channel::A),
        computed_price_b: channel_price(Channel::B),
        variants_found: variants.len(),
        targets,
    }
}
