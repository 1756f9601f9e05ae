#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Catalog, snapshot, and chunk result types.
//!
//! These are the shared vocabulary of the inventory sync engine. ERP-side
//! data ([`ProductRecord`], [`QuantitySnapshot`], [`PriceSnapshot`]) is
//! loaded once per chunk and never mutated. Storefront-side data
//! ([`TargetVariant`]) is resolved per sub-chunk. Per-product outcomes are
//! reported as [`ChunkResult`] and aggregated into [`ChunkCounters`] and
//! [`SyncProgress`].

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive as _;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Attribute value that marks a channel as visible. Every other value,
/// including the empty string, hides the channel.
pub const VISIBLE: &str = "1";

/// Maximum length of an upstream response body kept in errors and logs.
pub const BODY_PREVIEW_LEN: usize = 500;

/// Truncates `text` to [`BODY_PREVIEW_LEN`] bytes on a char boundary.
#[must_use]
pub fn body_preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Opaque ERP product key.
///
/// ERP systems hand out both numeric and string identifiers, so the key is
/// kept as its string form and only compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// A single key/value attribute attached to an ERP product or a storefront
/// variant option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub key: String,
    /// Attribute value, verbatim.
    pub value: String,
}

impl Attribute {
    /// Convenience constructor.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An authoritative product record from the ERP catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// ERP product key used to index the quantity and price snapshots.
    pub id: ProductId,
    /// Stock keeping unit, matched exactly against storefront variants.
    pub sku: String,
    /// Vendor-specific attributes in source order.
    pub attributes: Vec<Attribute>,
}

/// Units on hand per product at one ERP location.
///
/// Holds at most one entry per product. Missing products have zero units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantitySnapshot {
    units: HashMap<ProductId, Decimal>,
}

impl QuantitySnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the quantity for `id`. Returns `false` and leaves the
    /// existing value untouched if the product was already recorded.
    pub fn insert(&mut self, id: ProductId, units: Decimal) -> bool {
        match self.units.entry(id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(units);
                true
            }
        }
    }

    /// Raw (possibly fractional) quantity, zero when absent.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Decimal {
        self.units.get(id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Whole units on hand, rounded toward negative infinity. Quantities
    /// outside the `i64` range saturate.
    #[must_use]
    pub fn whole_units(&self, id: &ProductId) -> i64 {
        let units = self.get(id).floor();
        units.to_i64().unwrap_or_else(|| {
            let saturated = if units.is_sign_negative() {
                i64::MIN
            } else {
                i64::MAX
            };
            log::warn!("Quantity {units} for product {id} is out of range, using {saturated}");
            saturated
        })
    }

    /// Number of products with a recorded quantity.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no quantity was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl FromIterator<(ProductId, Decimal)> for QuantitySnapshot {
    fn from_iter<T: IntoIterator<Item = (ProductId, Decimal)>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for (id, units) in iter {
            snapshot.insert(id, units);
        }
        snapshot
    }
}

/// Prices per product for one price tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceSnapshot {
    amounts: HashMap<ProductId, Decimal>,
}

impl PriceSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the price for `id`, keeping the first price seen.
    pub fn insert(&mut self, id: ProductId, amount: Decimal) {
        self.amounts.entry(id).or_insert(amount);
    }

    /// Price for `id`, zero when absent.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Decimal {
        self.amounts.get(id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Number of priced products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    /// Whether no price was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}

impl FromIterator<(ProductId, Decimal)> for PriceSnapshot {
    fn from_iter<T: IntoIterator<Item = (ProductId, Decimal)>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for (id, amount) in iter {
            snapshot.insert(id, amount);
        }
        snapshot
    }
}

/// Everything loaded from the ERP for one chunk invocation.
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
    /// Full catalog in ERP order.
    pub products: Vec<ProductRecord>,
    /// Units per product at the configured location.
    pub quantities: QuantitySnapshot,
    /// Channel A price tier.
    pub prices_a: PriceSnapshot,
    /// Channel B price tier.
    pub prices_b: PriceSnapshot,
}

impl SourceSnapshot {
    /// Price tier bound to `channel`, or `None` for unmapped variants.
    #[must_use]
    pub const fn prices_for(&self, channel: Channel) -> Option<&PriceSnapshot> {
        match channel {
            Channel::A => Some(&self.prices_a),
            Channel::B => Some(&self.prices_b),
            Channel::Unmapped => None,
        }
    }
}

/// Sales channel a storefront variant is bound to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Channel {
    /// First channel (consumer storefront).
    A,
    /// Second channel (business storefront).
    B,
    /// Not bound to any channel; never written.
    Unmapped,
}

/// Per-channel visibility derived from a product's attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityFlags {
    /// Raw visibility value for channel A.
    pub channel_a: String,
    /// Raw visibility value for channel B.
    pub channel_b: String,
}

impl Default for VisibilityFlags {
    fn default() -> Self {
        Self {
            channel_a: VISIBLE.to_string(),
            channel_b: VISIBLE.to_string(),
        }
    }
}

impl VisibilityFlags {
    /// Whether `channel` is visible. Unmapped variants are never visible.
    #[must_use]
    pub fn is_visible(&self, channel: Channel) -> bool {
        match channel {
            Channel::A => self.channel_a == VISIBLE,
            Channel::B => self.channel_b == VISIBLE,
            Channel::Unmapped => false,
        }
    }
}

/// A storefront variant resolved for a SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetVariant {
    /// Storefront variant id.
    pub id: String,
    /// SKU as stored on the storefront.
    pub sku: String,
    /// Units currently available at the sync location.
    pub current_quantity: i64,
    /// Current variant price.
    pub current_price: Decimal,
    /// Storefront product that owns the variant.
    pub parent_product_id: String,
    /// Inventory item used for quantity writes.
    pub inventory_item_id: String,
    /// Selected option values, used by option-based channel mapping.
    #[serde(default)]
    pub options: Vec<Attribute>,
    /// Channel assigned by the locator's channel mapping.
    pub channel: Channel,
}

/// Outcome classification for one processed product.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordStatus {
    /// At least one write was issued and none failed.
    Updated,
    /// Every mapped variant already matched the ERP.
    NoChange,
    /// The SKU has no storefront variant.
    NotFound,
    /// At least one write (or the variant lookup) failed.
    Error,
}

/// Per-product outcome of a chunk invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkResult {
    /// Outcome.
    pub status: RecordStatus,
    /// ERP SKU.
    pub sku: String,
    /// Whole units derived from the quantity snapshot (before visibility).
    pub computed_quantity: i64,
    /// Target price for channel A after visibility.
    pub computed_price_a: Decimal,
    /// Target price for channel B after visibility.
    pub computed_price_b: Decimal,
    /// Human-readable detail, empty when there is nothing to add.
    pub message: String,
}

/// Aggregate counts for one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkCounters {
    /// Products with at least one successful write and no failures.
    pub updated: u64,
    /// Products that already matched.
    pub no_change: u64,
    /// Products with at least one failure.
    pub errors: u64,
    /// Products with no storefront variant.
    pub not_found: u64,
    /// Products processed in total.
    pub processed: u64,
}

impl ChunkCounters {
    /// Counts one result.
    pub const fn record(&mut self, status: RecordStatus) {
        match status {
            RecordStatus::Updated => self.updated += 1,
            RecordStatus::NoChange => self.no_change += 1,
            RecordStatus::NotFound => self.not_found += 1,
            RecordStatus::Error => self.errors += 1,
        }
        self.processed += 1;
    }

    /// Builds counters from a full result set.
    #[must_use]
    pub fn from_results(results: &[ChunkResult]) -> Self {
        let mut counters = Self::default();
        for result in results {
            counters.record(result.status);
        }
        counters
    }
}

/// Resumability state reported after each chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// Products in the full ERP catalog.
    pub total_records: u64,
    /// Products processed by this chunk.
    pub processed_records: u64,
    /// Zero-based index of this chunk (`offset / limit`).
    pub current_chunk_index: u64,
    /// Number of chunks of this size covering the catalog.
    pub total_chunks: u64,
    /// Offset the caller should pass next, or `None` when complete.
    pub next_offset: Option<u64>,
    /// Whether this chunk reached the end of the catalog.
    pub is_complete: bool,
}

/// Everything a chunk invocation produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkOutcome {
    /// Resumability state.
    pub progress: SyncProgress,
    /// Aggregate counts.
    pub counters: ChunkCounters,
    /// Per-product results in catalog order.
    pub results: Vec<ChunkResult>,
}
