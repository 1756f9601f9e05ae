//! In-memory ERP and storefront fakes for engine tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use inventory_sync_catalog_models::{
    Channel, PriceSnapshot, ProductId, ProductRecord, QuantitySnapshot, SourceSnapshot,
    TargetVariant,
};
use inventory_sync_erp::{AuthError, ErpError, ErpSource};
use inventory_sync_storefront::{Location, PriceUpdate, Storefront, StorefrontError};
use rust_decimal::Decimal;

pub fn product(id: i64, sku: &str) -> ProductRecord {
    ProductRecord {
        id: ProductId::from(id),
        sku: sku.to_string(),
        attributes: Vec::new(),
    }
}

pub fn snapshot(
    product: &ProductRecord,
    quantity: Decimal,
    price_a: Decimal,
    price_b: Decimal,
) -> SourceSnapshot {
    SourceSnapshot {
        products: vec![product.clone()],
        quantities: [(product.id.clone(), quantity)].into_iter().collect(),
        prices_a: [(product.id.clone(), price_a)].into_iter().collect(),
        prices_b: [(product.id.clone(), price_b)].into_iter().collect(),
    }
}

/// Storefront variant as a lookup returns it, before channel binding.
pub fn variant(
    id: &str,
    sku: &str,
    quantity: i64,
    price: Decimal,
    parent_product_id: &str,
) -> TargetVariant {
    TargetVariant {
        id: id.to_string(),
        sku: sku.to_string(),
        current_quantity: quantity,
        current_price: price,
        parent_product_id: parent_product_id.to_string(),
        inventory_item_id: format!("inv-{id}"),
        options: Vec::new(),
        channel: Channel::Unmapped,
    }
}

/// Variant already bound to `channel`, owned by product `p1`.
pub fn variant_on(
    channel: Channel,
    id: &str,
    sku: &str,
    quantity: i64,
    price: Decimal,
) -> TargetVariant {
    TargetVariant {
        channel,
        ..variant(id, sku, quantity, price, "p1")
    }
}

#[derive(Default)]
pub struct FakeErp {
    products: Vec<ProductRecord>,
    quantities: Vec<(ProductId, Decimal)>,
    prices_a: Vec<(ProductId, Decimal)>,
    prices_b: Vec<(ProductId, Decimal)>,
    fail_status: Option<u16>,
    fail_auth: bool,
    calls: AtomicUsize,
}

impl FakeErp {
    /// Adds a product with its stock and tier 1 and 2 prices.
    pub fn with_product(
        mut self,
        product: ProductRecord,
        quantity: Decimal,
        price_a: Decimal,
        price_b: Decimal,
    ) -> Self {
        self.quantities.push((product.id.clone(), quantity));
        self.prices_a.push((product.id.clone(), price_a));
        self.prices_b.push((product.id.clone(), price_b));
        self.products.push(product);
        self
    }

    /// Adds a product with no stock and no prices.
    pub fn with_bare_product(mut self, product: ProductRecord) -> Self {
        self.products.push(product);
        self
    }

    pub fn with_quantity(mut self, id: i64, quantity: Decimal) -> Self {
        self.quantities.push((ProductId::from(id), quantity));
        self
    }

    pub fn with_price(mut self, tier: u32, id: i64, amount: Decimal) -> Self {
        let rows = if tier == 1 {
            &mut self.prices_a
        } else {
            &mut self.prices_b
        };
        rows.push((ProductId::from(id), amount));
        self
    }

    /// Makes the catalog listing answer with `status`.
    pub const fn failing_with(mut self, status: u16) -> Self {
        self.fail_status = Some(status);
        self
    }

    pub const fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ErpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth {
            return Err(ErpError::Auth(AuthError {
                message: "token expired".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl ErpSource for FakeErp {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ErpError> {
        self.check()?;
        if let Some(status) = self.fail_status {
            return Err(ErpError::Upstream {
                status,
                body: "maintenance".to_string(),
            });
        }
        Ok(self.products.clone())
    }

    async fn list_quantities(&self, _location_id: &str) -> Result<QuantitySnapshot, ErpError> {
        self.check()?;
        Ok(self.quantities.iter().cloned().collect())
    }

    async fn list_prices(&self, tier: u32) -> Result<PriceSnapshot, ErpError> {
        self.check()?;
        let rows = if tier == 1 {
            &self.prices_a
        } else {
            &self.prices_b
        };
        Ok(rows.iter().cloned().collect())
    }
}

/// Stateful storefront: writes update the stored variants, so a second run
/// sees the corrected values.
pub struct FakeStorefront {
    variants: Mutex<Vec<TargetVariant>>,
    locations: Vec<Location>,
    fail_all_lookups: bool,
    fail_lookup_skus: HashSet<String>,
    fail_quantity_items: HashSet<String>,
    fail_price_products: HashSet<String>,
    lookups: Mutex<Vec<Vec<String>>>,
    quantity_writes: Mutex<Vec<(String, i64, String)>>,
    price_writes: Mutex<Vec<(String, Vec<PriceUpdate>)>>,
    location_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeStorefront {
    pub fn new(variants: Vec<TargetVariant>) -> Self {
        Self {
            variants: Mutex::new(variants),
            locations: vec![
                Location {
                    id: "loc-0".to_string(),
                    name: "Closed warehouse".to_string(),
                    is_active: false,
                },
                Location {
                    id: "loc-1".to_string(),
                    name: "Main".to_string(),
                    is_active: true,
                },
            ],
            fail_all_lookups: false,
            fail_lookup_skus: HashSet::new(),
            fail_quantity_items: HashSet::new(),
            fail_price_products: HashSet::new(),
            lookups: Mutex::new(Vec::new()),
            quantity_writes: Mutex::new(Vec::new()),
            price_writes: Mutex::new(Vec::new()),
            location_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn without_active_location(mut self) -> Self {
        for location in &mut self.locations {
            location.is_active = false;
        }
        self
    }

    pub const fn failing_lookups(mut self) -> Self {
        self.fail_all_lookups = true;
        self
    }

    /// Fails any lookup batch that contains `sku`.
    pub fn failing_lookup_of(mut self, sku: &str) -> Self {
        self.fail_lookup_skus.insert(sku.to_string());
        self
    }

    pub fn failing_quantity_for(mut self, inventory_item_id: &str) -> Self {
        self.fail_quantity_items.insert(inventory_item_id.to_string());
        self
    }

    pub fn failing_prices_for(mut self, product_id: &str) -> Self {
        self.fail_price_products.insert(product_id.to_string());
        self
    }

    pub fn lookups(&self) -> Vec<Vec<String>> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn quantity_writes(&self) -> Vec<(String, i64, String)> {
        self.quantity_writes.lock().unwrap().clone()
    }

    pub fn price_writes(&self) -> Vec<(String, Vec<PriceUpdate>)> {
        self.price_writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.quantity_writes().len() + self.price_writes().len()
    }

    pub fn location_calls(&self) -> usize {
        self.location_calls.load(Ordering::SeqCst)
    }

    /// Most quantity writes ever outstanding at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn stored(&self, variant_id: &str) -> Option<TargetVariant> {
        self.variants
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.id == variant_id)
            .cloned()
    }

    fn rejected(message: &str) -> StorefrontError {
        StorefrontError::UserErrors {
            messages: vec![message.to_string()],
        }
    }
}

#[async_trait]
impl Storefront for FakeStorefront {
    async fn variants_by_skus(
        &self,
        skus: &[String],
        _location_id: &str,
    ) -> Result<Vec<TargetVariant>, StorefrontError> {
        self.lookups.lock().unwrap().push(skus.to_vec());

        if self.fail_all_lookups || skus.iter().any(|s| self.fail_lookup_skus.contains(s)) {
            return Err(StorefrontError::Upstream {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }

        // Prefix search, like the real backend.
        Ok(self
            .variants
            .lock()
            .unwrap()
            .iter()
            .filter(|v| skus.iter().any(|s| v.sku.starts_with(s.as_str())))
            .map(|v| TargetVariant {
                channel: Channel::Unmapped,
                ..v.clone()
            })
            .collect())
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StorefrontError> {
        self.location_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.locations.clone())
    }

    async fn set_quantity(
        &self,
        inventory_item_id: &str,
        quantity: i64,
        location_id: &str,
    ) -> Result<(), StorefrontError> {
        self.quantity_writes.lock().unwrap().push((
            inventory_item_id.to_string(),
            quantity,
            location_id.to_string(),
        ));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_quantity_items.contains(inventory_item_id) {
            return Err(Self::rejected("quantity rejected"));
        }

        for v in self.variants.lock().unwrap().iter_mut() {
            if v.inventory_item_id == inventory_item_id {
                v.current_quantity = quantity;
            }
        }
        Ok(())
    }

    async fn set_prices_bulk(
        &self,
        product_id: &str,
        prices: &[PriceUpdate],
    ) -> Result<(), StorefrontError> {
        self.price_writes
            .lock()
            .unwrap()
            .push((product_id.to_string(), prices.to_vec()));

        if self.fail_price_products.contains(product_id) {
            return Err(Self::rejected("price rejected"));
        }

        let mut variants = self.variants.lock().unwrap();
        for update in prices {
            if let Some(v) = variants.iter_mut().find(|v| v.id == update.variant_id) {
                v.current_price = update.price;
            }
        }
        Ok(())
    }
}
