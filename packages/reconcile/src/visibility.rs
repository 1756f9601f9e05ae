//! Per-channel visibility from ERP product attributes.

use inventory_sync_catalog_models::{ProductRecord, VISIBLE, VisibilityFlags};
use inventory_sync_config::VisibilityKeys;

/// Derives [`VisibilityFlags`] for `product`.
///
/// The first attribute with each configured key wins. A missing key leaves
/// that channel visible.
#[must_use]
pub fn resolve(product: &ProductRecord, keys: &VisibilityKeys) -> VisibilityFlags {
    let lookup = |key: &str| {
        product
            .attributes
            .iter()
            .find(|attr| attr.key == key)
            .map_or_else(|| VISIBLE.to_string(), |attr| attr.value.clone())
    };

    VisibilityFlags {
        channel_a: lookup(&keys.channel_a),
        channel_b: lookup(&keys.channel_b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_sync_catalog_models::{Attribute, Channel, ProductId};

    fn keys() -> VisibilityKeys {
        VisibilityKeys {
            channel_a: "visible_b2c".to_string(),
            channel_b: "visible_b2b".to_string(),
        }
    }

    fn product(attributes: Vec<Attribute>) -> ProductRecord {
        ProductRecord {
            id: ProductId::from(1),
            sku: "SKU".to_string(),
            attributes,
        }
    }

    #[test]
    fn defaults_to_visible_when_absent() {
        let flags = resolve(&product(vec![Attribute::new("color", "red")]), &keys());
        assert_eq!(flags, VisibilityFlags::default());
    }

    #[test]
    fn first_matching_attribute_wins() {
        let flags = resolve(
            &product(vec![
                Attribute::new("visible_b2b", "0"),
                Attribute::new("visible_b2b", "1"),
                Attribute::new("visible_b2c", "1"),
            ]),
            &keys(),
        );
        assert_eq!(flags.channel_a, "1");
        assert_eq!(flags.channel_b, "0");
    }

    #[test]
    fn empty_value_hides_channel() {
        let flags = resolve(&product(vec![Attribute::new("visible_b2c", "")]), &keys());
        assert!(!flags.is_visible(Channel::A));
        assert!(flags.is_visible(Channel::B));
    }
}
