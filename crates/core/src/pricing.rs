//! Weight-aware unit price resolution.
//!
//! A product's effective unit price depends on the selected weight option.
//! Resolution falls back to the product's base price whenever per-weight
//! data is missing or corrupted; the corrupted path is recovered locally
//! (logged in [`crate::product`]) and never propagated to the caller.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::product::Product;

/// The effective unit price for a product at a given weight selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_price: Option<Decimal>,
}

impl ResolvedPrice {
    /// Discount percentage for strike-through display, rounded half-up.
    ///
    /// `round((1 - price/comparePrice) * 100)`, present only when a compare
    /// price exists and is strictly greater than the price.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let compare = self.compare_price?;
        if compare <= self.price || compare.is_zero() {
            return None;
        }
        let percent = (Decimal::ONE - self.price / compare) * Decimal::from(100);
        percent
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
    }
}

/// Resolve the effective unit price for `product` at `selected_weight`.
///
/// - No weight selected, or no per-weight pricing: base price and compare
///   price.
/// - Weight selected and a valid entry exists: the per-weight price and its
///   compare price (which may be absent).
/// - Corrupted per-weight entries never surface here; they are dropped
///   during map parsing and this function falls back to the base price.
#[must_use]
pub fn resolve_price(product: &Product, selected_weight: Option<&str>) -> ResolvedPrice {
    let base = ResolvedPrice {
        price: product.price,
        compare_price: product.compare_price,
    };

    let Some(weight) = selected_weight.filter(|w| !w.is_empty()) else {
        return base;
    };

    product.weight_price_map().get(weight).map_or(base, |wp| {
        ResolvedPrice {
            price: wp.price,
            compare_price: wp.compare_price,
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::ProductId;

    fn product(weight_prices: Option<&str>) -> Product {
        Product {
            id: ProductId::new(1),
            slug: "foxtail-rava".to_string(),
            name: "Foxtail Millet Rava".to_string(),
            description: String::new(),
            image_url: None,
            category: None,
            price: Decimal::from(100),
            compare_price: Some(Decimal::from(150)),
            weight_options: vec!["500g".to_string(), "1kg".to_string()],
            weight_prices: weight_prices.map(str::to_owned),
            stock_quantity: Some(5),
            in_stock: true,
            reviews: None,
        }
    }

    #[test]
    fn test_no_weight_selected_uses_base_price() {
        // Scenario A: price=100, comparePrice=150, no weights.
        let resolved = resolve_price(&product(None), None);
        assert_eq!(resolved.price, Decimal::from(100));
        assert_eq!(resolved.compare_price, Some(Decimal::from(150)));
        assert_eq!(resolved.discount_percent(), Some(33));
    }

    #[test]
    fn test_empty_weight_is_no_weight() {
        let resolved = resolve_price(&product(Some(r#"{"500g":{"price":"80"}}"#)), Some(""));
        assert_eq!(resolved.price, Decimal::from(100));
    }

    #[test]
    fn test_selected_weight_uses_weight_price() {
        let p = product(Some(r#"{"500g":{"price":"80"},"1kg":{"price":"150"}}"#));

        let resolved = resolve_price(&p, Some("1kg"));
        assert_eq!(resolved.price, Decimal::from(150));
        assert_eq!(resolved.compare_price, None);

        let resolved = resolve_price(&p, Some("500g"));
        assert_eq!(resolved.price, Decimal::from(80));
    }

    #[test]
    fn test_unknown_weight_falls_back_to_base() {
        let p = product(Some(r#"{"500g":{"price":"80"}}"#));
        let resolved = resolve_price(&p, Some("2kg"));
        assert_eq!(resolved.price, Decimal::from(100));
    }

    #[test]
    fn test_corrupted_weight_price_falls_back_to_base() {
        // The resolved price must never contain the corrupted-object marker.
        let p = product(Some(r#"{"500g":{"price":"[object Object]"}}"#));
        let resolved = resolve_price(&p, Some("500g"));
        assert_eq!(resolved.price, Decimal::from(100));
    }

    #[test]
    fn test_malformed_blob_falls_back_to_base() {
        let p = product(Some("{broken"));
        let resolved = resolve_price(&p, Some("500g"));
        assert_eq!(resolved.price, Decimal::from(100));
    }

    #[test]
    fn test_discount_percent_rounding() {
        // 1 - 80/100 = 20%
        let resolved = ResolvedPrice {
            price: Decimal::from(80),
            compare_price: Some(Decimal::from(100)),
        };
        assert_eq!(resolved.discount_percent(), Some(20));

        // 1 - 59/80 = 26.25% -> 26
        let resolved = ResolvedPrice {
            price: Decimal::from(59),
            compare_price: Some(Decimal::from(80)),
        };
        assert_eq!(resolved.discount_percent(), Some(26));

        // 1 - 75/200 = 62.5% -> 63 (round half up)
        let resolved = ResolvedPrice {
            price: Decimal::from(75),
            compare_price: Some(Decimal::from(200)),
        };
        assert_eq!(resolved.discount_percent(), Some(63));
    }

    #[test]
    fn test_no_discount_when_compare_not_greater() {
        let resolved = ResolvedPrice {
            price: Decimal::from(100),
            compare_price: Some(Decimal::from(100)),
        };
        assert_eq!(resolved.discount_percent(), None);

        let resolved = ResolvedPrice {
            price: Decimal::from(100),
            compare_price: None,
        };
        assert_eq!(resolved.discount_percent(), None);
    }
}
