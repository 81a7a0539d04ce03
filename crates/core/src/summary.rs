//! Order totals.
//!
//! The same calculator serves the persisted cart and the ephemeral
//! single-item "buy now" flow; callers pass whichever slice of line items
//! applies. Shipping and tax constants are business configuration, injected
//! via [`OrderRules`] rather than hardcoded.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::warn;

use crate::cart::LineItem;

/// Currency display precision.
const CURRENCY_DP: u32 = 2;

/// Business rules for order totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRules {
    /// Flat shipping charge per order.
    pub shipping_flat_rate: Decimal,
    /// Tax as a fraction of the subtotal (e.g. 0.05 for 5% GST).
    pub tax_rate: Decimal,
    /// Whether the flat shipping rate applies even to an empty order.
    /// Pinned by configuration; the shop default is `false` (empty order
    /// ships nothing, so subtotal, shipping, and total are all zero).
    pub ship_empty_carts: bool,
}

/// Derived order totals. Never mutated, always recomputed from the current
/// line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Compute order totals for `items` under `rules`.
///
/// `subtotal = Σ unit_price × quantity` using the weight-resolved price
/// captured on each line. Intermediate math is exact decimal arithmetic;
/// each component is rounded to 2 places (half-up) for currency display and
/// the total is the sum of the rounded components, so the displayed figures
/// always add up.
///
/// Lines without a price snapshot contribute nothing; that indicates a
/// hydration bug upstream and is logged.
#[must_use]
pub fn summarize(items: &[LineItem], rules: &OrderRules) -> OrderSummary {
    let subtotal: Decimal = items
        .iter()
        .map(|item| {
            item.unit_price().map_or_else(
                || {
                    warn!(
                        product_id = %item.product_id,
                        "line item has no price snapshot, excluded from subtotal"
                    );
                    Decimal::ZERO
                },
                |price| price * Decimal::from(item.quantity),
            )
        })
        .sum();

    let shipping = if items.is_empty() && !rules.ship_empty_carts {
        Decimal::ZERO
    } else {
        rules.shipping_flat_rate
    };

    let subtotal = round_currency(subtotal);
    let shipping = round_currency(shipping);
    let tax = round_currency(subtotal * rules.tax_rate);
    let total = subtotal + shipping + tax;

    OrderSummary {
        subtotal,
        shipping,
        tax,
        total,
    }
}

fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{LineItemMeta, ProductSnapshot};
    use crate::types::ProductId;

    fn rules() -> OrderRules {
        OrderRules {
            shipping_flat_rate: Decimal::from(50),
            tax_rate: "0.05".parse().unwrap(),
            ship_empty_carts: false,
        }
    }

    fn line(product_id: i32, unit_price: &str, quantity: u32) -> LineItem {
        LineItem {
            id: None,
            product_id: ProductId::new(product_id),
            quantity,
            meta: LineItemMeta::default(),
            product: Some(ProductSnapshot {
                name: format!("product-{product_id}"),
                unit_price: unit_price.parse().unwrap(),
                compare_price: None,
                stock_quantity: None,
            }),
        }
    }

    #[test]
    fn test_summarize_empty() {
        // Scenario E: flat rate 50, tax 5%, empty cart, shipping waived.
        let summary = summarize(&[], &rules());
        assert_eq!(summary.subtotal, Decimal::ZERO);
        assert_eq!(summary.shipping, Decimal::ZERO);
        assert_eq!(summary.tax, Decimal::ZERO);
        assert_eq!(summary.total, Decimal::ZERO);
    }

    #[test]
    fn test_summarize_empty_with_unconditional_shipping() {
        let mut rules = rules();
        rules.ship_empty_carts = true;

        let summary = summarize(&[], &rules);
        assert_eq!(summary.subtotal, Decimal::ZERO);
        assert_eq!(summary.shipping, Decimal::from(50));
        assert_eq!(summary.total, Decimal::from(50));
    }

    #[test]
    fn test_summarize_single_line() {
        let items = [line(1, "150", 2)];
        let summary = summarize(&items, &rules());

        assert_eq!(summary.subtotal, Decimal::from(300));
        assert_eq!(summary.shipping, Decimal::from(50));
        assert_eq!(summary.tax, Decimal::from(15));
        assert_eq!(summary.total, Decimal::from(365));
    }

    #[test]
    fn test_summary_additivity() {
        let items = [line(1, "80", 3), line(2, "149.50", 1), line(3, "33.33", 7)];
        let summary = summarize(&items, &rules());

        let expected: Decimal = items
            .iter()
            .map(|i| i.unit_price().unwrap() * Decimal::from(i.quantity))
            .sum();
        assert!((summary.subtotal - expected).abs() <= "0.01".parse().unwrap());
        assert_eq!(
            summary.total,
            summary.subtotal + summary.shipping + summary.tax
        );
    }

    #[test]
    fn test_tax_rounding_half_up() {
        // 33.33 * 0.05 = 1.6665 -> 1.67
        let items = [line(1, "33.33", 1)];
        let summary = summarize(&items, &rules());
        assert_eq!(summary.tax, "1.67".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_line_without_snapshot_contributes_nothing() {
        let mut item = line(1, "100", 2);
        item.product = None;
        let summary = summarize(&[item], &rules());
        assert_eq!(summary.subtotal, Decimal::ZERO);
        // Non-empty cart still pays shipping.
        assert_eq!(summary.shipping, Decimal::from(50));
    }
}
