//! Product catalog model.
//!
//! Products carry a base price plus an optional per-weight price map. The
//! map is stored (and transmitted) as an opaque JSON blob, a legacy of the
//! original catalog data; [`Product::weight_price_map`] is the single place
//! where that blob is parsed and validated. Corrupted entries are dropped
//! and logged rather than surfaced to callers.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::ProductId;

/// Marker left behind when a price was serialized via JavaScript's default
/// object-to-string coercion upstream. Any price containing it is corrupted.
const CORRUPTED_PRICE_MARKER: &str = "[object Object]";

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Base unit price, used when no weight option is selected.
    pub price: Decimal,
    /// Pre-discount price for strike-through display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_price: Option<Decimal>,
    /// Ordered weight option labels (e.g. "500g", "1kg").
    #[serde(default)]
    pub weight_options: Vec<String>,
    /// Raw per-weight price map as stored: a JSON blob mapping weight label
    /// to `{price, comparePrice?}`. Parse via [`Self::weight_price_map`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_prices: Option<String>,
    /// Available stock. `None` means stock is not tracked (unlimited).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,
    pub in_stock: bool,
    /// Opaque reviews blob (JSON array of `{rating, ...}` objects).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<String>,
}

/// A validated per-weight price entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightPrice {
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_price: Option<Decimal>,
}

impl Product {
    /// Maximum quantity a single cart line may hold, when stock is tracked.
    #[must_use]
    pub const fn max_quantity(&self) -> Option<u32> {
        self.stock_quantity
    }

    /// Parse and validate the raw weight-price blob.
    ///
    /// Only labels that still appear in `weight_options` surface a price;
    /// labels removed from the option list are dropped. Entries with
    /// corrupted or unparseable prices are dropped and logged at WARN for
    /// data-quality monitoring. A blob that is not valid JSON yields an
    /// empty map, never an error.
    #[must_use]
    pub fn weight_price_map(&self) -> BTreeMap<String, WeightPrice> {
        let mut map = BTreeMap::new();

        let Some(raw) = self.weight_prices.as_deref() else {
            return map;
        };
        if raw.is_empty() {
            return map;
        }

        let parsed: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(product_id = %self.id, error = %e, "malformed weight-price blob, ignoring");
                return map;
            }
        };

        let Some(entries) = parsed.as_object() else {
            warn!(product_id = %self.id, "weight-price blob is not a JSON object, ignoring");
            return map;
        };

        for (label, entry) in entries {
            if !self.weight_options.iter().any(|w| w == label) {
                continue;
            }
            match parse_weight_price(entry) {
                Some(weight_price) => {
                    map.insert(label.clone(), weight_price);
                }
                None => {
                    warn!(
                        product_id = %self.id,
                        weight = %label,
                        "corrupted weight price, falling back to base price"
                    );
                }
            }
        }

        map
    }

    /// Arithmetic mean of review ratings, if any parse.
    ///
    /// Reviews are an opaque blob averaged here for display; parse failures
    /// yield `None`.
    #[must_use]
    pub fn average_rating(&self) -> Option<f64> {
        let raw = self.reviews.as_deref()?;
        let parsed: serde_json::Value = serde_json::from_str(raw).ok()?;
        let reviews = parsed.as_array()?;

        let ratings: Vec<f64> = reviews
            .iter()
            .filter_map(|r| r.get("rating").and_then(serde_json::Value::as_f64))
            .collect();

        if ratings.is_empty() {
            return None;
        }

        #[allow(clippy::cast_precision_loss)] // review counts are tiny
        Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
    }
}

/// Parse a single weight-price entry.
///
/// Accepts the structured form `{"price": "80", "comparePrice": "100"}` and
/// the legacy bare-string form `"80"`. Returns `None` for corrupted values:
/// prices that serialized as objects, contain the `[object Object]` marker,
/// or do not parse as decimals.
fn parse_weight_price(entry: &serde_json::Value) -> Option<WeightPrice> {
    match entry {
        serde_json::Value::String(s) => {
            let price = parse_price_str(s)?;
            Some(WeightPrice {
                price,
                compare_price: None,
            })
        }
        serde_json::Value::Object(fields) => {
            let price = match fields.get("price") {
                Some(serde_json::Value::String(s)) => parse_price_str(s)?,
                // Price serialized as a nested object or anything else: corrupted.
                _ => return None,
            };
            let compare_price = match fields.get("comparePrice") {
                Some(serde_json::Value::String(s)) => parse_price_str(s),
                _ => None,
            };
            Some(WeightPrice {
                price,
                compare_price,
            })
        }
        _ => None,
    }
}

/// Parse a plain numeric price string, rejecting corrupted placeholders.
fn parse_price_str(s: &str) -> Option<Decimal> {
    if s.contains(CORRUPTED_PRICE_MARKER) {
        return None;
    }
    s.trim().parse::<Decimal>().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn millet_flour(weight_prices: Option<&str>) -> Product {
        Product {
            id: ProductId::new(1),
            slug: "ragi-flour".to_string(),
            name: "Ragi Flour".to_string(),
            description: "Stone-ground finger millet flour".to_string(),
            image_url: None,
            category: Some("flour".to_string()),
            price: Decimal::from(100),
            compare_price: Some(Decimal::from(150)),
            weight_options: vec!["500g".to_string(), "1kg".to_string()],
            weight_prices: weight_prices.map(str::to_owned),
            stock_quantity: Some(10),
            in_stock: true,
            reviews: None,
        }
    }

    #[test]
    fn test_weight_price_map_structured() {
        let product = millet_flour(Some(
            r#"{"500g":{"price":"80"},"1kg":{"price":"150","comparePrice":"180"}}"#,
        ));
        let map = product.weight_price_map();

        assert_eq!(map.len(), 2);
        assert_eq!(map["500g"].price, Decimal::from(80));
        assert_eq!(map["500g"].compare_price, None);
        assert_eq!(map["1kg"].price, Decimal::from(150));
        assert_eq!(map["1kg"].compare_price, Some(Decimal::from(180)));
    }

    #[test]
    fn test_weight_price_map_legacy_bare_string() {
        let product = millet_flour(Some(r#"{"500g":"80"}"#));
        let map = product.weight_price_map();
        assert_eq!(map["500g"].price, Decimal::from(80));
    }

    #[test]
    fn test_weight_price_map_drops_labels_not_in_options() {
        // "250g" was removed from weight_options; its price must not surface.
        let product = millet_flour(Some(r#"{"250g":{"price":"45"},"500g":{"price":"80"}}"#));
        let map = product.weight_price_map();
        assert!(!map.contains_key("250g"));
        assert!(map.contains_key("500g"));
    }

    #[test]
    fn test_weight_price_map_drops_corrupted_marker() {
        let product = millet_flour(Some(r#"{"500g":{"price":"[object Object]"}}"#));
        assert!(product.weight_price_map().is_empty());
    }

    #[test]
    fn test_weight_price_map_drops_object_price() {
        let product = millet_flour(Some(r#"{"500g":{"price":{"amount":"80"}}}"#));
        assert!(product.weight_price_map().is_empty());
    }

    #[test]
    fn test_weight_price_map_invalid_json_is_empty() {
        let product = millet_flour(Some("{not json"));
        assert!(product.weight_price_map().is_empty());
    }

    #[test]
    fn test_weight_price_map_absent_blob() {
        let product = millet_flour(None);
        assert!(product.weight_price_map().is_empty());
    }

    #[test]
    fn test_average_rating() {
        let mut product = millet_flour(None);
        product.reviews = Some(r#"[{"rating": 4, "text": "good"}, {"rating": 5}]"#.to_string());
        assert!((product.average_rating().unwrap() - 4.5).abs() < f64::EPSILON);

        product.reviews = Some("not json".to_string());
        assert_eq!(product.average_rating(), None);

        product.reviews = None;
        assert_eq!(product.average_rating(), None);
    }

    #[test]
    fn test_product_serde_camel_case() {
        let product = millet_flour(None);
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["stockQuantity"], 10);
        assert_eq!(json["comparePrice"], "150");
        assert_eq!(json["price"], "100");
        assert_eq!(json["inStock"], true);
    }
}
