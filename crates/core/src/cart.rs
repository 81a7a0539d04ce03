//! Cart reconciliation.
//!
//! A [`Cart`] is an ordered list of line items keyed by
//! `(product_id, normalized weight)`. Operations are pure: they take the
//! current cart and return a new one, leaving persistence to the caller.
//! On any error the input cart is unchanged.
//!
//! Invariants upheld here:
//! - at most one line item per `(product_id, normalized weight)` pair;
//! - a line's quantity never exceeds the product's stock when tracked;
//! - quantity-0 line items are never materialized.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pricing::resolve_price;
use crate::product::Product;
use crate::types::{LineItemId, ProductId};

/// Errors from cart operations. Clamped partial adds are not errors; the
/// only hard failures are invalid input, an already-full line, and an
/// unknown line item id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// Requested quantity is zero (or otherwise not a positive integer).
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The cart already holds the maximum available stock for this
    /// product/weight; nothing could be added.
    #[error("maximum available quantity ({max}) already in cart")]
    AtCapacity {
        /// The stock cap that was hit.
        max: u32,
    },

    /// No line item with the given id exists in the cart.
    #[error("cart line item not found: {0}")]
    LineItemNotFound(LineItemId),
}

/// Structured line-item metadata.
///
/// Persisted as an opaque JSON string (`metaData`) for compatibility with
/// the original cart rows; parsed leniently at the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_weight: Option<String>,
}

impl LineItemMeta {
    /// Build metadata for a weight selection, normalizing empty to none.
    #[must_use]
    pub fn for_weight(selected_weight: Option<&str>) -> Self {
        Self {
            selected_weight: normalize_weight(selected_weight).map(str::to_owned),
        }
    }

    /// Parse from the stored `metaData` JSON string.
    ///
    /// Malformed metadata is treated as "no weight selected" and logged,
    /// matching how unknown blobs are handled elsewhere at the boundary.
    #[must_use]
    pub fn from_meta_data(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str(raw) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(error = %e, "malformed line-item metadata, treating as no weight");
                Self::default()
            }
        }
    }

    /// Serialize to the stored `metaData` JSON string. `None` when there is
    /// nothing to record.
    #[must_use]
    pub fn to_meta_data(&self) -> Option<String> {
        self.selected_weight.as_ref()?;
        serde_json::to_string(self).ok()
    }

    /// The weight key used for line matching: `None` and `""` are the same.
    #[must_use]
    pub fn normalized_weight(&self) -> Option<&str> {
        normalize_weight(self.selected_weight.as_deref())
    }
}

/// Display/pricing snapshot of the product, captured when the line is
/// created so downstream summary math uses the weight-resolved unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub name: String,
    /// Weight-resolved unit price (the "display price").
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_price: Option<Decimal>,
    /// Stock cap at the time of attachment; `None` = not tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,
}

/// One row in the cart: a product at a weight option and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Assigned by the store on first save; `None` until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LineItemId>,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub meta: LineItemMeta,
    /// Transient, attached for display and pricing; not persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSnapshot>,
}

impl LineItem {
    /// The unit price captured on this line, if a snapshot is attached.
    #[must_use]
    pub fn unit_price(&self) -> Option<Decimal> {
        self.product.as_ref().map(|p| p.unit_price)
    }

    fn matches(&self, product_id: ProductId, weight: Option<&str>) -> bool {
        self.product_id == product_id && self.meta.normalized_weight() == weight
    }
}

/// Result of a successful add: the post-merge line plus what actually
/// happened, for UI messaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddReceipt {
    /// The line item after the add (merged or newly created).
    pub line_item: LineItem,
    /// How many units were actually added (may be less than requested).
    pub added_quantity: u32,
    /// True whenever `added_quantity < requested` (partial add is still a
    /// success).
    pub was_clamped: bool,
}

/// An ordered list of cart line items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from already-persisted line items.
    #[must_use]
    pub fn from_items(items: Vec<LineItem>) -> Self {
        Self { items }
    }

    /// The line items, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Consume the cart, returning its line items.
    #[must_use]
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total unit count across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Add `quantity` of `product` at `selected_weight` to the cart.
    ///
    /// Merges into an existing `(product_id, weight)` line when one exists.
    /// A single add is clamped to available stock; a merge is clamped so the
    /// line never exceeds stock. Partial adds succeed with
    /// `was_clamped = true`.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidQuantity`] if `quantity` is zero.
    /// - [`CartError::AtCapacity`] if nothing at all could be added; the
    ///   cart is left unchanged.
    pub fn add(
        &self,
        product: &Product,
        quantity: u32,
        selected_weight: Option<&str>,
    ) -> Result<(Self, AddReceipt), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let weight = normalize_weight(selected_weight);
        let max = product.max_quantity();

        // Clamp a single add to available stock.
        let requested = max.map_or(quantity, |m| quantity.min(m));

        if let Some(existing) = self
            .items
            .iter()
            .find(|item| item.matches(product.id, weight))
        {
            let added = match max {
                Some(m) => {
                    let allowed = m.saturating_sub(existing.quantity);
                    if allowed == 0 {
                        return Err(CartError::AtCapacity { max: m });
                    }
                    requested.min(allowed)
                }
                None => requested,
            };

            let mut cart = self.clone();
            let line_item = cart
                .items
                .iter_mut()
                .find(|item| item.matches(product.id, weight))
                .map(|item| {
                    item.quantity += added;
                    item.clone()
                })
                .ok_or(CartError::InvalidQuantity)?;

            return Ok((
                cart,
                AddReceipt {
                    line_item,
                    added_quantity: added,
                    was_clamped: added < quantity,
                },
            ));
        }

        // New line. Never materialize a quantity-0 item: if stock is
        // exhausted, reject instead.
        if requested == 0 {
            return Err(CartError::AtCapacity {
                max: max.unwrap_or(0),
            });
        }

        let resolved = resolve_price(product, weight);
        let line_item = LineItem {
            id: None,
            product_id: product.id,
            quantity: requested,
            meta: LineItemMeta::for_weight(weight),
            product: Some(ProductSnapshot {
                name: product.name.clone(),
                unit_price: resolved.price,
                compare_price: resolved.compare_price,
                stock_quantity: max,
            }),
        };

        let mut cart = self.clone();
        cart.items.push(line_item.clone());

        Ok((
            cart,
            AddReceipt {
                line_item,
                added_quantity: requested,
                was_clamped: requested < quantity,
            },
        ))
    }

    /// Set the quantity of an existing line, clamped to `[1, stock]`.
    ///
    /// Never creates or deletes items.
    ///
    /// # Errors
    ///
    /// [`CartError::LineItemNotFound`] if no line carries `line_item_id`.
    pub fn update_quantity(
        &self,
        line_item_id: LineItemId,
        new_quantity: u32,
    ) -> Result<Self, CartError> {
        let pos = self
            .items
            .iter()
            .position(|item| item.id == Some(line_item_id))
            .ok_or(CartError::LineItemNotFound(line_item_id))?;

        let mut cart = self.clone();
        if let Some(item) = cart.items.get_mut(pos) {
            let stock = item.product.as_ref().and_then(|p| p.stock_quantity);
            let mut quantity = new_quantity.max(1);
            if let Some(stock) = stock {
                quantity = quantity.min(stock.max(1));
            }
            item.quantity = quantity;
        }
        Ok(cart)
    }

    /// Remove a line item by id. Idempotent: removing an absent id is a
    /// no-op, not an error.
    #[must_use]
    pub fn remove(&self, line_item_id: LineItemId) -> Self {
        let items = self
            .items
            .iter()
            .filter(|item| item.id != Some(line_item_id))
            .cloned()
            .collect();
        Self { items }
    }

    /// An emptied cart. Always succeeds.
    #[must_use]
    pub const fn clear(&self) -> Self {
        Self::new()
    }
}

/// Treat `None`, empty, and missing weights as the same "no weight" key.
fn normalize_weight(weight: Option<&str>) -> Option<&str> {
    weight.filter(|w| !w.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(stock: Option<u32>, weight_prices: Option<&str>) -> Product {
        Product {
            id: ProductId::new(1),
            slug: "jowar-flakes".to_string(),
            name: "Jowar Flakes".to_string(),
            description: String::new(),
            image_url: None,
            category: None,
            price: Decimal::from(100),
            compare_price: None,
            weight_options: vec!["500g".to_string(), "1kg".to_string()],
            weight_prices: weight_prices.map(str::to_owned),
            stock_quantity: stock,
            in_stock: stock != Some(0),
            reviews: None,
        }
    }

    fn with_ids(cart: Cart) -> Cart {
        // Simulate the store assigning ids on save.
        let items = cart
            .into_items()
            .into_iter()
            .enumerate()
            .map(|(i, mut item)| {
                if item.id.is_none() {
                    item.id = Some(LineItemId::new(i32::try_from(i).unwrap() + 1));
                }
                item
            })
            .collect();
        Cart::from_items(items)
    }

    #[test]
    fn test_add_weight_variant_merges_same_line() {
        // Scenario B: add 1kg twice, one line at quantity 2, price 150.
        let p = product(
            Some(10),
            Some(r#"{"500g":{"price":"80"},"1kg":{"price":"150"}}"#),
        );

        let (cart, receipt) = Cart::new().add(&p, 1, Some("1kg")).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(receipt.added_quantity, 1);
        assert!(!receipt.was_clamped);
        assert_eq!(receipt.line_item.unit_price(), Some(Decimal::from(150)));

        let (cart, receipt) = cart.add(&p, 1, Some("1kg")).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(receipt.line_item.unit_price(), Some(Decimal::from(150)));
    }

    #[test]
    fn test_add_different_weights_are_separate_lines() {
        let p = product(
            Some(10),
            Some(r#"{"500g":{"price":"80"},"1kg":{"price":"150"}}"#),
        );

        let (cart, _) = Cart::new().add(&p, 1, Some("500g")).unwrap();
        let (cart, _) = cart.add(&p, 1, Some("1kg")).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].unit_price(), Some(Decimal::from(80)));
        assert_eq!(cart.items()[1].unit_price(), Some(Decimal::from(150)));
    }

    #[test]
    fn test_empty_and_missing_weight_share_a_line() {
        let p = product(Some(10), None);

        let (cart, _) = Cart::new().add(&p, 1, None).unwrap();
        let (cart, _) = cart.add(&p, 1, Some("")).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_single_add_clamped_to_stock() {
        let p = product(Some(5), None);

        let (cart, receipt) = Cart::new().add(&p, 8, None).unwrap();
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(receipt.added_quantity, 5);
        assert!(receipt.was_clamped);
    }

    #[test]
    fn test_merge_clamped_to_stock() {
        // Scenario C: stock 5, cart has 4, add 3 -> only 1 added.
        let p = product(Some(5), None);

        let (cart, _) = Cart::new().add(&p, 4, None).unwrap();
        let (cart, receipt) = cart.add(&p, 3, None).unwrap();

        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(receipt.added_quantity, 1);
        assert!(receipt.was_clamped);
    }

    #[test]
    fn test_add_at_capacity_rejected_without_mutation() {
        // Scenario D: stock 5, cart has 5, add 1 -> rejected.
        let p = product(Some(5), None);

        let (cart, _) = Cart::new().add(&p, 5, None).unwrap();
        let err = cart.add(&p, 1, None).unwrap_err();

        assert_eq!(err, CartError::AtCapacity { max: 5 });
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn test_add_zero_stock_rejected() {
        let p = product(Some(0), None);
        let err = Cart::new().add(&p, 1, None).unwrap_err();
        assert_eq!(err, CartError::AtCapacity { max: 0 });
    }

    #[test]
    fn test_add_zero_quantity_rejected() {
        let p = product(Some(5), None);
        assert_eq!(
            Cart::new().add(&p, 0, None).unwrap_err(),
            CartError::InvalidQuantity
        );
    }

    #[test]
    fn test_untracked_stock_is_unlimited() {
        let p = product(None, None);
        let (cart, receipt) = Cart::new().add(&p, 1000, None).unwrap();
        assert_eq!(cart.items()[0].quantity, 1000);
        assert!(!receipt.was_clamped);
    }

    #[test]
    fn test_update_quantity_clamps() {
        let p = product(Some(5), None);
        let (cart, _) = Cart::new().add(&p, 2, None).unwrap();
        let cart = with_ids(cart);
        let id = cart.items()[0].id.unwrap();

        let cart = cart.update_quantity(id, 9).unwrap();
        assert_eq!(cart.items()[0].quantity, 5);

        let cart = cart.update_quantity(id, 0).unwrap();
        assert_eq!(cart.items()[0].quantity, 1);

        let cart = cart.update_quantity(id, 3).unwrap();
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_update_quantity_unknown_id() {
        let cart = Cart::new();
        assert_eq!(
            cart.update_quantity(LineItemId::new(99), 1).unwrap_err(),
            CartError::LineItemNotFound(LineItemId::new(99))
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let p = product(Some(5), None);
        let (cart, _) = Cart::new().add(&p, 2, None).unwrap();
        let cart = with_ids(cart);
        let id = cart.items()[0].id.unwrap();

        let once = cart.remove(id);
        let twice = once.remove(id);
        assert!(once.is_empty());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clear() {
        let p = product(Some(5), None);
        let (cart, _) = Cart::new().add(&p, 2, None).unwrap();
        assert!(cart.clear().is_empty());
    }

    #[test]
    fn test_invariants_after_add_sequences() {
        // After any sequence of adds: one line per (product, weight) and
        // every quantity within stock.
        let flour = product(Some(5), Some(r#"{"500g":{"price":"80"}}"#));
        let mut other = product(Some(3), None);
        other.id = ProductId::new(2);
        other.slug = "bajra-flour".to_string();

        let adds: &[(&Product, u32, Option<&str>)] = &[
            (&flour, 2, Some("500g")),
            (&other, 1, None),
            (&flour, 2, Some("500g")),
            (&flour, 4, Some("500g")), // clamps to 1
            (&other, 9, None),         // clamps to 2
            (&flour, 1, None),         // separate "no weight" line
        ];

        let mut cart = Cart::new();
        for &(p, qty, weight) in adds {
            if let Ok((next, _)) = cart.add(p, qty, weight) {
                cart = next;
            }
        }

        let mut keys: Vec<(ProductId, Option<String>)> = cart
            .items()
            .iter()
            .map(|i| {
                (
                    i.product_id,
                    i.meta.normalized_weight().map(str::to_owned),
                )
            })
            .collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total, "duplicate (product, weight) line");

        for item in cart.items() {
            let stock = item.product.as_ref().and_then(|p| p.stock_quantity);
            if let Some(stock) = stock {
                assert!(item.quantity <= stock);
            }
            assert!(item.quantity >= 1);
        }
    }

    #[test]
    fn test_meta_data_roundtrip() {
        let meta = LineItemMeta::for_weight(Some("1kg"));
        let raw = meta.to_meta_data().unwrap();
        assert_eq!(raw, r#"{"selectedWeight":"1kg"}"#);
        assert_eq!(LineItemMeta::from_meta_data(Some(&raw)), meta);

        assert_eq!(
            LineItemMeta::from_meta_data(None),
            LineItemMeta::default()
        );
        assert_eq!(
            LineItemMeta::from_meta_data(Some("{garbled")),
            LineItemMeta::default()
        );
        assert_eq!(LineItemMeta::for_weight(Some("")).to_meta_data(), None);
    }
}
