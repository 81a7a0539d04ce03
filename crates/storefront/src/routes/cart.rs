//! Cart routes.
//!
//! Every handler follows the same load-reconcile-save shape: load the
//! session's line items, hydrate them with fresh product snapshots, run the
//! pure cart operation, and persist the result only if it succeeded. A
//! failed operation therefore never changes what is stored.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use millet_basket_core::cart::{Cart, LineItem, LineItemMeta, ProductSnapshot};
use millet_basket_core::pricing::resolve_price;
use millet_basket_core::summary::summarize;
use millet_basket_core::types::{LineItemId, ProductId};

use crate::db::StoreError;
use crate::error::Result;
use crate::middleware::{CartSession, session_header};
use crate::state::AppState;

/// One cart line as returned to clients. Pricing fields are absent when the
/// referenced product no longer exists in the catalog.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<LineItemId>,
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_total: Option<Decimal>,
}

impl From<&LineItem> for CartItemView {
    fn from(item: &LineItem) -> Self {
        let unit_price = item.unit_price();
        Self {
            id: item.id,
            product_id: item.product_id,
            name: item.product.as_ref().map(|p| p.name.clone()),
            quantity: item.quantity,
            selected_weight: item.meta.selected_weight.clone(),
            unit_price,
            line_total: unit_price.map(|p| p * Decimal::from(item.quantity)),
        }
    }
}

/// The full cart as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub session_id: String,
    pub items: Vec<CartItemView>,
    pub total_quantity: u32,
}

impl CartView {
    fn new(session: &CartSession, cart: &Cart) -> Self {
        Self {
            session_id: session.id.as_str().to_owned(),
            items: cart.items().iter().map(CartItemView::from).collect(),
            total_quantity: cart.total_quantity(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartForm {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub selected_weight: Option<String>,
}

pub(crate) const fn default_quantity() -> u32 {
    1
}

/// Response to an add: the post-merge line plus what actually happened, so
/// the client can message partial (clamped) adds.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartResponse {
    pub item: CartItemView,
    pub added_quantity: u32,
    pub was_clamped: bool,
    pub cart: CartView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityForm {
    pub quantity: u32,
}

/// Load the session's cart with fresh product snapshots attached.
///
/// An unknown session reads as an empty cart; nothing is persisted until
/// the first write. Lines whose product has left the catalog keep their
/// stored fields but carry no snapshot.
pub(crate) async fn load_hydrated(state: &AppState, session: &CartSession) -> Result<Cart> {
    let items = match state.carts().load(&session.id).await {
        Ok(items) => items,
        Err(StoreError::NotFound(_)) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let mut hydrated = Vec::with_capacity(items.len());
    for mut item in items {
        match state.products().get(item.product_id).await {
            Ok(product) => {
                let resolved = resolve_price(&product, item.meta.normalized_weight());
                item.product = Some(ProductSnapshot {
                    name: product.name,
                    unit_price: resolved.price,
                    compare_price: resolved.compare_price,
                    stock_quantity: product.stock_quantity,
                });
            }
            Err(StoreError::NotFound(_)) => {
                warn!(product_id = %item.product_id, "cart references a product no longer in the catalog");
            }
            Err(e) => return Err(e.into()),
        }
        hydrated.push(item);
    }
    Ok(Cart::from_items(hydrated))
}

/// GET /api/cart - the current cart, hydrated with catalog prices.
pub async fn show(
    State(state): State<AppState>,
    session: CartSession,
) -> Result<impl IntoResponse> {
    let cart = load_hydrated(&state, &session).await?;
    Ok((session_header(&session), Json(CartView::new(&session, &cart))))
}

/// POST /api/cart - add a product (at an optional weight) to the cart.
///
/// Merges into the existing `(product, weight)` line when one exists and
/// clamps to available stock; a partial add succeeds with `wasClamped`.
pub async fn add(
    State(state): State<AppState>,
    session: CartSession,
    Json(form): Json<AddToCartForm>,
) -> Result<impl IntoResponse> {
    let product = state.products().get(form.product_id).await?;

    let cart = load_hydrated(&state, &session).await?;
    let (cart, receipt) = cart.add(&product, form.quantity, form.selected_weight.as_deref())?;
    let saved = Cart::from_items(state.carts().save(&session.id, cart.into_items()).await?);

    // Re-find the line in the saved cart so the response carries its id.
    let weight = LineItemMeta::for_weight(form.selected_weight.as_deref());
    let item = saved
        .items()
        .iter()
        .find(|i| {
            i.product_id == product.id && i.meta.normalized_weight() == weight.normalized_weight()
        })
        .map_or_else(|| CartItemView::from(&receipt.line_item), CartItemView::from);

    Ok((
        StatusCode::CREATED,
        session_header(&session),
        Json(AddToCartResponse {
            item,
            added_quantity: receipt.added_quantity,
            was_clamped: receipt.was_clamped,
            cart: CartView::new(&session, &saved),
        }),
    ))
}

/// PUT /api/cart/{item_id} - set a line's quantity (clamped to stock).
pub async fn update(
    State(state): State<AppState>,
    session: CartSession,
    Path(item_id): Path<i32>,
    Json(form): Json<UpdateQuantityForm>,
) -> Result<impl IntoResponse> {
    let cart = load_hydrated(&state, &session).await?;
    let cart = cart.update_quantity(LineItemId::new(item_id), form.quantity)?;
    let saved = Cart::from_items(state.carts().save(&session.id, cart.into_items()).await?);
    Ok((session_header(&session), Json(CartView::new(&session, &saved))))
}

/// DELETE /api/cart/{item_id} - remove a line. Idempotent.
pub async fn remove(
    State(state): State<AppState>,
    session: CartSession,
    Path(item_id): Path<i32>,
) -> Result<impl IntoResponse> {
    let cart = load_hydrated(&state, &session).await?;
    let cart = cart.remove(LineItemId::new(item_id));
    let saved = Cart::from_items(state.carts().save(&session.id, cart.into_items()).await?);
    Ok((session_header(&session), Json(CartView::new(&session, &saved))))
}

/// DELETE /api/cart - empty the cart.
pub async fn clear(
    State(state): State<AppState>,
    session: CartSession,
) -> Result<impl IntoResponse> {
    state.carts().save(&session.id, Vec::new()).await?;
    Ok((StatusCode::NO_CONTENT, session_header(&session)))
}

/// GET /api/cart/summary - order totals for the current cart.
pub async fn summary(
    State(state): State<AppState>,
    session: CartSession,
) -> Result<impl IntoResponse> {
    let cart = load_hydrated(&state, &session).await?;
    let summary = summarize(cart.items(), &state.config().order_rules());
    Ok((session_header(&session), Json(summary)))
}
