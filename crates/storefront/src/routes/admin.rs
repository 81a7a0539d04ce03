//! Catalog administration routes.
//!
//! Guarded by the `X-Admin-Token` header, checked against
//! `ADMIN_API_TOKEN`. These exist for seeding and back-office tooling; the
//! public storefront never writes to the catalog.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use secrecy::ExposeSecret;
use serde::Deserialize;

use millet_basket_core::product::Product;
use millet_basket_core::types::{Email, ProductId};

use crate::db::ProductDraft;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Header carrying the admin token.
pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if presented.is_empty() || presented != state.config().admin_api_token.expose_secret() {
        return Err(AppError::Unauthorized(
            "missing or invalid admin token".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/admin/products - insert or update (by slug) a product.
pub async fn upsert_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse> {
    authorize(&state, &headers)?;
    let product = state.products().upsert(draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStockForm {
    pub stock_quantity: u32,
}

/// PUT /api/admin/products/{id}/stock - set stock, keeping `inStock` in sync.
pub async fn set_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(form): Json<SetStockForm>,
) -> Result<Json<Product>> {
    authorize(&state, &headers)?;
    let product = state
        .products()
        .set_stock(ProductId::new(id), form.stock_quantity)
        .await?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippedForm {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// POST /api/admin/orders/{order_ref}/shipped - email the customer that
/// their order is on its way.
///
/// Orders are not persisted server-side, so the back-office supplies the
/// customer's address along with the order reference.
pub async fn order_shipped(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_ref): Path<String>,
    Json(form): Json<ShippedForm>,
) -> Result<StatusCode> {
    authorize(&state, &headers)?;
    let to = Email::parse(&form.email).map_err(|e| AppError::Validation(e.to_string()))?;

    let Some(service) = state.email() else {
        return Err(AppError::Internal(
            "email service is not configured".to_string(),
        ));
    };
    service
        .send_shipping_notification(
            &to,
            form.name.as_deref().unwrap_or("there"),
            &order_ref,
            form.tracking_number.as_deref(),
        )
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}
