//! Public product catalog routes.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use millet_basket_core::pricing::resolve_price;
use millet_basket_core::product::{Product, WeightPrice};
use millet_basket_core::types::ProductId;

use crate::error::Result;
use crate::state::AppState;

/// A catalog product plus the derived fields clients would otherwise have
/// to compute: the parsed weight price map (raw `weightPrices` blobs can be
/// corrupt), the average review rating, and the base-price discount.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    product: Product,
    weight_price_map: BTreeMap<String, WeightPrice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    average_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    discount_percent: Option<u32>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let weight_price_map = product.weight_price_map();
        let average_rating = product.average_rating();
        let discount_percent = resolve_price(&product, None).discount_percent();
        Self {
            product,
            weight_price_map,
            average_rating,
            discount_percent,
        }
    }
}

/// GET /api/products - the whole catalog, ordered by id.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let products = state.products().list().await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// GET /api/products/{key} - a single product by numeric id or slug.
pub async fn show(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ProductView>> {
    let product = match key.parse::<i32>() {
        Ok(id) => state.products().get(ProductId::new(id)).await?,
        Err(_) => state.products().get_by_slug(&key).await?,
    };
    Ok(Json(ProductView::from(product)))
}
