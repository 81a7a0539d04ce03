//! HTTP route handlers.
//!
//! | Method | Path                           | Handler                  |
//! |--------|--------------------------------|--------------------------|
//! | GET    | /api/products                  | `products::list`         |
//! | GET    | /api/products/{key}            | `products::show`         |
//! | GET    | /api/cart                      | `cart::show`             |
//! | POST   | /api/cart                      | `cart::add`              |
//! | DELETE | /api/cart                      | `cart::clear`            |
//! | GET    | /api/cart/summary              | `cart::summary`          |
//! | PUT    | /api/cart/{item_id}            | `cart::update`           |
//! | DELETE | /api/cart/{item_id}            | `cart::remove`           |
//! | POST   | /api/checkout/order            | `checkout::create_order` |
//! | POST   | /api/checkout/confirm          | `checkout::confirm`      |
//! | POST   | /api/admin/products            | `admin::upsert_product`  |
//! | PUT    | /api/admin/products/{id}/stock | `admin::set_stock`       |
//! | POST   | /api/admin/orders/{order_ref}/shipped | `admin::order_shipped` |
//!
//! Cart and checkout routes carry the session in the `Session-Id` header,
//! both directions. Admin routes require the `X-Admin-Token` header.

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::AppState;

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod products;

/// Build the API route table.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::list))
        .route("/api/products/{key}", get(products::show))
        .route(
            "/api/cart",
            get(cart::show).post(cart::add).delete(cart::clear),
        )
        .route("/api/cart/summary", get(cart::summary))
        .route(
            "/api/cart/{item_id}",
            put(cart::update).delete(cart::remove),
        )
        .route("/api/checkout/order", post(checkout::create_order))
        .route("/api/checkout/confirm", post(checkout::confirm))
        .route("/api/admin/products", post(admin::upsert_product))
        .route("/api/admin/products/{id}/stock", put(admin::set_stock))
        .route(
            "/api/admin/orders/{order_ref}/shipped",
            post(admin::order_shipped),
        )
}
