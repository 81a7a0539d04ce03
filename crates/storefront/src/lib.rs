//! Millet Basket storefront library.
//!
//! The storefront is a JSON API serving the shop's React client: product
//! catalog, per-session cart, order summaries, and Razorpay checkout. This
//! crate exposes the router so integration tests can drive the full HTTP
//! surface against in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::http::HeaderName;
use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the complete application router.
///
/// The client is a separate single-page app, so CORS is open and the
/// `Session-Id` response header is exposed to browser scripts.
#[must_use]
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static("session-id")]);

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(cors)
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
