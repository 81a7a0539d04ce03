//! Integration test harness for Millet Basket.
//!
//! Boots the full storefront router on an ephemeral port with in-memory
//! stores, plus a local Razorpay mock so checkout runs end to end without
//! network access or credentials. Tests drive the real HTTP surface with
//! `reqwest`.
//!
//! ```bash
//! cargo test -p millet-basket-integration-tests
//! ```

#![allow(clippy::expect_used)] // test harness, failures should panic loudly

use axum::{Json, Router, routing::post};
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};

use millet_basket_storefront::config::{
    CheckoutConfig, RazorpayConfig, StorefrontConfig,
};
use millet_basket_storefront::db::{CartStore, ProductStore};
use millet_basket_storefront::state::AppState;

/// Admin token used by the test configuration.
pub const ADMIN_TOKEN: &str = "itest-9fK2mQ7xW4bZ8cV1nL5pR3tY6uH0dJ";

/// A running storefront instance backed by in-memory stores.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl TestContext {
    /// Start the storefront and its Razorpay mock on ephemeral ports.
    pub async fn start() -> Self {
        let razorpay_base_url = spawn_razorpay_mock().await;

        let config = test_config(razorpay_base_url);
        let state = AppState::new(config, CartStore::memory(), ProductStore::memory())
            .expect("Failed to build application state");
        let app = millet_basket_storefront::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
        }
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Insert a product through the admin API, returning the stored product.
    pub async fn seed_product(&self, draft: Value) -> Value {
        let resp = self
            .client
            .post(self.url("/api/admin/products"))
            .header("X-Admin-Token", ADMIN_TOKEN)
            .json(&draft)
            .send()
            .await
            .expect("Failed to seed product");
        assert_eq!(resp.status(), 201, "seeding must succeed");
        resp.json().await.expect("Failed to parse seeded product")
    }
}

/// A minimal product draft for seeding, with tracked stock.
#[must_use]
pub fn millet_draft(slug: &str, stock: u32) -> Value {
    json!({
        "slug": slug,
        "name": "Ragi Flour",
        "description": "Stone-ground finger millet flour.",
        "category": "flour",
        "price": "100",
        "comparePrice": "150",
        "weightOptions": ["500g", "1kg"],
        "weightPrices": r#"{"500g":{"price":"100","comparePrice":"150"},"1kg":{"price":"180","comparePrice":"260"}}"#,
        "stockQuantity": stock,
    })
}

fn test_config(razorpay_base_url: String) -> StorefrontConfig {
    StorefrontConfig {
        database_url: None,
        host: "127.0.0.1".parse().expect("valid host"),
        port: 0,
        base_url: "http://localhost".to_string(),
        admin_api_token: SecretString::from(ADMIN_TOKEN),
        checkout: CheckoutConfig {
            shipping_flat_rate: rust_decimal::Decimal::from(50),
            tax_rate: "0.05".parse().expect("valid rate"),
            ship_empty_carts: false,
        },
        razorpay: RazorpayConfig {
            key_id: "rzp_test_itest".to_string(),
            key_secret: SecretString::from("itest_key"),
            base_url: razorpay_base_url,
        },
        smtp: None,
        sentry_dsn: None,
    }
}

/// Spawn a Razorpay Orders API stand-in that echoes the requested amount.
async fn spawn_razorpay_mock() -> String {
    let app = Router::new().route(
        "/v1/orders",
        post(|Json(body): Json<Value>| async move {
            Json(json!({
                "id": "order_itest123",
                "amount": body["amount"],
                "currency": body["currency"],
                "receipt": body["receipt"],
                "status": "created",
            }))
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock server error");
    });

    format!("http://{addr}")
}
