//! Persistence stores for the storefront.
//!
//! Two backends exist for each store: `PostgreSQL` (production) and
//! in-memory (local dev without a database, and tests). The cart store is
//! the session/cart persistence bridge: carts are keyed by the opaque
//! session identifier carried in the `Session-Id` header.
//!
//! Two sessions (or two tabs) racing on the same cart resolve as
//! last-write-wins at this boundary; the shop accepts that, matching the
//! original system, so no cross-writer locking exists here.
//!
//! # Tables
//!
//! - `product` - catalog rows; `weight_options` and `weight_prices` are
//!   stored as opaque text blobs, parsed at the boundary
//! - `cart_session` - known session identifiers
//! - `cart_item` - cart rows per session; `meta_data` is an opaque text blob
//!
//! Migrations live in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p millet-basket-cli -- migrate
//! ```

pub mod carts;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartStore;
pub use products::{ProductDraft, ProductStore};

/// Errors from the persistence stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity (or session) is unknown.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend failed; the operation is retryable and no partial write
    /// is visible.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
