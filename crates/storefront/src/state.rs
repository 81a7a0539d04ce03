//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::{CartStore, ProductStore};
use crate::services::{EmailService, RazorpayClient};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to configuration, the
/// persistence stores, and the external service clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    carts: CartStore,
    products: ProductStore,
    razorpay: RazorpayClient,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The stores are passed in (Postgres in production, in-memory for local
    /// dev and tests); the Razorpay client and optional email service are
    /// built from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay configuration is invalid.
    pub fn new(
        config: StorefrontConfig,
        carts: CartStore,
        products: ProductStore,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let razorpay = RazorpayClient::new(&config.razorpay);
        let email = config
            .smtp
            .as_ref()
            .map(EmailService::new)
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                carts,
                products,
                razorpay,
                email,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }

    /// Get a reference to the product store.
    #[must_use]
    pub fn products(&self) -> &ProductStore {
        &self.inner.products
    }

    /// Get a reference to the Razorpay client.
    #[must_use]
    pub fn razorpay(&self) -> &RazorpayClient {
        &self.inner.razorpay
    }

    /// Get the email service, if configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }
}
