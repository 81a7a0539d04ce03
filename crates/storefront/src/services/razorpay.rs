//! Razorpay Orders API client.
//!
//! The storefront only *creates* orders here; the payment itself runs in
//! Razorpay's checkout widget and its result verification is the gateway's
//! concern, opaque to this service. Amounts are in paise (the smallest
//! currency unit).

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::RazorpayConfig;

/// Errors from the Razorpay Orders API.
#[derive(Debug, thiserror::Error)]
pub enum RazorpayError {
    /// HTTP transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API rejected the request.
    #[error("razorpay api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The order total does not convert to a whole number of paise.
    #[error("invalid order amount: {0}")]
    InvalidAmount(Decimal),
}

/// A created Razorpay order, handed to the client-side checkout widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Client for the Razorpay Orders API.
#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    key_id: String,
    key_secret: SecretString,
    base_url: String,
}

impl RazorpayClient {
    /// Create a new client from configuration.
    #[must_use]
    pub fn new(config: &RazorpayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            base_url: config.base_url.clone(),
        }
    }

    /// The public key id, exposed to the checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create an order for `total` (major currency units, e.g. rupees).
    ///
    /// # Errors
    ///
    /// - [`RazorpayError::InvalidAmount`] if the total does not convert to
    ///   whole paise.
    /// - [`RazorpayError::Api`] if the gateway rejects the request.
    /// - [`RazorpayError::Transport`] on network failure.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        total: Decimal,
        currency: &str,
        receipt: &str,
    ) -> Result<RazorpayOrder, RazorpayError> {
        let amount = to_paise(total).ok_or(RazorpayError::InvalidAmount(total))?;

        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&json!({
                "amount": amount,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RazorpayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order: RazorpayOrder = response.json().await?;
        debug!(order_id = %order.id, amount, "created razorpay order");
        Ok(order)
    }
}

/// Convert a major-unit decimal amount to paise, rounding to the nearest
/// paisa (half-up) first.
fn to_paise(total: Decimal) -> Option<i64> {
    let paise = (total * Decimal::from(100)).round_dp_with_strategy(
        0,
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    );
    paise.to_i64().filter(|amount| *amount >= 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_paise() {
        assert_eq!(to_paise(Decimal::from(365)), Some(36500));
        assert_eq!(to_paise("365.50".parse().unwrap()), Some(36550));
        assert_eq!(to_paise("0.005".parse().unwrap()), Some(1));
        assert_eq!(to_paise(Decimal::ZERO), Some(0));
        assert_eq!(to_paise(Decimal::from(-1)), None);
    }
}
