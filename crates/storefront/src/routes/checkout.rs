//! Checkout routes.
//!
//! `create_order` turns the cart (or a single buy-now item) into a Razorpay
//! order; the payment itself runs in Razorpay's checkout widget on the
//! client. `confirm` records the widget's outcome: a successful cart
//! checkout empties the cart and sends the confirmation email, a buy-now
//! checkout never touches the cart, and failure leaves the cart intact so
//! the shopper can retry.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use millet_basket_core::cart::Cart;
use millet_basket_core::summary::{OrderSummary, summarize};
use millet_basket_core::types::{Email, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::{CartSession, session_header};
use crate::routes::cart::{default_quantity, load_hydrated};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderForm {
    pub name: String,
    pub email: String,
    /// When present, order this single item instead of the session cart.
    /// The cart is not touched either way.
    #[serde(default)]
    pub buy_now: Option<BuyNowForm>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyNowForm {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub selected_weight: Option<String>,
}

/// Everything the client-side checkout widget needs to open.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub razorpay_order_id: String,
    pub razorpay_key_id: String,
    /// Amount in paise, as the widget expects.
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub summary: OrderSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOrderForm {
    pub success: bool,
    /// The Razorpay order id returned by `create_order`.
    pub order_ref: String,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Present when the order was a buy-now checkout. The session cart was
    /// not part of that order and must survive the confirmation.
    #[serde(default)]
    pub buy_now: Option<BuyNowForm>,
}

/// POST /api/checkout/order - create a Razorpay order for the cart.
pub async fn create_order(
    State(state): State<AppState>,
    session: CartSession,
    Json(form): Json<CreateOrderForm>,
) -> Result<impl IntoResponse> {
    if form.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    let customer = Email::parse(&form.email).map_err(|e| AppError::Validation(e.to_string()))?;

    let cart = match &form.buy_now {
        Some(buy) => {
            let product = state.products().get(buy.product_id).await?;
            let (cart, _) =
                Cart::new().add(&product, buy.quantity, buy.selected_weight.as_deref())?;
            cart
        }
        None => load_hydrated(&state, &session).await?,
    };
    if cart.is_empty() {
        return Err(AppError::Validation("cart is empty".to_string()));
    }

    let summary = summarize(cart.items(), &state.config().order_rules());
    let receipt = format!("mb_{}", Utc::now().timestamp_millis());
    let order = state
        .razorpay()
        .create_order(summary.total, "INR", &receipt)
        .await?;

    debug!(customer = %customer, order_id = %order.id, "checkout order created");

    Ok((
        StatusCode::CREATED,
        session_header(&session),
        Json(CreateOrderResponse {
            razorpay_order_id: order.id,
            razorpay_key_id: state.razorpay().key_id().to_owned(),
            amount: order.amount,
            currency: order.currency,
            receipt,
            summary,
        }),
    ))
}

/// POST /api/checkout/confirm - record the checkout widget's outcome.
///
/// A successful cart checkout empties the cart; a successful buy-now
/// checkout leaves it alone, since the cart was never part of the order.
/// Either way a best-effort confirmation email goes out (a mail failure
/// never fails the order). Failure preserves the cart.
pub async fn confirm(
    State(state): State<AppState>,
    session: CartSession,
    Json(form): Json<ConfirmOrderForm>,
) -> Result<impl IntoResponse> {
    if !form.success {
        info!(order_ref = %form.order_ref, "payment failed, cart preserved");
        return Ok((
            session_header(&session),
            Json(status_body("failed", &form.order_ref)),
        ));
    }

    let summary = match &form.buy_now {
        Some(buy) => {
            // Rebuild the single-item order for the email totals.
            let product = state.products().get(buy.product_id).await?;
            let (ordered, _) =
                Cart::new().add(&product, buy.quantity, buy.selected_weight.as_deref())?;
            summarize(ordered.items(), &state.config().order_rules())
        }
        None => {
            // Totals for the email, captured before the cart is emptied.
            let cart = load_hydrated(&state, &session).await?;
            let summary = summarize(cart.items(), &state.config().order_rules());
            state.carts().save(&session.id, Vec::new()).await?;
            summary
        }
    };

    info!(
        order_ref = %form.order_ref,
        payment_id = form.razorpay_payment_id.as_deref().unwrap_or("-"),
        "order confirmed"
    );

    if let (Some(service), Some(raw)) = (state.email(), form.email.as_deref()) {
        match Email::parse(raw) {
            Ok(to) => {
                let name = form.name.as_deref().unwrap_or("there");
                if let Err(e) = service
                    .send_order_confirmation(&to, name, &form.order_ref, &summary)
                    .await
                {
                    warn!(error = %e, order_ref = %form.order_ref, "confirmation email failed");
                }
            }
            Err(e) => {
                warn!(error = %e, "skipping confirmation email, bad address");
            }
        }
    }

    Ok((
        session_header(&session),
        Json(status_body("confirmed", &form.order_ref)),
    ))
}

fn status_body(status: &str, order_ref: &str) -> Value {
    json!({ "status": status, "orderRef": order_ref })
}
