//! Order emails over SMTP via lettre.
//!
//! Plain-text bodies only; email is best-effort and its failures never fail
//! the order (callers log and continue).

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use millet_basket_core::Email;
use millet_basket_core::summary::OrderSummary;

use crate::config::SmtpConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for transactional order mail.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from.clone(),
        })
    }

    /// Send the order confirmation email.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` on address, build, or transport failure.
    pub async fn send_order_confirmation(
        &self,
        to: &Email,
        name: &str,
        order_ref: &str,
        summary: &OrderSummary,
    ) -> Result<(), EmailError> {
        let body = format!(
            "Hi {name},\n\n\
             Thank you for your order {order_ref} from Millet Basket!\n\n\
             Subtotal: \u{20b9}{}\n\
             Shipping: \u{20b9}{}\n\
             Tax:      \u{20b9}{}\n\
             Total:    \u{20b9}{}\n\n\
             We will email you again once your order ships.\n\n\
             The Millet Basket team\n",
            summary.subtotal, summary.shipping, summary.tax, summary.total
        );

        self.send(to, &format!("Order confirmation {order_ref}"), body)
            .await
    }

    /// Send the shipping notification email.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` on address, build, or transport failure.
    pub async fn send_shipping_notification(
        &self,
        to: &Email,
        name: &str,
        order_ref: &str,
        tracking_number: Option<&str>,
    ) -> Result<(), EmailError> {
        let tracking = tracking_number
            .map(|t| format!("Tracking number: {t}\n\n"))
            .unwrap_or_default();
        let body = format!(
            "Hi {name},\n\n\
             Good news - your order {order_ref} is on its way!\n\n\
             {tracking}\
             The Millet Basket team\n"
        );

        self.send(to, &format!("Your order {order_ref} has shipped"), body)
            .await
    }

    async fn send(&self, to: &Email, subject: &str, body: String) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.mailer.send(message).await?;
        Ok(())
    }
}
