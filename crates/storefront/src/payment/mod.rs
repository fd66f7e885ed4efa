//! Payment provider client.
//!
//! Talks to a Stripe-style payment-intents REST API. The storefront creates
//! an intent for the engine's order total, hands its client secret to the
//! browser for confirmation, then reads the intent back before attaching the
//! payment to the engine order.
//!
//! The checkout flow depends on [`PaymentProvider`] rather than on
//! [`PaymentClient`] directly.

mod client;

pub use client::PaymentClient;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use quayside_core::{Money, OrderCode, PaymentIntentId};

/// Metadata key linking an intent to its engine order.
pub const ORDER_CODE_METADATA_KEY: &str = "order_code";

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("Payment provider error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl PaymentError {
    /// Whether re-submitting the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Parse(_) => false,
        }
    }
}

/// Lifecycle status of a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

impl IntentStatus {
    /// Funds are captured or held for capture.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Succeeded | Self::RequiresCapture)
    }

    /// The browser can still confirm this intent.
    #[must_use]
    pub const fn is_reusable(self) -> bool {
        matches!(
            self,
            Self::RequiresPaymentMethod | Self::RequiresConfirmation | Self::RequiresAction
        )
    }
}

/// The last failed charge attempt on an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPaymentError {
    pub message: Option<String>,
    pub code: Option<String>,
}

/// A payment intent as returned by the provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: PaymentIntentId,
    /// Amount in the currency's minor units.
    pub amount: i64,
    /// Lower-case ISO currency code.
    pub currency: String,
    pub status: IntentStatus,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub last_payment_error: Option<LastPaymentError>,
}

impl PaymentIntent {
    /// The engine order code this intent was created for.
    #[must_use]
    pub fn order_code(&self) -> Option<&str> {
        self.metadata
            .get(ORDER_CODE_METADATA_KEY)
            .map(String::as_str)
    }

    /// The provider's message for the last failed attempt.
    #[must_use]
    pub fn decline_message(&self) -> Option<&str> {
        self.last_payment_error
            .as_ref()
            .and_then(|e| e.message.as_deref())
    }
}

impl std::fmt::Debug for PaymentIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentIntent")
            .field("id", &self.id)
            .field("amount", &self.amount)
            .field("currency", &self.currency)
            .field("status", &self.status)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("metadata", &self.metadata)
            .field("last_payment_error", &self.last_payment_error)
            .finish()
    }
}

/// Parameters for creating an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    pub amount: Money,
    pub order_code: OrderCode,
    /// Sent as the `Idempotency-Key` header.
    pub idempotency_key: String,
}

/// Payment intent operations the checkout flow needs.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create an intent; repeated calls with the same idempotency key return
    /// the same intent.
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError>;

    /// Read an intent's current state.
    async fn retrieve_intent(&self, id: &PaymentIntentId) -> Result<PaymentIntent, PaymentError>;

    /// Payment method code registered on the commerce engine for this provider.
    fn method_code(&self) -> &str;
}
