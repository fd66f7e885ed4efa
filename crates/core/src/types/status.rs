//! Status enums reported by the commerce engine.
//!
//! The engine owns the order, payment and job state machines. Quayside only
//! classifies the string values it receives, so every enum here keeps an
//! `Other` fallback for custom states configured on the engine side.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Order lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderState {
    Created,
    Draft,
    AddingItems,
    ArrangingPayment,
    PaymentAuthorized,
    PaymentSettled,
    PartiallyShipped,
    Shipped,
    PartiallyDelivered,
    Delivered,
    Modifying,
    ArrangingAdditionalPayment,
    Cancelled,
    /// A custom state registered by an engine plugin.
    Other(String),
}

impl OrderState {
    /// The state string used by the engine.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "Created",
            Self::Draft => "Draft",
            Self::AddingItems => "AddingItems",
            Self::ArrangingPayment => "ArrangingPayment",
            Self::PaymentAuthorized => "PaymentAuthorized",
            Self::PaymentSettled => "PaymentSettled",
            Self::PartiallyShipped => "PartiallyShipped",
            Self::Shipped => "Shipped",
            Self::PartiallyDelivered => "PartiallyDelivered",
            Self::Delivered => "Delivered",
            Self::Modifying => "Modifying",
            Self::ArrangingAdditionalPayment => "ArrangingAdditionalPayment",
            Self::Cancelled => "Cancelled",
            Self::Other(s) => s,
        }
    }

    /// Whether the storefront may still mutate the order (lines, address,
    /// shipping, payment).
    ///
    /// Unknown custom states are treated as locked.
    #[must_use]
    pub const fn is_modifiable(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Draft | Self::AddingItems | Self::ArrangingPayment
        )
    }

    /// Whether the order has left the checkout flow for good.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PaymentAuthorized
                | Self::PaymentSettled
                | Self::PartiallyShipped
                | Self::Shipped
                | Self::PartiallyDelivered
                | Self::Delivered
                | Self::Cancelled
        )
    }
}

impl From<String> for OrderState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Created" => Self::Created,
            "Draft" => Self::Draft,
            "AddingItems" => Self::AddingItems,
            "ArrangingPayment" => Self::ArrangingPayment,
            "PaymentAuthorized" => Self::PaymentAuthorized,
            "PaymentSettled" => Self::PaymentSettled,
            "PartiallyShipped" => Self::PartiallyShipped,
            "Shipped" => Self::Shipped,
            "PartiallyDelivered" => Self::PartiallyDelivered,
            "Delivered" => Self::Delivered,
            "Modifying" => Self::Modifying,
            "ArrangingAdditionalPayment" => Self::ArrangingAdditionalPayment,
            "Cancelled" => Self::Cancelled,
            _ => Self::Other(s),
        }
    }
}

impl From<OrderState> for String {
    fn from(state: OrderState) -> Self {
        match state {
            OrderState::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a payment attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentState {
    Created,
    Authorized,
    Settled,
    Declined,
    Error,
    Cancelled,
    Other(String),
}

impl PaymentState {
    /// Whether the payment secures the order (authorized or settled).
    #[must_use]
    pub const fn is_secured(&self) -> bool {
        matches!(self, Self::Authorized | Self::Settled)
    }
}

impl From<String> for PaymentState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Created" => Self::Created,
            "Authorized" => Self::Authorized,
            "Settled" => Self::Settled,
            "Declined" => Self::Declined,
            "Error" => Self::Error,
            "Cancelled" => Self::Cancelled,
            _ => Self::Other(s),
        }
    }
}

impl From<PaymentState> for String {
    fn from(state: PaymentState) -> Self {
        match state {
            PaymentState::Created => "Created".to_owned(),
            PaymentState::Authorized => "Authorized".to_owned(),
            PaymentState::Settled => "Settled".to_owned(),
            PaymentState::Declined => "Declined".to_owned(),
            PaymentState::Error => "Error".to_owned(),
            PaymentState::Cancelled => "Cancelled".to_owned(),
            PaymentState::Other(s) => s,
        }
    }
}

/// State of a background job on the engine's job queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Retrying,
    Failed,
    Cancelled,
}

impl JobState {
    /// Whether the job will not change state again.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Retrying => "retrying",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
