//! Checkout failure taxonomy.

use serde::Serialize;
use thiserror::Error;

use quayside_core::{ErrorCode, ErrorResult, Money, OrderCode, OrderState, VariantId};

use crate::payment::PaymentError;
use crate::shop::ShopError;

/// How the UI should react to a checkout failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Stale or terminal engine order: offer "clear session and restart".
    Recoverable,
    /// Network or timeout: offer retry. Nothing is retried automatically.
    Transient,
    /// Rejected by the engine or provider: surface the message and let the
    /// customer redo the step.
    Terminal,
}

/// A cart line the engine refused while populating the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineWarning {
    pub variant_id: VariantId,
    pub name: String,
    /// Engine error code, absent for transport failures.
    pub code: Option<ErrorCode>,
    pub message: String,
}

/// Errors from the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Shop(#[from] ShopError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("The cart is empty")]
    EmptyCart,

    #[error("None of the cart's items could be added to the order")]
    EmptyOrder { warnings: Vec<LineWarning> },

    #[error("There is no active order for this session")]
    NoActiveOrder,

    #[error("Order {code} can no longer be changed (state {})", .state.as_str())]
    StaleOrder { code: OrderCode, state: OrderState },

    #[error("Payment does not belong to order {expected}")]
    PaymentMismatch { expected: OrderCode },

    #[error("Shipping method is not eligible: {}", .0.message)]
    IneligibleShippingMethod(ErrorResult),

    #[error("Customer details were rejected: {}", .0.message)]
    CustomerRejected(ErrorResult),

    #[error("Order update rejected: {0}")]
    Rejected(ErrorResult),

    #[error("Payment declined: {message}")]
    PaymentDeclined { message: String },

    #[error("Payment is still being processed")]
    PaymentPending,

    #[error("Payment was canceled")]
    PaymentCanceled,

    #[error("Order total changed from {expected} to {actual}")]
    AmountMismatch { expected: Money, actual: Money },

    #[error("Order total is zero")]
    ZeroTotal,

    #[error("Payment was attached but the order does not show it as secured yet")]
    PaymentNotSecured,
}

impl CheckoutError {
    /// Classify the failure for the UI.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Shop(e) if e.is_transient() => ErrorClass::Transient,
            Self::Payment(e) if e.is_transient() => ErrorClass::Transient,
            Self::NoActiveOrder | Self::StaleOrder { .. } | Self::PaymentMismatch { .. } => {
                ErrorClass::Recoverable
            }
            Self::PaymentPending | Self::PaymentNotSecured => ErrorClass::Transient,
            Self::Shop(_)
            | Self::Payment(_)
            | Self::EmptyCart
            | Self::EmptyOrder { .. }
            | Self::IneligibleShippingMethod(_)
            | Self::CustomerRejected(_)
            | Self::Rejected(_)
            | Self::PaymentDeclined { .. }
            | Self::PaymentCanceled
            | Self::AmountMismatch { .. }
            | Self::ZeroTotal => ErrorClass::Terminal,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Shop(_) => "shop_api_error",
            Self::Payment(_) => "payment_provider_error",
            Self::EmptyCart => "empty_cart",
            Self::EmptyOrder { .. } => "empty_order",
            Self::NoActiveOrder => "no_active_order",
            Self::StaleOrder { .. } => "stale_order",
            Self::PaymentMismatch { .. } => "payment_mismatch",
            Self::IneligibleShippingMethod(_) => "ineligible_shipping_method",
            Self::CustomerRejected(_) => "customer_rejected",
            Self::Rejected(_) => "order_update_rejected",
            Self::PaymentDeclined { .. } => "payment_declined",
            Self::PaymentPending => "payment_pending",
            Self::PaymentCanceled => "payment_canceled",
            Self::AmountMismatch { .. } => "amount_mismatch",
            Self::ZeroTotal => "zero_total",
            Self::PaymentNotSecured => "payment_not_secured",
        }
    }

    /// Message safe to show to customers.
    ///
    /// Transport and provider API errors are replaced with a generic message.
    /// Engine messages and card declines are passed through.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Shop(_) => "The store is temporarily unavailable. Please try again.".to_string(),
            Self::Payment(_) => {
                "The payment service is temporarily unavailable. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
