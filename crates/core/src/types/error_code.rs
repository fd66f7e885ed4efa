//! Error-result codes returned inside GraphQL mutation unions.
//!
//! Every mutation on the engine returns either the success type or an object
//! implementing its `ErrorResult` interface (`errorCode` + `message`). Recovery
//! decisions are made by matching [`ErrorCode`], never by searching messages.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of engine error codes the storefront and admin tools act on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    UnknownError,
    NativeAuthStrategyError,
    InvalidCredentialsError,
    NotVerifiedError,
    OrderStateTransitionError,
    EmailAddressConflictError,
    GuestCheckoutError,
    OrderLimitError,
    NegativeQuantityError,
    InsufficientStockError,
    OrderModificationError,
    IneligibleShippingMethodError,
    NoActiveOrderError,
    OrderPaymentStateError,
    IneligiblePaymentMethodError,
    PaymentFailedError,
    PaymentDeclinedError,
    AlreadyLoggedInError,
    /// A code this client does not know about yet.
    Unknown(String),
}

const CODES: &[(&str, ErrorCode)] = &[
    ("UNKNOWN_ERROR", ErrorCode::UnknownError),
    ("NATIVE_AUTH_STRATEGY_ERROR", ErrorCode::NativeAuthStrategyError),
    ("INVALID_CREDENTIALS_ERROR", ErrorCode::InvalidCredentialsError),
    ("NOT_VERIFIED_ERROR", ErrorCode::NotVerifiedError),
    ("ORDER_STATE_TRANSITION_ERROR", ErrorCode::OrderStateTransitionError),
    ("EMAIL_ADDRESS_CONFLICT_ERROR", ErrorCode::EmailAddressConflictError),
    ("GUEST_CHECKOUT_ERROR", ErrorCode::GuestCheckoutError),
    ("ORDER_LIMIT_ERROR", ErrorCode::OrderLimitError),
    ("NEGATIVE_QUANTITY_ERROR", ErrorCode::NegativeQuantityError),
    ("INSUFFICIENT_STOCK_ERROR", ErrorCode::InsufficientStockError),
    ("ORDER_MODIFICATION_ERROR", ErrorCode::OrderModificationError),
    (
        "INELIGIBLE_SHIPPING_METHOD_ERROR",
        ErrorCode::IneligibleShippingMethodError,
    ),
    ("NO_ACTIVE_ORDER_ERROR", ErrorCode::NoActiveOrderError),
    ("ORDER_PAYMENT_STATE_ERROR", ErrorCode::OrderPaymentStateError),
    (
        "INELIGIBLE_PAYMENT_METHOD_ERROR",
        ErrorCode::IneligiblePaymentMethodError,
    ),
    ("PAYMENT_FAILED_ERROR", ErrorCode::PaymentFailedError),
    ("PAYMENT_DECLINED_ERROR", ErrorCode::PaymentDeclinedError),
    ("ALREADY_LOGGED_IN_ERROR", ErrorCode::AlreadyLoggedInError),
];

impl ErrorCode {
    /// The wire representation (`SCREAMING_SNAKE_CASE`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        if let Self::Unknown(s) = self {
            return s;
        }
        CODES
            .iter()
            .find(|(_, code)| code == self)
            .map_or("UNKNOWN_ERROR", |(s, _)| s)
    }

    /// Whether the error says the order's stage no longer allows the mutation.
    #[must_use]
    pub const fn is_stage_mismatch(&self) -> bool {
        matches!(
            self,
            Self::OrderModificationError | Self::OrderStateTransitionError
        )
    }
}

impl From<String> for ErrorCode {
    fn from(s: String) -> Self {
        CODES
            .iter()
            .find(|(wire, _)| *wire == s)
            .map_or(Self::Unknown(s), |(_, code)| code.clone())
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_owned()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error branch of a mutation result union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    /// Structured error code.
    pub error_code: ErrorCode,
    /// Human-readable message from the engine.
    pub message: String,
}

impl ErrorResult {
    /// Build an error result.
    #[must_use]
    pub fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code, self.message)
    }
}
