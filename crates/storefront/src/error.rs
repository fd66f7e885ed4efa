//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`,
//! rendered as `{"error": {"code": ..., "message": ...}}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use quayside_core::CartError;

use crate::checkout::{CheckoutError, ErrorClass};
use crate::payment::PaymentError;
use crate::shop::ShopError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Shop API operation failed.
    #[error("Shop API error: {0}")]
    Shop(#[from] ShopError),

    /// Payment provider operation failed outside the checkout flow.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Checkout step failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Cart rejected the change.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Customer is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn should_capture(&self) -> bool {
        match self {
            Self::Shop(ShopError::NotFound(_)) => false,
            Self::Shop(_) | Self::Payment(_) | Self::Session(_) | Self::Internal(_) => true,
            Self::Checkout(err) => matches!(err, CheckoutError::Shop(_) | CheckoutError::Payment(_)),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Shop(ShopError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Shop(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Payment(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Shop(_) | Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Checkout(err) => match err.class() {
                ErrorClass::Recoverable => StatusCode::CONFLICT,
                ErrorClass::Transient => StatusCode::SERVICE_UNAVAILABLE,
                ErrorClass::Terminal => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::Cart(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Shop(ShopError::NotFound(_)) | Self::NotFound(_) => "not_found",
            Self::Shop(_) => "shop_api_error",
            Self::Payment(_) => "payment_provider_error",
            Self::Checkout(err) => err.code(),
            Self::Cart(_) => "invalid_cart_change",
            Self::Unauthorized(_) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::RateLimited => "rate_limited",
            Self::Session(_) | Self::Internal(_) => "internal_error",
        }
    }

    // Don't expose internal error details to clients
    fn public_message(&self) -> String {
        match self {
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Shop(ShopError::NotFound(what)) => what.clone(),
            Self::Shop(_) | Self::Payment(_) => "External service error".to_string(),
            Self::Checkout(err) => err.public_message(),
            Self::Cart(err) => err.to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited => "Too many requests".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.should_capture() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let mut error = json!({
            "code": self.code(),
            "message": self.public_message(),
        });

        if let Self::Checkout(err) = &self {
            error["class"] = json!(err.class());
            if let CheckoutError::EmptyOrder { warnings } = err {
                error["warnings"] = json!(warnings);
            }
        }

        (self.status(), Json(json!({ "error": error }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after a customer logs in.
pub fn set_sentry_user(customer_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the customer.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for customer actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Shipping method chosen", Some(&[("method_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use quayside_core::{OrderCode, OrderState};

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product walnut-desk".to_string());
        assert_eq!(err.to_string(), "Not found: product walnut-desk");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Shop(ShopError::NotFound("x".to_string()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Shop(ShopError::RateLimited(1))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_checkout_class_status_codes() {
        let stale = CheckoutError::StaleOrder {
            code: OrderCode::new("AB12"),
            state: OrderState::PaymentSettled,
        };
        assert_eq!(get_status(stale.into()), StatusCode::CONFLICT);
        assert_eq!(
            get_status(CheckoutError::PaymentPending.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(CheckoutError::EmptyCart.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Internal("connection refused at 10.0.0.4".to_string());
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(err.code(), "internal_error");
    }
}
