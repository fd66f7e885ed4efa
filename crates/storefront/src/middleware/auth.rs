//! Customer authentication extractors.
//!
//! Customers log in against the engine; the storefront only remembers who is
//! logged in so account routes can reject guests early.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{SessionCustomer, session_keys};

/// Extractor that requires a logged-in customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn account(RequireCustomer(customer): RequireCustomer) -> impl IntoResponse {
///     customer.email.to_string()
/// }
/// ```
pub struct RequireCustomer(pub SessionCustomer);

/// Rejection returned when no customer is logged in.
pub struct NotLoggedIn;

impl IntoResponse for NotLoggedIn {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": { "code": "unauthorized", "message": "Please log in" }
            })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = NotLoggedIn;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().ok_or(NotLoggedIn)?;

        session
            .get::<SessionCustomer>(session_keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten()
            .map(Self)
            .ok_or(NotLoggedIn)
    }
}

/// Extractor that optionally gets the logged-in customer.
///
/// Checkout uses it to decide between guest details and the account.
pub struct OptionalCustomer(pub Option<SessionCustomer>);

impl<S> FromRequestParts<S> for OptionalCustomer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<SessionCustomer>(session_keys::CURRENT_CUSTOMER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(customer))
    }
}

/// Remember the logged-in customer.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &SessionCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Forget the logged-in customer (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove_value(session_keys::CURRENT_CUSTOMER)
        .await?;
    Ok(())
}
