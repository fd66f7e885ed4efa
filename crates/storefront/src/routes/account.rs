//! Account route handlers.
//!
//! These routes require authentication.

use axum::{Json, extract::State};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::middleware::clear_current_customer;
use crate::middleware::session::{load_shop_session, save_shop_session};
use crate::shop::Customer;
use crate::state::AppState;

/// Show the logged-in customer's profile as the engine knows it.
///
/// If the engine no longer recognises the session (token expired), the
/// stored customer is forgotten and the request is rejected.
#[instrument(skip(state, session, customer), fields(customer_id = %customer.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(customer): RequireCustomer,
) -> Result<Json<Customer>> {
    let mut shop_session = load_shop_session(&session).await?;
    let result = state.shop().active_customer(&mut shop_session).await;
    save_shop_session(&session, &shop_session).await?;

    match result? {
        Some(profile) => Ok(Json(profile)),
        None => {
            clear_current_customer(&session).await?;
            Err(AppError::Unauthorized("Session expired, please log in again".to_string()))
        }
    }
}
