//! Authentication route handlers.
//!
//! Customers log in against the engine's native auth strategy. The engine
//! re-issues the session token on login, and merges any guest active order
//! into the customer's order.

use axum::{Json, extract::State};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{instrument, warn};

use quayside_core::{Email, ErrorCode};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::session::{
    clear_pending_payment, load_shop_session, save_shop_session,
};
use crate::middleware::{clear_current_customer, set_current_customer};
use crate::models::SessionCustomer;
use crate::shop::MutationResult;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
    #[serde(default)]
    pub remember_me: bool,
}

/// The logged-in customer.
#[derive(Debug, Serialize)]
pub struct LoginView {
    pub customer: SessionCustomer,
}

/// Logout response.
#[derive(Debug, Serialize)]
pub struct LogoutView {
    pub logged_out: bool,
}

/// Handle login.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<LoginView>> {
    let email = Email::parse(&form.email).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let mut shop_session = load_shop_session(&session).await?;

    let result = state
        .shop()
        .login(
            &mut shop_session,
            email.as_str(),
            form.password.expose_secret(),
            form.remember_me,
        )
        .await;
    save_shop_session(&session, &shop_session).await?;

    match result? {
        MutationResult::Ok(_) => {}
        MutationResult::Err(err) => {
            warn!(code = %err.error_code, "Login rejected");
            let message = match err.error_code {
                ErrorCode::InvalidCredentialsError => "Invalid email or password".to_string(),
                _ => err.message,
            };
            return Err(AppError::Unauthorized(message));
        }
    }

    let profile = state
        .shop()
        .active_customer(&mut shop_session)
        .await?
        .ok_or_else(|| AppError::Internal("Login succeeded but no active customer".to_string()))?;
    save_shop_session(&session, &shop_session).await?;

    let customer = SessionCustomer {
        id: profile.id,
        email,
    };
    set_current_customer(&session, &customer).await?;
    // A pending intent belonged to the guest order the engine just merged away.
    clear_pending_payment(&session).await?;

    set_sentry_user(&customer.id, Some(customer.email.as_str()));
    tracing::info!(customer_id = %customer.id, "Customer logged in");

    Ok(Json(LoginView { customer }))
}

/// Handle logout.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Json<LogoutView>> {
    let mut shop_session = load_shop_session(&session).await?;

    if shop_session.token().is_some() {
        if let Err(e) = state.shop().logout(&mut shop_session).await {
            warn!(error = %e, "Engine logout failed, dropping the session anyway");
        }
    }

    shop_session.reset();
    save_shop_session(&session, &shop_session).await?;
    clear_current_customer(&session).await?;
    clear_pending_payment(&session).await?;
    clear_sentry_user();

    Ok(Json(LogoutView { logged_out: true }))
}
