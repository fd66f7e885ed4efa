//! Session middleware configuration and typed session accessors.
//!
//! Sessions live in memory via tower-sessions. They hold only the local cart,
//! the engine session token, the pending payment and the checkout form; the
//! engine keeps everything else.

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use tracing::warn;

use quayside_core::Cart;

use crate::checkout::PendingPayment;
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::models::{CheckoutDetails, session_keys};
use crate::shop::ShopSession;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "qs_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Load the cart, falling back to an empty cart if the stored one is unreadable.
pub async fn load_cart(session: &Session) -> Cart {
    match session.get::<Cart>(session_keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Discarding unreadable cart");
            Cart::new()
        }
    }
}

/// Store the cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Load the engine session token holder.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_shop_session(session: &Session) -> Result<ShopSession> {
    Ok(session
        .get::<ShopSession>(session_keys::SHOP_SESSION)
        .await?
        .unwrap_or_default())
}

/// Store the engine session token holder.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_shop_session(session: &Session, shop: &ShopSession) -> Result<()> {
    session.insert(session_keys::SHOP_SESSION, shop).await?;
    Ok(())
}

/// Load the pending payment, if any.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_pending_payment(session: &Session) -> Result<Option<PendingPayment>> {
    Ok(session.get(session_keys::PENDING_PAYMENT).await?)
}

/// Store the pending payment.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_pending_payment(session: &Session, pending: &PendingPayment) -> Result<()> {
    session.insert(session_keys::PENDING_PAYMENT, pending).await?;
    Ok(())
}

/// Forget the pending payment.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_pending_payment(session: &Session) -> Result<()> {
    session.remove_value(session_keys::PENDING_PAYMENT).await?;
    Ok(())
}

/// Load the cached checkout form.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_checkout_details(session: &Session) -> Result<Option<CheckoutDetails>> {
    Ok(session.get(session_keys::CHECKOUT_DETAILS).await?)
}

/// Cache the checkout form.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_checkout_details(session: &Session, details: &CheckoutDetails) -> Result<()> {
    session
        .insert(session_keys::CHECKOUT_DETAILS, details)
        .await?;
    Ok(())
}

/// Drop the engine session and everything checkout-related, keeping the cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn reset_checkout(session: &Session) -> Result<()> {
    session.remove_value(session_keys::SHOP_SESSION).await?;
    session.remove_value(session_keys::PENDING_PAYMENT).await?;
    session.remove_value(session_keys::CURRENT_CUSTOMER).await?;
    Ok(())
}
