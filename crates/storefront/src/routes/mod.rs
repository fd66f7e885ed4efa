//! HTTP route handlers for storefront.
//!
//! Every handler returns JSON. Errors render through [`crate::error::AppError`].
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Shop API reachability
//!
//! # Products
//! GET  /products               - Product listing (?page=&per_page=)
//! GET  /products/{slug}        - Product detail
//!
//! # Cart (local, session-held)
//! GET  /cart                   - Cart view
//! POST /cart/add               - Add a variant
//! POST /cart/update            - Set a line quantity (<= 0 removes)
//! POST /cart/remove            - Remove a line
//!
//! # Checkout (engine order)
//! GET  /checkout/order         - Push the cart into the engine's active order
//! POST /checkout/address       - Set shipping address (and guest customer)
//! GET  /checkout/shipping      - Eligible shipping methods
//! POST /checkout/shipping      - Choose a shipping method
//! POST /checkout/payment       - Create or reuse a payment intent
//! POST /checkout/confirm       - Attach the paid intent to the order
//! POST /checkout/reset         - Drop the engine session and start over
//!
//! # Auth
//! POST /auth/login             - Engine-native customer login
//! POST /auth/logout            - Logout
//!
//! # Account (requires auth)
//! GET  /account                - Active customer
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/order", get(checkout::order))
        .route("/address", post(checkout::address))
        .route(
            "/shipping",
            get(checkout::shipping_options).post(checkout::choose_shipping),
        )
        .route("/payment", post(checkout::payment))
        .route("/confirm", post(checkout::confirm))
        .route("/reset", post(checkout::reset))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new().route("/", get(account::index))
}

/// Create all routes for the storefront.
///
/// Rate limits are keyed by client IP, so the server must be run with
/// connect info (`into_make_service_with_connect_info`) or behind a proxy
/// that sets a client IP header.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes().layer(api_rate_limiter()))
        .nest("/cart", cart_routes().layer(api_rate_limiter()))
        .nest("/checkout", checkout_routes().layer(checkout_rate_limiter()))
        .nest("/account", account_routes().layer(api_rate_limiter()))
        .nest("/auth", auth_routes().layer(auth_rate_limiter()))
}
