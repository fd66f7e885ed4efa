//! Session-related types.
//!
//! Types stored in the session between requests: the local cart, the
//! engine session token, the pending payment and the checkout form.

use serde::{Deserialize, Serialize};

use quayside_core::{CustomerId, Email};

use crate::shop::{AddressInput, CustomerInput};

/// Session-stored customer identity.
///
/// Set after an engine-native login. The engine session token itself is kept
/// separately under [`keys::SHOP_SESSION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCustomer {
    /// Engine customer ID.
    pub id: CustomerId,
    /// Login email address.
    pub email: Email,
}

/// Address and guest details entered at checkout, cached so the form can be
/// pre-filled when a step is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub address: AddressInput,
    pub guest: Option<CustomerInput>,
}

/// Session keys.
pub mod keys {
    /// The local cart.
    pub const CART: &str = "cart";

    /// The engine session token (`ShopSession`).
    pub const SHOP_SESSION: &str = "shop_session";

    /// Payment intent awaiting confirmation (`PendingPayment`).
    pub const PENDING_PAYMENT: &str = "pending_payment";

    /// Last submitted checkout address (`CheckoutDetails`).
    pub const CHECKOUT_DETAILS: &str = "checkout_details";

    /// The logged-in customer (`SessionCustomer`).
    pub const CURRENT_CUSTOMER: &str = "current_customer";
}
