//! Session-held models for the storefront.
//!
//! Orders, customers and products live in the commerce engine. The only
//! state kept here is what a visitor's session carries between requests.

pub mod session;

pub use session::{CheckoutDetails, SessionCustomer, keys as session_keys};
