//! Core types for Quayside.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod error_code;
pub mod id;
pub mod price;
pub mod status;

pub use cart::{Cart, CartError, CartLine};
pub use email::{Email, EmailError};
pub use error_code::{ErrorCode, ErrorResult};
pub use id::*;
pub use price::{CurrencyCode, Money};
pub use status::*;
