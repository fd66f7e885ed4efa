//! Quayside Core - Shared types library.
//!
//! This crate provides common types used across all Quayside components:
//! - `storefront` - Public-facing storefront API and checkout
//! - `admin` - Admin API client for store setup diagnostics
//! - `cli` - Command-line tools over the admin client
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! Orders, variants and customers are owned by the commerce engine; the only
//! model owned here is the local [`Cart`].
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, order states, engine error codes and the cart

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
