//! Quayside Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused.
//!
//! - [`shop`] - Shop API client for the commerce engine
//! - [`payment`] - Payment provider client
//! - [`checkout`] - Order reconciliation from local cart to paid order
//! - [`routes`] - JSON route handlers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payment;
pub mod routes;
pub mod shop;
pub mod state;
