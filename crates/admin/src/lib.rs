//! Quayside Admin library.
//!
//! A client for the commerce engine's Admin API, used by `qs-cli` to check
//! that a store is configured well enough to take orders and to rebuild the
//! search index.
//!
//! # Example
//!
//! ```rust,ignore
//! use quayside_admin::{AdminClient, AdminConfig};
//!
//! let config = AdminConfig::from_env()?;
//! let client = AdminClient::new(&config)?;
//! let mut session = client.login(&config.username, &config.password).await?;
//!
//! let report = client.setup_report(&mut session, &config.payment_method_code).await?;
//! for problem in report.problems() {
//!     tracing::warn!("{problem}");
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod error;
pub mod queries;
pub mod setup;
pub mod types;

pub use client::{AdminClient, AdminSession};
pub use config::AdminConfig;
pub use error::AdminError;
pub use setup::{SetupProblem, SetupReport};
pub use types::Job;
