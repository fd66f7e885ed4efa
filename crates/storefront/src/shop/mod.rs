//! Commerce engine Shop API client.
//!
//! # Architecture
//!
//! - Uses `graphql_client` request/response framing with hand-written,
//!   explicitly typed operations (see [`queries`])
//! - The engine is the source of truth for orders - NO local order state,
//!   every checkout step re-queries the active order
//! - In-memory caching via `moka` for catalogue reads (5 minute TTL); order
//!   data is never cached
//!
//! # Sessions
//!
//! The engine tracks the active order against a session token. The token is
//! carried in a [`ShopSession`] that callers pass to every request; the
//! client writes refreshed tokens back into it.
//!
//! # Example
//!
//! ```rust,ignore
//! use quayside_storefront::shop::{ShopApi, ShopClient, ShopSession};
//!
//! let client = ShopClient::new(&config.shop)?;
//! let mut session = ShopSession::default();
//!
//! let product = client.product(&mut session, "walnut-desk").await?;
//! let result = client
//!     .add_item_to_order(&mut session, &product.variants[0].id, 1)
//!     .await?;
//! ```

mod cache;
mod client;
pub mod queries;
pub mod types;

pub use client::ShopClient;
pub use types::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use quayside_core::{OrderCode, OrderState, ShippingMethodId, VariantId};

/// Errors that can occur when talking to the Shop API.
#[derive(Debug, Error)]
pub enum ShopError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the engine.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the engine.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl ShopError {
    /// Whether re-submitting the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500,
            Self::RateLimited(_) => true,
            Self::GraphQL(_) | Self::Parse(_) | Self::NotFound(_) => false,
        }
    }
}

/// A GraphQL error returned by the engine.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    /// An error with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Engine session context threaded through every Shop API call.
///
/// Holds the bearer token the engine issued for this visitor. It is stored in
/// the storefront session between requests. `Debug` redacts the token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSession {
    token: Option<String>,
}

impl ShopSession {
    /// Session with a known token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Current bearer token, if the engine has issued one.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Record a token issued by the engine.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Forget the engine session; the next request starts a new one.
    pub fn reset(&mut self) {
        self.token = None;
    }
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Order operations the checkout flow needs from the engine.
///
/// Implemented by [`ShopClient`]; tests drive the checkout against an
/// in-memory engine instead.
#[async_trait]
pub trait ShopApi: Send + Sync {
    /// The session's active order, if any.
    async fn active_order(&self, session: &mut ShopSession) -> Result<Option<Order>, ShopError>;

    /// An order owned by the session's customer, looked up by code.
    async fn order_by_code(
        &self,
        session: &mut ShopSession,
        code: &OrderCode,
    ) -> Result<Option<Order>, ShopError>;

    async fn add_item_to_order(
        &self,
        session: &mut ShopSession,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<MutationResult<Order>, ShopError>;

    async fn set_customer_for_order(
        &self,
        session: &mut ShopSession,
        customer: &CustomerInput,
    ) -> Result<MutationResult<Order>, ShopError>;

    async fn set_order_shipping_address(
        &self,
        session: &mut ShopSession,
        address: &AddressInput,
    ) -> Result<MutationResult<Order>, ShopError>;

    async fn eligible_shipping_methods(
        &self,
        session: &mut ShopSession,
    ) -> Result<Vec<ShippingQuote>, ShopError>;

    async fn set_order_shipping_method(
        &self,
        session: &mut ShopSession,
        method_id: &ShippingMethodId,
    ) -> Result<MutationResult<Order>, ShopError>;

    async fn transition_order_to_state(
        &self,
        session: &mut ShopSession,
        state: &OrderState,
    ) -> Result<MutationResult<Order>, ShopError>;

    async fn add_payment_to_order(
        &self,
        session: &mut ShopSession,
        input: &PaymentInput,
    ) -> Result<MutationResult<Order>, ShopError>;
}
