//! Integration tests for Quayside.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the commerce engine (with a populated catalogue) and the storefront
//! cargo run -p quayside-storefront
//!
//! # Run the ignored tests against them
//! cargo test -p quayside-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `storefront_catalogue` - Product listing and cart through the storefront
//! - `storefront_checkout` - Guest checkout up to shipping selection
//! - `admin_setup` - Admin API login, setup report and reindex
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - Running storefront (default: `http://localhost:3000`)
//! - `ADMIN_API_URL`, `ADMIN_USERNAME`, `ADMIN_PASSWORD` - Engine Admin API

#![cfg_attr(not(test), forbid(unsafe_code))]

use reqwest::Client;
use serde_json::Value;

/// Base URL of the running storefront.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client that keeps the storefront session cookie, like a browser tab.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// GET a storefront path and decode the JSON body.
///
/// # Panics
///
/// Panics if the request fails or the body is not JSON.
#[allow(clippy::expect_used)]
pub async fn get_json(client: &Client, path: &str) -> (reqwest::StatusCode, Value) {
    let resp = client
        .get(format!("{}{path}", storefront_base_url()))
        .send()
        .await
        .expect("Request failed");
    let status = resp.status();
    (status, resp.json().await.expect("Response was not JSON"))
}

/// POST JSON to a storefront path and decode the JSON body.
///
/// # Panics
///
/// Panics if the request fails or the body is not JSON.
#[allow(clippy::expect_used)]
pub async fn post_json(client: &Client, path: &str, body: &Value) -> (reqwest::StatusCode, Value) {
    let resp = client
        .post(format!("{}{path}", storefront_base_url()))
        .json(body)
        .send()
        .await
        .expect("Request failed");
    let status = resp.status();
    (status, resp.json().await.expect("Response was not JSON"))
}

/// The first product in the catalogue that has a variant, as
/// `(slug, variant_id)`.
pub async fn first_purchasable(client: &Client) -> Option<(String, String)> {
    let (_, page) = get_json(client, "/products?per_page=10").await;
    for item in page["items"].as_array()? {
        let slug = item["slug"].as_str()?;
        let (_, product) = get_json(client, &format!("/products/{slug}")).await;
        if let Some(variant) = product["variants"].as_array().and_then(|v| v.first()) {
            return Some((slug.to_string(), variant["id"].as_str()?.to_string()));
        }
    }
    None
}
