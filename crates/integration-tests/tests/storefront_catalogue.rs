//! Integration tests for the catalogue and local cart.
//!
//! These tests require:
//! - A running commerce engine with at least one product
//! - The storefront running (cargo run -p quayside-storefront)

use quayside_integration_tests::{browser, first_purchasable, get_json, post_json};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running commerce engine"]
async fn test_readiness_reaches_shop_api() {
    let client = browser();
    let (status, body) = get_json(&client, "/health/ready").await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
#[ignore = "Requires running commerce engine"]
async fn test_product_listing_paginates() {
    let client = browser();
    let (status, page) = get_json(&client, "/products?page=1&per_page=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 1);
    assert_eq!(page["per_page"], 2);
    assert!(page["items"].as_array().is_some_and(|items| items.len() <= 2));
}

#[tokio::test]
#[ignore = "Requires running commerce engine"]
async fn test_unknown_product_is_not_found() {
    let client = browser();
    let (status, body) = get_json(&client, "/products/no-such-product-slug").await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[tokio::test]
#[ignore = "Requires running commerce engine"]
async fn test_cart_add_update_remove() {
    let client = browser();
    let (slug, variant_id) = first_purchasable(&client)
        .await
        .expect("Catalogue has no purchasable product");

    let (status, cart) = post_json(
        &client,
        "/cart/add",
        &json!({"product_slug": slug, "variant_id": variant_id, "quantity": 2}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{cart}");
    assert_eq!(cart["item_count"], 2);

    // The session cookie carries the cart between requests
    let (_, cart) = get_json(&client, "/cart").await;
    assert_eq!(cart["lines"][0]["variant_id"], variant_id.as_str());

    let (_, cart) = post_json(
        &client,
        "/cart/update",
        &json!({"variant_id": variant_id, "quantity": 5}),
    )
    .await;
    assert_eq!(cart["item_count"], 5);

    let (_, cart) = post_json(&client, "/cart/remove", &json!({"variant_id": variant_id})).await;
    assert_eq!(cart["item_count"], 0);
    assert_eq!(cart["lines"], json!([]));
}

#[tokio::test]
#[ignore = "Requires running commerce engine"]
async fn test_cart_rejects_unknown_variant() {
    let client = browser();
    let (slug, _) = first_purchasable(&client)
        .await
        .expect("Catalogue has no purchasable product");

    let (status, _) = post_json(
        &client,
        "/cart/add",
        &json!({"product_slug": slug, "variant_id": "does-not-exist"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
