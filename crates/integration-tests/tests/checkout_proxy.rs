//! End-to-end tests for the checkout proxy against the fake Storefront API.

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use shopcart_core::wire::paths;
use shopcart_integration_tests::{FakeShopify, TestProxy};

async fn setup() -> (FakeShopify, TestProxy, Client) {
    let shop = FakeShopify::start().await.unwrap();
    let proxy = TestProxy::start(&shop).await.unwrap();
    (shop, proxy, Client::new())
}

async fn post(client: &Client, proxy: &TestProxy, path: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .post(proxy.url(path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

fn cart_id(envelope: &Value) -> String {
    envelope["checkout"]["id"].as_str().unwrap().to_string()
}

fn first_line(envelope: &Value) -> &Value {
    &envelope["checkout"]["lineItems"]["edges"][0]["node"]
}

// ============================================================================
// Happy paths
// ============================================================================

#[tokio::test]
async fn test_health_and_request_id() {
    let (_shop, proxy, client) = setup().await;

    let response = client.get(proxy.url("/health")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_create_with_line() {
    let (_shop, proxy, client) = setup().await;

    let (status, body) = post(
        &client,
        &proxy,
        paths::CREATE,
        json!({ "variantId": "gid://shopify/ProductVariant/1", "quantity": 2 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(cart_id(&body).starts_with("gid://shopify/Cart/"));
    assert!(body["checkout"]["webUrl"].as_str().unwrap().starts_with("https://"));
    assert_eq!(first_line(&body)["quantity"], 2);
    assert_eq!(
        first_line(&body)["merchandise"]["id"],
        "gid://shopify/ProductVariant/1"
    );
}

#[tokio::test]
async fn test_add_creates_then_merges() {
    let (_shop, proxy, client) = setup().await;
    let variant = "gid://shopify/ProductVariant/7";

    let (status, created) = post(&client, &proxy, paths::ADD, json!({ "variantId": variant })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first_line(&created)["quantity"], 1);

    let (status, merged) = post(
        &client,
        &proxy,
        paths::ADD,
        json!({ "checkoutId": cart_id(&created), "variantId": variant, "quantity": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart_id(&merged), cart_id(&created));
    assert_eq!(first_line(&merged)["quantity"], 3);
}

#[tokio::test]
async fn test_update_get_and_remove() {
    let (_shop, proxy, client) = setup().await;

    let (_, created) = post(
        &client,
        &proxy,
        paths::CREATE,
        json!({ "variantId": "gid://shopify/ProductVariant/1" }),
    )
    .await;
    let id = cart_id(&created);
    let line_id = first_line(&created)["id"].as_str().unwrap().to_string();

    let (status, updated) = post(
        &client,
        &proxy,
        paths::UPDATE_QUANTITY,
        json!({ "cartId": id, "lineId": line_id, "quantity": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first_line(&updated)["quantity"], 5);

    let (status, fetched) = post(&client, &proxy, paths::GET, json!({ "checkoutId": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first_line(&fetched)["quantity"], 5);

    let (status, removed) = post(
        &client,
        &proxy,
        paths::REMOVE_LINE,
        json!({ "cartId": id, "lineId": line_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        removed["checkout"]["lineItems"]["edges"].as_array().unwrap().len(),
        0
    );
}

// ============================================================================
// Failure statuses
// ============================================================================

#[tokio::test]
async fn test_missing_variant_is_invalid_input() {
    let (shop, proxy, client) = setup().await;

    let (status, body) = post(&client, &proxy, paths::ADD, json!({ "quantity": 1 })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
    assert!(shop.operations().is_empty());
}

#[tokio::test]
async fn test_zero_quantity_update_is_rejected_locally() {
    let (shop, proxy, client) = setup().await;

    let (status, body) = post(
        &client,
        &proxy,
        paths::UPDATE_QUANTITY,
        json!({ "cartId": "gid://shopify/Cart/1", "lineId": "l1", "quantity": 0 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
    assert!(shop.operations().is_empty());
}

#[tokio::test]
async fn test_add_to_expired_cart_is_gone() {
    let (shop, proxy, client) = setup().await;

    let (_, created) = post(
        &client,
        &proxy,
        paths::CREATE,
        json!({ "variantId": "gid://shopify/ProductVariant/1" }),
    )
    .await;
    let id = cart_id(&created);
    shop.expire(&id);

    let (status, body) = post(
        &client,
        &proxy,
        paths::ADD,
        json!({ "checkoutId": id, "variantId": "gid://shopify/ProductVariant/1" }),
    )
    .await;

    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["code"], "CART_EXPIRED");
    assert_eq!(body["clearCart"], true);
}

#[tokio::test]
async fn test_unknown_cart_is_not_found() {
    let (_shop, proxy, client) = setup().await;

    let (status, body) = post(
        &client,
        &proxy,
        paths::GET,
        json!({ "checkoutId": "gid://shopify/Cart/missing" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_throttled_upstream_is_429() {
    let (shop, proxy, client) = setup().await;
    shop.throttle_next(1);

    let (status, body) = post(
        &client,
        &proxy,
        paths::ADD,
        json!({ "variantId": "gid://shopify/ProductVariant/1" }),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "THROTTLED");
    assert!(body.get("clearCart").is_none());
}

#[tokio::test]
async fn test_unallocated_line_is_out_of_stock() {
    let (shop, proxy, client) = setup().await;
    shop.mark_out_of_stock("gid://shopify/ProductVariant/9");

    let (status, body) = post(
        &client,
        &proxy,
        paths::ADD,
        json!({ "variantId": "gid://shopify/ProductVariant/9" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "OUT_OF_STOCK");
    assert!(body["details"].as_str().unwrap().contains("quantity 0"));
}
