//! Storefront cart flows against a fake marketplace backend.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::{Method, StatusCode};
use marketplace_client::{ApiClient, Credentials};
use marketplace_core::ProductId;
use marketplace_integration_tests::{
    FakeBackend, RecordedRequest, Reply, TestBrowser, login_reply, storefront,
};
use serde_json::json;

fn cart_lines() -> Reply {
    Reply::json(json!([
        {
            "cartItemId": 1,
            "productId": 5,
            "productName": "Medjool Dates",
            "productPrice": 12.5,
            "quantity": 1,
            "availableQuantity": 10
        },
        {
            "cartItemId": 2,
            "productId": 6,
            "productName": "Sidr Honey",
            "productPrice": 30,
            "quantity": 2,
            "availableQuantity": 4
        }
    ]))
}

/// Backend with a logged-in buyer `sam` and a two-line cart.
fn buyer_backend(request: &RecordedRequest) -> Reply {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/api/auth/login") => login_reply("sam", "BUYER"),
        ("GET", "/api/cart") => cart_lines(),
        _ => Reply::ok(),
    }
}

async fn logged_in(backend: &FakeBackend) -> TestBrowser {
    let mut browser = storefront(backend);
    let page = browser.get("/login").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(browser.csrf_token().is_some());

    let response = browser
        .submit("/login", &[("username", "sam"), ("password", "correct horse")])
        .await;
    assert!(response.status.is_redirection());
    assert_eq!(response.header("location"), Some("/marketplace"));
    browser
}

#[tokio::test]
async fn test_login_loads_cart_with_bearer_token() {
    let backend = FakeBackend::start(buyer_backend).await;
    let _browser = logged_in(&backend).await;

    let login = backend.requests_to(&Method::POST, "/api/auth/login");
    assert_eq!(login.len(), 1);
    assert_eq!(login[0].json()["username"], "sam");

    let cart = backend.requests_to(&Method::GET, "/api/cart");
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].authorization.as_deref(), Some("Bearer token-sam"));
}

#[tokio::test]
async fn test_clear_falls_back_when_force_clear_fails() {
    let backend = FakeBackend::start(|request| {
        if request.path == "/api/cart/force-clear" {
            return Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "reservation held");
        }
        buyer_backend(request)
    })
    .await;
    let mut browser = logged_in(&backend).await;
    backend.clear_requests();

    let response = browser.htmx(Method::POST, "/cart/clear", &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Your cart has been cleared"));
    assert!(response.body.contains(r#"<span class="badge">0</span>"#));
    assert!(response.body.contains("Your cart is empty"));

    let deletes: Vec<String> = backend
        .requests()
        .into_iter()
        .filter(|request| request.method == Method::DELETE)
        .map(|request| request.path)
        .collect();
    assert_eq!(deletes, ["/api/cart/force-clear", "/api/cart/clear"]);
}

#[tokio::test]
async fn test_clear_failure_keeps_the_cart() {
    let backend = FakeBackend::start(|request| {
        if request.method == Method::DELETE {
            return Reply::error(StatusCode::SERVICE_UNAVAILABLE, "down");
        }
        buyer_backend(request)
    })
    .await;
    let mut browser = logged_in(&backend).await;

    let response = browser.htmx(Method::POST, "/cart/clear", &[]).await;
    assert_eq!(response.header("hx-reswap"), Some("none"));
    assert!(response.body.contains("toast-error"));
    assert!(!response.body.contains("Your cart has been cleared"));
}

#[tokio::test]
async fn test_anonymous_add_opens_login_modal() {
    let backend = FakeBackend::start(buyer_backend).await;
    let mut browser = storefront(&backend);
    let _ = browser.get("/login").await;

    let response = browser
        .htmx(Method::POST, "/cart/add", &[("product_id", "5"), ("quantity", "1")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("hx-retarget"), Some("#modal"));
    assert!(response.body.contains(r#"action="/login""#));
    assert!(
        backend
            .requests()
            .iter()
            .all(|request| !request.path.starts_with("/api/cart"))
    );
}

#[tokio::test]
async fn test_add_swaps_button_and_refreshes_count() {
    let backend = FakeBackend::start(buyer_backend).await;
    let mut browser = logged_in(&backend).await;
    backend.clear_requests();

    let response = browser
        .htmx(Method::POST, "/cart/add", &[("product_id", "6"), ("quantity", "1")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Added to cart"));
    assert_eq!(response.header("hx-trigger"), Some("cart-updated"));

    let added = backend.requests_to(&Method::POST, "/api/cart");
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].json(), json!({ "productId": 6, "quantity": 1 }));
    assert_eq!(added[0].csrf_token.as_deref(), Some("backend-csrf"));
}

#[tokio::test]
async fn test_post_without_csrf_token_is_rejected() {
    let backend = FakeBackend::start(buyer_backend).await;
    let mut browser = storefront(&backend);

    let response = browser
        .htmx(Method::POST, "/cart/add", &[("product_id", "5")])
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_rapid_quantity_changes_send_one_update() {
    let backend = FakeBackend::start(buyer_backend).await;
    let mut browser = logged_in(&backend).await;

    for quantity in ["2", "3", "4"] {
        let response = browser
            .htmx(
                Method::POST,
                "/cart/update",
                &[("item_id", "1"), ("quantity", quantity)],
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.contains(r#"id="cart-row-1""#));
    }
    assert!(backend.requests_to(&Method::PUT, "/api/cart/1").is_empty());

    tokio::time::sleep(Duration::from_millis(400)).await;

    let updates = backend.requests_to(&Method::PUT, "/api/cart/1");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].json(), json!({ "quantity": 4 }));
}

#[tokio::test]
async fn test_quantity_above_stock_is_clamped() {
    let backend = FakeBackend::start(buyer_backend).await;
    let mut browser = logged_in(&backend).await;

    let response = browser
        .htmx(
            Method::POST,
            "/cart/update",
            &[("item_id", "2"), ("quantity", "9")],
        )
        .await;
    assert!(response.body.contains("Quantity adjusted to 4"));

    tokio::time::sleep(Duration::from_millis(400)).await;
    let updates = backend.requests_to(&Method::PUT, "/api/cart/2");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].json(), json!({ "quantity": 4 }));
}

#[tokio::test]
async fn test_check_product_in_cart() {
    let backend = FakeBackend::start(|_| cart_lines()).await;
    let cart = ApiClient::new(&backend.url())
        .unwrap()
        .cart(Credentials::bearer("t"));

    let status = cart.check_product_in_cart(ProductId::new(6)).await;
    assert!(status.in_cart);
    assert_eq!(status.item.unwrap().quantity, 2);

    let status = cart.check_product_in_cart(ProductId::new(99)).await;
    assert!(!status.in_cart);
    assert!(status.item.is_none());
}

#[tokio::test]
async fn test_check_product_in_cart_on_backend_failure() {
    let backend =
        FakeBackend::start(|_| Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "boom")).await;
    let cart = ApiClient::new(&backend.url())
        .unwrap()
        .cart(Credentials::bearer("t"));

    let status = cart.check_product_in_cart(ProductId::new(5)).await;
    assert!(!status.in_cart);
    assert!(status.item.is_none());
}

#[tokio::test]
async fn test_count_badge_after_login() {
    let backend = FakeBackend::start(buyer_backend).await;
    let mut browser = logged_in(&backend).await;

    let response = browser.htmx_get("/cart/count").await;
    assert!(response.body.contains(r#"<span class="badge">3</span>"#));
}

#[tokio::test]
async fn test_unknown_stock_caps_at_default_maximum() {
    let backend = FakeBackend::start(|request| {
        if request.is(&Method::GET, "/api/cart") {
            return Reply::json(json!([
                {
                    "cartItemId": 3,
                    "productId": 7,
                    "productName": "Olive Oil",
                    "productPrice": 9,
                    "quantity": 1
                }
            ]));
        }
        buyer_backend(request)
    })
    .await;
    let mut browser = logged_in(&backend).await;

    let response = browser
        .htmx(
            Method::POST,
            "/cart/update",
            &[("item_id", "3"), ("quantity", "150")],
        )
        .await;
    assert!(response.body.contains("Quantity adjusted to 99"));

    tokio::time::sleep(Duration::from_millis(400)).await;
    let updates = backend.requests_to(&Method::PUT, "/api/cart/3");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].json(), json!({ "quantity": 99 }));
}

#[tokio::test]
async fn test_protected_page_returns_after_login() {
    let backend = FakeBackend::start(buyer_backend).await;
    let mut browser = storefront(&backend);

    let response = browser.get("/cart").await;
    assert!(response.status.is_redirection());
    assert_eq!(response.header("location"), Some("/login?next=%2Fcart"));

    let response = browser.get("/checkout/success").await;
    assert_eq!(
        response.header("location"),
        Some("/login?next=%2Fcheckout%2Fsuccess")
    );

    let page = browser.get("/login?next=%2Fcart").await;
    assert_eq!(page.status, StatusCode::OK);
    let response = browser
        .submit(
            "/login",
            &[("username", "sam"), ("password", "correct horse"), ("next", "/cart")],
        )
        .await;
    assert!(response.status.is_redirection());
    assert_eq!(response.header("location"), Some("/cart"));
}
