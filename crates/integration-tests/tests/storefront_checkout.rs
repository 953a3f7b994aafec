//! Checkout: payment intent, card result and the post-payment cart clear.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::{Method, StatusCode};
use marketplace_client::{ApiClient, ClearEndpoint, Credentials, RetryPolicy};
use marketplace_core::OrderId;
use marketplace_integration_tests::{
    FakeBackend, RecordedRequest, Reply, TestBrowser, TestResponse, login_reply,
    storefront_with_retry,
};
use marketplace_storefront::services::checkout::clear_cart_after_payment;
use serde_json::json;

const FAST: RetryPolicy = RetryPolicy::linear(3, Duration::from_millis(5));

fn checkout_backend(request: &RecordedRequest) -> Reply {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/api/auth/login") => login_reply("sam", "BUYER"),
        ("GET", "/api/cart") => Reply::json(json!([
            {
                "cartItemId": 1,
                "productId": 5,
                "productName": "Medjool Dates",
                "productPrice": 12.5,
                "quantity": 2,
                "availableQuantity": 10
            }
        ])),
        ("POST", "/api/checkout/create-payment-intent") => Reply::json(json!({
            "clientSecret": "pi_9_secret",
            "paymentIntentId": "pi_9",
            "amount": 25,
            "currency": "usd",
            "orderId": 9
        })),
        ("POST", "/api/checkout/payment-success") => Reply::json(json!({
            "orderId": 9,
            "message": "Payment recorded"
        })),
        _ => Reply::ok(),
    }
}

/// Backend whose force-clear always fails, so the cascade falls through.
fn force_clear_fails(request: &RecordedRequest) -> Reply {
    if request.path == "/api/cart/force-clear" {
        return Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "reservation held");
    }
    checkout_backend(request)
}

async fn logged_in(backend: &FakeBackend, retry: RetryPolicy) -> TestBrowser {
    let mut browser = storefront_with_retry(backend, retry);
    let _ = browser.get("/login").await;
    let response = browser
        .submit("/login", &[("username", "sam"), ("password", "correct horse")])
        .await;
    assert!(response.status.is_redirection());
    browser
}

/// Open the checkout page and create the payment intent `pi_9`.
async fn start_payment(browser: &mut TestBrowser) {
    let page = browser.get("/checkout").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Medjool Dates"));

    let form = browser.htmx(Method::POST, "/checkout/intent", &[]).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains(r#"data-client-secret="pi_9_secret""#));
    assert!(form.body.contains("/checkout/confirm"));
}

async fn card_result(browser: &mut TestBrowser, status: &str) -> TestResponse {
    browser
        .htmx(
            Method::POST,
            "/checkout/confirm",
            &[("payment_intent_id", "pi_9"), ("status", status)],
        )
        .await
}

fn cascade(backend: &FakeBackend) -> Vec<(Method, String, Option<String>)> {
    backend
        .requests()
        .into_iter()
        .filter(|request| request.path.starts_with("/api/cart/"))
        .map(|request| (request.method, request.path, request.query))
        .collect()
}

#[tokio::test]
async fn test_successful_payment_shows_success_screen() {
    let backend = FakeBackend::start(checkout_backend).await;
    let mut browser = logged_in(&backend, FAST).await;
    start_payment(&mut browser).await;

    let response = card_result(&mut browser, "succeeded").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("hx-retarget"), Some("body"));
    assert_eq!(response.header("hx-push-url"), Some("/checkout/success"));
    assert!(response.body.contains("Thank you for your order!"));
    assert!(response.body.contains("#9"));
    assert!(response.body.contains(r#"<span class="badge">0</span>"#));
    assert!(!response.body.contains("badge-warning"));

    let notified = backend.requests_to(&Method::POST, "/api/checkout/payment-success");
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0].json()["paymentIntentId"], "pi_9");
    assert_eq!(notified[0].json()["orderId"], 9);
    assert_eq!(notified[0].authorization.as_deref(), Some("Bearer token-sam"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        cascade(&backend),
        [(Method::DELETE, "/api/cart/force-clear".to_string(), None)]
    );

    let badge = browser.htmx_get("/cart/count").await;
    assert!(badge.body.contains(r#"<span class="badge">0</span>"#));

    let again = browser.get("/checkout/success").await;
    assert_eq!(again.status, StatusCode::OK);
    assert!(again.body.contains("#9"));
}

#[tokio::test]
async fn test_cart_clear_falls_back_to_clear_after_payment() {
    let backend = FakeBackend::start(force_clear_fails).await;
    let mut browser = logged_in(&backend, FAST).await;
    start_payment(&mut browser).await;

    let response = card_result(&mut browser, "succeeded").await;
    assert!(response.body.contains("Thank you for your order!"));

    tokio::time::sleep(Duration::from_millis(200)).await;
    let force = (Method::DELETE, "/api/cart/force-clear".to_string(), None);
    assert_eq!(
        cascade(&backend),
        [
            force.clone(),
            force.clone(),
            force,
            (
                Method::POST,
                "/api/cart/clear-after-payment".to_string(),
                Some("orderId=9".to_string())
            ),
        ]
    );

    let badge = browser.htmx_get("/cart/count").await;
    assert!(badge.body.contains(r#"<span class="badge">0</span>"#));
}

#[tokio::test]
async fn test_clear_cascade_ends_with_plain_clear() {
    let backend = FakeBackend::start(|request| {
        if request.path == "/api/cart/clear" {
            return Reply::ok();
        }
        Reply::error(StatusCode::SERVICE_UNAVAILABLE, "down")
    })
    .await;
    let cart = ApiClient::new(&backend.url())
        .unwrap()
        .cart(Credentials::bearer("t"));
    let policy = RetryPolicy::linear(2, Duration::from_millis(1));

    let endpoint = clear_cart_after_payment(&cart, Some(OrderId::new(9)), &policy)
        .await
        .unwrap();
    assert_eq!(endpoint, ClearEndpoint::Clear);

    let calls: Vec<(Method, String, Option<String>)> = backend
        .requests()
        .into_iter()
        .map(|request| (request.method, request.path, request.query))
        .collect();
    let after_payment = (
        Method::POST,
        "/api/cart/clear-after-payment".to_string(),
        Some("orderId=9".to_string()),
    );
    assert_eq!(
        calls,
        [
            (Method::DELETE, "/api/cart/force-clear".to_string(), None),
            (Method::DELETE, "/api/cart/force-clear".to_string(), None),
            after_payment.clone(),
            after_payment,
            (Method::DELETE, "/api/cart/clear".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn test_clear_cascade_reports_every_failure() {
    let backend =
        FakeBackend::start(|_| Reply::error(StatusCode::SERVICE_UNAVAILABLE, "down")).await;
    let cart = ApiClient::new(&backend.url())
        .unwrap()
        .cart(Credentials::bearer("t"));

    let errors = clear_cart_after_payment(&cart, None, &RetryPolicy::linear(1, Duration::ZERO))
        .await
        .unwrap_err();
    assert_eq!(errors.len(), 3);

    let after_payment = backend.requests_to(&Method::POST, "/api/cart/clear-after-payment");
    assert_eq!(after_payment.len(), 1);
    assert!(after_payment[0].query.is_none());
}

#[tokio::test]
async fn test_unacknowledged_payment_shows_warning() {
    let backend = FakeBackend::start(|request| {
        if request.path == "/api/checkout/payment-success" {
            return Reply::error(StatusCode::BAD_GATEWAY, "order service down");
        }
        checkout_backend(request)
    })
    .await;
    let mut browser = logged_in(&backend, FAST).await;
    start_payment(&mut browser).await;

    let response = card_result(&mut browser, "succeeded").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("hx-retarget"), Some("body"));
    assert!(response.body.contains("Thank you for your order!"));
    assert!(response.body.contains("badge-warning"));
    assert!(response.body.contains("Payment received"));
    assert!(response.body.contains("#9"));

    let again = browser.get("/checkout/success").await;
    assert!(again.body.contains("badge-warning"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        backend.requests_to(&Method::DELETE, "/api/cart/force-clear").len(),
        1
    );
}

#[tokio::test]
async fn test_declined_card_stays_on_checkout() {
    let backend = FakeBackend::start(checkout_backend).await;
    let mut browser = logged_in(&backend, FAST).await;
    start_payment(&mut browser).await;

    let response = browser
        .htmx(
            Method::POST,
            "/checkout/confirm",
            &[
                ("payment_intent_id", "pi_9"),
                ("status", "requires_payment_method"),
                ("error_message", "Your card was declined"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header("hx-retarget").is_none());
    assert!(response.body.contains("Your card was declined"));
    assert!(response.body.contains("You have not been charged"));
    assert!(!response.body.contains("Thank you for your order!"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(
        backend
            .requests_to(&Method::POST, "/api/checkout/payment-success")
            .is_empty()
    );
    assert!(cascade(&backend).is_empty());

    let success = browser.get("/checkout/success").await;
    assert!(success.status.is_redirection());
    assert_eq!(success.header("location"), Some("/marketplace"));
}

#[tokio::test]
async fn test_logout_during_cart_clear_stays_logged_out() {
    let backend = FakeBackend::start(force_clear_fails).await;
    let slow = RetryPolicy::linear(3, Duration::from_millis(150));
    let mut browser = logged_in(&backend, slow).await;
    start_payment(&mut browser).await;

    let response = card_result(&mut browser, "succeeded").await;
    assert!(response.body.contains("Thank you for your order!"));

    let logout = browser.submit("/logout", &[]).await;
    assert!(logout.status.is_redirection());
    let cart = browser.get("/cart").await;
    assert!(cart.status.is_redirection());
    assert_eq!(cart.header("location"), Some("/login?next=%2Fcart"));

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(
        backend
            .requests_to(&Method::POST, "/api/cart/clear-after-payment")
            .len(),
        1
    );

    let cart = browser.get("/cart").await;
    assert!(cart.status.is_redirection());
    assert_eq!(cart.header("location"), Some("/login?next=%2Fcart"));
}
