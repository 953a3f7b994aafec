//! Admin login and entity managers against a fake marketplace backend.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use marketplace_integration_tests::{
    FakeBackend, RecordedRequest, Reply, TestBrowser, admin, login_reply,
};
use serde_json::json;

fn admin_backend(request: &RecordedRequest) -> Reply {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/api/auth/login") => login_reply("ops", "ROLE_ADMIN"),
        ("GET", "/api/admin/buyers") => Reply::json(json!([
            { "buyerId": 11, "username": "sam", "email": "sam@souq.test", "active": true },
            { "buyerId": 12, "username": "lina", "email": "lina@souq.test", "active": false }
        ])),
        ("GET", "/api/admin/admins") => Reply::json(json!([
            { "adminId": 7, "username": "nour", "email": "nour@souq.test" }
        ])),
        ("GET", "/api/categories") => Reply::json(json!([
            { "id": 3, "nameEn": "Fruit", "nameAr": "فواكه" }
        ])),
        ("POST", "/api/products") => Reply::json(json!({
            "id": 90,
            "name": "Medjool Dates",
            "price": 12.5,
            "quantity": 40,
            "categoryId": 3,
            "isOrganic": true
        })),
        _ => Reply::ok(),
    }
}

async fn logged_in(backend: &FakeBackend) -> TestBrowser {
    let mut browser = admin(backend);
    let page = browser.get("/auth/login").await;
    assert_eq!(page.status, StatusCode::OK);

    let response = browser
        .submit("/auth/login", &[("username", "ops"), ("password", "hunter22")])
        .await;
    assert!(response.status.is_redirection());
    assert_eq!(response.header("location"), Some("/"));
    browser
}

#[tokio::test]
async fn test_dashboard_requires_login() {
    let backend = FakeBackend::start(admin_backend).await;
    let mut browser = admin(&backend);

    let response = browser.get("/").await;
    assert!(response.status.is_redirection());
    assert_eq!(response.header("location"), Some("/auth/login"));

    let response = browser.htmx_get("/buyers").await;
    assert_eq!(response.header("hx-redirect"), Some("/auth/login"));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_non_admin_login_is_refused() {
    let backend = FakeBackend::start(|request| {
        if request.path == "/api/auth/login" {
            return login_reply("sam", "BUYER");
        }
        Reply::ok()
    })
    .await;
    let mut browser = admin(&backend);
    let _ = browser.get("/auth/login").await;

    let response = browser
        .submit("/auth/login", &[("username", "sam"), ("password", "hunter22")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("This account is not an admin"));
    assert_eq!(
        backend.requests_to(&Method::POST, "/api/auth/logout").len(),
        1
    );

    let response = browser.get("/").await;
    assert!(response.status.is_redirection());
}

#[tokio::test]
async fn test_wrong_password_is_reported() {
    let backend = FakeBackend::start(|_| Reply::error(StatusCode::UNAUTHORIZED, "bad")).await;
    let mut browser = admin(&backend);
    let _ = browser.get("/auth/login").await;

    let response = browser
        .submit("/auth/login", &[("username", "ops"), ("password", "nope")])
        .await;
    assert!(response.body.contains("Invalid username or password"));
    assert!(response.body.contains(r#"value="ops""#));
}

#[tokio::test]
async fn test_dashboard_shows_counts() {
    let backend = FakeBackend::start(admin_backend).await;
    let mut browser = logged_in(&backend).await;

    let response = browser.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Welcome back, ops."));
    assert!(response.body.contains(r#"href="/buyers""#));
}

#[tokio::test]
async fn test_buyers_page_lists_accounts() {
    let backend = FakeBackend::start(admin_backend).await;
    let mut browser = logged_in(&backend).await;

    let response = browser.get("/buyers").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("sam@souq.test"));
    assert!(response.body.contains("lina@souq.test"));

    let list = backend.requests_to(&Method::GET, "/api/admin/buyers");
    assert_eq!(list[0].authorization.as_deref(), Some("Bearer token-ops"));
}

#[tokio::test]
async fn test_search_narrows_table_body() {
    let backend = FakeBackend::start(admin_backend).await;
    let mut browser = logged_in(&backend).await;

    let response = browser.htmx_get("/buyers?q=lina").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("lina@souq.test"));
    assert!(!response.body.contains("sam@souq.test"));
    assert!(!response.body.contains("<html"));
}

#[tokio::test]
async fn test_load_failure_shows_error_panel() {
    let backend = FakeBackend::start(|request| {
        if request.path == "/api/admin/buyers" {
            return Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        }
        admin_backend(request)
    })
    .await;
    let mut browser = logged_in(&backend).await;

    let response = browser.get("/buyers").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Failed to load buyers"));
}

#[tokio::test]
async fn test_expired_login_redirects_htmx_requests() {
    let backend = FakeBackend::start(|request| {
        if request.path == "/api/admin/sellers" {
            return Reply::error(StatusCode::UNAUTHORIZED, "expired");
        }
        admin_backend(request)
    })
    .await;
    let mut browser = logged_in(&backend).await;

    let response = browser.htmx_get("/sellers").await;
    assert_eq!(response.header("hx-redirect"), Some("/auth/login"));

    let response = browser.get("/buyers").await;
    assert!(response.status.is_redirection());
    assert_eq!(response.header("location"), Some("/auth/login"));
}

#[tokio::test]
async fn test_delete_admin_sends_bearer_delete() {
    let backend = FakeBackend::start(admin_backend).await;
    let mut browser = logged_in(&backend).await;
    let _ = browser.get("/admins").await;

    let response = browser.htmx(Method::DELETE, "/admins/7", &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());

    let deletes = backend.requests_to(&Method::DELETE, "/api/admin/admins/7");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].authorization.as_deref(), Some("Bearer token-ops"));
    assert_eq!(deletes[0].csrf_token.as_deref(), Some("backend-csrf"));
}

#[tokio::test]
async fn test_failed_delete_keeps_row() {
    let backend = FakeBackend::start(|request| {
        if request.method == Method::DELETE {
            return Reply::error(StatusCode::CONFLICT, "Buyer has open orders");
        }
        admin_backend(request)
    })
    .await;
    let mut browser = logged_in(&backend).await;

    let response = browser.htmx(Method::DELETE, "/buyers/11", &[]).await;
    assert_eq!(response.header("hx-reswap"), Some("none"));
    assert!(response.body.contains("Failed to delete buyer"));
}

#[tokio::test]
async fn test_create_product_prepends_row() {
    let backend = FakeBackend::start(admin_backend).await;
    let mut browser = logged_in(&backend).await;

    let response = browser
        .htmx(
            Method::POST,
            "/products",
            &[
                ("name", "Medjool Dates"),
                ("price", "12.50"),
                ("quantity", "40"),
                ("unit", "kg"),
                ("category_id", "3"),
                ("is_organic", "on"),
                ("is_available", "on"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("hx-retarget"), Some("#products-body"));
    assert_eq!(response.header("hx-reswap"), Some("afterbegin"));
    assert!(response.body.contains(r#"id="product-row-90""#));
    assert!(response.body.contains("Product Medjool Dates created"));

    let created = backend.requests_to(&Method::POST, "/api/products");
    assert_eq!(created.len(), 1);
    let body = created[0].json();
    assert_eq!(body["name"], "Medjool Dates");
    assert_eq!(body["categoryId"], 3);
    assert_eq!(body["isOrganic"], true);
}

#[tokio::test]
async fn test_invalid_product_keeps_form_open() {
    let backend = FakeBackend::start(admin_backend).await;
    let mut browser = logged_in(&backend).await;

    let response = browser
        .htmx(
            Method::POST,
            "/products",
            &[("name", ""), ("price", "0"), ("quantity", "-1"), ("category_id", "")],
        )
        .await;
    assert!(response.body.contains(r#"id="product-form""#));
    assert!(response.body.contains("Price must be greater than zero"));
    assert!(response.body.contains("Quantity cannot be negative"));
    assert!(response.body.contains("Choose a category"));
    assert!(backend.requests_to(&Method::POST, "/api/products").is_empty());
}

#[tokio::test]
async fn test_logout_clears_session() {
    let backend = FakeBackend::start(admin_backend).await;
    let mut browser = logged_in(&backend).await;

    let response = browser.htmx(Method::POST, "/auth/logout", &[]).await;
    assert_eq!(response.header("hx-redirect"), Some("/auth/login"));
    assert_eq!(
        backend.requests_to(&Method::POST, "/api/auth/logout").len(),
        1
    );

    let response = browser.get("/").await;
    assert!(response.status.is_redirection());
}
