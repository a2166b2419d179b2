//! End-to-end API tests over the assembled router with the in-memory backend.
//!
//! Requests go through `tower::ServiceExt::oneshot`; the session cookie from
//! one response is replayed on the next request, the way a browser would.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use freshline_server::config::{Config, StorageBackend};
use freshline_server::middleware::memory_session_layer;
use freshline_server::state::AppState;
use freshline_server::storage::{MemStorage, Storage};

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        storage_backend: StorageBackend::Memory,
        database_url: None,
        secure_cookies: false,
        revenue_includes_cancelled: true,
        strict_status_flow: false,
    }
}

fn test_app() -> Router {
    let storage: Arc<dyn Storage> = Arc::new(MemStorage::new());
    let state = AppState::new(test_config(), storage);
    freshline_server::app(state, memory_session_layer(false))
}

fn registration(email: &str) -> Value {
    json!({
        "email": email,
        "password": "secret99",
        "firstName": "Ravi",
        "lastName": "Sharma",
        "businessName": "Sharma General Store",
        "phone": "9800000002",
        "address": "12 Station Road",
        "city": "Pune",
        "state": "MH",
        "pincode": "411001"
    })
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Extract the session cookie pair from a response.
fn session_cookie(response: &Response<Body>) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response should set a session cookie")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_owned()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a user and return their session cookie.
async fn register(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/register",
            None,
            Some(&registration(email)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response)
}

#[tokio::test]
async fn health_endpoints() {
    let app = test_app();

    let live = app
        .clone()
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(live.status(), StatusCode::OK);

    let ready = app
        .clone()
        .oneshot(request("GET", "/health/ready", None, None))
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_assigns_roles_and_logs_in() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/register",
            None,
            Some(&registration("first@example.com")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    let body = body_json(response).await;
    assert_eq!(body["role"], "admin");
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("password_hash").is_none());

    // Session works immediately, no separate login needed.
    let me = app
        .clone()
        .oneshot(request("GET", "/api/auth/me", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["email"], "first@example.com");

    let second = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/register",
            None,
            Some(&registration("second@example.com")),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(second).await["role"], "customer");
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = test_app();
    register(&app, "dup@example.com").await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/register",
            None,
            Some(&registration("dup@example.com")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_failures_are_uniform() {
    let app = test_app();
    register(&app, "ravi@example.com").await;

    let wrong_password = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(&json!({ "email": "ravi@example.com", "password": "nope99" })),
        ))
        .await
        .unwrap();
    let unknown_email = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(&json!({ "email": "ghost@example.com", "password": "secret99" })),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    // Same message either way, so account existence doesn't leak.
    let a = body_json(wrong_password).await;
    let b = body_json(unknown_email).await;
    assert_eq!(a["message"], b["message"]);
}

#[tokio::test]
async fn logout_clears_the_session_and_is_idempotent() {
    let app = test_app();
    let cookie = register(&app, "ravi@example.com").await;

    let logout = app
        .clone()
        .oneshot(request("POST", "/api/auth/logout", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(logout.status(), StatusCode::OK);

    let me = app
        .clone()
        .oneshot(request("GET", "/api/auth/me", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    // Logging out without a session is still fine.
    let anonymous = app
        .clone()
        .oneshot(request("POST", "/api/auth/logout", None, None))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::OK);
}

#[tokio::test]
async fn guards_reject_anonymous_and_non_admin() {
    let app = test_app();
    register(&app, "admin@example.com").await; // first = admin
    let customer = register(&app, "customer@example.com").await;

    let anonymous = app
        .clone()
        .oneshot(request("GET", "/api/cart", None, None))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let forbidden = app
        .clone()
        .oneshot(request("GET", "/api/admin/stats", Some(&customer), None))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let low_stock = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/inventory/low-stock",
            Some(&customer),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(low_stock.status(), StatusCode::FORBIDDEN);
}

/// Admin seeds a product, customer fills a cart and checks out.
async fn seed_and_fill_cart(app: &Router) -> (String, String, i64) {
    let admin = register(app, "admin@example.com").await;
    let customer = register(app, "customer@example.com").await;

    let category = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/categories",
            Some(&admin),
            Some(&json!({ "name": "Fruits", "icon": "apple" })),
        ))
        .await
        .unwrap();
    assert_eq!(category.status(), StatusCode::OK);
    let category_id = body_json(category).await["id"].as_i64().unwrap();

    let product = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/products",
            Some(&admin),
            Some(&json!({
                "name": "Fresh Apples",
                "categoryId": category_id,
                "price": "120.00",
                "unit": "kg"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(product.status(), StatusCode::OK);
    let product_id = body_json(product).await["id"].as_i64().unwrap();

    let add = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/cart",
            Some(&customer),
            Some(&json!({ "productId": product_id, "quantity": 2 })),
        ))
        .await
        .unwrap();
    assert_eq!(add.status(), StatusCode::OK);

    (admin, customer, product_id)
}

#[tokio::test]
async fn checkout_snapshots_prices_and_clears_cart() {
    let app = test_app();
    let (_admin, customer, _product_id) = seed_and_fill_cart(&app).await;

    let cart = app
        .clone()
        .oneshot(request("GET", "/api/cart", Some(&customer), None))
        .await
        .unwrap();
    let cart_body = body_json(cart).await;
    assert_eq!(cart_body.as_array().unwrap().len(), 1);
    assert_eq!(cart_body[0]["quantity"], 2);
    assert_eq!(cart_body[0]["product"]["price"], "120.00");

    let checkout = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/orders",
            Some(&customer),
            Some(&json!({ "deliveryAddress": "12 Station Road" })),
        ))
        .await
        .unwrap();
    assert_eq!(checkout.status(), StatusCode::OK);
    let order = body_json(checkout).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["totalAmount"], "240.00");
    assert!(order["orderNumber"].as_str().unwrap().starts_with("FL"));

    let order_id = order["id"].as_i64().unwrap();
    let detail = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/orders/{order_id}"),
            Some(&customer),
            None,
        ))
        .await
        .unwrap();
    let detail_body = body_json(detail).await;
    let items = detail_body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["price"], "120.00");
    assert_eq!(items[0]["total"], "240.00");

    // Cart is gone after checkout.
    let cart_after = app
        .clone()
        .oneshot(request("GET", "/api/cart", Some(&customer), None))
        .await
        .unwrap();
    assert!(body_json(cart_after).await.as_array().unwrap().is_empty());

    // Second checkout fails: the cart is empty now.
    let again = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/orders",
            Some(&customer),
            Some(&json!({ "deliveryAddress": "12 Station Road" })),
        ))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_visibility_owner_admin_stranger() {
    let app = test_app();
    let (admin, customer, _product_id) = seed_and_fill_cart(&app).await;
    let stranger = register(&app, "stranger@example.com").await;

    let checkout = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/orders",
            Some(&customer),
            Some(&json!({ "deliveryAddress": "12 Station Road" })),
        ))
        .await
        .unwrap();
    let order_id = body_json(checkout).await["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{order_id}");

    let owner = app
        .clone()
        .oneshot(request("GET", &uri, Some(&customer), None))
        .await
        .unwrap();
    assert_eq!(owner.status(), StatusCode::OK);

    let as_admin = app
        .clone()
        .oneshot(request("GET", &uri, Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(as_admin.status(), StatusCode::OK);

    let as_stranger = app
        .clone()
        .oneshot(request("GET", &uri, Some(&stranger), None))
        .await
        .unwrap();
    assert_eq!(as_stranger.status(), StatusCode::FORBIDDEN);

    let missing = app
        .clone()
        .oneshot(request("GET", "/api/orders/9999", Some(&customer), None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cart_rejects_bad_quantity_and_unknown_product() {
    let app = test_app();
    let (_admin, customer, product_id) = seed_and_fill_cart(&app).await;

    let zero = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/cart",
            Some(&customer),
            Some(&json!({ "productId": product_id, "quantity": 0 })),
        ))
        .await
        .unwrap();
    assert_eq!(zero.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/cart",
            Some(&customer),
            Some(&json!({ "productId": 9999, "quantity": 1 })),
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_listing_is_public_and_filterable() {
    let app = test_app();
    let (_admin, _customer, _product_id) = seed_and_fill_cart(&app).await;

    let all = app
        .clone()
        .oneshot(request("GET", "/api/products", None, None))
        .await
        .unwrap();
    assert_eq!(all.status(), StatusCode::OK);
    let body = body_json(all).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["category"]["name"], "Fruits");
    assert_eq!(body[0]["inventory"]["quantity"], 0);

    let filtered = app
        .clone()
        .oneshot(request("GET", "/api/products?search=apple", None, None))
        .await
        .unwrap();
    assert_eq!(body_json(filtered).await.as_array().unwrap().len(), 1);

    let no_match = app
        .clone()
        .oneshot(request("GET", "/api/products?search=mango", None, None))
        .await
        .unwrap();
    assert!(body_json(no_match).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_stats_and_status_updates() {
    let app = test_app();
    let (admin, customer, _product_id) = seed_and_fill_cart(&app).await;

    let checkout = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/orders",
            Some(&customer),
            Some(&json!({ "deliveryAddress": "12 Station Road" })),
        ))
        .await
        .unwrap();
    let order_id = body_json(checkout).await["id"].as_i64().unwrap();

    let stats = app
        .clone()
        .oneshot(request("GET", "/api/admin/stats", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(stats.status(), StatusCode::OK);
    let stats_body = body_json(stats).await;
    assert_eq!(stats_body["totalOrders"], 1);
    assert_eq!(stats_body["totalRevenue"], "240.00");
    assert_eq!(stats_body["totalProducts"], 1);
    assert_eq!(stats_body["totalCustomers"], 1);

    let update = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&admin),
            Some(&json!({ "status": "processing" })),
        ))
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::OK);
    assert_eq!(body_json(update).await["status"], "processing");

    let all_orders = app
        .clone()
        .oneshot(request("GET", "/api/admin/orders", Some(&admin), None))
        .await
        .unwrap();
    let orders = body_json(all_orders).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["user"]["email"], "customer@example.com");
}
