//! Router-level tests: the full HTTP stack over the in-memory store with a
//! stubbed payment provider.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use herhair_store::domain::payment::{LineItem, PaymentConfirmation, PaymentStatus};
use herhair_store::integrations::{InitializePayment, PaymentProvider, PaymentSession};
use herhair_store::messaging::EventPublisher;
use herhair_store::services::{Credentials, TokenSigner};
use herhair_store::{router, AppState, Repositories, Result};

const ADMIN_EMAIL: &str = "admin@herhair.test";
const ADMIN_PASSWORD: &str = "admin-password";
const VALID_SIGNATURE: &str = "valid-signature";

/// Reports every verified reference as paid for the configured items.
#[derive(Default)]
struct StubPaystack {
    paid: Mutex<Option<(Option<Uuid>, Vec<LineItem>)>>,
}

impl StubPaystack {
    async fn will_confirm(&self, user_id: Option<Uuid>, items: Vec<LineItem>) {
        *self.paid.lock().await = Some((user_id, items));
    }
}

#[async_trait]
impl PaymentProvider for StubPaystack {
    async fn initialize(&self, request: InitializePayment) -> Result<PaymentSession> {
        Ok(PaymentSession {
            authorization_url: format!("https://checkout.test/{}", request.user_id),
            access_code: "code".into(),
            reference: "ref-init".into(),
        })
    }

    async fn verify(&self, reference: &str) -> Result<PaymentConfirmation> {
        let (status, user_id, line_items) = match self.paid.lock().await.clone() {
            Some((user_id, items)) => (PaymentStatus::Success, user_id, items),
            None => (PaymentStatus::NotSuccessful("abandoned".into()), None, vec![]),
        };
        Ok(PaymentConfirmation { reference: reference.into(), status, amount: 10_000, email: None, user_id, line_items })
    }

    fn verify_webhook_signature(&self, _body: &[u8], signature: &str) -> bool {
        signature == VALID_SIGNATURE
    }
}

struct TestApp {
    router: Router,
    paystack: Arc<StubPaystack>,
}

impl TestApp {
    async fn new() -> Self {
        let paystack = Arc::new(StubPaystack::default());
        let state = AppState::new(Repositories::memory(), EventPublisher::disabled(), TokenSigner::new(b"integration-test-secret", 30))
            .with_payments(paystack.clone());
        let admin = Credentials { name: "Admin".into(), email: ADMIN_EMAIL.into(), password: ADMIN_PASSWORD.into() };
        state.auth.ensure_admin(admin).await.unwrap();
        Self { router: router(state), paystack }
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request.header("content-type", "application/json").body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Sends `body` verbatim as a JSON request.
    async fn send_raw(&self, method: &str, uri: &str, token: &str, body: &'static str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self.send("POST", "/api/auth/login", None, Some(json!({ "email": email, "password": password }))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn customer(&self, email: &str) -> (String, Uuid) {
        let (status, body) = self
            .send("POST", "/api/auth/register", None, Some(json!({ "name": "Ada", "email": email, "password": "s3cret-pass" })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (body["token"].as_str().unwrap().to_string(), body["id"].as_str().unwrap().parse().unwrap())
    }

    async fn product(&self, admin: &str, quantity: u32) -> String {
        let (_, category) = self.send("POST", "/api/categories", Some(admin), Some(json!({ "name": format!("Wigs {}", Uuid::now_v7()) }))).await;
        let (status, body) = self
            .send("POST", "/api/products/new", Some(admin), Some(json!({
                "name": "Bone Straight 20\"", "price": 250, "category": category["id"], "quantity": quantity,
            })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["product"]["id"].as_str().unwrap().to_string()
    }

    async fn stock(&self, product: &str) -> (u64, String) {
        let (_, body) = self.send("GET", &format!("/api/products/{product}"), None, None).await;
        (body["quantity"].as_u64().unwrap(), body["status"].as_str().unwrap().to_string())
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_checkout_decrements_and_clears_cart() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (token, _) = app.customer("ada@example.com").await;
    let product = app.product(&admin, 5).await;

    let (status, _) = app.send("POST", "/api/cart/add", Some(&token), Some(json!({ "productId": product, "quantity": 3 }))).await;
    assert_eq!(status, StatusCode::OK);

    let items = json!({ "items": [{ "productId": product, "quantity": 3 }] });
    let (status, body) = app.send("POST", "/api/checkout/complete", Some(&token), Some(items.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["appliedCount"], 1);
    assert_eq!(app.stock(&product).await, (2, "low stock".to_string()));

    let (_, cart) = app.send("GET", "/api/cart", Some(&token), None).await;
    assert_eq!(cart, json!([]));

    // Clamped at zero rather than going negative.
    app.send("POST", "/api/checkout/complete", Some(&token), Some(items)).await;
    assert_eq!(app.stock(&product).await, (0, "out of stock".to_string()));
}

#[tokio::test]
async fn test_checkout_skips_deleted_products() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (token, _) = app.customer("ada@example.com").await;
    let kept = app.product(&admin, 10).await;
    let deleted = app.product(&admin, 10).await;
    let (status, _) = app.send("DELETE", &format!("/api/products/{deleted}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send("POST", "/api/checkout/complete", Some(&token), Some(json!({ "items": [
            { "productId": deleted, "quantity": 1 },
            { "productId": kept, "quantity": 4 },
        ] })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appliedCount"], 1);
    assert_eq!(body["skippedProductRefs"], json!([deleted]));
    assert_eq!(app.stock(&kept).await, (6, "in stock".to_string()));
}

#[tokio::test]
async fn test_payment_verification_reconciles_once() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (token, user_id) = app.customer("ada@example.com").await;
    let product: Uuid = app.product(&admin, 5).await.parse().unwrap();

    let (status, body) = app.send("GET", "/api/paystack/verify/ref-1", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payment failed");

    app.paystack.will_confirm(Some(user_id), vec![LineItem { product_id: product, quantity: 2 }]).await;
    let (status, body) = app.send("GET", "/api/paystack/verify/ref-1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reconciliation"]["outcome"], "reconciled");

    let (_, body) = app.send("GET", "/api/paystack/verify/ref-1", Some(&token), None).await;
    assert_eq!(body["reconciliation"]["outcome"], "already_processed");
    assert_eq!(app.stock(&product.to_string()).await.0, 3);
}

#[tokio::test]
async fn test_webhook_requires_signature() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, user_id) = app.customer("ada@example.com").await;
    let product = app.product(&admin, 5).await;
    let payload = json!({
        "event": "charge.success",
        "data": {
            "reference": "ref-hook", "status": "success", "amount": 50000,
            "metadata": { "user_id": user_id, "items": [{ "productId": product, "quantity": 1 }] }
        }
    })
    .to_string();

    let webhook = |signature: &'static str| {
        Request::builder()
            .method("POST")
            .uri("/api/paystack/webhook")
            .header("x-paystack-signature", signature)
            .header("content-type", "application/json")
            .body(Body::from(payload.clone()))
            .unwrap()
    };

    let response = app.router.clone().oneshot(webhook("forged")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.stock(&product).await.0, 5);

    for _ in 0..2 {
        let response = app.router.clone().oneshot(webhook(VALID_SIGNATURE)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(app.stock(&product).await, (4, "low stock".to_string()));
}

#[tokio::test]
async fn test_admin_routes_are_guarded() {
    let app = TestApp::new().await;
    let (token, _) = app.customer("ada@example.com").await;
    let body = json!({ "name": "Closures" });

    let (status, _) = app.send("POST", "/api/categories", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = app.send("POST", "/api/categories", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized as an admin");
}

#[tokio::test]
async fn test_catalog_errors() {
    let app = TestApp::new().await;
    let admin = app.admin().await;

    let (status, body) = app.send("GET", "/api/products/status/bogus", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid status");

    let (status, _) = app.send("GET", &format!("/api/products/{}", Uuid::now_v7()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.send("POST", "/api/categories", Some(&admin), Some(json!({ "name": "Closures" }))).await;
    let (status, body) = app.send("POST", "/api/categories", Some(&admin), Some(json!({ "name": "Closures" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Category already exists");

    let (_, category) = app.send("POST", "/api/categories", Some(&admin), Some(json!({ "name": "Frontals" }))).await;
    let (status, _) = app
        .send("POST", "/api/products/new", Some(&admin), Some(json!({
            "name": "Frontal", "price": 100, "discountedPrice": 100, "category": category["id"], "quantity": 1,
        })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sell_is_strict_and_status_filter() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let product = app.product(&admin, 6).await;

    let (status, body) = app.send("POST", &format!("/api/products/{product}/sell"), Some(&admin), Some(json!({ "amount": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["status"], "low stock");

    let (status, body) = app.send("POST", &format!("/api/products/{product}/sell"), Some(&admin), Some(json!({ "amount": 9 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Not enough stock");

    let (_, low) = app.send("GET", "/api/products/status/low%20stock", None, None).await;
    assert_eq!(low.as_array().map(Vec::len), Some(1));

    let (status, body) = app.send("POST", &format!("/api/products/{product}/restock"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["quantity"], 5);
}

#[tokio::test]
async fn test_stock_adjustment_body_must_parse() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let product = app.product(&admin, 6).await;
    let sell = format!("/api/products/{product}/sell");

    for body in [r#"{"amount":-2}"#, r#"{"amount":"3"}"#, "amount=3"] {
        let (status, _) = app.send_raw("POST", &sell, &admin, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
    assert_eq!(app.stock(&product).await.0, 6);

    let (status, body) = app.send_raw("POST", &sell, &admin, "{}").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["quantity"], 5);

    let (status, _) = app.send_raw("POST", &format!("/api/products/{product}/restock"), &admin, r#"{"amount":-1}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock(&product).await.0, 5);
}

#[tokio::test]
async fn test_product_reads_populate_category() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, category) = app.send("POST", "/api/categories", Some(&admin), Some(json!({ "name": "Lace Wigs" }))).await;
    let (_, created) = app
        .send("POST", "/api/products/new", Some(&admin), Some(json!({
            "name": "Lace Front", "price": 300, "category": category["id"], "quantity": 2,
        })))
        .await;
    let product = created["product"]["id"].as_str().unwrap().to_string();
    let expected = json!({ "id": category["id"], "name": "Lace Wigs", "slug": "lace-wigs" });

    let (_, body) = app.send("GET", &format!("/api/products/{product}"), None, None).await;
    assert_eq!(body["category"], expected);
    let (_, list) = app.send("GET", "/api/products", None, None).await;
    assert_eq!(list[0]["category"], expected);
    let (_, low) = app.send("GET", "/api/products/status/low%20stock", None, None).await;
    assert_eq!(low[0]["category"], expected);

    app.send("DELETE", &format!("/api/categories/{}", category["id"].as_str().unwrap()), Some(&admin), None).await;
    let (status, body) = app.send("GET", &format!("/api/products/{product}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["category"].is_null());
}

#[tokio::test]
async fn test_zero_discount_is_no_discount() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, category) = app.send("POST", "/api/categories", Some(&admin), Some(json!({ "name": "Bundles" }))).await;
    let (status, body) = app
        .send("POST", "/api/products/new", Some(&admin), Some(json!({
            "name": "Body Wave", "price": 100, "discountedPrice": 0, "category": category["id"], "quantity": 1,
        })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["product"]["discountedPrice"].is_null());

    let product = body["product"]["id"].as_str().unwrap().to_string();
    let (_, body) = app.send("PUT", &format!("/api/products/{product}"), Some(&admin), Some(json!({ "discountedPrice": 80 }))).await;
    assert_eq!(body["product"]["discountedPrice"], "80");
    let (_, body) = app.send("PUT", &format!("/api/products/{product}"), Some(&admin), Some(json!({ "discountedPrice": 0 }))).await;
    assert!(body["product"]["discountedPrice"].is_null());
}

#[tokio::test]
async fn test_cart_and_favorites() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (token, _) = app.customer("ada@example.com").await;
    let product = app.product(&admin, 10).await;

    app.send("POST", "/api/cart/add", Some(&token), Some(json!({ "productId": product }))).await;
    let (_, body) = app.send("POST", "/api/cart/add", Some(&token), Some(json!({ "productId": product, "quantity": 2 }))).await;
    assert_eq!(body["cart"], json!([{ "productId": product, "quantity": 3 }]));

    let (status, body) = app.send("PUT", "/api/cart/update", Some(&token), Some(json!({ "productId": product, "quantity": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Quantity must be at least 1");

    let (_, cart) = app.send("GET", "/api/cart", Some(&token), None).await;
    assert_eq!(cart[0]["quantity"], 3);
    assert_eq!(cart[0]["product"]["id"], product.as_str());

    let (status, _) = app.send("DELETE", &format!("/api/cart/remove/{product}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.send("DELETE", &format!("/api/cart/remove/{product}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"], json!([]));

    app.send("POST", "/api/favorites/add", Some(&token), Some(json!({ "productId": product }))).await;
    let (_, body) = app.send("POST", "/api/favorites/add", Some(&token), Some(json!({ "productId": product }))).await;
    assert_eq!(body["favorites"], json!([product]));
    let (_, body) = app.send("DELETE", &format!("/api/favorites/remove/{product}"), Some(&token), None).await;
    assert_eq!(body["favorites"], json!([]));
}

#[tokio::test]
async fn test_auth_flow() {
    let app = TestApp::new().await;
    let (token, user_id) = app.customer("ada@example.com").await;

    let (status, me) = app.send("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user_id.to_string());
    assert!(me.get("passwordHash").is_none());

    let (status, _) = app
        .send("POST", "/api/auth/register", None, Some(json!({ "name": "Ada", "email": "ADA@example.com", "password": "x" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.send("POST", "/api/auth/login", None, Some(json!({ "email": "ada@example.com", "password": "nope" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, _) = app.send("GET", "/api/auth/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_contact_without_mailer() {
    let app = TestApp::new().await;
    let (status, _) = app
        .send("POST", "/api/contact", None, Some(json!({ "name": "Eve", "email": "eve@example.com", "message": "Hi" })))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
