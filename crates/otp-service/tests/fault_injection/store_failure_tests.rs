//! Store failure tests
//!
//! Wraps the in-process store in a switch that makes every call fail, then
//! drives the router directly with `oneshot`. Storage failures must surface
//! as 500 without leaking backend detail, and must not corrupt state once
//! the store recovers.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use otp_service::clock::ManualClock;
use otp_service::crypto::TokenIssuer;
use otp_service::errors::OtpError;
use otp_service::repositories::{InMemoryUserRepository, StoreOtpRepository};
use otp_service::routes::{build_routes, AppState};
use otp_service::services::{AuthService, CapturingOtpSender, UserService};
use otp_service::store::{EphemeralStore, MemoryStore, Replacement};
use otp_test_utils::{assert_error_code, TEST_JWT_SECRET, TEST_PHONE_ALICE};
use secrecy::SecretString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Store that fails every call while `down` is set, and only `set` while
/// `writes_down` is set
struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
    writes_down: AtomicBool,
}

fn outage() -> OtpError {
    OtpError::Storage("connection refused (os error 111) at 10.0.0.5:6379".to_string())
}

impl FlakyStore {
    fn check(&self) -> Result<(), OtpError> {
        if self.down.load(Ordering::SeqCst) {
            Err(outage())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EphemeralStore for FlakyStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), OtpError> {
        self.check()?;
        if self.writes_down.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, OtpError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), OtpError> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn increment(&self, key: &str) -> Result<i64, OtpError> {
        self.check()?;
        self.inner.increment(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), OtpError> {
        self.check()?;
        self.inner.expire(key, ttl).await
    }

    async fn increment_below(
        &self,
        key: &str,
        limit: i64,
        ttl: Duration,
    ) -> Result<Option<i64>, OtpError> {
        self.check()?;
        self.inner.increment_below(key, limit, ttl).await
    }

    async fn decrement_above_zero(&self, key: &str) -> Result<Option<i64>, OtpError> {
        self.check()?;
        self.inner.decrement_above_zero(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        replacement: Replacement<'_>,
    ) -> Result<bool, OtpError> {
        self.check()?;
        self.inner.compare_and_swap(key, expected, replacement).await
    }
}

struct Harness {
    router: Router,
    store: Arc<FlakyStore>,
    sender: Arc<CapturingOtpSender>,
    users: Arc<InMemoryUserRepository>,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(clock.clone()),
        down: AtomicBool::new(false),
        writes_down: AtomicBool::new(false),
    });
    let users = Arc::new(InMemoryUserRepository::new());
    let sender = Arc::new(CapturingOtpSender::new());

    let auth_service = Arc::new(AuthService::new(
        Arc::new(StoreOtpRepository::new(store.clone(), clock.clone())),
        users.clone(),
        TokenIssuer::new(SecretString::from(TEST_JWT_SECRET), clock.clone(), 300),
        sender.clone(),
        clock,
    ));
    let state = Arc::new(AppState {
        auth_service,
        user_service: Arc::new(UserService::new(users.clone())),
    });
    let handle = PrometheusBuilder::new().build_recorder().handle();

    Harness {
        router: build_routes(state, handle),
        store,
        sender,
        users,
    }
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builder should succeed")
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

fn request_otp() -> Request<Body> {
    post_json(
        "/api/v1/auth/request-otp",
        serde_json::json!({ "phone_number": TEST_PHONE_ALICE }),
    )
}

fn verify_otp(code: &str) -> Request<Body> {
    post_json(
        "/api/v1/auth/verify-otp",
        serde_json::json!({ "phone_number": TEST_PHONE_ALICE, "otp": code }),
    )
}

#[tokio::test]
async fn test_request_otp_store_down_is_500_without_detail() {
    let h = harness();
    h.store.down.store(true, Ordering::SeqCst);

    let (status, body) = send(&h.router, request_otp()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error_code(&body, "STORAGE_ERROR");
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(!message.contains("10.0.0.5"), "leaked detail: {message}");
    assert_eq!(h.sender.sent_count(TEST_PHONE_ALICE).await, 0);
}

#[tokio::test]
async fn test_verify_store_down_creates_no_user() {
    let h = harness();

    let (status, _) = send(&h.router, request_otp()).await;
    assert_eq!(status, StatusCode::OK);
    let code = h.sender.last_code(TEST_PHONE_ALICE).await.unwrap_or_default();

    h.store.down.store(true, Ordering::SeqCst);
    let (status, body) = send(&h.router, verify_otp(&code)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error_code(&body, "STORAGE_ERROR");
    assert!(h.users.is_empty().await);

    // The outage did not consume the code
    h.store.down.store(false, Ordering::SeqCst);
    let (status, body) = send(&h.router, verify_otp(&code)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_new_user"], true);
}

#[tokio::test]
async fn test_failed_writes_do_not_use_up_rate_limit() {
    let h = harness();
    h.store.writes_down.store(true, Ordering::SeqCst);

    for _ in 0..3 {
        let (status, body) = send(&h.router, request_otp()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_error_code(&body, "STORAGE_ERROR");
    }
    assert_eq!(h.sender.sent_count(TEST_PHONE_ALICE).await, 0);

    h.store.writes_down.store(false, Ordering::SeqCst);
    let (status, _) = send(&h.router, request_otp()).await;
    assert_eq!(status, StatusCode::OK);

    let code = h.sender.last_code(TEST_PHONE_ALICE).await.unwrap_or_default();
    let (status, body) = send(&h.router, verify_otp(&code)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_new_user"], true);
}

#[tokio::test]
async fn test_health_unaffected_by_store_outage() {
    let h = harness();
    h.store.down.store(true, Ordering::SeqCst);

    let request = Request::get("/health")
        .body(Body::empty())
        .expect("request builder should succeed");
    let (status, body) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
