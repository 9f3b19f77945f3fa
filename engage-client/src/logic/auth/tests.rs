use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, AUTHORIZATION};
use reqwest::StatusCode;

use super::*;
use crate::config::EngageConfig;
use crate::error::ApiError;
use crate::logic::api::{ApiClient, ApiRequest, ApiResponse, Transport};
use crate::logic::telemetry::testing::init_logging;
use crate::logic::telemetry::{AppSystem, EventType, Hit, HitParams, HitSender};

const TOKEN_PATH: &str = "/oauth/token";
const HITS_PATH: &str = "/api/v1/hits";

fn test_config() -> EngageConfig {
    EngageConfig {
        api_url: "http://engage.test".to_string(),
        hits_path: HITS_PATH.to_string(),
        token_path: TOKEN_PATH.to_string(),
        client_id: "engage-test".to_string(),
        app_version: "2.4.0".to_string(),
        build_number: "118".to_string(),
        platform: AppSystem::Ios,
        timeout_seconds: 5,
        data_dir: None,
    }
}

fn response(status: u16, body: &str) -> ApiResponse {
    ApiResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: HeaderMap::new(),
        body: body.to_string(),
    }
}

/// Accepts only `Bearer fresh`; the token endpoint is slow and counted
struct FakeTransport {
    token_status: Mutex<u16>,
    token_body: Mutex<String>,
    reject_all: AtomicBool,
    refresh_calls: AtomicUsize,
    token_requests: Mutex<Vec<serde_json::Value>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    fn new() -> Self {
        Self {
            token_status: Mutex::new(200),
            token_body: Mutex::new(r#"{"access_token":"fresh"}"#.to_string()),
            reject_all: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
            token_requests: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn token_reply(&self, status: u16, body: &str) {
        *self.token_status.lock() = status;
        *self.token_body.lock() = body.to_string();
    }

    fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn seen(&self) -> Vec<ApiRequest> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        if request.path == TOKEN_PATH {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.token_requests
                .lock()
                .push(request.body.clone().unwrap_or_default());

            tokio::time::sleep(Duration::from_millis(20)).await;

            let status = *self.token_status.lock();
            let body = self.token_body.lock().clone();
            return Ok(response(status, &body));
        }

        self.seen.lock().push(request.clone());
        if request.path == "/api/v1/broken" {
            return Ok(response(500, "boom"));
        }

        let authorized = request.header(&AUTHORIZATION) == Some("Bearer fresh")
            && !self.reject_all.load(Ordering::SeqCst);
        if authorized {
            Ok(response(200, r#"{"ok":true}"#))
        } else {
            Ok(response(401, "token expired"))
        }
    }
}

struct Fixture {
    transport: Arc<FakeTransport>,
    credentials: Arc<CredentialStore>,
    refresher: Arc<RefreshCoordinator>,
    public_api: Arc<ApiClient>,
    api: Arc<ApiClient>,
}

async fn fixture(initial: Option<Credentials>) -> Fixture {
    init_logging();
    let config = test_config();
    let transport = Arc::new(FakeTransport::new());
    let credentials = Arc::new(CredentialStore::in_memory());
    if let Some(initial) = initial {
        credentials.set(initial).await.unwrap();
    }

    let public_api = Arc::new(ApiClient::unauthenticated(transport.clone(), &config));
    let refresher = Arc::new(RefreshCoordinator::new(public_api.clone(), credentials.clone(), &config));
    let api = Arc::new(ApiClient::authenticated(
        transport.clone(),
        &config,
        credentials.clone(),
        refresher.clone(),
    ));

    Fixture {
        transport,
        credentials,
        refresher,
        public_api,
        api,
    }
}

// ============================================================================
// REFRESH & REPLAY
// ============================================================================

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let f = fixture(Some(Credentials::new("stale", Some("r1")))).await;

    let calls = (0..3).map(|_| f.api.get_json::<serde_json::Value>("/api/v1/me"));
    let results = futures::future::join_all(calls).await;

    for result in &results {
        assert_eq!(result.as_ref().unwrap()["ok"], true);
    }
    assert_eq!(f.transport.refresh_calls(), 1);
    assert_eq!(f.transport.seen().len(), 6);
    assert!(!f.refresher.is_refreshing());

    // Response omitted refresh_token: previous one is kept
    assert_eq!(f.credentials.access_token().as_deref(), Some("fresh"));
    assert_eq!(f.credentials.refresh_token().as_deref(), Some("r1"));

    let token_request = f.transport.token_requests.lock()[0].clone();
    assert_eq!(
        token_request,
        serde_json::json!({
            "client_id": "engage-test",
            "grant_type": "refresh_token",
            "refresh_token": "r1",
        })
    );
}

#[tokio::test]
async fn test_refresh_response_can_rotate_refresh_token() {
    let f = fixture(Some(Credentials::new("stale", Some("r1")))).await;
    f.transport.token_reply(200, r#"{"access_token":"fresh","refresh_token":"r2"}"#);

    f.api.get_json::<serde_json::Value>("/api/v1/me").await.unwrap();

    assert_eq!(f.credentials.current(), Some(Credentials::new("fresh", Some("r2"))));
}

#[tokio::test]
async fn test_replayed_request_is_marked_and_rebeared() {
    let f = fixture(Some(Credentials::new("stale", Some("r1")))).await;

    f.api.send(ApiRequest::get("/api/v1/me")).await.unwrap();

    let seen = f.transport.seen();
    assert_eq!(seen.len(), 2);
    assert!(!seen[0].retried);
    assert_eq!(seen[0].header(&AUTHORIZATION), Some("Bearer stale"));
    assert!(seen[1].retried);
    assert_eq!(seen[1].header(&AUTHORIZATION), Some("Bearer fresh"));
}

#[tokio::test]
async fn test_replay_401_is_terminal() {
    let f = fixture(Some(Credentials::new("stale", Some("r1")))).await;
    f.transport.reject_all.store(true, Ordering::SeqCst);

    let err = f.api.send(ApiRequest::get("/api/v1/me")).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(f.transport.refresh_calls(), 1);
    assert_eq!(f.transport.seen().len(), 2);
}

#[tokio::test]
async fn test_already_retried_request_skips_refresh() {
    let f = fixture(Some(Credentials::new("stale", Some("r1")))).await;

    let mut request = ApiRequest::get("/api/v1/me");
    request.retried = true;
    let err = f.api.send(request).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(f.transport.refresh_calls(), 0);
    assert!(f.credentials.is_authenticated());
}

#[tokio::test]
async fn test_non_401_errors_pass_through() {
    let f = fixture(Some(Credentials::new("fresh", Some("r1")))).await;

    let err = f.api.send(ApiRequest::get("/api/v1/broken")).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(f.transport.refresh_calls(), 0);
    assert_eq!(f.transport.seen().len(), 1);
}

// ============================================================================
// SIGN-OUT PATHS
// ============================================================================

#[tokio::test]
async fn test_missing_refresh_token_clears_credentials() {
    let f = fixture(Some(Credentials::new("stale", None))).await;
    let mut signed_in = f.credentials.subscribe();

    let err = f.api.send(ApiRequest::get("/api/v1/me")).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(f.transport.refresh_calls(), 0);
    assert!(!f.credentials.is_authenticated());
    signed_in.changed().await.unwrap();
    assert!(!*signed_in.borrow());
}

#[tokio::test]
async fn test_forbidden_refresh_clears_credentials() {
    let f = fixture(Some(Credentials::new("stale", Some("revoked")))).await;
    f.transport.token_reply(403, "refresh token revoked");

    let err = f.api.send(ApiRequest::get("/api/v1/me")).await.unwrap_err();

    // Original 401 surfaces, not the refresh 403
    assert_eq!(err.status(), Some(401));
    assert!(!f.credentials.is_authenticated());
}

#[tokio::test]
async fn test_failed_refresh_keeps_credentials_and_can_retry_later() {
    let f = fixture(Some(Credentials::new("stale", Some("r1")))).await;
    f.transport.token_reply(500, "upstream down");

    let err = f.api.send(ApiRequest::get("/api/v1/me")).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(f.credentials.current(), Some(Credentials::new("stale", Some("r1"))));
    assert!(!f.refresher.is_refreshing());

    // The failed flight was cleared, so the next 401 refreshes again
    f.transport.token_reply(200, r#"{"access_token":"fresh"}"#);
    f.api.send(ApiRequest::get("/api/v1/me")).await.unwrap();
    assert_eq!(f.transport.refresh_calls(), 2);
}

// ============================================================================
// CLIENT FLAVOURS
// ============================================================================

#[tokio::test]
async fn test_unauthenticated_client_sends_no_bearer() {
    let f = fixture(Some(Credentials::new("fresh", Some("r1")))).await;

    let err = f.public_api.send(ApiRequest::get("/api/v1/config")).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!f.public_api.is_authenticated());

    let seen = f.transport.seen();
    assert!(seen[0].header(&AUTHORIZATION).is_none());
    assert_eq!(
        seen[0].header(&HeaderName::from_static(APP_VERSION_HEADER)),
        Some("2.4.0#118")
    );
    assert_eq!(f.transport.refresh_calls(), 0);
}

#[tokio::test]
async fn test_api_client_delivers_hits() {
    let f = fixture(Some(Credentials::new("stale", Some("r1")))).await;
    let context = test_config().hit_context();
    let hit = Hit::new(
        EventType::Open,
        "6f1c1f4e-3f0a-4d8e-9a57-3b1d9c0e2a11",
        "2026-10-18T09:30:00.000+02:00".to_string(),
        &context,
        HitParams::object("event", "e1"),
    );

    f.api.send_hit(&hit).await.unwrap();

    let seen = f.transport.seen();
    let delivered = seen.last().unwrap();
    assert_eq!(delivered.path, HITS_PATH);
    assert_eq!(delivered.method, reqwest::Method::POST);
    assert_eq!(delivered.body.as_ref().unwrap()["event_type"], "open");
    assert_eq!(delivered.body.as_ref().unwrap()["object_id"], "e1");
}
