//! In-process AccessGuard API stand-in for integration tests.
//!
//! Spawns the real router on an ephemeral port and lets tests flip failure
//! modes (refresh rejection, permanent 401s, 500s) while counting refresh
//! round-trips.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use accessguard_client::{ApiClient, ClientConfig, SessionStore, SessionTokens};

#[derive(Clone)]
pub struct ServerOptions {
    /// Bearer value protected routes accept; also what a refresh returns.
    pub valid_access: String,
    /// Refresh token the refresh endpoint accepts.
    pub issued_refresh: String,
    /// Refresh token returned alongside a fresh access token.
    pub rotated_refresh: String,
    /// Server-side latency of the refresh endpoint; tests use this to hold
    /// the refresh window open while concurrent requests pile up.
    pub refresh_delay: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            valid_access: "fresh-access".to_string(),
            issued_refresh: "valid-refresh".to_string(),
            rotated_refresh: "rotated-refresh".to_string(),
            refresh_delay: Duration::ZERO,
        }
    }
}

pub struct ServerState {
    pub options: ServerOptions,
    pub refresh_calls: AtomicUsize,
    pub fail_refresh: AtomicBool,
    pub protected_always_401: AtomicBool,
    pub fail_users_with_500: AtomicBool,
    /// Strict mode: only the most recently issued refresh token is valid,
    /// and every refresh rotates both tokens.
    strict_rotation: AtomicBool,
    accepted_access: Mutex<String>,
    accepted_refresh: Mutex<String>,
}

impl ServerState {
    fn current_access(&self) -> String {
        if self.strict_rotation.load(Ordering::SeqCst) {
            self.accepted_access.lock().unwrap().clone()
        } else {
            self.options.valid_access.clone()
        }
    }
}

pub struct TestServer {
    pub base_url: String,
    pub state: Arc<ServerState>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn(options: ServerOptions) -> Self {
        accessguard_observability::init();

        let state = Arc::new(ServerState {
            accepted_access: Mutex::new(options.valid_access.clone()),
            accepted_refresh: Mutex::new(options.issued_refresh.clone()),
            options,
            refresh_calls: AtomicUsize::new(0),
            fail_refresh: AtomicBool::new(false),
            protected_always_401: AtomicBool::new(false),
            fail_users_with_500: AtomicBool::new(false),
            strict_rotation: AtomicBool::new(false),
        });

        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/refresh-token", post(refresh))
            .route("/auth/logout", post(logout))
            .route("/user/me", get(me))
            .route("/user", get(users))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, state, handle }
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    /// Switch the refresh endpoint to strict rotation: each call issues a
    /// fresh pair and invalidates the refresh token it replaced.
    pub fn enable_strict_rotation(&self) {
        self.state.strict_rotation.store(true, Ordering::SeqCst);
    }

    /// Revoke the currently accepted access token so the next protected
    /// request 401s. Strict-rotation mode only.
    pub fn expire_access(&self) {
        *self.state.accepted_access.lock().unwrap() = "revoked".to_string();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn client_with_tokens(server: &TestServer, access: &str, refresh: &str) -> (ApiClient, SessionStore) {
    let store = SessionStore::in_memory();
    store.set(SessionTokens {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    });
    let client = ApiClient::new(ClientConfig::new(server.base_url.clone()), store.clone()).unwrap();
    (client, store)
}

pub fn client_without_tokens(server: &TestServer) -> (ApiClient, SessionStore) {
    let store = SessionStore::in_memory();
    let client = ApiClient::new(ClientConfig::new(server.base_url.clone()), store.clone()).unwrap();
    (client, store)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
}

async fn login(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if body.get("password").and_then(|v| v.as_str()) != Some("secret") {
        return unauthorized("invalid credentials");
    }

    Json(json!({
        "accessToken": state.options.valid_access,
        "refreshToken": state.options.issued_refresh,
    }))
    .into_response()
}

async fn refresh(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let n = state.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::time::sleep(state.options.refresh_delay).await;

    if state.fail_refresh.load(Ordering::SeqCst) {
        return unauthorized("refresh token expired");
    }

    if state.strict_rotation.load(Ordering::SeqCst) {
        let mut accepted = state.accepted_refresh.lock().unwrap();
        if body.get("refreshToken").and_then(|v| v.as_str()) != Some(accepted.as_str()) {
            return unauthorized("unknown refresh token");
        }
        let access = format!("access-{n}");
        *accepted = format!("refresh-{n}");
        *state.accepted_access.lock().unwrap() = access.clone();
        let refresh = accepted.clone();
        return Json(json!({ "accessToken": access, "refreshToken": refresh })).into_response();
    }

    if body.get("refreshToken").and_then(|v| v.as_str()) != Some(state.options.issued_refresh.as_str()) {
        return unauthorized("unknown refresh token");
    }

    Json(json!({
        "accessToken": state.options.valid_access,
        "refreshToken": state.options.rotated_refresh,
    }))
    .into_response()
}

async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn me(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if state.protected_always_401.load(Ordering::SeqCst)
        || bearer(&headers) != Some(state.current_access().as_str())
    {
        return unauthorized("jwt expired");
    }

    Json(json!({
        "user": {
            "_id": "u-1",
            "name": "Grace",
            "email": "grace@example.com",
            "roles": ["admin"],
            "permissions": [],
            "isActive": true,
        }
    }))
    .into_response()
}

async fn users(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if state.fail_users_with_500.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "boom" })))
            .into_response();
    }
    if state.protected_always_401.load(Ordering::SeqCst)
        || bearer(&headers) != Some(state.current_access().as_str())
    {
        return unauthorized("jwt expired");
    }

    Json(json!([
        { "_id": "u-1", "name": "Grace", "email": "grace@example.com", "roles": ["admin"] }
    ]))
    .into_response()
}
