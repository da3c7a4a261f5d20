//! Dispatch pipeline and the refresh protocol.
//!
//! Every outbound call goes through [`ApiClient::execute`]: attach the
//! stored bearer token, send, and on a 401 run the refresh protocol — at
//! most one refresh round-trip in flight process-wide, with concurrent
//! callers parked on a FIFO queue and replayed once against the new token.

use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::events::{SessionEvent, SessionEvents, TerminationReason};
use crate::store::{SessionStore, SessionTokens};

/// The one endpoint that must never re-enter the refresh protocol.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// A replayable request: everything needed to send the same call twice.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// Refresh coordination state, owned by the client (never module-global).
///
/// # Invariants
/// - `waiters` is only ever non-empty while `in_flight` is true.
/// - The queue is drained exactly once per refresh attempt, in enqueue
///   order, then reset to empty.
#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<tokio::sync::oneshot::Sender<ApiResult<String>>>,
}

/// HTTP client for the AccessGuard API.
///
/// Cheap to clone; clones share the token store, the event channel, and the
/// refresh coordination state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    store: SessionStore,
    events: SessionEvents,
    refresh: Mutex<RefreshState>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: SessionStore) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                store,
                events: SessionEvents::new(),
                refresh: Mutex::new(RefreshState::default()),
            }),
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn events(&self) -> &SessionEvents {
        &self.inner.events
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Send a request through the full pipeline and return the raw response.
    ///
    /// A 401 from anything but the refresh endpoint triggers the refresh
    /// protocol and a single replay with the new token. A second 401, and
    /// every other status, is returned to the caller as-is.
    pub async fn execute(&self, request: &ApiRequest) -> ApiResult<reqwest::Response> {
        let mut token = self.inner.store.access_token();
        let mut retried = false;

        loop {
            let response = self.send_once(request, token.as_deref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED
                || request.path() == REFRESH_PATH
                || retried
            {
                return Ok(response);
            }

            tracing::debug!(path = %request.path(), "401 received, refreshing access token");
            token = Some(self.refresh_access_token().await?);
            retried = true;
        }
    }

    /// Execute and deserialize a JSON body.
    pub async fn request<T: DeserializeOwned>(&self, request: &ApiRequest) -> ApiResult<T> {
        let response = self.execute(request).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Execute, discarding the response body.
    pub async fn request_unit(&self, request: &ApiRequest) -> ApiResult<()> {
        let response = self.execute(request).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// Best-effort server notification, then unconditional local teardown.
    ///
    /// The server call failing (network down, token already dead) never
    /// prevents the logout: tokens are cleared and the termination event
    /// fires regardless.
    pub async fn logout(&self) {
        let request = ApiRequest::post("/auth/logout");
        let token = self.inner.store.access_token();
        if let Err(err) = self.send_once(&request, token.as_deref()).await {
            tracing::debug!(error = %err, "logout notification failed, clearing session anyway");
        }

        self.inner.store.clear();
        self.inner.events.emit(SessionEvent::Terminated {
            reason: TerminationReason::LoggedOut,
        });
    }

    /// One attempt, no retry, no refresh. Attaching the bearer token never
    /// blocks; absence of a token just means no header.
    pub(crate) async fn send_once(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let url = format!("{}{}", self.inner.config.base_url, request.path());

        let mut builder = self.inner.http.request(request.method().clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder.send().await.map_err(|e| ApiError::Network(e.to_string()))
    }

    /// The refresh protocol.
    ///
    /// The first caller to find no refresh in flight becomes the leader and
    /// performs the round-trip; everyone else parks a oneshot waiter and
    /// suspends. The leader commits the outcome to the store first, then
    /// drains the queue exactly once: new token to every waiter on success,
    /// the refresh's own failure to every waiter otherwise. Failure is fatal
    /// for the session: tokens are cleared and one `Terminated` event fires.
    async fn refresh_access_token(&self) -> ApiResult<String> {
        let waiter = {
            let mut state = lock_refresh(&self.inner.refresh);
            if state.in_flight {
                let (tx, rx) = tokio::sync::oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = waiter {
            // Parked: resumed with the leader's outcome. A dropped sender
            // means the session died mid-refresh.
            return match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(ApiError::SessionExpired),
            };
        }

        let outcome = self.call_refresh_endpoint().await;

        // Commit to the store before `in_flight` clears: a 401 that takes
        // the lock after this refresh must read the new pair (or the
        // cleared store), never the superseded one.
        let outcome = match outcome {
            Ok(tokens) => {
                let access = tokens.access_token.clone();
                self.inner.store.set(tokens);
                tracing::debug!("token refresh succeeded");
                Ok(access)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed, terminating session");
                self.inner.store.clear();
                self.inner.events.emit(SessionEvent::Terminated {
                    reason: TerminationReason::RefreshFailed,
                });
                Err(err)
            }
        };

        let waiters = {
            let mut state = lock_refresh(&self.inner.refresh);
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        tracing::debug!(waiters = waiters.len(), "draining refresh waiters");
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        outcome
    }

    async fn call_refresh_endpoint(&self) -> ApiResult<SessionTokens> {
        let Some(refresh_token) = self.inner.store.refresh_token() else {
            return Err(ApiError::SessionExpired);
        };

        let request = ApiRequest::post(REFRESH_PATH)
            .json(serde_json::json!({ "refreshToken": refresh_token }));

        let response = self.send_once(&request, None).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<SessionTokens>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Extract the API's `{"message"}` body when present, else the raw text.
async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);
    ApiError::Api { status, message }
}

// The guard is only ever held between suspension points, never across one,
// so poisoning can only come from a panic in a trivial section.
fn lock_refresh(mutex: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_accumulate_query_and_body() {
        let request = ApiRequest::get("/log")
            .query("limit", 15)
            .query("action", "login")
            .json(serde_json::json!({ "a": 1 }));

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/log");
        assert_eq!(
            request.query,
            vec![("limit".to_string(), "15".to_string()),
                ("action".to_string(), "login".to_string())]
        );
        assert_eq!(request.body, Some(serde_json::json!({ "a": 1 })));
    }

    #[test]
    fn refresh_path_is_the_wire_path() {
        assert_eq!(REFRESH_PATH, "/auth/refresh-token");
    }

    #[tokio::test]
    async fn waiters_resume_in_enqueue_order() {
        use axum::routing::post;
        use axum::{Json, Router};

        async fn refresh() -> Json<serde_json::Value> {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            Json(serde_json::json!({
                "accessToken": "fresh-access",
                "refreshToken": "rotated-refresh",
            }))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            axum::serve(listener, Router::new().route(REFRESH_PATH, post(refresh)))
                .await
                .unwrap();
        });

        let store = SessionStore::in_memory();
        store.set(SessionTokens {
            access_token: "stale-access".to_string(),
            refresh_token: "valid-refresh".to_string(),
        });
        let client = ApiClient::new(ClientConfig::new(base_url), store).unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        // Task 0 becomes the leader; each later task is only spawned once
        // the previous one is confirmed parked, so the queue order is known
        // exactly.
        for id in 0..5usize {
            let task_client = client.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                task_client.refresh_access_token().await.unwrap();
                order.lock().unwrap().push(id);
            }));

            loop {
                let parked = {
                    let state = lock_refresh(&client.inner.refresh);
                    if id == 0 { state.in_flight } else { state.waiters.len() == id }
                };
                if parked {
                    break;
                }
                tokio::task::yield_now().await;
            }
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        server.abort();
    }
}
