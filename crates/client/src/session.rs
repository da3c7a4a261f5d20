//! Session bootstrap and the identity state machine.
//!
//! State starts at `Loading` and lands in `Unauthenticated` or
//! `Authenticated` once bootstrap completes. Identity is always a pure
//! function of the currently stored token (or of the server-validated user
//! document), recomputed on every token change — including changes made
//! through another handle to the same store.

use std::sync::Arc;

use accessguard_auth::{Identity, SessionState, decode_unverified};
use tokio::sync::{Notify, watch};

use crate::transport::ApiClient;

/// Cheap-to-clone session handle.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: ApiClient,
    state: watch::Sender<SessionState>,
    shutdown: Notify,
}

impl Session {
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            inner: Arc::new(SessionInner {
                client,
                state,
                shutdown: Notify::new(),
            }),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    /// Snapshot of the current state; route boundaries feed this to
    /// [`accessguard_auth::require_authenticated`] on every navigation.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Resolve the session from stored credentials.
    ///
    /// With a stored token the decoded payload gives an immediate advisory
    /// identity (fast UI path), then `GET /user/me` confirms it — the
    /// server's answer overwrites the payload's. Any validation failure
    /// clears the stored pair and lands `Unauthenticated`.
    pub async fn bootstrap(&self) -> SessionState {
        let Some(tokens) = self.inner.client.store().tokens() else {
            return self.set_state(SessionState::Unauthenticated);
        };

        if let Ok(claims) = decode_unverified(&tokens.access_token) {
            self.set_state(SessionState::Authenticated(Identity::from_claims(&claims)));
        }

        match self.inner.client.me().await {
            Ok(user) => self.set_state(SessionState::Authenticated(user.identity())),
            Err(err) => {
                tracing::warn!(error = %err, "session validation failed, clearing stored tokens");
                self.inner.client.store().clear();
                self.set_state(SessionState::Unauthenticated)
            }
        }
    }

    /// Recompute identity purely from the currently stored token.
    pub fn refresh_identity(&self) -> SessionState {
        let state = match self.inner.client.store().access_token() {
            Some(token) => match decode_unverified(&token) {
                Ok(claims) => SessionState::Authenticated(Identity::from_claims(&claims)),
                Err(err) => {
                    tracing::debug!(error = %err, "stored token is not decodable");
                    SessionState::Unauthenticated
                }
            },
            None => SessionState::Unauthenticated,
        };
        self.set_state(state)
    }

    /// Watch the token store and re-derive identity on every mutation.
    ///
    /// This is the cross-context invalidation path: a logout or refresh
    /// through any clone of the store (the original client's "other tab")
    /// updates this session's state within one notification cycle. The task
    /// runs until [`Session::shutdown`] or until the store is dropped.
    pub fn start_store_watcher(&self) -> tokio::task::JoinHandle<()> {
        let session = self.clone();
        let mut store_rx = self.inner.client.store().subscribe();

        tokio::spawn(async move {
            tracing::debug!("session store watcher started");
            loop {
                tokio::select! {
                    _ = session.inner.shutdown.notified() => break,
                    changed = store_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        session.refresh_identity();
                    }
                }
            }
            tracing::debug!("session store watcher stopped");
        })
    }

    /// Request graceful shutdown of the store watcher.
    pub fn shutdown(&self) {
        self.inner.shutdown.notify_one();
    }

    fn set_state(&self, state: SessionState) -> SessionState {
        self.inner.state.send_replace(state.clone());
        state
    }
}
