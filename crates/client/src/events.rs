//! Session lifecycle events.

use tokio::sync::broadcast;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The refresh endpoint rejected the stored refresh token (or none was
    /// stored). Fatal: tokens have been cleared.
    RefreshFailed,
    /// Explicit logout through this client.
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Fired exactly once per terminating cause. Embedders route this to
    /// their login entry point.
    Terminated { reason: TerminationReason },
}

/// Broadcast channel for session events.
///
/// Subscribing is optional; events are dropped when nobody listens.
#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        tracing::debug!(?event, "session event");
        let _ = self.tx.send(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
