//! Token storage: the persisted credential pair and the shared store handle.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// The session credential pair.
///
/// # Invariants
/// - At most one valid pair is active per store; both members are persisted
///   together and cleared together.
/// - Overwritten wholesale by every successful refresh; destroyed on logout,
///   refresh failure, or external storage mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Durable backend for the token pair.
///
/// Implementations are small and synchronous; the store never calls them
/// from a hot path.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<SessionTokens>>;
    fn save(&self, tokens: &SessionTokens) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// In-process backend for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryTokenStorage {
    tokens: std::sync::Mutex<Option<SessionTokens>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> anyhow::Result<Option<SessionTokens>> {
        Ok(lock_ignore_poison(&self.tokens).clone())
    }

    fn save(&self, tokens: &SessionTokens) -> anyhow::Result<()> {
        *lock_ignore_poison(&self.tokens) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *lock_ignore_poison(&self.tokens) = None;
        Ok(())
    }
}

/// File-backed storage: one JSON document holding the pair.
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Store the pair at `{os data dir}/accessguard/session.json`.
    pub fn in_default_location() -> anyhow::Result<Self> {
        Ok(Self { path: session_file_path()? })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> anyhow::Result<Option<SessionTokens>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read session file at {:?}", self.path));
            }
        };

        let tokens = serde_json::from_str(&raw)
            .with_context(|| format!("invalid session file at {:?}", self.path))?;
        Ok(Some(tokens))
    }

    fn save(&self, tokens: &SessionTokens) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create session directory at {parent:?}"))?;
        }

        let raw = serde_json::to_string(tokens).context("failed to serialize session tokens")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write session file at {:?}", self.path))
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove session file at {:?}", self.path)),
        }
    }
}

/// Resolve the session file location under the OS app data directory.
fn session_file_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut home| {
                home.push(".local");
                home.push("share");
                home
            })
        })
        .context("failed to resolve OS app data directory")?;

    let mut path = base;
    path.push("accessguard");
    path.push("session.json");
    Ok(path)
}

/// Cloneable handle to the current credential pair.
///
/// Mutations persist through the backend, then notify every subscriber.
/// `subscribe()` is the cross-context invalidation path: a handle clone in
/// another component (the original client's "other tab") observes every
/// set/clear and can recompute its identity without polling. Reads never
/// block.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    storage: Box<dyn TokenStorage>,
    current: watch::Sender<Option<SessionTokens>>,
}

impl SessionStore {
    /// Open a store over the given backend, seeding from whatever it holds.
    ///
    /// An unreadable backend is treated as empty: the session simply starts
    /// unauthenticated.
    pub fn open(storage: impl TokenStorage + 'static) -> Self {
        let initial = storage.load().unwrap_or_else(|err| {
            tracing::warn!(error = %format!("{err:#}"), "failed to load stored session, starting empty");
            None
        });

        let (current, _) = watch::channel(initial);
        Self {
            inner: Arc::new(StoreInner {
                storage: Box::new(storage),
                current,
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::open(MemoryTokenStorage::new())
    }

    pub fn tokens(&self) -> Option<SessionTokens> {
        self.inner.current.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.current.borrow().as_ref().map(|t| t.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.current.borrow().as_ref().map(|t| t.refresh_token.clone())
    }

    /// Replace the stored pair. Persist failures are logged and do not fail
    /// the session; the in-memory pair stays authoritative for this process.
    pub fn set(&self, tokens: SessionTokens) {
        if let Err(err) = self.inner.storage.save(&tokens) {
            tracing::warn!(error = %format!("{err:#}"), "failed to persist session tokens");
        }
        self.inner.current.send_replace(Some(tokens));
    }

    pub fn clear(&self) {
        if let Err(err) = self.inner.storage.clear() {
            tracing::warn!(error = %format!("{err:#}"), "failed to clear persisted session tokens");
        }
        self.inner.current.send_replace(None);
    }

    /// Watch for token changes made through any handle to this store.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionTokens>> {
        self.inner.current.subscribe()
    }
}

fn lock_ignore_poison<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
