use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

/// The current authentication state of this client process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
}

/// Durable backing store for the session token. Implementations must treat
/// the token as the only persisted secret; the short-lived second-factor
/// challenge token never reaches a vault.
#[async_trait]
pub trait SessionVault: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, token: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// In-memory vault; the default when no storage is configured and the
/// fallback behavior when a durable vault fails.
#[derive(Default)]
pub struct MemorySessionVault {
    token: Mutex<Option<String>>,
}

#[async_trait]
impl SessionVault for MemorySessionVault {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().await.clone())
    }

    async fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.token.lock().await = None;
        Ok(())
    }
}

/// Sqlite-backed vault over the storage crate.
pub struct DurableSessionVault {
    store: storage::Storage,
}

impl DurableSessionVault {
    pub async fn initialize(database_url: &str) -> Result<Self> {
        let store = storage::Storage::new(database_url)
            .await
            .with_context(|| format!("failed to open session storage at '{database_url}'"))?;
        Ok(Self { store })
    }
}

#[async_trait]
impl SessionVault for DurableSessionVault {
    async fn load(&self) -> Result<Option<String>> {
        self.store.load_session_token().await
    }

    async fn save(&self, token: &str) -> Result<()> {
        self.store.save_session_token(token).await
    }

    async fn clear(&self) -> Result<()> {
        self.store.clear_session_token().await
    }
}

/// Process-wide holder of the current session with replay-last
/// subscription semantics: a new subscriber sees the current state
/// synchronously via `borrow()` before any change notification.
///
/// Persistence is fail-soft throughout. A vault error downgrades the store
/// to in-memory behavior for that operation and is logged, never surfaced;
/// authentication must keep working when the storage medium is gone.
pub struct SessionStore {
    vault: Arc<dyn SessionVault>,
    current: watch::Sender<Option<Session>>,
}

impl SessionStore {
    pub fn new(vault: Arc<dyn SessionVault>) -> Arc<Self> {
        let (current, _) = watch::channel(None);
        Arc::new(Self { vault, current })
    }

    pub fn in_memory() -> Arc<Self> {
        Self::new(Arc::new(MemorySessionVault::default()))
    }

    /// Loads a previously persisted token, if any. Call once at startup.
    pub async fn init(&self) {
        match self.vault.load().await {
            Ok(Some(token)) => {
                info!("session: restored persisted token");
                self.current.send_replace(Some(Session { token }));
            }
            Ok(None) => {}
            Err(err) => {
                warn!("session: storage unavailable, starting unauthenticated: {err:#}");
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Token to attach as `Authorization: Bearer`, read at call time.
    pub fn bearer_token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|s| s.token.clone())
    }

    pub async fn set_session(&self, token: impl Into<String>) {
        let token = token.into();
        if let Err(err) = self.vault.save(&token).await {
            warn!("session: failed to persist token, keeping it in memory: {err:#}");
        }
        self.current.send_replace(Some(Session { token }));
    }

    pub async fn clear(&self) {
        if let Err(err) = self.vault.clear().await {
            warn!("session: failed to clear persisted token: {err:#}");
        }
        self.current.send_replace(None);
    }

    /// Drops the in-memory state without touching the vault. Test hook;
    /// a long-lived client never calls this.
    pub fn teardown(&self) {
        self.current.send_replace(None);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
