//! `SessionClientBuilder`: wires a session controller to the real timer.
//!
//! This is the entry point for applications. It picks the defaults a
//! running client wants (Tokio-backed renewal timers, an in-memory store
//! unless told otherwise) and restores any persisted session on start.

use std::path::PathBuf;

use groundwork_session::{
    AuthGateway, FileStore, KeyValueStore, MemoryStore, SessionConfig, SessionController,
};
use groundwork_timer::TokioScheduler;

use crate::GroundworkError;

/// A session controller driven by real Tokio timers.
pub type SessionClient<G, K = MemoryStore> = SessionController<G, K, TokioScheduler>;

/// Builder for a [`SessionClient`].
///
/// # Example
///
/// ```rust,ignore
/// use groundwork::prelude::*;
///
/// let session = SessionClientBuilder::new()
///     .session_config(SessionConfig {
///         token_key: "site_token".into(),
///         ..SessionConfig::default()
///     })
///     .file_store("session.json")?
///     .start(my_gateway)
///     .await;
/// ```
pub struct SessionClientBuilder<K = MemoryStore> {
    session_config: SessionConfig,
    store: K,
}

impl SessionClientBuilder<MemoryStore> {
    /// Creates a builder with default settings and an in-memory store
    /// (nothing survives a restart).
    pub fn new() -> Self {
        Self {
            session_config: SessionConfig::default(),
            store: MemoryStore::new(),
        }
    }
}

impl Default for SessionClientBuilder<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KeyValueStore> SessionClientBuilder<K> {
    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Persists the token in the given store.
    pub fn store<S: KeyValueStore>(self, store: S) -> SessionClientBuilder<S> {
        SessionClientBuilder {
            session_config: self.session_config,
            store,
        }
    }

    /// Persists the token in a JSON file at `path`.
    ///
    /// # Errors
    /// Fails if the file exists but can't be read or parsed.
    pub fn file_store(
        self,
        path: impl Into<PathBuf>,
    ) -> Result<SessionClientBuilder<FileStore>, GroundworkError> {
        let store = FileStore::open(path)?;
        tracing::debug!(path = %store.path().display(), "using file-backed token store");
        Ok(self.store(store))
    }

    /// Builds the client without touching the gateway.
    ///
    /// A persisted token is loaded but not validated; call
    /// [`init`](SessionController::init) before relying on it.
    pub fn build<G: AuthGateway>(self, gateway: G) -> SessionClient<G, K> {
        SessionController::new(gateway, self.store, TokioScheduler::new(), self.session_config)
    }

    /// Builds the client and restores a persisted session, if any.
    ///
    /// Must be called from within a Tokio runtime: renewal timers are
    /// spawned as Tokio tasks.
    pub async fn start<G: AuthGateway>(self, gateway: G) -> SessionClient<G, K> {
        SessionController::start(gateway, self.store, TokioScheduler::new(), self.session_config)
            .await
    }
}
