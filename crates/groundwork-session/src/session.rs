//! Session types: configuration, lifecycle phase, and the published
//! snapshot observers receive.

use std::fmt;
use std::time::Duration;

use groundwork_protocol::{Token, UserIdentity};
use tracing::warn;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the session controller.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long before token expiry the silent renewal fires.
    ///
    /// Covers clock skew and request latency. Tokens whose lifetime is
    /// not longer than this are never scheduled for renewal; the next
    /// rejected API call forces a fresh login instead.
    ///
    /// Default: 30 seconds.
    pub refresh_margin: Duration,

    /// Key under which the bearer token is persisted.
    ///
    /// Default: `"token"`.
    pub token_key: String,
}

impl SessionConfig {
    /// Default renewal safety margin.
    pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(30);

    /// Default persisted-store key for the bearer token.
    pub const DEFAULT_TOKEN_KEY: &'static str = "token";

    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// Called by [`SessionController::new`](crate::SessionController::new).
    /// An empty `token_key` is replaced with [`Self::DEFAULT_TOKEN_KEY`].
    pub fn validated(mut self) -> Self {
        if self.token_key.trim().is_empty() {
            warn!(
                default = Self::DEFAULT_TOKEN_KEY,
                "token_key is empty, using default"
            );
            self.token_key = Self::DEFAULT_TOKEN_KEY.to_string();
        }
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
            token_key: Self::DEFAULT_TOKEN_KEY.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
///
/// ```text
///              login / init (persisted token)
///   LoggedOut ───────────────────────────────→ Authenticating
///       ↑                                           │
///       │ failure / logout                          │ success
///       │                                           ▼
///       ├──────────────────────────────────── Authenticated ←──┐
///       │                                           │          │ success
///       │ failure                  refresh / timer  ▼          │
///       └──────────────────────────────────────  Refreshing ───┘
/// ```
///
/// `LoggedOut` is both the initial state and where every failure ends.
/// There is no "closed" state: tearing the controller down stops it
/// without a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    #[default]
    LoggedOut,
    Authenticating,
    Authenticated,
    Refreshing,
}

impl SessionPhase {
    /// Returns `true` while an async transition is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Authenticating | Self::Refreshing)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => write!(f, "LoggedOut"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Refreshing => write!(f, "Refreshing"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// A point-in-time copy of the session, as published to observers.
///
/// UI layers bind to this: read it with
/// [`SessionController::snapshot`](crate::SessionController::snapshot)
/// or watch every change through
/// [`SessionController::subscribe`](crate::SessionController::subscribe).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub token: Option<Token>,
    pub identity: Option<UserIdentity>,
    /// Authorization role. Only meaningful while authenticated.
    pub role: Option<String>,
}

impl SessionSnapshot {
    /// A session is authenticated when it holds both a token and the
    /// identity that token belongs to.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.identity.is_some()
    }

    /// Returns `true` while an async transition is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }
}

#[cfg(test)]
mod tests {
    use groundwork_protocol::UserId;

    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.refresh_margin, Duration::from_secs(30));
        assert_eq!(config.token_key, "token");
    }

    #[test]
    fn test_session_config_validated_replaces_empty_key() {
        let config = SessionConfig {
            token_key: "  ".into(),
            ..SessionConfig::default()
        }
        .validated();
        assert_eq!(config.token_key, "token");
    }

    #[test]
    fn test_session_config_validated_keeps_custom_key() {
        let config = SessionConfig {
            token_key: "site_token".into(),
            ..SessionConfig::default()
        }
        .validated();
        assert_eq!(config.token_key, "site_token");
    }

    #[test]
    fn test_session_phase_is_loading() {
        assert!(!SessionPhase::LoggedOut.is_loading());
        assert!(SessionPhase::Authenticating.is_loading());
        assert!(!SessionPhase::Authenticated.is_loading());
        assert!(SessionPhase::Refreshing.is_loading());
    }

    #[test]
    fn test_session_phase_display() {
        assert_eq!(SessionPhase::LoggedOut.to_string(), "LoggedOut");
        assert_eq!(SessionPhase::Refreshing.to_string(), "Refreshing");
    }

    #[test]
    fn test_snapshot_requires_token_and_identity() {
        let mut snapshot = SessionSnapshot {
            token: Some(Token::new("t1")),
            ..SessionSnapshot::default()
        };
        assert!(!snapshot.is_authenticated(), "token alone is not a session");

        snapshot.identity = Some(UserIdentity {
            id: UserId(1),
            username: "ana".into(),
            email: "ana@site.io".into(),
        });
        assert!(snapshot.is_authenticated());

        snapshot.token = None;
        assert!(!snapshot.is_authenticated());
    }
}
