//! Error types for the session layer.

use groundwork_protocol::ProtocolError;

/// Failures reported by an [`AuthGateway`](crate::AuthGateway).
///
/// The variants follow what the auth API can tell us, not how the
/// request travelled: retries and transport details stay inside the
/// gateway implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Login rejected: unknown user or wrong password.
    #[error("invalid credentials: {0}")]
    Credentials(String),

    /// The token presented to `current_user` or `refresh_token` is
    /// unknown, revoked, or expired. The caller must re-authenticate.
    #[error("token rejected: {0}")]
    TokenInvalid(String),

    /// Sign-up data failed server-side validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request never got an answer (offline, DNS, timeout, 5xx).
    #[error("network error: {0}")]
    Network(String),
}

/// Errors returned by the session controller and its stores.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The gateway rejected or failed the call.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A gateway response or stored payload was malformed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Reading or writing the persisted key-value store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The session changed (logout, forced logout, or a newer login)
    /// while this operation was waiting on the gateway. Its result was
    /// discarded.
    #[error("session changed while the operation was in flight")]
    Superseded,

    /// The controller was torn down.
    #[error("session controller has been disposed")]
    Disposed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_gateway_error() {
        let err: SessionError = GatewayError::Credentials("bad password".into()).into();
        assert!(matches!(
            err,
            SessionError::Gateway(GatewayError::Credentials(_))
        ));
        assert_eq!(err.to_string(), "invalid credentials: bad password");
    }

    #[test]
    fn test_from_protocol_error() {
        let err: SessionError = ProtocolError::InvalidPayload("empty".into()).into();
        assert!(matches!(err, SessionError::Protocol(_)));
    }
}
