//! Unified error type for Groundwork.

use groundwork_protocol::ProtocolError;
use groundwork_session::{GatewayError, SessionError};

/// Top-level error that wraps the sub-crate errors.
///
/// Applications using the `groundwork` meta-crate match on this single
/// type; `?` converts sub-crate errors through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum GroundworkError {
    /// A malformed gateway payload or stored value.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session operation failed (gateway rejection, storage, teardown).
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<GatewayError> for GroundworkError {
    fn from(err: GatewayError) -> Self {
        Self::Session(err.into())
    }
}

impl GroundworkError {
    /// Returns `true` if the user has to log in again to continue.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::Session(SessionError::Gateway(
                GatewayError::Credentials(_) | GatewayError::TokenInvalid(_)
            ))
        )
    }
}
