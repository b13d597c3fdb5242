//! Error types for the protocol layer.
//!
//! Each crate in Groundwork defines its own error enum. When you see a
//! `ProtocolError`, the problem is in serialization, not in the gateway
//! or the session controller.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: a truncated token file, a response body with a
    /// missing field, or a field of the wrong type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload decoded but violates an API rule, e.g. an empty
    /// access token in an otherwise well-formed auth response.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
