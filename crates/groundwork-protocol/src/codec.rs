//! Codec trait and implementations for serializing/deserializing payloads.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! Callers don't care HOW values are serialized; they just need
//! something that implements the [`Codec`] trait. The auth API and the
//! file-backed token store both use [`JsonCodec`].

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync`: a codec lives inside a token store, and the store is
///   shared with the renewal timer, which may run on any Tokio worker
///   thread.
/// - `'static`: the codec owns everything it needs and borrows nothing
///   temporary, so it can sit inside long-lived spawned tasks.
///
/// ## Generic methods
///
/// `encode` and `decode` are generic over the value type:
/// - `encode<T: Serialize>`: anything serde can turn into bytes
/// - `decode<T: DeserializeOwned>`: anything serde can rebuild from bytes
///
/// `DeserializeOwned` (rather than `Deserialize<'de>`) means the decoded
/// value owns its strings instead of borrowing from the input buffer. The
/// store reads a file into a temporary `Vec<u8>` and drops it right after
/// decoding, so nothing may point into it.
///
/// ## Example
///
/// ```rust
/// use groundwork_protocol::{Codec, Credentials, JsonCodec};
///
/// // Generic over the codec: the caller picks the format.
/// fn login_body<C: Codec>(codec: &C, creds: &Credentials) -> Vec<u8> {
///     codec.encode(creds).unwrap()
/// }
///
/// let body = login_body(&JsonCodec, &Credentials::new("ana", "hunter22"));
/// let text = String::from_utf8(body).unwrap();
/// assert!(text.contains(r#""username":"ana""#));
/// ```
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// The auth API speaks JSON, and the file-backed token store writes JSON
/// too, so one codec covers both. Being human-readable also means a
/// persisted session file can be inspected (or hand-edited) while
/// debugging a restore.
///
/// This is behind the `json` feature flag (enabled by default). It's a
/// unit struct: there is no state, so `JsonCodec` is both the type and
/// its only value.
///
/// ## Example
///
/// ```rust
/// use groundwork_protocol::{AuthResult, Codec, JsonCodec, Token};
///
/// let codec = JsonCodec;
///
/// let body = br#"{"accessToken":"t1","expiresIn":3600}"#;
/// let result: AuthResult = codec.decode(body).unwrap();
/// assert_eq!(result.access_token, Token::new("t1"));
/// assert_eq!(result.expires_in, 3600);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
