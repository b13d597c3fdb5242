//! Auth API payloads for the Groundwork client.
//!
//! This crate defines the data that crosses the boundary between the
//! client and the auth API:
//!
//! - **Types** ([`Token`], [`Credentials`], [`AuthResult`], [`UserSummary`],
//!   etc.): the request and response bodies of the auth endpoints.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values are
//!   converted to/from bytes (the REST API and the on-disk token store
//!   both speak JSON).
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sessions or timers. It only
//! describes the shapes that the session layer sends and receives:
//!
//! ```text
//! Auth API (JSON) → Protocol (AuthResult, UserSummary) → Session (controller)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

// Each submodule is a single file under `src/`. They stay private; the
// public surface is whatever the re-exports below choose to expose.

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

// Callers write `use groundwork_protocol::Token` rather than reaching into
// `groundwork_protocol::types::Token`, so the file layout can change
// without breaking anyone.

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AuthResult, CreatedUser, Credentials, SignUpData, Token, UserId,
    UserIdentity, UserSummary,
};
