//! # Groundwork
//!
//! Client-side session lifecycle for the Groundwork construction
//! project-management app.
//!
//! The application supplies an [`AuthGateway`](groundwork_session::AuthGateway)
//! that talks to the auth API; Groundwork owns the bearer token, restores
//! it on restart, renews it silently before it expires, and clears it on
//! logout or on a failed renewal.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use groundwork::prelude::*;
//!
//! # async fn run() -> Result<(), GroundworkError> {
//! groundwork::init_tracing();
//!
//! let session = SessionClientBuilder::new()
//!     .file_store("session.json")?
//!     .start(LocalAuthGateway::default())
//!     .await;
//!
//! session.login(&Credentials::new("ana", "hunter22")).await?;
//! // ... the token renews itself in the background ...
//! session.logout().await;
//! # Ok(())
//! # }
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod client;
mod error;
mod logging;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use client::{SessionClient, SessionClientBuilder};
pub use error::GroundworkError;
pub use logging::init_tracing;

// The layer crates are re-exported whole, so an application depends on
// `groundwork` alone and still reaches e.g. `groundwork::timer::ManualScheduler`.
pub use groundwork_protocol as protocol;
pub use groundwork_session as session;
pub use groundwork_timer as timer;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Everything an application needs to drive a session.
///
/// `use groundwork::prelude::*;` brings in the builder, the payload types,
/// the gateway and store traits with their bundled implementations, and
/// the unified error.
pub mod prelude {
    pub use crate::{GroundworkError, SessionClient, SessionClientBuilder};
    pub use groundwork_protocol::{
        AuthResult, CreatedUser, Credentials, SignUpData, Token, UserId, UserIdentity,
        UserSummary,
    };
    pub use groundwork_session::{
        AuthGateway, FileStore, GatewayError, KeyValueStore, LocalAuthGateway,
        LocalAuthGatewayConfig, MemoryStore, SessionConfig, SessionController, SessionError,
        SessionPhase, SessionSnapshot,
    };
    pub use groundwork_timer::{TimerScheduler, TokioScheduler};
}
