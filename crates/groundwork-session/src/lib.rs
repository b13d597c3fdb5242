//! Session lifecycle for the Groundwork client.
//!
//! This crate owns everything about "who is logged in":
//!
//! 1. **Token ownership**: the bearer token lives in exactly one place,
//!    the [`SessionController`], and is persisted through a
//!    [`KeyValueStore`] so a restarted client can pick it up again
//! 2. **Silent renewal**: every successful login or refresh schedules
//!    one renewal timer that fires a safety margin before expiry
//! 3. **Logout**: explicit, or forced by a failed renewal; both end in
//!    the same cleared state
//!
//! # How it fits in the stack
//!
//! ```text
//! UI (above)              ← reads SessionSnapshot, calls login/logout
//!     ↕
//! Session Layer (this crate)
//!     ↕                   ↕
//! AuthGateway         TimerScheduler (groundwork-timer)
//!     ↕
//! Protocol Layer (below)  ← Token, Credentials, AuthResult, ...
//! ```

#![allow(async_fn_in_trait)]

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

// `controller` holds the state machine. `gateway` and `store` are the two
// seams an application plugs into, and `local` is a ready-made gateway
// for demos and tests.

mod controller;
mod error;
mod gateway;
mod local;
mod session;
mod store;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use controller::SessionController;
pub use error::{GatewayError, SessionError};
pub use gateway::AuthGateway;
pub use local::{ADMIN_ROLE, LocalAuthGateway, LocalAuthGatewayConfig, USER_ROLE};
pub use session::{SessionConfig, SessionPhase, SessionSnapshot};
pub use store::{FileStore, KeyValueStore, MemoryStore};
