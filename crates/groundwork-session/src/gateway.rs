//! The auth API as seen by the session controller.
//!
//! Groundwork doesn't talk HTTP itself. The controller calls an
//! [`AuthGateway`], and the application supplies the implementation:
//! an HTTP client against the real API in production,
//! [`LocalAuthGateway`](crate::LocalAuthGateway) for demos, a scripted
//! fake in tests.

use std::future::Future;
use std::sync::Arc;

use groundwork_protocol::{
    AuthResult, CreatedUser, Credentials, SignUpData, Token, UserSummary,
};

use crate::GatewayError;

/// Performs the auth API calls the session lifecycle needs.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → the gateway is shared by the controller's
///   clones and by the renewal timer task.
/// - The returned futures are `Send` because a scheduled renewal runs on
///   whichever Tokio worker picks up the timer task.
///
/// # Example
///
/// ```rust
/// use groundwork_protocol::{
///     AuthResult, CreatedUser, Credentials, SignUpData, Token, UserId, UserSummary,
/// };
/// use groundwork_session::{AuthGateway, GatewayError};
///
/// /// Accepts one hard-coded user. Only for development!
/// struct FixedGateway;
///
/// impl AuthGateway for FixedGateway {
///     async fn login(&self, credentials: &Credentials) -> Result<AuthResult, GatewayError> {
///         if credentials.password == "letmein1" {
///             Ok(AuthResult::new(Token::new("dev-token"), 3600))
///         } else {
///             Err(GatewayError::Credentials("wrong password".into()))
///         }
///     }
///
///     async fn register(&self, _data: &SignUpData) -> Result<CreatedUser, GatewayError> {
///         Err(GatewayError::Validation("sign-up disabled".into()))
///     }
///
///     async fn current_user(&self, _token: &Token) -> Result<UserSummary, GatewayError> {
///         Ok(UserSummary {
///             id: UserId(1),
///             username: "dev".into(),
///             email: "dev@site.io".into(),
///             role: "admin".into(),
///         })
///     }
///
///     async fn refresh_token(&self, _token: &Token) -> Result<AuthResult, GatewayError> {
///         Ok(AuthResult::new(Token::new("dev-token"), 3600))
///     }
///
///     async fn logout(&self, _token: &Token) -> Result<(), GatewayError> {
///         Ok(())
///     }
/// }
/// ```
pub trait AuthGateway: Send + Sync + 'static {
    /// Exchanges credentials for an access token.
    ///
    /// Fails with [`GatewayError::Credentials`] when the login is rejected.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthResult, GatewayError>> + Send;

    /// Creates an account. Never logs the new user in.
    ///
    /// Fails with [`GatewayError::Validation`] on bad sign-up data.
    fn register(
        &self,
        data: &SignUpData,
    ) -> impl Future<Output = Result<CreatedUser, GatewayError>> + Send;

    /// Resolves a token to the user it belongs to.
    ///
    /// Fails with [`GatewayError::TokenInvalid`] if the token is not
    /// (or no longer) valid.
    fn current_user(
        &self,
        token: &Token,
    ) -> impl Future<Output = Result<UserSummary, GatewayError>> + Send;

    /// Exchanges a still-valid token for a fresh one.
    ///
    /// Fails with [`GatewayError::TokenInvalid`] if the token is not
    /// (or no longer) valid.
    fn refresh_token(
        &self,
        token: &Token,
    ) -> impl Future<Output = Result<AuthResult, GatewayError>> + Send;

    /// Ends the session server-side. Best effort: the controller logs a
    /// failure and carries on with local cleanup.
    fn logout(&self, token: &Token) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

/// Shared gateways are gateways too, so the application (or a test) can
/// keep a handle on the same instance the controller calls.
impl<A: AuthGateway> AuthGateway for Arc<A> {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthResult, GatewayError>> + Send {
        (**self).login(credentials)
    }

    fn register(
        &self,
        data: &SignUpData,
    ) -> impl Future<Output = Result<CreatedUser, GatewayError>> + Send {
        (**self).register(data)
    }

    fn current_user(
        &self,
        token: &Token,
    ) -> impl Future<Output = Result<UserSummary, GatewayError>> + Send {
        (**self).current_user(token)
    }

    fn refresh_token(
        &self,
        token: &Token,
    ) -> impl Future<Output = Result<AuthResult, GatewayError>> + Send {
        (**self).refresh_token(token)
    }

    fn logout(&self, token: &Token) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).logout(token)
    }
}
