//! An in-process auth gateway for demos, local development, and tests.
//!
//! `LocalAuthGateway` behaves like the real auth API closely enough to
//! drive the whole session lifecycle without a server: it keeps a user
//! directory, issues random bearer tokens, rotates them on refresh, and
//! revokes them on logout.
//!
//! Passwords are kept in plain text. Never point this at real users.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use groundwork_protocol::{
    AuthResult, CreatedUser, Credentials, SignUpData, Token, UserId, UserSummary,
};
use rand::Rng;

use crate::{AuthGateway, GatewayError};

/// Role given to the first account created.
pub const ADMIN_ROLE: &str = "admin";
/// Role given to every later account.
pub const USER_ROLE: &str = "user";

/// Configuration for [`LocalAuthGateway`].
#[derive(Debug, Clone)]
pub struct LocalAuthGatewayConfig {
    /// Lifetime reported as `expiresIn` on every issued token.
    ///
    /// Default: 15 minutes.
    pub token_lifetime: Duration,

    /// Minimum accepted password length on sign-up.
    ///
    /// Default: 8.
    pub min_password_len: usize,
}

impl Default for LocalAuthGatewayConfig {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::from_secs(15 * 60),
            min_password_len: 8,
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    id: UserId,
    username: String,
    email: String,
    password: String,
    role: String,
}

impl Account {
    fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Directory {
    /// Accounts keyed by username.
    accounts: HashMap<String, Account>,
    /// Live tokens, mapped to the username they were issued to.
    tokens: HashMap<Token, String>,
    next_id: u64,
    offline: bool,
}

/// A mock [`AuthGateway`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct LocalAuthGateway {
    config: LocalAuthGatewayConfig,
    directory: Mutex<Directory>,
}

impl LocalAuthGateway {
    pub fn new(config: LocalAuthGatewayConfig) -> Self {
        Self {
            config,
            directory: Mutex::new(Directory::default()),
        }
    }

    /// Seeds an account with an explicit role, bypassing sign-up
    /// validation.
    pub fn with_user(
        self,
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        {
            let mut dir = self.lock();
            let account = Account {
                id: next_user_id(&mut dir),
                username: username.into(),
                email: email.into(),
                password: password.into(),
                role: role.into(),
            };
            dir.accounts.insert(account.username.clone(), account);
        }
        self
    }

    /// Simulates losing connectivity: while offline every call fails
    /// with [`GatewayError::Network`].
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Revokes a token server-side, as an expiry or an admin action
    /// would. Later calls presenting it fail with
    /// [`GatewayError::TokenInvalid`].
    pub fn revoke(&self, token: &Token) -> bool {
        self.lock().tokens.remove(token).is_some()
    }

    /// Number of tokens currently accepted.
    pub fn active_tokens(&self) -> usize {
        self.lock().tokens.len()
    }

    /// Whether the given token is currently accepted.
    pub fn is_active(&self, token: &Token) -> bool {
        self.lock().tokens.contains_key(token)
    }

    fn lock(&self) -> MutexGuard<'_, Directory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the directory, failing if the gateway is offline.
    fn connect(&self) -> Result<MutexGuard<'_, Directory>, GatewayError> {
        let dir = self.lock();
        if dir.offline {
            return Err(GatewayError::Network("auth service unreachable".into()));
        }
        Ok(dir)
    }

    fn issue(&self, dir: &mut Directory, username: &str) -> AuthResult {
        let token = generate_token();
        dir.tokens.insert(token.clone(), username.to_string());
        tracing::debug!(%username, "local gateway issued token");
        AuthResult::new(token, self.config.token_lifetime.as_secs())
    }

    fn validate_sign_up(&self, dir: &Directory, data: &SignUpData) -> Result<(), GatewayError> {
        if data.username.trim().is_empty() {
            return Err(GatewayError::Validation("username is required".into()));
        }
        if !data.email.contains('@') {
            return Err(GatewayError::Validation(format!(
                "'{}' is not an email address",
                data.email
            )));
        }
        if data.password.chars().count() < self.config.min_password_len {
            return Err(GatewayError::Validation(format!(
                "password must be at least {} characters",
                self.config.min_password_len
            )));
        }
        if dir.accounts.contains_key(&data.username) {
            return Err(GatewayError::Validation(format!(
                "username '{}' is taken",
                data.username
            )));
        }
        Ok(())
    }
}

impl AuthGateway for LocalAuthGateway {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResult, GatewayError> {
        let mut dir = self.connect()?;
        let matches = dir
            .accounts
            .get(&credentials.username)
            .is_some_and(|account| account.password == credentials.password);
        if !matches {
            return Err(GatewayError::Credentials(
                "unknown username or wrong password".into(),
            ));
        }
        Ok(self.issue(&mut dir, &credentials.username))
    }

    async fn register(&self, data: &SignUpData) -> Result<CreatedUser, GatewayError> {
        let mut dir = self.connect()?;
        self.validate_sign_up(&dir, data)?;

        let role = if dir.accounts.is_empty() {
            ADMIN_ROLE
        } else {
            USER_ROLE
        };
        let account = Account {
            id: next_user_id(&mut dir),
            username: data.username.clone(),
            email: data.email.clone(),
            password: data.password.clone(),
            role: role.to_string(),
        };
        let created = CreatedUser {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
        };
        dir.accounts.insert(account.username.clone(), account);
        Ok(created)
    }

    async fn current_user(&self, token: &Token) -> Result<UserSummary, GatewayError> {
        let dir = self.connect()?;
        dir.tokens
            .get(token)
            .and_then(|username| dir.accounts.get(username))
            .map(Account::summary)
            .ok_or_else(|| GatewayError::TokenInvalid("unknown or revoked token".into()))
    }

    async fn refresh_token(&self, token: &Token) -> Result<AuthResult, GatewayError> {
        let mut dir = self.connect()?;
        let username = dir
            .tokens
            .remove(token)
            .ok_or_else(|| GatewayError::TokenInvalid("unknown or revoked token".into()))?;
        Ok(self.issue(&mut dir, &username))
    }

    async fn logout(&self, token: &Token) -> Result<(), GatewayError> {
        let mut dir = self.connect()?;
        dir.tokens.remove(token);
        Ok(())
    }
}

fn next_user_id(dir: &mut Directory) -> UserId {
    dir.next_id += 1;
    UserId(dir.next_id)
}

/// Generates a random 32-character hex token (128 bits of entropy).
fn generate_token() -> Token {
    let bytes: [u8; 16] = rand::rng().random();
    Token::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> LocalAuthGateway {
        LocalAuthGateway::default().with_user("ana", "ana@site.io", "hunter22", ADMIN_ROLE)
    }

    fn ana() -> Credentials {
        Credentials::new("ana", "hunter22")
    }

    #[tokio::test]
    async fn test_login_valid_credentials_issues_token() {
        let gw = gateway();

        let result = gw.login(&ana()).await.unwrap();

        assert_eq!(result.access_token.as_str().len(), 32);
        assert_eq!(result.expires_in, 900);
        assert!(gw.is_active(&result.access_token));
    }

    #[tokio::test]
    async fn test_login_wrong_password_returns_credentials_error() {
        let gw = gateway();

        let result = gw.login(&Credentials::new("ana", "nope")).await;

        assert!(matches!(result, Err(GatewayError::Credentials(_))));
    }

    #[tokio::test]
    async fn test_login_unknown_user_returns_credentials_error() {
        let gw = gateway();

        let result = gw.login(&Credentials::new("bob", "hunter22")).await;

        assert!(matches!(result, Err(GatewayError::Credentials(_))));
    }

    #[tokio::test]
    async fn test_current_user_resolves_token() {
        let gw = gateway();
        let token = gw.login(&ana()).await.unwrap().access_token;

        let user = gw.current_user(&token).await.unwrap();

        assert_eq!(user.username, "ana");
        assert_eq!(user.role, ADMIN_ROLE);
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let gw = gateway();
        let old = gw.login(&ana()).await.unwrap().access_token;

        let new = gw.refresh_token(&old).await.unwrap().access_token;

        assert_ne!(old, new);
        assert!(!gw.is_active(&old), "old token revoked on refresh");
        assert!(gw.is_active(&new));
        assert!(matches!(
            gw.refresh_token(&old).await,
            Err(GatewayError::TokenInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let gw = gateway();
        let token = gw.login(&ana()).await.unwrap().access_token;

        gw.logout(&token).await.unwrap();

        assert_eq!(gw.active_tokens(), 0);
        assert!(matches!(
            gw.current_user(&token).await,
            Err(GatewayError::TokenInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_register_first_user_is_admin_then_user() {
        let gw = LocalAuthGateway::default();

        let first = gw
            .register(&SignUpData::new("ana", "ana@site.io", "hunter22"))
            .await
            .unwrap();
        gw.register(&SignUpData::new("bob", "bob@site.io", "hunter22"))
            .await
            .unwrap();

        let token = gw.login(&Credentials::new("bob", "hunter22")).await.unwrap().access_token;
        assert_eq!(gw.current_user(&token).await.unwrap().role, USER_ROLE);
        assert_eq!(first.id, UserId(1));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_data() {
        let gw = gateway();

        let cases = [
            SignUpData::new("", "x@site.io", "hunter22"),
            SignUpData::new("bob", "not-an-email", "hunter22"),
            SignUpData::new("bob", "bob@site.io", "short"),
            SignUpData::new("ana", "ana2@site.io", "hunter22"),
        ];
        for data in &cases {
            assert!(
                matches!(gw.register(data).await, Err(GatewayError::Validation(_))),
                "should reject {data:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_register_honours_configured_min_password_len() {
        let gw = LocalAuthGateway::new(LocalAuthGatewayConfig {
            min_password_len: 12,
            ..LocalAuthGatewayConfig::default()
        });

        let too_short = SignUpData::new("bob", "bob@site.io", "hunter22");
        assert!(matches!(
            gw.register(&too_short).await,
            Err(GatewayError::Validation(_))
        ));

        let long_enough = SignUpData::new("bob", "bob@site.io", "hunter22hunter");
        assert_eq!(gw.register(&long_enough).await.unwrap().username, "bob");
    }

    #[tokio::test]
    async fn test_offline_fails_every_call_with_network_error() {
        let gw = gateway();
        let token = gw.login(&ana()).await.unwrap().access_token;

        gw.set_offline(true);

        assert!(matches!(gw.login(&ana()).await, Err(GatewayError::Network(_))));
        assert!(matches!(gw.logout(&token).await, Err(GatewayError::Network(_))));
        assert!(gw.is_active(&token), "failed logout leaves token live");

        gw.set_offline(false);
        assert!(gw.current_user(&token).await.is_ok());
    }
}
