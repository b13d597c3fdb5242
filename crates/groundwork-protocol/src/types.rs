//! Request and response bodies of the auth API.
//!
//! Every type here travels over the REST boundary between the client
//! and the auth service. The serde attributes pin the exact JSON field
//! names the API uses (camelCase), so a mismatch shows up as a failing
//! test here rather than as a silently broken login.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// An opaque bearer credential granting API access for a bounded lifetime.
///
/// Newtype over `String` so a token can't be confused with a username or
/// any other string in a function signature. `#[serde(transparent)]`
/// keeps it a plain JSON string on the wire.
///
/// `Debug` is implemented by hand and never prints the value, so a token
/// that ends up in a `tracing` field or a panic message doesn't leak.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wraps a raw token string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw token string, e.g. for an `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token and returns the raw string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns `true` if the token string is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<{} chars>)", self.0.len())
    }
}

/// A unique identifier for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Login request body.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up request body.
///
/// Names are optional on the API; `skip_serializing_if` keeps them out
/// of the body entirely rather than sending `null`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpData {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl SignUpData {
    /// Creates a sign-up body without the optional name fields.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }
}

impl fmt::Debug for SignUpData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpData")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response of the login and refresh endpoints.
///
/// `expires_in` is the token's remaining lifetime in seconds, measured
/// from the moment the server issued it. The session controller uses it
/// to schedule the next silent renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub access_token: Token,
    pub expires_in: u64,
}

impl AuthResult {
    pub fn new(access_token: Token, expires_in: u64) -> Self {
        Self {
            access_token,
            expires_in,
        }
    }

    /// Checks the rules serde can't express.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidPayload`] if the access token is
    /// empty. Storing an empty token would leave the client "logged in"
    /// with a credential every API call rejects.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.access_token.is_empty() {
            return Err(ProtocolError::InvalidPayload(
                "auth response carries an empty access token".into(),
            ));
        }
        Ok(())
    }
}

/// Response of the current-user endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl UserSummary {
    /// Splits the summary into the identity and the authorization role.
    ///
    /// The session keeps these apart: identity says who the user is,
    /// role says what they may do.
    pub fn into_parts(self) -> (UserIdentity, String) {
        (
            UserIdentity {
                id: self.id,
                username: self.username,
                email: self.email,
            },
            self.role,
        )
    }
}

/// Who the logged-in user is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Response of the sign-up endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON shape tests. The auth API defines exact field names; these
    //! verify our serde attributes produce them.

    use super::*;

    #[test]
    fn test_token_serializes_as_plain_string() {
        let json = serde_json::to_string(&Token::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn test_token_debug_does_not_leak_value() {
        let rendered = format!("{:?}", Token::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert_eq!(rendered, "Token(<12 chars>)");
    }

    #[test]
    fn test_user_id_display() {
        assert_eq!(UserId(42).to_string(), "U-42");
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("ana", "hunter22"));
        assert!(rendered.contains("ana"));
        assert!(!rendered.contains("hunter22"));
    }

    #[test]
    fn test_auth_result_uses_camel_case_fields() {
        let result = AuthResult::new(Token::new("t1"), 3600);
        let json: serde_json::Value = serde_json::to_value(&result).unwrap();

        assert_eq!(json["accessToken"], "t1");
        assert_eq!(json["expiresIn"], 3600);
    }

    #[test]
    fn test_auth_result_validate_rejects_empty_token() {
        let result = AuthResult::new(Token::new(""), 3600);
        assert!(matches!(
            result.validate(),
            Err(ProtocolError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_auth_result_validate_accepts_token() {
        assert!(AuthResult::new(Token::new("t1"), 0).validate().is_ok());
    }

    #[test]
    fn test_sign_up_data_omits_absent_names() {
        let body = SignUpData::new("ana", "ana@site.io", "hunter22");
        let json: serde_json::Value = serde_json::to_value(&body).unwrap();

        assert_eq!(json["username"], "ana");
        assert!(json.get("firstName").is_none());
        assert!(json.get("lastName").is_none());
    }

    #[test]
    fn test_sign_up_data_names_are_camel_case() {
        let body = SignUpData {
            first_name: Some("Ana".into()),
            last_name: Some("Ruiz".into()),
            ..SignUpData::new("ana", "ana@site.io", "hunter22")
        };
        let json: serde_json::Value = serde_json::to_value(&body).unwrap();

        assert_eq!(json["firstName"], "Ana");
        assert_eq!(json["lastName"], "Ruiz");
    }

    #[test]
    fn test_user_summary_into_parts_splits_role() {
        let summary = UserSummary {
            id: UserId(3),
            username: "ana".into(),
            email: "ana@site.io".into(),
            role: "admin".into(),
        };

        let (identity, role) = summary.into_parts();

        assert_eq!(identity.id, UserId(3));
        assert_eq!(identity.username, "ana");
        assert_eq!(role, "admin");
    }
}
