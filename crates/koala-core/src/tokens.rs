//! Bearer token types returned by the login exchange.

use std::fmt;

/// An access token attached to the stream connection.
///
/// Treated as opaque. Never shown in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token value.
    ///
    /// Use only when building the session endpoint.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

/// A refresh token returned alongside the access token.
///
/// Carried for the caller; nothing in this workspace renews sessions with it.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(String);

impl RefreshToken {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshToken").field(&"[REDACTED]").finish()
    }
}

/// Tokens produced by one successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    /// The bearer token for the stream connection.
    pub access_token: AccessToken,
    /// The refresh token, when the server issued one.
    pub refresh_token: Option<RefreshToken>,
}

impl SessionTokens {
    /// Tokens supplied directly by the operator, bypassing login.
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: AccessToken::new(token),
            refresh_token: None,
        }
    }
}
