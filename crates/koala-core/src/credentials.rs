//! Login credentials type.

use std::fmt;

/// Operator credentials for the login exchange.
///
/// Holds the identity (an email address) and the plaintext secret. The
/// secret is encrypted with a [`LoginKey`](crate::LoginKey) before it leaves
/// the process and is never exposed in Debug output.
///
/// # Example
///
/// ```
/// use koala_core::Credentials;
///
/// let creds = Credentials::new("ops@example.com", "hunter2");
/// assert_eq!(creds.identity(), "ops@example.com");
/// ```
#[derive(Clone)]
pub struct Credentials {
    identity: String,
    secret: String,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    /// Returns the identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the plaintext secret.
    ///
    /// Use this only to encrypt it for the login request. Never log it.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
