//! Request bodies for account API endpoints.

use serde::Serialize;

/// Body of `POST /api/account/auth/login/`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    /// Fernet token of the plaintext password.
    pub password: &'a str,
}
