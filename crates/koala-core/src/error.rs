//! Error types for koala-core.
//!
//! One unified error type with explicit variants for each phase of a
//! session: credential encryption, login, the live stream, the underlying
//! transport, and input validation.

use std::fmt;
use thiserror::Error;

/// The unified error type for koala operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Credential encryption or decryption failed.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// The login exchange did not yield a usable token.
    #[error("login failed: {0}")]
    Login(#[from] LoginError),

    /// The stream session failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Input validation errors (malformed base URLs, unknown names).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

/// Credential cipher errors.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is not 32 bytes of URL-safe base64.
    #[error("invalid key: {reason}")]
    InvalidKey { reason: String },

    /// Encryption failed internally.
    #[error("encryption failed: {message}")]
    Encryption { message: String },

    /// The token is malformed, was tampered with, or was made with another key.
    #[error("invalid token")]
    InvalidToken,

    /// The token is older than the permitted TTL (or from the future).
    #[error("token expired")]
    Expired,
}

/// Login exchange failure.
///
/// Carries the HTTP status and raw body when the server answered, so the
/// failure can be diagnosed without re-running.
#[derive(Debug)]
pub struct LoginError {
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// Raw response body, if any.
    pub body: Option<String>,
    /// Why the login was rejected.
    pub reason: String,
}

impl LoginError {
    /// A failure derived from the response content rather than its status.
    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            status: None,
            body: None,
            reason: reason.into(),
        }
    }

    /// An HTTP-level rejection.
    pub fn http(status: u16, body: String) -> Self {
        Self {
            status: Some(status),
            body: Some(body),
            reason: format!("HTTP {}", status),
        }
    }

    /// Attach the raw response body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        if let Some(ref body) = self.body {
            write!(f, ": {}", snippet(body))?;
        }
        Ok(())
    }
}

impl std::error::Error for LoginError {}

/// Failures of the live stream session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The stream connection could not be established.
    #[error("connect failed: {cause}")]
    Connect { cause: String },

    /// Reading from (or replying on) the open connection failed.
    #[error("receive failed: {cause}")]
    Recv { cause: String },
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// TLS setup or handshake error.
    #[error("TLS error: {message}")]
    Tls { message: String },

    /// Operation timed out.
    #[error("timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// The peer closed the connection.
    #[error("connection closed: {reason}")]
    Closed { reason: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

const SNIPPET_LIMIT: usize = 500;

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(SNIPPET_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
