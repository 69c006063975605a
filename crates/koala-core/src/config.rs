//! Session configuration.

use std::fmt;
use std::time::Duration;

/// How the peer certificate is checked on TLS connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Validate against the bundled web PKI root store.
    #[default]
    Verify,
    /// Accept any certificate. For diagnosing broken deployments only.
    Insecure,
}

impl TlsMode {
    /// `Insecure` when `insecure` is set, `Verify` otherwise.
    pub fn from_insecure_flag(insecure: bool) -> Self {
        if insecure {
            TlsMode::Insecure
        } else {
            TlsMode::Verify
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsMode::Verify => f.write_str("verify"),
            TlsMode::Insecure => f.write_str("insecure"),
        }
    }
}

/// Timing and trust settings for one stream session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Total time to listen before closing normally.
    pub duration: Duration,
    /// Upper bound on a single receive. Expiry is not an error.
    pub read_timeout: Duration,
    /// Upper bound on establishing the connection.
    pub connect_timeout: Duration,
    /// Certificate policy for `wss://` endpoints.
    pub tls: TlsMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(20),
            read_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            tls: TlsMode::Verify,
        }
    }
}
