//! Stream endpoint derivation.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};
use crate::tokens::AccessToken;

/// Which server-pushed stream a session attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamChannel {
    /// Bike error-log notifications.
    #[default]
    ErrorLogs,
    /// Bike realtime status updates.
    RealtimeStatus,
}

impl StreamChannel {
    /// Path of the stream, relative to the stream base.
    pub fn path(&self) -> &'static str {
        match self {
            StreamChannel::ErrorLogs => "/ws/bike/error-logs/",
            StreamChannel::RealtimeStatus => "/ws/bike/realtime-status/",
        }
    }

    /// Short name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            StreamChannel::ErrorLogs => "error-logs",
            StreamChannel::RealtimeStatus => "realtime-status",
        }
    }
}

impl fmt::Display for StreamChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StreamChannel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error-logs" => Ok(StreamChannel::ErrorLogs),
            "realtime-status" => Ok(StreamChannel::RealtimeStatus),
            other => Err(InvalidInputError::Other {
                message: format!("unknown stream channel '{}'", other),
            }
            .into()),
        }
    }
}

/// Rewrite an HTTP(S) base into the matching WebSocket scheme.
///
/// `ws://` and `wss://` bases are kept, `https://` becomes `wss://`,
/// `http://` becomes `ws://`, and anything else is assumed to be a bare
/// host and gets `wss://`. Trailing slashes are always removed.
pub fn to_stream_scheme(base: &str) -> String {
    let base = base.trim_end_matches('/');

    if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        format!("wss://{}", base)
    }
}

/// The fully-qualified stream URL for one session.
///
/// The access token is embedded as the `token` query parameter. `Display`
/// masks it so the endpoint is safe to log; [`SessionEndpoint::as_str`]
/// returns the real URL.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionEndpoint {
    url: String,
    redacted: String,
}

impl SessionEndpoint {
    /// Build the error-log stream endpoint for `base`.
    ///
    /// # Example
    ///
    /// ```
    /// use koala_core::{AccessToken, SessionEndpoint};
    ///
    /// let endpoint = SessionEndpoint::build("https://example.com", &AccessToken::new("TOK123"));
    /// assert_eq!(endpoint.as_str(), "wss://example.com/ws/bike/error-logs/?token=TOK123");
    /// ```
    pub fn build(base: &str, token: &AccessToken) -> Self {
        Self::for_channel(base, StreamChannel::ErrorLogs, token)
    }

    /// Build the endpoint for a specific stream channel.
    pub fn for_channel(base: &str, channel: StreamChannel, token: &AccessToken) -> Self {
        let prefix = format!("{}{}", to_stream_scheme(base), channel.path());
        let encoded: String = url::form_urlencoded::byte_serialize(token.as_str().as_bytes()).collect();

        Self {
            url: format!("{}?token={}", prefix, encoded),
            redacted: format!("{}?token=[REDACTED]", prefix),
        }
    }

    /// Returns the URL including the token.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Returns true when the endpoint uses `wss://`.
    pub fn is_secure(&self) -> bool {
        self.url.starts_with("wss://")
    }
}

impl fmt::Display for SessionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}

impl fmt::Debug for SessionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionEndpoint").field(&self.redacted).finish()
    }
}
