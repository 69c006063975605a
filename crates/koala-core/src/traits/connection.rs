//! Stream connection trait.

use async_trait::async_trait;

use crate::error::TransportError;

/// A live, bidirectional text-message connection.
///
/// Implementations handle transport-level control traffic (protocol pings,
/// pongs, fragmentation) themselves and only hand application text up.
/// A connection is owned by exactly one session loop.
#[async_trait]
pub trait Connection: Send {
    /// Wait for the next application text message.
    ///
    /// Must be cancel safe: the session loop bounds every call with a
    /// timeout and drops the future when it fires.
    ///
    /// Returns [`TransportError::Closed`] once the peer has closed the
    /// connection or the stream has ended.
    async fn recv(&mut self) -> Result<String, TransportError>;

    /// Send an application text message.
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}
