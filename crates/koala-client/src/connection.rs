//! WebSocket implementation of [`Connection`].

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{
    Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config,
};
use tracing::{debug, info, instrument, trace};

use koala_core::error::{SessionError, TransportError};
use koala_core::{Connection, SessionConfig, SessionEndpoint};

use crate::tls;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live WebSocket connection to a stream endpoint.
pub struct WsConnection {
    stream: WsStream,
}

impl WsConnection {
    /// Open the WebSocket handshake to `endpoint`, bounded by
    /// `config.connect_timeout`.
    ///
    /// `wss://` endpoints use the certificate policy in `config.tls`.
    #[instrument(skip_all, fields(endpoint = %endpoint))]
    pub async fn connect(
        endpoint: &SessionEndpoint,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        info!(tls = %config.tls, "Connecting to stream");

        let connector = endpoint
            .is_secure()
            .then(|| Connector::Rustls(tls::client_config(config.tls)));
        let handshake =
            connect_async_tls_with_config(endpoint.as_str(), None, false, connector);

        let (stream, response) = match timeout(config.connect_timeout, handshake).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                return Err(SessionError::Connect {
                    cause: e.to_string(),
                });
            }
            Err(_) => {
                return Err(SessionError::Connect {
                    cause: format!(
                        "handshake timed out after {}ms",
                        config.connect_timeout.as_millis()
                    ),
                });
            }
        };

        debug!(status = %response.status(), "WebSocket connected");
        Ok(Self { stream })
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn recv(&mut self) -> Result<String, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "Received binary message");
                    return Ok(String::from_utf8_lossy(&data).into_owned());
                }
                Some(Ok(Message::Ping(_))) => {
                    // tungstenite queues the pong and flushes it on the next read or write.
                    trace!("Received protocol ping");
                }
                Some(Ok(Message::Pong(_))) => {
                    trace!("Received protocol pong");
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "WebSocket closed by server");
                    let reason = match frame {
                        Some(frame) => {
                            format!("{} {}", u16::from(frame.code), frame.reason.as_str())
                        }
                        None => "no close frame".to_string(),
                    };
                    return Err(TransportError::Closed { reason });
                }
                Some(Ok(Message::Frame(_))) => {
                    // Raw frame, ignore
                }
                Some(Err(e)) => return Err(ws_error(e)),
                None => {
                    return Err(TransportError::Closed {
                        reason: "stream ended".to_string(),
                    });
                }
            }
        }
    }

    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.stream
            .send(Message::text(text.to_owned()))
            .await
            .map_err(ws_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream.close(None).await.map_err(ws_error)
    }
}

fn ws_error(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed {
                reason: err.to_string(),
            }
        }
        tungstenite::Error::Tls(e) => TransportError::Tls {
            message: e.to_string(),
        },
        other => TransportError::Connection {
            message: other.to_string(),
        },
    }
}
