//! Inbound frame classification.

use serde_json::Value;

/// A frame received on the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Keep-alive probe; must be answered with [`OutboundFrame::Pong`].
    Ping(Value),

    /// Keep-alive answer from the server. No action required.
    Pong(Value),

    /// Any other JSON payload, surfaced to the operator uninterpreted.
    Opaque(Value),

    /// Text that is not JSON. Logged verbatim; never fatal.
    Malformed(String),
}

impl InboundFrame {
    /// Classify a raw text frame.
    ///
    /// Payloads without a string `type` field (including JSON arrays and
    /// scalars) are [`InboundFrame::Opaque`].
    pub fn classify(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => return InboundFrame::Malformed(raw.to_string()),
        };

        match value.get("type").and_then(Value::as_str) {
            Some("ping") => InboundFrame::Ping(value),
            Some("pong") => InboundFrame::Pong(value),
            _ => InboundFrame::Opaque(value),
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundFrame::Ping(_) => "ping",
            InboundFrame::Pong(_) => "pong",
            InboundFrame::Opaque(_) => "opaque",
            InboundFrame::Malformed(_) => "malformed",
        }
    }
}

/// A frame sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Reply to a server ping.
    Pong,
}

impl OutboundFrame {
    /// The wire text of the frame.
    pub fn as_text(&self) -> &'static str {
        match self {
            OutboundFrame::Pong => r#"{"type":"pong"}"#,
        }
    }
}
