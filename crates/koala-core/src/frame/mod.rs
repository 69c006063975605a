//! Stream frame types.
//!
//! Every frame on the stream is a UTF-8 JSON object with a `type` field.
//! Inbound frames are classified into a closed set of variants; the only
//! frame the client ever originates is the keep-alive pong.

mod inbound;
mod notification;

pub use inbound::{InboundFrame, OutboundFrame};
pub use notification::{AlertLevel, BikeErrorLog, BikeStatusUpdate, Notification};
