//! Core traits at the transport seam.

mod connection;

pub use connection::Connection;
