//! koala-core - Core types for the koala real-time session client.
//!
//! Transport-free building blocks: credentials and tokens, the Fernet
//! credential cipher, API and stream endpoint derivation, stream frame
//! classification, session configuration, and the [`Connection`] trait the
//! session loop runs over.

pub mod cipher;
pub mod config;
pub mod credentials;
pub mod error;
pub mod frame;
pub mod tokens;
pub mod traits;
pub mod types;

pub use cipher::{EncryptedSecret, LoginKey};
pub use config::{SessionConfig, TlsMode};
pub use credentials::Credentials;
pub use error::Error;
pub use frame::{InboundFrame, Notification, OutboundFrame};
pub use tokens::{AccessToken, RefreshToken, SessionTokens};
pub use traits::Connection;
pub use types::{ApiUrl, SessionEndpoint, StreamChannel};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
