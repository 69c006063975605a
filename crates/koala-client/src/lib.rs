//! koala-client - Network side of the koala session client.
//!
//! Performs the encrypted-credential login over HTTPS and runs the
//! real-time stream session over a WebSocket.
//!
//! ```no_run
//! use koala_client::{SessionLoop, login};
//! use koala_core::{ApiUrl, Credentials, LoginKey, SessionConfig, SessionEndpoint, TlsMode};
//!
//! # async fn example() -> koala_core::Result<()> {
//! let api = ApiUrl::new("https://api.example.com")?;
//! let key = LoginKey::parse("cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=")?;
//! let credentials = Credentials::new("ops@example.com", "hunter2");
//!
//! let tokens = login(&api, &credentials, &key, TlsMode::Verify).await?;
//! let endpoint = SessionEndpoint::build("https://api.example.com", &tokens.access_token);
//!
//! let summary = SessionLoop::new(SessionConfig::default())
//!     .run(&endpoint, std::future::pending())
//!     .await?;
//! println!("received {} frames", summary.frames_received);
//! # Ok(())
//! # }
//! ```

mod connection;
mod http;
mod login;
mod session;
mod tls;

pub use connection::WsConnection;
pub use login::{LoginClient, login};
pub use session::{ExitReason, SessionEvent, SessionLoop, SessionState, SessionSummary};
