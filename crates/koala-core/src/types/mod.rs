//! Core URL and endpoint types.
//!
//! These types validate or derive their values at construction time so a
//! malformed base address is rejected before any network activity.

mod api_url;
mod endpoint;

pub use api_url::{ApiUrl, LOGIN_PATH};
pub use endpoint::{SessionEndpoint, StreamChannel, to_stream_scheme};
