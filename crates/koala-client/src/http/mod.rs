//! HTTP client for the account API.

mod client;
mod endpoints;

pub(crate) use client::{HttpClient, RawResponse};
pub(crate) use endpoints::*;
