//! Account API HTTP client.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument, trace};

use koala_core::error::TransportError;
use koala_core::{ApiUrl, Error, TlsMode};

/// Upper bound on one API request, connect included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Status and raw body of an API response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    api: ApiUrl,
}

impl HttpClient {
    /// Create a client for the given API.
    pub fn new(api: ApiUrl, tls: TlsMode) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("koala-probe/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(tls == TlsMode::Insecure)
            .build()
            .map_err(transport_error)?;

        Ok(Self { client, api })
    }

    /// Returns the API URL this client is configured for.
    pub fn api(&self) -> &ApiUrl {
        &self.api
    }

    /// POST a JSON body and return the response without interpreting it.
    ///
    /// Only transport failures are errors here; HTTP error statuses are
    /// returned to the caller as-is.
    #[instrument(skip(self, body), fields(api = %self.api))]
    pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<RawResponse, Error>
    where
        B: Serialize,
    {
        let url = self.api.endpoint_url(path);
        debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        trace!(status, "API response");

        let body = response.text().await.map_err(transport_error)?;
        Ok(RawResponse { status, body })
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            duration_ms: REQUEST_TIMEOUT.as_millis() as u64,
        }
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let api = ApiUrl::new("https://api.example.com").unwrap();
        let client = HttpClient::new(api.clone(), TlsMode::Insecure).unwrap();
        assert_eq!(client.api().as_str(), api.as_str());
    }
}
