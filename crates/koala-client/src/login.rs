//! Login exchange: encrypted credentials in, session tokens out.

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use koala_core::cipher;
use koala_core::error::LoginError;
use koala_core::types::LOGIN_PATH;
use koala_core::{
    AccessToken, ApiUrl, Credentials, LoginKey, RefreshToken, Result, SessionTokens, TlsMode,
};

use crate::http::{HttpClient, LoginRequest, RawResponse};

type Envelope<'a> = &'a Map<String, Value>;

/// Where the token envelope may sit in a login response, in lookup order.
const ENVELOPE_LOOKUPS: [for<'a> fn(&'a Value) -> Option<Envelope<'a>>; 2] =
    [nested_envelope, top_level_envelope];

fn nested_envelope(body: &Value) -> Option<Envelope<'_>> {
    non_empty(body.get("data")?.get("tokens")?)
}

fn top_level_envelope(body: &Value) -> Option<Envelope<'_>> {
    non_empty(body.get("tokens")?)
}

fn non_empty(value: &Value) -> Option<Envelope<'_>> {
    value.as_object().filter(|map| !map.is_empty())
}

fn token_field<'a>(envelope: Envelope<'a>, name: &str) -> Option<&'a str> {
    envelope
        .get(name)
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
}

/// Client for the account login endpoint.
#[derive(Debug, Clone)]
pub struct LoginClient {
    http: HttpClient,
}

impl LoginClient {
    /// Create a login client for the given API.
    pub fn new(api: ApiUrl, tls: TlsMode) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(api, tls)?,
        })
    }

    /// Returns the API URL this client logs in against.
    pub fn api(&self) -> &ApiUrl {
        self.http.api()
    }

    /// Encrypt the password, submit the credentials, and extract tokens.
    ///
    /// Makes exactly one request and never retries.
    #[instrument(skip(self, credentials, key), fields(api = %self.api(), identity = %credentials.identity()))]
    pub async fn login(&self, credentials: &Credentials, key: &LoginKey) -> Result<SessionTokens> {
        info!("Logging in");

        let password = cipher::encrypt(credentials.secret(), key)?;
        let request = LoginRequest {
            email: credentials.identity(),
            password: password.as_str(),
        };

        let response = self.http.post_json(LOGIN_PATH, &request).await?;
        let tokens = parse_login_response(response)?;

        info!(
            has_refresh_token = tokens.refresh_token.is_some(),
            "Login succeeded"
        );
        Ok(tokens)
    }
}

/// One-shot login against `api`.
pub async fn login(
    api: &ApiUrl,
    credentials: &Credentials,
    key: &LoginKey,
    tls: TlsMode,
) -> Result<SessionTokens> {
    LoginClient::new(api.clone(), tls)?
        .login(credentials, key)
        .await
}

/// Interpret a raw login response.
///
/// Any status of 400 or above is a failure regardless of the body. A
/// successful body must be JSON carrying a token envelope with a non-empty
/// `access_token`.
fn parse_login_response(response: RawResponse) -> std::result::Result<SessionTokens, LoginError> {
    let RawResponse { status, body } = response;

    if status >= 400 {
        warn!(status, "Login rejected");
        return Err(LoginError::http(status, body));
    }

    let payload: Value = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "Login response is not JSON");
            return Err(LoginError::reason("non-JSON response").with_body(body));
        }
    };

    let Some(envelope) = ENVELOPE_LOOKUPS
        .iter()
        .find_map(|lookup| lookup(&payload))
    else {
        return Err(LoginError::reason("no token envelope").with_body(body));
    };

    let Some(access) = token_field(envelope, "access_token") else {
        return Err(LoginError::reason("missing access token").with_body(body));
    };

    Ok(SessionTokens {
        access_token: AccessToken::new(access),
        refresh_token: token_field(envelope, "refresh_token").map(RefreshToken::new),
    })
}
