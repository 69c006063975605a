//! Login command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use serde_json::json;

use koala_core::{ApiUrl, Credentials, LoginKey, SessionTokens, TlsMode};

use crate::output;

/// Options for the login exchange, shared by `login` and `listen`.
#[derive(Args, Debug, Default)]
pub struct LoginOptions {
    /// Account API base URL (http or https)
    #[arg(long, env = "KOALA_BASE_API_URL")]
    pub base_api_url: Option<String>,

    /// Account email
    #[arg(long, env = "KOALA_EMAIL")]
    pub email: Option<String>,

    /// Account password (sent encrypted)
    #[arg(long, env = "KOALA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Login secret key used to encrypt the password
    #[arg(long, env = "KOALA_LOGIN_SECRET_KEY", hide_env_values = true)]
    pub login_secret_key: Option<String>,
}

/// Validated login inputs.
#[derive(Debug)]
pub struct ResolvedLogin {
    pub api: ApiUrl,
    pub credentials: Credentials,
    pub key: LoginKey,
}

impl LoginOptions {
    /// Check that every option is present and well formed.
    ///
    /// All missing options are reported in one error.
    pub fn resolve(&self) -> Result<ResolvedLogin> {
        let api = present(&self.base_api_url);
        let email = present(&self.email);
        let password = present(&self.password);
        let key = present(&self.login_secret_key);

        let (Some(api), Some(email), Some(password), Some(key)) = (api, email, password, key) else {
            let missing: Vec<&str> = [
                ("--base-api-url", api.is_none()),
                ("--email", email.is_none()),
                ("--password", password.is_none()),
                ("--login-secret-key", key.is_none()),
            ]
            .into_iter()
            .filter_map(|(flag, absent)| absent.then_some(flag))
            .collect();
            bail!("missing required options: {}", missing.join(", "));
        };

        Ok(ResolvedLogin {
            api: ApiUrl::new(api).context("Invalid API URL")?,
            credentials: Credentials::new(email, password),
            key: LoginKey::parse(key).context("Invalid login secret key")?,
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Run the login exchange, reporting progress on stderr.
pub async fn perform(login: &ResolvedLogin, tls: TlsMode) -> Result<SessionTokens> {
    eprintln!("{}", "Logging in...".dimmed());

    koala_client::login(&login.api, &login.credentials, &login.key, tls)
        .await
        .context("Failed to login")
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[command(flatten)]
    pub login: LoginOptions,

    /// Skip TLS certificate verification
    #[arg(long, env = "KOALA_INSECURE")]
    pub insecure: bool,

    /// Output tokens as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: LoginArgs) -> Result<()> {
    let login = args.login.resolve()?;
    let tokens = perform(&login, TlsMode::from_insecure_flag(args.insecure)).await?;

    let refresh = tokens.refresh_token.as_ref().map(|t| t.as_str());

    if args.json {
        return output::json(&json!({
            "access_token": tokens.access_token.as_str(),
            "refresh_token": refresh,
        }));
    }

    output::success("Logged in successfully");
    println!();
    output::field("API", login.api.as_str());
    output::field("Access token", tokens.access_token.as_str());
    output::field("Refresh token", refresh.unwrap_or("(none)"));

    Ok(())
}
