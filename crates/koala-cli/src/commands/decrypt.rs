//! Decrypt command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use koala_core::{LoginKey, cipher};

#[derive(Args, Debug)]
pub struct DecryptArgs {
    /// Token to decrypt
    #[arg(long)]
    pub token: String,

    /// Login secret key
    #[arg(long, env = "KOALA_LOGIN_SECRET_KEY", hide_env_values = true)]
    pub key: String,

    /// Reject tokens older than this many seconds
    #[arg(long)]
    pub ttl: Option<u64>,
}

pub fn run(args: DecryptArgs) -> Result<()> {
    let key = LoginKey::parse(&args.key).context("Invalid login secret key")?;
    let plaintext = cipher::decrypt(args.token.trim(), &key, args.ttl.map(Duration::from_secs))
        .context("Failed to decrypt")?;

    println!("{}", plaintext);
    Ok(())
}
