//! Encrypt command implementation.

use anyhow::{Context, Result};
use clap::Args;

use koala_core::{LoginKey, cipher};

#[derive(Args, Debug)]
pub struct EncryptArgs {
    /// Plaintext to encrypt
    #[arg(long)]
    pub text: String,

    /// Login secret key
    #[arg(long, env = "KOALA_LOGIN_SECRET_KEY", hide_env_values = true)]
    pub key: String,
}

pub fn run(args: EncryptArgs) -> Result<()> {
    let key = LoginKey::parse(&args.key).context("Invalid login secret key")?;
    let token = cipher::encrypt(&args.text, &key).context("Failed to encrypt")?;

    println!("{}", token);
    Ok(())
}
