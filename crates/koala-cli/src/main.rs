//! koala-probe - operator probe for the koala real-time stream.
//!
//! A thin wrapper over `koala-client`: log in with an encrypted password,
//! attach to the stream, print what arrives, and close cleanly.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{decrypt, encrypt, gen_key, listen, login};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Listen(args) => listen::run(args).await,
        Commands::Login(args) => login::run(args).await,
        Commands::Encrypt(args) => encrypt::run(args),
        Commands::Decrypt(args) => decrypt::run(args),
        Commands::GenKey => gen_key::run(),
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
