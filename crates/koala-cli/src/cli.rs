//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::commands::{decrypt::DecryptArgs, encrypt::EncryptArgs, listen::ListenArgs, login::LoginArgs};

/// Probe the koala login exchange and real-time stream.
#[derive(Parser, Debug)]
#[command(name = "koala-probe")]
#[command(author, version = env!("KOALA_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in (or reuse a token) and listen on the stream
    Listen(ListenArgs),

    /// Perform the login exchange only and print the tokens
    Login(LoginArgs),

    /// Encrypt a secret with a login key
    Encrypt(EncryptArgs),

    /// Decrypt a token made with a login key
    Decrypt(DecryptArgs),

    /// Print a freshly generated login key
    GenKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn listen_defaults() {
        let cli = Cli::try_parse_from([
            "koala-probe",
            "listen",
            "--base-ws-url",
            "https://api.example.com",
            "--access-token",
            "T",
        ])
        .unwrap();

        let Commands::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        assert_eq!(args.duration, 20);
        assert_eq!(args.read_timeout, 5);
        assert_eq!(args.connect_timeout, 10);
        assert!(!args.insecure);
    }

    #[test]
    fn read_timeout_must_be_positive() {
        let result = Cli::try_parse_from([
            "koala-probe",
            "listen",
            "--base-ws-url",
            "wss://api.example.com",
            "--read-timeout",
            "0",
        ]);
        assert!(result.is_err());
    }
}
