//! Listen command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;
use tokio::sync::mpsc;

use koala_client::{ExitReason, SessionEvent, SessionLoop, SessionSummary};
use koala_core::frame::{AlertLevel, BikeStatusUpdate};
use koala_core::{
    Notification, SessionConfig, SessionEndpoint, SessionTokens, StreamChannel, TlsMode,
};

use super::login::{self, LoginOptions};
use crate::output;

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Stream base URL (http, https, ws or wss)
    #[arg(long, env = "KOALA_BASE_WS_URL")]
    pub base_ws_url: String,

    /// Use this access token instead of logging in
    #[arg(long, env = "KOALA_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[command(flatten)]
    pub login: LoginOptions,

    /// Stream to attach to
    #[arg(long, env = "KOALA_CHANNEL", default_value_t = StreamChannel::ErrorLogs)]
    pub channel: StreamChannel,

    /// How long to listen, in seconds
    #[arg(long, env = "KOALA_DURATION", default_value_t = 20)]
    pub duration: u64,

    /// Upper bound on a single read, in seconds
    #[arg(long, env = "KOALA_READ_TIMEOUT", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout: u64,

    /// Upper bound on the connection handshake, in seconds
    #[arg(long, env = "KOALA_CONNECT_TIMEOUT", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Skip TLS certificate verification
    #[arg(long, env = "KOALA_INSECURE")]
    pub insecure: bool,

    /// Output messages as JSON lines
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ListenArgs) -> Result<()> {
    let tls = TlsMode::from_insecure_flag(args.insecure);

    let tokens = match args.access_token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => SessionTokens::from_access_token(token),
        None => {
            let resolved = args
                .login
                .resolve()
                .context("Pass --access-token or the login options")?;
            login::perform(&resolved, tls).await?
        }
    };

    let endpoint =
        SessionEndpoint::for_channel(&args.base_ws_url, args.channel, &tokens.access_token);
    let config = SessionConfig {
        duration: Duration::from_secs(args.duration),
        read_timeout: Duration::from_secs(args.read_timeout),
        connect_timeout: Duration::from_secs(args.connect_timeout),
        tls,
    };

    if tls == TlsMode::Insecure {
        eprintln!("{}", "TLS certificate verification is disabled".yellow());
    }
    eprintln!("{} {}", "Connecting to".dimmed(), endpoint);
    eprintln!(
        "{}",
        format!("Listening for {}s. Press Ctrl+C to stop.", args.duration).dimmed()
    );
    eprintln!();

    let (tx, mut rx) = mpsc::channel(100);
    let json_output = args.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            handle_event(&event, json_output);
        }
    });

    let session = SessionLoop::new(config).with_events(tx);
    let result = session.run(&endpoint, shutdown_signal()).await;
    drop(session);
    printer.await.context("Event printer failed")?;

    let summary = result.context("Stream session failed")?;
    report(&summary);
    Ok(())
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn report(summary: &SessionSummary) {
    eprintln!();
    let how = match summary.reason {
        ExitReason::DeadlineElapsed => "Session finished",
        ExitReason::Cancelled => "Session cancelled",
    };
    output::success(how);
    eprintln!(
        "{}",
        format!(
            "{} frames, {} pings answered, {} malformed, {} idle reads",
            summary.frames_received,
            summary.pings_answered,
            summary.malformed_frames,
            summary.read_timeouts
        )
        .dimmed()
    );
}

fn handle_event(event: &SessionEvent, json_output: bool) {
    let stamp = Local::now().format("%H:%M:%S").to_string();

    match event {
        SessionEvent::Message(payload) => {
            if json_output {
                println!("{}", payload);
                return;
            }
            match Notification::from_payload(payload) {
                Some(Notification::BikeErrorLog(log)) => {
                    let level = match log.level {
                        AlertLevel::Critical => "CRITICAL".red().bold(),
                        AlertLevel::Error => "ERROR".red(),
                        AlertLevel::Warning => "WARNING".yellow(),
                        AlertLevel::Info => "INFO".cyan(),
                    };
                    println!("{} {} {} {}", stamp.dimmed(), level, log.bike, log.title);
                }
                Some(Notification::BikeStatus(updates)) => {
                    for update in &updates {
                        println!("{} {} {}", stamp.dimmed(), "STATUS".blue(), status_line(update));
                    }
                }
                None => println!("{} {} {}", stamp.dimmed(), "MESSAGE".green(), payload),
            }
        }
        SessionEvent::Malformed(raw) => {
            eprintln!("{} {} {}", stamp.dimmed(), "MALFORMED".yellow(), raw);
        }
        SessionEvent::PingAnswered => {
            if !json_output {
                eprintln!("{} {}", stamp.dimmed(), "PING".dimmed());
            }
        }
    }
}

fn status_line(update: &BikeStatusUpdate) -> String {
    let mut line = update.bike_id.clone();
    if let (Some(lat), Some(lng)) = (update.lat, update.lng) {
        line.push_str(&format!(" @ {:.5},{:.5}", lat, lng));
    }
    if let Some(soc) = update.soc {
        line.push_str(&format!(" soc={}%", soc));
    }
    if let Some(speed) = update.speed {
        line.push_str(&format!(" speed={}", speed));
    }
    if let Some(last_seen) = &update.last_seen {
        line.push_str(&format!(" seen {}", last_seen));
    }
    line
}
