//! CLI tests for koala-probe.
//!
//! Local tests run the binary against wiremock and an in-process WebSocket
//! server. The live test is opt-in and requires:
//! - KOALA_TEST_BASE_API_URL, KOALA_TEST_BASE_WS_URL
//! - KOALA_TEST_EMAIL, KOALA_TEST_PASSWORD, KOALA_TEST_LOGIN_SECRET_KEY

use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";

/// Run the CLI binary with arguments and a clean `KOALA_*` environment.
fn run_cli(args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_koala-probe"));
    cmd.args(args);
    for (name, _) in std::env::vars() {
        if name.starts_with("KOALA_") {
            cmd.env_remove(name);
        }
    }
    cmd.env("NO_COLOR", "1");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
fn run_cli_success(args: &[&str]) -> String {
    let output = run_cli(args);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure.
fn run_cli_failure(args: &[&str]) -> String {
    let output = run_cli(args);
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Run the CLI off the async runtime so in-process servers keep serving.
async fn run_cli_async(args: &[&str]) -> Output {
    let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_cli(&args)
    })
    .await
    .unwrap()
}

#[test]
fn test_encrypt_then_decrypt() {
    let token = run_cli_success(&["encrypt", "--text", "hunter2", "--key", KEY]);
    let token = token.trim();
    assert!(token.starts_with("gAAAAA"));

    let plain = run_cli_success(&["decrypt", "--token", token, "--key", KEY, "--ttl", "60"]);
    assert_eq!(plain.trim(), "hunter2");
}

#[test]
fn test_decrypt_with_other_key_fails() {
    let token = run_cli_success(&["encrypt", "--text", "hunter2", "--key", KEY]);
    let other = run_cli_success(&["gen-key"]);

    let stderr = run_cli_failure(&["decrypt", "--token", token.trim(), "--key", other.trim()]);
    assert!(stderr.contains("Failed to decrypt"));
}

#[test]
fn test_gen_key_is_usable() {
    let key = run_cli_success(&["gen-key"]);
    let key = key.trim();
    assert_eq!(key.len(), 44);
    run_cli_success(&["encrypt", "--text", "x", "--key", key]);
}

#[test]
fn test_encrypt_rejects_bad_key() {
    let stderr = run_cli_failure(&["encrypt", "--text", "x", "--key", "abc"]);
    assert!(stderr.contains("Invalid login secret key"));
}

#[test]
fn test_listen_reports_all_missing_login_options() {
    let stderr = run_cli_failure(&[
        "listen",
        "--base-ws-url",
        "wss://stream.example.com",
        "--email",
        "ops@example.com",
    ]);
    assert!(stderr.contains("--base-api-url"));
    assert!(stderr.contains("--password"));
    assert!(stderr.contains("--login-secret-key"));
    assert!(!stderr.contains("--email,"));
}

#[tokio::test]
async fn test_login_prints_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/account/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"tokens": {"access_token": "A1", "refresh_token": "R1"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let output = run_cli_async(&[
        "login",
        "--base-api-url",
        &uri,
        "--email",
        "ops@example.com",
        "--password",
        "hunter2",
        "--login-secret-key",
        KEY,
        "--json",
    ])
    .await;

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let tokens: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tokens["access_token"], "A1");
    assert_eq!(tokens["refresh_token"], "R1");
}

#[tokio::test]
async fn test_login_failure_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/account/auth/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let output = run_cli_async(&[
        "login",
        "--base-api-url",
        &uri,
        "--email",
        "ops@example.com",
        "--password",
        "wrong",
        "--login-secret-key",
        KEY,
    ])
    .await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("HTTP 401"));
    assert!(stderr.contains("bad credentials"));
}

#[tokio::test]
async fn test_listen_with_access_token() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requested = Arc::new(Mutex::new(String::new()));

    let seen = requested.clone();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let record = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            *seen.lock().unwrap() = req.uri().to_string();
            Ok(resp)
        };
        let mut ws = accept_hdr_async(tcp, record).await.unwrap();

        let payload = r#"{"type":"bike_error_log_notification","data":{"bike_id":"KB-3"}}"#;
        ws.send(Message::text(payload.to_owned())).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    });

    let base = format!("http://{}", addr);
    let output = run_cli_async(&[
        "listen",
        "--base-ws-url",
        &base,
        "--access-token",
        "T0K",
        "--duration",
        "1",
        "--read-timeout",
        "1",
        "--json",
    ])
    .await;

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line: Value = serde_json::from_str(stdout.lines().next().unwrap()).unwrap();
    assert_eq!(line["data"]["bike_id"], "KB-3");
    assert_eq!(*requested.lock().unwrap(), "/ws/bike/error-logs/?token=T0K");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("token=[REDACTED]"));
    assert!(!stderr.contains("T0K"));
}

#[test]
fn test_listen_connect_failure_exits_nonzero() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let stderr = run_cli_failure(&[
        "listen",
        "--base-ws-url",
        &format!("ws://{}", addr),
        "--access-token",
        "T0K",
        "--duration",
        "1",
    ]);
    assert!(stderr.contains("connect failed"));
}

#[test]
fn test_listen_live() {
    let vars = [
        "KOALA_TEST_BASE_API_URL",
        "KOALA_TEST_BASE_WS_URL",
        "KOALA_TEST_EMAIL",
        "KOALA_TEST_PASSWORD",
        "KOALA_TEST_LOGIN_SECRET_KEY",
    ];
    let Some(values) = vars
        .iter()
        .map(|name| std::env::var(name).ok())
        .collect::<Option<Vec<String>>>()
    else {
        eprintln!("Skipping test_listen_live: KOALA_TEST_* not set");
        return;
    };

    run_cli_success(&[
        "listen",
        "--base-api-url",
        &values[0],
        "--base-ws-url",
        &values[1],
        "--email",
        &values[2],
        "--password",
        &values[3],
        "--login-secret-key",
        &values[4],
        "--duration",
        "5",
    ]);
}
