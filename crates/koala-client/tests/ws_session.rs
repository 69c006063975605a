//! Stream session tests against a local WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use koala_client::{ExitReason, SessionEvent, SessionLoop, SessionState};
use koala_core::error::SessionError;
use koala_core::{AccessToken, Error, SessionConfig, SessionEndpoint, TlsMode};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

fn quick_config() -> SessionConfig {
    SessionConfig {
        duration: Duration::from_secs(2),
        read_timeout: Duration::from_millis(200),
        connect_timeout: Duration::from_secs(2),
        ..SessionConfig::default()
    }
}

fn text(s: &str) -> Message {
    Message::text(s.to_owned())
}

fn endpoint_for(addr: SocketAddr) -> SessionEndpoint {
    SessionEndpoint::build(&format!("http://{}", addr), &AccessToken::new("T0K"))
}

#[tokio::test]
async fn test_session_answers_ping_and_surfaces_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();

        ws.send(text(r#"{"type":"ping"}"#)).await.unwrap();
        let reply = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text.as_str().to_owned(),
                Some(Ok(_)) => continue,
                other => panic!("expected pong, got {:?}", other),
            }
        };

        ws.send(text(
            r#"{"type":"bike_error_log_notification","data":{"bike_id":"KB-1"}}"#,
        ))
        .await
        .unwrap();
        ws.send(text("garbage")).await.unwrap();

        // Drain until the client closes.
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
        reply
    });

    let (tx, mut rx) = mpsc::channel(16);
    let session = SessionLoop::new(quick_config()).with_events(tx);
    let summary = session
        .run(&endpoint_for(addr), std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.reason, ExitReason::DeadlineElapsed);
    assert_eq!(summary.frames_received, 3);
    assert_eq!(summary.pings_answered, 1);
    assert_eq!(summary.malformed_frames, 1);
    assert_eq!(session.state(), SessionState::Closed);

    assert_eq!(server.await.unwrap(), r#"{"type":"pong"}"#);

    assert_eq!(rx.recv().await, Some(SessionEvent::PingAnswered));
    match rx.recv().await {
        Some(SessionEvent::Message(payload)) => assert_eq!(payload["data"]["bike_id"], "KB-1"),
        other => panic!("expected message, got {:?}", other),
    }
    assert_eq!(
        rx.recv().await,
        Some(SessionEvent::Malformed("garbage".to_string()))
    );
}

#[tokio::test]
async fn test_server_close_is_a_receive_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let session = SessionLoop::new(quick_config());
    let result = session.run(&endpoint_for(addr), std::future::pending()).await;

    assert!(matches!(
        result,
        Err(Error::Session(SessionError::Recv { .. }))
    ));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_cancelled_session_closes_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        let mut saw_close = false;
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                saw_close = true;
                break;
            }
        }
        saw_close
    });

    let config = SessionConfig {
        duration: Duration::from_secs(60),
        ..quick_config()
    };
    let summary = SessionLoop::new(config)
        .run(
            &endpoint_for(addr),
            tokio::time::sleep(Duration::from_millis(300)),
        )
        .await
        .unwrap();

    assert_eq!(summary.reason, ExitReason::Cancelled);
    assert!(server.await.unwrap());
}

#[tokio::test]
async fn test_connect_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = SessionLoop::new(quick_config());
    let result = session.run(&endpoint_for(addr), std::future::pending()).await;

    assert!(matches!(
        result,
        Err(Error::Session(SessionError::Connect { .. }))
    ));
    assert_eq!(session.state(), SessionState::Failed);
}

/// Acceptor presenting a freshly generated self-signed certificate for
/// `localhost`.
fn self_signed_acceptor() -> TlsAcceptor {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)
        .unwrap();
    TlsAcceptor::from(Arc::new(config))
}

/// Serve one `wss` client: send a single frame, then drain until close.
/// Resolves to whether the TLS handshake succeeded.
async fn serve_tls_once(listener: TcpListener, acceptor: TlsAcceptor) -> bool {
    let (tcp, _) = listener.accept().await.unwrap();
    let Ok(tls) = acceptor.accept(tcp).await else {
        return false;
    };
    let mut ws = accept_async(tls).await.unwrap();
    ws.send(text(r#"{"type":"bike_error_log_notification"}"#))
        .await
        .unwrap();
    while let Some(Ok(msg)) = ws.next().await {
        if msg.is_close() {
            break;
        }
    }
    true
}

fn tls_endpoint_for(addr: SocketAddr) -> SessionEndpoint {
    SessionEndpoint::build(
        &format!("https://localhost:{}", addr.port()),
        &AccessToken::new("T0K"),
    )
}

#[tokio::test]
async fn test_verify_rejects_self_signed_certificate() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_tls_once(listener, self_signed_acceptor()));

    let config = SessionConfig {
        tls: TlsMode::Verify,
        ..quick_config()
    };
    let session = SessionLoop::new(config);
    let result = session
        .run(&tls_endpoint_for(addr), std::future::pending())
        .await;

    match result {
        Err(Error::Session(SessionError::Connect { cause })) => {
            assert!(cause.to_lowercase().contains("certificate"), "{}", cause);
        }
        other => panic!("expected connect error, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Failed);
    assert!(!server.await.unwrap());
}

#[tokio::test]
async fn test_insecure_accepts_self_signed_certificate() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_tls_once(listener, self_signed_acceptor()));

    let config = SessionConfig {
        duration: Duration::from_secs(1),
        tls: TlsMode::Insecure,
        ..quick_config()
    };
    let session = SessionLoop::new(config);
    let summary = session
        .run(&tls_endpoint_for(addr), std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.reason, ExitReason::DeadlineElapsed);
    assert_eq!(summary.frames_received, 1);
    assert_eq!(session.state(), SessionState::Closed);
    assert!(server.await.unwrap());
}
