//! Stream session loop.
//!
//! A session owns exactly one connection and moves through
//! `Connecting → Listening → Closing → Closed`. `Failed` is entered from
//! `Connecting` when the handshake fails and from `Listening` when a read
//! (or a pong reply) fails; in the latter case the connection is still
//! closed before the error is returned.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, error, info, instrument, trace, warn};

use koala_core::error::SessionError;
use koala_core::{Connection, InboundFrame, OutboundFrame, Result, SessionConfig, SessionEndpoint};

use crate::connection::WsConnection;

/// Stand-in deadline for durations too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Listening,
    Closing,
    Closed,
    Failed,
}

/// Something the session surfaced to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A JSON payload other than ping/pong.
    Message(Value),
    /// A frame that was not JSON, verbatim.
    Malformed(String),
    /// A server ping was answered.
    PingAnswered,
}

/// Why a session ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The configured duration elapsed.
    DeadlineElapsed,
    /// The caller's shutdown future resolved.
    Cancelled,
}

/// Counters for one finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub reason: ExitReason,
    pub frames_received: u64,
    pub pings_answered: u64,
    pub malformed_frames: u64,
    pub read_timeouts: u64,
}

#[derive(Debug, Default)]
struct SessionStats {
    frames_received: u64,
    pings_answered: u64,
    malformed_frames: u64,
    read_timeouts: u64,
}

impl SessionStats {
    fn finish(self, reason: ExitReason) -> SessionSummary {
        SessionSummary {
            reason,
            frames_received: self.frames_received,
            pings_answered: self.pings_answered,
            malformed_frames: self.malformed_frames,
            read_timeouts: self.read_timeouts,
        }
    }
}

/// Drives one stream session.
pub struct SessionLoop {
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    events: Option<mpsc::Sender<SessionEvent>>,
}

impl SessionLoop {
    /// Create a session loop in the `Connecting` state.
    pub fn new(config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        Self {
            config,
            state,
            events: None,
        }
    }

    /// Forward surfaced frames to `events`.
    ///
    /// A dropped receiver is ignored; the session keeps running.
    pub fn with_events(mut self, events: mpsc::Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Connect to `endpoint` and listen until the deadline elapses or
    /// `shutdown` resolves.
    ///
    /// If the returned future is dropped instead, the socket is released
    /// without a close handshake.
    #[instrument(skip_all, fields(endpoint = %endpoint))]
    pub async fn run<F>(&self, endpoint: &SessionEndpoint, shutdown: F) -> Result<SessionSummary>
    where
        F: Future<Output = ()>,
    {
        self.transition(SessionState::Connecting);

        let conn = match WsConnection::connect(endpoint, &self.config).await {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = %e, "Stream connection failed");
                self.transition(SessionState::Failed);
                return Err(e.into());
            }
        };

        self.run_on(conn, shutdown).await
    }

    /// Listen on an already established connection, then close it.
    ///
    /// The connection is closed exactly once on every exit path. Close
    /// failures are logged and never replace the session outcome.
    pub async fn run_on<C, F>(&self, mut conn: C, shutdown: F) -> Result<SessionSummary>
    where
        C: Connection,
        F: Future<Output = ()>,
    {
        self.transition(SessionState::Listening);

        let mut stats = SessionStats::default();
        let outcome = self.listen(&mut conn, shutdown, &mut stats).await;
        if outcome.is_err() {
            self.transition(SessionState::Failed);
        }

        self.transition(SessionState::Closing);
        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close connection");
        }
        drop(conn);
        self.transition(SessionState::Closed);

        info!(?stats, "Session ended");
        outcome.map(|reason| stats.finish(reason))
    }

    async fn listen<C, F>(&self, conn: &mut C, shutdown: F, stats: &mut SessionStats) -> Result<ExitReason>
    where
        C: Connection,
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let deadline = started
            .checked_add(self.config.duration)
            .unwrap_or(started + FAR_FUTURE);
        tokio::pin!(shutdown);

        info!(duration = ?self.config.duration, "Listening");

        loop {
            let now = Instant::now();
            if now >= deadline {
                info!("Session duration elapsed");
                return Ok(ExitReason::DeadlineElapsed);
            }
            let wait = self.config.read_timeout.min(deadline - now);

            let received = tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Session cancelled");
                    return Ok(ExitReason::Cancelled);
                }

                received = timeout(wait, conn.recv()) => received,
            };

            let raw = match received {
                Err(_) => {
                    stats.read_timeouts += 1;
                    trace!("Read timed out");
                    continue;
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Stream receive failed");
                    return Err(SessionError::Recv {
                        cause: e.to_string(),
                    }
                    .into());
                }
                Ok(Ok(raw)) => raw,
            };

            stats.frames_received += 1;

            // A stalled consumer or pong write must not outlive the session.
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Session cancelled");
                    return Ok(ExitReason::Cancelled);
                }

                _ = sleep_until(deadline) => {
                    info!("Session duration elapsed");
                    return Ok(ExitReason::DeadlineElapsed);
                }

                handled = self.handle_frame(conn, raw, stats) => handled?,
            }
        }
    }

    async fn handle_frame<C>(&self, conn: &mut C, raw: String, stats: &mut SessionStats) -> Result<()>
    where
        C: Connection,
    {
        let frame = InboundFrame::classify(&raw);
        trace!(kind = frame.kind(), "Frame received");

        match frame {
            InboundFrame::Malformed(raw) => {
                warn!(raw = %raw, "Received non-JSON frame");
                stats.malformed_frames += 1;
                self.emit(SessionEvent::Malformed(raw)).await;
            }
            InboundFrame::Ping(_) => {
                conn.send_text(OutboundFrame::Pong.as_text())
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to answer ping");
                        SessionError::Recv {
                            cause: format!("pong failed: {}", e),
                        }
                    })?;
                stats.pings_answered += 1;
                debug!("Answered ping");
                self.emit(SessionEvent::PingAnswered).await;
            }
            InboundFrame::Pong(_) => {
                debug!("Received pong");
            }
            InboundFrame::Opaque(payload) => {
                info!(%payload, "Received message");
                self.emit(SessionEvent::Message(payload)).await;
            }
        }
        Ok(())
    }

    async fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            if events.send(event).await.is_err() {
                debug!("Event receiver dropped");
            }
        }
    }

    fn transition(&self, next: SessionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = ?prev, to = ?next, "Session state");
        }
    }
}
