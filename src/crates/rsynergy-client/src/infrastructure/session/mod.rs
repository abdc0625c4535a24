//! Session: transport, greeting handshake, heartbeat, the event loop.
//!
//! The session owns the socket exclusively and runs single-task and
//! cooperative: one `select!` loop multiplexes the socket read, the
//! keep-alive watchdog, the throttled-move flush timer, and the shutdown
//! signal.  Decoded messages are handed to the dispatcher in arrival
//! order; its replies are written back before the next message is
//! processed.
//!
//! State machine:
//!
//! ```text
//! Disconnected → Connecting → AwaitingHello → Greeted → Active
//!                     │              │           │         │
//!                     └──────────────┴───────────┴─────────┴──→ Failed
//!                                                Active ──stop──→ Draining
//! ```
//!
//! The server is responsible for initiating keep-alive; the client echoes
//! `CALV` and fails the session when nothing at all arrives for three
//! intervals.  The session never reconnects itself — a supervisor can,
//! from the typed error it surfaces.

pub mod tls;

use std::path::PathBuf;
use std::time::Duration;

use rsynergy_core::{
    encode_message, Message, ProtocolError, StreamParser, KEEP_ALIVE_INTERVAL_SECS,
    PROTOCOL_MAJOR, PROTOCOL_MINOR,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::application::dispatcher::{Dispatcher, SessionEnd};
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::device::DeviceError;

/// Transport + handshake failures that terminate a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// TCP connect, read, or write failure.
    #[error("transport error: {0}")]
    Transport(#[source] std::io::Error),

    /// The TCP connect did not complete within the configured timeout.
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// TLS configuration or handshake failure.
    #[error("TLS failure: {0}")]
    Tls(String),

    /// The server never sent its greeting.
    #[error("timed out waiting for the server greeting")]
    HandshakeTimeout,

    /// The first message from the server was not a greeting.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Framing violation or unsupported protocol version.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Nothing received for the whole keep-alive window.
    #[error("no traffic from server within {0:?}")]
    HeartbeatTimeout(Duration),

    /// The server closed the connection without `CBYE`.
    #[error("server closed the connection")]
    Eof,

    /// The server terminated the session with an error opcode.
    #[error("server terminated the session: {0}")]
    Rejected(String),

    /// A uinput write failed; continuing would desync the held-keys set.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingHello,
    Greeted,
    Active,
    Draining,
    Failed,
}

/// Transport-level settings distilled from [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub server: String,
    pub port: u16,
    pub client_name: String,
    pub connect_timeout: Duration,
    /// Watchdog window; 3 × the server's CALV interval by default.
    pub keep_alive_timeout: Duration,
    pub tls: bool,
    pub mtls: bool,
    pub tls_trust: bool,
    pub pem_path: PathBuf,
}

impl SessionConfig {
    pub fn from_client_config(cfg: &ClientConfig) -> Self {
        Self {
            server: cfg.server.clone(),
            port: cfg.port,
            client_name: cfg.client_name.clone(),
            connect_timeout: Duration::from_secs(cfg.connect_timeout),
            keep_alive_timeout: Duration::from_secs(3 * KEEP_ALIVE_INTERVAL_SECS),
            tls: cfg.tls,
            mtls: cfg.mtls,
            tls_trust: cfg.tls_trust,
            pem_path: cfg.pem_path.clone(),
        }
    }

    fn wants_tls(&self) -> bool {
        self.tls || self.mtls
    }
}

/// One client session: connect, greet, then replay the server's stream
/// into the dispatcher until something ends it.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Connects and runs the session to completion.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] describing why the session ended; a clean
    /// stop (shutdown signal or server `CBYE`) is `Ok(())`.
    pub async fn run(
        &mut self,
        dispatcher: &mut Dispatcher,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), SessionError> {
        self.state = SessionState::Connecting;
        let addr = format!("{}:{}", self.config.server, self.config.port);
        info!(%addr, tls = self.config.wants_tls(), "connecting");

        let tcp = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| SessionError::ConnectTimeout {
                addr: addr.clone(),
                timeout: self.config.connect_timeout,
            })?
            .map_err(SessionError::Transport)?;
        tcp.set_nodelay(true).map_err(SessionError::Transport)?;

        if self.config.wants_tls() {
            let stream = tls::connect(tcp, &self.config).await?;
            self.run_on(stream, dispatcher, shutdown).await
        } else {
            self.run_on(tcp, dispatcher, shutdown).await
        }
    }

    /// Runs the handshake and event loop over an established stream.
    ///
    /// Public so integration tests can drive a session over an in-memory
    /// duplex pipe instead of a real socket.
    pub async fn run_on<S>(
        &mut self,
        stream: S,
        dispatcher: &mut Dispatcher,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (mut rd, mut wr) = tokio::io::split(stream);
        let mut parser = StreamParser::new();

        // ── Greeting ─────────────────────────────────────────────────────
        self.state = SessionState::AwaitingHello;
        let hello = tokio::time::timeout(
            self.config.connect_timeout,
            read_greeting(&mut rd, &mut parser),
        )
        .await
        .map_err(|_| SessionError::HandshakeTimeout)?;
        let (protocol_name, major, minor) = match hello {
            Ok(fields) => fields,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };

        if major < 1 {
            self.state = SessionState::Failed;
            return Err(SessionError::Protocol(ProtocolError::UnsupportedVersion {
                major,
                minor,
            }));
        }
        info!(%protocol_name, major, minor, "server greeting");

        let reply = Message::HelloBack {
            protocol_name,
            major: PROTOCOL_MAJOR,
            minor: PROTOCOL_MINOR,
            name: self.config.client_name.clone(),
        };
        wr.write_all(&encode_message(&reply))
            .await
            .map_err(SessionError::Transport)?;
        self.state = SessionState::Greeted;

        // ── Event loop ───────────────────────────────────────────────────
        let mut buf = vec![0u8; 4096];
        let mut last_rx = Instant::now();

        loop {
            let watchdog = tokio::time::sleep_until(last_rx + self.config.keep_alive_timeout);
            let flush_at = dispatcher.pending_flush_deadline();

            tokio::select! {
                read = rd.read(&mut buf) => {
                    let n = read.map_err(SessionError::Transport)?;
                    if n == 0 {
                        self.state = SessionState::Failed;
                        return Err(SessionError::Eof);
                    }
                    last_rx = Instant::now();
                    parser.feed(&buf[..n]);

                    while let Some(msg) = parser.next_message()? {
                        let outcome = dispatcher.handle(msg, std::time::Instant::now())?;
                        for reply in &outcome.replies {
                            wr.write_all(&encode_message(reply))
                                .await
                                .map_err(SessionError::Transport)?;
                        }
                        if self.state == SessionState::Greeted && dispatcher.is_active() {
                            self.state = SessionState::Active;
                        }
                        match outcome.end {
                            Some(SessionEnd::CloseRequested) => {
                                self.state = SessionState::Draining;
                                dispatcher.drain(std::time::Instant::now())?;
                                let _ = wr.shutdown().await;
                                self.state = SessionState::Disconnected;
                                return Ok(());
                            }
                            Some(SessionEnd::ServerError(reason)) => {
                                self.state = SessionState::Failed;
                                return Err(SessionError::Rejected(reason));
                            }
                            None => {}
                        }
                    }
                }

                _ = watchdog => {
                    self.state = SessionState::Failed;
                    warn!("keep-alive watchdog fired");
                    return Err(SessionError::HeartbeatTimeout(self.config.keep_alive_timeout));
                }

                _ = sleep_until_opt(flush_at) => {
                    dispatcher.flush_pending(std::time::Instant::now())?;
                }

                _ = shutdown.changed() => {
                    debug!("shutdown signal received");
                    self.state = SessionState::Draining;
                    dispatcher.drain(std::time::Instant::now())?;
                    let _ = wr.shutdown().await;
                    self.state = SessionState::Disconnected;
                    return Ok(());
                }
            }
        }
    }
}

/// Sleeps until `deadline`, or forever when there is none.  Keeps the
/// flush timer arm of the select inert while no move is coalesced.
async fn sleep_until_opt(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(t) => tokio::time::sleep_until(Instant::from_std(t)).await,
        None => std::future::pending().await,
    }
}

/// Reads frames until the server greeting arrives.
async fn read_greeting<R: AsyncRead + Unpin>(
    rd: &mut R,
    parser: &mut StreamParser,
) -> Result<(String, u16, u16), SessionError> {
    let mut buf = vec![0u8; 1024];
    loop {
        if let Some(msg) = parser.next_message()? {
            return match msg {
                Message::Hello {
                    protocol_name,
                    major,
                    minor,
                } => Ok((protocol_name, major, minor)),
                other => Err(SessionError::Handshake(format!(
                    "expected server greeting, got {}",
                    other.opcode()
                ))),
            };
        }
        let n = rd.read(&mut buf).await.map_err(SessionError::Transport)?;
        if n == 0 {
            return Err(SessionError::Eof);
        }
        parser.feed(&buf[..n]);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rsynergy_core::{KeyCodeTables, ScreenDescriptor};

    use crate::application::dispatcher::DispatchSettings;
    use crate::infrastructure::cursor::NullCursor;
    use crate::infrastructure::device::mock::MockDevice;

    fn test_session(keep_alive: Duration) -> Session {
        Session::new(SessionConfig {
            server: "localhost".into(),
            port: 24800,
            client_name: "testclient".into(),
            connect_timeout: Duration::from_secs(1),
            keep_alive_timeout: keep_alive,
            tls: false,
            mtls: false,
            tls_trust: false,
            pem_path: PathBuf::new(),
        })
    }

    fn test_dispatcher() -> Dispatcher {
        Dispatcher::new(
            Box::new(MockDevice::new()),
            Box::new(NullCursor),
            Arc::new(KeyCodeTables::new()),
            ScreenDescriptor::with_size(1920, 1080),
            DispatchSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_handshake_sends_hello_back_with_client_name() {
        let (client_end, mut server_end) = tokio::io::duplex(4096);
        let mut session = test_session(Duration::from_secs(9));
        let mut dispatcher = test_dispatcher();
        let (_tx, rx) = watch::channel(false);

        let driver = tokio::spawn(async move {
            let _ = session.run_on(client_end, &mut dispatcher, rx).await;
        });

        // Server greeting, then close.
        server_end
            .write_all(b"\x00\x00\x00\x0BSynergy\x00\x01\x00\x06")
            .await
            .unwrap();

        // Expect the HelloBack frame.
        let mut len = [0u8; 4];
        server_end.read_exact(&mut len).await.unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
        server_end.read_exact(&mut body).await.unwrap();
        assert_eq!(&body[..11], b"Synergy\x00\x01\x00\x06");
        assert_eq!(&body[11..15], &10u32.to_be_bytes());
        assert_eq!(&body[15..], b"testclient");

        // CBYE ends the session cleanly.
        server_end.write_all(b"\x00\x00\x00\x04CBYE").await.unwrap();
        driver.await.unwrap();
    }

    #[tokio::test]
    async fn test_old_protocol_major_is_rejected() {
        let (client_end, mut server_end) = tokio::io::duplex(1024);
        let mut session = test_session(Duration::from_secs(9));
        let mut dispatcher = test_dispatcher();
        let (_tx, rx) = watch::channel(false);

        let driver =
            tokio::spawn(
                async move { session.run_on(client_end, &mut dispatcher, rx).await },
            );

        server_end
            .write_all(b"\x00\x00\x00\x0BSynergy\x00\x00\x00\x09")
            .await
            .unwrap();

        let result = driver.await.unwrap();
        assert!(matches!(
            result,
            Err(SessionError::Protocol(ProtocolError::UnsupportedVersion {
                major: 0,
                minor: 9,
            }))
        ));
    }

    #[tokio::test]
    async fn test_keep_alive_is_echoed_and_watchdog_fires_when_traffic_stops() {
        let (client_end, mut server_end) = tokio::io::duplex(1024);
        let mut session = test_session(Duration::from_millis(200));
        let mut dispatcher = test_dispatcher();
        let (_tx, rx) = watch::channel(false);

        let driver =
            tokio::spawn(
                async move { session.run_on(client_end, &mut dispatcher, rx).await },
            );

        server_end
            .write_all(b"\x00\x00\x00\x0BBarrier\x00\x01\x00\x06")
            .await
            .unwrap();

        // Skip the HelloBack.
        let mut len = [0u8; 4];
        server_end.read_exact(&mut len).await.unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
        server_end.read_exact(&mut body).await.unwrap();

        // CALV must be echoed back verbatim.
        server_end.write_all(b"\x00\x00\x00\x04CALV").await.unwrap();
        let mut echo = [0u8; 8];
        server_end.read_exact(&mut echo).await.unwrap();
        assert_eq!(&echo, b"\x00\x00\x00\x04CALV");

        // Then silence: the watchdog must end the session.
        let result = driver.await.unwrap();
        assert!(matches!(result, Err(SessionError::HeartbeatTimeout(_))));
    }

    #[tokio::test]
    async fn test_server_error_opcode_rejects_session() {
        let (client_end, mut server_end) = tokio::io::duplex(1024);
        let mut session = test_session(Duration::from_secs(9));
        let mut dispatcher = test_dispatcher();
        let (_tx, rx) = watch::channel(false);

        let driver =
            tokio::spawn(
                async move { session.run_on(client_end, &mut dispatcher, rx).await },
            );

        server_end
            .write_all(b"\x00\x00\x00\x0BSynergy\x00\x01\x00\x06")
            .await
            .unwrap();
        let mut len = [0u8; 4];
        server_end.read_exact(&mut len).await.unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
        server_end.read_exact(&mut body).await.unwrap();

        server_end.write_all(b"\x00\x00\x00\x04EBSY").await.unwrap();
        let result = driver.await.unwrap();
        assert!(matches!(result, Err(SessionError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_shutdown_signal_drains_cleanly() {
        let (client_end, mut server_end) = tokio::io::duplex(1024);
        let mut session = test_session(Duration::from_secs(9));
        let mut dispatcher = test_dispatcher();
        let (tx, rx) = watch::channel(false);

        let driver =
            tokio::spawn(
                async move { session.run_on(client_end, &mut dispatcher, rx).await },
            );

        server_end
            .write_all(b"\x00\x00\x00\x0BSynergy\x00\x01\x00\x06")
            .await
            .unwrap();
        let mut len = [0u8; 4];
        server_end.read_exact(&mut len).await.unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
        server_end.read_exact(&mut body).await.unwrap();

        tx.send(true).unwrap();
        assert!(driver.await.unwrap().is_ok());
    }
}
