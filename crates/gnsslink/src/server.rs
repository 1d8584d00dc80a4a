//! Consumer sessions.
//!
//! A consumer sends newline-terminated control tokens and gets one reply line each:
//!
//! | Token               | Reply                                             |
//! |---------------------|---------------------------------------------------|
//! | `PING`              | `PONG GNSS`                                       |
//! | `DATA`              | latest snapshot as one JSON line, or `ERR NO DATA` |
//! | `GGA`               | last raw GGA sentence, or `ERR NO DATA`           |
//! | `EXIT`              | `GNSS-BYE`, then the connection closes            |
//! | `GET_BINARY_STREAM` | back-to-back [`TelemetryRecord`]s until disconnect |
//! | anything else       | `ERR UNKNOWN COMMAND`                             |
//!
//! Each session runs on its own thread with its own channel cursor. A consumer that
//! disconnects or stalls only ever ends its own session.

use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use gnsslink_telemetry::{TelemetryError, TelemetryRecord};
use gnsslink_transport::{ConsumerListener, ConsumerStream, ListenAddr, TransportError};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pipeline::PipelineState;

pub const PONG: &str = "PONG GNSS\n";
pub const BYE: &str = "GNSS-BYE\n";
pub const ERR_NO_DATA: &str = "ERR NO DATA\n";
pub const ERR_UNKNOWN_COMMAND: &str = "ERR UNKNOWN COMMAND\n";

const ACCEPT_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How often a waiting session re-checks for shutdown.
    pub poll_interval: Duration,
    /// A consumer that accepts no bytes for this long is disconnected.
    pub write_timeout: Option<Duration>,
    /// Close command-mode sessions idle for this long.
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            write_timeout: Some(Duration::from_secs(5)),
            idle_timeout: None,
        }
    }
}

/// A parsed control token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Ping,
    Data,
    Gga,
    Exit,
    BinaryStream,
    Unknown(String),
}

impl Request {
    /// Parse one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let token = line.trim();
        let request = match token {
            "" => return None,
            "PING" => Request::Ping,
            "DATA" => Request::Data,
            "GGA" => Request::Gga,
            "EXIT" => Request::Exit,
            "GET_BINARY_STREAM" => Request::BinaryStream,
            other => Request::Unknown(other.to_string()),
        };
        Some(request)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The consumer closed the connection.
    Disconnected,
    /// The consumer sent `EXIT`.
    Exit,
    /// The channel closed while streaming.
    StreamClosed,
    /// The consumer stopped reading the stream.
    WriteTimeout,
    IdleTimeout,
    /// The server is shutting down.
    Shutdown,
}

/// Serve one consumer until it leaves, the channel closes, or `running` is cleared.
pub fn handle_session(
    stream: ConsumerStream,
    state: &PipelineState,
    config: &SessionConfig,
    running: &AtomicBool,
) -> Result<SessionEnd> {
    stream.set_read_timeout(Some(config.poll_interval))?;
    stream.set_write_timeout(config.write_timeout)?;

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    let mut line = Vec::new();
    let mut last_activity = Instant::now();

    loop {
        if !running.load(Ordering::SeqCst) {
            return Ok(SessionEnd::Shutdown);
        }

        match reader.read_until(b'\n', &mut line) {
            Ok(0) => return Ok(SessionEnd::Disconnected),
            Ok(_) => {
                last_activity = Instant::now();
                let text = String::from_utf8_lossy(&line).into_owned();
                line.clear();
                let Some(request) = Request::parse(&text) else {
                    continue;
                };
                debug!(?request, "session request");
                if let Some(end) = respond(&request, &mut writer, state, config, running)? {
                    return Ok(end);
                }
            }
            Err(err) if is_timeout(&err) => {
                if let Some(idle) = config.idle_timeout {
                    if last_activity.elapsed() >= idle {
                        return Ok(SessionEnd::IdleTimeout);
                    }
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) if is_disconnect(&err) => return Ok(SessionEnd::Disconnected),
            Err(err) => return Err(err.into()),
        }
    }
}

fn respond(
    request: &Request,
    writer: &mut ConsumerStream,
    state: &PipelineState,
    config: &SessionConfig,
    running: &AtomicBool,
) -> Result<Option<SessionEnd>> {
    let reply = match request {
        Request::Ping => PONG.to_string(),
        Request::Data => match state.latest() {
            Some(snapshot) => {
                let mut json = serde_json::to_string(&snapshot)?;
                json.push('\n');
                json
            }
            None => ERR_NO_DATA.to_string(),
        },
        Request::Gga => state.last_gga().unwrap_or_else(|| ERR_NO_DATA.to_string()),
        Request::Exit => {
            write_reply(writer, BYE)?;
            return Ok(Some(SessionEnd::Exit));
        }
        Request::BinaryStream => {
            return stream_records(writer, state, config, running).map(Some);
        }
        Request::Unknown(token) => {
            debug!(%token, "unknown command");
            ERR_UNKNOWN_COMMAND.to_string()
        }
    };

    match write_reply(writer, &reply) {
        Ok(()) => Ok(None),
        Err(err) if is_disconnect(&err) => Ok(Some(SessionEnd::Disconnected)),
        Err(err) => Err(err.into()),
    }
}

fn write_reply(writer: &mut ConsumerStream, reply: &str) -> io::Result<()> {
    writer.write_all(reply.as_bytes())?;
    writer.flush()
}

/// Send every retained snapshot oldest-first, then each new one as it is published.
fn stream_records(
    writer: &mut ConsumerStream,
    state: &PipelineState,
    config: &SessionConfig,
    running: &AtomicBool,
) -> Result<SessionEnd> {
    let mut subscriber = state.subscribe();
    let peer = writer.peer();
    info!(%peer, "binary stream started");

    let end = loop {
        if !running.load(Ordering::SeqCst) {
            break SessionEnd::Shutdown;
        }
        let snapshot = match subscriber.recv_timeout(config.poll_interval) {
            Ok(snapshot) => snapshot,
            Err(TelemetryError::Timeout) => continue,
            Err(TelemetryError::Closed) => break SessionEnd::StreamClosed,
            Err(err) => return Err(err.into()),
        };

        let record = TelemetryRecord::from(&snapshot).to_bytes();
        match writer.write_all(&record) {
            Ok(()) => {}
            Err(err) if is_disconnect(&err) => break SessionEnd::Disconnected,
            // A partly written record would misalign every record after it.
            Err(err) if is_timeout(&err) => {
                warn!(%peer, "consumer stopped reading, closing stream");
                break SessionEnd::WriteTimeout;
            }
            Err(err) => return Err(err.into()),
        }
    };

    info!(%peer, lagged = subscriber.lagged(), ?end, "binary stream ended");
    Ok(end)
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof
    )
}

/// Accept loop handing each consumer to its own session thread.
#[derive(Debug)]
pub struct Server {
    listener: ConsumerListener,
    state: Arc<PipelineState>,
    config: SessionConfig,
}

impl Server {
    pub fn new(listener: ConsumerListener, state: Arc<PipelineState>, config: SessionConfig) -> Self {
        Self {
            listener,
            state,
            config,
        }
    }

    pub fn bind(addr: &ListenAddr, state: Arc<PipelineState>, config: SessionConfig) -> Result<Self> {
        Ok(Self::new(ConsumerListener::bind(addr)?, state, config))
    }

    pub fn local_addr(&self) -> Result<ListenAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept consumers until `running` is cleared, then wait for their sessions.
    pub fn run(&self, running: Arc<AtomicBool>) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        let mut sessions: Vec<JoinHandle<()>> = Vec::new();
        let mut accepted = 0u64;

        while running.load(Ordering::SeqCst) {
            let stream = match self.listener.accept() {
                Ok(stream) => stream,
                Err(TransportError::Accept(err)) if is_timeout(&err) => {
                    sessions.retain(|handle| !handle.is_finished());
                    thread::sleep(ACCEPT_POLL);
                    continue;
                }
                Err(TransportError::Accept(err)) if err.kind() == ErrorKind::Interrupted => {
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            accepted += 1;
            let peer = stream.peer();
            info!(%peer, session = accepted, "consumer connected");

            let state = Arc::clone(&self.state);
            let running = Arc::clone(&running);
            let config = self.config;
            let spawned = thread::Builder::new()
                .name(format!("session-{accepted}"))
                .spawn(move || match handle_session(stream, &state, &config, &running) {
                    Ok(end) => info!(%peer, ?end, "consumer session ended"),
                    Err(err) => warn!(%peer, error = %err, "consumer session failed"),
                });
            match spawned {
                Ok(handle) => sessions.push(handle),
                Err(err) => warn!(error = %err, "could not start session thread"),
            }
        }

        debug!(open = sessions.len(), "waiting for sessions");
        for handle in sessions {
            let _ = handle.join();
        }
        Ok(())
    }
}
