use std::path::PathBuf;

/// Errors from the serial source and the consumer listener.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The serial device could not be opened or configured.
    #[error("failed to open serial port {path}: {source}")]
    Serial {
        path: String,
        source: serialport::Error,
    },

    /// Failed to bind the consumer listener.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to a running server.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on an open stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The listen address could not be parsed.
    #[error("invalid address {0:?} (expected host:port, tcp://host:port or unix:///path)")]
    InvalidAddress(String),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, TransportError>;
