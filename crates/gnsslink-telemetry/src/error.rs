/// Errors from the telemetry channel and record codec.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The channel was closed by the publisher.
    #[error("telemetry channel closed")]
    Closed,

    /// No record arrived before the deadline.
    #[error("timed out waiting for telemetry")]
    Timeout,

    /// Fewer bytes than one fixed-size record.
    #[error("short telemetry record ({len} bytes, need {need})")]
    ShortRecord { len: usize, need: usize },

    /// The record's leading version byte is not one this build understands.
    #[error("unsupported telemetry record version {0}")]
    UnsupportedVersion(u8),

    /// An I/O error occurred while streaming records.
    #[error("telemetry I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
