use gnsslink_frame::FrameError;
use gnsslink_telemetry::TelemetryError;
use gnsslink_transport::TransportError;

/// Errors that stop the reader loop or a consumer session.
///
/// Per-frame faults never show up here; the pipeline counts and skips them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
