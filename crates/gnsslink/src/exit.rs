use std::fmt;
use std::io;

use gnsslink::frame::FrameError;
use gnsslink::telemetry::TelemetryError;
use gnsslink::transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidAddress(_) | TransportError::PathTooLong { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::InvalidSentence(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn telemetry_error(context: &str, err: TelemetryError) -> CliError {
    match err {
        TelemetryError::Io(source) => io_error(context, source),
        TelemetryError::Timeout => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TelemetryError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
        TelemetryError::ShortRecord { .. } | TelemetryError::UnsupportedVersion(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn pipeline_error(context: &str, err: gnsslink::Error) -> CliError {
    match err {
        gnsslink::Error::Frame(err) => frame_error(context, err),
        gnsslink::Error::Transport(err) => transport_error(context, err),
        gnsslink::Error::Telemetry(err) => telemetry_error(context, err),
        gnsslink::Error::Io(err) => io_error(context, err),
        gnsslink::Error::Json(err) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_exit_codes() {
        let timeout = io_error("read", io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert_eq!(timeout.code, TIMEOUT);
        let denied = io_error("open", io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert_eq!(denied.code, PERMISSION_DENIED);
        assert!(denied.message.starts_with("open: "));
    }

    #[test]
    fn bad_address_is_usage_error() {
        let err = transport_error("bind", TransportError::InvalidAddress("nope".into()));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn short_record_is_invalid_data() {
        let err = telemetry_error("stream", TelemetryError::ShortRecord { len: 3, need: 134 });
        assert_eq!(err.code, DATA_INVALID);
    }
}
