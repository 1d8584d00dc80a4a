/// Errors produced while decoding a validated frame into a typed message.
///
/// These are per-frame: the pipeline logs and counts them, then moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The payload length does not match the message layout.
    #[error("malformed {message} payload: expected {expected} bytes, got {actual}")]
    MalformedPayload {
        message: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A text sentence has the wrong number of comma-separated fields.
    #[error("malformed {message} sentence: expected {expected} fields, got {actual}")]
    FieldCount {
        message: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A field could not be parsed.
    #[error("invalid {field} in {message}")]
    InvalidField {
        message: &'static str,
        field: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
