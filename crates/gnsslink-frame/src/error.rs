/// Errors that can occur while encoding frames or moving them over a byte stream.
///
/// Corrupted input is never an error here: the scanner resynchronizes and counts it.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the frame's length field or the configured limit.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A sentence body contains bytes that cannot be carried inside an NMEA sentence.
    #[error("invalid sentence body: {0}")]
    InvalidSentence(String),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source reached end of stream.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the underlying source only timed out and can be read again.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err) if matches!(
                err.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
