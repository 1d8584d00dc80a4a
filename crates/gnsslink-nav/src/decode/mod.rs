//! Per-message decoders.
//!
//! Every decoder is a pure `fn(&[u8]) -> Result<DecodedMessage>` that validates the
//! payload length before touching a field. Scaling to SI-ish units happens here so
//! nothing downstream handles receiver integer units.

pub mod ack;
pub mod esf;
pub mod mon;
pub mod nav;
pub mod nmea;

use crate::error::{DecodeError, Result};

pub(crate) fn expect_len(message: &'static str, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() != expected {
        return Err(DecodeError::MalformedPayload {
            message,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}
