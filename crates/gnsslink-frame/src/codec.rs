use bytes::{BufMut, BytesMut};

use crate::checksum::{nmea_checksum, ubx_checksum};
use crate::error::{FrameError, Result};
use crate::frame::MessageId;

/// UBX sync characters.
pub const UBX_SYNC: [u8; 2] = [0xB5, 0x62];

/// Sync (2) + class (1) + id (1) + length (2).
pub const UBX_HEADER_SIZE: usize = 6;

/// Header plus the two checksum bytes.
pub const UBX_OVERHEAD: usize = UBX_HEADER_SIZE + 2;

/// NMEA sentence start character.
pub const NMEA_START: u8 = b'$';

/// Default largest UBX payload accepted by the scanner.
///
/// Larger declared lengths on this link are false syncs, not messages.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// Default longest NMEA body (between `$` and `*`) accepted by the scanner.
pub const DEFAULT_MAX_SENTENCE: usize = 120;

/// Encode a UBX frame.
///
/// Wire format:
/// ```text
/// ┌──────────┬───────┬──────┬──────────┬─────────────┬───────────┐
/// │ Sync     │ Class │ Id   │ Length   │ Payload     │ CK_A CK_B │
/// │ B5 62    │ (1B)  │ (1B) │ (2B LE)  │ (Length B)  │ Fletcher  │
/// └──────────┴───────┴──────┴──────────┴─────────────┴───────────┘
/// ```
/// The checksum covers class through the end of the payload.
pub fn encode_ubx(id: MessageId, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u16::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u16::MAX as usize,
        });
    }
    dst.reserve(UBX_OVERHEAD + payload.len());
    let start = dst.len();
    dst.put_slice(&UBX_SYNC);
    dst.put_u8(id.class);
    dst.put_u8(id.id);
    dst.put_u16_le(payload.len() as u16);
    dst.put_slice(payload);
    let checksum = ubx_checksum(&dst[start + 2..]);
    dst.put_slice(&checksum);
    Ok(())
}

/// Encode an NMEA sentence from its body, e.g. `GNGGA,...`.
///
/// Adds the leading `$`, the `*hh` checksum and CR LF.
pub fn encode_nmea(body: &str, dst: &mut BytesMut) -> Result<()> {
    if let Some(bad) = body
        .bytes()
        .find(|&b| !b.is_ascii() || matches!(b, b'$' | b'*' | b'\r' | b'\n'))
    {
        return Err(FrameError::InvalidSentence(format!(
            "byte {bad:#04x} not allowed in sentence body"
        )));
    }
    let checksum = nmea_checksum(body.as_bytes());
    dst.reserve(body.len() + 6);
    dst.put_u8(NMEA_START);
    dst.put_slice(body.as_bytes());
    dst.put_slice(format!("*{checksum:02X}\r\n").as_bytes());
    Ok(())
}
