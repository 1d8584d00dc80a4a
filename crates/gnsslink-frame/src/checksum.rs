//! Checksums for both wire formats.

use crate::codec::{NMEA_START, UBX_HEADER_SIZE, UBX_OVERHEAD, UBX_SYNC};

/// 8-bit Fletcher checksum over class, id, length and payload.
pub fn ubx_checksum(data: &[u8]) -> [u8; 2] {
    let mut ck_a = 0u8;
    let mut ck_b = 0u8;
    for &byte in data {
        ck_a = ck_a.wrapping_add(byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    [ck_a, ck_b]
}

/// XOR of every byte between `$` and `*`.
pub fn nmea_checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, &byte| acc ^ byte)
}

/// Verify a complete UBX frame, sync bytes through checksum.
pub fn verify_ubx(frame: &[u8]) -> bool {
    if frame.len() < UBX_OVERHEAD || frame[..2] != UBX_SYNC {
        return false;
    }
    let len = u16::from_le_bytes([frame[4], frame[5]]) as usize;
    if frame.len() != UBX_OVERHEAD + len {
        return false;
    }
    let end = UBX_HEADER_SIZE + len;
    ubx_checksum(&frame[2..end]) == [frame[end], frame[end + 1]]
}

/// Verify a complete NMEA sentence, `$` through the checksum digits.
///
/// A trailing CR LF is accepted but not required.
pub fn verify_nmea(sentence: &[u8]) -> bool {
    let sentence = sentence.strip_suffix(b"\r\n").unwrap_or(sentence);
    if sentence.len() < 4 || sentence[0] != NMEA_START {
        return false;
    }
    let star = sentence.len() - 3;
    if sentence[star] != b'*' {
        return false;
    }
    match parse_hex_pair(sentence[star + 1], sentence[star + 2]) {
        Some(expected) => nmea_checksum(&sentence[1..star]) == expected,
        None => false,
    }
}

pub(crate) fn parse_hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}
