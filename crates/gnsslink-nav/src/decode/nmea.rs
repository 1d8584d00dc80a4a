//! NMEA sentence decoders.
//!
//! Sentences are decoded against a fixed field schema: the field count is checked
//! first, then each field is parsed by position.

use std::str::FromStr;

use crate::error::{DecodeError, Result};
use crate::message::{DecodedMessage, FixData};

/// Address plus 14 data fields.
pub const GGA_FIELDS: usize = 15;

const GGA: &str = "GGA";

/// Decode a GGA body (`GNGGA,...`, without `$` and checksum).
pub fn decode_gga(body: &[u8]) -> Result<DecodedMessage> {
    let text = std::str::from_utf8(body).map_err(|_| DecodeError::InvalidField {
        message: GGA,
        field: "encoding",
    })?;
    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != GGA_FIELDS {
        return Err(DecodeError::FieldCount {
            message: GGA,
            expected: GGA_FIELDS,
            actual: fields.len(),
        });
    }

    let talker = fields[0]
        .get(..fields[0].len().saturating_sub(3))
        .unwrap_or_default()
        .to_string();

    Ok(DecodedMessage::FixData(FixData {
        talker,
        time_of_day: parse_time(fields[1])?,
        lat: parse_coordinate(fields[2], fields[3], 2, "latitude")?,
        lon: parse_coordinate(fields[4], fields[5], 3, "longitude")?,
        quality: optional::<u8>(fields[6], "quality")?.unwrap_or(0),
        satellites: optional(fields[7], "satellites")?,
        hdop: optional(fields[8], "hdop")?,
        altitude: optional(fields[9], "altitude")?,
        geoid_separation: optional(fields[11], "geoid separation")?,
        differential_age: optional(fields[13], "differential age")?,
        station_id: optional(fields[14], "station id")?,
    }))
}

fn optional<T: FromStr>(field: &str, name: &'static str) -> Result<Option<T>> {
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse()
        .map(Some)
        .map_err(|_| DecodeError::InvalidField {
            message: GGA,
            field: name,
        })
}

/// `hhmmss.ss` to seconds since midnight.
fn parse_time(field: &str) -> Result<Option<f64>> {
    if field.is_empty() {
        return Ok(None);
    }
    let invalid = || DecodeError::InvalidField {
        message: GGA,
        field: "time",
    };
    if field.len() < 6 || !field.is_char_boundary(2) || !field.is_char_boundary(4) {
        return Err(invalid());
    }
    let hours: u32 = field[..2].parse().map_err(|_| invalid())?;
    let minutes: u32 = field[2..4].parse().map_err(|_| invalid())?;
    let seconds: f64 = field[4..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 || !(0.0..61.0).contains(&seconds) {
        return Err(invalid());
    }
    Ok(Some(f64::from(hours * 3600 + minutes * 60) + seconds))
}

/// `dddmm.mmmm` plus hemisphere to signed decimal degrees.
fn parse_coordinate(
    value: &str,
    hemisphere: &str,
    degree_digits: usize,
    name: &'static str,
) -> Result<Option<f64>> {
    if value.is_empty() && hemisphere.is_empty() {
        return Ok(None);
    }
    let invalid = || DecodeError::InvalidField {
        message: GGA,
        field: name,
    };
    if value.len() <= degree_digits || !value.is_char_boundary(degree_digits) {
        return Err(invalid());
    }
    let degrees: f64 = value[..degree_digits].parse().map_err(|_| invalid())?;
    let minutes: f64 = value[degree_digits..].parse().map_err(|_| invalid())?;
    if !(0.0..60.0).contains(&minutes) {
        return Err(invalid());
    }
    let magnitude = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Ok(Some(magnitude)),
        "S" | "W" => Ok(Some(-magnitude)),
        _ => Err(invalid()),
    }
}
