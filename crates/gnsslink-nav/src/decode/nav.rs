//! NAV class: attitude, velocity, high-precision position, the combined PVAT
//! solution, end of epoch.

use bytes::Buf;

use super::expect_len;
use crate::error::Result;
use crate::message::{Attitude, DecodedMessage, Position, PvatSolution, Velocity};

pub const ATT_LEN: usize = 32;
pub const VELNED_LEN: usize = 36;
pub const HPPOSLLH_LEN: usize = 36;
pub const PVAT_LEN: usize = 116;
pub const EOE_LEN: usize = 4;

const DEG_1E2: f64 = 1e-2;
const DEG_1E5: f64 = 1e-5;
const DEG_1E7: f64 = 1e-7;
const DEG_1E9: f64 = 1e-9;
const CM: f64 = 1e-2;
const MM: f64 = 1e-3;
const TENTH_MM: f64 = 1e-4;

const HPPOSLLH_INVALID_LLH: u8 = 0x01;

const PVAT_GNSS_FIX_OK: u8 = 0x01;
const PVAT_VEH_HEADING_VALID: u8 = 0x20;
const PVAT_CARR_SOLN_SHIFT: u32 = 6;

pub fn decode_attitude(payload: &[u8]) -> Result<DecodedMessage> {
    expect_len("NAV-ATT", payload, ATT_LEN)?;
    let mut p = payload;
    let epoch = p.get_u32_le();
    p.advance(4); // version + reserved
    let roll = p.get_i32_le() as f64 * DEG_1E5;
    let pitch = p.get_i32_le() as f64 * DEG_1E5;
    let heading = p.get_i32_le() as f64 * DEG_1E5;
    let acc_roll = p.get_u32_le() as f64 * DEG_1E5;
    let acc_pitch = p.get_u32_le() as f64 * DEG_1E5;
    let acc_heading = p.get_u32_le() as f64 * DEG_1E5;

    Ok(DecodedMessage::Attitude(Attitude {
        epoch,
        roll,
        pitch,
        heading,
        acc_roll,
        acc_pitch,
        acc_heading,
    }))
}

pub fn decode_velocity(payload: &[u8]) -> Result<DecodedMessage> {
    expect_len("NAV-VELNED", payload, VELNED_LEN)?;
    let mut p = payload;
    let epoch = p.get_u32_le();
    let vel_n = p.get_i32_le() as f64 * CM;
    let vel_e = p.get_i32_le() as f64 * CM;
    let vel_d = p.get_i32_le() as f64 * CM;
    let speed = p.get_u32_le() as f64 * CM;
    let ground_speed = p.get_u32_le() as f64 * CM;
    let heading = p.get_i32_le() as f64 * DEG_1E5;
    let speed_acc = p.get_u32_le() as f64 * CM;
    let heading_acc = p.get_u32_le() as f64 * DEG_1E5;

    Ok(DecodedMessage::Velocity(Velocity {
        epoch,
        vel_n,
        vel_e,
        vel_d,
        speed,
        ground_speed,
        heading,
        speed_acc,
        heading_acc,
    }))
}

pub fn decode_position(payload: &[u8]) -> Result<DecodedMessage> {
    expect_len("NAV-HPPOSLLH", payload, HPPOSLLH_LEN)?;
    let mut p = payload;
    p.advance(3); // version + reserved
    let flags = p.get_u8();
    let epoch = p.get_u32_le();
    let lon = p.get_i32_le();
    let lat = p.get_i32_le();
    let height = p.get_i32_le();
    let height_msl = p.get_i32_le();
    let lon_hp = p.get_i8();
    let lat_hp = p.get_i8();
    let height_hp = p.get_i8();
    let height_msl_hp = p.get_i8();
    let h_acc = p.get_u32_le();
    let v_acc = p.get_u32_le();

    Ok(DecodedMessage::Position(Position {
        epoch,
        lat: lat as f64 * DEG_1E7 + lat_hp as f64 * DEG_1E9,
        lon: lon as f64 * DEG_1E7 + lon_hp as f64 * DEG_1E9,
        height: height as f64 * MM + height_hp as f64 * TENTH_MM,
        height_msl: height_msl as f64 * MM + height_msl_hp as f64 * TENTH_MM,
        h_acc: h_acc as f64 * TENTH_MM,
        v_acc: v_acc as f64 * TENTH_MM,
        valid: flags & HPPOSLLH_INVALID_LLH == 0,
    }))
}

/// NAV-PVAT, split into the same position, velocity and attitude records the
/// single-purpose messages produce.
///
/// PVAT has no heading-of-motion accuracy, so `velocity.heading_acc` carries the
/// vehicle heading accuracy instead. Attitude is only present when the receiver
/// flags vehicle heading as valid.
pub fn decode_pvat(payload: &[u8]) -> Result<DecodedMessage> {
    expect_len("NAV-PVAT", payload, PVAT_LEN)?;
    let mut p = payload;
    let epoch = p.get_u32_le();
    p.advance(20); // version, validity, UTC date and time, time accuracy
    let fix_type = p.get_u8();
    let flags = p.get_u8();
    p.advance(1); // flags2
    let satellites = p.get_u8();

    let lon = p.get_i32_le() as f64 * DEG_1E7;
    let lat = p.get_i32_le() as f64 * DEG_1E7;
    let height = p.get_i32_le() as f64 * MM;
    let height_msl = p.get_i32_le() as f64 * MM;
    let h_acc = p.get_u32_le() as f64 * MM;
    let v_acc = p.get_u32_le() as f64 * MM;

    let vel_n = p.get_i32_le() as f64 * MM;
    let vel_e = p.get_i32_le() as f64 * MM;
    let vel_d = p.get_i32_le() as f64 * MM;
    let ground_speed = p.get_i32_le() as f64 * MM;
    let speed_acc = p.get_u32_le() as f64 * MM;

    let roll = p.get_i32_le() as f64 * DEG_1E5;
    let pitch = p.get_i32_le() as f64 * DEG_1E5;
    let vehicle_heading = p.get_i32_le() as f64 * DEG_1E5;
    let motion_heading = p.get_i32_le() as f64 * DEG_1E5;
    let acc_roll = p.get_u16_le() as f64 * DEG_1E2;
    let acc_pitch = p.get_u16_le() as f64 * DEG_1E2;
    let acc_heading = p.get_u16_le() as f64 * DEG_1E2;
    let mag_dec = p.get_i16_le() as f64 * DEG_1E2;

    let attitude = (flags & PVAT_VEH_HEADING_VALID != 0).then_some(Attitude {
        epoch,
        roll,
        pitch,
        heading: vehicle_heading,
        acc_roll,
        acc_pitch,
        acc_heading,
    });

    Ok(DecodedMessage::Pvat(PvatSolution {
        epoch,
        fix_type,
        satellites,
        carrier_solution: flags >> PVAT_CARR_SOLN_SHIFT,
        mag_dec,
        position: Position {
            epoch,
            lat,
            lon,
            height,
            height_msl,
            h_acc,
            v_acc,
            valid: flags & PVAT_GNSS_FIX_OK != 0,
        },
        velocity: Velocity {
            epoch,
            vel_n,
            vel_e,
            vel_d,
            speed: (vel_n * vel_n + vel_e * vel_e + vel_d * vel_d).sqrt(),
            ground_speed,
            heading: motion_heading,
            speed_acc,
            heading_acc: acc_heading,
        },
        attitude,
    }))
}

pub fn decode_end_of_epoch(payload: &[u8]) -> Result<DecodedMessage> {
    expect_len("NAV-EOE", payload, EOE_LEN)?;
    let mut p = payload;
    Ok(DecodedMessage::EndOfEpoch {
        epoch: p.get_u32_le(),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use bytes::{BufMut, BytesMut};

    pub fn attitude(epoch: u32, roll: i32, pitch: i32, heading: i32) -> Vec<u8> {
        let mut b = BytesMut::new();
        b.put_u32_le(epoch);
        b.put_u8(0);
        b.put_slice(&[0; 3]);
        b.put_i32_le(roll);
        b.put_i32_le(pitch);
        b.put_i32_le(heading);
        b.put_u32_le(50_000);
        b.put_u32_le(60_000);
        b.put_u32_le(70_000);
        b.to_vec()
    }

    pub fn velocity(epoch: u32, vel_n: i32, vel_e: i32, g_speed: u32, heading: i32) -> Vec<u8> {
        let mut b = BytesMut::new();
        b.put_u32_le(epoch);
        b.put_i32_le(vel_n);
        b.put_i32_le(vel_e);
        b.put_i32_le(-3);
        b.put_u32_le(g_speed + 1);
        b.put_u32_le(g_speed);
        b.put_i32_le(heading);
        b.put_u32_le(12);
        b.put_u32_le(250_000);
        b.to_vec()
    }

    pub fn position(epoch: u32, lat: i32, lon: i32, flags: u8) -> Vec<u8> {
        let mut b = BytesMut::new();
        b.put_u8(0);
        b.put_slice(&[0; 2]);
        b.put_u8(flags);
        b.put_u32_le(epoch);
        b.put_i32_le(lon);
        b.put_i32_le(lat);
        b.put_i32_le(245_123);
        b.put_i32_le(200_456);
        b.put_i8(-5);
        b.put_i8(7);
        b.put_i8(3);
        b.put_i8(-2);
        b.put_u32_le(142);
        b.put_u32_le(215);
        b.to_vec()
    }

    pub fn pvat(epoch: u32, lat: i32, g_speed: i32, flags: u8) -> Vec<u8> {
        let mut b = BytesMut::new();
        b.put_u32_le(epoch);
        b.put_u8(1);
        b.put_u8(0x07);
        b.put_u16_le(2025);
        b.put_slice(&[6, 1, 12, 30, 15]);
        b.put_u8(0);
        b.put_slice(&[0; 2]);
        b.put_u32_le(25);
        b.put_i32_le(0);
        b.put_u8(3);
        b.put_u8(flags);
        b.put_u8(0);
        b.put_u8(17);
        b.put_i32_le(143_456_789);
        b.put_i32_le(lat);
        b.put_i32_le(245_123);
        b.put_i32_le(200_456);
        b.put_u32_le(14);
        b.put_u32_le(21);
        b.put_i32_le(1_500);
        b.put_i32_le(-500);
        b.put_i32_le(-30);
        b.put_i32_le(g_speed);
        b.put_u32_le(120);
        b.put_i32_le(150_000);
        b.put_i32_le(-250_000);
        b.put_i32_le(9_000_000);
        b.put_i32_le(4_500_000);
        b.put_u16_le(50);
        b.put_u16_le(60);
        b.put_u16_le(70);
        b.put_i16_le(312);
        b.put_u16_le(100);
        b.put_u16_le(0);
        b.put_u32_le(0);
        b.put_u32_le(0);
        b.put_slice(&[0; 8]);
        b.to_vec()
    }

    pub fn end_of_epoch(epoch: u32) -> Vec<u8> {
        epoch.to_le_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::error::DecodeError;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_decode_attitude() {
        let msg = decode_attitude(&attitude(1_000, 150_000, -250_000, 9_000_000)).unwrap();
        let DecodedMessage::Attitude(att) = msg else {
            panic!("expected attitude");
        };
        assert_eq!(att.epoch, 1_000);
        assert!(close(att.roll, 1.5));
        assert!(close(att.pitch, -2.5));
        assert!(close(att.heading, 90.0));
        assert!(close(att.acc_heading, 0.7));
    }

    #[test]
    fn test_decode_velocity_units() {
        let msg = decode_velocity(&velocity(2_000, 150, -50, 158, 4_500_000)).unwrap();
        let DecodedMessage::Velocity(vel) = msg else {
            panic!("expected velocity");
        };
        assert_eq!(vel.epoch, 2_000);
        assert!(close(vel.vel_n, 1.5));
        assert!(close(vel.vel_e, -0.5));
        assert!(close(vel.vel_d, -0.03));
        assert!(close(vel.ground_speed, 1.58));
        assert!(close(vel.speed, 1.59));
        assert!(close(vel.heading, 45.0));
        assert!(close(vel.speed_acc, 0.12));
        assert!(close(vel.heading_acc, 2.5));
    }

    #[test]
    fn test_velocity_wrong_length_is_malformed() {
        let mut payload = velocity(2_000, 0, 0, 0, 0);
        payload.pop();
        let err = decode_velocity(&payload).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedPayload {
                message: "NAV-VELNED",
                expected: 36,
                actual: 35,
            }
        );
    }

    #[test]
    fn test_decode_high_precision_position() {
        let msg = decode_position(&position(3_000, 501_234_567, 143_456_789, 0)).unwrap();
        let DecodedMessage::Position(pos) = msg else {
            panic!("expected position");
        };
        assert_eq!(pos.epoch, 3_000);
        assert!(close(pos.lat, 50.1234567 + 7e-9));
        assert!(close(pos.lon, 14.3456789 - 5e-9));
        assert!(close(pos.height, 245.123 + 0.0003));
        assert!(close(pos.height_msl, 200.456 - 0.0002));
        assert!(close(pos.h_acc, 0.0142));
        assert!(close(pos.v_acc, 0.0215));
        assert!(pos.valid);
    }

    #[test]
    fn test_position_invalid_flag() {
        let msg = decode_position(&position(3_000, 0, 0, 0x01)).unwrap();
        assert!(matches!(msg, DecodedMessage::Position(p) if !p.valid));
    }

    #[test]
    fn test_decode_pvat_parts() {
        let msg = decode_pvat(&pvat(5_000, 501_234_567, 1_581, 0x21 | 0x80)).unwrap();
        let DecodedMessage::Pvat(pvat) = msg else {
            panic!("expected pvat");
        };
        assert_eq!(pvat.epoch, 5_000);
        assert_eq!(pvat.fix_type, 3);
        assert_eq!(pvat.satellites, 17);
        assert_eq!(pvat.carrier_solution, 2);
        assert!(close(pvat.mag_dec, 3.12));

        let pos = pvat.position;
        assert_eq!(pos.epoch, 5_000);
        assert!(pos.valid);
        assert!(close(pos.lat, 50.1234567));
        assert!(close(pos.lon, 14.3456789));
        assert!(close(pos.height, 245.123));
        assert!(close(pos.h_acc, 0.014));

        let vel = pvat.velocity;
        assert_eq!(vel.epoch, 5_000);
        assert!(close(vel.vel_n, 1.5));
        assert!(close(vel.vel_e, -0.5));
        assert!(close(vel.ground_speed, 1.581));
        assert!(close(vel.speed, (1.5f64 * 1.5 + 0.25 + 0.0009).sqrt()));
        assert!(close(vel.heading, 45.0));
        assert!(close(vel.speed_acc, 0.12));

        let att = pvat.attitude.unwrap();
        assert_eq!(att.epoch, 5_000);
        assert!(close(att.roll, 1.5));
        assert!(close(att.pitch, -2.5));
        assert!(close(att.heading, 90.0));
        assert!(close(att.acc_heading, 0.7));
    }

    #[test]
    fn test_pvat_flags_gate_attitude_and_validity() {
        let msg = decode_pvat(&pvat(5_000, 0, 0, 0)).unwrap();
        let DecodedMessage::Pvat(pvat) = msg else {
            panic!("expected pvat");
        };
        assert!(pvat.attitude.is_none());
        assert!(!pvat.position.valid);
        assert_eq!(pvat.carrier_solution, 0);
    }

    #[test]
    fn test_pvat_wrong_length_is_malformed() {
        let mut payload = pvat(5_000, 0, 0, 0);
        payload.truncate(92);
        assert_eq!(
            decode_pvat(&payload).unwrap_err(),
            DecodeError::MalformedPayload {
                message: "NAV-PVAT",
                expected: 116,
                actual: 92,
            }
        );
    }

    #[test]
    fn test_decode_end_of_epoch() {
        assert_eq!(
            decode_end_of_epoch(&end_of_epoch(123_456)).unwrap(),
            DecodedMessage::EndOfEpoch { epoch: 123_456 }
        );
        assert!(decode_end_of_epoch(&[0, 1]).is_err());
    }
}
