//! ESF class: raw inertial samples, compensated vehicle dynamics, fusion status and
//! echoed external measurements.

use bytes::Buf;

use super::expect_len;
use crate::error::{DecodeError, Result};
use crate::message::{
    DecodedMessage, ExternalMeasurement, FusionStatus, InsStatus, MeasurementValue, RawImu,
    SensorMeasurement, SensorStatus,
};

pub const INS_LEN: usize = 36;

/// Reserved prefix before the ESF-RAW data blocks.
pub const RAW_HEADER_LEN: usize = 4;

/// One ESF-RAW block: data word + sensor time tag.
pub const RAW_BLOCK_LEN: usize = 8;

pub const STATUS_HEADER_LEN: usize = 16;
pub const STATUS_SENSOR_LEN: usize = 4;

pub const MEAS_HEADER_LEN: usize = 8;
pub const MEAS_WORD_LEN: usize = 4;

const STATUS_NUM_SENS_OFFSET: usize = 15;

const MEAS_COUNT_SHIFT: u32 = 11;
const MEAS_TIME_MARK_EDGE: u16 = 0x04;
const MEAS_CALIB_TTAG_VALID: u16 = 0x08;

const WHEEL_TICKS_REAR_LEFT: u8 = 8;
const SINGLE_TICK: u8 = 10;
const SPEED: u8 = 11;
const TICK_BACKWARD: u32 = 0x80_0000;

const INS_ANG_RATE_VALID_SHIFT: u32 = 8;
const INS_ACCEL_VALID_SHIFT: u32 = 11;

const GYRO_Z: u8 = 5;
const GYRO_TEMP: u8 = 12;
const GYRO_Y: u8 = 13;
const GYRO_X: u8 = 14;
const ACCEL_X: u8 = 16;
const ACCEL_Y: u8 = 17;
const ACCEL_Z: u8 = 18;

/// deg/s per LSB (2^-12).
const GYRO_SCALE: f64 = 1.0 / 4096.0;
/// m/s^2 per LSB (2^-10).
const ACCEL_SCALE: f64 = 1.0 / 1024.0;
const TEMP_SCALE: f64 = 1e-2;

pub fn decode_ins(payload: &[u8]) -> Result<DecodedMessage> {
    expect_len("ESF-INS", payload, INS_LEN)?;
    let mut p = payload;
    let bitfield = p.get_u32_le();
    p.advance(4); // reserved
    let epoch = p.get_u32_le();

    let mut ang_rate = [0.0; 3];
    for rate in &mut ang_rate {
        *rate = p.get_i32_le() as f64 * 1e-3;
    }
    let mut accel = [0.0; 3];
    for axis in &mut accel {
        *axis = p.get_i32_le() as f64 * 1e-2;
    }

    let bit = |shift: u32, axis: u32| bitfield & (1 << (shift + axis)) != 0;
    Ok(DecodedMessage::InsStatus(InsStatus {
        epoch,
        version: (bitfield & 0xFF) as u8,
        ang_rate,
        accel,
        ang_rate_valid: [0, 1, 2].map(|axis| bit(INS_ANG_RATE_VALID_SHIFT, axis)),
        accel_valid: [0, 1, 2].map(|axis| bit(INS_ACCEL_VALID_SHIFT, axis)),
    }))
}

pub fn decode_raw_imu(payload: &[u8]) -> Result<DecodedMessage> {
    let blocks_len = payload.len().saturating_sub(RAW_HEADER_LEN);
    if payload.len() < RAW_HEADER_LEN || blocks_len % RAW_BLOCK_LEN != 0 {
        return Err(DecodeError::MalformedPayload {
            message: "ESF-RAW",
            expected: RAW_HEADER_LEN + blocks_len / RAW_BLOCK_LEN * RAW_BLOCK_LEN,
            actual: payload.len(),
        });
    }

    let mut p = &payload[RAW_HEADER_LEN..];
    let mut imu = RawImu {
        block_count: blocks_len / RAW_BLOCK_LEN,
        ..RawImu::default()
    };

    while p.has_remaining() {
        let data = p.get_u32_le();
        imu.sensor_time_tag = p.get_u32_le();

        let kind = (data >> 24) as u8;
        // Low 24 bits are a two's complement value.
        let value = ((data << 8) as i32 >> 8) as f64;
        match kind {
            GYRO_X => imu.gyro[0] = Some(value * GYRO_SCALE),
            GYRO_Y => imu.gyro[1] = Some(value * GYRO_SCALE),
            GYRO_Z => imu.gyro[2] = Some(value * GYRO_SCALE),
            ACCEL_X => imu.accel[0] = Some(value * ACCEL_SCALE),
            ACCEL_Y => imu.accel[1] = Some(value * ACCEL_SCALE),
            ACCEL_Z => imu.accel[2] = Some(value * ACCEL_SCALE),
            GYRO_TEMP => imu.temp_gyro = Some(value * TEMP_SCALE),
            _ => {}
        }
    }

    Ok(DecodedMessage::RawImu(imu))
}

pub fn decode_fusion_status(payload: &[u8]) -> Result<DecodedMessage> {
    let sensors = payload.get(STATUS_NUM_SENS_OFFSET).map_or(0, |&n| usize::from(n));
    expect_len(
        "ESF-STATUS",
        payload,
        STATUS_HEADER_LEN + sensors * STATUS_SENSOR_LEN,
    )?;

    let mut p = payload;
    let epoch = p.get_u32_le();
    let version = p.get_u8();
    let init_status1 = p.get_u8();
    let init_status2 = p.get_u8();
    p.advance(5); // reserved
    let fusion_mode = p.get_u8();

    let sensors = payload[STATUS_HEADER_LEN..]
        .chunks_exact(STATUS_SENSOR_LEN)
        .map(|s| SensorStatus {
            sensor_type: s[0] & 0x3F,
            used: s[0] & 0x40 != 0,
            ready: s[0] & 0x80 != 0,
            calib_status: s[1] & 0x03,
            time_status: (s[1] >> 2) & 0x03,
            freq: s[2],
            faults: s[3],
        })
        .collect();

    Ok(DecodedMessage::FusionStatus(FusionStatus {
        epoch,
        version,
        init_status1,
        init_status2,
        fusion_mode,
        sensors,
    }))
}

pub fn decode_measurement(payload: &[u8]) -> Result<DecodedMessage> {
    let flags = payload.get(4..6).map_or(0, |mut f| f.get_u16_le());
    let count = usize::from((flags >> MEAS_COUNT_SHIFT) & 0x1F);
    let calib_valid = flags & MEAS_CALIB_TTAG_VALID != 0;
    let trailer = if calib_valid { MEAS_WORD_LEN } else { 0 };
    expect_len(
        "ESF-MEAS",
        payload,
        MEAS_HEADER_LEN + count * MEAS_WORD_LEN + trailer,
    )?;

    let mut p = payload;
    let time_tag = p.get_u32_le();
    p.advance(2); // flags, read above
    let provider = p.get_u16_le();

    let mut measurements = Vec::with_capacity(count);
    for _ in 0..count {
        measurements.push(sensor_measurement(p.get_u32_le()));
    }
    let calib_time_tag = calib_valid.then(|| p.get_u32_le());

    Ok(DecodedMessage::ExternalMeasurement(ExternalMeasurement {
        time_tag,
        provider,
        time_mark_sent: (flags & 0x03) as u8,
        time_mark_edge: flags & MEAS_TIME_MARK_EDGE != 0,
        measurements,
        calib_time_tag,
    }))
}

fn sensor_measurement(data: u32) -> SensorMeasurement {
    let data_type = ((data >> 24) & 0x3F) as u8;
    let raw = data & 0x00FF_FFFF;
    let value = match data_type {
        WHEEL_TICKS_REAR_LEFT..=SINGLE_TICK => MeasurementValue::WheelTicks {
            ticks: raw & 0x7F_FFFF,
            backward: raw & TICK_BACKWARD != 0,
        },
        // mm/s, signed 24 bit.
        SPEED => MeasurementValue::Speed {
            mps: ((data << 8) as i32 >> 8) as f64 * 1e-3,
        },
        _ => MeasurementValue::Raw { value: raw },
    };
    SensorMeasurement { data_type, value }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use bytes::{BufMut, BytesMut};

    pub fn ins(epoch: u32, z_rate_mdps: i32, z_valid: bool) -> Vec<u8> {
        let mut bitfield = 0x01u32 | (1 << 8) | (1 << 9) | (1 << 11);
        if z_valid {
            bitfield |= 1 << 10;
        }
        let mut b = BytesMut::new();
        b.put_u32_le(bitfield);
        b.put_u32_le(0);
        b.put_u32_le(epoch);
        b.put_i32_le(100);
        b.put_i32_le(-200);
        b.put_i32_le(z_rate_mdps);
        b.put_i32_le(981);
        b.put_i32_le(-10);
        b.put_i32_le(0);
        b.to_vec()
    }

    pub fn raw_block(kind: u8, value: i32, time_tag: u32) -> [u8; 8] {
        let data = ((kind as u32) << 24) | (value as u32 & 0x00FF_FFFF);
        let mut block = [0u8; 8];
        block[..4].copy_from_slice(&data.to_le_bytes());
        block[4..].copy_from_slice(&time_tag.to_le_bytes());
        block
    }

    /// Sensor entries are `(sensStatus1, sensStatus2, freq, faults)`.
    pub fn fusion_status(epoch: u32, fusion_mode: u8, sensors: &[[u8; 4]]) -> Vec<u8> {
        let mut b = BytesMut::new();
        b.put_u32_le(epoch);
        b.put_u8(2);
        b.put_u8(0x25);
        b.put_u8(0x0A);
        b.put_slice(&[0; 5]);
        b.put_u8(fusion_mode);
        b.put_slice(&[0; 2]);
        b.put_u8(sensors.len() as u8);
        for sensor in sensors {
            b.put_slice(sensor);
        }
        b.to_vec()
    }

    pub fn measurement(time_tag: u32, words: &[u32], calib_time_tag: Option<u32>) -> Vec<u8> {
        let mut flags = (words.len() as u16) << 11;
        if calib_time_tag.is_some() {
            flags |= 0x08;
        }
        let mut b = BytesMut::new();
        b.put_u32_le(time_tag);
        b.put_u16_le(flags);
        b.put_u16_le(0x0102);
        for word in words {
            b.put_u32_le(*word);
        }
        if let Some(tag) = calib_time_tag {
            b.put_u32_le(tag);
        }
        b.to_vec()
    }

    pub fn raw(blocks: &[[u8; 8]]) -> Vec<u8> {
        let mut b = BytesMut::new();
        b.put_u32_le(0);
        for block in blocks {
            b.put_slice(block);
        }
        b.to_vec()
    }
}
