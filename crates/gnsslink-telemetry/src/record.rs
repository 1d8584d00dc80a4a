use bytes::{Buf, BufMut, Bytes, BytesMut};
use gnsslink_nav::NavigationSnapshot;

use crate::error::{Result, TelemetryError};

/// Current record layout version.
pub const RECORD_VERSION: u8 = 1;

/// Bits of [`TelemetryRecord::flags`].
pub mod flags {
    pub const POSITION_FRESH: u8 = 1 << 0;
    pub const VELOCITY_FRESH: u8 = 1 << 1;
    pub const ATTITUDE_FRESH: u8 = 1 << 2;
    pub const INS_FRESH: u8 = 1 << 3;
    pub const IMU_PRESENT: u8 = 1 << 4;
    pub const HEALTH_PRESENT: u8 = 1 << 5;
    pub const POSITION_VALID: u8 = 1 << 6;
    pub const YAW_RATE_VALID: u8 = 1 << 7;
}

/// Age value for a part the snapshot does not carry.
pub const AGE_ABSENT: u16 = u16::MAX;

/// Fixed-size binary form of a [`NavigationSnapshot`].
///
/// Little-endian, version byte first, no length prefix. Parts the snapshot lacks are
/// zero with their flag bit clear; their ages read [`AGE_ABSENT`].
///
/// ```text
/// ┌─────┬───────┬──────┬───────┬──────────┬─────────┬───────────────────────┐
/// │ ver │ flags │ rsvd │ epoch │ received │ lat lon │ f32 kinematics ... u8 │
/// │ 1B  │ 1B    │ 2B   │ 4B    │ 8B f64   │ 2 × f64 │                       │
/// └─────┴───────┴──────┴───────┴──────────┴─────────┴───────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryRecord {
    pub version: u8,
    pub flags: u8,
    pub epoch: u32,
    /// Seconds since pipeline start.
    pub received_s: f64,
    pub lat: f64,
    pub lon: f64,
    pub height: f32,
    pub h_acc: f32,
    pub v_acc: f32,
    pub speed: f32,
    pub ground_speed: f32,
    pub motion_heading: f32,
    pub speed_acc: f32,
    pub heading_acc: f32,
    /// Roll, pitch, heading in degrees.
    pub attitude: [f32; 3],
    pub attitude_acc: [f32; 3],
    pub gyro: [f32; 3],
    pub accel: [f32; 3],
    pub gyro_temp: f32,
    pub imu_time_tag: u32,
    pub yaw_rate: f32,
    pub velocity_age_ms: u16,
    pub attitude_age_ms: u16,
    pub ins_age_ms: u16,
    pub imu_age_ms: u16,
    pub health_errors: u8,
    pub cpu_load: u8,
}

fn age(ms: Option<u32>) -> u16 {
    ms.map_or(AGE_ABSENT, |ms| u16::try_from(ms).unwrap_or(AGE_ABSENT - 1))
}

impl TelemetryRecord {
    /// Encoded size in bytes.
    pub const SIZE: usize = 134;

    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(Self::SIZE);
        dst.put_u8(self.version);
        dst.put_u8(self.flags);
        dst.put_u16_le(0);
        dst.put_u32_le(self.epoch);
        dst.put_f64_le(self.received_s);
        dst.put_f64_le(self.lat);
        dst.put_f64_le(self.lon);
        for v in [
            self.height,
            self.h_acc,
            self.v_acc,
            self.speed,
            self.ground_speed,
            self.motion_heading,
            self.speed_acc,
            self.heading_acc,
        ] {
            dst.put_f32_le(v);
        }
        for v in self
            .attitude
            .iter()
            .chain(&self.attitude_acc)
            .chain(&self.gyro)
            .chain(&self.accel)
        {
            dst.put_f32_le(*v);
        }
        dst.put_f32_le(self.gyro_temp);
        dst.put_u32_le(self.imu_time_tag);
        dst.put_f32_le(self.yaw_rate);
        dst.put_u16_le(self.velocity_age_ms);
        dst.put_u16_le(self.attitude_age_ms);
        dst.put_u16_le(self.ins_age_ms);
        dst.put_u16_le(self.imu_age_ms);
        dst.put_u8(self.health_errors);
        dst.put_u8(self.cpu_load);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Decode one record from the front of `src`. Trailing bytes are ignored.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < Self::SIZE {
            return Err(TelemetryError::ShortRecord {
                len: src.len(),
                need: Self::SIZE,
            });
        }
        let mut p = &src[..Self::SIZE];
        let version = p.get_u8();
        if version != RECORD_VERSION {
            return Err(TelemetryError::UnsupportedVersion(version));
        }
        let flags = p.get_u8();
        p.advance(2);

        let triple = |p: &mut &[u8]| [p.get_f32_le(), p.get_f32_le(), p.get_f32_le()];
        Ok(Self {
            version,
            flags,
            epoch: p.get_u32_le(),
            received_s: p.get_f64_le(),
            lat: p.get_f64_le(),
            lon: p.get_f64_le(),
            height: p.get_f32_le(),
            h_acc: p.get_f32_le(),
            v_acc: p.get_f32_le(),
            speed: p.get_f32_le(),
            ground_speed: p.get_f32_le(),
            motion_heading: p.get_f32_le(),
            speed_acc: p.get_f32_le(),
            heading_acc: p.get_f32_le(),
            attitude: triple(&mut p),
            attitude_acc: triple(&mut p),
            gyro: triple(&mut p),
            accel: triple(&mut p),
            gyro_temp: p.get_f32_le(),
            imu_time_tag: p.get_u32_le(),
            yaw_rate: p.get_f32_le(),
            velocity_age_ms: p.get_u16_le(),
            attitude_age_ms: p.get_u16_le(),
            ins_age_ms: p.get_u16_le(),
            imu_age_ms: p.get_u16_le(),
            health_errors: p.get_u8(),
            cpu_load: p.get_u8(),
        })
    }
}

impl From<&NavigationSnapshot> for TelemetryRecord {
    fn from(snap: &NavigationSnapshot) -> Self {
        let pos = &snap.position.value;
        let vel = &snap.velocity.value;

        let mut bits = 0;
        let mut set = |flag: u8, on: bool| {
            if on {
                bits |= flag;
            }
        };
        set(flags::POSITION_FRESH, snap.position.fresh);
        set(flags::VELOCITY_FRESH, snap.velocity.fresh);
        set(flags::ATTITUDE_FRESH, snap.attitude.is_some_and(|a| a.fresh));
        set(flags::INS_FRESH, snap.ins.is_some_and(|i| i.fresh));
        set(flags::IMU_PRESENT, snap.imu.is_some());
        set(flags::HEALTH_PRESENT, snap.health.is_some());
        set(flags::POSITION_VALID, pos.valid);
        set(flags::YAW_RATE_VALID, snap.yaw_rate().is_some());

        let mut record = TelemetryRecord {
            version: RECORD_VERSION,
            flags: bits,
            epoch: snap.epoch,
            received_s: snap.received_s,
            lat: pos.lat,
            lon: pos.lon,
            height: pos.height as f32,
            h_acc: pos.h_acc as f32,
            v_acc: pos.v_acc as f32,
            speed: vel.speed as f32,
            ground_speed: vel.ground_speed as f32,
            motion_heading: vel.heading as f32,
            speed_acc: vel.speed_acc as f32,
            heading_acc: vel.heading_acc as f32,
            velocity_age_ms: age(Some(snap.velocity_age_ms())),
            attitude_age_ms: age(snap.attitude_age_ms()),
            ins_age_ms: age(snap.ins_age_ms()),
            imu_age_ms: age(snap.imu.map(|imu| imu.age_ms)),
            yaw_rate: snap.yaw_rate().unwrap_or(0.0) as f32,
            ..TelemetryRecord::default()
        };

        if let Some(att) = snap.attitude {
            let a = att.value;
            record.attitude = [a.roll as f32, a.pitch as f32, a.heading as f32];
            record.attitude_acc = [a.acc_roll as f32, a.acc_pitch as f32, a.acc_heading as f32];
        }
        if let Some(imu) = snap.imu {
            let imu = imu.value;
            record.gyro = imu.gyro.map(|v| v.unwrap_or(0.0) as f32);
            record.accel = imu.accel.map(|v| v.unwrap_or(0.0) as f32);
            record.gyro_temp = imu.temp_gyro.unwrap_or(0.0) as f32;
            record.imu_time_tag = imu.sensor_time_tag;
        }
        if let Some(health) = snap.health {
            record.health_errors = u8::try_from(health.value.error_count).unwrap_or(u8::MAX);
            record.cpu_load = health.value.cpu_load;
        }
        record
    }
}
