use gnsslink_frame::{FrameKey, MessageId};
use serde::Serialize;

/// Vehicle attitude from NAV-ATT. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Attitude {
    pub epoch: u32,
    pub roll: f64,
    pub pitch: f64,
    pub heading: f64,
    pub acc_roll: f64,
    pub acc_pitch: f64,
    pub acc_heading: f64,
}

/// Velocity from NAV-VELNED. Speeds in m/s, angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Velocity {
    pub epoch: u32,
    pub vel_n: f64,
    pub vel_e: f64,
    pub vel_d: f64,
    /// 3-D speed.
    pub speed: f64,
    pub ground_speed: f64,
    /// Heading of motion, 2-D.
    pub heading: f64,
    pub speed_acc: f64,
    pub heading_acc: f64,
}

/// High-precision geodetic position from NAV-HPPOSLLH.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub epoch: u32,
    /// Degrees.
    pub lat: f64,
    /// Degrees.
    pub lon: f64,
    /// Height above ellipsoid, metres.
    pub height: f64,
    /// Height above mean sea level, metres.
    pub height_msl: f64,
    /// Horizontal accuracy estimate, metres.
    pub h_acc: f64,
    /// Vertical accuracy estimate, metres.
    pub v_acc: f64,
    /// False when the receiver flags the solution as invalid.
    pub valid: bool,
}

/// Combined position, velocity and attitude from NAV-PVAT.
///
/// The embedded parts carry the frame's epoch tag, so the assembler treats one
/// PVAT frame like the three single-purpose messages arriving together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PvatSolution {
    pub epoch: u32,
    /// 0 = no fix, 1 = dead reckoning, 2 = 2-D, 3 = 3-D, 4 = GNSS + DR, 5 = time only.
    pub fix_type: u8,
    pub satellites: u8,
    /// 0 = none, 1 = float, 2 = fixed.
    pub carrier_solution: u8,
    /// Magnetic declination, degrees.
    pub mag_dec: f64,
    pub position: Position,
    pub velocity: Velocity,
    /// `None` unless the receiver flags vehicle heading as valid.
    pub attitude: Option<Attitude>,
}

/// Compensated vehicle dynamics from ESF-INS.
///
/// Axis order is x, y, z in the vehicle frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InsStatus {
    pub epoch: u32,
    pub version: u8,
    /// Degrees per second.
    pub ang_rate: [f64; 3],
    /// Metres per second squared.
    pub accel: [f64; 3],
    pub ang_rate_valid: [bool; 3],
    pub accel_valid: [bool; 3],
}

impl InsStatus {
    /// Yaw rate about the vehicle z axis, degrees per second.
    pub fn z_ang_rate(&self) -> f64 {
        self.ang_rate[2]
    }

    pub fn z_ang_rate_valid(&self) -> bool {
        self.ang_rate_valid[2]
    }
}

/// One ESF-RAW batch folded into the latest value per sensor channel.
///
/// Channels absent from the batch are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RawImu {
    /// Sensor time tag of the last block in the batch.
    pub sensor_time_tag: u32,
    /// Degrees per second.
    pub gyro: [Option<f64>; 3],
    /// Metres per second squared.
    pub accel: [Option<f64>; 3],
    /// Gyro temperature, degrees Celsius.
    pub temp_gyro: Option<f64>,
    pub block_count: usize,
}

/// One sensor entry of ESF-STATUS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorStatus {
    pub sensor_type: u8,
    pub used: bool,
    pub ready: bool,
    /// 0 = not calibrated, 1 = calibrating, 2/3 = calibrated.
    pub calib_status: u8,
    pub time_status: u8,
    /// Hz.
    pub freq: u8,
    pub faults: u8,
}

/// Sensor fusion state from ESF-STATUS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FusionStatus {
    pub epoch: u32,
    pub version: u8,
    pub init_status1: u8,
    pub init_status2: u8,
    /// 0 = initializing, 1 = fusion, 2 = suspended, 3 = disabled.
    pub fusion_mode: u8,
    pub sensors: Vec<SensorStatus>,
}

/// Value of one ESF-MEAS data word.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementValue {
    WheelTicks { ticks: u32, backward: bool },
    /// Metres per second.
    Speed { mps: f64 },
    /// Any other sensor type, low 24 bits as sent.
    Raw { value: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorMeasurement {
    pub data_type: u8,
    pub value: MeasurementValue,
}

/// External sensor input echoed back in ESF-MEAS.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalMeasurement {
    pub time_tag: u32,
    pub provider: u16,
    pub time_mark_sent: u8,
    pub time_mark_edge: bool,
    pub measurements: Vec<SensorMeasurement>,
    pub calib_time_tag: Option<u32>,
}

/// Per-port counters from MON-COMMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortCounters {
    pub port_id: u16,
    pub tx_pending: u16,
    pub tx_bytes: u32,
    /// Percent.
    pub tx_usage: u8,
    pub tx_peak_usage: u8,
    pub rx_pending: u16,
    pub rx_bytes: u32,
    pub rx_usage: u8,
    pub rx_peak_usage: u8,
    pub overrun_errors: u16,
    /// Messages parsed per protocol slot, matching [`CommsStatus::protocol_ids`].
    pub messages: [u16; 4],
    pub skipped: u32,
}

/// Communication port state from MON-COMMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommsStatus {
    pub version: u8,
    pub tx_errors: u8,
    pub protocol_ids: [u8; 4],
    pub ports: Vec<PortCounters>,
}

/// Receiver health from MON-SYS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemHealth {
    pub version: u8,
    pub boot_type: u8,
    /// Percent.
    pub cpu_load: u8,
    pub cpu_load_max: u8,
    pub mem_usage: u8,
    pub mem_usage_max: u8,
    pub io_usage: u8,
    pub io_usage_max: u8,
    /// Seconds since boot.
    pub uptime: u32,
    pub notice_count: u16,
    pub warn_count: u16,
    pub error_count: u16,
    /// Degrees Celsius.
    pub temperature: i8,
}

/// ACK-ACK or ACK-NAK for a configuration message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledgement {
    pub acked: MessageId,
    pub positive: bool,
}

/// NMEA GGA fix data. Empty sentence fields decode to `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixData {
    pub talker: String,
    /// Seconds since UTC midnight.
    pub time_of_day: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// 0 = no fix, 1 = GNSS, 2 = DGNSS, 4 = RTK fixed, 5 = RTK float, 6 = dead reckoning.
    pub quality: u8,
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
    /// Metres above mean sea level.
    pub altitude: Option<f64>,
    pub geoid_separation: Option<f64>,
    /// Seconds.
    pub differential_age: Option<f64>,
    pub station_id: Option<u16>,
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    Attitude(Attitude),
    Velocity(Velocity),
    Position(Position),
    Pvat(PvatSolution),
    InsStatus(InsStatus),
    RawImu(RawImu),
    FusionStatus(FusionStatus),
    ExternalMeasurement(ExternalMeasurement),
    SystemHealth(SystemHealth),
    CommsStatus(CommsStatus),
    Acknowledgement(Acknowledgement),
    EndOfEpoch { epoch: u32 },
    FixData(FixData),
    /// A frame with no registered decoder. Not an error.
    Unknown { key: FrameKey, length: usize },
}

impl DecodedMessage {
    /// Epoch tag in milliseconds of GPS week, for epoch-tagged messages.
    pub fn epoch(&self) -> Option<u32> {
        match self {
            DecodedMessage::Attitude(m) => Some(m.epoch),
            DecodedMessage::Velocity(m) => Some(m.epoch),
            DecodedMessage::Position(m) => Some(m.epoch),
            DecodedMessage::Pvat(m) => Some(m.epoch),
            DecodedMessage::InsStatus(m) => Some(m.epoch),
            DecodedMessage::FusionStatus(m) => Some(m.epoch),
            DecodedMessage::EndOfEpoch { epoch } => Some(*epoch),
            DecodedMessage::RawImu(_)
            | DecodedMessage::ExternalMeasurement(_)
            | DecodedMessage::SystemHealth(_)
            | DecodedMessage::CommsStatus(_)
            | DecodedMessage::Acknowledgement(_)
            | DecodedMessage::FixData(_)
            | DecodedMessage::Unknown { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DecodedMessage::Attitude(_) => "attitude",
            DecodedMessage::Velocity(_) => "velocity",
            DecodedMessage::Position(_) => "position",
            DecodedMessage::Pvat(_) => "pvat",
            DecodedMessage::InsStatus(_) => "ins-status",
            DecodedMessage::RawImu(_) => "raw-imu",
            DecodedMessage::FusionStatus(_) => "fusion-status",
            DecodedMessage::ExternalMeasurement(_) => "external-measurement",
            DecodedMessage::SystemHealth(_) => "system-health",
            DecodedMessage::CommsStatus(_) => "comms-status",
            DecodedMessage::Acknowledgement(_) => "acknowledgement",
            DecodedMessage::EndOfEpoch { .. } => "end-of-epoch",
            DecodedMessage::FixData(_) => "fix-data",
            DecodedMessage::Unknown { .. } => "unknown",
        }
    }
}
