use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gnsslink::geo::NearPointResult;
use gnsslink::nav::{DecodedMessage, NavigationSnapshot};
use gnsslink::pipeline::PipelineStats;
use gnsslink::telemetry::{flags, TelemetryRecord, AGE_ABSENT};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn age(ms: u16) -> String {
    if ms == AGE_ABSENT {
        "-".to_string()
    } else {
        format!("{ms} ms")
    }
}

#[derive(Serialize)]
struct RecordOutput {
    version: u8,
    epoch: u32,
    received_s: f64,
    lat: f64,
    lon: f64,
    height: f32,
    h_acc: f32,
    speed: f32,
    ground_speed: f32,
    heading: f32,
    motion_heading: f32,
    roll: f32,
    pitch: f32,
    yaw_rate: Option<f32>,
    position_fresh: bool,
    position_valid: bool,
    velocity_age_ms: Option<u16>,
    attitude_age_ms: Option<u16>,
    ins_age_ms: Option<u16>,
    imu_age_ms: Option<u16>,
    cpu_load: Option<u8>,
}

impl From<&TelemetryRecord> for RecordOutput {
    fn from(r: &TelemetryRecord) -> Self {
        let present = |ms: u16| (ms != AGE_ABSENT).then_some(ms);
        Self {
            version: r.version,
            epoch: r.epoch,
            received_s: r.received_s,
            lat: r.lat,
            lon: r.lon,
            height: r.height,
            h_acc: r.h_acc,
            speed: r.speed,
            ground_speed: r.ground_speed,
            heading: r.attitude[2],
            motion_heading: r.motion_heading,
            roll: r.attitude[0],
            pitch: r.attitude[1],
            yaw_rate: r.has(flags::YAW_RATE_VALID).then_some(r.yaw_rate),
            position_fresh: r.has(flags::POSITION_FRESH),
            position_valid: r.has(flags::POSITION_VALID),
            velocity_age_ms: present(r.velocity_age_ms),
            attitude_age_ms: present(r.attitude_age_ms),
            ins_age_ms: present(r.ins_age_ms),
            imu_age_ms: present(r.imu_age_ms),
            cpu_load: r.has(flags::HEALTH_PRESENT).then_some(r.cpu_load),
        }
    }
}

pub fn print_record(record: &TelemetryRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&RecordOutput::from(record)),
        OutputFormat::Table => print_table(
            vec!["EPOCH", "LAT", "LON", "SPEED", "HEADING", "VEL AGE", "ATT AGE"],
            vec![vec![
                record.epoch.to_string(),
                format!("{:.8}", record.lat),
                format!("{:.8}", record.lon),
                format!("{:.2}", record.ground_speed),
                format!("{:.1}", record.attitude[2]),
                age(record.velocity_age_ms),
                age(record.attitude_age_ms),
            ]],
        ),
        OutputFormat::Pretty => println!(
            "epoch={} lat={:.8} lon={:.8} speed={:.2} heading={:.1} fresh={}",
            record.epoch,
            record.lat,
            record.lon,
            record.ground_speed,
            record.attitude[2],
            record.has(flags::POSITION_FRESH)
        ),
        OutputFormat::Raw => print_raw(&record.to_bytes()),
    }
}

pub fn print_snapshot(snapshot: &NavigationSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(snapshot),
        OutputFormat::Table => {
            let p = &snapshot.position.value;
            let v = &snapshot.velocity.value;
            print_table(
                vec!["EPOCH", "LAT", "LON", "H ACC", "SPEED", "HEADING", "YAW RATE"],
                vec![vec![
                    snapshot.epoch.to_string(),
                    format!("{:.8}", p.lat),
                    format!("{:.8}", p.lon),
                    format!("{:.3}", p.h_acc),
                    format!("{:.2}", v.ground_speed),
                    format!("{:.1}", snapshot.heading()),
                    snapshot
                        .yaw_rate()
                        .map_or_else(|| "-".to_string(), |r| format!("{r:.2}")),
                ]],
            );
        }
        OutputFormat::Pretty => println!(
            "epoch={} lat={:.8} lon={:.8} speed={:.2} heading={:.1} attitude={}",
            snapshot.epoch,
            snapshot.position.value.lat,
            snapshot.position.value.lon,
            snapshot.velocity.value.ground_speed,
            snapshot.heading(),
            snapshot.attitude.is_some()
        ),
        OutputFormat::Raw => print_raw(&TelemetryRecord::from(snapshot).to_bytes()),
    }
}

fn message_value(msg: &DecodedMessage) -> Value {
    let data = match msg {
        DecodedMessage::Attitude(m) => serde_json::to_value(m),
        DecodedMessage::Velocity(m) => serde_json::to_value(m),
        DecodedMessage::Position(m) => serde_json::to_value(m),
        DecodedMessage::Pvat(m) => serde_json::to_value(m),
        DecodedMessage::InsStatus(m) => serde_json::to_value(m),
        DecodedMessage::RawImu(m) => serde_json::to_value(m),
        DecodedMessage::FusionStatus(m) => serde_json::to_value(m),
        DecodedMessage::ExternalMeasurement(m) => serde_json::to_value(m),
        DecodedMessage::SystemHealth(m) => serde_json::to_value(m),
        DecodedMessage::CommsStatus(m) => serde_json::to_value(m),
        DecodedMessage::FixData(m) => serde_json::to_value(m),
        DecodedMessage::Acknowledgement(ack) => Ok(json!({
            "acked": ack.acked.to_string(),
            "positive": ack.positive,
        })),
        DecodedMessage::EndOfEpoch { epoch } => Ok(json!({ "epoch": epoch })),
        DecodedMessage::Unknown { key, length } => Ok(json!({
            "key": key.to_string(),
            "length": length,
        })),
    };
    json!({ "kind": msg.kind(), "data": data.unwrap_or(Value::Null) })
}

pub fn print_message(msg: &DecodedMessage, format: OutputFormat) {
    let value = message_value(msg);
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(&value),
        OutputFormat::Table => print_table(
            vec!["KIND", "DATA"],
            vec![vec![msg.kind().to_string(), value["data"].to_string()]],
        ),
        OutputFormat::Pretty => println!("{} {}", msg.kind(), value["data"]),
    }
}

pub fn print_near(result: &NearPointResult, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(result),
        OutputFormat::Table => {
            let (x, y) = result
                .local
                .map_or(("-".to_string(), "-".to_string()), |p| {
                    (format!("{:.3}", p.x), format!("{:.3}", p.y))
                });
            let (lat, lon) = result
                .near
                .map_or(("-".to_string(), "-".to_string()), |p| {
                    (format!("{:.8}", p.lat), format!("{:.8}", p.lon))
                });
            let bearing = result
                .bearing()
                .map_or_else(|| "-".to_string(), |b| format!("{b:.1}"));
            print_table(
                vec!["CASE", "X (E)", "Y (N)", "LAT", "LON", "BEARING", "D PERP"],
                vec![vec![
                    format!("{:?}", result.case),
                    x,
                    y,
                    lat,
                    lon,
                    bearing,
                    format!("{:.3}", result.perpendicular_distance),
                ]],
            );
        }
        OutputFormat::Pretty => match (result.local, result.near) {
            (Some(local), Some(near)) => println!(
                "case={:?} x={:.3} y={:.3} lat={:.8} lon={:.8}",
                result.case, local.x, local.y, near.lat, near.lon
            ),
            _ => println!(
                "case={:?} d_perp={:.3}",
                result.case, result.perpendicular_distance
            ),
        },
    }
}

pub fn print_stats(stats: &PipelineStats, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(stats),
        OutputFormat::Table => print_table(
            vec!["FRAMES", "DECODED", "UNKNOWN", "MALFORMED", "CHECKSUM", "SNAPSHOTS", "INCOMPLETE"],
            vec![vec![
                stats.frames.to_string(),
                stats.decoded.to_string(),
                stats.unknown.to_string(),
                stats.malformed.to_string(),
                stats.checksum_failures.to_string(),
                stats.snapshots.to_string(),
                stats.assembler.incomplete.to_string(),
            ]],
        ),
        OutputFormat::Pretty => println!(
            "frames={} decoded={} unknown={} malformed={} checksum_failures={} snapshots={}",
            stats.frames,
            stats.decoded,
            stats.unknown,
            stats.malformed,
            stats.checksum_failures,
            stats.snapshots
        ),
    }
}
