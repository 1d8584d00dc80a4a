use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use gnsslink::geo::{GeoPoint, DEFAULT_TOLERANCE};
use gnsslink::telemetry::DEFAULT_CAPACITY;
use gnsslink::transport::{DEFAULT_BAUD_RATE, DEFAULT_LISTEN, DEFAULT_SERIAL_PATH};

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod decode;
pub mod near;
pub mod serve;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the receiver and serve snapshots to consumers.
    Serve(ServeArgs),
    /// Connect to a server and print its binary record stream.
    Stream(StreamArgs),
    /// Replay a capture file through the decoder and assembler.
    Decode(DecodeArgs),
    /// Compute the look-ahead near point on a route segment.
    Near(NearArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Stream(args) => stream::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Near(args) => near::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Serial device of the receiver.
    #[arg(long, env = "GNSSLINK_SERIAL", default_value = DEFAULT_SERIAL_PATH)]
    pub serial: String,
    /// Serial baud rate.
    #[arg(long, env = "GNSSLINK_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Consumer listen address (host:port, tcp://host:port, unix:///path).
    #[arg(long, env = "GNSSLINK_LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: String,
    /// Snapshots retained for slow consumers.
    #[arg(long, env = "GNSSLINK_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,
    /// Only emit snapshots that also carry a fresh attitude.
    #[arg(long)]
    pub require_attitude: bool,
    /// Finalize an epoch after this much silence (e.g. 500ms).
    #[arg(long, value_name = "DURATION")]
    pub epoch_timeout: Option<String>,
    /// Poll receiver health (MON-SYS) at this interval (e.g. 1s).
    #[arg(long, value_name = "DURATION")]
    pub poll_interval: Option<String>,
    /// Read a capture file instead of the serial port; keep serving after it ends.
    #[arg(long, value_name = "FILE", conflicts_with = "poll_interval")]
    pub replay: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Server address.
    #[arg(default_value = DEFAULT_LISTEN)]
    pub addr: String,
    /// Exit after printing N records.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up when no record arrives for this long (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file of raw receiver output.
    pub file: PathBuf,
    /// Print every decoded message instead of assembled snapshots.
    #[arg(long)]
    pub messages: bool,
    /// Only emit snapshots that also carry a fresh attitude.
    #[arg(long)]
    pub require_attitude: bool,
    /// Print pipeline counters at the end.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct NearArgs {
    /// Segment start as LAT,LON.
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub start: GeoPoint,
    /// Segment end as LAT,LON.
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub end: GeoPoint,
    /// Robot position as LAT,LON.
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub robot: GeoPoint,
    /// Look-ahead radius in metres.
    #[arg(long, allow_hyphen_values = true)]
    pub radius: f64,
    /// Pick the crossing closest to this azimuth (degrees) instead of the one toward the end.
    #[arg(long, allow_hyphen_values = true)]
    pub heading: Option<f64>,
    /// Project on the WGS-84 ellipsoid instead of the flat approximation.
    #[arg(long)]
    pub enu: bool,
    /// Tangency and clipping tolerance in metres.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `LAT,LON` in decimal degrees.
pub fn parse_coordinate(input: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = input
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {input:?}"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude {lat:?}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude {lon:?}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("coordinate out of range: {input}"));
    }
    Ok(GeoPoint::new(lat, lon))
}

/// Parse `500ms`, `2s`, or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Clear `running` on Ctrl-C so long-running commands wind down cleanly.
pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
