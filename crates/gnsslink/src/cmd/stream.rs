use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gnsslink::telemetry::TelemetryRecord;
use gnsslink::transport::{ConsumerStream, ListenAddr};
use tracing::{debug, info};

use crate::cmd::{install_ctrlc_handler, parse_duration, StreamArgs};
use crate::exit::{
    io_error, telemetry_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS,
    TIMEOUT,
};
use crate::output::{print_record, OutputFormat};

const POLL_SLICE: Duration = Duration::from_millis(200);

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let addr: ListenAddr = args
        .addr
        .parse()
        .map_err(|err| transport_error("invalid server address", err))?;
    let timeout = parse_duration(&args.timeout)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut stream = addr
        .connect()
        .map_err(|err| transport_error("connect failed", err))?;
    stream
        .set_read_timeout(Some(timeout.min(POLL_SLICE)))
        .map_err(|err| transport_error("connect failed", err))?;
    stream
        .write_all(b"GET_BINARY_STREAM\n")
        .map_err(|err| io_error("request failed", err))?;
    info!(addr = %addr, "streaming records");

    let mut buf = [0u8; TelemetryRecord::SIZE];
    let mut printed = 0usize;
    while args.count.is_none_or(|count| printed < count) {
        if !read_record(&mut stream, &mut buf, timeout, &running)? {
            break;
        }
        let record = TelemetryRecord::decode(&buf)
            .map_err(|err| telemetry_error("invalid record", err))?;
        print_record(&record, format);
        printed += 1;
    }

    debug!(printed, "stream finished");
    Ok(SUCCESS)
}

/// Fill `buf` with one record. Returns `Ok(false)` when the server closes the stream
/// between records or the user interrupts.
fn read_record(
    stream: &mut ConsumerStream,
    buf: &mut [u8],
    timeout: Duration,
    running: &AtomicBool,
) -> CliResult<bool> {
    let mut filled = 0;
    let mut last_data = Instant::now();
    while filled < buf.len() {
        if !running.load(Ordering::SeqCst) {
            return Ok(false);
        }
        match stream.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(CliError::new(
                    DATA_INVALID,
                    format!("stream closed mid-record ({filled} of {} bytes)", buf.len()),
                ))
            }
            Ok(n) => {
                filled += n;
                last_data = Instant::now();
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                if last_data.elapsed() >= timeout {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("no record within {}ms", timeout.as_millis()),
                    ));
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(io_error("read failed", err)),
        }
    }
    Ok(true)
}
