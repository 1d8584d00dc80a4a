use std::fs::File;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use gnsslink::frame::class::MON_SYS;
use gnsslink::frame::{FrameReader, FrameWriter};
use gnsslink::nav::AssemblerConfig;
use gnsslink::pipeline::{poll_periodically, Pipeline, PipelineState, PipelineStats};
use gnsslink::server::{Server, SessionConfig};
use gnsslink::transport::{ListenAddr, SerialConfig, SerialSource, DEFAULT_READ_TIMEOUT};
use tracing::{error, info, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, ServeArgs};
use crate::exit::{
    io_error, pipeline_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS,
};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let listen: ListenAddr = args
        .listen
        .parse()
        .map_err(|err| transport_error("invalid listen address", err))?;
    let epoch_timeout = args.epoch_timeout.as_deref().map(parse_duration).transpose()?;
    let poll_interval = args.poll_interval.as_deref().map(parse_duration).transpose()?;

    let config = AssemblerConfig {
        require_attitude: args.require_attitude,
        epoch_timeout,
    };
    let state = Arc::new(PipelineState::new(args.capacity));
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let server = Server::bind(&listen, Arc::clone(&state), SessionConfig::default())
        .map_err(|err| pipeline_error("bind failed", err))?;
    let bound = server
        .local_addr()
        .map_err(|err| pipeline_error("bind failed", err))?;
    info!(addr = %bound, capacity = args.capacity, "serving consumers");

    let (reader, poller) = match &args.replay {
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("cannot open {}", path.display()), err))?;
            info!(path = %path.display(), "replaying capture file");
            (spawn_reader(file, config, &state, &running, false)?, None)
        }
        None => {
            let serial = SerialSource::open(&SerialConfig {
                path: args.serial.clone(),
                baud_rate: args.baud,
                timeout: DEFAULT_READ_TIMEOUT,
            })
            .map_err(|err| transport_error("serial open failed", err))?;
            let poller = match poll_interval {
                Some(interval) => Some(spawn_poller(&serial, interval, &running)?),
                None => None,
            };
            (spawn_reader(serial, config, &state, &running, true)?, poller)
        }
    };

    let served = server.run(Arc::clone(&running));
    running.store(false, Ordering::SeqCst);
    state.close();

    if let Some(poller) = poller {
        match poller.join() {
            Ok(Ok(sent)) => info!(sent, "health poller stopped"),
            Ok(Err(err)) => warn!(error = %err, "health poller failed"),
            Err(_) => warn!("health poller panicked"),
        }
    }
    let stats = reader
        .join()
        .map_err(|_| CliError::new(INTERNAL, "reader thread panicked"))?
        .map_err(|err| pipeline_error("reader failed", err))?;
    served.map_err(|err| pipeline_error("server failed", err))?;

    print_stats(&stats, format);
    Ok(SUCCESS)
}

/// Start the reader thread. With `stop_on_end`, the end of the source also stops the
/// server; a replayed file instead leaves its last snapshots available.
fn spawn_reader<R: Read + Send + 'static>(
    source: R,
    config: AssemblerConfig,
    state: &Arc<PipelineState>,
    running: &Arc<AtomicBool>,
    stop_on_end: bool,
) -> CliResult<JoinHandle<gnsslink::Result<PipelineStats>>> {
    let state = Arc::clone(state);
    let running = Arc::clone(running);
    thread::Builder::new()
        .name("reader".to_string())
        .spawn(move || {
            let mut pipeline = Pipeline::new(config, state);
            let mut reader = FrameReader::new(source);
            let result = pipeline.run(&mut reader, &running);
            if let Err(err) = &result {
                error!(error = %err, "reader stopped");
                running.store(false, Ordering::SeqCst);
            } else if stop_on_end {
                running.store(false, Ordering::SeqCst);
            }
            result
        })
        .map_err(|err| io_error("cannot start reader thread", err))
}

fn spawn_poller(
    serial: &SerialSource,
    interval: Duration,
    running: &Arc<AtomicBool>,
) -> CliResult<JoinHandle<gnsslink::Result<u64>>> {
    let port = serial
        .try_clone()
        .map_err(|err| transport_error("serial clone failed", err))?;
    let running = Arc::clone(running);
    info!(interval_ms = interval.as_millis() as u64, "polling receiver health");
    thread::Builder::new()
        .name("poller".to_string())
        .spawn(move || {
            let mut writer = FrameWriter::new(port);
            poll_periodically(&mut writer, MON_SYS, interval, &running)
        })
        .map_err(|err| io_error("cannot start poller thread", err))
}
