use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Instant;

use gnsslink::frame::{FrameError, FrameReader};
use gnsslink::nav::AssemblerConfig;
use gnsslink::pipeline::{Pipeline, PipelineState};
use tracing::info;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_message, print_snapshot, print_stats, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.file)
        .map_err(|err| io_error(&format!("cannot open {}", args.file.display()), err))?;
    let mut reader = FrameReader::new(BufReader::new(file));

    let config = AssemblerConfig {
        require_attitude: args.require_attitude,
        ..AssemblerConfig::default()
    };
    let mut pipeline = Pipeline::new(config, Arc::new(PipelineState::default()));

    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        };
        let received = Instant::now();
        if args.messages {
            if let Some(msg) = pipeline.decode(&frame) {
                print_message(&msg, format);
                pipeline.assemble(&msg, received);
            }
        } else if let Some(snapshot) = pipeline.process(&frame, received) {
            print_snapshot(&snapshot, format);
        }
    }

    pipeline.record_scanner(&reader);
    if let Some(snapshot) = pipeline.finish() {
        if !args.messages {
            print_snapshot(&snapshot, format);
        }
    }

    let stats = pipeline.stats();
    info!(
        frames = stats.frames,
        snapshots = stats.snapshots,
        checksum_failures = stats.checksum_failures,
        "capture decoded"
    );
    if args.stats {
        print_stats(&stats, format);
    }
    Ok(SUCCESS)
}
