//! The reader loop: frames in, snapshots out.
//!
//! One thread owns the byte source and runs scanner, registry, assembler, and channel
//! publication in sequence. Nothing on this path waits for a consumer.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use gnsslink_frame::{
    nmea_checksum, FrameError, FrameKey, FrameReader, FrameWriter, MessageId, RawFrame,
    ScannerStats,
};
use gnsslink_nav::{
    AssemblerConfig, AssemblerStats, DecodedMessage, MessageRegistry, NavigationSnapshot,
    SnapshotAssembler,
};
use gnsslink_telemetry::{Subscriber, TelemetryChannel};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub bytes_read: u64,
    pub frames: u64,
    pub decoded: u64,
    pub unknown: u64,
    pub malformed: u64,
    pub checksum_failures: u64,
    pub discarded_bytes: u64,
    pub snapshots: u64,
    /// Snapshots evicted from the channel before every consumer read them.
    pub dropped: u64,
    pub assembler: AssemblerStats,
}

/// State shared between the reader thread and consumer sessions.
#[derive(Debug)]
pub struct PipelineState {
    channel: TelemetryChannel<NavigationSnapshot>,
    last_gga: Mutex<Option<String>>,
    stats: Mutex<PipelineStats>,
}

impl PipelineState {
    pub fn new(capacity: usize) -> Self {
        Self {
            channel: TelemetryChannel::new(capacity),
            last_gga: Mutex::new(None),
            stats: Mutex::new(PipelineStats::default()),
        }
    }

    pub fn channel(&self) -> &TelemetryChannel<NavigationSnapshot> {
        &self.channel
    }

    pub fn subscribe(&self) -> Subscriber<NavigationSnapshot> {
        self.channel.subscribe()
    }

    /// Most recent snapshot still held by the channel.
    pub fn latest(&self) -> Option<NavigationSnapshot> {
        self.channel.latest()
    }

    /// Last GGA sentence as received, `$` through checksum, CR LF terminated.
    pub fn last_gga(&self) -> Option<String> {
        self.last_gga
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stats(&self) -> PipelineStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop publication and release every waiting consumer.
    pub fn close(&self) {
        self.channel.close();
    }

    fn set_last_gga(&self, sentence: String) {
        *self.last_gga.lock().unwrap_or_else(PoisonError::into_inner) = Some(sentence);
    }

    fn set_stats(&self, stats: PipelineStats) {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = stats;
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new(gnsslink_telemetry::DEFAULT_CAPACITY)
    }
}

/// Decodes frames, assembles snapshots, and publishes them to a [`PipelineState`].
#[derive(Debug)]
pub struct Pipeline {
    registry: MessageRegistry,
    assembler: SnapshotAssembler,
    state: Arc<PipelineState>,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(config: AssemblerConfig, state: Arc<PipelineState>) -> Self {
        Self::with_origin(config, state, Instant::now())
    }

    /// Use `origin` as time zero for snapshot receive times.
    pub fn with_origin(config: AssemblerConfig, state: Arc<PipelineState>, origin: Instant) -> Self {
        Self {
            registry: MessageRegistry::new(),
            assembler: SnapshotAssembler::with_origin(config, origin),
            state,
            stats: PipelineStats::default(),
        }
    }

    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    /// Decode and assemble one frame. Returns the snapshot it completed, if any.
    pub fn process(&mut self, frame: &RawFrame, received: Instant) -> Option<NavigationSnapshot> {
        let msg = self.decode(frame)?;
        self.assemble(&msg, received)
    }

    /// Decode one frame, counting the outcome. Malformed payloads yield `None`.
    pub fn decode(&mut self, frame: &RawFrame) -> Option<DecodedMessage> {
        self.stats.frames += 1;
        match self.registry.decode(frame) {
            Ok(DecodedMessage::Unknown { key, length }) => {
                self.stats.unknown += 1;
                debug!(%key, length, "no decoder for frame");
                Some(DecodedMessage::Unknown { key, length })
            }
            Ok(msg) => {
                self.stats.decoded += 1;
                if let DecodedMessage::FixData(_) = msg {
                    self.state.set_last_gga(raw_sentence(frame));
                }
                Some(msg)
            }
            Err(err) => {
                self.stats.malformed += 1;
                warn!(key = %frame.key, error = %err, "malformed payload skipped");
                None
            }
        }
    }

    /// Feed a decoded message to the assembler and publish what it completes.
    pub fn assemble(
        &mut self,
        msg: &DecodedMessage,
        received: Instant,
    ) -> Option<NavigationSnapshot> {
        let snapshot = self.assembler.push(msg, received);
        self.emit(snapshot)
    }

    /// Close an epoch that has been idle past the configured timeout.
    pub fn tick(&mut self, now: Instant) -> Option<NavigationSnapshot> {
        let snapshot = self.assembler.poll_timeout(now);
        self.emit(snapshot)
    }

    /// Close whatever epoch is still open, at end of input.
    pub fn finish(&mut self) -> Option<NavigationSnapshot> {
        let snapshot = self.assembler.flush();
        let emitted = self.emit(snapshot);
        self.publish_stats();
        emitted
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            assembler: self.assembler.stats(),
            dropped: self.state.channel.dropped_count(),
            ..self.stats
        }
    }

    /// Run until the source ends, `running` is cleared, or the channel is closed.
    ///
    /// Source read timeouts are not errors; they give the loop a chance to observe
    /// shutdown and to time out a stalled epoch.
    pub fn run<R: Read>(
        &mut self,
        reader: &mut FrameReader<R>,
        running: &AtomicBool,
    ) -> Result<PipelineStats> {
        info!("pipeline started");
        while running.load(Ordering::SeqCst) && !self.state.channel.is_closed() {
            match reader.read_frame() {
                Ok(frame) => {
                    self.process(&frame, Instant::now());
                }
                Err(err) if err.is_timeout() => {
                    self.tick(Instant::now());
                }
                Err(FrameError::ConnectionClosed) => {
                    info!("source reached end of stream");
                    break;
                }
                Err(err) => {
                    self.record_scanner(reader);
                    self.finish();
                    return Err(err.into());
                }
            }
            self.record_scanner(reader);
            self.publish_stats();
        }

        self.record_scanner(reader);
        self.finish();
        let stats = self.stats();
        info!(
            frames = stats.frames,
            snapshots = stats.snapshots,
            malformed = stats.malformed,
            dropped = stats.dropped,
            "pipeline stopped"
        );
        Ok(stats)
    }

    fn emit(&mut self, snapshot: Option<NavigationSnapshot>) -> Option<NavigationSnapshot> {
        let snapshot = snapshot?;
        self.stats.snapshots += 1;
        if self.state.channel.publish(snapshot).is_none() {
            debug!(epoch = snapshot.epoch, "channel closed, snapshot not published");
        }
        Some(snapshot)
    }

    /// Copy the reader's byte and resynchronization counters into the stats.
    pub fn record_scanner<R: Read>(&mut self, reader: &FrameReader<R>) {
        let ScannerStats {
            checksum_failures,
            discarded_bytes,
            ..
        } = reader.stats();
        self.stats.bytes_read = reader.bytes_read();
        self.stats.checksum_failures = checksum_failures;
        self.stats.discarded_bytes = discarded_bytes;
    }

    fn publish_stats(&self) {
        self.state.set_stats(self.stats());
    }
}

/// Rebuild the on-wire text of an NMEA frame.
fn raw_sentence(frame: &RawFrame) -> String {
    let body = String::from_utf8_lossy(&frame.payload);
    match frame.key {
        FrameKey::Nmea(_) => format!("${body}*{:02X}\r\n", nmea_checksum(&frame.payload)),
        FrameKey::Ubx(_) => String::new(),
    }
}

/// Send a poll request for `id` every `interval` until `running` is cleared.
///
/// Returns the number of requests written.
pub fn poll_periodically<W: Write>(
    writer: &mut FrameWriter<W>,
    id: MessageId,
    interval: Duration,
    running: &AtomicBool,
) -> Result<u64> {
    let step = interval.min(Duration::from_millis(50));
    let mut sent = 0u64;
    let mut next = Instant::now();

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= next {
            writer.poll(id)?;
            sent += 1;
            debug!(message = %id, "poll request sent");
            next = now + interval;
        }
        thread::sleep(step.min(next.saturating_duration_since(now)).max(Duration::from_millis(1)));
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnsslink_frame::class::{MON_SYS, NAV_EOE, NAV_HPPOSLLH, NAV_VELNED};
    use std::io::Cursor;

    fn position(epoch: u32, lat: i32) -> Vec<u8> {
        let mut p = vec![0u8, 0, 0, 0];
        p.extend_from_slice(&epoch.to_le_bytes());
        p.extend_from_slice(&143_000_000i32.to_le_bytes());
        p.extend_from_slice(&lat.to_le_bytes());
        p.extend_from_slice(&250_000i32.to_le_bytes());
        p.extend_from_slice(&200_000i32.to_le_bytes());
        p.extend_from_slice(&[0, 0, 0, 0]);
        p.extend_from_slice(&150u32.to_le_bytes());
        p.extend_from_slice(&220u32.to_le_bytes());
        p
    }

    fn velocity(epoch: u32, g_speed: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&epoch.to_le_bytes());
        for v in [100i32, 20, -3] {
            p.extend_from_slice(&v.to_le_bytes());
        }
        for v in [g_speed + 1, g_speed] {
            p.extend_from_slice(&v.to_le_bytes());
        }
        p.extend_from_slice(&9_000_000i32.to_le_bytes());
        p.extend_from_slice(&12u32.to_le_bytes());
        p.extend_from_slice(&250_000u32.to_le_bytes());
        p
    }

    fn epoch_bytes(epochs: &[u32]) -> Vec<u8> {
        let mut w = FrameWriter::new(Vec::new());
        for &epoch in epochs {
            w.send_ubx(NAV_HPPOSLLH, &position(epoch, 500_000_000)).unwrap();
            w.send_ubx(NAV_VELNED, &velocity(epoch, 150)).unwrap();
            w.send_ubx(NAV_EOE, &epoch.to_le_bytes()).unwrap();
        }
        w.into_inner()
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(AssemblerConfig::default(), Arc::new(PipelineState::new(8)))
    }

    #[test]
    fn test_run_publishes_one_snapshot_per_epoch() {
        let mut pipeline = pipeline();
        let mut sub = pipeline.state().subscribe();
        let mut reader = FrameReader::new(Cursor::new(epoch_bytes(&[1000, 1200, 1400])));

        let stats = pipeline.run(&mut reader, &AtomicBool::new(true)).unwrap();
        assert_eq!(stats.frames, 9);
        assert_eq!(stats.decoded, 9);
        assert_eq!(stats.snapshots, 3);
        assert_eq!(stats.assembler.emitted, 3);

        let epochs: Vec<u32> = std::iter::from_fn(|| sub.try_next()).map(|s| s.epoch).collect();
        assert_eq!(epochs, vec![1000, 1200, 1400]);
        assert_eq!(pipeline.state().stats(), stats);
    }

    #[test]
    fn test_malformed_payload_is_counted_and_skipped() {
        let mut w = FrameWriter::new(Vec::new());
        w.send_ubx(NAV_VELNED, &[0u8; 35]).unwrap();
        let mut bytes = w.into_inner();
        bytes.extend(epoch_bytes(&[2000]));

        let mut pipeline = pipeline();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let stats = pipeline.run(&mut reader, &AtomicBool::new(true)).unwrap();

        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.snapshots, 1);
        assert_eq!(pipeline.state().latest().map(|s| s.epoch), Some(2000));
    }

    #[test]
    fn test_unknown_frames_pass_through() {
        let mut w = FrameWriter::new(Vec::new());
        w.send_ubx(MessageId::new(0x01, 0x35), &[1, 2, 3]).unwrap();
        w.send_sentence("GPGSV,1,1,00").unwrap();

        let mut pipeline = pipeline();
        let mut reader = FrameReader::new(Cursor::new(w.into_inner()));
        let stats = pipeline.run(&mut reader, &AtomicBool::new(true)).unwrap();

        assert_eq!(stats.unknown, 2);
        assert_eq!(stats.decoded, 0);
        assert_eq!(stats.snapshots, 0);
    }

    #[test]
    fn test_last_gga_sentence_is_kept_verbatim() {
        let body = "GNGGA,092725.00,4717.11399,N,00833.91590,E,1,08,1.01,499.6,M,48.0,M,,";
        let mut w = FrameWriter::new(Vec::new());
        w.send_sentence(body).unwrap();
        let wire = w.into_inner();

        let mut pipeline = pipeline();
        let mut reader = FrameReader::new(Cursor::new(wire.clone()));
        pipeline.run(&mut reader, &AtomicBool::new(true)).unwrap();

        let gga = pipeline.state().last_gga().unwrap();
        assert_eq!(gga.as_bytes(), wire.as_slice());
        assert!(gga.starts_with("$GNGGA,"));
    }

    #[test]
    fn test_open_epoch_flushed_at_end_of_input() {
        let mut w = FrameWriter::new(Vec::new());
        w.send_ubx(NAV_HPPOSLLH, &position(3000, 1)).unwrap();
        w.send_ubx(NAV_VELNED, &velocity(3000, 1)).unwrap();

        let mut pipeline = pipeline();
        let mut reader = FrameReader::new(Cursor::new(w.into_inner()));
        let stats = pipeline.run(&mut reader, &AtomicBool::new(true)).unwrap();
        assert_eq!(stats.snapshots, 1);
        assert_eq!(pipeline.state().latest().map(|s| s.epoch), Some(3000));
    }

    #[test]
    fn test_stopped_before_start_reads_nothing() {
        let mut pipeline = pipeline();
        let mut reader = FrameReader::new(Cursor::new(epoch_bytes(&[1000])));
        let stats = pipeline.run(&mut reader, &AtomicBool::new(false)).unwrap();
        assert_eq!(stats.frames, 0);
        assert_eq!(stats.bytes_read, 0);
    }

    #[test]
    fn test_slow_consumer_never_blocks_the_reader() {
        let state = Arc::new(PipelineState::new(2));
        let mut sub = state.subscribe();
        let mut pipeline = Pipeline::new(AssemblerConfig::default(), Arc::clone(&state));
        let epochs: Vec<u32> = (1..=6).map(|n| n * 100).collect();
        let mut reader = FrameReader::new(Cursor::new(epoch_bytes(&epochs)));

        let stats = pipeline.run(&mut reader, &AtomicBool::new(true)).unwrap();
        assert_eq!(stats.snapshots, 6);
        assert_eq!(stats.dropped, 4);

        let seen: Vec<u32> = std::iter::from_fn(|| sub.try_next()).map(|s| s.epoch).collect();
        assert_eq!(seen, vec![500, 600]);
        assert_eq!(sub.lagged(), 4);
    }

    #[test]
    fn test_poller_stops_when_cleared() {
        let running = Arc::new(AtomicBool::new(true));
        let stopper = Arc::clone(&running);
        let handle = thread::spawn(move || {
            let mut writer = FrameWriter::new(Vec::new());
            let sent =
                poll_periodically(&mut writer, MON_SYS, Duration::from_millis(10), &stopper)
                    .unwrap();
            (sent, writer.into_inner())
        });

        thread::sleep(Duration::from_millis(60));
        running.store(false, Ordering::SeqCst);
        let (sent, bytes) = handle.join().unwrap();

        assert!(sent >= 1);
        // Each empty-payload poll is 8 bytes on the wire.
        assert_eq!(bytes.len() as u64, sent * 8);
        assert_eq!(&bytes[..6], &[0xB5, 0x62, 0x0A, 0x39, 0x00, 0x00]);
    }
}
