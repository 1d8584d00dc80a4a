use std::io::{ErrorKind, Read};

use crate::error::{FrameError, Result};
use crate::frame::RawFrame;
use crate::scanner::{FrameScanner, ScannerConfig, ScannerStats};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads validated frames from any `Read` source (serial port, capture file, socket).
///
/// Handles partial reads and resynchronization internally; callers always get
/// complete frames.
pub struct FrameReader<T> {
    inner: T,
    scanner: FrameScanner,
    bytes_read: u64,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default scanner limits.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ScannerConfig::default())
    }

    /// Create a new frame reader with explicit scanner limits.
    pub fn with_config(inner: T, config: ScannerConfig) -> Self {
        Self {
            inner,
            scanner: FrameScanner::with_config(config),
            bytes_read: 0,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at end of stream. A source read
    /// timeout surfaces as an I/O error for which [`FrameError::is_timeout`] is true;
    /// buffered bytes are kept and the call can simply be repeated.
    pub fn read_frame(&mut self) -> Result<RawFrame> {
        loop {
            if let Some(frame) = self.scanner.next_frame() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.bytes_read += read as u64;
            self.scanner.push_bytes(&chunk[..read]);
        }
    }

    /// Total bytes pulled from the source.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn stats(&self) -> ScannerStats {
        self.scanner.stats()
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<RawFrame>;

    /// Yields frames until end of stream; errors other than end of stream are
    /// yielded once and iteration continues.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(FrameError::ConnectionClosed) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::class::{MON_SYS, NAV_EOE};
    use crate::codec::{encode_nmea, encode_ubx};
    use crate::frame::FrameKey;

    fn wire() -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_ubx(NAV_EOE, &[1, 0, 0, 0], &mut buf).unwrap();
        encode_nmea("GPGGA,,", &mut buf).unwrap();
        encode_ubx(MON_SYS, &[0u8; 24], &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn read_mixed_frames() {
        let mut reader = FrameReader::new(Cursor::new(wire()));

        assert_eq!(reader.read_frame().unwrap().key, FrameKey::Ubx(NAV_EOE));
        assert!(matches!(reader.read_frame().unwrap().key, FrameKey::Nmea(_)));
        assert_eq!(reader.read_frame().unwrap().key, FrameKey::Ubx(MON_SYS));
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
        assert_eq!(reader.bytes_read(), wire().len() as u64);
    }

    #[test]
    fn iterator_stops_at_end_of_stream() {
        let reader = FrameReader::new(Cursor::new(wire()));
        let frames: Vec<_> = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.key, FrameKey::Ubx(NAV_EOE));
        assert_eq!(reader.stats().binary_frames, 1);
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = wire();
        partial.truncate(5);

        let mut reader = FrameReader::new(Cursor::new(partial));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn timeout_is_reported_and_recoverable() {
        let source = TimeoutThenData {
            timed_out: false,
            bytes: wire(),
            pos: 0,
        };
        let mut reader = FrameReader::new(source);

        let err = reader.read_frame().unwrap_err();
        assert!(err.is_timeout());

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.key, FrameKey::Ubx(NAV_EOE));
    }

    #[test]
    fn interrupted_read_retries() {
        let source = InterruptedThenData {
            interrupted: false,
            bytes: wire(),
            pos: 0,
        };
        let mut reader = FrameReader::new(source);
        assert_eq!(reader.read_frame().unwrap().key, FrameKey::Ubx(NAV_EOE));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[test]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.poll(MON_SYS).unwrap();
        writer.send_sentence("PUBX,00").unwrap();

        let poll = reader.read_frame().unwrap();
        assert_eq!(poll.key, FrameKey::Ubx(MON_SYS));
        assert!(poll.payload.is_empty());

        let text = reader.read_frame().unwrap();
        assert_eq!(text.sentence().unwrap().as_str(), "PUBX");
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct TimeoutThenData {
        timed_out: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for TimeoutThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.timed_out {
                self.timed_out = true;
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
