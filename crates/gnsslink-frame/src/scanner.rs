use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::checksum::{nmea_checksum, parse_hex_pair, ubx_checksum};
use crate::codec::{
    DEFAULT_MAX_PAYLOAD, DEFAULT_MAX_SENTENCE, NMEA_START, UBX_HEADER_SIZE, UBX_OVERHEAD, UBX_SYNC,
};
use crate::frame::{MessageId, RawFrame, SentenceId};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Limits used while recovering frames.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Largest UBX payload length treated as genuine. Default: 1024.
    pub max_payload: usize,
    /// Longest NMEA body treated as genuine. Default: 120.
    pub max_sentence: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            max_sentence: DEFAULT_MAX_SENTENCE,
        }
    }
}

/// Running totals of what the scanner has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScannerStats {
    pub binary_frames: u64,
    pub text_frames: u64,
    pub checksum_failures: u64,
    pub oversize_headers: u64,
    pub malformed_sentences: u64,
    pub discarded_bytes: u64,
}

enum Step {
    Frame(RawFrame),
    NeedMore,
    Skip(usize),
}

/// Incremental frame recovery over an interleaved UBX/NMEA byte stream.
///
/// Bytes are appended with [`feed`](Self::feed); complete frames are pulled out lazily.
/// Incomplete trailing data stays buffered for the next call. Corruption is never
/// reported as an error: the scanner drops the offending start byte (UBX) or sentence
/// (NMEA), bumps a counter in [`ScannerStats`] and keeps scanning.
#[derive(Debug)]
pub struct FrameScanner {
    buf: BytesMut,
    config: ScannerConfig,
    stats: ScannerStats,
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::with_config(ScannerConfig::default())
    }

    pub fn with_config(config: ScannerConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            stats: ScannerStats::default(),
        }
    }

    /// Append bytes and iterate over every frame that is now complete.
    ///
    /// Frames left unread when the iterator is dropped stay buffered and are returned
    /// by the next call to [`next_frame`](Self::next_frame) or `feed`.
    pub fn feed(&mut self, bytes: &[u8]) -> Frames<'_> {
        self.push_bytes(bytes);
        Frames { scanner: self }
    }

    /// Append bytes without pulling any frames.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pull the next complete frame out of the buffered bytes.
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        loop {
            let Some(start) = self
                .buf
                .iter()
                .position(|&b| b == UBX_SYNC[0] || b == NMEA_START)
            else {
                let junk = self.buf.len();
                self.discard(junk);
                return None;
            };
            if start > 0 {
                self.discard(start);
            }

            let step = if self.buf[0] == NMEA_START {
                self.scan_sentence()
            } else {
                self.scan_ubx()
            };

            match step {
                Step::Frame(frame) => return Some(frame),
                Step::NeedMore => return None,
                Step::Skip(n) => self.discard(n),
            }
        }
    }

    /// Bytes currently held waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn stats(&self) -> ScannerStats {
        self.stats
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Drop any partially received frame.
    pub fn clear(&mut self) {
        let pending = self.buf.len();
        self.discard(pending);
    }

    fn discard(&mut self, n: usize) {
        self.buf.advance(n);
        self.stats.discarded_bytes += n as u64;
    }

    fn scan_ubx(&mut self) -> Step {
        let buf = &self.buf;
        if buf.len() < 2 {
            return Step::NeedMore;
        }
        if buf[1] != UBX_SYNC[1] {
            return Step::Skip(1);
        }
        if buf.len() < UBX_HEADER_SIZE {
            return Step::NeedMore;
        }

        let id = MessageId::new(buf[2], buf[3]);
        let len = u16::from_le_bytes([buf[4], buf[5]]) as usize;
        if len > self.config.max_payload {
            self.stats.oversize_headers += 1;
            trace!(%id, len, "ubx header length out of range, resyncing");
            return Step::Skip(1);
        }

        let total = UBX_OVERHEAD + len;
        if buf.len() < total {
            return Step::NeedMore;
        }

        let end = UBX_HEADER_SIZE + len;
        if ubx_checksum(&buf[2..end]) != [buf[end], buf[end + 1]] {
            self.stats.checksum_failures += 1;
            debug!(%id, len, "ubx checksum mismatch, resyncing");
            return Step::Skip(1);
        }

        let mut frame = self.buf.split_to(total);
        frame.advance(UBX_HEADER_SIZE);
        frame.truncate(len);
        self.stats.binary_frames += 1;
        Step::Frame(RawFrame::ubx(id, frame.freeze()))
    }

    fn scan_sentence(&mut self) -> Step {
        let buf = &self.buf;
        let limit = buf.len().min(self.config.max_sentence + 2);

        let mut star = None;
        for (i, &b) in buf.iter().enumerate().take(limit).skip(1) {
            match b {
                b'*' => {
                    star = Some(i);
                    break;
                }
                // A new start marker, a bare line end or non-printable data means the
                // sentence was cut short. Restart at the offending byte.
                NMEA_START | b'\r' | b'\n' => {
                    self.stats.malformed_sentences += 1;
                    return Step::Skip(i);
                }
                b if !(0x20..0x7F).contains(&b) => {
                    self.stats.malformed_sentences += 1;
                    return Step::Skip(i);
                }
                _ => {}
            }
        }

        let Some(star) = star else {
            if buf.len() > self.config.max_sentence + 1 {
                self.stats.malformed_sentences += 1;
                return Step::Skip(1);
            }
            return Step::NeedMore;
        };

        // '*' + 2 hex digits + CR LF
        let total = star + 5;
        if buf.len() < total {
            return Step::NeedMore;
        }

        let Some(expected) = parse_hex_pair(buf[star + 1], buf[star + 2]) else {
            self.stats.malformed_sentences += 1;
            return Step::Skip(1);
        };
        if buf[star + 3..total] != *b"\r\n" {
            self.stats.malformed_sentences += 1;
            return Step::Skip(1);
        }

        let body = &buf[1..star];
        if nmea_checksum(body) != expected {
            self.stats.checksum_failures += 1;
            debug!(len = body.len(), "nmea checksum mismatch, dropping sentence");
            return Step::Skip(total);
        }

        let address_end = body.iter().position(|&b| b == b',').unwrap_or(body.len());
        let address = &body[..address_end];
        let sentence = SentenceId::from_address(address).unwrap_or_else(|| {
            debug!(len = address.len(), "unparseable nmea address, passing sentence through");
            SentenceId::unparsed(address)
        });

        let mut frame = self.buf.split_to(total);
        frame.advance(1);
        frame.truncate(star - 1);
        self.stats.text_frames += 1;
        Step::Frame(RawFrame::nmea(sentence, frame.freeze()))
    }
}

/// Lazy iterator over the frames completed by one [`FrameScanner::feed`] call.
pub struct Frames<'a> {
    scanner: &'a mut FrameScanner,
}

impl Iterator for Frames<'_> {
    type Item = RawFrame;

    fn next(&mut self) -> Option<RawFrame> {
        self.scanner.next_frame()
    }
}
