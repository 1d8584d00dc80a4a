use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_nmea, encode_ubx};
use crate::error::{FrameError, Result};
use crate::frame::{FrameKey, MessageId, RawFrame};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Writes UBX commands and NMEA sentences to any `Write` sink, usually the
/// receiver's serial port.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    frames_written: u64,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            frames_written: 0,
        }
    }

    /// Encode and send a UBX message.
    pub fn send_ubx(&mut self, id: MessageId, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_ubx(id, payload, &mut self.buf)?;
        self.write_buffered()
    }

    /// Send an empty-payload UBX message, which asks the receiver to output `id` once.
    pub fn poll(&mut self, id: MessageId) -> Result<()> {
        self.send_ubx(id, &[])
    }

    /// Encode and send an NMEA sentence body.
    pub fn send_sentence(&mut self, body: &str) -> Result<()> {
        self.buf.clear();
        encode_nmea(body, &mut self.buf)?;
        self.write_buffered()
    }

    /// Re-encode a previously received frame.
    pub fn write_frame(&mut self, frame: &RawFrame) -> Result<()> {
        match frame.key {
            FrameKey::Ubx(id) => self.send_ubx(id, &frame.payload),
            FrameKey::Nmea(_) => {
                let body = std::str::from_utf8(&frame.payload)
                    .map_err(|err| FrameError::InvalidSentence(err.to_string()))?;
                self.send_sentence(body)
            }
        }
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        self.frames_written += 1;
        self.flush()
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Number of frames fully written.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
