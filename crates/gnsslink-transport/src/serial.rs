//! Serial-port byte source for the receiver link.

use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use crate::error::{Result, TransportError};

pub const DEFAULT_SERIAL_PATH: &str = "/dev/gnss1";
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// Read timeout that hands control back to the reader loop.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub path: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SERIAL_PATH.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// An open 8N1 serial port.
///
/// Reads return `TimedOut` when the line is idle for `timeout`; callers treat that as
/// "no data yet", not as a failure.
pub struct SerialSource {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialSource {
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(config.path.as_str(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Serial {
                path: config.path.clone(),
                source,
            })?;

        info!(path = %config.path, baud = config.baud_rate, "opened serial port");
        Ok(Self {
            port,
            path: config.path.clone(),
        })
    }

    /// Second handle to the same port, for a writer on another thread.
    pub fn try_clone(&self) -> Result<Self> {
        let port = self
            .port
            .try_clone()
            .map_err(|source| TransportError::Serial {
                path: self.path.clone(),
                source,
            })?;
        Ok(Self {
            port,
            path: self.path.clone(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> Result<u32> {
        self.port
            .baud_rate()
            .map_err(|source| TransportError::Serial {
                path: self.path.clone(),
                source,
            })
    }

    /// Bytes waiting in the driver's input buffer.
    pub fn bytes_to_read(&self) -> Result<u32> {
        self.port
            .bytes_to_read()
            .map_err(|source| TransportError::Serial {
                path: self.path.clone(),
                source,
            })
    }
}

impl Read for SerialSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialSource {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl fmt::Debug for SerialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialSource")
            .field("path", &self.path)
            .finish()
    }
}
