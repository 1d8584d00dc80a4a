use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::error::Result;

/// A connected consumer stream, TCP or Unix socket.
pub struct ConsumerStream {
    inner: StreamInner,
}

enum StreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl ConsumerStream {
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        // Records are small and latency matters more than packet count.
        let _ = stream.set_nodelay(true);
        Self {
            inner: StreamInner::Tcp(stream),
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: StreamInner::Unix(stream),
        }
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            StreamInner::Tcp(s) => s.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            StreamInner::Unix(s) => s.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            StreamInner::Tcp(s) => s.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            StreamInner::Unix(s) => s.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Second handle on the same connection.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(match &self.inner {
            StreamInner::Tcp(s) => Self {
                inner: StreamInner::Tcp(s.try_clone()?),
            },
            #[cfg(unix)]
            StreamInner::Unix(s) => Self::from_unix(s.try_clone()?),
        })
    }

    /// Close both directions; unblocks a reader on a cloned handle.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            StreamInner::Tcp(s) => s.shutdown(Shutdown::Both).map_err(Into::into),
            #[cfg(unix)]
            StreamInner::Unix(s) => s.shutdown(Shutdown::Both).map_err(Into::into),
        }
    }

    /// Human-readable peer description for logs.
    pub fn peer(&self) -> String {
        match &self.inner {
            StreamInner::Tcp(s) => s
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "tcp:unknown".to_string()),
            #[cfg(unix)]
            StreamInner::Unix(_) => "unix".to_string(),
        }
    }
}

impl Read for ConsumerStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            StreamInner::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            StreamInner::Unix(s) => s.read(buf),
        }
    }
}

impl Write for ConsumerStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            StreamInner::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            StreamInner::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            StreamInner::Tcp(s) => s.flush(),
            #[cfg(unix)]
            StreamInner::Unix(s) => s.flush(),
        }
    }
}

impl std::fmt::Debug for ConsumerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            StreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            StreamInner::Unix(_) => "unix",
        };
        f.debug_struct("ConsumerStream").field("type", &kind).finish()
    }
}
