//! Consumer-side listener: TCP or Unix domain socket.

use std::fmt;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::ConsumerStream;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:9006";

/// Where consumers connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    /// `host:port`, resolved at bind/connect time.
    Tcp(String),
    Unix(PathBuf),
}

impl FromStr for ListenAddr {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TransportError::InvalidAddress(s.to_string());
        if let Some(path) = s.strip_prefix("unix://").or_else(|| s.strip_prefix("unix:")) {
            if path.is_empty() {
                return Err(invalid());
            }
            return Ok(ListenAddr::Unix(PathBuf::from(path)));
        }
        let hostport = s.strip_prefix("tcp://").unwrap_or(s);
        match hostport.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(ListenAddr::Tcp(hostport.to_string()))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenAddr::Tcp(addr) => write!(f, "tcp://{addr}"),
            ListenAddr::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

impl ListenAddr {
    /// Open a client connection to a server listening here.
    pub fn connect(&self) -> Result<ConsumerStream> {
        match self {
            ListenAddr::Tcp(addr) => {
                let stream =
                    TcpStream::connect(addr.as_str()).map_err(|source| TransportError::Connect {
                        addr: self.to_string(),
                        source,
                    })?;
                debug!(%addr, "connected over tcp");
                Ok(ConsumerStream::from_tcp(stream))
            }
            #[cfg(unix)]
            ListenAddr::Unix(path) => {
                let stream = std::os::unix::net::UnixStream::connect(path).map_err(|source| {
                    TransportError::Connect {
                        addr: self.to_string(),
                        source,
                    }
                })?;
                debug!(?path, "connected to unix domain socket");
                Ok(ConsumerStream::from_unix(stream))
            }
            #[cfg(not(unix))]
            ListenAddr::Unix(_) => Err(TransportError::InvalidAddress(self.to_string())),
        }
    }
}

/// A bound listener accepting consumer connections.
pub struct ConsumerListener {
    inner: ListenerInner,
}

enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(unix::UnixSocketListener),
}

impl ConsumerListener {
    pub fn bind(addr: &ListenAddr) -> Result<Self> {
        let inner = match addr {
            ListenAddr::Tcp(hostport) => {
                let listener =
                    TcpListener::bind(hostport.as_str()).map_err(|source| TransportError::Bind {
                        addr: addr.to_string(),
                        source,
                    })?;
                info!(addr = %hostport, "listening on tcp");
                ListenerInner::Tcp(listener)
            }
            #[cfg(unix)]
            ListenAddr::Unix(path) => ListenerInner::Unix(unix::UnixSocketListener::bind(path)?),
            #[cfg(not(unix))]
            ListenAddr::Unix(_) => return Err(TransportError::InvalidAddress(addr.to_string())),
        };
        Ok(Self { inner })
    }

    /// Accept one connection. Returns `WouldBlock` as [`TransportError::Accept`] when
    /// non-blocking and nothing is pending.
    pub fn accept(&self) -> Result<ConsumerStream> {
        let stream = match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, peer) = listener.accept().map_err(TransportError::Accept)?;
                // Accepted sockets inherit non-blocking mode on some platforms.
                stream.set_nonblocking(false)?;
                debug!(%peer, "accepted tcp connection");
                ConsumerStream::from_tcp(stream)
            }
            #[cfg(unix)]
            ListenerInner::Unix(listener) => listener.accept()?,
        };
        Ok(stream)
    }

    /// Switch accept between blocking and polling mode.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        match &self.inner {
            ListenerInner::Tcp(listener) => listener.set_nonblocking(nonblocking)?,
            #[cfg(unix)]
            ListenerInner::Unix(listener) => listener.listener.set_nonblocking(nonblocking)?,
        }
        Ok(())
    }

    /// The bound address, with an ephemeral TCP port resolved.
    pub fn local_addr(&self) -> Result<ListenAddr> {
        match &self.inner {
            ListenerInner::Tcp(listener) => Ok(ListenAddr::Tcp(listener.local_addr()?.to_string())),
            #[cfg(unix)]
            ListenerInner::Unix(listener) => Ok(ListenAddr::Unix(listener.path.clone())),
        }
    }

    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            ListenerInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            ListenerInner::Unix(_) => "unix-domain-socket",
        }
    }

    /// Path of a Unix socket listener.
    pub fn path(&self) -> Option<&Path> {
        match &self.inner {
            ListenerInner::Tcp(_) => None,
            #[cfg(unix)]
            ListenerInner::Unix(listener) => Some(&listener.path),
        }
    }
}

impl fmt::Debug for ConsumerListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerListener")
            .field("type", &self.transport_name())
            .finish()
    }
}

#[cfg(unix)]
mod unix {
    use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
    use std::os::unix::net::UnixListener;
    use std::path::{Path, PathBuf};

    use tracing::{debug, info};

    use crate::error::{Result, TransportError};
    use crate::stream::ConsumerStream;

    /// `sockaddr_un.sun_path` is 108 bytes on Linux, 104 elsewhere.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    const SOCKET_MODE: u32 = 0o660;

    pub(super) struct UnixSocketListener {
        pub(super) listener: UnixListener,
        pub(super) path: PathBuf,
        created_inode: (u64, u64),
    }

    impl UnixSocketListener {
        pub(super) fn bind(path: &Path) -> Result<Self> {
            let bind_err = |source| TransportError::Bind {
                addr: path.display().to_string(),
                source,
            };

            let len = path.as_os_str().len();
            if len >= MAX_PATH_LEN {
                return Err(TransportError::PathTooLong {
                    path: path.to_path_buf(),
                    len,
                    max: MAX_PATH_LEN,
                });
            }

            // Replace a stale socket from a previous run, never a regular file.
            if let Ok(metadata) = std::fs::symlink_metadata(path) {
                if !metadata.file_type().is_socket() {
                    return Err(bind_err(std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    )));
                }
                debug!(?path, "removing stale socket");
                std::fs::remove_file(path).map_err(bind_err)?;
            }

            let listener = UnixListener::bind(path).map_err(bind_err)?;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(SOCKET_MODE))
                .map_err(bind_err)?;
            let metadata = std::fs::symlink_metadata(path).map_err(bind_err)?;

            info!(?path, "listening on unix domain socket");
            Ok(Self {
                listener,
                path: path.to_path_buf(),
                created_inode: (metadata.dev(), metadata.ino()),
            })
        }

        pub(super) fn accept(&self) -> Result<ConsumerStream> {
            let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
            stream.set_nonblocking(false)?;
            debug!("accepted unix connection");
            Ok(ConsumerStream::from_unix(stream))
        }
    }

    impl Drop for UnixSocketListener {
        fn drop(&mut self) {
            let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
                return;
            };
            if metadata.file_type().is_socket()
                && (metadata.dev(), metadata.ino()) == self.created_inode
            {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};

    use super::*;

    #[test]
    fn test_parse_addresses() {
        assert_eq!(
            "127.0.0.1:9006".parse::<ListenAddr>().unwrap(),
            ListenAddr::Tcp("127.0.0.1:9006".to_string())
        );
        assert_eq!(
            "tcp://localhost:7000".parse::<ListenAddr>().unwrap(),
            ListenAddr::Tcp("localhost:7000".to_string())
        );
        assert_eq!(
            "unix:///run/gnss.sock".parse::<ListenAddr>().unwrap(),
            ListenAddr::Unix(PathBuf::from("/run/gnss.sock"))
        );
        assert_eq!(
            "[::1]:9006".parse::<ListenAddr>().unwrap(),
            ListenAddr::Tcp("[::1]:9006".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "9006", "localhost", ":9006", "host:port", "unix://"] {
            assert!(bad.parse::<ListenAddr>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        let addr = ListenAddr::Tcp("0.0.0.0:1234".to_string());
        assert_eq!(addr.to_string().parse::<ListenAddr>().unwrap(), addr);
    }

    #[test]
    fn test_tcp_accept_and_exchange() {
        let listener = ConsumerListener::bind(&"127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(listener.path().is_none());

        let handle = std::thread::spawn(move || {
            let mut client = addr.connect().unwrap();
            client.write_all(b"PING\n").unwrap();
        });

        let server = listener.accept().unwrap();
        let mut line = String::new();
        BufReader::new(server).read_line(&mut line).unwrap();
        assert_eq!(line, "PING\n");
        handle.join().unwrap();
    }

    #[test]
    fn test_nonblocking_accept_would_block() {
        let listener = ConsumerListener::bind(&"127.0.0.1:0".parse().unwrap()).unwrap();
        listener.set_nonblocking(true).unwrap();
        match listener.accept() {
            Err(TransportError::Accept(err)) => {
                assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock)
            }
            other => panic!("expected WouldBlock, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_bind_accept_cleanup() {
        let dir = std::env::temp_dir().join(format!("gnsslink-listener-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("consumer.sock");
        let addr = ListenAddr::Unix(path.clone());

        let listener = ConsumerListener::bind(&addr).unwrap();
        assert_eq!(listener.path(), Some(path.as_path()));

        let handle = std::thread::spawn(move || {
            let mut client = addr.connect().unwrap();
            client.write_all(b"DATA\n").unwrap();
        });
        let server = listener.accept().unwrap();
        let mut line = String::new();
        BufReader::new(server).read_line(&mut line).unwrap();
        assert_eq!(line, "DATA\n");
        handle.join().unwrap();

        drop(listener);
        assert!(!path.exists(), "socket file should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_bind_refuses_regular_file() {
        let dir = std::env::temp_dir().join(format!("gnsslink-regular-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("not-a-socket");
        std::fs::write(&path, b"keep me").unwrap();

        let err = ConsumerListener::bind(&ListenAddr::Unix(path.clone())).unwrap_err();
        assert!(matches!(err, TransportError::Bind { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
