//! I/O endpoints for gnsslink.
//!
//! - [`SerialSource`]: the receiver link, an 8N1 serial port opened by path
//! - [`ConsumerListener`] / [`ConsumerStream`]: where downstream consumers connect,
//!   over TCP or a Unix domain socket
//!
//! Everything here is blocking `std::io`; framing and protocol live in other crates.

pub mod error;
pub mod listener;
pub mod serial;
pub mod stream;

pub use error::{Result, TransportError};
pub use listener::{ConsumerListener, ListenAddr, DEFAULT_LISTEN};
pub use serial::{
    SerialConfig, SerialSource, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT, DEFAULT_SERIAL_PATH,
};
pub use stream::ConsumerStream;
