//! GNSS/INS serial stream decoding, snapshot assembly, and telemetry fan-out.
//!
//! Bytes from the receiver's serial port flow through one reader thread:
//! frame recovery, decoding, epoch alignment, then publication on a bounded
//! drop-oldest channel. Downstream consumers connect over TCP or a Unix socket and
//! pull JSON snapshots or a stream of fixed-size binary records.
//!
//! # Crate Structure
//!
//! - [`frame`]: UBX/NMEA frame recovery and encoding
//! - [`nav`]: message decoders, the registry, and the snapshot assembler
//! - [`telemetry`]: the distribution channel and binary record layout
//! - [`transport`]: serial source and consumer listener
//! - [`geo`]: look-ahead circle geometry for path following
//! - [`pipeline`]: the reader loop tying the above together
//! - [`server`]: the consumer session protocol

pub mod error;
pub mod pipeline;
pub mod server;

pub use error::{Error, Result};

/// Re-export frame types.
pub mod frame {
    pub use gnsslink_frame::*;
}

/// Re-export decoding and assembly types.
pub mod nav {
    pub use gnsslink_nav::*;
}

/// Re-export telemetry types.
pub mod telemetry {
    pub use gnsslink_telemetry::*;
}

/// Re-export transport types.
pub mod transport {
    pub use gnsslink_transport::*;
}

/// Re-export geometry types.
pub mod geo {
    pub use gnsslink_geo::*;
}
