//! Telemetry distribution for gnsslink.
//!
//! - [`TelemetryChannel`]: bounded fan-out queue; publishing never blocks the reader,
//!   a full queue evicts its oldest value
//! - [`TelemetryRecord`]: the fixed 134-byte binary form of a navigation snapshot
//! - `RecordCodec` (feature `async`): `tokio_util` codec for record streams

pub mod channel;
#[cfg(feature = "async")]
pub mod codec;
pub mod error;
pub mod record;

pub use channel::{Subscriber, TelemetryChannel, DEFAULT_CAPACITY};
#[cfg(feature = "async")]
pub use codec::RecordCodec;
pub use error::{Result, TelemetryError};
pub use record::{flags, TelemetryRecord, AGE_ABSENT, RECORD_VERSION};
