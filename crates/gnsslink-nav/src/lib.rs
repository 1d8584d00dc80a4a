//! Navigation message decoding and snapshot assembly.
//!
//! Sits on top of `gnsslink-frame`:
//! - [`MessageRegistry`] maps each validated frame to its decoder (closed, static table)
//! - [`decode`] holds one decoder per message type, each pure and length-checked
//! - [`SnapshotAssembler`] joins the per-epoch messages into a [`NavigationSnapshot`]
//!
//! Unrecognized frames decode to [`DecodedMessage::Unknown`]; malformed payloads are a
//! [`DecodeError`] the caller counts and skips. Nothing here can stop the reader.

pub mod assembler;
pub mod decode;
pub mod epoch;
pub mod error;
pub mod message;
pub mod registry;
pub mod snapshot;

pub use assembler::{AssemblerConfig, AssemblerStats, SnapshotAssembler};
pub use epoch::{elapsed_ms, is_newer, WEEK_MS};
pub use error::{DecodeError, Result};
pub use message::{
    Acknowledgement, Attitude, CommsStatus, DecodedMessage, ExternalMeasurement, FixData,
    FusionStatus, InsStatus, MeasurementValue, PortCounters, Position, PvatSolution, RawImu,
    SensorMeasurement, SensorStatus, SystemHealth, Velocity,
};
pub use registry::{MessageRegistry, SentenceEntry, UbxEntry};
pub use snapshot::{NavigationSnapshot, Observed, Stamped};
