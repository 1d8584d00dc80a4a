//! Frame recovery for u-blox class navigation receivers.
//!
//! A receiver serial port interleaves two wire formats on one byte stream:
//! - UBX binary frames: `0xB5 0x62`, class, id, u16 LE length, payload, Fletcher checksum
//! - NMEA 0183 sentences: `$`, body, `*`, two hex digits of XOR checksum, CR LF
//!
//! [`FrameScanner`] turns arbitrary byte chunks into checksum-validated [`RawFrame`]s,
//! resynchronizing on corruption without ever failing. [`FrameReader`] and
//! [`FrameWriter`] adapt it to blocking `Read`/`Write` sources such as a serial port
//! or a capture file.

pub mod checksum;
pub mod class;
pub mod codec;
pub mod error;
pub mod frame;
pub mod reader;
pub mod scanner;
pub mod writer;

pub use checksum::{nmea_checksum, ubx_checksum, verify_nmea, verify_ubx};
pub use class::{class_name, message_name};
pub use codec::{
    encode_nmea, encode_ubx, DEFAULT_MAX_PAYLOAD, DEFAULT_MAX_SENTENCE, NMEA_START, UBX_HEADER_SIZE,
    UBX_OVERHEAD, UBX_SYNC,
};
pub use error::{FrameError, Result};
pub use frame::{FrameFormat, FrameKey, MessageId, RawFrame, SentenceId};
pub use reader::FrameReader;
pub use scanner::{FrameScanner, Frames, ScannerConfig, ScannerStats};
pub use writer::FrameWriter;
