//! `tokio_util::codec` adapter for streams of back-to-back records.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TelemetryError;
use crate::record::TelemetryRecord;

/// Splits a byte stream into fixed-size [`TelemetryRecord`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodec;

impl Decoder for RecordCodec {
    type Item = TelemetryRecord;
    type Error = TelemetryError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < TelemetryRecord::SIZE {
            src.reserve(TelemetryRecord::SIZE - src.len());
            return Ok(None);
        }
        let bytes = src.split_to(TelemetryRecord::SIZE);
        TelemetryRecord::decode(&bytes).map(Some)
    }
}

impl Encoder<TelemetryRecord> for RecordCodec {
    type Error = TelemetryError;

    fn encode(&mut self, item: TelemetryRecord, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst);
        Ok(())
    }
}
