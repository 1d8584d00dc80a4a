//! Static mapping from frame identity to decoder.
//!
//! The set of supported messages is closed and known at compile time, so the tables
//! are plain `const` slices of function pointers. No registration, no shared state.

use bytes::Buf;
use gnsslink_frame::class::{
    ACK_ACK, ACK_NAK, ESF_INS, ESF_MEAS, ESF_RAW, ESF_STATUS, MON_COMMS, MON_SYS, NAV_ATT,
    NAV_EOE, NAV_HPPOSLLH, NAV_PVAT, NAV_VELNED,
};
use gnsslink_frame::{FrameKey, MessageId, RawFrame, SentenceId};

use crate::decode::{ack, esf, mon, nav, nmea};
use crate::error::Result;
use crate::message::DecodedMessage;

/// Decoder signature shared by every message type.
pub type DecodeFn = fn(&[u8]) -> Result<DecodedMessage>;

/// A registered UBX message.
#[derive(Debug, Clone, Copy)]
pub struct UbxEntry {
    pub id: MessageId,
    pub name: &'static str,
    pub decode: DecodeFn,
    /// Byte offset of the u32 epoch tag, for epoch-tagged messages.
    pub epoch_offset: Option<usize>,
}

/// A registered NMEA sentence, matched on its talker-independent formatter.
#[derive(Debug, Clone, Copy)]
pub struct SentenceEntry {
    pub formatter: &'static str,
    pub decode: DecodeFn,
}

const UBX_ENTRIES: &[UbxEntry] = &[
    UbxEntry {
        id: NAV_ATT,
        name: "NAV-ATT",
        decode: nav::decode_attitude,
        epoch_offset: Some(0),
    },
    UbxEntry {
        id: NAV_VELNED,
        name: "NAV-VELNED",
        decode: nav::decode_velocity,
        epoch_offset: Some(0),
    },
    UbxEntry {
        id: NAV_HPPOSLLH,
        name: "NAV-HPPOSLLH",
        decode: nav::decode_position,
        epoch_offset: Some(4),
    },
    UbxEntry {
        id: NAV_PVAT,
        name: "NAV-PVAT",
        decode: nav::decode_pvat,
        epoch_offset: Some(0),
    },
    UbxEntry {
        id: NAV_EOE,
        name: "NAV-EOE",
        decode: nav::decode_end_of_epoch,
        epoch_offset: Some(0),
    },
    UbxEntry {
        id: ESF_INS,
        name: "ESF-INS",
        decode: esf::decode_ins,
        epoch_offset: Some(8),
    },
    UbxEntry {
        id: ESF_RAW,
        name: "ESF-RAW",
        decode: esf::decode_raw_imu,
        epoch_offset: None,
    },
    UbxEntry {
        id: ESF_STATUS,
        name: "ESF-STATUS",
        decode: esf::decode_fusion_status,
        epoch_offset: Some(0),
    },
    UbxEntry {
        id: ESF_MEAS,
        name: "ESF-MEAS",
        decode: esf::decode_measurement,
        epoch_offset: None,
    },
    UbxEntry {
        id: MON_SYS,
        name: "MON-SYS",
        decode: mon::decode_system_health,
        epoch_offset: None,
    },
    UbxEntry {
        id: MON_COMMS,
        name: "MON-COMMS",
        decode: mon::decode_comms,
        epoch_offset: None,
    },
    UbxEntry {
        id: ACK_ACK,
        name: "ACK-ACK",
        decode: ack::decode_ack,
        epoch_offset: None,
    },
    UbxEntry {
        id: ACK_NAK,
        name: "ACK-NAK",
        decode: ack::decode_nak,
        epoch_offset: None,
    },
];

const SENTENCE_ENTRIES: &[SentenceEntry] = &[SentenceEntry {
    formatter: "GGA",
    decode: nmea::decode_gga,
}];

/// Lookup and dispatch over the supported message set.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageRegistry;

impl MessageRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Decode a validated frame.
    ///
    /// Frames without a registered decoder yield [`DecodedMessage::Unknown`]; only a
    /// registered message with a bad payload is an error.
    pub fn decode(&self, frame: &RawFrame) -> Result<DecodedMessage> {
        let decoder = match frame.key {
            FrameKey::Ubx(id) => self.lookup_ubx(id).map(|entry| entry.decode),
            FrameKey::Nmea(sentence) => self.lookup_sentence(sentence).map(|entry| entry.decode),
        };
        match decoder {
            Some(decode) => decode(&frame.payload),
            None => Ok(DecodedMessage::Unknown {
                key: frame.key,
                length: frame.payload.len(),
            }),
        }
    }

    pub fn lookup_ubx(&self, id: MessageId) -> Option<&'static UbxEntry> {
        UBX_ENTRIES.iter().find(|entry| entry.id == id)
    }

    pub fn lookup_sentence(&self, sentence: SentenceId) -> Option<&'static SentenceEntry> {
        SENTENCE_ENTRIES
            .iter()
            .find(|entry| entry.formatter == sentence.formatter())
    }

    pub fn is_known(&self, key: FrameKey) -> bool {
        match key {
            FrameKey::Ubx(id) => self.lookup_ubx(id).is_some(),
            FrameKey::Nmea(sentence) => self.lookup_sentence(sentence).is_some(),
        }
    }

    /// Read the epoch tag of a UBX payload without decoding the rest.
    ///
    /// Works on payloads too short for a full decode as long as the tag itself is
    /// present.
    pub fn epoch_of(&self, id: MessageId, payload: &[u8]) -> Option<u32> {
        let offset = self.lookup_ubx(id)?.epoch_offset?;
        let mut tag = payload.get(offset..offset + 4)?;
        Some(tag.get_u32_le())
    }

    pub fn ubx_entries(&self) -> &'static [UbxEntry] {
        UBX_ENTRIES
    }

    pub fn sentence_entries(&self) -> &'static [SentenceEntry] {
        SENTENCE_ENTRIES
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use gnsslink_frame::{encode_nmea, encode_ubx, FrameScanner};

    use super::*;
    use crate::decode::nav::fixtures;
    use crate::error::DecodeError;

    fn frame(id: MessageId, payload: &[u8]) -> RawFrame {
        RawFrame::ubx(id, payload.to_vec())
    }

    #[test]
    fn test_every_entry_name_matches_frame_naming() {
        let registry = MessageRegistry::new();
        for entry in registry.ubx_entries() {
            assert_eq!(entry.name, gnsslink_frame::message_name(entry.id));
        }
    }

    #[test]
    fn test_dispatch_by_class_and_id() {
        let registry = MessageRegistry::new();
        let msg = registry
            .decode(&frame(NAV_ATT, &fixtures::attitude(77, 0, 0, 0)))
            .unwrap();
        assert_eq!(msg.kind(), "attitude");
        assert_eq!(msg.epoch(), Some(77));
    }

    #[test]
    fn test_pvat_and_sensor_messages_dispatch() {
        let registry = MessageRegistry::new();

        let pvat = registry
            .decode(&frame(NAV_PVAT, &fixtures::pvat(88, 0, 0, 0x21)))
            .unwrap();
        assert_eq!(pvat.kind(), "pvat");
        assert_eq!(pvat.epoch(), Some(88));

        let status = registry
            .decode(&frame(
                ESF_STATUS,
                &esf::fixtures::fusion_status(89, 1, &[[0xC5, 0x0A, 100, 0]]),
            ))
            .unwrap();
        assert_eq!(status.kind(), "fusion-status");
        assert_eq!(status.epoch(), Some(89));

        let meas = registry
            .decode(&frame(ESF_MEAS, &esf::fixtures::measurement(5, &[11 << 24], None)))
            .unwrap();
        assert_eq!(meas.kind(), "external-measurement");
        assert_eq!(meas.epoch(), None);

        let comms = registry
            .decode(&frame(MON_COMMS, &mon::fixtures::comms(0, &[])))
            .unwrap();
        assert_eq!(comms.kind(), "comms-status");

        let err = registry
            .decode(&frame(NAV_PVAT, &fixtures::pvat(88, 0, 0, 0)[..100]))
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedPayload { message: "NAV-PVAT", expected: 116, actual: 100 }
        ));
    }

    #[test]
    fn test_unknown_is_not_an_error() {
        let registry = MessageRegistry::new();
        let id = MessageId::new(0x01, 0x07);
        let msg = registry.decode(&frame(id, &[0u8; 92])).unwrap();
        assert_eq!(
            msg,
            DecodedMessage::Unknown {
                key: FrameKey::Ubx(id),
                length: 92,
            }
        );
        assert!(!registry.is_known(FrameKey::Ubx(id)));
    }

    #[test]
    fn test_unknown_sentence_is_passthrough() {
        let registry = MessageRegistry::new();
        let sentence = SentenceId::from_address(b"GNRMC").unwrap();
        let msg = registry
            .decode(&RawFrame::nmea(sentence, &b"GNRMC,,V,,,,,,,,,,N"[..]))
            .unwrap();
        assert!(matches!(msg, DecodedMessage::Unknown { length: 19, .. }));
    }

    #[test]
    fn test_odd_address_decodes_as_unknown() {
        let body = "G GGA,092725.00,4717.11399,N,00833.91590,E,1,08,1.01,499.6,M,48.0,M,,";
        let mut wire = BytesMut::new();
        encode_nmea(body, &mut wire).unwrap();

        let registry = MessageRegistry::new();
        let mut scanner = FrameScanner::new();
        let frames: Vec<_> = scanner.feed(&wire).collect();
        assert_eq!(frames.len(), 1);

        let msg = registry.decode(&frames[0]).unwrap();
        assert!(matches!(
            msg,
            DecodedMessage::Unknown { key: FrameKey::Nmea(s), .. } if !s.is_parsed()
        ));
        assert!(!registry.is_known(frames[0].key));
    }

    #[test]
    fn test_gga_matched_for_any_talker() {
        let registry = MessageRegistry::new();
        for address in [&b"GPGGA"[..], b"GNGGA", b"GLGGA"] {
            let sentence = SentenceId::from_address(address).unwrap();
            assert!(registry.is_known(FrameKey::Nmea(sentence)));
        }
    }

    #[test]
    fn test_malformed_then_next_frame_decodes() {
        let mut wire = BytesMut::new();
        let mut short = fixtures::velocity(10, 0, 0, 0, 0);
        short.pop();
        encode_ubx(NAV_VELNED, &short, &mut wire).unwrap();
        encode_ubx(NAV_VELNED, &fixtures::velocity(11, 100, 0, 100, 0), &mut wire).unwrap();

        let registry = MessageRegistry::new();
        let mut scanner = FrameScanner::new();
        let results: Vec<_> = scanner.feed(&wire).map(|f| registry.decode(&f)).collect();

        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0],
            Err(DecodeError::MalformedPayload { expected: 36, actual: 35, .. })
        ));
        assert_eq!(results[1].as_ref().unwrap().epoch(), Some(11));
    }

    #[test]
    fn test_epoch_of_reads_offsets() {
        let registry = MessageRegistry::new();

        let pos = fixtures::position(5_000, 0, 0, 0);
        assert_eq!(registry.epoch_of(NAV_HPPOSLLH, &pos), Some(5_000));
        assert_eq!(registry.epoch_of(NAV_HPPOSLLH, &pos[..8]), Some(5_000));
        assert_eq!(registry.epoch_of(NAV_HPPOSLLH, &pos[..7]), None);

        let ins = esf::fixtures::ins(6_000, 0, true);
        assert_eq!(registry.epoch_of(ESF_INS, &ins), Some(6_000));

        let pvat = fixtures::pvat(7_000, 0, 0, 0);
        assert_eq!(registry.epoch_of(NAV_PVAT, &pvat), Some(7_000));

        assert_eq!(registry.epoch_of(MON_SYS, &[0u8; 24]), None);
    }
}
