//! UBX message classes and the message identities the pipeline knows about.
//!
//! Anything not listed here still frames fine; it is just reported by number.

use crate::frame::MessageId;

/// Navigation results.
pub const CLASS_NAV: u8 = 0x01;

/// Acknowledgements of configuration input.
pub const CLASS_ACK: u8 = 0x05;

/// Configuration input.
pub const CLASS_CFG: u8 = 0x06;

/// Receiver monitoring.
pub const CLASS_MON: u8 = 0x0A;

/// External sensor fusion.
pub const CLASS_ESF: u8 = 0x10;

pub const NAV_ATT: MessageId = MessageId::new(CLASS_NAV, 0x05);
pub const NAV_VELNED: MessageId = MessageId::new(CLASS_NAV, 0x12);
pub const NAV_HPPOSLLH: MessageId = MessageId::new(CLASS_NAV, 0x14);
pub const NAV_PVAT: MessageId = MessageId::new(CLASS_NAV, 0x17);
pub const NAV_EOE: MessageId = MessageId::new(CLASS_NAV, 0x61);
pub const ACK_NAK: MessageId = MessageId::new(CLASS_ACK, 0x00);
pub const ACK_ACK: MessageId = MessageId::new(CLASS_ACK, 0x01);
pub const MON_TXBUF: MessageId = MessageId::new(CLASS_MON, 0x08);
pub const MON_COMMS: MessageId = MessageId::new(CLASS_MON, 0x36);
pub const MON_SYS: MessageId = MessageId::new(CLASS_MON, 0x39);
pub const ESF_MEAS: MessageId = MessageId::new(CLASS_ESF, 0x02);
pub const ESF_RAW: MessageId = MessageId::new(CLASS_ESF, 0x03);
pub const ESF_STATUS: MessageId = MessageId::new(CLASS_ESF, 0x10);
pub const ESF_INS: MessageId = MessageId::new(CLASS_ESF, 0x15);

/// Returns a human-readable name for a message identity.
pub fn message_name(id: MessageId) -> &'static str {
    match id {
        NAV_ATT => "NAV-ATT",
        NAV_VELNED => "NAV-VELNED",
        NAV_HPPOSLLH => "NAV-HPPOSLLH",
        NAV_PVAT => "NAV-PVAT",
        NAV_EOE => "NAV-EOE",
        ACK_NAK => "ACK-NAK",
        ACK_ACK => "ACK-ACK",
        MON_TXBUF => "MON-TXBUF",
        MON_COMMS => "MON-COMMS",
        MON_SYS => "MON-SYS",
        ESF_MEAS => "ESF-MEAS",
        ESF_RAW => "ESF-RAW",
        ESF_STATUS => "ESF-STATUS",
        ESF_INS => "ESF-INS",
        other => class_name(other.class),
    }
}

/// Returns a human-readable name for a message class.
pub fn class_name(class: u8) -> &'static str {
    match class {
        CLASS_NAV => "NAV",
        CLASS_ACK => "ACK",
        CLASS_CFG => "CFG",
        CLASS_MON => "MON",
        CLASS_ESF => "ESF",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        assert_eq!(message_name(NAV_HPPOSLLH), "NAV-HPPOSLLH");
        assert_eq!(message_name(ACK_NAK), "ACK-NAK");
        assert_eq!(message_name(MON_SYS), "MON-SYS");
        assert_eq!(message_name(MON_COMMS), "MON-COMMS");
        assert_eq!(message_name(ESF_MEAS), "ESF-MEAS");
    }

    #[test]
    fn test_unlisted_message_falls_back_to_class() {
        assert_eq!(message_name(MessageId::new(CLASS_NAV, 0x07)), "NAV");
        assert_eq!(message_name(MessageId::new(0x27, 0x03)), "UNKNOWN");
    }
}
