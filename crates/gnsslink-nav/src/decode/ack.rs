use gnsslink_frame::MessageId;

use super::expect_len;
use crate::error::Result;
use crate::message::{Acknowledgement, DecodedMessage};

pub const ACK_LEN: usize = 2;

pub fn decode_ack(payload: &[u8]) -> Result<DecodedMessage> {
    decode(payload, "ACK-ACK", true)
}

pub fn decode_nak(payload: &[u8]) -> Result<DecodedMessage> {
    decode(payload, "ACK-NAK", false)
}

fn decode(payload: &[u8], message: &'static str, positive: bool) -> Result<DecodedMessage> {
    expect_len(message, payload, ACK_LEN)?;
    Ok(DecodedMessage::Acknowledgement(Acknowledgement {
        acked: MessageId::new(payload[0], payload[1]),
        positive,
    }))
}
