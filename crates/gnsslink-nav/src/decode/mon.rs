use bytes::Buf;

use super::expect_len;
use crate::error::Result;
use crate::message::{CommsStatus, DecodedMessage, PortCounters, SystemHealth};

pub const SYS_LEN: usize = 24;
pub const COMMS_HEADER_LEN: usize = 8;
pub const COMMS_PORT_LEN: usize = 40;

pub fn decode_system_health(payload: &[u8]) -> Result<DecodedMessage> {
    expect_len("MON-SYS", payload, SYS_LEN)?;
    let mut p = payload;
    Ok(DecodedMessage::SystemHealth(SystemHealth {
        version: p.get_u8(),
        boot_type: p.get_u8(),
        cpu_load: p.get_u8(),
        cpu_load_max: p.get_u8(),
        mem_usage: p.get_u8(),
        mem_usage_max: p.get_u8(),
        io_usage: p.get_u8(),
        io_usage_max: p.get_u8(),
        uptime: p.get_u32_le(),
        notice_count: p.get_u16_le(),
        warn_count: p.get_u16_le(),
        error_count: p.get_u16_le(),
        temperature: p.get_i8(),
    }))
}

pub fn decode_comms(payload: &[u8]) -> Result<DecodedMessage> {
    let ports = payload.get(1).map_or(0, |&n| usize::from(n));
    expect_len(
        "MON-COMMS",
        payload,
        COMMS_HEADER_LEN + ports * COMMS_PORT_LEN,
    )?;

    let mut p = payload;
    let version = p.get_u8();
    p.advance(1); // nPorts
    let tx_errors = p.get_u8();
    p.advance(1);
    let mut protocol_ids = [0; 4];
    p.copy_to_slice(&mut protocol_ids);

    Ok(DecodedMessage::CommsStatus(CommsStatus {
        version,
        tx_errors,
        protocol_ids,
        ports: p.chunks_exact(COMMS_PORT_LEN).map(port_counters).collect(),
    }))
}

fn port_counters(mut p: &[u8]) -> PortCounters {
    let port_id = p.get_u16_le();
    let tx_pending = p.get_u16_le();
    let tx_bytes = p.get_u32_le();
    let tx_usage = p.get_u8();
    let tx_peak_usage = p.get_u8();
    let rx_pending = p.get_u16_le();
    let rx_bytes = p.get_u32_le();
    let rx_usage = p.get_u8();
    let rx_peak_usage = p.get_u8();
    let overrun_errors = p.get_u16_le();
    let mut messages = [0; 4];
    for count in &mut messages {
        *count = p.get_u16_le();
    }
    p.advance(8); // reserved
    PortCounters {
        port_id,
        tx_pending,
        tx_bytes,
        tx_usage,
        tx_peak_usage,
        rx_pending,
        rx_bytes,
        rx_usage,
        rx_peak_usage,
        overrun_errors,
        messages,
        skipped: p.get_u32_le(),
    }
}
