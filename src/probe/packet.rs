//! Framing of the two client packets of a status ping.
//!
//! Every packet goes on the wire as `varint(len(payload)) || payload`, where the
//! payload starts with the varint packet id.

use super::varint::put_varint;

pub const HANDSHAKE_PACKET_ID: i64 = 0x00;
pub const STATUS_REQUEST_PACKET_ID: i64 = 0x00;
pub const STATUS_RESPONSE_PACKET_ID: u32 = 0x00;

/// Protocol version announced in the handshake.
pub const PROTOCOL_VERSION: i64 = 754;

/// Handshake `next state` value selecting the status exchange.
const NEXT_STATE_STATUS: i64 = 0x01;

/// Builds the handshake announcing a status query for `host:port`.
pub fn handshake(host: &str, port: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(host.len() + 16);
    put_varint(&mut payload, HANDSHAKE_PACKET_ID);
    put_varint(&mut payload, PROTOCOL_VERSION);
    put_string(&mut payload, host);
    payload.extend_from_slice(&port.to_be_bytes());
    put_varint(&mut payload, NEXT_STATE_STATUS);
    frame(&payload)
}

/// Builds the empty status request that follows the handshake.
pub fn status_request() -> Vec<u8> {
    let mut payload = Vec::with_capacity(1);
    put_varint(&mut payload, STATUS_REQUEST_PACKET_ID);
    frame(&payload)
}

fn put_string(buf: &mut Vec<u8>, value: &str) {
    put_varint(buf, value.len() as i64);
    buf.extend_from_slice(value.as_bytes());
}

fn frame(payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(payload.len() + super::varint::MAX_VARINT_LEN);
    put_varint(&mut packet, payload.len() as i64);
    packet.extend_from_slice(payload);
    packet
}
