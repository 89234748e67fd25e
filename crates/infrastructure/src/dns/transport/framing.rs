//! DoQ wire framing (RFC 9250 section 4.2)
//!
//! Every message on a DoQ stream is a 2-octet big-endian length followed by
//! the DNS message, and the message ID on the wire MUST be zero. IDs are
//! rewritten directly in the serialized bytes so the caller's `Message` is
//! never touched.

use ferrous_doq_domain::DomainError;
use hickory_proto::op::Message;
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};

/// Largest DNS message representable behind a 2-byte length prefix.
pub const MAX_DNS_MESSAGE_SIZE: usize = 65535;

pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Serializes `query` with a zero message ID and prepends the length prefix.
pub fn pack_query(query: &Message) -> Result<Vec<u8>, DomainError> {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    query
        .emit(&mut encoder)
        .map_err(|e| DomainError::MessageEncoding(e.to_string()))?;

    if buf.len() < 2 {
        return Err(DomainError::MessageEncoding(
            "serialized message has no header".to_string(),
        ));
    }
    set_wire_id(&mut buf, 0);

    add_length_prefix(&buf)
}

/// Prepends the 2-byte big-endian length to an already serialized message.
pub fn add_length_prefix(message_bytes: &[u8]) -> Result<Vec<u8>, DomainError> {
    let length = u16::try_from(message_bytes.len()).map_err(|_| {
        DomainError::MessageEncoding(format!(
            "message too large: {} bytes (max {})",
            message_bytes.len(),
            MAX_DNS_MESSAGE_SIZE
        ))
    })?;

    let mut framed = Vec::with_capacity(LENGTH_PREFIX_SIZE + message_bytes.len());
    framed.extend_from_slice(&length.to_be_bytes());
    framed.extend_from_slice(message_bytes);
    Ok(framed)
}

/// Parses a single framed response and stamps `original_id` on it.
///
/// Only one message per stream is supported, so the prefix value itself is
/// skipped rather than used to split the buffer.
pub fn parse_response(
    framed: &mut [u8],
    original_id: u16,
    upstream: &str,
) -> Result<Message, DomainError> {
    if framed.len() < LENGTH_PREFIX_SIZE + 2 {
        return Err(DomainError::InvalidDnsResponse {
            upstream: upstream.to_string(),
            reason: format!("response too short: {} bytes", framed.len()),
        });
    }

    let body = &mut framed[LENGTH_PREFIX_SIZE..];
    set_wire_id(body, original_id);

    Message::from_vec(body).map_err(|e| DomainError::InvalidDnsResponse {
        upstream: upstream.to_string(),
        reason: e.to_string(),
    })
}

/// Reads the message ID from a serialized (unprefixed) message.
pub fn wire_id(message_bytes: &[u8]) -> Option<u16> {
    match message_bytes {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

fn set_wire_id(message_bytes: &mut [u8], id: u16) {
    message_bytes[0] = (id >> 8) as u8;
    message_bytes[1] = id as u8;
}
