//! Wire codec for the control packets the client session exchanges.
//!
//! Encoders build complete packets (fixed header included) into a
//! fixed-capacity [`PacketBuf`]. Decoders read fields out of a received
//! [`Packet`] and hand back views into its storage, never copies.
//!
//! Every string on the wire is prefixed by its length as a 16-bit big-endian
//! integer.

use super::error::{Error, RejectReason, Violation};
use super::options::Options;
use super::packet::{LengthEncoding, MessageType, Packet, PROTOCOL_LEVEL, PROTOCOL_NAME, QoS};
use heapless::Vec;

/// Capacity of an outgoing packet.
pub const MAX_OUTGOING_LEN: usize = 1024;

/// An encoded outgoing packet.
pub type PacketBuf = Vec<u8, MAX_OUTGOING_LEN>;

/// CONNECT flag: discard any previous session state.
const FLAG_CLEAN_SESSION: u8 = 0x02;
/// CONNECT flag: a password follows the username.
const FLAG_PASSWORD: u8 = 0x40;
/// CONNECT flag: a username follows the client identifier.
const FLAG_USERNAME: u8 = 0x80;

/// SUBSCRIBE carries the mandatory reserved flag bits `0b0010`.
const SUBSCRIBE_FLAGS: u8 = 0x02;

/// SUBACK return code for a refused subscription.
const SUBACK_FAILURE: u8 = 0x80;

/// Outcome of a CONNACK.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConnectResult {
    /// Return code 0x00.
    Accepted {
        /// The broker resumed a stored session.
        session_present: bool,
    },
    /// Return codes 0x01 to 0x05.
    Rejected(RejectReason),
}

/// Append the remaining-length field for `len` using `encoding`.
pub fn encode_remaining_length<const N: usize>(
    buf: &mut Vec<u8, N>,
    mut len: usize,
    encoding: LengthEncoding,
) -> Result<(), Error> {
    if len > encoding.max_remaining_length() {
        return Err(Error::ProtocolViolation(Violation::PacketTooLarge));
    }
    let too_large = |_| Error::ProtocolViolation(Violation::PacketTooLarge);
    match encoding {
        LengthEncoding::SingleByte => buf.push(len as u8).map_err(too_large),
        LengthEncoding::Variable => loop {
            let mut byte = (len % 128) as u8;
            len /= 128;
            if len > 0 {
                byte |= 0x80;
            }
            buf.push(byte).map_err(too_large)?;
            if len == 0 {
                return Ok(());
            }
        },
    }
}

/// Decode a remaining-length field from the bytes that follow the type byte.
///
/// Returns `Ok(None)` while more bytes are needed, or `(length, field_len)`
/// once the field is complete.
pub fn decode_remaining_length(
    bytes: &[u8],
    encoding: LengthEncoding,
) -> Result<Option<(usize, usize)>, Error> {
    match encoding {
        LengthEncoding::SingleByte => Ok(bytes.first().map(|&b| (b as usize, 1))),
        LengthEncoding::Variable => {
            let mut value = 0usize;
            let mut multiplier = 1usize;
            for (i, &byte) in bytes.iter().enumerate() {
                value += (byte & 0x7F) as usize * multiplier;
                if byte & 0x80 == 0 {
                    return Ok(Some((value, i + 1)));
                }
                if i == 3 {
                    return Err(Error::ProtocolViolation(Violation::MalformedLength));
                }
                multiplier *= 128;
            }
            Ok(None)
        }
    }
}

fn put_bytes<const N: usize>(buf: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    buf.extend_from_slice(bytes)
        .map_err(|_| Error::ProtocolViolation(Violation::PacketTooLarge))
}

fn put_u8<const N: usize>(buf: &mut Vec<u8, N>, byte: u8) -> Result<(), Error> {
    buf.push(byte)
        .map_err(|_| Error::ProtocolViolation(Violation::PacketTooLarge))
}

fn put_str<const N: usize>(buf: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    let len = u16::try_from(bytes.len()).map_err(|_| Error::InvalidOptions)?;
    put_bytes(buf, &len.to_be_bytes())?;
    put_bytes(buf, bytes)
}

/// Prefix `body` with a fixed header.
fn finish(header: u8, body: &[u8], encoding: LengthEncoding) -> Result<PacketBuf, Error> {
    let mut packet = PacketBuf::new();
    put_u8(&mut packet, header)?;
    encode_remaining_length(&mut packet, body.len(), encoding)?;
    put_bytes(&mut packet, body)?;
    Ok(packet)
}

/// Encode a CONNECT carrying the identifier, credentials and keep-alive from `options`.
pub fn encode_connect(options: &Options<'_>) -> Result<PacketBuf, Error> {
    let mut body = PacketBuf::new();

    // --- Variable Header ---
    put_str(&mut body, PROTOCOL_NAME)?;
    put_u8(&mut body, PROTOCOL_LEVEL)?;

    let mut connect_flags = 0;
    if options.clean_session {
        connect_flags |= FLAG_CLEAN_SESSION;
    }
    if let Some(credentials) = &options.credentials {
        connect_flags |= FLAG_USERNAME;
        if credentials.password.is_some() {
            connect_flags |= FLAG_PASSWORD;
        }
    }
    put_u8(&mut body, connect_flags)?;
    put_bytes(&mut body, &options.keep_alive_seconds.to_be_bytes())?;

    // --- Payload ---
    put_str(&mut body, options.client_id.as_bytes())?;
    if let Some(credentials) = &options.credentials {
        put_str(&mut body, credentials.username.as_bytes())?;
        if let Some(password) = credentials.password {
            put_str(&mut body, password.as_bytes())?;
        }
    }

    finish(
        MessageType::Connect.header_byte(0),
        &body,
        options.length_encoding,
    )
}

/// Encode a single-topic SUBSCRIBE requesting at-most-once delivery.
pub fn encode_subscribe(
    topic_filter: &str,
    msg_id: u16,
    encoding: LengthEncoding,
) -> Result<PacketBuf, Error> {
    let mut body = PacketBuf::new();
    put_bytes(&mut body, &msg_id.to_be_bytes())?;
    put_str(&mut body, topic_filter.as_bytes())?;
    put_u8(&mut body, QoS::AtMostOnce as u8)?;
    finish(
        MessageType::Subscribe.header_byte(SUBSCRIBE_FLAGS),
        &body,
        encoding,
    )
}

/// Encode an at-most-once PUBLISH.
pub fn encode_publish(
    topic: &[u8],
    payload: &[u8],
    encoding: LengthEncoding,
) -> Result<PacketBuf, Error> {
    let mut body = PacketBuf::new();
    put_str(&mut body, topic)?;
    put_bytes(&mut body, payload)?;
    finish(MessageType::Publish.header_byte(0), &body, encoding)
}

/// Encode a PINGREQ.
pub fn encode_ping() -> [u8; 2] {
    [MessageType::Pingreq.header_byte(0), 0]
}

/// Encode a DISCONNECT.
pub fn encode_disconnect() -> [u8; 2] {
    [MessageType::Disconnect.header_byte(0), 0]
}

/// Read the message type from the high nibble of the first byte.
pub fn classify(bytes: &[u8]) -> Result<MessageType, Error> {
    let first = bytes
        .first()
        .ok_or(Error::ProtocolViolation(Violation::EmptyPacket))?;
    MessageType::from_code(first >> 4)
}

fn expect_type(packet: &Packet<'_>, expected: MessageType) -> Result<(), Error> {
    if packet.message_type() == expected {
        Ok(())
    } else {
        Err(Error::ProtocolViolation(Violation::UnexpectedPacket(
            packet.message_type(),
        )))
    }
}

/// Decode the CONNACK return code.
pub fn decode_connack(packet: &Packet<'_>) -> Result<ConnectResult, Error> {
    expect_type(packet, MessageType::Connack)?;
    let payload = packet.payload();
    if payload.len() != 2 {
        return Err(Error::ProtocolViolation(Violation::MalformedLength));
    }
    match payload[1] {
        0x00 => Ok(ConnectResult::Accepted {
            session_present: payload[0] & 0x01 != 0,
        }),
        code => RejectReason::from_code(code)
            .map(ConnectResult::Rejected)
            .ok_or(Error::ProtocolViolation(Violation::InvalidReturnCode)),
    }
}

/// Decode a SUBACK into the message id it acknowledges and the QoS granted
/// for the first topic.
///
/// A `None` grant is the broker refusing the subscription (return code 0x80).
pub fn decode_suback(packet: &Packet<'_>) -> Result<(u16, Option<QoS>), Error> {
    expect_type(packet, MessageType::Suback)?;
    let [hi, lo, code, ..] = packet.payload() else {
        return Err(Error::ProtocolViolation(Violation::Truncated));
    };
    let granted = match *code {
        SUBACK_FAILURE => None,
        code => Some(
            QoS::from_code(code).ok_or(Error::ProtocolViolation(Violation::InvalidReturnCode))?,
        ),
    };
    Ok((u16::from_be_bytes([*hi, *lo]), granted))
}

/// Split a PUBLISH into `(topic, message)`.
///
/// The boundary comes from the topic-length prefix. When the fixed-header QoS
/// bits are set the 2-byte packet id after the topic is skipped.
pub fn decode_publish<'a>(packet: &Packet<'a>) -> Result<(&'a [u8], &'a [u8]), Error> {
    expect_type(packet, MessageType::Publish)?;
    let payload = packet.payload();
    let [hi, lo, rest @ ..] = payload else {
        return Err(Error::ProtocolViolation(Violation::Truncated));
    };
    let topic_len = u16::from_be_bytes([*hi, *lo]) as usize;
    let id_len = match (packet.flags() >> 1) & 0x03 {
        0 => 0,
        1 | 2 => 2,
        _ => return Err(Error::ProtocolViolation(Violation::InvalidFlags)),
    };
    if topic_len + id_len > rest.len() {
        return Err(Error::ProtocolViolation(Violation::Truncated));
    }
    let (topic, rest) = rest.split_at(topic_len);
    Ok((topic, &rest[id_len..]))
}
