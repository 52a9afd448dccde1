//! MQTT control packet types and the borrowed packet view handed out by the framer.

use super::error::{Error, Violation};
use serde::Deserialize;

/// MQTT protocol name as carried in the CONNECT variable header.
pub const PROTOCOL_NAME: &[u8] = b"MQTT";
/// MQTT protocol level for version 3.1.1.
pub const PROTOCOL_LEVEL: u8 = 4;

/// Largest remaining length the single-byte wire format can carry.
pub const MAX_SINGLE_BYTE_LENGTH: usize = 255;
/// Largest remaining length the variable-length encoding can carry.
pub const MAX_VARIABLE_LENGTH: usize = 268_435_455;
/// Largest fixed header: one type byte plus four length bytes.
pub const MAX_FIXED_HEADER_LEN: usize = 5;

/// Control packet type, taken from the high nibble of the first header byte.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum MessageType {
    /// Client request to connect to the broker.
    Connect = 1,
    /// Connect acknowledgement.
    Connack = 2,
    /// Publish message.
    Publish = 3,
    /// Publish acknowledgement (QoS 1).
    Puback = 4,
    /// Publish received (QoS 2, part 1).
    Pubrec = 5,
    /// Publish release (QoS 2, part 2).
    Pubrel = 6,
    /// Publish complete (QoS 2, part 3).
    Pubcomp = 7,
    /// Subscribe request.
    Subscribe = 8,
    /// Subscribe acknowledgement.
    Suback = 9,
    /// Unsubscribe request.
    Unsubscribe = 10,
    /// Unsubscribe acknowledgement.
    Unsuback = 11,
    /// Ping request.
    Pingreq = 12,
    /// Ping response.
    Pingresp = 13,
    /// Client is disconnecting.
    Disconnect = 14,
}

impl MessageType {
    /// Map a 4-bit type code to a message type.
    ///
    /// Codes 0 and 15 are reserved and rejected.
    pub fn from_code(code: u8) -> Result<Self, Error> {
        Ok(match code {
            1 => Self::Connect,
            2 => Self::Connack,
            3 => Self::Publish,
            4 => Self::Puback,
            5 => Self::Pubrec,
            6 => Self::Pubrel,
            7 => Self::Pubcomp,
            8 => Self::Subscribe,
            9 => Self::Suback,
            10 => Self::Unsubscribe,
            11 => Self::Unsuback,
            12 => Self::Pingreq,
            13 => Self::Pingresp,
            14 => Self::Disconnect,
            _ => return Err(Error::ProtocolViolation(Violation::ReservedType)),
        })
    }

    /// The first fixed-header byte for this type with the given low-nibble flags.
    pub fn header_byte(self, flags: u8) -> u8 {
        ((self as u8) << 4) | (flags & 0x0F)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MessageType {
    fn format(&self, f: defmt::Formatter) {
        match self {
            MessageType::Connect => defmt::write!(f, "CONNECT"),
            MessageType::Connack => defmt::write!(f, "CONNACK"),
            MessageType::Publish => defmt::write!(f, "PUBLISH"),
            MessageType::Puback => defmt::write!(f, "PUBACK"),
            MessageType::Pubrec => defmt::write!(f, "PUBREC"),
            MessageType::Pubrel => defmt::write!(f, "PUBREL"),
            MessageType::Pubcomp => defmt::write!(f, "PUBCOMP"),
            MessageType::Subscribe => defmt::write!(f, "SUBSCRIBE"),
            MessageType::Suback => defmt::write!(f, "SUBACK"),
            MessageType::Unsubscribe => defmt::write!(f, "UNSUBSCRIBE"),
            MessageType::Unsuback => defmt::write!(f, "UNSUBACK"),
            MessageType::Pingreq => defmt::write!(f, "PINGREQ"),
            MessageType::Pingresp => defmt::write!(f, "PINGRESP"),
            MessageType::Disconnect => defmt::write!(f, "DISCONNECT"),
        }
    }
}

/// Quality of Service levels for MQTT messages.
///
/// The session only ever requests [`QoS::AtMostOnce`]; the other levels exist
/// so incoming fixed-header flags can be interpreted.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QoS {
    /// At most once delivery.
    AtMostOnce = 0,
    /// At least once delivery.
    AtLeastOnce = 1,
    /// Exactly once delivery.
    ExactlyOnce = 2,
}

impl QoS {
    /// Map a wire level, `None` for anything above 2.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QoS {
    fn format(&self, f: defmt::Formatter) {
        match self {
            QoS::AtMostOnce => defmt::write!(f, "AtMostOnce"),
            QoS::AtLeastOnce => defmt::write!(f, "AtLeastOnce"),
            QoS::ExactlyOnce => defmt::write!(f, "ExactlyOnce"),
        }
    }
}

/// How the remaining-length field of the fixed header is laid out.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthEncoding {
    /// One byte, 0 to 255, no continuation bit.
    ///
    /// Compatible with minimal clients that only ever read a single length
    /// byte. Lengths of 128 and above are not understood by standard brokers.
    #[default]
    SingleByte,
    /// The standard 1 to 4 byte encoding with a continuation bit per byte.
    Variable,
}

impl LengthEncoding {
    /// Largest remaining length representable in this encoding.
    pub fn max_remaining_length(self) -> usize {
        match self {
            LengthEncoding::SingleByte => MAX_SINGLE_BYTE_LENGTH,
            LengthEncoding::Variable => MAX_VARIABLE_LENGTH,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LengthEncoding {
    fn format(&self, f: defmt::Formatter) {
        match self {
            LengthEncoding::SingleByte => defmt::write!(f, "SingleByte"),
            LengthEncoding::Variable => defmt::write!(f, "Variable"),
        }
    }
}

/// A complete control packet, borrowed from the framer's receive buffer.
///
/// Packets are valid until the next read cycle; copy out anything that has
/// to outlive it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Packet<'a> {
    message_type: MessageType,
    flags: u8,
    header_len: usize,
    bytes: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Interpret `bytes` as exactly one complete packet.
    ///
    /// The remaining-length field must account for every byte after the
    /// fixed header, no more and no less.
    pub fn parse(bytes: &'a [u8], encoding: LengthEncoding) -> Result<Self, Error> {
        let message_type = super::codec::classify(bytes)?;
        let (remaining, field_len) = super::codec::decode_remaining_length(&bytes[1..], encoding)?
            .ok_or(Error::ProtocolViolation(Violation::Truncated))?;
        let header_len = 1 + field_len;
        match (header_len + remaining).cmp(&bytes.len()) {
            core::cmp::Ordering::Equal => Ok(Self {
                message_type,
                flags: bytes[0] & 0x0F,
                header_len,
                bytes,
            }),
            core::cmp::Ordering::Greater => Err(Error::ProtocolViolation(Violation::Truncated)),
            core::cmp::Ordering::Less => {
                Err(Error::ProtocolViolation(Violation::MalformedLength))
            }
        }
    }

    /// The control packet type.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Low nibble of the first header byte.
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Number of bytes following the fixed header.
    pub fn remaining_length(&self) -> usize {
        self.bytes.len() - self.header_len
    }

    /// Length of the fixed header.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Everything after the fixed header.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[self.header_len..]
    }

    /// The whole packet, fixed header included.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}
