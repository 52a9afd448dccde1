//! Error kinds surfaced by the MQTT session engine.

use super::packet::MessageType;
use super::session::State;
use crate::network::error::Error as TransportError;

/// Why the broker refused a CONNECT, taken from the CONNACK return code.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RejectReason {
    /// 0x01: the broker does not support the requested protocol level.
    UnacceptableProtocolVersion,
    /// 0x02: the client identifier is not allowed.
    IdentifierRejected,
    /// 0x03: the MQTT service is unavailable.
    ServerUnavailable,
    /// 0x04: the username or password is malformed or wrong.
    BadCredentials,
    /// 0x05: the client is not authorized to connect.
    NotAuthorized,
}

impl RejectReason {
    /// Map a non-zero CONNACK return code, `None` for codes outside 1..=5.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::UnacceptableProtocolVersion),
            0x02 => Some(Self::IdentifierRejected),
            0x03 => Some(Self::ServerUnavailable),
            0x04 => Some(Self::BadCredentials),
            0x05 => Some(Self::NotAuthorized),
            _ => None,
        }
    }

    /// The wire return code.
    pub fn code(self) -> u8 {
        match self {
            Self::UnacceptableProtocolVersion => 0x01,
            Self::IdentifierRejected => 0x02,
            Self::ServerUnavailable => 0x03,
            Self::BadCredentials => 0x04,
            Self::NotAuthorized => 0x05,
        }
    }
}

/// The specific way an incoming or outgoing packet broke the wire format.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Violation {
    /// No bytes to classify.
    EmptyPacket,
    /// Type code 0 or 15.
    ReservedType,
    /// A packet arrived that the current state cannot accept.
    UnexpectedPacket(MessageType),
    /// The remaining-length field is malformed or does not match the bytes present.
    MalformedLength,
    /// The packet does not fit the receive buffer or the length encoding.
    PacketTooLarge,
    /// A length prefix points past the end of the packet.
    Truncated,
    /// A CONNACK or SUBACK return code outside the defined range.
    InvalidReturnCode,
    /// Fixed-header flags that are not allowed for the packet type.
    InvalidFlags,
}

/// Errors produced by the framer, codec and session.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The byte stream failed or closed. Always fatal to the session.
    Transport(TransportError),
    /// A malformed or out-of-order packet. Fatal to the session.
    ProtocolViolation(Violation),
    /// The broker refused the connection. The caller may retry.
    ConnectRejected(RejectReason),
    /// An acknowledgement id does not match the pending request.
    CorrelationMismatch {
        /// The id the session is waiting for, if any.
        expected: Option<u16>,
        /// The id that arrived.
        received: u16,
    },
    /// The operation is not valid in the current session state.
    InvalidState(State),
    /// Every slot in the pending-acknowledgement table is in use.
    PendingTableFull,
    /// The session options cannot be encoded or parsed.
    InvalidOptions,
    /// The topic filter is empty or does not fit in a SUBSCRIBE.
    InvalidTopic,
}

impl Error {
    /// Whether this error tears the session down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::ProtocolViolation(_))
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Transport(err)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RejectReason {
    fn format(&self, f: defmt::Formatter) {
        match self {
            RejectReason::UnacceptableProtocolVersion => {
                defmt::write!(f, "UnacceptableProtocolVersion")
            }
            RejectReason::IdentifierRejected => defmt::write!(f, "IdentifierRejected"),
            RejectReason::ServerUnavailable => defmt::write!(f, "ServerUnavailable"),
            RejectReason::BadCredentials => defmt::write!(f, "BadCredentials"),
            RejectReason::NotAuthorized => defmt::write!(f, "NotAuthorized"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Violation {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Violation::EmptyPacket => defmt::write!(f, "EmptyPacket"),
            Violation::ReservedType => defmt::write!(f, "ReservedType"),
            Violation::UnexpectedPacket(t) => defmt::write!(f, "UnexpectedPacket({})", t),
            Violation::MalformedLength => defmt::write!(f, "MalformedLength"),
            Violation::PacketTooLarge => defmt::write!(f, "PacketTooLarge"),
            Violation::Truncated => defmt::write!(f, "Truncated"),
            Violation::InvalidReturnCode => defmt::write!(f, "InvalidReturnCode"),
            Violation::InvalidFlags => defmt::write!(f, "InvalidFlags"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Transport(e) => defmt::write!(f, "Transport({})", e),
            Error::ProtocolViolation(v) => defmt::write!(f, "ProtocolViolation({})", v),
            Error::ConnectRejected(r) => defmt::write!(f, "ConnectRejected({})", r),
            Error::CorrelationMismatch { expected, received } => {
                defmt::write!(f, "CorrelationMismatch({}, {})", expected, received)
            }
            Error::InvalidState(s) => defmt::write!(f, "InvalidState({})", s),
            Error::PendingTableFull => defmt::write!(f, "PendingTableFull"),
            Error::InvalidOptions => defmt::write!(f, "InvalidOptions"),
            Error::InvalidTopic => defmt::write!(f, "InvalidTopic"),
        }
    }
}
