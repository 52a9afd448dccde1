//! Errors raised by the byte stream under a session.

/// How a transport failed.
///
/// The session treats every one of these as fatal: it releases the transport
/// and reports [`Error::Transport`](crate::network::application::mqtt::Error::Transport)
/// wrapping the value. Kept `Copy` and allocation-free so embedded transports
/// can return it directly.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The connection was already closed or never opened.
    NotOpen,
    /// Sending bytes failed.
    WriteError,
    /// Receiving bytes failed.
    ReadError,
    /// The remote end could not be reached.
    ConnectionRefused,
    /// No bytes arrived before the deadline.
    Timeout,
    /// The peer closed or reset the stream.
    ConnectionClosed,
    /// The remote address could not be parsed or resolved.
    InvalidAddress,
}

#[cfg(feature = "std")]
impl Error {
    /// Classify an I/O error, using `fallback` for kinds with no closer match.
    ///
    /// `fallback` names the operation that failed, such as
    /// [`Error::ReadError`] for a receive.
    pub fn from_io(err: &std::io::Error, fallback: Error) -> Error {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => Error::Timeout,
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => Error::ConnectionClosed,
            ErrorKind::NotConnected => Error::NotOpen,
            ErrorKind::ConnectionRefused => Error::ConnectionRefused,
            ErrorKind::InvalidInput | ErrorKind::AddrNotAvailable => Error::InvalidAddress,
            _ => fallback,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
        }
    }
}
