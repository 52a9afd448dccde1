//! A transport abstraction layer for the MQTT session engine
//!
//! The session never opens sockets itself. It talks to whatever byte-stream
//! implements the traits below: a TCP socket on a host, a modem driver on a
//! microcontroller, or a scripted mock in tests.
//!

#![deny(unsafe_code)]

use core::time::Duration;

/// Common error types for transport operations
pub mod error;

/// Application protocols layered on top of a [`Connection`]
pub mod application;

/// `std::net` backed transport
#[cfg(feature = "std")]
pub mod tcp;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, Read, Write};
}

/// Byte-oriented receive half of a transport.
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Read data from the connection.
    ///
    /// Returns the number of bytes placed in `buf`. A return of `Ok(0)` means
    /// the peer closed the stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Wait until data can be read, for at most `timeout`.
    ///
    /// Returns `Ok(false)` if nothing arrived in time. Transports that cannot
    /// wait on readiness keep the default, which reports data as available
    /// and lets the next [`Read::read`] block.
    fn wait_readable(&mut self, timeout: Duration) -> Result<bool, Self::Error> {
        let _ = timeout;
        Ok(true)
    }
}

/// Byte-oriented send half of a transport.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Releases a transport.
pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous, reliable byte-stream connection
pub trait Connection: Read + Write + Close {}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection
    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}

/// Write all of `buf`, looping over short writes.
///
/// A write that accepts zero bytes is reported as [`error::Error::ConnectionClosed`].
pub fn write_all<W: Write>(writer: &mut W, mut buf: &[u8]) -> Result<(), error::Error> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => return Err(error::Error::ConnectionClosed),
            Ok(n) => buf = &buf[n..],
            Err(_) => return Err(error::Error::WriteError),
        }
    }
    writer.flush().map_err(|_| error::Error::WriteError)
}
