//! TCP transport built on `std::net`.

use super::error::Error;
use super::{Close, Connect, Connection, Read, Write};
use std::io::{ErrorKind, Read as StdRead, Write as StdWrite};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// A blocking TCP connection with Nagle's algorithm disabled.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    /// Connect to `remote`, given as `host:port`.
    pub fn connect(remote: &str) -> Result<Self, Error> {
        let stream = TcpStream::connect(remote)
            .map_err(|e| Error::from_io(&e, Error::ConnectionRefused))?;
        Self::from_stream(stream)
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self, Error> {
        stream.set_nodelay(true).map_err(|_| Error::NotOpen)?;
        Ok(Self { stream })
    }
}

impl Read for TcpConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.stream
            .read(buf)
            .map_err(|e| Error::from_io(&e, Error::ReadError))
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool, Self::Error> {
        if timeout.is_zero() {
            return Ok(true);
        }
        self.stream
            .set_read_timeout(Some(timeout))
            .map_err(|_| Error::ReadError)?;
        let mut peeked = [0u8; 1];
        let ready = match self.stream.peek(&mut peeked) {
            // A closed stream is readable; the next read reports the zero length.
            Ok(_) => Ok(true),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(false)
            }
            Err(e) => Err(Error::from_io(&e, Error::ReadError)),
        };
        self.stream
            .set_read_timeout(None)
            .map_err(|_| Error::ReadError)?;
        ready
    }
}

impl Write for TcpConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.stream
            .write(buf)
            .map_err(|e| Error::from_io(&e, Error::WriteError))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stream
            .flush()
            .map_err(|e| Error::from_io(&e, Error::WriteError))
    }
}

impl Close for TcpConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(_) => Err(Error::NotOpen),
        }
    }
}

impl Connection for TcpConnection {}

/// Opens [`TcpConnection`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connect for TcpConnector {
    type Connection = TcpConnection;
    type Error = Error;

    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        TcpConnection::connect(remote)
    }
}
