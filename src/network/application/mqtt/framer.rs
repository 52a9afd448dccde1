//! Reassembly of control packets from a byte stream.
//!
//! A read cycle clears the receive buffer, reads the fixed header, then keeps
//! reading until the whole remaining length is present. Each transport read
//! may return any number of bytes from one up to what was asked for. The
//! framer never asks for more than the current packet still needs, so the
//! bytes of the next packet stay in the transport. A bounded cycle has one
//! deadline for the whole packet, however slowly its bytes trickle in.

use super::codec::{classify, decode_remaining_length};
use super::error::{Error, Violation};
use super::keep_alive::Clock;
use super::packet::{LengthEncoding, Packet};
use crate::network::Read;
use crate::network::error::Error as TransportError;
use core::time::Duration;
use heapless::Vec;

/// Receive buffer capacity used when none is given.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Turns a byte stream into discrete packets using an `N` byte receive buffer.
#[derive(Debug)]
pub struct Framer<const N: usize = DEFAULT_BUFFER_SIZE> {
    buffer: Vec<u8, N>,
    encoding: LengthEncoding,
}

impl<const N: usize> Default for Framer<N> {
    fn default() -> Self {
        Self::new(LengthEncoding::default())
    }
}

impl<const N: usize> Framer<N> {
    /// An empty framer reading lengths laid out as `encoding`.
    pub const fn new(encoding: LengthEncoding) -> Self {
        Self {
            buffer: Vec::new(),
            encoding,
        }
    }

    /// Change the remaining-length layout for subsequent packets.
    pub fn set_encoding(&mut self, encoding: LengthEncoding) {
        self.encoding = encoding;
    }

    /// The remaining-length layout in use.
    pub fn encoding(&self) -> LengthEncoding {
        self.encoding
    }

    /// Capacity of the receive buffer.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Read the next complete packet from `transport`.
    ///
    /// With a non-zero `timeout` the whole read cycle shares one deadline,
    /// `timeout` after the call as measured by `clock`. If no data arrives
    /// before it the result is `Ok(None)`. Once part of a packet has been
    /// read, every further wait only gets the time left, and reaching the
    /// deadline is a [`TransportError::Timeout`]. A zero `timeout` blocks in
    /// the transport.
    ///
    /// # Errors
    ///
    /// * [`Error::Transport`] - the transport failed, closed (a zero-length
    ///   read) or stalled past the deadline mid-packet. The connection must be
    ///   considered dead.
    /// * [`Error::ProtocolViolation`] - a reserved packet type, a malformed
    ///   length, or a packet larger than the receive buffer.
    pub fn next_packet<'a, R, K>(
        &'a mut self,
        transport: &mut R,
        clock: &K,
        timeout: Duration,
    ) -> Result<Option<Packet<'a>>, Error>
    where
        R: Read + ?Sized,
        K: Clock + ?Sized,
    {
        self.buffer.clear();

        let deadline = if timeout.is_zero() {
            None
        } else {
            let at = clock.now() + timeout;
            match transport.wait_readable(timeout) {
                Ok(true) => {}
                Ok(false) => return Ok(None),
                Err(_) => return Err(Error::Transport(TransportError::ReadError)),
            }
            Some(Deadline { at, clock })
        };
        let deadline = deadline.as_ref();

        // Fixed header: type byte plus the first length byte
        self.fill(transport, 2, deadline)?;
        classify(&self.buffer)?;

        let (remaining, field_len) = loop {
            match decode_remaining_length(&self.buffer[1..], self.encoding)? {
                Some(length) => break length,
                None => {
                    let next = self.buffer.len() + 1;
                    self.fill(transport, next, deadline)?;
                }
            }
        };

        let total = 1 + field_len + remaining;
        if total > N {
            warn!("packet of {} bytes exceeds {} byte buffer", total, N);
            return Err(Error::ProtocolViolation(Violation::PacketTooLarge));
        }
        self.fill(transport, total, deadline)?;

        trace!("framed {} byte packet", total);
        Packet::parse(&self.buffer, self.encoding).map(Some)
    }

    /// Accumulate bytes until the buffer holds `target` of them.
    fn fill<R, K>(
        &mut self,
        transport: &mut R,
        target: usize,
        deadline: Option<&Deadline<'_, K>>,
    ) -> Result<(), Error>
    where
        R: Read + ?Sized,
        K: Clock + ?Sized,
    {
        let mut filled = self.buffer.len();
        self.buffer
            .resize(target, 0)
            .map_err(|_| Error::ProtocolViolation(Violation::PacketTooLarge))?;

        while filled < target {
            let outcome = match deadline {
                Some(deadline) => Self::wait(transport, deadline),
                None => Ok(()),
            }
            .and_then(|()| match transport.read(&mut self.buffer[filled..target]) {
                Ok(0) => Err(Error::Transport(TransportError::ConnectionClosed)),
                Ok(n) => Ok(n),
                Err(_) => Err(Error::Transport(TransportError::ReadError)),
            });
            match outcome {
                Ok(n) => filled += n.min(target - filled),
                Err(err) => {
                    self.buffer.truncate(filled);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Wait for data with whatever is left before `deadline`.
    fn wait<R, K>(transport: &mut R, deadline: &Deadline<'_, K>) -> Result<(), Error>
    where
        R: Read + ?Sized,
        K: Clock + ?Sized,
    {
        let left = deadline.remaining();
        if left.is_zero() {
            debug!("read deadline passed mid-packet");
            return Err(Error::Transport(TransportError::Timeout));
        }
        match transport.wait_readable(left) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::Transport(TransportError::Timeout)),
            Err(_) => Err(Error::Transport(TransportError::ReadError)),
        }
    }
}

/// The instant a read cycle must be finished by.
struct Deadline<'c, K: ?Sized> {
    at: Duration,
    clock: &'c K,
}

impl<K: Clock + ?Sized> Deadline<'_, K> {
    fn remaining(&self) -> Duration {
        self.at.saturating_sub(self.clock.now())
    }
}
