//! Message-id allocation and pending-acknowledgement bookkeeping.

use super::error::Error;
use heapless::Vec;

/// The request waiting for an acknowledgement.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PendingOp {
    /// A SUBSCRIBE waiting for its SUBACK.
    Subscribe,
}

#[cfg(feature = "defmt")]
impl defmt::Format for PendingOp {
    fn format(&self, f: defmt::Formatter) {
        match self {
            PendingOp::Subscribe => defmt::write!(f, "Subscribe"),
        }
    }
}

/// Issues message ids and remembers which ones await acknowledgement.
///
/// Ids increase monotonically, wrap at `u16::MAX` and never take the value
/// zero. An id is not handed out again while it is still pending, and after
/// completion it only comes back once the counter has gone all the way round.
///
/// `P` bounds how many requests may be outstanding at once.
#[derive(Debug)]
pub struct MessageIds<const P: usize> {
    last: u16,
    pending: Vec<(u16, PendingOp), P>,
}

impl<const P: usize> Default for MessageIds<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const P: usize> MessageIds<P> {
    /// An allocator whose first id is 1.
    pub const fn new() -> Self {
        Self {
            last: 0,
            pending: Vec::new(),
        }
    }

    /// Allocate the next free id and record `op` against it.
    pub fn allocate(&mut self, op: PendingOp) -> Result<u16, Error> {
        if self.pending.is_full() {
            return Err(Error::PendingTableFull);
        }
        let mut id = self.last;
        loop {
            id = id.wrapping_add(1);
            if id == 0 {
                id = 1;
            }
            if !self.is_pending(id) {
                break;
            }
        }
        self.pending
            .push((id, op))
            .map_err(|_| Error::PendingTableFull)?;
        self.last = id;
        Ok(id)
    }

    /// Drop the pending entry for `id`, returning what was waiting on it.
    ///
    /// Unknown ids are ignored: a stale retransmission looks exactly like one.
    pub fn complete(&mut self, id: u16) -> Option<PendingOp> {
        let index = self.pending.iter().position(|(pending, _)| *pending == id)?;
        Some(self.pending.remove(index).1)
    }

    /// Whether `id` is awaiting acknowledgement.
    pub fn is_pending(&self, id: u16) -> bool {
        self.pending.iter().any(|(pending, _)| *pending == id)
    }

    /// Number of outstanding requests.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The oldest outstanding id, if any.
    pub fn oldest(&self) -> Option<u16> {
        self.pending.first().map(|(id, _)| *id)
    }

    /// Abandon every outstanding request.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
