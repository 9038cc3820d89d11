use weft_error::BoxError;

use crate::DataSink;

/// A sink that forwards at most a fixed number of bytes to its peer.
///
/// Once the budget is spent, `handle_data` reports completion and the
/// excess bytes stay in the caller's slice. The peer's own completion
/// signal is not interpreted; the limit alone delimits the stream.
pub struct LimitedSink<S: DataSink> {
    peer: S,
    remaining: u64,
}

impl<S: DataSink> LimitedSink<S> {
    /// Forward at most `limit` bytes to `peer`.
    pub fn new(peer: S, limit: u64) -> Self {
        Self {
            peer,
            remaining: limit,
        }
    }

    /// Bytes still left in the budget.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Give back the peer.
    pub fn into_inner(self) -> S {
        self.peer
    }
}

impl<S: DataSink> DataSink for LimitedSink<S> {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(data.len());
        let (forward, rest) = data.split_at(n);
        let mut forward = forward;
        self.peer.handle_data(&mut forward)?;
        self.remaining -= n as u64;
        *data = rest;
        Ok(self.remaining == 0)
    }
}
