use bytes::{Bytes, BytesMut};
use weft_error::BoxError;

use crate::DataSink;

/// A sink that captures everything into a growable buffer.
///
/// Used to collect bounded payloads — response bodies, rendered header
/// blocks — that a later stage consumes as one contiguous slice.
#[derive(Debug, Default)]
pub struct InternalSink {
    data: BytesMut,
}

impl InternalSink {
    /// Create an empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything captured so far.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.data
    }

    /// Number of captured bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` when nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop the captured bytes, keeping the sink usable.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Consume the sink, freezing the capture.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }

    /// Take the captured bytes out, leaving the sink empty and usable.
    pub fn take_bytes(&mut self) -> Bytes {
        self.data.split().freeze()
    }
}

impl DataSink for InternalSink {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        self.data.extend_from_slice(data);
        *data = &[];
        Ok(false)
    }
}
