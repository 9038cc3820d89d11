use weft_error::{BoxError, OpaqueError};

/// A synchronous, push-style byte consumer.
///
/// Data moves through a pipeline by repeatedly offering a byte slice to
/// a sink. The sink consumes as much as it chooses by advancing the
/// slice, and returns `true` once it is complete: whatever remains in
/// the slice is not the sink's to take, and belongs to the caller (the
/// next protocol element, usually).
///
/// Implementations never block and never perform I/O of their own; a
/// transport drives them from the outside. They also never retain a
/// reference to the offered bytes across calls, so callers are free to
/// reuse their read buffers.
pub trait DataSink {
    /// Consume data.
    ///
    /// On return, `data` has been advanced past the consumed bytes.
    /// Returns `true` when the sink is complete and will consume no
    /// further input.
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError>;

    /// Consume data that must be accepted in full.
    ///
    /// Errors when the sink completes while bytes are left over.
    fn handle_full_data(&mut self, data: &[u8]) -> Result<(), BoxError> {
        let mut data = data;
        if self.handle_data(&mut data)? && !data.is_empty() {
            return Err(OpaqueError::from_display("data sink cannot accept more data").into());
        }
        Ok(())
    }
}

impl<S: DataSink + ?Sized> DataSink for &mut S {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        (**self).handle_data(data)
    }
}

impl<S: DataSink + ?Sized> DataSink for Box<S> {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        (**self).handle_data(data)
    }
}
