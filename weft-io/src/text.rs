use weft_error::BoxError;

use crate::DataSink;

/// Text front-end for a [`DataSink`].
///
/// A convenience facade for producers of protocol text (status lines,
/// header blocks): strings go out as their UTF-8 bytes, no charset
/// translation is applied.
pub struct TextSink<'a> {
    sink: &'a mut dyn DataSink,
}

impl<'a> TextSink<'a> {
    /// Wrap `sink`; the sink must outlive the facade.
    pub fn new(sink: &'a mut dyn DataSink) -> Self {
        Self { sink }
    }

    /// Write a string.
    pub fn write_str(&mut self, text: &str) -> Result<(), BoxError> {
        self.sink.handle_full_data(text.as_bytes())
    }

    /// Write a formatted value.
    pub fn write_display(&mut self, value: impl std::fmt::Display) -> Result<(), BoxError> {
        self.write_str(&value.to_string())
    }

    /// The wrapped sink, for interleaving binary writes.
    pub fn sink_mut(&mut self) -> &mut dyn DataSink {
        &mut *self.sink
    }
}
