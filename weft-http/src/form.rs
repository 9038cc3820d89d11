use weft_error::BoxError;
use weft_io::DataSink;
use weft_net::{HeaderConsumer, decode_component};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Key,
    Value,
}

/// Streaming parser for `application/x-www-form-urlencoded` bodies.
///
/// Bytes go in through the sink interface; decoded `(key, value)` pairs
/// come out through the consumer, with `%XX` escapes resolved and `+`
/// as space. The body carries no end marker of its own, so the caller
/// signals the end with [`FormParser::handle_data_complete`], which
/// flushes a pending pair.
pub struct FormParser<C: HeaderConsumer> {
    consumer: C,
    state: State,
    key: Vec<u8>,
    value: Vec<u8>,
}

impl<C: HeaderConsumer> FormParser<C> {
    /// Create a parser delivering pairs to `consumer`.
    pub fn new(consumer: C) -> Self {
        Self {
            consumer,
            state: State::Key,
            key: Vec::new(),
            value: Vec::new(),
        }
    }

    /// The consumer receiving the pairs.
    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    /// Mutable access to the consumer.
    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    /// Consume the parser, returning the consumer.
    pub fn into_consumer(self) -> C {
        self.consumer
    }

    /// Flush the pending pair, if any, and reset for the next one.
    ///
    /// Idempotent, so stray `&` separators emit nothing.
    pub fn handle_data_complete(&mut self) {
        if !self.key.is_empty() || !self.value.is_empty() {
            let key = decode_component(&String::from_utf8_lossy(&self.key));
            let value = decode_component(&String::from_utf8_lossy(&self.value));
            self.consumer.handle_header(&key, &value);
            self.key.clear();
            self.value.clear();
        }
        self.state = State::Key;
    }
}

impl<C: HeaderConsumer> DataSink for FormParser<C> {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        while let Some((&byte, rest)) = data.split_first() {
            *data = rest;
            if byte == b'&' {
                // Also accepted while still reading a key, to mirror
                // the URL query argument splitter.
                self.handle_data_complete();
            } else if self.state == State::Key {
                if byte == b'=' {
                    self.state = State::Value;
                } else {
                    self.key.push(byte);
                }
            } else {
                self.value.push(byte);
            }
        }
        Ok(false)
    }
}
