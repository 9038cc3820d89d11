use weft_error::BoxError;
use weft_io::DataSink;

use crate::HeaderConsumer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before a field, or after a line break.
    Initial,
    /// Accumulating a field name.
    Key,
    /// Accumulating a field value.
    Value,
    /// Seen the line break after a value; the next byte decides between
    /// folding, a new field, and end of header.
    Newline,
    /// Skipping the rest of a malformed line.
    Error,
    /// Seen the final blank line.
    Final,
}

/// Incremental parser for a MIME-style header block.
///
/// Consumes bytes one at a time and delivers each complete field to the
/// consumer, with folded continuation lines joined by a single space.
/// CR is ignored everywhere; a lone LF terminates lines just as well.
///
/// Syntactic anomalies (NUL bytes, whitespace before the colon, a line
/// without one) set a sticky error flag but do not stop the parse; the
/// offending line is skipped and parsing resumes on the next. The
/// parser completes at the blank line: `handle_data` then reports
/// `true` and leaves the remaining bytes to the caller.
pub struct HeaderParser<C: HeaderConsumer> {
    consumer: C,
    state: State,
    key: Vec<u8>,
    value: Vec<u8>,
    has_errors: bool,
    has_folding: bool,
}

impl<C: HeaderConsumer + Default> Default for HeaderParser<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: HeaderConsumer> HeaderParser<C> {
    /// Create a parser delivering fields to `consumer`.
    pub fn new(consumer: C) -> Self {
        Self {
            consumer,
            state: State::Initial,
            key: Vec::new(),
            value: Vec::new(),
            has_errors: false,
            has_folding: false,
        }
    }

    /// Whether any syntactic anomaly was seen so far.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// Whether any folded continuation line was seen so far.
    #[must_use]
    pub fn has_folding(&self) -> bool {
        self.has_folding
    }

    /// Whether the final blank line has been reached.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == State::Final
    }

    /// The consumer receiving the fields.
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

    fn flush(&mut self) {
        // Field content is usually plain ASCII; anything else is
        // handed on as (lossily decoded) UTF-8.
        let key = String::from_utf8_lossy(&self.key);
        let value = String::from_utf8_lossy(&self.value);
        self.consumer.handle_header(&key, &value);
        self.key.clear();
        self.value.clear();
    }
}

impl<C: HeaderConsumer> DataSink for HeaderParser<C> {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        while self.state != State::Final {
            let Some((&byte, rest)) = data.split_first() else {
                break;
            };
            *data = rest;

            match byte {
                0 => {
                    // Invalid everywhere.
                    self.has_errors = true;
                }
                b'\r' => {
                    // Ignored everywhere.
                }
                b'\n' => match self.state {
                    State::Initial => self.state = State::Final,
                    State::Key => {
                        self.has_errors = true;
                        self.key.clear();
                        self.state = State::Initial;
                    }
                    State::Value => self.state = State::Newline,
                    State::Newline => {
                        self.flush();
                        self.state = State::Final;
                    }
                    State::Error => {
                        self.key.clear();
                        self.state = State::Initial;
                    }
                    State::Final => {}
                },
                b' ' | b'\t' => match self.state {
                    State::Initial | State::Key => {
                        self.key.clear();
                        self.has_errors = true;
                        self.state = State::Error;
                    }
                    State::Value => {
                        if !self.value.is_empty() {
                            self.value.push(byte);
                        }
                    }
                    State::Newline => {
                        self.has_folding = true;
                        self.state = State::Value;
                        if !self.value.is_empty() {
                            self.value.push(byte);
                        }
                    }
                    State::Error | State::Final => {}
                },
                b':' => match self.state {
                    State::Initial => {
                        self.has_errors = true;
                        self.state = State::Error;
                    }
                    State::Key => self.state = State::Value,
                    State::Value => self.value.push(b':'),
                    State::Newline => {
                        self.flush();
                        self.has_errors = true;
                        self.state = State::Error;
                    }
                    State::Error | State::Final => {}
                },
                _ => match self.state {
                    State::Initial => {
                        self.key.push(byte);
                        self.state = State::Key;
                    }
                    State::Key => self.key.push(byte),
                    State::Value => self.value.push(byte),
                    State::Newline => {
                        self.flush();
                        self.key.push(byte);
                        self.state = State::Key;
                    }
                    State::Error | State::Final => {}
                },
            }
        }
        Ok(self.state == State::Final)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Renders fields as `a==b||c==d` for compact expectations.
    #[derive(Default)]
    struct Recorder {
        buffer: String,
    }

    impl HeaderConsumer for Recorder {
        fn handle_header(&mut self, name: &str, value: &str) {
            if !self.buffer.is_empty() {
                self.buffer.push_str("||");
            }
            self.buffer.push_str(name);
            self.buffer.push_str("==");
            self.buffer.push_str(value);
        }
    }

    fn parse(input: &str) -> (HeaderParser<Recorder>, bool) {
        let mut parser = HeaderParser::new(Recorder::default());
        let mut data = input.as_bytes();
        let done = parser.handle_data(&mut data).unwrap();
        assert!(data.is_empty());
        (parser, done)
    }

    fn assert_valid(input: &str, expected: &str, folding: bool) {
        let (parser, done) = parse(input);
        assert!(done, "{input:?}");
        assert!(!parser.has_errors(), "{input:?}");
        assert_eq!(parser.has_folding(), folding, "{input:?}");
        assert_eq!(parser.consumer().buffer, expected, "{input:?}");
    }

    fn assert_invalid(input: &str, expected: &str) {
        let (parser, done) = parse(input);
        assert!(done, "{input:?}");
        assert!(parser.has_errors(), "{input:?}");
        assert_eq!(parser.consumer().buffer, expected, "{input:?}");
    }

    #[test]
    fn valid_headers() {
        assert_valid("First:first\n\n", "First==first", false);
        assert_valid("First: first\n\n", "First==first", false);
        assert_valid("First:                   first\n\n", "First==first", false);
        assert_valid("First: \n first\n\n", "First==first", true);
        assert_valid(
            "First: first\nSecond: second\nThird: third\n\n",
            "First==first||Second==second||Third==third",
            false,
        );
        assert_valid(
            "Repeated: 1\nRepeated: 2\nRepeated: 3\n\n",
            "Repeated==1||Repeated==2||Repeated==3",
            false,
        );
        assert_valid("Folded: a\n b\n c\n\n", "Folded==a b c", true);
        assert_valid("\n", "", false);
        assert_valid("A: x\r\nB: y\r\n\r\n", "A==x||B==y", false);
    }

    #[test]
    fn incomplete_headers() {
        for input in ["First: first", "First: first\n"] {
            let (parser, done) = parse(input);
            assert!(!done);
            assert!(!parser.is_completed());
        }
    }

    #[test]
    fn invalid_headers_keep_going() {
        assert_invalid(" \n\n", "");
        assert_invalid(" Foo:bar\n\n", "");
        assert_invalid("First=first\n\n", "");
        assert_invalid("a:b\n:c\n\n", "a==b");
        assert_invalid("a:b\0\n\n", "a==b");
    }

    #[test]
    fn leftover_bytes_stay_with_caller() {
        let mut parser = HeaderParser::new(Recorder::default());
        let mut data: &[u8] = b"Name: value\n\nBODY";
        assert!(parser.handle_data(&mut data).unwrap());
        assert_eq!(data, b"BODY");
        assert_eq!(parser.consumer().buffer, "Name==value");
    }

    #[test]
    fn split_point_insensitive() {
        let input = b"First: first-value\r\nSecond: second-value\r\nThird:\r\n third-value\r\nFourth:\r\n\r\n";
        let expected = "First==first-value||Second==second-value||Third==third-value||Fourth==";

        for split in 0..input.len() {
            let mut parser = HeaderParser::new(Recorder::default());
            let mut head = &input[..split];
            assert!(!parser.handle_data(&mut head).unwrap());
            assert!(head.is_empty());
            let mut tail = &input[split..];
            assert!(parser.handle_data(&mut tail).unwrap());
            assert!(tail.is_empty());
            assert_eq!(parser.consumer().buffer, expected);
        }
    }
}
