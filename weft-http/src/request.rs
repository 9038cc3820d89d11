use weft_error::BoxError;
use weft_io::DataSink;
use weft_net::{HeaderParser, HeaderTable, match_path};

/// HTTP/0.9, the initial protocol version: `GET /path` only, no request
/// version token, no response headers.
const HTTP_0_9: &str = "HTTP/0.9";

/// HTTP/1.1: keepalive is the default, `Host` is mandatory.
const HTTP_1_1: &str = "HTTP/1.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Method,
    MethodSp,
    Path,
    PathSp,
    Version,
    Header,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Space,
    Newline,
    Return,
    Other,
}

fn classify(byte: u8) -> Class {
    match byte {
        b' ' => Class::Space,
        b'\n' => Class::Newline,
        b'\r' => Class::Return,
        _ => Class::Other,
    }
}

/// Consume bytes of the accepted classes, optionally saving them, and
/// report the class of the first byte that is not accepted (without
/// consuming it). `None` when the input runs out first.
fn scan(data: &mut &[u8], mut save: Option<&mut String>, accept: &[Class]) -> Option<Class> {
    while let Some(&byte) = data.first() {
        let class = classify(byte);
        if !accept.contains(&class) {
            return Some(class);
        }
        if let Some(save) = save.as_mut() {
            save.push(byte as char);
        }
        *data = &data[1..];
    }
    None
}

/// Incremental parser for an HTTP request head.
///
/// Consumes the request line and header block; the body (if any) is the
/// caller's to frame, using the parsed headers. A bare LF after the
/// path yields an HTTP/0.9 request with no headers. Completion is
/// reported from `handle_data` once the head is fully parsed, leaving
/// any body bytes in the caller's slice.
#[derive(Default)]
pub struct Request {
    method: String,
    path: String,
    version: String,
    headers: HeaderParser<HeaderTable>,
    state: State,
}

impl Request {
    /// Create a parser for one request head.
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: String::new(),
            path: String::new(),
            version: String::new(),
            headers: HeaderParser::new(HeaderTable::new()),
            state: State::Method,
        }
    }

    /// Request method, verbatim (methods are case-sensitive).
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path, verbatim and still percent-encoded.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Protocol version token, e.g. `HTTP/1.1`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Parsed request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderTable {
        self.headers.consumer()
    }

    /// Mutable access to the parsed request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderTable {
        self.headers.consumer_mut()
    }

    /// Whether the request line or header block was malformed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.state == State::Error || self.headers.has_errors()
    }

    /// Whether the client can keep the connection open afterwards.
    ///
    /// HTTP/0.9 delimits responses by closing, so never. An explicit
    /// `Connection` header decides otherwise; without one, keepalive is
    /// the HTTP/1.1 default.
    #[must_use]
    pub fn is_keepalive(&self) -> bool {
        if self.version == HTTP_0_9 {
            false
        } else if let Some(field) = self.headers().get("Connection") {
            field.value() == "keepalive"
        } else {
            self.version == HTTP_1_1
        }
    }

    /// Whether the response may carry a header block (all but HTTP/0.9).
    #[must_use]
    pub fn is_response_header_requested(&self) -> bool {
        self.version != HTTP_0_9
    }

    /// Whether the response may carry a body (all methods but `HEAD`).
    #[must_use]
    pub fn is_response_body_requested(&self) -> bool {
        self.method != "HEAD"
    }

    /// Match the request path against a prefix, returning the remainder.
    #[must_use]
    pub fn match_path<'a>(&'a self, prefix: &str) -> Option<&'a str> {
        match_path(&self.path, prefix)
    }
}

impl DataSink for Request {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        while !data.is_empty() {
            match self.state {
                State::Method => match scan(data, Some(&mut self.method), &[Class::Other]) {
                    Some(Class::Space | Class::Return) => self.state = State::MethodSp,
                    Some(Class::Newline) => self.state = State::Error,
                    _ => {}
                },
                State::MethodSp => match scan(data, None, &[Class::Space, Class::Return]) {
                    Some(Class::Newline) => self.state = State::Error,
                    Some(Class::Other) => self.state = State::Path,
                    _ => {}
                },
                State::Path => match scan(data, Some(&mut self.path), &[Class::Other]) {
                    Some(Class::Space | Class::Return) => self.state = State::PathSp,
                    Some(Class::Newline) => {
                        self.version = HTTP_0_9.to_string();
                        *data = &data[1..];
                        self.state = State::Done;
                    }
                    _ => {}
                },
                State::PathSp => match scan(data, None, &[Class::Space, Class::Return]) {
                    Some(Class::Newline) => {
                        self.version = HTTP_0_9.to_string();
                        *data = &data[1..];
                        self.state = State::Done;
                    }
                    Some(Class::Other) => self.state = State::Version,
                    _ => {}
                },
                State::Version => {
                    match scan(data, Some(&mut self.version), &[Class::Other, Class::Space]) {
                        Some(Class::Newline) => {
                            *data = &data[1..];
                            self.state = State::Header;
                        }
                        Some(Class::Return) => *data = &data[1..],
                        _ => {}
                    }
                }
                State::Header => {
                    if self.headers.handle_data(data)? {
                        self.state = State::Done;
                    }
                }
                State::Done | State::Error => break,
            }
        }
        Ok(matches!(self.state, State::Done | State::Error))
    }
}
