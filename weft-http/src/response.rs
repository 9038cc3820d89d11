use weft_error::BoxError;
use weft_io::DataSink;
use weft_net::{HeaderConsumer, HeaderParser, HeaderTable};

const MAX_PHRASE: usize = 200;
const MAX_VERSION: usize = 32;

/// How the end of a response body is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// The response has no body at all.
    None,
    /// Chunked transfer encoding delimits the body.
    Chunk,
    /// A byte count (`Content-Range` or `Content-Length`) delimits it.
    Byte,
    /// Nothing does; the body ends when the connection closes.
    Stream,
}

/// Declared `Content-Encoding` of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    /// No transformation (the default).
    Identity,
    /// gzip.
    Gzip,
    /// deflate.
    Deflate,
    /// Something this library does not decode.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ParseVersion,
    ParseStatusCode,
    ParseStatusPhrase,
    ParseHeader,
    FinalSuccess,
    FinalError,
}

/// Semantic interpretation of the headers, fed by the header parser.
#[derive(Default)]
struct Interpreter {
    has_content_length: bool,
    content_length: u64,
    has_content_range: bool,
    content_range_start: u64,
    content_range_length: u64,
    content_range_total: u64,
    has_connection: bool,
    connection_keepalive: bool,
    chunked: bool,
    encoding: Option<ContentEncoding>,
    headers: HeaderTable,
    cookies: HeaderTable,
}

impl HeaderConsumer for Interpreter {
    fn handle_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("Content-Length") {
            if let Ok(length) = value.trim().parse() {
                self.has_content_length = true;
                self.content_length = length;
            }
        } else if name.eq_ignore_ascii_case("Content-Range") {
            if let Some((start, end, total)) = parse_content_range(value) {
                self.has_content_range = true;
                self.content_range_start = start;
                self.content_range_length = end + 1 - start;
                self.content_range_total = total;
            }
        } else if name.eq_ignore_ascii_case("Connection") {
            if value.eq_ignore_ascii_case("close") {
                self.has_connection = true;
                self.connection_keepalive = false;
            } else if value.eq_ignore_ascii_case("keep-alive") {
                self.has_connection = true;
                self.connection_keepalive = true;
            }
        } else if name.eq_ignore_ascii_case("Transfer-Encoding") {
            if value.eq_ignore_ascii_case("chunked") {
                self.chunked = true;
            }
        } else if name.eq_ignore_ascii_case("Content-Encoding") {
            self.encoding = Some(if value.eq_ignore_ascii_case("gzip") {
                ContentEncoding::Gzip
            } else if value.eq_ignore_ascii_case("deflate") {
                ContentEncoding::Deflate
            } else if value.eq_ignore_ascii_case("identity") {
                ContentEncoding::Identity
            } else {
                ContentEncoding::Unknown
            });
        } else if name.eq_ignore_ascii_case("Set-Cookie") {
            // Kept apart from the regular headers: the cookie name is
            // everything up to the first '=', the stored value keeps
            // the attributes for the cookie layer to interpret.
            if let Some(eq) = value.find([';', '=']) {
                if value.as_bytes()[eq] == b'=' {
                    self.cookies
                        .add(value[..eq].trim(), value[eq + 1..].trim());
                }
            }
        } else {
            self.headers.add(name, value);
        }
    }
}

/// Parse `bytes <start>-<end>/<total>`.
///
/// An empty-but-positioned range (`end + 1 == start`) is accepted; the
/// range must otherwise lie inside the total.
fn parse_content_range(value: &str) -> Option<(u64, u64, u64)> {
    let rest = value.trim_start();
    let rest = rest.strip_prefix("bytes")?;
    let after_space = rest.trim_start();
    if after_space.len() == rest.len() {
        // At least one space is required after "bytes".
        return None;
    }
    let (start, rest) = parse_number(after_space)?;
    let rest = rest.strip_prefix('-')?;
    let (end, rest) = parse_number(rest)?;
    let rest = rest.strip_prefix('/')?;
    let (total, rest) = parse_number(rest)?;
    if !rest.trim_start().is_empty() {
        return None;
    }
    (start <= end.checked_add(1)? && start <= total && end < total).then_some((start, end, total))
}

fn parse_number(value: &str) -> Option<(u64, &str)> {
    let digits = value.len() - value.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let number = value[..digits].parse().ok()?;
    Some((number, &value[digits..]))
}

/// Incremental parser for an HTTP response head.
///
/// Parses the status line and headers, interpreting the framing
/// headers along the way so the caller can set up the body pipeline:
/// how the body is delimited ([`limit_kind`][Self::limit_kind]), how
/// long it is, how it is encoded, and whether the connection survives.
///
/// A malformed status line parks the parser in an error state with a
/// synthesized status of 500, so callers always have a status code to
/// report. Whether a HEAD request was sent must be declared up front,
/// since it changes the body rules.
pub struct ClientResponse {
    state: State,
    version: String,
    status_code: u32,
    status_phrase: String,
    is_head_request: bool,
    parser: HeaderParser<Interpreter>,
}

impl ClientResponse {
    /// Create a parser; `is_head_request` tells it the response answers
    /// a HEAD request and therefore carries no body.
    #[must_use]
    pub fn new(is_head_request: bool) -> Self {
        Self {
            state: State::ParseVersion,
            version: String::new(),
            status_code: 0,
            status_phrase: String::new(),
            is_head_request,
            parser: HeaderParser::new(Interpreter::default()),
        }
    }

    /// Status code from the status line (500 after a framing error).
    #[must_use]
    pub fn status_code(&self) -> u32 {
        self.status_code
    }

    /// Status phrase, capped at 200 bytes.
    #[must_use]
    pub fn status_phrase(&self) -> &str {
        &self.status_phrase
    }

    /// Protocol version token from the status line.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Response headers that were not semantically interpreted.
    #[must_use]
    pub fn headers(&self) -> &HeaderTable {
        &self.parser.consumer().headers
    }

    /// `Set-Cookie` headers, one field per cookie, attributes kept in
    /// the value.
    #[must_use]
    pub fn cookies(&self) -> &HeaderTable {
        &self.parser.consumer().cookies
    }

    /// Whether anything about the response was malformed: a framing
    /// error, header syntax errors, or a nonsensical status code.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.state == State::FinalError
            || self.parser.has_errors()
            || self.status_code < 100
            || self.status_code >= 1000
    }

    /// Whether a body follows the head at all.
    ///
    /// HEAD responses, 1xx, 204 and 304 never have one.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !(self.is_head_request
            || self.status_code < 200
            || self.status_code == 204
            || self.status_code == 304)
    }

    /// How the body is delimited.
    ///
    /// In priority order: no body at all, chunked encoding, a byte
    /// count, or nothing (read until the connection closes).
    #[must_use]
    pub fn limit_kind(&self) -> LimitKind {
        let it = self.parser.consumer();
        if !self.has_body() {
            LimitKind::None
        } else if it.chunked {
            LimitKind::Chunk
        } else if it.has_content_range || it.has_content_length {
            LimitKind::Byte
        } else {
            LimitKind::Stream
        }
    }

    /// Declared content encoding of the body.
    #[must_use]
    pub fn encoding(&self) -> ContentEncoding {
        self.parser.consumer().encoding.unwrap_or(ContentEncoding::Identity)
    }

    /// Byte count of the body to expect, 0 when unknown or absent.
    #[must_use]
    pub fn response_length(&self) -> u64 {
        let it = self.parser.consumer();
        if !self.has_body() {
            0
        } else if it.has_content_range {
            it.content_range_length
        } else if it.has_content_length {
            it.content_length
        } else {
            0
        }
    }

    /// Position of the body within the full document (`Content-Range`
    /// start), 0 otherwise.
    #[must_use]
    pub fn response_offset(&self) -> u64 {
        let it = self.parser.consumer();
        if self.has_body() && it.has_content_range {
            it.content_range_start
        } else {
            0
        }
    }

    /// Size of the full document: the `Content-Range` total if given,
    /// else the content length, else 0.
    #[must_use]
    pub fn total_length(&self) -> u64 {
        let it = self.parser.consumer();
        if it.has_content_range {
            it.content_range_total
        } else if it.has_content_length {
            it.content_length
        } else {
            0
        }
    }

    /// Whether the connection can be reused after the body.
    ///
    /// Never after an error or when only connection close delimits the
    /// body; otherwise the server's explicit `Connection` answer wins,
    /// and HTTP/1.1 defaults to keepalive.
    #[must_use]
    pub fn is_keepalive(&self) -> bool {
        let it = self.parser.consumer();
        if self.limit_kind() == LimitKind::Stream || self.has_errors() {
            false
        } else if it.has_connection {
            it.connection_keepalive
        } else {
            self.version == "HTTP/1.1"
        }
    }
}

impl DataSink for ClientResponse {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        if self.state == State::ParseVersion {
            while let Some((&byte, rest)) = data.split_first() {
                *data = rest;
                if byte == b' ' || byte == b'\t' {
                    self.state = State::ParseStatusCode;
                    break;
                } else if (b' '..0x7F).contains(&byte) && self.version.len() < MAX_VERSION {
                    self.version.push(byte as char);
                } else {
                    // Overlong counts as malformed too.
                    self.state = State::FinalError;
                    self.status_code = 500;
                    break;
                }
            }
        }

        if self.state == State::ParseStatusCode {
            while let Some((&byte, rest)) = data.split_first() {
                *data = rest;
                if byte == b' ' || byte == b'\t' {
                    self.state = State::ParseStatusPhrase;
                    break;
                } else if byte.is_ascii_digit() {
                    self.status_code =
                        self.status_code.wrapping_mul(10).wrapping_add(u32::from(byte - b'0'));
                } else {
                    self.state = State::FinalError;
                    self.status_code = 500;
                    break;
                }
            }
        }

        if self.state == State::ParseStatusPhrase {
            while let Some((&byte, rest)) = data.split_first() {
                *data = rest;
                match byte {
                    b'\r' => {}
                    b'\n' => {
                        self.state = State::ParseHeader;
                        break;
                    }
                    _ => {
                        // Overlong phrases are truncated, not rejected.
                        if self.status_phrase.len() < MAX_PHRASE {
                            self.status_phrase.push(byte as char);
                        }
                    }
                }
            }
        }

        if self.state == State::ParseHeader && self.parser.handle_data(data)? {
            self.state = State::FinalSuccess;
        }

        Ok(matches!(self.state, State::FinalSuccess | State::FinalError))
    }
}
