use std::collections::VecDeque;

use bytes::Bytes;
use weft_io::{DataSink, LimitedSink};
use weft_net::ParseMode;

use crate::{ChunkedSink, Request};

/// Default cap on the size of one request head.
const MAX_REQUEST_HEADER_LENGTH: usize = 32 * 1024;

/// A response being produced for one request.
///
/// The transport feeds any request body in through the [`DataSink`]
/// side and pulls the wire output with [`Response::get_data`], block
/// by block, until an empty block signals the end.
pub trait Response: DataSink {
    /// The whole request body has been delivered.
    fn handle_data_complete(&mut self);

    /// Whether the connection may be kept open after this response.
    fn is_keepalive(&self) -> bool;

    /// The next block of response bytes; empty when done.
    fn get_data(&mut self) -> Bytes;
}

/// Turns parsed requests into responses.
pub trait Dispatcher {
    /// Produce a response for a request, or decline by giving the
    /// request back (the server then answers 404 itself).
    fn create_response(&self, request: Request) -> Result<Box<dyn Response>, Request>;
}

/// A canned response for requests that never reach a dispatcher:
/// malformed requests, unknown resources.
///
/// `text` doubles as status line tail and body ("404 Not Found"). The
/// connection is always closed afterwards, forcing the client to start
/// over cleanly.
pub struct ErrorResponse {
    message: Bytes,
    sent: bool,
}

impl ErrorResponse {
    /// Build the error response for a request.
    #[must_use]
    pub fn new(request: &Request, text: &str) -> Self {
        let mut message = String::new();
        if request.is_response_header_requested() {
            message.push_str(&format!(
                "{} {}\r\n\
                 Connection: close\r\n\
                 Content-Type: text/plain; charset=UTF-8\r\n\
                 Content-Length: {}\r\n\r\n",
                request.version(),
                text,
                text.len(),
            ));
        }
        if request.is_response_body_requested() {
            message.push_str(text);
        }
        Self {
            message: Bytes::from(message),
            sent: false,
        }
    }
}

impl DataSink for ErrorResponse {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, weft_io::BoxError> {
        // The request body, whatever it was, is of no interest.
        *data = &[];
        Ok(false)
    }
}

impl Response for ErrorResponse {
    fn handle_data_complete(&mut self) {}

    fn is_keepalive(&self) -> bool {
        false
    }

    fn get_data(&mut self) -> Bytes {
        if self.sent {
            Bytes::new()
        } else {
            self.sent = true;
            self.message.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadingRequest,
    ReadingData,
    Close,
}

/// The request body framing picked from the request headers.
enum BodySink {
    Chunked(ChunkedSink<Box<dyn Response>>),
    Limited(LimitedSink<Box<dyn Response>>),
}

/// Drives the server side of one HTTP connection, transport excluded.
///
/// The transport pushes received bytes into
/// [`handle_data`][Self::handle_data] and pulls outgoing bytes from
/// [`next_output`][Self::next_output] until empty, closing the
/// connection once [`wants_close`][Self::wants_close] says so. In
/// between, this handler parses request heads, routes them through the
/// [`Dispatcher`], frames request bodies per `Transfer-Encoding` /
/// `Content-Length`, answers protocol violations with `400` and
/// unroutable requests with `404`, and tracks keepalive across
/// pipelined requests.
pub struct ProtocolHandler<D: Dispatcher> {
    dispatcher: D,
    state: State,
    request: Request,
    request_header_length: usize,
    max_request_header_length: usize,
    body_sink: Option<BodySink>,
    response_keepalive: bool,
    finished: VecDeque<Box<dyn Response>>,
}

impl<D: Dispatcher> ProtocolHandler<D> {
    /// Create a handler for one connection.
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            state: State::ReadingRequest,
            request: Request::new(),
            request_header_length: 0,
            max_request_header_length: MAX_REQUEST_HEADER_LENGTH,
            body_sink: None,
            response_keepalive: false,
            finished: VecDeque::new(),
        }
    }

    /// Change the request-head size cap (default 32 KiB).
    pub fn set_max_request_header_length(&mut self, limit: usize) {
        self.max_request_header_length = limit;
    }

    /// Whether the transport should close the connection once all
    /// pending output has been sent.
    #[must_use]
    pub fn wants_close(&self) -> bool {
        self.state == State::Close && self.finished.is_empty()
    }

    /// The next block of bytes to send, empty when there is nothing.
    pub fn next_output(&mut self) -> Bytes {
        while let Some(front) = self.finished.front_mut() {
            let data = front.get_data();
            if !data.is_empty() {
                return data;
            }
            self.finished.pop_front();
        }
        Bytes::new()
    }

    /// Accept received bytes from the transport.
    pub fn handle_data(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() && self.state != State::Close {
            if self.state == State::ReadingRequest {
                self.read_request_data(&mut bytes);
            }
            if self.state == State::ReadingData {
                self.read_body_data(&mut bytes);
            }
        }
    }

    fn read_request_data(&mut self, bytes: &mut &[u8]) {
        let original_size = bytes.len();
        let complete = matches!(self.request.handle_data(bytes), Ok(true));
        if !complete {
            // The parser ate the whole buffer; account for it against
            // the head size cap.
            let remaining = self
                .max_request_header_length
                .saturating_sub(self.request_header_length);
            if original_size >= remaining {
                tracing::warn!(
                    limit = self.max_request_header_length,
                    "closing connection: oversize request head"
                );
                self.state = State::Close;
            } else {
                self.request_header_length += original_size;
            }
            return;
        }

        // Save the keepalive answer; the response may veto it later.
        self.response_keepalive = self.request.is_keepalive();

        // Determine how the request body is framed. Transfer-Encoding
        // has precedence over Content-Length (RFC 2616 4.4).
        let mut content_length = 0u64;
        let mut chunked = false;
        if let Some(field) = self.request.headers().get("Transfer-Encoding") {
            chunked = field.primary_value(ParseMode::new()) == "chunked";
        } else if let Some(field) = self.request.headers().get("Content-Length") {
            content_length = field.primary_value(ParseMode::new()).parse().unwrap_or(0);
        }

        let request = std::mem::take(&mut self.request);
        self.request_header_length = 0;

        let response: Box<dyn Response> = if request.has_errors() {
            tracing::warn!("answering malformed request with 400");
            Box::new(ErrorResponse::new(&request, "400 Bad Request"))
        } else {
            match self.dispatcher.create_response(request) {
                Ok(response) => response,
                Err(request) => {
                    tracing::debug!(path = request.path(), "no handler, answering 404");
                    Box::new(ErrorResponse::new(&request, "404 Not Found"))
                }
            }
        };

        self.body_sink = Some(if chunked {
            BodySink::Chunked(ChunkedSink::new(response))
        } else {
            BodySink::Limited(LimitedSink::new(response, content_length))
        });
        self.state = State::ReadingData;
    }

    fn read_body_data(&mut self, bytes: &mut &[u8]) {
        let result = match &mut self.body_sink {
            Some(BodySink::Chunked(sink)) => sink.handle_data(bytes),
            Some(BodySink::Limited(sink)) => sink.handle_data(bytes),
            None => {
                self.state = State::Close;
                return;
            }
        };
        match result {
            Ok(false) => {}
            Ok(true) => {
                let mut response = match self.body_sink.take() {
                    Some(BodySink::Chunked(sink)) => sink.into_inner(),
                    Some(BodySink::Limited(sink)) => sink.into_inner(),
                    None => return,
                };
                response.handle_data_complete();
                self.state = if self.response_keepalive && response.is_keepalive() {
                    State::ReadingRequest
                } else {
                    State::Close
                };
                self.finished.push_back(response);
                self.response_keepalive = false;
            }
            Err(error) => {
                tracing::warn!(%error, "closing connection: request body sink failed");
                self.state = State::Close;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_for(wire: &[u8]) -> Request {
        let mut request = Request::new();
        let mut data = wire;
        request.handle_data(&mut data).unwrap();
        request
    }

    #[test]
    fn error_response_with_headers_and_body() {
        let request = request_for(b"GET /nope HTTP/1.0\r\n\r\n");
        let mut response = ErrorResponse::new(&request, "404 Not Found");
        assert!(!response.is_keepalive());

        let data = response.get_data();
        let text = String::from_utf8(data.to_vec()).unwrap();
        assert!(text.starts_with("HTTP/1.0 404 Not Found\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.contains("Content-Length: 13\r\n"));
        assert!(text.ends_with("\r\n\r\n404 Not Found"));

        assert!(response.get_data().is_empty());
    }

    #[test]
    fn error_response_for_head_request_has_no_body() {
        let request = request_for(b"HEAD /nope HTTP/1.1\r\n\r\n");
        let mut response = ErrorResponse::new(&request, "404 Not Found");
        let text = String::from_utf8(response.get_data().to_vec()).unwrap();
        assert!(text.ends_with("Content-Length: 13\r\n\r\n"));
    }

    #[test]
    fn error_response_for_http09_is_body_only() {
        let request = request_for(b"GET /nope\r\n");
        let mut response = ErrorResponse::new(&request, "400 Bad Request");
        assert_eq!(&response.get_data()[..], b"400 Bad Request");
    }

    #[test]
    fn error_response_discards_request_body() {
        let request = request_for(b"GET / HTTP/1.0\r\n\r\n");
        let mut response = ErrorResponse::new(&request, "400 Bad Request");
        let mut data: &[u8] = b"ignored";
        assert!(!response.handle_data(&mut data).unwrap());
        assert!(data.is_empty());
    }
}
