use weft_io::{DataSink, InternalSink};
use weft_net::{HeaderTable, ParseMode, match_arguments};

use crate::FormParser;

/// A server-side page handler.
///
/// Pages are a simpler abstraction than a raw
/// [`Response`](crate::Response): the dispatcher collects the whole
/// request into
/// a [`PageRequest`], the page fills in a [`PageResponse`], and the
/// protocol specifics (header emission, HEAD handling, form decoding)
/// stay outside. The trade-off is buffering: pages are not the tool
/// for huge uploads or downloads.
pub trait Page {
    /// Whether `method` (upper case) is acceptable for this page.
    fn is_valid_method(&self, method: &str) -> bool {
        method == "GET"
    }

    /// Whether this page accepts a path remainder below its own.
    fn is_valid_path(&self) -> bool {
        false
    }

    /// Produce the response for a request.
    fn handle_request(&self, request: &mut PageRequest, response: &mut PageResponse);
}

/// What to do with an incoming request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputDisposition {
    /// Not yet decided (no body bytes seen).
    Undecided,
    /// Discard the body.
    Ignore,
    /// Buffer the body for the page to read.
    SaveBody,
    /// Decode the body as form arguments.
    ParseForm,
}

/// A fully-collected request, as seen by a [`Page`].
///
/// The request path is presented in three segments: the dispatcher's
/// root prefix, the page's own path, and the remainder below the page.
/// Query arguments are parsed off the path up front; body handling is
/// decided from the `Content-Type` when the first body bytes arrive.
pub struct PageRequest {
    headers: HeaderTable,
    body: InternalSink,
    form: FormParser<HeaderTable>,
    method: String,
    root_path: String,
    self_path: String,
    path: String,
    disposition: InputDisposition,
}

impl PageRequest {
    /// Create a request for the given path split; query arguments are
    /// extracted from (and stripped off) `path`.
    #[must_use]
    pub fn new(
        root_path: impl Into<String>,
        self_path: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let mut path = path.into();
        let mut arguments = HeaderTable::new();
        match_arguments(&mut path, &mut arguments);
        Self {
            headers: HeaderTable::new(),
            body: InternalSink::new(),
            form: FormParser::new(arguments),
            method: "GET".to_string(),
            root_path: root_path.into(),
            self_path: self_path.into(),
            path,
            disposition: InputDisposition::Undecided,
        }
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Replace the request method.
    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    /// The dispatcher prefix under which the page was found.
    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// The page's own path below the prefix.
    #[must_use]
    pub fn self_path(&self) -> &str {
        &self.self_path
    }

    /// The path remainder below the page, query already stripped.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderTable {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderTable {
        &mut self.headers
    }

    /// Query and form arguments, merged in arrival order.
    #[must_use]
    pub fn arguments(&self) -> &HeaderTable {
        self.form.consumer()
    }

    /// Mutable access to the arguments.
    pub fn arguments_mut(&mut self) -> &mut HeaderTable {
        self.form.consumer_mut()
    }

    /// Body bytes, when the body was buffered.
    #[must_use]
    pub fn body(&self) -> &InternalSink {
        &self.body
    }

    /// Mutable access to the buffered body.
    pub fn body_mut(&mut self) -> &mut InternalSink {
        &mut self.body
    }

    /// Discard any (further) body data.
    pub fn set_ignore_data(&mut self) {
        self.disposition = InputDisposition::Ignore;
    }

    /// Accept a slice of body data.
    pub fn handle_data(&mut self, data: &[u8]) {
        if self.disposition == InputDisposition::Undecided {
            self.disposition = self.decide_disposition();
        }
        match self.disposition {
            InputDisposition::Undecided | InputDisposition::Ignore => {}
            InputDisposition::SaveBody => {
                let _ = self.body.handle_full_data(data);
            }
            InputDisposition::ParseForm => {
                let mut data = data;
                let _ = self.form.handle_data(&mut data);
            }
        }
    }

    /// All body data has arrived; flush pending form state.
    pub fn finish(&mut self) {
        if self.disposition == InputDisposition::ParseForm {
            self.form.handle_data_complete();
        }
    }

    fn decide_disposition(&self) -> InputDisposition {
        if self.method == "GET" || self.method == "HEAD" {
            // These never carry a body; do not even try.
            return InputDisposition::Ignore;
        }
        match self.headers.get("Content-Type") {
            Some(field) => {
                let primary = field.primary_value(ParseMode::new());
                if primary.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
                    InputDisposition::ParseForm
                } else if primary.eq_ignore_ascii_case("multipart/form-data") {
                    // No multipart decoder (yet); the upload is dropped
                    // rather than buffered unparsed.
                    InputDisposition::Ignore
                } else {
                    InputDisposition::SaveBody
                }
            }
            None => InputDisposition::Ignore,
        }
    }
}

/// The response a [`Page`] produces: status, headers, body.
pub struct PageResponse {
    status_code: u16,
    headers: HeaderTable,
    body: InternalSink,
}

impl Default for PageResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl PageResponse {
    pub const OK: u16 = 200;
    pub const REDIRECT_FOUND: u16 = 302;
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const METHOD_NOT_ALLOWED: u16 = 405;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;

    /// Create a response, initially `200 OK` with no headers or body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status_code: Self::OK,
            headers: HeaderTable::new(),
            body: InternalSink::new(),
        }
    }

    /// Status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Set the status code.
    pub fn set_status_code(&mut self, status_code: u16) {
        self.status_code = status_code;
    }

    /// Human-readable phrase for the status code.
    ///
    /// The codes this library produces itself are named; everything
    /// else falls back to a phrase for its class.
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        match self.status_code {
            Self::OK => "OK",
            Self::REDIRECT_FOUND => "Found",
            Self::BAD_REQUEST => "Bad Request",
            Self::NOT_FOUND => "Not Found",
            Self::METHOD_NOT_ALLOWED => "Method Not Allowed",
            Self::INTERNAL_SERVER_ERROR => "Internal Server Error",
            code => match code / 100 {
                1 => "Informative",
                2 => "Success",
                3 => "Redirect",
                4 => "Client Error",
                _ => "Server Error",
            },
        }
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderTable {
        &self.headers
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderTable {
        &mut self.headers
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> &InternalSink {
        &self.body
    }

    /// Mutable access to the response body.
    pub fn body_mut(&mut self) -> &mut InternalSink {
        &mut self.body
    }

    /// Turn the response into a redirect to `address`.
    pub fn set_redirect(&mut self, address: impl Into<String>) {
        self.set_status_code(Self::REDIRECT_FOUND);
        self.headers.set("Location", address.into());
    }

    /// Finalize the response for sending.
    ///
    /// An error status with an empty body gets the status text as a
    /// plain-text body; `Content-Length` is always (re)set to the
    /// actual body size.
    pub fn finish(&mut self) {
        if self.body.is_empty() && self.status_code >= 300 {
            let text = self.status_text();
            let _ = self.body.handle_full_data(text.as_bytes());
            self.headers.add("Content-Type", "text/plain; charset=UTF-8");
        }
        self.headers
            .set("Content-Length", self.body.len().to_string());
    }
}
