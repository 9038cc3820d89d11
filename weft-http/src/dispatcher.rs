use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use weft_error::BoxError;
use weft_io::{DataSink, InternalSink, TextSink};
use weft_net::match_path;

use crate::{Dispatcher, Page, PageRequest, PageResponse, Request, Response};

/// Routes requests under a path prefix to registered [`Page`]s.
///
/// Pages live in a sorted map keyed by their path below the prefix.
/// Routing strips the prefix, then scans the keys from largest to
/// smallest for the first path-prefix match — so a page at `/two/sub`
/// shadows the page at `/two` for requests below `/two/sub`. Requests
/// outside the prefix are declined; unknown paths inside it get a 404
/// (unless that, too, is left to the caller).
pub struct PageDispatcher {
    prefix: String,
    pages: BTreeMap<String, Arc<dyn Page>>,
    handle_nonexistent: bool,
}

impl PageDispatcher {
    /// Create a dispatcher answering below `prefix` (e.g. `"/app"`).
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            pages: BTreeMap::new(),
            handle_nonexistent: true,
        }
    }

    /// Register a page at `path` below the prefix.
    pub fn add_page(&mut self, path: impl Into<String>, page: impl Page + 'static) {
        self.pages.insert(path.into(), Arc::new(page));
    }

    /// Whether unknown paths inside the prefix are answered with a
    /// 404 here (the default) or declined to the caller.
    pub fn set_handle_nonexistent(&mut self, handle: bool) {
        self.handle_nonexistent = handle;
    }
}

impl Dispatcher for PageDispatcher {
    fn create_response(&self, request: Request) -> Result<Box<dyn Response>, Request> {
        let self_path = match request.match_path(&self.prefix) {
            Some(self_path) => self_path.to_string(),
            None => return Err(request),
        };

        // Keys are sorted, so the longest match is toward the end:
        // search backward.
        let mut selected = None;
        for (key, page) in self.pages.iter().rev() {
            if let Some(remainder) = match_path(&self_path, key) {
                selected = Some((key.clone(), page.clone(), remainder.to_string()));
                break;
            }
        }

        match selected {
            Some((self_path, page, remainder)) => Ok(Box::new(PageHandler::new(
                Some(page),
                &request,
                self.prefix.clone(),
                self_path,
                remainder,
            ))),
            None if self.handle_nonexistent => Ok(Box::new(PageHandler::new(
                None,
                &request,
                self.prefix.clone(),
                String::new(),
                String::new(),
            ))),
            None => Err(request),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputStatus {
    /// Output not yet prepared.
    Pending,
    /// Output prepared; headers go out next.
    Processed,
    /// Headers sent; body goes out next.
    SendBody,
    /// Everything sent.
    Done,
}

/// The [`Response`] adapter around one page invocation.
struct PageHandler {
    page: Option<Arc<dyn Page>>,
    version: String,
    header_requested: bool,
    body_requested: bool,
    page_request: PageRequest,
    page_response: PageResponse,
    output_status: OutputStatus,
}

impl PageHandler {
    fn new(
        page: Option<Arc<dyn Page>>,
        request: &Request,
        root: String,
        self_path: String,
        path: String,
    ) -> Self {
        let mut page_request = PageRequest::new(root, self_path, path);
        page_request.set_method(request.method());
        *page_request.headers_mut() = request.headers().clone();

        let mut handler = Self {
            page,
            version: request.version().to_string(),
            header_requested: request.is_response_header_requested(),
            body_requested: request.is_response_body_requested(),
            page_request,
            page_response: PageResponse::new(),
            output_status: OutputStatus::Pending,
        };
        handler.check_request(request.method());
        handler
    }

    /// Reject what can be rejected before any body data arrives.
    fn check_request(&mut self, method: &str) {
        let Some(page) = self.page.clone() else {
            self.fail(PageResponse::NOT_FOUND);
            return;
        };
        if !page.is_valid_method(method) {
            if method == "HEAD" && page.is_valid_method("GET") {
                // The page only speaks GET; emulate HEAD by running GET
                // and suppressing the body at send time.
                self.page_request.set_method("GET");
            } else {
                self.fail(PageResponse::METHOD_NOT_ALLOWED);
            }
        } else if !self.page_request.path().is_empty() && !page.is_valid_path() {
            self.fail(PageResponse::NOT_FOUND);
        }
    }

    fn fail(&mut self, status: u16) {
        self.page_response.set_status_code(status);
        self.page_response.finish();
        self.page_request.set_ignore_data();
        self.output_status = OutputStatus::Processed;
    }
}

impl DataSink for PageHandler {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        self.page_request.handle_data(*data);
        *data = &[];
        Ok(false)
    }
}

impl Response for PageHandler {
    fn handle_data_complete(&mut self) {
        if self.output_status == OutputStatus::Pending {
            self.page_request.finish();
            match &self.page {
                Some(page) => {
                    page.handle_request(&mut self.page_request, &mut self.page_response);
                }
                None => {
                    // Unreachable; checked in check_request.
                    self.page_response
                        .set_status_code(PageResponse::INTERNAL_SERVER_ERROR);
                }
            }
            self.page_response.finish();
            self.output_status = OutputStatus::Processed;
        }
    }

    fn is_keepalive(&self) -> bool {
        true
    }

    fn get_data(&mut self) -> Bytes {
        if self.output_status == OutputStatus::Processed {
            self.output_status = OutputStatus::SendBody;
            if self.header_requested {
                // Capturing into an internal sink never fails.
                let mut head = InternalSink::new();
                let mut text = TextSink::new(&mut head);
                let _ = text.write_display(format_args!(
                    "{} {} {}\r\n",
                    self.version,
                    self.page_response.status_code(),
                    self.page_response.status_text(),
                ));
                let _ = self.page_response.headers().write_headers(text.sink_mut());
                let _ = text.write_str("\r\n");
                drop(text);
                if !head.is_empty() {
                    return head.into_bytes();
                }
            }
        }

        if self.output_status == OutputStatus::SendBody {
            self.output_status = OutputStatus::Done;
            if self.body_requested {
                let body = self.page_response.body_mut().take_bytes();
                if !body.is_empty() {
                    return body;
                }
            }
        }

        Bytes::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers with a fixed body; accepts GET only, sub-paths optional.
    struct FixedPage {
        with_path: bool,
        result: &'static str,
    }

    impl Page for FixedPage {
        fn is_valid_method(&self, method: &str) -> bool {
            method == "GET"
        }

        fn is_valid_path(&self) -> bool {
            self.with_path
        }

        fn handle_request(&self, _request: &mut PageRequest, response: &mut PageResponse) {
            let _ = response.body_mut().handle_full_data(self.result.as_bytes());
            response.headers_mut().set("Content-Type", "text/plain");
        }
    }

    fn dispatcher() -> PageDispatcher {
        let mut dispatcher = PageDispatcher::new("/root");
        dispatcher.add_page("/one", FixedPage { with_path: false, result: "one" });
        dispatcher.add_page("/two", FixedPage { with_path: true, result: "two" });
        dispatcher.add_page("/two/sub", FixedPage { with_path: true, result: "sub" });
        dispatcher
    }

    fn request_for(wire: &str) -> Request {
        let mut request = Request::new();
        let mut data = wire.as_bytes();
        request.handle_data(&mut data).unwrap();
        request
    }

    /// Run a whole request through the dispatcher, returning the wire
    /// output, or `None` when the dispatcher declines.
    fn run(disp: &PageDispatcher, wire: &str) -> Option<String> {
        let mut response = disp.create_response(request_for(wire)).ok()?;
        response.handle_data(&mut &b""[..]).unwrap();
        response.handle_data_complete();

        let mut result = Vec::new();
        loop {
            let block = response.get_data();
            if block.is_empty() {
                break;
            }
            result.extend_from_slice(&block);
        }
        Some(String::from_utf8(result).unwrap())
    }

    #[test]
    fn rejects_paths_outside_prefix() {
        assert!(run(&dispatcher(), "GET /one HTTP/1.0\r\n\r\n").is_none());
    }

    #[test]
    fn unknown_path_inside_prefix_is_404() {
        let result = run(&dispatcher(), "GET /root/zero HTTP/1.0\r\n\r\n").unwrap();
        assert!(result.starts_with("HTTP/1.0 404 Not Found\r\n"), "{result}");
        assert!(result.contains("Content-Type: text/plain; charset=UTF-8\r\n"));
        assert!(result.ends_with("\r\n\r\nNot Found"), "{result}");
    }

    #[test]
    fn unknown_path_is_declined_when_configured() {
        let mut disp = dispatcher();
        disp.set_handle_nonexistent(false);
        assert!(run(&disp, "GET /root/zero HTTP/1.0\r\n\r\n").is_none());
        assert!(run(&disp, "GET /root/one HTTP/1.0\r\n\r\n").is_some());
    }

    #[test]
    fn serves_a_page() {
        let result = run(&dispatcher(), "GET /root/one HTTP/1.0\r\n\r\n").unwrap();
        assert!(result.starts_with("HTTP/1.0 200 OK\r\n"), "{result}");
        assert!(result.contains("Content-Type: text/plain\r\n"));
        assert!(result.contains("Content-Length: 3\r\n"));
        assert!(result.ends_with("\r\n\r\none"), "{result}");
    }

    #[test]
    fn page_without_subpaths_rejects_remainder() {
        let result = run(&dispatcher(), "GET /root/one/x HTTP/1.0\r\n\r\n").unwrap();
        assert!(result.starts_with("HTTP/1.0 404 Not Found\r\n"), "{result}");
    }

    #[test]
    fn wrong_method_is_405() {
        let result = run(&dispatcher(), "OPTIONS /root/one HTTP/1.0\r\n\r\n").unwrap();
        assert!(result.starts_with("HTTP/1.0 405 Method Not Allowed\r\n"), "{result}");
        assert!(result.ends_with("Method Not Allowed"), "{result}");
    }

    #[test]
    fn longest_page_path_wins() {
        let result = run(&dispatcher(), "GET /root/two HTTP/1.0\r\n\r\n").unwrap();
        assert!(result.ends_with("two"), "{result}");

        let result = run(&dispatcher(), "GET /root/two/sub HTTP/1.0\r\n\r\n").unwrap();
        assert!(result.ends_with("sub"), "{result}");

        // Below /two but not below /two/sub.
        let result = run(&dispatcher(), "GET /root/two/a HTTP/1.0\r\n\r\n").unwrap();
        assert!(result.ends_with("two"), "{result}");

        // After /two/sub in sort order, still /two's.
        let result = run(&dispatcher(), "GET /root/two/z HTTP/1.0\r\n\r\n").unwrap();
        assert!(result.ends_with("two"), "{result}");
    }

    #[test]
    fn head_is_emulated_via_get_without_body() {
        let result = run(&dispatcher(), "HEAD /root/two/z HTTP/1.0\r\n\r\n").unwrap();
        assert!(result.starts_with("HTTP/1.0 200 OK\r\n"), "{result}");
        assert!(result.contains("Content-Length: 3\r\n"), "{result}");
        assert!(!result.contains("two"), "{result}");
        assert!(result.ends_with("\r\n\r\n"), "{result}");
    }

    #[test]
    fn http09_request_gets_body_only() {
        let result = run(&dispatcher(), "GET /root/one\r\n").unwrap();
        assert_eq!(result, "one");
    }
}

