//! HTTP/1.x protocol subsystem.
//!
//! Incremental, push-style parsers and generators for HTTP message
//! framing, plus the pieces that surround them on both sides of the
//! protocol:
//!
//! - client side: [`ClientResponse`] parses a response head and tells
//!   the caller how the body is delimited and encoded; [`ChunkedSink`]
//!   decodes chunked bodies; [`Cookie`] and [`CookieJar`] manage the
//!   cookie lifecycle from `Set-Cookie` to `cookies.txt`.
//! - server side: [`Request`] parses a request head;
//!   [`ProtocolHandler`] drives a connection; [`PageDispatcher`]
//!   routes to [`Page`] handlers with [`PageRequest`]/[`PageResponse`]
//!   value objects; [`FormParser`] decodes form submissions.
//!
//! Everything is synchronous and transport-free, built on the
//! [`DataSink`][weft_io::DataSink] pipeline so that framing,
//! length-limiting and decompression compose without buffering whole
//! messages.

mod chunked;
mod cookie;
mod dispatcher;
mod form;
mod jar;
mod page;
mod request;
mod response;
mod server;

pub use chunked::ChunkedSink;
pub use cookie::Cookie;
pub use dispatcher::PageDispatcher;
pub use form::FormParser;
pub use jar::CookieJar;
pub use page::{Page, PageRequest, PageResponse};
pub use request::Request;
pub use response::{ClientResponse, ContentEncoding, LimitKind};
pub use server::{Dispatcher, ErrorResponse, ProtocolHandler, Response};
