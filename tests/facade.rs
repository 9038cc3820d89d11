//! Smoke test: the facade re-exports compose across crates.

use weft::http::{ChunkedSink, ClientResponse, LimitKind};
use weft::io::{DataSink, InternalSink};
use weft::net::Url;

#[test]
fn modules_compose() {
    let url = Url::parse("http://example.com/a/b?q=1").unwrap();
    assert_eq!(url.host, "example.com");

    let mut response = ClientResponse::new(false);
    let mut data: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nbody\r\n0\r\n\r\n";
    assert!(response.handle_data(&mut data).unwrap());
    assert_eq!(response.limit_kind(), LimitKind::Chunk);

    let mut captured = InternalSink::new();
    let mut decoder = ChunkedSink::new(&mut captured);
    assert!(decoder.handle_data(&mut data).unwrap());
    assert_eq!(captured.content(), b"body");
}
