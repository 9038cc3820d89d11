//! End-to-end tests of the client-side receive pipeline: response
//! parser, chunked decoder, decompression, cookie jar.

use std::io::Write;

use jiff::Timestamp;
use weft_http::{ChunkedSink, ClientResponse, ContentEncoding, CookieJar, LimitKind};
use weft_io::{DataSink, InflateTransform, InternalSink, LimitedSink, TransformSink};
use weft_net::Url;

fn gzip_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn chunk_encode(payload: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut wire = Vec::new();
    for chunk in payload.chunks(chunk_size) {
        wire.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        wire.extend_from_slice(chunk);
        wire.extend_from_slice(b"\r\n");
    }
    wire.extend_from_slice(b"0\r\n\r\n");
    wire
}

#[test]
fn chunked_gzip_response_pipeline() {
    let plain = b"a body worth compressing ".repeat(64);
    let body_wire = chunk_encode(&gzip_compress(&plain), 47);

    let mut wire = Vec::new();
    wire.extend_from_slice(
        b"HTTP/1.1 200 OK\r\n\
          Transfer-Encoding: chunked\r\n\
          Content-Encoding: gzip\r\n\r\n",
    );
    wire.extend_from_slice(&body_wire);

    // Parse the head; the parser leaves the body bytes alone.
    let mut response = ClientResponse::new(false);
    let mut data = &wire[..];
    assert!(response.handle_data(&mut data).unwrap());
    assert!(!response.has_errors());
    assert_eq!(response.limit_kind(), LimitKind::Chunk);
    assert_eq!(response.encoding(), ContentEncoding::Gzip);
    assert!(response.is_keepalive());

    // Assemble the pipeline the headers call for and push the rest
    // through it in dribs and drabs.
    let mut captured = InternalSink::new();
    let inflate = TransformSink::with_transform(&mut captured, InflateTransform::gzip());
    let mut body = ChunkedSink::new(inflate);
    let mut done = false;
    for chunk in data.chunks(13) {
        let mut chunk = chunk;
        done = body.handle_data(&mut chunk).unwrap();
        assert!(chunk.is_empty());
    }
    assert!(done);
    drop(body);
    assert_eq!(captured.content(), plain);
}

#[test]
fn length_limited_response_pipeline() {
    let wire: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhelloNEXT";

    let mut response = ClientResponse::new(false);
    let mut data = wire;
    assert!(response.handle_data(&mut data).unwrap());
    assert_eq!(response.limit_kind(), LimitKind::Byte);
    assert_eq!(response.response_length(), 5);

    let mut captured = InternalSink::new();
    let mut body = LimitedSink::new(&mut captured, response.response_length());
    assert!(body.handle_data(&mut data).unwrap());
    assert_eq!(captured.content(), b"hello");
    // The next response on the connection stays with the caller.
    assert_eq!(data, b"NEXT");
}

#[test]
fn response_cookies_land_in_the_jar() {
    let wire: &[u8] = b"HTTP/1.1 200 OK\r\n\
        Set-Cookie: sid=abc123; Path=/; Max-Age=3600\r\n\
        Set-Cookie: theme=dark\r\n\
        Content-Length: 0\r\n\r\n";

    let mut response = ClientResponse::new(false);
    let mut data = wire;
    assert!(response.handle_data(&mut data).unwrap());

    let url = Url::parse("http://shop.example.com/cart/view").unwrap();
    let now = Timestamp::from_second(1_000_000).unwrap();

    let jar = CookieJar::new();
    jar.add_from_response_at(&url, now, response.cookies());
    assert_eq!(jar.len(), 2);

    let mut sent = Vec::new();
    jar.enumerate_for_at(&url, now, &mut |name: &str, value: &str| {
        sent.push(format!("{name}={value}"));
    });
    assert_eq!(sent, ["sid=abc123", "theme=dark"]);

    // The session cookie has the request directory as its path, so a
    // request outside it only carries the path=/ cookie.
    let elsewhere = Url::parse("http://shop.example.com/other").unwrap();
    let mut sent = Vec::new();
    jar.enumerate_for_at(&elsewhere, now, &mut |name: &str, value: &str| {
        sent.push(format!("{name}={value}"));
    });
    assert_eq!(sent, ["sid=abc123"]);

    // An hour later the Max-Age cookie is gone.
    let later = Timestamp::from_second(1_003_601).unwrap();
    let mut sent = Vec::new();
    jar.enumerate_for_at(&url, later, &mut |name: &str, value: &str| {
        sent.push(format!("{name}={value}"));
    });
    assert_eq!(sent, ["theme=dark"]);
}
