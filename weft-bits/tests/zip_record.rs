//! Declaring a third-party wire record as a plain struct of value
//! wrappers, using the ZIP local-file header as the worked example.

use std::mem::{align_of, size_of};

use weft_bits::{LE, U16, U32};

/// ZIP local-file header, the 26 bytes following the `PK\x03\x04`
/// signature (APPNOTE 4.3.7).
#[derive(Clone, Copy, Debug)]
#[repr(C)]
struct LocalFileHeader {
    min_version: U16<LE>,
    flags: U16<LE>,
    method: U16<LE>,
    modification_time: U32<LE>,
    crc: U32<LE>,
    compressed_size: U32<LE>,
    uncompressed_size: U32<LE>,
    name_length: U16<LE>,
    extra_length: U16<LE>,
}

// Every field stores raw bytes, so the struct has alignment 1 and no
// padding; its in-memory layout is the wire layout.
const _: () = assert!(size_of::<LocalFileHeader>() == 26);
const _: () = assert!(align_of::<LocalFileHeader>() == 1);

impl LocalFileHeader {
    fn parse(raw: &[u8; 26]) -> Self {
        // Sound: alignment 1, size 26, all bit patterns valid.
        unsafe { std::ptr::read_unaligned(raw.as_ptr().cast()) }
    }
}

const METHOD_DEFLATED: u16 = 8;

#[test]
fn parse_local_file_header() {
    #[rustfmt::skip]
    let raw: [u8; 26] = [
        0x14, 0x00,             // version needed: 20
        0x00, 0x08,             // flags
        0x08, 0x00,             // method: deflated
        0x21, 0x43, 0x65, 0x87, // dos mtime
        0x78, 0x56, 0x34, 0x12, // crc-32
        0x2A, 0x00, 0x00, 0x00, // compressed size: 42
        0x64, 0x00, 0x00, 0x00, // uncompressed size: 100
        0x09, 0x00,             // name length: 9
        0x00, 0x00,             // extra length: 0
    ];

    let header = LocalFileHeader::parse(&raw);
    assert_eq!(header.min_version.get(), 20);
    assert_eq!(header.flags.get(), 0x0800);
    assert_eq!(header.method.get(), METHOD_DEFLATED);
    assert_eq!(header.modification_time.get(), 0x8765_4321);
    assert_eq!(header.crc.get(), 0x1234_5678);
    assert_eq!(header.compressed_size.get(), 42);
    assert_eq!(header.uncompressed_size.get(), 100);
    assert_eq!(header.name_length.get(), 9);
    assert_eq!(header.extra_length.get(), 0);
}

#[test]
fn build_local_file_header() {
    let mut header = LocalFileHeader::parse(&[0; 26]);
    header.method.set(METHOD_DEFLATED);
    header.compressed_size.set(0x0102_0304);

    assert_eq!(header.method.as_bytes(), &[8, 0]);
    assert_eq!(header.compressed_size.as_bytes(), &[4, 3, 2, 1]);
}
