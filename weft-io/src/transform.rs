use flate2::{Decompress, FlushDecompress, Status};
use weft_error::{BoxError, OpaqueError};

use crate::DataSink;

const SCRATCH_SIZE: usize = 4096;

/// A byte-to-byte transformation driven in push mode.
///
/// A call consumes some prefix of `input` (advancing the slice) and
/// writes some output into `output`, returning the number of bytes
/// produced. Either side may be zero; the driver calls again while
/// input remains.
pub trait Transform {
    /// Transform a step's worth of data.
    fn transform(&mut self, input: &mut &[u8], output: &mut [u8]) -> Result<usize, BoxError>;
}

/// A sink that routes data through a [`Transform`] into a peer sink.
///
/// Without a transform installed the sink is a plain pass-through. With
/// one, input is pulled through the transform in scratch-buffer sized
/// steps and pushed to the peer until the input slice is exhausted.
///
/// The peer's completion signal is advisory here: transformed output
/// keeps flowing even after the peer first reports completion, and the
/// peer's last answer is what the caller sees.
pub struct TransformSink<S: DataSink> {
    peer: S,
    transform: Option<Box<dyn Transform>>,
    scratch: Box<[u8; SCRATCH_SIZE]>,
}

impl<S: DataSink> TransformSink<S> {
    /// Create a pass-through sink; install a transform separately.
    pub fn new(peer: S) -> Self {
        Self {
            peer,
            transform: None,
            scratch: Box::new([0; SCRATCH_SIZE]),
        }
    }

    /// Create a sink with a transform installed.
    pub fn with_transform(peer: S, transform: impl Transform + 'static) -> Self {
        let mut sink = Self::new(peer);
        sink.set_transform(Box::new(transform));
        sink
    }

    /// Install (or replace) the transformation.
    pub fn set_transform(&mut self, transform: Box<dyn Transform>) {
        self.transform = Some(transform);
    }

    /// Give back the peer.
    pub fn into_inner(self) -> S {
        self.peer
    }
}

impl<S: DataSink> DataSink for TransformSink<S> {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        let Some(transform) = &mut self.transform else {
            return self.peer.handle_data(data);
        };

        let mut result = false;
        while !data.is_empty() {
            let before = data.len();
            let produced = transform.transform(data, &mut self.scratch[..])?;
            if produced > 0 {
                let mut out = &self.scratch[..produced];
                result = self.peer.handle_data(&mut out)?;
            } else if data.len() == before {
                return Err(
                    OpaqueError::from_display("transformation made no progress").into(),
                );
            }
        }
        Ok(result)
    }
}

/// Where an [`InflateTransform`] is in the surrounding framing.
enum Framing {
    /// No framing of our own; the decompressor sees the stream directly.
    Bare,
    /// Skipping a gzip member header (RFC 1952).
    GzipHeader(GzipHeader),
    /// Decompressing the deflate body of a gzip member.
    GzipBody,
    /// Discarding the CRC32 + ISIZE trailer, `n` bytes left.
    GzipTrailer(u8),
    /// Stream finished; surplus input is consumed and dropped.
    Done,
}

/// Decompression behind the [`Transform`] interface.
///
/// Three personalities cover the encodings seen on the wire: `gzip`
/// (full RFC 1952 framing), `zlib` (RFC 1950, what HTTP calls
/// `deflate` in practice), and `raw` deflate.
pub struct InflateTransform {
    inflate: Decompress,
    framing: Framing,
}

impl InflateTransform {
    /// Decode a gzip stream, framing included.
    #[must_use]
    pub fn gzip() -> Self {
        Self {
            inflate: Decompress::new(false),
            framing: Framing::GzipHeader(GzipHeader::default()),
        }
    }

    /// Decode a zlib stream.
    #[must_use]
    pub fn zlib() -> Self {
        Self {
            inflate: Decompress::new(true),
            framing: Framing::Bare,
        }
    }

    /// Decode a raw deflate stream.
    #[must_use]
    pub fn raw() -> Self {
        Self {
            inflate: Decompress::new(false),
            framing: Framing::Bare,
        }
    }

    fn inflate_step(&mut self, input: &mut &[u8], output: &mut [u8]) -> Result<usize, BoxError> {
        let before_in = self.inflate.total_in();
        let before_out = self.inflate.total_out();
        let status = self
            .inflate
            .decompress(*input, output, FlushDecompress::None)
            .map_err(|error| OpaqueError::from_std(error).context("inflate data"))?;
        let consumed = (self.inflate.total_in() - before_in) as usize;
        let produced = (self.inflate.total_out() - before_out) as usize;
        let (_, rest) = input.split_at(consumed);
        *input = rest;

        match status {
            Status::StreamEnd => {
                self.framing = match self.framing {
                    Framing::GzipBody => Framing::GzipTrailer(8),
                    _ => Framing::Done,
                };
            }
            Status::BufError if consumed == 0 && produced == 0 && !input.is_empty() => {
                return Err(OpaqueError::from_display("inflate stalled on corrupt data").into());
            }
            Status::Ok | Status::BufError => {}
        }
        Ok(produced)
    }
}

impl Transform for InflateTransform {
    fn transform(&mut self, input: &mut &[u8], output: &mut [u8]) -> Result<usize, BoxError> {
        loop {
            match &mut self.framing {
                Framing::Bare | Framing::GzipBody => return self.inflate_step(input, output),
                Framing::GzipHeader(header) => {
                    if !header.skip(input)? {
                        return Ok(0);
                    }
                    self.framing = Framing::GzipBody;
                }
                Framing::GzipTrailer(remaining) => {
                    let n = usize::from(*remaining).min(input.len());
                    *input = &input[n..];
                    *remaining -= n as u8;
                    if *remaining > 0 {
                        return Ok(0);
                    }
                    self.framing = Framing::Done;
                }
                Framing::Done => {
                    *input = &[];
                    return Ok(0);
                }
            }
        }
    }
}

const FHCRC: u8 = 1 << 1;
const FEXTRA: u8 = 1 << 2;
const FNAME: u8 = 1 << 3;
const FCOMMENT: u8 = 1 << 4;

#[derive(Clone, Copy, Default)]
enum GzipHeaderState {
    #[default]
    Magic0,
    Magic1,
    Method,
    Flags,
    /// Fixed fields left to skip (MTIME, XFL, OS).
    Fixed(u8),
    ExtraLen0,
    ExtraLen1,
    Extra(u16),
    Name,
    Comment,
    Crc(u8),
}

/// Byte-at-a-time skipper for the gzip member header (RFC 1952).
#[derive(Default)]
struct GzipHeader {
    state: GzipHeaderState,
    flags: u8,
    extra_len: u16,
}

impl GzipHeader {
    /// Consume header bytes; `true` once the header is fully skipped.
    fn skip(&mut self, input: &mut &[u8]) -> Result<bool, BoxError> {
        use GzipHeaderState::*;

        while let Some((&byte, rest)) = input.split_first() {
            *input = rest;
            let next = match self.state {
                Magic0 if byte == 0x1F => Some(Magic1),
                Magic1 if byte == 0x8B => Some(Method),
                Magic0 | Magic1 => {
                    return Err(OpaqueError::from_display("bad gzip magic").into());
                }
                Method if byte == 8 => Some(Flags),
                Method => {
                    return Err(
                        OpaqueError::from_display("unsupported gzip compression method").into(),
                    );
                }
                Flags => {
                    self.flags = byte;
                    Some(Fixed(6))
                }
                Fixed(n) if n > 1 => Some(Fixed(n - 1)),
                Fixed(_) => self.optional_part(0),
                ExtraLen0 => {
                    self.extra_len = u16::from(byte);
                    Some(ExtraLen1)
                }
                ExtraLen1 => {
                    let len = self.extra_len | (u16::from(byte) << 8);
                    if len == 0 {
                        self.optional_part(1)
                    } else {
                        Some(Extra(len))
                    }
                }
                Extra(n) if n > 1 => Some(Extra(n - 1)),
                Extra(_) => self.optional_part(1),
                Name if byte != 0 => Some(Name),
                Name => self.optional_part(2),
                Comment if byte != 0 => Some(Comment),
                Comment => self.optional_part(3),
                Crc(n) if n > 1 => Some(Crc(n - 1)),
                Crc(_) => None,
            };
            match next {
                Some(state) => self.state = state,
                None => return Ok(true),
            }
        }
        Ok(false)
    }

    /// The next optional header part present at or after `stage`
    /// (0 = extra, 1 = name, 2 = comment, 3 = header crc); `None` when
    /// the header is complete.
    fn optional_part(&self, stage: u8) -> Option<GzipHeaderState> {
        if stage < 1 && self.flags & FEXTRA != 0 {
            Some(GzipHeaderState::ExtraLen0)
        } else if stage < 2 && self.flags & FNAME != 0 {
            Some(GzipHeaderState::Name)
        } else if stage < 3 && self.flags & FCOMMENT != 0 {
            Some(GzipHeaderState::Comment)
        } else if stage < 4 && self.flags & FHCRC != 0 {
            Some(GzipHeaderState::Crc(2))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::InternalSink;

    fn gzip_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn raw_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn drive(mut sink: TransformSink<&mut InternalSink>, wire: &[u8], step: usize) {
        for chunk in wire.chunks(step.max(1)) {
            let mut data = chunk;
            sink.handle_data(&mut data).unwrap();
            assert!(data.is_empty());
        }
    }

    #[test]
    fn passes_through_without_transform() {
        let mut captured = InternalSink::new();
        let mut sink = TransformSink::new(&mut captured);
        sink.handle_full_data(b"as-is").unwrap();
        assert_eq!(captured.content(), b"as-is");
    }

    #[test]
    fn inflates_gzip() {
        let plain = b"the quick brown fox jumps over the lazy dog".repeat(40);
        let wire = gzip_compress(&plain);
        for step in [1, 3, wire.len()] {
            let mut captured = InternalSink::new();
            let sink = TransformSink::with_transform(&mut captured, InflateTransform::gzip());
            drive(sink, &wire, step);
            assert_eq!(captured.content(), plain);
        }
    }

    #[test]
    fn inflates_zlib_and_raw_deflate() {
        let plain = b"incompressible? hardly: aaaaaaaaaaaaaaaaaaaaaaaaaaaa".repeat(16);

        let mut captured = InternalSink::new();
        let sink = TransformSink::with_transform(&mut captured, InflateTransform::zlib());
        drive(sink, &zlib_compress(&plain), 7);
        assert_eq!(captured.content(), plain);

        let mut captured = InternalSink::new();
        let sink = TransformSink::with_transform(&mut captured, InflateTransform::raw());
        drive(sink, &raw_compress(&plain), 7);
        assert_eq!(captured.content(), plain);
    }

    #[test]
    fn surplus_input_after_stream_end_is_dropped() {
        let mut wire = gzip_compress(b"payload");
        wire.extend_from_slice(b"garbage after the member");

        let mut captured = InternalSink::new();
        let mut sink = TransformSink::with_transform(&mut captured, InflateTransform::gzip());
        let mut data = &wire[..];
        sink.handle_data(&mut data).unwrap();
        assert!(data.is_empty());
        assert_eq!(captured.content(), b"payload");
    }

    #[test]
    fn rejects_bad_gzip_magic() {
        let mut captured = InternalSink::new();
        let mut sink = TransformSink::with_transform(&mut captured, InflateTransform::gzip());
        let mut data: &[u8] = b"not gzip at all";
        assert!(sink.handle_data(&mut data).is_err());
    }

    #[test]
    fn skips_gzip_name_and_extra_fields() {
        let plain = b"named";
        let deflated = raw_compress(plain);

        // Hand-built member: FEXTRA + FNAME set.
        let mut wire = vec![0x1F, 0x8B, 8, FEXTRA | FNAME, 0, 0, 0, 0, 0, 0xFF];
        wire.extend_from_slice(&[3, 0]); // XLEN
        wire.extend_from_slice(b"xyz");
        wire.extend_from_slice(b"file.txt\0");
        wire.extend_from_slice(&deflated);
        wire.extend_from_slice(&[0; 8]); // trailer, unchecked

        let mut captured = InternalSink::new();
        let sink = TransformSink::with_transform(&mut captured, InflateTransform::gzip());
        drive(sink, &wire, 2);
        assert_eq!(captured.content(), plain);
    }
}
