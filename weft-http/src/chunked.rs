use weft_error::BoxError;
use weft_io::DataSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Reading the hex chunk size.
    ChunkSize,
    /// Skipping a chunk extension up to the line end.
    Extension,
    /// Forwarding chunk payload bytes.
    Payload,
    /// Skipping the line end after a chunk payload.
    PayloadEnd,
    /// Inside the trailer; a blank line ends the body.
    Trailer,
    /// Skipping one trailer header line.
    TrailerHeader,
    /// Body complete.
    Final,
}

/// Decoder for the RFC 2616 chunked transfer encoding.
///
/// Sits between the transport and a payload sink: chunk framing is
/// consumed here, payload bytes are forwarded to the peer. Chunk
/// extensions and trailer headers are skipped. After the terminating
/// zero-sized chunk the decoder is complete; bytes offered past that
/// point stay in the caller's slice.
///
/// The decoder is deliberately lenient: stray bytes in the size line
/// are ignored rather than rejected, and a lone LF delimits lines just
/// as well as CRLF.
pub struct ChunkedSink<S: DataSink> {
    peer: S,
    state: State,
    size: u64,
}

impl<S: DataSink> ChunkedSink<S> {
    /// Decode chunked data into `peer`.
    pub fn new(peer: S) -> Self {
        Self {
            peer,
            state: State::ChunkSize,
            size: 0,
        }
    }

    /// Give back the peer.
    pub fn into_inner(self) -> S {
        self.peer
    }

    /// Consume bytes until LF, switching to `next`.
    fn skip_line(data: &mut &[u8]) -> bool {
        match data.iter().position(|&b| b == b'\n') {
            Some(lf) => {
                *data = &data[lf + 1..];
                true
            }
            None => {
                *data = &[];
                false
            }
        }
    }
}

impl<S: DataSink> DataSink for ChunkedSink<S> {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        while self.state != State::Final && !data.is_empty() {
            match self.state {
                State::ChunkSize => {
                    while let Some((&byte, rest)) = data.split_first() {
                        *data = rest;
                        match byte {
                            b'0'..=b'9' => {
                                self.size =
                                    self.size.wrapping_mul(16).wrapping_add(u64::from(byte - b'0'));
                            }
                            b'A'..=b'F' => {
                                self.size = self
                                    .size
                                    .wrapping_mul(16)
                                    .wrapping_add(u64::from(byte - b'A' + 10));
                            }
                            b'a'..=b'f' => {
                                self.size = self
                                    .size
                                    .wrapping_mul(16)
                                    .wrapping_add(u64::from(byte - b'a' + 10));
                            }
                            b';' => {
                                self.state = State::Extension;
                                break;
                            }
                            b'\n' => {
                                self.state = if self.size == 0 {
                                    State::Trailer
                                } else {
                                    State::Payload
                                };
                                break;
                            }
                            // Should be CR; anything else is junk that
                            // robustness tells us to skip.
                            _ => {}
                        }
                    }
                }
                State::Extension => {
                    if Self::skip_line(data) {
                        self.state = if self.size == 0 {
                            State::Trailer
                        } else {
                            State::Payload
                        };
                    }
                }
                State::Payload => {
                    let n = usize::try_from(self.size).unwrap_or(usize::MAX).min(data.len());
                    let (payload, rest) = data.split_at(n);
                    let mut payload = payload;
                    self.peer.handle_data(&mut payload)?;
                    *data = rest;
                    self.size -= n as u64;
                    if self.size == 0 {
                        self.state = State::PayloadEnd;
                    }
                }
                State::PayloadEnd => {
                    if Self::skip_line(data) {
                        self.state = State::ChunkSize;
                    }
                }
                State::Trailer => {
                    while let Some((&byte, rest)) = data.split_first() {
                        *data = rest;
                        match byte {
                            b'\r' => {}
                            b'\n' => {
                                self.state = State::Final;
                                break;
                            }
                            _ => {
                                self.state = State::TrailerHeader;
                                break;
                            }
                        }
                    }
                }
                State::TrailerHeader => {
                    if Self::skip_line(data) {
                        self.state = State::Trailer;
                    }
                }
                State::Final => {}
            }
        }
        Ok(self.state == State::Final)
    }
}
