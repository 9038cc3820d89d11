use weft_error::BoxError;

use crate::DataSink;

const BUFFER_SIZE: usize = 1024;

/// A sink that combines small writes into larger downstream blocks.
///
/// Writes that are already at least one buffer large bypass the buffer
/// entirely (when nothing is pending). The buffer is flushed when full,
/// on [`BufferedSink::flush`], and on drop (best effort).
///
/// `handle_data` itself never fails: a downstream error on the implicit
/// flush path is recorded and reported by the next explicit `flush`
/// call, so producers can keep formatting output without checking every
/// small write. Dropping the sink after a failure is safe.
pub struct BufferedSink<S: DataSink> {
    sink: S,
    buffer: Box<[u8; BUFFER_SIZE]>,
    fill: usize,
    deferred: Option<BoxError>,
}

impl<S: DataSink> BufferedSink<S> {
    /// Create a buffered front-end for `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            buffer: Box::new([0; BUFFER_SIZE]),
            fill: 0,
            deferred: None,
        }
    }

    /// Write all pending data downstream, even if the buffer is not full.
    ///
    /// Reports the first error seen since the previous flush, including
    /// errors recorded while `handle_data` flushed implicitly.
    pub fn flush(&mut self) -> Result<(), BoxError> {
        self.flush_buffer();
        match self.deferred.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn flush_buffer(&mut self) {
        if self.fill != 0 {
            let pending = &self.buffer[..self.fill];
            if let Err(error) = self.sink.handle_full_data(pending) {
                self.deferred.get_or_insert(error);
            }
            self.fill = 0;
        }
    }
}

impl<S: DataSink> DataSink for BufferedSink<S> {
    fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
        while !data.is_empty() {
            if self.fill == 0 && data.len() >= BUFFER_SIZE {
                // Large block, nothing pending: pass it through.
                if let Err(error) = self.sink.handle_full_data(data) {
                    self.deferred.get_or_insert(error);
                }
                *data = &[];
            } else {
                let n = (BUFFER_SIZE - self.fill).min(data.len());
                self.buffer[self.fill..self.fill + n].copy_from_slice(&data[..n]);
                self.fill += n;
                *data = &data[n..];
                if self.fill >= BUFFER_SIZE {
                    self.flush_buffer();
                }
            }
        }
        Ok(false)
    }
}

impl<S: DataSink> Drop for BufferedSink<S> {
    fn drop(&mut self) {
        self.flush_buffer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InternalSink;
    use weft_error::OpaqueError;

    /// Records write sizes; optionally fails every write.
    struct Recorder {
        writes: Vec<usize>,
        fail: bool,
    }

    impl DataSink for Recorder {
        fn handle_data(&mut self, data: &mut &[u8]) -> Result<bool, BoxError> {
            if self.fail {
                return Err(OpaqueError::from_display("downstream rejected data").into());
            }
            self.writes.push(data.len());
            *data = &[];
            Ok(false)
        }
    }

    #[test]
    fn combines_small_writes() {
        let mut inner = InternalSink::new();
        {
            let mut buffered = BufferedSink::new(&mut inner);
            for chunk in [&b"hel"[..], b"lo ", b"wor", b"ld"] {
                let mut data = chunk;
                buffered.handle_data(&mut data).unwrap();
            }
            buffered.flush().unwrap();
        }
        assert_eq!(inner.content(), b"hello world");
    }

    #[test]
    fn large_write_bypasses_buffer() {
        let mut recorder = Recorder {
            writes: Vec::new(),
            fail: false,
        };
        {
            let mut buffered = BufferedSink::new(&mut recorder);
            buffered.handle_data(&mut &b"ab"[..]).unwrap();
            buffered.flush().unwrap();
            let big = vec![0u8; 4 * BUFFER_SIZE];
            buffered.handle_data(&mut &big[..]).unwrap();
        }
        assert_eq!(recorder.writes, vec![2, 4 * BUFFER_SIZE]);
    }

    #[test]
    fn fills_buffer_before_writing() {
        let mut recorder = Recorder {
            writes: Vec::new(),
            fail: false,
        };
        {
            let mut buffered = BufferedSink::new(&mut recorder);
            let chunk = vec![0u8; 700];
            buffered.handle_data(&mut &chunk[..]).unwrap();
            buffered.handle_data(&mut &chunk[..]).unwrap();
            buffered.flush().unwrap();
        }
        assert_eq!(recorder.writes, vec![BUFFER_SIZE, 1400 - BUFFER_SIZE]);
    }

    #[test]
    fn downstream_error_surfaces_on_flush_only() {
        let mut recorder = Recorder {
            writes: Vec::new(),
            fail: true,
        };
        let mut buffered = BufferedSink::new(&mut recorder);

        // Implicit flushes swallow the failure.
        let chunk = vec![1u8; BUFFER_SIZE];
        buffered.handle_data(&mut &chunk[..]).unwrap();
        buffered.handle_data(&mut &b"tail"[..]).unwrap();

        // The explicit flush reports it, once.
        assert!(buffered.flush().is_err());
        assert!(buffered.flush().is_ok());
    }
}
