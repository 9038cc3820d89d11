//! Push-style data processing.
//!
//! The one abstraction here is [`DataSink`]: a synchronous byte consumer
//! with a single `handle_data` entry point. Transports push bytes into a
//! sink; the sink consumes what it wants, advances the caller's slice,
//! and reports whether it is complete. Because every stage — buffering,
//! length limiting, decompression, capture, protocol framing — speaks
//! the same contract, stages stack into pipelines without any stage
//! having to materialize the whole stream.
//!
//! ```rust
//! use weft_io::{DataSink, InternalSink, LimitedSink};
//!
//! let mut captured = InternalSink::new();
//! let mut limited = LimitedSink::new(&mut captured, 5);
//!
//! let mut data: &[u8] = b"hello world";
//! assert!(limited.handle_data(&mut data).unwrap());
//! assert_eq!(data, b" world");
//! assert_eq!(captured.content(), b"hello");
//! ```

mod buffered;
mod internal;
mod limited;
mod sink;
mod text;
mod transform;

pub use buffered::BufferedSink;
pub use internal::InternalSink;
pub use limited::LimitedSink;
pub use sink::DataSink;
pub use text::TextSink;
pub use transform::{InflateTransform, Transform, TransformSink};

pub use weft_error::{BoxError, ErrorContext, OpaqueError};
