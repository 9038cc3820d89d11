//! Weft is an application foundation library with a streaming HTTP
//! protocol core.
//!
//! This facade crate re-exports the workspace members under stable
//! module paths, so that `weft::http::ClientResponse` and friends can
//! be used without depending on each member crate individually.
//!
//! The protocol core is built around one abstraction:
//! [`DataSink`][`crate::io::DataSink`], a synchronous push-style byte
//! consumer. Parsers, decoders, buffers and limiters all implement it,
//! which is what lets transport, decompression and framing stack into a
//! pipeline without intermediate copies of whole messages.

#[doc(inline)]
pub use weft_bits as bits;

#[doc(inline)]
pub use weft_error as error;

#[doc(inline)]
pub use weft_http as http;

#[doc(inline)]
pub use weft_io as io;

#[doc(inline)]
pub use weft_net as net;
