//! Network message primitives: URLs, header fields and tables, and the
//! incremental MIME header parser they plug into.
//!
//! Everything here is transport-agnostic. The header parser implements
//! the [`DataSink`][weft_io::DataSink] contract so it can sit directly
//! in a receive pipeline; the header table knows how to write itself
//! back out through any sink.

mod consumer;
mod encoding;
mod field;
mod params;
mod parser;
mod table;
mod url;

pub use consumer::HeaderConsumer;
pub use encoding::{decode_component, encode_component};
pub use field::{HeaderField, ParseMode};
pub use params::ParameterEncoder;
pub use parser::HeaderParser;
pub use table::HeaderTable;
pub use url::{InvalidUrl, Url, match_arguments, match_path};
