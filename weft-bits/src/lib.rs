//! Fixed-width binary codecs.
//!
//! This crate converts typed values to and from their wire representation
//! at system boundaries that speak third-party binary formats (archive
//! headers, legacy records, and the like).
//!
//! Three layers build on each other:
//!
//! - the [`Packed`] trait describes one fixed-width wire element: how many
//!   bytes it occupies and how a value moves in and out of them;
//! - value wrapper types ([`U16`], [`I32`], [`FixedString`], …) store the
//!   raw bytes themselves, so a `#[repr(C)]` struct of wrappers *is* the
//!   wire layout, independent of host endianness and alignment;
//! - [`pack_array`] and [`unpack_array`] move whole runs of elements,
//!   zero-filling short runs instead of failing.
//!
//! ```rust
//! use weft_bits::{BE, LE, U16, U32};
//!
//! let word = U16::<LE>::from(0x1234);
//! assert_eq!(word.as_bytes(), &[0x34, 0x12]);
//! assert_eq!(U32::<BE>::from_bytes([0, 0, 0x12, 0x34]).get(), 0x1234);
//! ```

mod fixed;
mod pack;
mod value;

pub use fixed::{FixedString, pack_fixed_string, unpack_fixed_string};
pub use pack::{I8, Packed, U8, pack_array, unpack_array};
pub use value::{I16, I32, I64, U16, U32, U64};

pub use byteorder::{BE, BigEndian, ByteOrder, LE, LittleEndian};
