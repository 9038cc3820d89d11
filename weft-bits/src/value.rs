use std::fmt;
use std::marker::PhantomData;

use byteorder::{ByteOrder, LittleEndian};

use crate::Packed;

macro_rules! packed_int {
    ($name:ident, $word:ty, $size:literal, $read:ident, $write:ident) => {
        #[doc = concat!("A `", stringify!($word), "` stored as ", stringify!($size), " wire bytes in byte order `O`.")]
        ///
        /// The wrapper holds the raw bytes, so a `#[repr(C)]` struct of
        /// wrappers has the exact size and layout of the wire record.
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name<O: ByteOrder = LittleEndian> {
            bytes: [u8; $size],
            _order: PhantomData<O>,
        }

        impl<O: ByteOrder> $name<O> {
            /// Wrap raw wire bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; $size]) -> Self {
                Self {
                    bytes,
                    _order: PhantomData,
                }
            }

            /// The raw wire bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; $size] {
                &self.bytes
            }

            /// Decode the stored value.
            #[must_use]
            pub fn get(&self) -> $word {
                O::$read(&self.bytes)
            }

            /// Encode and store a value.
            pub fn set(&mut self, word: $word) {
                O::$write(&mut self.bytes, word);
            }
        }

        impl<O: ByteOrder> Default for $name<O> {
            fn default() -> Self {
                Self::from_bytes([0; $size])
            }
        }

        impl<O: ByteOrder> From<$word> for $name<O> {
            fn from(word: $word) -> Self {
                let mut value = Self::default();
                value.set(word);
                value
            }
        }

        impl<O: ByteOrder> From<$name<O>> for $word {
            fn from(value: $name<O>) -> Self {
                value.get()
            }
        }

        impl<O: ByteOrder> fmt::Debug for $name<O> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.get()).finish()
            }
        }

        impl<O: ByteOrder> Packed for $name<O> {
            type Word = $word;

            const SIZE: usize = $size;

            fn read(src: &[u8]) -> $word {
                O::$read(src)
            }

            fn write(dst: &mut [u8], word: &$word) {
                O::$write(dst, *word);
            }
        }
    };
}

packed_int!(U16, u16, 2, read_u16, write_u16);
packed_int!(I16, i16, 2, read_i16, write_i16);
packed_int!(U32, u32, 4, read_u32, write_u32);
packed_int!(I32, i32, 4, read_i32, write_i32);
packed_int!(U64, u64, 8, read_u64, write_u64);
packed_int!(I64, i64, 8, read_i64, write_i64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BE, LE};

    #[test]
    fn unpack_signed_border_cases() {
        assert_eq!(I16::<BE>::from_bytes([2, 1]).get(), 0x0201);
        assert_eq!(I16::<BE>::from_bytes([0, 0]).get(), 0);
        assert_eq!(I16::<BE>::from_bytes([0xFF, 0xFF]).get(), -1);
        assert_eq!(I16::<BE>::from_bytes([0x80, 0x00]).get(), -0x8000);
        assert_eq!(I16::<BE>::from_bytes([0x00, 0xFF]).get(), 0x00FF);
        assert_eq!(I16::<BE>::from_bytes([0x7F, 0xFF]).get(), 0x7FFF);

        assert_eq!(I16::<LE>::from_bytes([0xFF, 0x7F]).get(), 0x7FFF);
        assert_eq!(I64::<LE>::from_bytes([0xFF; 8]).get(), -1);
    }

    #[test]
    fn pack_signed_border_cases() {
        assert_eq!(I16::<BE>::from(0).as_bytes(), &[0, 0]);
        assert_eq!(I16::<BE>::from(-1).as_bytes(), &[0xFF, 0xFF]);
        assert_eq!(I16::<BE>::from(-0x8000).as_bytes(), &[0x80, 0x00]);
        assert_eq!(I16::<BE>::from(0x1234).as_bytes(), &[0x12, 0x34]);
        assert_eq!(I16::<BE>::from(255).as_bytes(), &[0x00, 0xFF]);

        assert_eq!(I32::<LE>::from(i32::MIN).as_bytes(), &[0, 0, 0, 0x80]);
        assert_eq!(I64::<BE>::from(i64::MIN).as_bytes(), &[0x80, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn unsigned_both_orders() {
        assert_eq!(U16::<LE>::from_bytes([0x12, 0x34]).get(), 0x3412);
        assert_eq!(U16::<BE>::from_bytes([0x12, 0x34]).get(), 0x1234);
        assert_eq!(U32::<LE>::from(0xDEADBEEF).as_bytes(), &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(U64::<BE>::from(1).as_bytes(), &[0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn value_semantics() {
        let mut value = U32::<LE>::default();
        assert_eq!(value.get(), 0);
        value.set(0x01020304);
        assert_eq!(u32::from(value), 0x01020304);
        assert_eq!(value, U32::<LE>::from(0x01020304));
    }

    quickcheck::quickcheck! {
        fn roundtrip_u16(word: u16) -> bool {
            U16::<LE>::from(word).get() == word && U16::<BE>::from(word).get() == word
        }

        fn roundtrip_i32(word: i32) -> bool {
            I32::<LE>::from(word).get() == word && I32::<BE>::from(word).get() == word
        }

        fn roundtrip_u64(word: u64) -> bool {
            U64::<LE>::from(word).get() == word && U64::<BE>::from(word).get() == word
        }
    }
}
