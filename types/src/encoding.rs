//! Binary encode/decode traits and primitive helpers.
//!
//! OPC UA Binary is little-endian throughout (§6.1). Every wire type in this
//! crate implements [`SimpleBinaryEncodable`] and, where it can be decoded
//! without external context, [`SimpleBinaryDecodable`].

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::EncodingResult;

/// Options threaded through decode calls, bounding resource use against
/// malicious or malformed input (§7 `TooManyChunks` / `MessageTooLarge`).
#[derive(Debug, Clone)]
pub struct DecodingOptions {
    /// Maximum size in bytes of a single decoded message body. Zero means
    /// unbounded.
    pub max_message_size: usize,
    /// Maximum number of chunks a single logical message may be split into.
    pub max_chunk_count: usize,
    /// Maximum permitted size of an array length prefix / string length.
    pub max_array_length: usize,
    /// Maximum permitted size of a `ByteString`.
    pub max_byte_string_length: usize,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        DecodingOptions {
            max_message_size: 64 * 1024 * 1024,
            max_chunk_count: 64,
            max_array_length: 64 * 1024,
            max_byte_string_length: 64 * 1024 * 1024,
        }
    }
}

/// A value that can be written to the wire in OPC UA Binary encoding.
pub trait SimpleBinaryEncodable {
    /// The exact number of bytes `encode` will write.
    fn byte_len(&self) -> usize;

    /// Write `self` to `stream`.
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()>;
}

/// A value that can be parsed out of an OPC UA Binary stream.
pub trait SimpleBinaryDecodable: Sized {
    /// Read `Self` from `stream`, honouring `decoding_options`'s resource
    /// bounds.
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self>;
}

macro_rules! impl_primitive {
    ($t:ty, $read:ident, $write:ident) => {
        impl SimpleBinaryEncodable for $t {
            fn byte_len(&self) -> usize {
                std::mem::size_of::<$t>()
            }

            fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
                stream.$write::<LittleEndian>(*self).map_err(Into::into)
            }
        }

        impl SimpleBinaryDecodable for $t {
            fn decode<S: Read + ?Sized>(
                stream: &mut S,
                _decoding_options: &DecodingOptions,
            ) -> EncodingResult<Self> {
                stream.$read::<LittleEndian>().map_err(Into::into)
            }
        }
    };
}

impl_primitive!(u16, read_u16, write_u16);
impl_primitive!(u32, read_u32, write_u32);
impl_primitive!(u64, read_u64, write_u64);
impl_primitive!(i32, read_i32, write_i32);
impl_primitive!(i64, read_i64, write_i64);

impl SimpleBinaryEncodable for u8 {
    fn byte_len(&self) -> usize {
        1
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        stream.write_u8(*self).map_err(Into::into)
    }
}

impl SimpleBinaryDecodable for u8 {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        _decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        stream.read_u8().map_err(Into::into)
    }
}

/// Read a `u8` directly, bypassing the trait (handy in hot chunk-header
/// decode paths that the pack's `async-opcua` writes this way).
pub fn read_u8<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<u8> {
    stream.read_u8().map_err(Into::into)
}

/// Read a `u32` directly.
pub fn read_u32<S: Read + ?Sized>(stream: &mut S) -> EncodingResult<u32> {
    stream.read_u32::<LittleEndian>().map_err(Into::into)
}

/// Write a `u8` directly.
pub fn write_u8<S: Write + ?Sized>(stream: &mut S, value: u8) -> EncodingResult<()> {
    stream.write_u8(value).map_err(Into::into)
}

/// Write a `u32` directly.
pub fn write_u32<S: Write + ?Sized>(stream: &mut S, value: u32) -> EncodingResult<()> {
    stream.write_u32::<LittleEndian>(value).map_err(Into::into)
}

/// `hexlify`/`unhexlify` — byte-string <-> lowercase hex, used by log output
/// and by the §8 test vectors.
pub fn hexlify(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Inverse of [`hexlify`]. Fails on odd length or non-hex digits.
pub fn unhexlify(hex: &str) -> EncodingResult<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(crate::error::Error::decoding(
            "hex string has an odd number of digits",
        ));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| crate::error::Error::decoding(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let bytes = b"\x00 Test \xFF";
        let hex = hexlify(bytes);
        assert_eq!(hex, "00205465737420ff");
        assert_eq!(unhexlify(&hex).unwrap(), bytes);
    }
}
