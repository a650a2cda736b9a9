//! `String` and `ByteString` as encoded on the wire: an `Int32` length
//! prefix (`-1` denotes the null value) followed by that many bytes.

use std::io::{Read, Write};

use crate::encoding::{DecodingOptions, SimpleBinaryDecodable, SimpleBinaryEncodable};
use crate::error::{Error, EncodingResult};
use crate::status_code::StatusCode;

fn encode_opt_bytes<S: Write + ?Sized>(stream: &mut S, bytes: Option<&[u8]>) -> EncodingResult<()> {
    match bytes {
        None => (-1i32).encode(stream),
        Some(bytes) => {
            (bytes.len() as i32).encode(stream)?;
            stream.write_all(bytes).map_err(Into::into)
        }
    }
}

fn decode_opt_bytes<S: Read + ?Sized>(
    stream: &mut S,
    max_len: usize,
) -> EncodingResult<Option<Vec<u8>>> {
    let len = i32::decode(stream, &DecodingOptions::default())?;
    if len < 0 {
        Ok(None)
    } else {
        let len = len as usize;
        if max_len > 0 && len > max_len {
            return Err(Error::new(
                StatusCode::BadEncodingLimitsExceeded,
                format!("string/bytestring length {len} exceeds limit {max_len}"),
            ));
        }
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf)?;
        Ok(Some(buf))
    }
}

/// A UTF-8 string, nullable, length-prefixed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UAString {
    value: Option<String>,
}

impl UAString {
    /// The null string (encodes as length `-1`).
    pub fn null() -> UAString {
        UAString { value: None }
    }

    /// `true` if this is the null string.
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// `true` for the null string or the empty string.
    pub fn is_empty(&self) -> bool {
        self.value.as_ref().is_none_or(|v| v.is_empty())
    }
}

impl From<&str> for UAString {
    fn from(s: &str) -> Self {
        UAString {
            value: Some(s.to_string()),
        }
    }
}

impl From<String> for UAString {
    fn from(s: String) -> Self {
        UAString { value: Some(s) }
    }
}

impl AsRef<str> for UAString {
    fn as_ref(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

impl SimpleBinaryEncodable for UAString {
    fn byte_len(&self) -> usize {
        4 + self.value.as_ref().map_or(0, |v| v.len())
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        encode_opt_bytes(stream, self.value.as_ref().map(|v| v.as_bytes()))
    }
}

impl SimpleBinaryDecodable for UAString {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let bytes = decode_opt_bytes(stream, decoding_options.max_array_length)?;
        match bytes {
            None => Ok(UAString::null()),
            Some(bytes) => {
                let s = String::from_utf8(bytes)
                    .map_err(|e| Error::decoding(format!("string is not valid utf-8: {e}")))?;
                Ok(UAString::from(s))
            }
        }
    }
}

/// An opaque byte sequence, nullable, length-prefixed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteString {
    /// `None` is the null `ByteString`; `Some(vec![])` is the empty one.
    pub value: Option<Vec<u8>>,
}

impl ByteString {
    /// The null byte string.
    pub fn null() -> ByteString {
        ByteString { value: None }
    }

    /// `true` if this is the null byte string.
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Borrow the bytes, or an empty slice for the null value.
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_deref().unwrap_or(&[])
    }

    /// Copy the bytes out, or an empty vec for the null value.
    pub fn to_vec(&self) -> Vec<u8> {
        self.value.clone().unwrap_or_default()
    }
}

impl From<&[u8]> for ByteString {
    fn from(bytes: &[u8]) -> Self {
        ByteString {
            value: Some(bytes.to_vec()),
        }
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(bytes: Vec<u8>) -> Self {
        ByteString { value: Some(bytes) }
    }
}

impl SimpleBinaryEncodable for ByteString {
    fn byte_len(&self) -> usize {
        4 + self.value.as_ref().map_or(0, |v| v.len())
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        encode_opt_bytes(stream, self.value.as_deref())
    }
}

impl SimpleBinaryDecodable for ByteString {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let value = decode_opt_bytes(stream, decoding_options.max_byte_string_length)?;
        Ok(ByteString { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn null_string_round_trips() {
        let s = UAString::null();
        let mut buf = Vec::new();
        s.encode(&mut buf).unwrap();
        assert_eq!(buf, (-1i32).to_le_bytes());
        let decoded = UAString::decode(&mut Cursor::new(buf), &DecodingOptions::default()).unwrap();
        assert!(decoded.is_null());
    }

    #[test]
    fn byte_string_round_trips() {
        let bs = ByteString::from(&b"hello"[..]);
        let mut buf = Vec::new();
        bs.encode(&mut buf).unwrap();
        let decoded =
            ByteString::decode(&mut Cursor::new(buf), &DecodingOptions::default()).unwrap();
        assert_eq!(decoded.as_bytes(), b"hello");
    }
}
