// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2022 Adam Lock

//! `SecurityHeader` and related wire structures (§6.1): the security
//! header is part of every chunk, carrying either the asymmetric
//! handshake material (`OPN`) or the symmetric token id (`MSG`/`CLO`).

use std::io::{Read, Write};

use opcua_types::{
    constants, ByteString, DecodingOptions, Error, EncodingResult, SimpleBinaryDecodable,
    SimpleBinaryEncodable, StatusCode, UAString,
};

use opcua_crypto::{SecurityPolicy, Thumbprint, X509};

/// Holds the security header associated with a chunk. `OPN` messages carry
/// an asymmetric header; `MSG`/`CLO` carry a symmetric one (§6.1).
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityHeader {
    /// Security header for asymmetric (`OPN`) chunks.
    Asymmetric(AsymmetricSecurityHeader),
    /// Security header for symmetric (`MSG`/`CLO`) chunks.
    Symmetric(SymmetricSecurityHeader),
}

impl SimpleBinaryEncodable for SecurityHeader {
    fn byte_len(&self) -> usize {
        match self {
            SecurityHeader::Asymmetric(value) => value.byte_len(),
            SecurityHeader::Symmetric(value) => value.byte_len(),
        }
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        match self {
            SecurityHeader::Asymmetric(value) => value.encode(stream),
            SecurityHeader::Symmetric(value) => value.encode(stream),
        }
    }
}

impl SecurityHeader {
    /// Decode the security header from a stream. The header's shape
    /// (symmetric vs. asymmetric) is determined by the message header's
    /// `msgType`, not by anything self-describing in the header itself.
    pub fn decode_from_stream<S: Read + ?Sized>(
        stream: &mut S,
        is_open_secure_channel: bool,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        if is_open_secure_channel {
            let security_header = AsymmetricSecurityHeader::decode(stream, decoding_options)?;

            let security_policy = if security_header.security_policy_uri.is_null()
                || security_header.security_policy_uri.is_empty()
            {
                SecurityPolicy::None
            } else {
                SecurityPolicy::from_uri(security_header.security_policy_uri.as_ref())
            };

            if security_policy == SecurityPolicy::Unknown {
                return Err(Error::new(
                    StatusCode::BadSecurityPolicyRejected,
                    format!(
                        "security policy of chunk is unknown: {:?}",
                        security_header.security_policy_uri
                    ),
                ));
            }

            Ok(SecurityHeader::Asymmetric(security_header))
        } else {
            let security_header = SymmetricSecurityHeader::decode(stream, decoding_options)?;
            Ok(SecurityHeader::Symmetric(security_header))
        }
    }
}

/// Security header for symmetric encryption (§6.1): just the token id
/// selecting which keyset (current/previous) decrypts the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymmetricSecurityHeader {
    /// The security token id this chunk was encoded under.
    pub token_id: u32,
}

impl SimpleBinaryEncodable for SymmetricSecurityHeader {
    fn byte_len(&self) -> usize {
        4
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        self.token_id.encode(stream)
    }
}

impl SimpleBinaryDecodable for SymmetricSecurityHeader {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let token_id = u32::decode(stream, decoding_options)?;
        Ok(SymmetricSecurityHeader { token_id })
    }
}

/// Security header for asymmetric encryption (§6.1): carries the security
/// policy URI, the sender's certificate and the thumbprint of the
/// certificate the sender expects the receiver to be using.
#[derive(Debug, Clone, PartialEq)]
pub struct AsymmetricSecurityHeader {
    /// URI of the security policy governing this channel.
    pub security_policy_uri: UAString,
    /// The sender's own certificate, or null under `SecurityPolicy::None`.
    pub sender_certificate: ByteString,
    /// Thumbprint of the certificate the sender believes the receiver
    /// holds.
    pub receiver_certificate_thumbprint: ByteString,
}

impl SimpleBinaryEncodable for AsymmetricSecurityHeader {
    fn byte_len(&self) -> usize {
        self.security_policy_uri.byte_len()
            + self.sender_certificate.byte_len()
            + self.receiver_certificate_thumbprint.byte_len()
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        self.security_policy_uri.encode(stream)?;
        self.sender_certificate.encode(stream)?;
        self.receiver_certificate_thumbprint.encode(stream)
    }
}

impl SimpleBinaryDecodable for AsymmetricSecurityHeader {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let security_policy_uri = UAString::decode(stream, decoding_options)?;
        let sender_certificate = ByteString::decode(stream, decoding_options)?;
        let receiver_certificate_thumbprint = ByteString::decode(stream, decoding_options)?;

        if sender_certificate
            .value
            .as_ref()
            .is_some_and(|v| v.len() >= constants::MAX_CERTIFICATE_LENGTH)
        {
            return Err(Error::new(
                StatusCode::BadEncodingLimitsExceeded,
                format!(
                    "sender certificate is {} bytes, exceeds the {} byte maximum",
                    sender_certificate.as_bytes().len(),
                    constants::MAX_CERTIFICATE_LENGTH
                ),
            ));
        }

        let thumbprint_len = receiver_certificate_thumbprint.as_bytes().len();
        if thumbprint_len > 0 && thumbprint_len != Thumbprint::THUMBPRINT_SIZE {
            return Err(Error::decoding(format!(
                "receiver certificate thumbprint is {thumbprint_len} bytes, expected {}",
                Thumbprint::THUMBPRINT_SIZE
            )));
        }

        Ok(AsymmetricSecurityHeader {
            security_policy_uri,
            sender_certificate,
            receiver_certificate_thumbprint,
        })
    }
}

impl AsymmetricSecurityHeader {
    /// An asymmetric header for `SecurityPolicy::None`: no certificate
    /// material at all.
    pub fn none() -> AsymmetricSecurityHeader {
        AsymmetricSecurityHeader {
            security_policy_uri: UAString::from(SecurityPolicy::None.to_uri()),
            sender_certificate: ByteString::null(),
            receiver_certificate_thumbprint: ByteString::null(),
        }
    }

    /// Build a header for the OpenSecureChannel handshake.
    pub fn new(
        security_policy: SecurityPolicy,
        sender_certificate: &X509,
        receiver_certificate_thumbprint: ByteString,
    ) -> AsymmetricSecurityHeader {
        AsymmetricSecurityHeader {
            security_policy_uri: UAString::from(security_policy.to_uri()),
            sender_certificate: sender_certificate.as_byte_string(),
            receiver_certificate_thumbprint,
        }
    }
}

/// The sequence header (§6.1): present on every chunk, symmetric or
/// asymmetric, carrying the per-chunk sequence number and the request id
/// of the logical message the chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceHeader {
    /// Monotonically increasing sequence number (§3.2, §4.4 step 3).
    pub sequence_number: u32,
    /// Correlates chunks of one logical message, and requests with
    /// responses, across the wire (glossary "Request Id").
    pub request_id: u32,
}

/// Byte length of a `SequenceHeader` (two `u32`s).
pub const SEQUENCE_HEADER_SIZE: usize = 8;

impl SimpleBinaryEncodable for SequenceHeader {
    fn byte_len(&self) -> usize {
        SEQUENCE_HEADER_SIZE
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        self.sequence_number.encode(stream)?;
        self.request_id.encode(stream)
    }
}

impl SimpleBinaryDecodable for SequenceHeader {
    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let sequence_number = u32::decode(stream, decoding_options)?;
        let request_id = u32::decode(stream, decoding_options)?;
        Ok(SequenceHeader {
            sequence_number,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_header_round_trips() {
        let header = SequenceHeader { sequence_number: 42, request_id: 7 };
        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), SEQUENCE_HEADER_SIZE);

        let decoded = SequenceHeader::decode(&mut std::io::Cursor::new(buf), &DecodingOptions::default()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn none_asymmetric_header_round_trips_as_none_policy() {
        let header = AsymmetricSecurityHeader::none();
        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();

        let decoded = SecurityHeader::decode_from_stream(&mut std::io::Cursor::new(buf), true, &DecodingOptions::default()).unwrap();
        match decoded {
            SecurityHeader::Asymmetric(h) => {
                assert!(h.sender_certificate.value.is_none());
                assert_eq!(h.security_policy_uri.as_ref(), SecurityPolicy::None.to_uri());
            }
            SecurityHeader::Symmetric(_) => panic!("expected an asymmetric header"),
        }
    }

    #[test]
    fn symmetric_header_round_trips() {
        let header = SymmetricSecurityHeader { token_id: 99 };
        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();

        let decoded = SecurityHeader::decode_from_stream(&mut std::io::Cursor::new(buf), false, &DecodingOptions::default()).unwrap();
        match decoded {
            SecurityHeader::Symmetric(h) => assert_eq!(h.token_id, 99),
            SecurityHeader::Asymmetric(_) => panic!("expected a symmetric header"),
        }
    }

    #[test]
    fn unrecognised_security_policy_uri_is_rejected() {
        let header = AsymmetricSecurityHeader {
            security_policy_uri: UAString::from("http://example.com/bogus-policy"),
            sender_certificate: ByteString::null(),
            receiver_certificate_thumbprint: ByteString::null(),
        };
        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();

        let err = SecurityHeader::decode_from_stream(&mut std::io::Cursor::new(buf), true, &DecodingOptions::default()).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadSecurityPolicyRejected);
    }

    #[test]
    fn oversized_sender_certificate_is_rejected() {
        let header = AsymmetricSecurityHeader {
            security_policy_uri: UAString::from(SecurityPolicy::Basic256Sha256.to_uri()),
            sender_certificate: ByteString { value: Some(vec![0u8; constants::MAX_CERTIFICATE_LENGTH + 1]) },
            receiver_certificate_thumbprint: ByteString::null(),
        };
        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();

        let err = SecurityHeader::decode_from_stream(&mut std::io::Cursor::new(buf), true, &DecodingOptions::default()).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadEncodingLimitsExceeded);
    }
}

