//! OPC UA `StatusCode` — a 32-bit value whose two high bits carry severity
//! (`Good`, `Uncertain`, `Bad`) and whose remaining bits identify the
//! specific condition. Only the subset of codes the secure channel layer
//! raises or inspects is enumerated here.

use std::fmt;
use std::io::{Read, Write};

use crate::encoding::{DecodingOptions, SimpleBinaryDecodable, SimpleBinaryEncodable};
use crate::error::EncodingResult;

/// A status/result code as carried on the wire and through this crate's
/// `Result`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u32);

impl SimpleBinaryEncodable for StatusCode {
    fn byte_len(&self) -> usize {
        4
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<()> {
        self.0.encode(stream)
    }
}

impl SimpleBinaryDecodable for StatusCode {
    fn decode<S: Read + ?Sized>(stream: &mut S, decoding_options: &DecodingOptions) -> EncodingResult<Self> {
        Ok(StatusCode(u32::decode(stream, decoding_options)?))
    }
}

macro_rules! status_codes {
    ($( $name:ident = $value:expr, $doc:expr ;)*) => {
        impl StatusCode {
            $(
                #[doc = $doc]
                pub const $name: StatusCode = StatusCode($value);
            )*

            /// Human readable name of a well-known code, or `None` for an
            /// unrecognised value.
            pub fn name(&self) -> Option<&'static str> {
                match *self {
                    $( StatusCode::$name => Some(stringify!($name)), )*
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    Good = 0x0000_0000, "The operation succeeded.";
    Uncertain = 0x4000_0000, "The operation succeeded but with a reduced confidence.";
    Bad = 0x8000_0000, "The operation failed.";

    BadUnexpectedError = 0x8001_0000, "An unexpected error occurred.";
    BadInvalidArgument = 0x8002_0000, "An argument was invalid.";
    BadNotConnected = 0x8003_0000, "The operation could not complete because the object was closed.";
    BadConnectionClosed = 0x8004_0000, "The network connection has been closed.";
    BadCommunicationError = 0x8005_0000, "A low level communication error occurred.";
    BadTimeout = 0x800A_0000, "The operation timed out.";
    BadInvalidState = 0x8010_0000, "The connection is in a state that does not allow the operation.";

    BadEncodingError = 0x8021_0000, "An error occurred while encoding a message.";
    BadDecodingError = 0x8022_0000, "An error occurred while decoding a message.";
    BadEncodingLimitsExceeded = 0x8023_0000, "The message encoding/decoding limits imposed by the stack have been exceeded.";
    BadRequestTooLarge = 0x80B8_0000, "The request message size exceeds the limit set by the server.";
    BadResponseTooLarge = 0x80B9_0000, "The response message size exceeds the limit set by the client.";

    BadTcpMessageTypeInvalid = 0x8063_0000, "The type of the message specified in the header invalid.";
    BadTcpMessageTooLarge = 0x8065_0000, "The size of the message chunk specified in the header is too large.";
    BadTcpSecureChannelUnknown = 0x8066_0000, "The secure channel id in the header does not match any known channel.";

    BadSecurityChecksFailed = 0x8130_0000, "An error occurred verifying security.";
    BadSecurityPolicyRejected = 0x80E9_0000, "The security policy does not meet the requirements.";
    BadSecurityModeRejected = 0x80E1_0000, "The security mode does not meet the requirements set by the server.";
    BadCertificateInvalid = 0x8006_0000, "The certificate provided as a parameter is not valid.";
    BadCertificateUntrusted = 0x8018_0000, "The certificate is not trusted.";
    BadCertificateTimeInvalid = 0x8012_0000, "The certificate has expired or is not yet valid.";
    BadCertificateRevoked = 0x8016_0000, "The certificate has been revoked.";
    BadCertificateChainIncomplete = 0x810D_0000, "The certificate chain is incomplete.";
    BadApplicationSignatureInvalid = 0x801D_0000, "The signature generated with the client certificate is missing or invalid.";
    BadNonceInvalid = 0x8023_1000, "The nonce does not have the correct length or is not random enough.";

    BadSequenceNumberInvalid = 0x8026_0000, "The sequence number is not valid.";
    BadSecureChannelTokenUnknown = 0x8071_0000, "The token has expired or is not recognized.";
    BadSecureChannelIdInvalid = 0x8087_0000, "The secure channel id is not valid.";
    BadRequestIdInvalid = 0x8088_0000, "The request id does not match the one expected for the in-progress message.";
    BadTooManyOperations = 0x8029_0000, "Too many chunks are outstanding for a single message.";
    BadDataTypeIdUnknown = 0x8003_D000, "The binary encoding id used to encode the message is not recognised.";

    BadConnectionRejected = 0x807E_0000, "Could not establish a network connection to the remote endpoint.";
}

impl StatusCode {
    /// `true` if the two high bits indicate a failure (`10` or `11`).
    pub fn is_bad(&self) -> bool {
        self.0 & 0xC000_0000 == 0x8000_0000
    }

    /// `true` if this is `Good` (zero).
    pub fn is_good(&self) -> bool {
        self.0 == 0
    }

    /// `true` if the two high bits indicate reduced confidence (`01`).
    pub fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::Good
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:08X})", self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_bits_classify_well_known_codes() {
        assert!(StatusCode::Good.is_good());
        assert!(!StatusCode::Good.is_bad());

        assert!(StatusCode::Uncertain.is_uncertain());
        assert!(!StatusCode::Uncertain.is_bad());

        assert!(StatusCode::BadSecurityChecksFailed.is_bad());
        assert!(!StatusCode::BadSecurityChecksFailed.is_good());
    }

    #[test]
    fn name_is_known_for_declared_codes_and_absent_otherwise() {
        assert_eq!(StatusCode::BadSequenceNumberInvalid.name(), Some("BadSequenceNumberInvalid"));
        assert_eq!(StatusCode(0xDEAD_0000).name(), None);
    }

    #[test]
    fn default_is_good() {
        assert_eq!(StatusCode::default(), StatusCode::Good);
    }

    #[test]
    fn status_code_round_trips_on_the_wire() {
        let mut buf = Vec::new();
        StatusCode::BadSequenceNumberInvalid.encode(&mut buf).unwrap();
        assert_eq!(buf, 0x8026_0000u32.to_le_bytes());
        let decoded = StatusCode::decode(&mut std::io::Cursor::new(buf), &DecodingOptions::default()).unwrap();
        assert_eq!(decoded, StatusCode::BadSequenceNumberInvalid);
    }
}
