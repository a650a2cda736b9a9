//! Wire-format limits referenced by the chunk codec (§4.4, §6.1).

/// Maximum accepted length, in bytes, of a DER-encoded certificate carried
/// in an `AsymmetricSecurityHeader.senderCertificate` (§6.1).
pub const MAX_CERTIFICATE_LENGTH: usize = 32768;

/// Minimum chunk size the TCP-UA transport negotiation will ever agree to
/// (OPC UA Part 6); chunk sizes below this make the header + signature +
/// minimum padding arithmetic in `body_size_from_message_size` degenerate.
pub const MIN_CHUNK_SIZE: usize = 8192;

/// Default maximum chunk size when the transport's `HEL`/`ACK` negotiation
/// has not overridden it.
pub const DEFAULT_CHUNK_SIZE: usize = 65535;
