//! TCP-UA message-type and chunk-marker byte constants (§6.1).

/// `HEL` — transport-layer hello, out of scope here (§4.4 step 1).
pub const HELLO_MESSAGE: &[u8] = b"HEL";
/// `ACK` — transport-layer acknowledge, out of scope here.
pub const ACKNOWLEDGE_MESSAGE: &[u8] = b"ACK";
/// `ERR` — transport-layer error, out of scope here.
pub const ERROR_MESSAGE: &[u8] = b"ERR";
/// `OPN` — OpenSecureChannel, asymmetric security (§4.4 step 1).
pub const OPEN_SECURE_CHANNEL_MESSAGE: &[u8] = b"OPN";
/// `MSG` — an ordinary service message, symmetric security.
pub const CHUNK_MESSAGE: &[u8] = b"MSG";
/// `CLO` — CloseSecureChannel, symmetric security.
pub const CLOSE_SECURE_CHANNEL_MESSAGE: &[u8] = b"CLO";

/// `'C'` — an intermediate chunk; more chunks follow (§6.1).
pub const CHUNK_INTERMEDIATE: u8 = b'C';
/// `'F'` — the final chunk of a logical message.
pub const CHUNK_FINAL: u8 = b'F';
/// `'A'` — the final chunk when the message is being aborted.
pub const CHUNK_FINAL_ERROR: u8 = b'A';

/// Minimum chunk size (§2 component table, `opcua_types::constants`).
pub use opcua_types::constants::MIN_CHUNK_SIZE;
