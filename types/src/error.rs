use std::fmt;

use log::{error, warn};

use crate::status_code::StatusCode;

/// Error raised anywhere in the encode/decode or secure-channel pipeline.
///
/// Carries the `StatusCode` a caller should act on plus a free-text context
/// message for logs.
#[derive(Debug, Clone)]
pub struct Error {
    status: StatusCode,
    message: String,
}

/// Result alias used throughout the encode/decode and secure-channel code.
pub type EncodingResult<T> = Result<T, Error>;

impl Error {
    /// Build an error carrying an explicit status code.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Error {
        let message = message.into();
        if status.is_bad() {
            error!("{status}: {message}");
        } else {
            warn!("{status}: {message}");
        }
        Error { status, message }
    }

    /// A malformed or truncated wire value.
    pub fn decoding(message: impl Into<String>) -> Error {
        Error::new(StatusCode::BadDecodingError, message)
    }

    /// A value that cannot be written to the wire.
    pub fn encoding(message: impl Into<String>) -> Error {
        Error::new(StatusCode::BadEncodingError, message)
    }

    /// The status code this error maps to.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The free-text context message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::new(StatusCode::BadCommunicationError, e.to_string())
    }
}

/// Turns an I/O result from a decode path into an `EncodingResult<()>`,
/// mapping any I/O failure to `BadDecodingError`.
pub fn process_decode_io_result(result: std::io::Result<()>) -> EncodingResult<()> {
    result.map_err(|e| Error::new(StatusCode::BadDecodingError, e.to_string()))
}

/// Turns an I/O result from an encode path into an `EncodingResult<()>`,
/// mapping any I/O failure to `BadEncodingError`.
pub fn process_encode_io_result(result: std::io::Result<()>) -> EncodingResult<()> {
    result.map_err(|e| Error::new(StatusCode::BadEncodingError, e.to_string()))
}
