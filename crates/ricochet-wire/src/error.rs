//! Wire error types

use thiserror::Error;

/// Wire layer errors
#[derive(Debug, Error)]
pub enum WireError {
    /// The stream ended mid-frame or before a frame started
    #[error("Connection closed")]
    ConnectionClosed,

    /// IO error other than a clean close
    #[error("IO error: {0}")]
    Io(std::io::Error),

    /// The peer violated the framing rules
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Outbound payload exceeds the frame limit
    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    /// A record failed to serialize
    #[error("Encode error: {0}")]
    Encode(String),

    /// A record failed to parse
    #[error("Decode error: {0}")]
    Decode(String),

    /// A field exceeds its protocol limit
    #[error("Bad usage: {0}")]
    BadUsage(String),
}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            WireError::ConnectionClosed
        } else {
            WireError::Io(err)
        }
    }
}

/// Result type for wire operations
pub type WireResult<T> = Result<T, WireError>;
