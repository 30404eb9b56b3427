//! Ricochet Wire Layer
//!
//! Wire format:
//! [Size: 2 bytes, big-endian, whole frame][Channel: 2 bytes, big-endian][Payload: variable]
//!
//! Provides:
//! - Length-prefixed packet framing over any async byte stream
//! - The control, authentication, contact-request and chat message records
//! - Builder and decoder functions for every protocol operation
//!
//! A zero-length payload on a nonzero channel is the channel-close signal.
//! Records are length-delimited within the payload; the field set and
//! semantics follow the protocol schema, encoded with bincode.

pub mod auth;
pub mod chat;
pub mod contact;
pub mod control;
pub mod error;
pub mod frame;

pub use error::{WireError, WireResult};
pub use frame::{read_packet, write_packet, Packet};

/// Size of the frame header (length + channel)
pub const HEADER_SIZE: usize = 4;

/// Maximum whole-frame size
pub const MAX_FRAME_SIZE: usize = 65535;

/// Maximum payload carried by a single frame
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - HEADER_SIZE;

/// Maximum message text length in bytes (chat and contact request)
pub const MESSAGE_MAX_BYTES: usize = 2000;

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> WireResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| WireError::Encode(e.to_string()))
}

pub(crate) fn decode<'a, T: serde::Deserialize<'a>>(data: &'a [u8]) -> WireResult<T> {
    bincode::deserialize(data).map_err(|e| WireError::Decode(e.to_string()))
}
