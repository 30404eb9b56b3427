//! Chat channel records

use serde::{Deserialize, Serialize};

use crate::error::{WireError, WireResult};
use crate::{decode, encode, MESSAGE_MAX_BYTES};

/// A record exchanged on a chat channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatMessage {
    /// A chat message from the channel opener
    Message {
        message_id: u32,
        message_text: String,
        /// Seconds elapsed between composing and sending
        time_delta: i64,
    },

    /// Receipt for a previously sent message
    Acknowledge { message_id: u32, accepted: bool },
}

/// Chat message record; rejects text over the 2000-byte limit
pub fn chat_message(message_id: u32, message_text: &str, time_delta: i64) -> WireResult<Vec<u8>> {
    if message_text.len() > MESSAGE_MAX_BYTES {
        return Err(WireError::BadUsage(format!(
            "message exceeds {MESSAGE_MAX_BYTES} bytes"
        )));
    }
    encode(&ChatMessage::Message {
        message_id,
        message_text: message_text.to_string(),
        time_delta,
    })
}

/// Chat acknowledge record
pub fn chat_ack(message_id: u32, accepted: bool) -> WireResult<Vec<u8>> {
    encode(&ChatMessage::Acknowledge {
        message_id,
        accepted,
    })
}

/// Parse a chat channel payload
pub fn decode_chat(data: &[u8]) -> WireResult<ChatMessage> {
    decode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_roundtrip() {
        let raw = chat_message(42, "hello there", 3).unwrap();
        assert_eq!(
            decode_chat(&raw).unwrap(),
            ChatMessage::Message {
                message_id: 42,
                message_text: "hello there".to_string(),
                time_delta: 3,
            }
        );
    }

    #[test]
    fn ack_roundtrip() {
        let raw = chat_ack(42, true).unwrap();
        assert_eq!(
            decode_chat(&raw).unwrap(),
            ChatMessage::Acknowledge {
                message_id: 42,
                accepted: true
            }
        );
    }

    #[test]
    fn oversized_message_is_rejected() {
        let text = "a".repeat(2001);
        assert!(matches!(
            chat_message(1, &text, 0),
            Err(WireError::BadUsage(_))
        ));
    }
}
