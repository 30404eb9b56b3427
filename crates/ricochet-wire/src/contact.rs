//! Contact-request channel records and limits

use serde::{Deserialize, Serialize};

use crate::error::{WireError, WireResult};
use crate::{decode, encode, MESSAGE_MAX_BYTES};

/// Maximum nickname length in Unicode code points
pub const NICKNAME_MAX_CHARACTERS: usize = 30;

/// Contact request carried in the OpenChannel extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRequest {
    pub nickname: String,
    pub message_text: String,
}

/// Outcome of a contact request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactRequestStatus {
    Undefined,
    Pending,
    Accepted,
    Rejected,
    Error,
}

/// Response carried in the ChannelResult extension or standalone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactResponse {
    pub status: ContactRequestStatus,
}

/// A record exchanged on an open contact-request channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContactMessage {
    Response(ContactResponse),
}

/// Check a nickname against the protocol limits.
///
/// Nicknames are at most 30 code points of letters, digits, underscore,
/// hyphen and space, with no leading or trailing whitespace.
pub fn validate_nickname(nickname: &str) -> WireResult<()> {
    if nickname.chars().count() > NICKNAME_MAX_CHARACTERS {
        return Err(WireError::BadUsage(format!(
            "nickname exceeds {NICKNAME_MAX_CHARACTERS} characters"
        )));
    }
    if nickname.starts_with(char::is_whitespace) || nickname.ends_with(char::is_whitespace) {
        return Err(WireError::BadUsage(
            "nickname has leading or trailing whitespace".to_string(),
        ));
    }
    if !nickname
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == ' ')
    {
        return Err(WireError::BadUsage(
            "nickname contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Check a message against the protocol limit of 2000 bytes.
pub fn validate_message(message: &str) -> WireResult<()> {
    if message.len() > MESSAGE_MAX_BYTES {
        return Err(WireError::BadUsage(format!(
            "message exceeds {MESSAGE_MAX_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Standalone per-channel response record
pub fn contact_response(status: ContactRequestStatus) -> WireResult<Vec<u8>> {
    encode(&ContactMessage::Response(ContactResponse { status }))
}

/// Parse a contact-request channel payload
pub fn decode_contact(data: &[u8]) -> WireResult<ContactMessage> {
    decode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_roundtrip() {
        let raw = contact_response(ContactRequestStatus::Accepted).unwrap();
        assert_eq!(
            decode_contact(&raw).unwrap(),
            ContactMessage::Response(ContactResponse {
                status: ContactRequestStatus::Accepted
            })
        );
    }

    #[test]
    fn nickname_limit_boundary() {
        let thirty: String = std::iter::repeat('a').take(30).collect();
        assert!(validate_nickname(&thirty).is_ok());

        let thirty_one: String = std::iter::repeat('a').take(31).collect();
        assert!(validate_nickname(&thirty_one).is_err());
    }

    #[test]
    fn nickname_character_rules() {
        assert!(validate_nickname("alice_bob-99 c").is_ok());
        assert!(validate_nickname("").is_ok());
        assert!(validate_nickname(" alice").is_err());
        assert!(validate_nickname("alice ").is_err());
        assert!(validate_nickname("alice!bob").is_err());
    }

    #[test]
    fn message_limit_boundary() {
        let at_limit = "a".repeat(2000);
        assert!(validate_message(&at_limit).is_ok());

        let over_limit = "a".repeat(2001);
        assert!(matches!(
            validate_message(&over_limit),
            Err(WireError::BadUsage(_))
        ));
    }
}
