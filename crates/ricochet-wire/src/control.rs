//! Control channel records
//!
//! Channel 0 carries channel management traffic only: open requests, open
//! results, keep-alives and feature negotiation. Application payloads never
//! travel on the control channel.

use serde::{Deserialize, Serialize};

use crate::contact::{ContactRequest, ContactRequestStatus, ContactResponse};
use crate::error::WireResult;
use crate::{decode, encode};

/// Reasons a channel open can be refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommonError {
    Generic,
    UnknownType,
    Unauthorized,
    BadUsage,
    Failed,
}

/// Request to open a channel, with the optional per-type extensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenChannel {
    pub channel_identifier: i32,
    pub channel_type: String,

    /// Authentication extension
    pub client_cookie: Option<[u8; 16]>,

    /// Contact-request extension
    pub contact_request: Option<ContactRequest>,
}

/// Response to an open request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelResult {
    pub channel_identifier: i32,
    pub opened: bool,
    pub common_error: Option<CommonError>,

    /// Authentication extension
    pub server_cookie: Option<[u8; 16]>,

    /// Contact-request extension
    pub response: Option<ContactResponse>,
}

/// A control channel record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlMessage {
    OpenChannel(OpenChannel),
    ChannelResult(ChannelResult),
    KeepAlive { response_requested: bool },
    EnableFeatures { features: Vec<String> },
    FeaturesEnabled { features: Vec<String> },
}

/// Request to open a plain channel of the given type
pub fn open_channel(channel_identifier: i32, channel_type: &str) -> WireResult<Vec<u8>> {
    encode(&ControlMessage::OpenChannel(OpenChannel {
        channel_identifier,
        channel_type: channel_type.to_string(),
        client_cookie: None,
        contact_request: None,
    }))
}

/// Request to open an authentication channel carrying the client cookie
pub fn open_authentication_channel(
    channel_identifier: i32,
    channel_type: &str,
    client_cookie: [u8; 16],
) -> WireResult<Vec<u8>> {
    encode(&ControlMessage::OpenChannel(OpenChannel {
        channel_identifier,
        channel_type: channel_type.to_string(),
        client_cookie: Some(client_cookie),
        contact_request: None,
    }))
}

/// Request to open a contact-request channel carrying nickname and message
pub fn open_contact_request_channel(
    channel_identifier: i32,
    channel_type: &str,
    nickname: &str,
    message_text: &str,
) -> WireResult<Vec<u8>> {
    encode(&ControlMessage::OpenChannel(OpenChannel {
        channel_identifier,
        channel_type: channel_type.to_string(),
        client_cookie: None,
        contact_request: Some(ContactRequest {
            nickname: nickname.to_string(),
            message_text: message_text.to_string(),
        }),
    }))
}

/// Accept a peer's open request
pub fn ack_open_channel(channel_identifier: i32) -> WireResult<Vec<u8>> {
    encode(&ControlMessage::ChannelResult(ChannelResult {
        channel_identifier,
        opened: true,
        common_error: None,
        server_cookie: None,
        response: None,
    }))
}

/// Accept an authentication open, returning the server cookie
pub fn confirm_auth_channel(
    channel_identifier: i32,
    server_cookie: [u8; 16],
) -> WireResult<Vec<u8>> {
    encode(&ControlMessage::ChannelResult(ChannelResult {
        channel_identifier,
        opened: true,
        common_error: None,
        server_cookie: Some(server_cookie),
        response: None,
    }))
}

/// Accept a contact-request open, carrying the initial status
pub fn reply_to_contact_request_on_response(
    channel_identifier: i32,
    status: ContactRequestStatus,
) -> WireResult<Vec<u8>> {
    encode(&ControlMessage::ChannelResult(ChannelResult {
        channel_identifier,
        opened: true,
        common_error: None,
        server_cookie: None,
        response: Some(ContactResponse { status }),
    }))
}

/// Refuse a peer's open request
pub fn reject_open_channel(channel_identifier: i32, reason: CommonError) -> WireResult<Vec<u8>> {
    encode(&ControlMessage::ChannelResult(ChannelResult {
        channel_identifier,
        opened: false,
        common_error: Some(reason),
        server_cookie: None,
        response: None,
    }))
}

/// Keep-alive record
pub fn keep_alive(response_requested: bool) -> WireResult<Vec<u8>> {
    encode(&ControlMessage::KeepAlive { response_requested })
}

/// Feature negotiation request
pub fn enable_features(features: &[String]) -> WireResult<Vec<u8>> {
    encode(&ControlMessage::EnableFeatures {
        features: features.to_vec(),
    })
}

/// Feature negotiation reply
pub fn features_enabled(features: &[String]) -> WireResult<Vec<u8>> {
    encode(&ControlMessage::FeaturesEnabled {
        features: features.to_vec(),
    })
}

/// Parse a control channel payload
pub fn decode_control(data: &[u8]) -> WireResult<ControlMessage> {
    decode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_channel_roundtrip() {
        let raw = open_channel(5, "im.ricochet.chat").unwrap();
        match decode_control(&raw).unwrap() {
            ControlMessage::OpenChannel(oc) => {
                assert_eq!(oc.channel_identifier, 5);
                assert_eq!(oc.channel_type, "im.ricochet.chat");
                assert!(oc.client_cookie.is_none());
                assert!(oc.contact_request.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn auth_open_carries_client_cookie() {
        let cookie = [9u8; 16];
        let raw =
            open_authentication_channel(1, "im.ricochet.auth.hidden-service", cookie).unwrap();
        match decode_control(&raw).unwrap() {
            ControlMessage::OpenChannel(oc) => {
                assert_eq!(oc.client_cookie, Some(cookie));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn confirm_auth_carries_server_cookie() {
        let cookie = [3u8; 16];
        let raw = confirm_auth_channel(1, cookie).unwrap();
        match decode_control(&raw).unwrap() {
            ControlMessage::ChannelResult(cr) => {
                assert!(cr.opened);
                assert_eq!(cr.server_cookie, Some(cookie));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn reject_carries_reason() {
        let raw = reject_open_channel(2, CommonError::UnknownType).unwrap();
        match decode_control(&raw).unwrap() {
            ControlMessage::ChannelResult(cr) => {
                assert!(!cr.opened);
                assert_eq!(cr.common_error, Some(CommonError::UnknownType));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn keep_alive_roundtrip() {
        let raw = keep_alive(true).unwrap();
        assert_eq!(
            decode_control(&raw).unwrap(),
            ControlMessage::KeepAlive {
                response_requested: true
            }
        );
    }

    #[test]
    fn feature_records_roundtrip() {
        let features = vec!["feature1".to_string(), "feature2".to_string()];
        let raw = enable_features(&features).unwrap();
        match decode_control(&raw).unwrap() {
            ControlMessage::EnableFeatures { features: f } => assert_eq!(f, features),
            other => panic!("unexpected message: {other:?}"),
        }

        let raw = features_enabled(&[]).unwrap();
        match decode_control(&raw).unwrap() {
            ControlMessage::FeaturesEnabled { features: f } => assert!(f.is_empty()),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(decode_control(&[0xff; 40]).is_err());
    }
}
