//! Channel type handlers
//!
//! One handler per channel type, gathered in a closed sum type. Every
//! handler exposes the same capability set: its static policy (type,
//! who may open, singleton, bidirectional, required authentication) and
//! the open/packet/close operations the engine drives.

mod auth;
mod chat;
mod contact;

pub use auth::HiddenServiceAuthChannel;
pub use chat::ChatChannel;
pub use contact::ContactRequestChannel;

use ricochet_wire::control::{ChannelResult, CommonError, OpenChannel};

use crate::channel::{ChannelOps, ChannelType};
use crate::error::ConnectionResult;
use crate::handler::ConnectionHandler;

/// Outcome of an inbound open: an optional immediate reply for the
/// control channel and whether the channel stays pending.
#[derive(Debug)]
pub struct InboundReply {
    pub reply: Option<Vec<u8>>,
    pub pending: bool,
}

impl InboundReply {
    pub fn opened(reply: Vec<u8>) -> Self {
        Self {
            reply: Some(reply),
            pending: false,
        }
    }

    pub fn pending(reply: Vec<u8>) -> Self {
        Self {
            reply: Some(reply),
            pending: true,
        }
    }
}

/// A protocol-level handler for one channel
#[derive(Debug)]
pub enum ChannelHandler {
    Auth(HiddenServiceAuthChannel),
    ContactRequest(ContactRequestChannel),
    Chat(ChatChannel),
}

impl ChannelHandler {
    pub fn channel_type(&self) -> ChannelType {
        match self {
            ChannelHandler::Auth(_) => ChannelType::Auth,
            ChannelHandler::ContactRequest(_) => ChannelType::ContactRequest,
            ChannelHandler::Chat(_) => ChannelType::Chat,
        }
    }

    pub fn only_client_can_open(&self) -> bool {
        match self {
            ChannelHandler::Auth(_) | ChannelHandler::ContactRequest(_) => true,
            ChannelHandler::Chat(_) => false,
        }
    }

    pub fn singleton(&self) -> bool {
        // Every defined channel type is a singleton per direction
        true
    }

    pub fn bidirectional(&self) -> bool {
        false
    }

    /// The authentication a connection needs before this channel opens
    pub fn requires_authentication(&self) -> Option<ChannelType> {
        match self {
            ChannelHandler::Auth(_) => None,
            ChannelHandler::ContactRequest(_) | ChannelHandler::Chat(_) => {
                Some(ChannelType::Auth)
            }
        }
    }

    /// Handle a peer's open request; returns the control-channel reply.
    pub fn open_inbound(
        &mut self,
        channel_id: u16,
        app: &mut dyn ConnectionHandler,
        msg: &OpenChannel,
    ) -> ConnectionResult<InboundReply> {
        match self {
            ChannelHandler::Auth(h) => h.open_inbound(channel_id, msg),
            ChannelHandler::ContactRequest(h) => h.open_inbound(channel_id, app, msg),
            ChannelHandler::Chat(h) => h.open_inbound(channel_id),
        }
    }

    /// Build the open-channel record for a local open request.
    pub fn open_outbound(&mut self, channel_id: u16) -> ConnectionResult<Vec<u8>> {
        match self {
            ChannelHandler::Auth(h) => h.open_outbound(channel_id),
            ChannelHandler::ContactRequest(h) => h.open_outbound(channel_id),
            ChannelHandler::Chat(h) => h.open_outbound(channel_id),
        }
    }

    /// Handle the peer's answer to our open request.
    pub async fn open_outbound_result(
        &mut self,
        ops: &mut ChannelOps<'_>,
        app: &mut dyn ConnectionHandler,
        result: Result<&ChannelResult, CommonError>,
    ) -> ConnectionResult<()> {
        match self {
            ChannelHandler::Auth(h) => h.open_outbound_result(ops, app, result).await,
            ChannelHandler::ContactRequest(h) => h.open_outbound_result(ops, app, result).await,
            ChannelHandler::Chat(h) => h.open_outbound_result(ops, app, result).await,
        }
    }

    /// Handle a nonempty payload on this channel.
    pub async fn packet(
        &mut self,
        ops: &mut ChannelOps<'_>,
        app: &mut dyn ConnectionHandler,
        payload: &[u8],
    ) -> ConnectionResult<()> {
        match self {
            ChannelHandler::Auth(h) => h.packet(ops, app, payload).await,
            ChannelHandler::ContactRequest(h) => h.packet(ops, app, payload).await,
            ChannelHandler::Chat(h) => h.packet(ops, app, payload).await,
        }
    }

    /// The channel closed (peer close, local close or error).
    pub fn closed(&mut self, app: &mut dyn ConnectionHandler, err: &crate::ConnectionError) {
        match self {
            ChannelHandler::Auth(h) => h.closed(app, err),
            ChannelHandler::ContactRequest(h) => h.closed(app, err),
            ChannelHandler::Chat(h) => h.closed(app, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ricochet_crypto::Identity;

    const FIXTURE_KEY: &str = include_str!("../../../../testing/private_key");

    #[test]
    fn auth_channel_capabilities() {
        let identity = Identity::from_pem(FIXTURE_KEY).unwrap();
        let handler = ChannelHandler::Auth(HiddenServiceAuthChannel::server(identity));
        assert_eq!(handler.channel_type(), ChannelType::Auth);
        assert_eq!(
            handler.channel_type().type_string(),
            "im.ricochet.auth.hidden-service"
        );
        assert!(handler.only_client_can_open());
        assert!(handler.singleton());
        assert!(!handler.bidirectional());
        assert_eq!(handler.requires_authentication(), None);
    }

    #[test]
    fn contact_request_channel_capabilities() {
        let handler = ChannelHandler::ContactRequest(ContactRequestChannel::inbound());
        assert_eq!(handler.channel_type(), ChannelType::ContactRequest);
        assert_eq!(
            handler.channel_type().type_string(),
            "im.ricochet.contact.request"
        );
        assert!(handler.only_client_can_open());
        assert!(handler.singleton());
        assert!(!handler.bidirectional());
        assert_eq!(handler.requires_authentication(), Some(ChannelType::Auth));
    }

    #[test]
    fn chat_channel_capabilities() {
        let handler = ChannelHandler::Chat(ChatChannel::new());
        assert_eq!(handler.channel_type(), ChannelType::Chat);
        assert_eq!(handler.channel_type().type_string(), "im.ricochet.chat");
        assert!(!handler.only_client_can_open());
        assert!(handler.singleton());
        assert!(!handler.bidirectional());
        assert_eq!(handler.requires_authentication(), Some(ChannelType::Auth));
    }
}
