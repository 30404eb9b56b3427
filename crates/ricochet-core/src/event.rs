//! Connection events
//!
//! Protocol activity is reported to the application as a single stream of
//! tagged events, delivered through [`ConnectionHandler::event`] on the
//! process task.
//!
//! [`ConnectionHandler::event`]: crate::handler::ConnectionHandler::event

use crate::channel::ChannelType;

/// An event on a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A channel finished opening (either direction)
    ChannelOpened { id: u16, channel_type: ChannelType },

    /// A channel closed (by either side or on error)
    ChannelClosed { id: u16, channel_type: ChannelType },

    /// The peer refused our open request
    ChannelRejected { id: u16, channel_type: ChannelType },

    /// Outcome of our authentication attempt as a client, or of an
    /// invalid proof we received as a server
    AuthResult {
        accepted: bool,
        is_known_contact: bool,
    },

    /// The remote peer proved ownership of this hostname
    RemoteAuthenticated { hostname: String },

    /// The peer acknowledged a chat message we sent
    ChatMessageAck { message_id: u32, accepted: bool },

    /// The peer accepted our contact request
    ContactRequestAccepted,

    /// The peer rejected our contact request
    ContactRequestRejected,

    /// The peer failed to process our contact request
    ContactRequestError,
}
