//! Ricochet Connection Engine
//!
//! Implements the core protocol state machine for anonymous peer-to-peer
//! instant messaging over Tor hidden services:
//! - Version negotiation on freshly connected streams
//! - Mutual authentication proving hidden-service key ownership
//! - Multiplexed channels (auth, contact request, chat) with
//!   direction-aware identifier allocation and policy enforcement
//! - A per-connection process loop mediating between the stream reader
//!   and application callbacks
//!
//! The engine is transport-agnostic: any `AsyncRead + AsyncWrite` stream
//! works, typically a TCP connection dialed through a Tor SOCKS5 proxy.

pub mod channel;
pub mod channels;
pub mod connection;
pub mod error;
pub mod event;
pub mod handler;
pub mod inbound;
pub mod manager;
pub mod outbound;
pub mod policies;
pub mod version;

pub use channel::{Channel, ChannelOps, ChannelType, ConnectionSide, Direction};
pub use channels::{
    ChannelHandler, ChatChannel, ContactRequestChannel, HiddenServiceAuthChannel,
};
pub use connection::Connection;
pub use error::{ConnectionError, ConnectionResult};
pub use event::Event;
pub use handler::ConnectionHandler;
pub use inbound::InboundConnectionHandler;
pub use manager::ChannelManager;
pub use outbound::OutboundConnectionHandler;
pub use policies::{TimeoutPolicy, UNKNOWN_PURPOSE_TIMEOUT};

pub use ricochet_crypto::Identity;
pub use ricochet_wire::contact::ContactRequestStatus;

/// Protocol version byte exchanged during negotiation
pub const PROTOCOL_VERSION: u8 = 0x01;
