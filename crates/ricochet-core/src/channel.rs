//! Channel state and capabilities

use crate::channels::ChannelHandler;
use crate::connection::Connection;
use crate::error::ConnectionResult;

/// The closed set of channel types this protocol defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    /// Hidden-service authentication
    Auth,
    /// Contact request
    ContactRequest,
    /// Chat
    Chat,
}

impl ChannelType {
    /// The wire identifier for this channel type
    pub fn type_string(&self) -> &'static str {
        match self {
            ChannelType::Auth => "im.ricochet.auth.hidden-service",
            ChannelType::ContactRequest => "im.ricochet.contact.request",
            ChannelType::Chat => "im.ricochet.chat",
        }
    }

    /// Parse a wire identifier
    pub fn from_type_string(s: &str) -> Option<Self> {
        match s {
            "im.ricochet.auth.hidden-service" => Some(ChannelType::Auth),
            "im.ricochet.contact.request" => Some(ChannelType::ContactRequest),
            "im.ricochet.chat" => Some(ChannelType::Chat),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_string())
    }
}

/// Which side opened a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Opened by the remote peer
    Inbound,
    /// Opened by us
    Outbound,
}

/// Which side of the connection we are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSide {
    /// We dialed; we allocate odd channel identifiers
    Client,
    /// We accepted; we allocate even channel identifiers
    Server,
}

/// State of one open channel
#[derive(Debug)]
pub struct Channel {
    pub id: u16,
    pub direction: Direction,

    /// An outbound channel is pending until the peer's ChannelResult
    /// arrives; an inbound channel may be pending while its handler
    /// defers completion.
    pub pending: bool,

    pub handler: ChannelHandler,
}

impl Channel {
    pub fn channel_type(&self) -> ChannelType {
        self.handler.channel_type()
    }
}

/// Send capability handed to a channel handler for one dispatch.
///
/// Binds the engine's per-channel operations to a channel identifier
/// explicitly instead of capturing them in closures. Close and
/// authorization requests are recorded here and applied by the engine
/// after the handler returns.
pub struct ChannelOps<'a> {
    conn: &'a Connection,
    channel_id: u16,
    pub(crate) close_requested: bool,
    pub(crate) delegated: Option<(ChannelType, Option<String>)>,
}

impl<'a> ChannelOps<'a> {
    pub(crate) fn new(conn: &'a Connection, channel_id: u16) -> Self {
        Self {
            conn,
            channel_id,
            close_requested: false,
            delegated: None,
        }
    }

    /// The channel this capability is bound to
    pub fn channel_id(&self) -> u16 {
        self.channel_id
    }

    /// Send a payload on this channel
    pub async fn send(&self, payload: &[u8]) -> ConnectionResult<()> {
        self.conn.send_packet(self.channel_id, payload).await
    }

    /// Close this channel: the empty close frame is sent immediately and
    /// the engine drops the channel once the handler returns.
    pub async fn close(&mut self) -> ConnectionResult<()> {
        if self.close_requested {
            return Ok(());
        }
        self.conn.send_packet(self.channel_id, &[]).await?;
        self.close_requested = true;
        Ok(())
    }

    /// Mark the connection authenticated for the given channel type,
    /// optionally recording the proven remote hostname.
    pub fn delegate_authorization(&mut self, channel_type: ChannelType, hostname: Option<String>) {
        self.delegated = Some((channel_type, hostname));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_string_roundtrip() {
        for ctype in [
            ChannelType::Auth,
            ChannelType::ContactRequest,
            ChannelType::Chat,
        ] {
            assert_eq!(
                ChannelType::from_type_string(ctype.type_string()),
                Some(ctype)
            );
        }
        assert_eq!(ChannelType::from_type_string("im.ricochet.file"), None);
    }
}
