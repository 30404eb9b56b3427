//! Channel registry
//!
//! One registry per connection tracks every open channel, allocates local
//! identifiers and enforces the open policies. Clients allocate odd
//! identifiers from 1; servers allocate even identifiers from 2.
//! Identifier 0 is the control channel and is never registered. Removed
//! identifiers are not reused within a connection.

use std::collections::HashMap;

use tracing::debug;

use crate::channel::{Channel, ChannelType, ConnectionSide, Direction};
use crate::channels::ChannelHandler;
use crate::error::{ConnectionError, ConnectionResult};

/// Per-connection channel registry
#[derive(Debug)]
pub struct ChannelManager {
    channels: HashMap<u16, Channel>,
    next_free_channel: u16,
    side: ConnectionSide,
}

impl ChannelManager {
    /// Registry for an outbound connection (we are the client)
    pub fn new_client() -> Self {
        Self {
            channels: HashMap::new(),
            next_free_channel: 1,
            side: ConnectionSide::Client,
        }
    }

    /// Registry for an inbound connection (we are the server)
    pub fn new_server() -> Self {
        Self {
            channels: HashMap::new(),
            next_free_channel: 2,
            side: ConnectionSide::Server,
        }
    }

    pub fn side(&self) -> ConnectionSide {
        self.side
    }

    /// Allocate an identifier of our parity and register a pending
    /// outbound channel for the handler.
    pub fn open_local(&mut self, handler: ChannelHandler) -> ConnectionResult<u16> {
        if handler.singleton()
            && self
                .channel(handler.channel_type(), Direction::Outbound)
                .is_some()
        {
            return Err(ConnectionError::SingletonViolation(handler.channel_type()));
        }

        let mut id = self.next_free_channel;
        while self.channels.contains_key(&id) {
            id = id
                .checked_add(2)
                .ok_or_else(|| ConnectionError::ProtocolError("channel space exhausted".into()))?;
        }
        self.next_free_channel = id.checked_add(2).unwrap_or(id);

        debug!(id, channel_type = %handler.channel_type(), "registering outbound channel");
        self.channels.insert(
            id,
            Channel {
                id,
                direction: Direction::Outbound,
                pending: true,
                handler,
            },
        );
        Ok(id)
    }

    /// Validate and register a channel the peer asked to open.
    pub fn open_from_peer(&mut self, id: u16, handler: ChannelHandler) -> ConnectionResult<()> {
        if id == 0 {
            return Err(ConnectionError::BadParity(id));
        }

        // The peer has the opposite parity to ours
        let peer_is_client = self.side == ConnectionSide::Server;
        if peer_is_client && id % 2 == 0 {
            return Err(ConnectionError::BadParity(id));
        }
        if !peer_is_client && id % 2 != 0 {
            return Err(ConnectionError::BadParity(id));
        }

        if !peer_is_client && handler.only_client_can_open() {
            return Err(ConnectionError::UnauthorizedChannelType);
        }

        if self.channels.contains_key(&id) {
            return Err(ConnectionError::ChannelInUse(id));
        }

        if handler.singleton()
            && self
                .channel(handler.channel_type(), Direction::Inbound)
                .is_some()
        {
            return Err(ConnectionError::SingletonViolation(handler.channel_type()));
        }

        debug!(id, channel_type = %handler.channel_type(), "registering inbound channel");
        self.channels.insert(
            id,
            Channel {
                id,
                direction: Direction::Inbound,
                pending: false,
                handler,
            },
        );
        Ok(())
    }

    /// Look up a channel
    pub fn get(&self, id: u16) -> Option<&Channel> {
        self.channels.get(&id)
    }

    /// Take a channel out of the registry for dispatch
    pub fn take(&mut self, id: u16) -> Option<Channel> {
        self.channels.remove(&id)
    }

    /// Reinsert a channel taken for dispatch
    pub fn insert(&mut self, channel: Channel) {
        self.channels.insert(channel.id, channel);
    }

    /// Remove a channel (close or open failure)
    pub fn remove(&mut self, id: u16) -> Option<Channel> {
        self.channels.remove(&id)
    }

    /// The at-most-one channel matching a type and direction
    pub fn channel(&self, channel_type: ChannelType, direction: Direction) -> Option<&Channel> {
        self.channels
            .values()
            .find(|c| c.channel_type() == channel_type && c.direction == direction)
    }

    /// Identifier of the channel matching a type and direction
    pub fn channel_id(&self, channel_type: ChannelType, direction: Direction) -> Option<u16> {
        self.channel(channel_type, direction).map(|c| c.id)
    }
}
