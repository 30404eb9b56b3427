//! Chat channel
//!
//! Either side may open a chat channel; messages flow from the opener
//! only. Outgoing messages carry a random non-zero identifier that is
//! remembered until the peer acknowledges it.

use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use tracing::debug;

use ricochet_wire::chat::{self, ChatMessage};
use ricochet_wire::control::{self, ChannelResult, CommonError};

use super::InboundReply;
use crate::channel::{ChannelOps, ChannelType};
use crate::error::ConnectionResult;
use crate::event::Event;
use crate::handler::ConnectionHandler;

/// Handler for `im.ricochet.chat`
#[derive(Debug, Default)]
pub struct ChatChannel {
    /// Message identifiers sent and not yet acknowledged
    outstanding: HashSet<u32>,
}

impl ChatChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn open_outbound(&mut self, channel_id: u16) -> ConnectionResult<Vec<u8>> {
        Ok(control::open_channel(
            i32::from(channel_id),
            ChannelType::Chat.type_string(),
        )?)
    }

    pub(super) fn open_inbound(&mut self, channel_id: u16) -> ConnectionResult<InboundReply> {
        Ok(InboundReply::opened(control::ack_open_channel(i32::from(
            channel_id,
        ))?))
    }

    pub(super) async fn open_outbound_result(
        &mut self,
        _ops: &mut ChannelOps<'_>,
        _app: &mut dyn ConnectionHandler,
        result: Result<&ChannelResult, CommonError>,
    ) -> ConnectionResult<()> {
        if let Err(reason) = result {
            debug!(?reason, "chat channel rejected");
        }
        Ok(())
    }

    /// Send a message, returning the identifier the acknowledgement will
    /// carry.
    pub(crate) async fn send_message(
        &mut self,
        ops: &mut ChannelOps<'_>,
        text: &str,
    ) -> ConnectionResult<u32> {
        let mut message_id: u32 = rand::random();
        while message_id == 0 || self.outstanding.contains(&message_id) {
            message_id = rand::random();
        }

        let raw = chat::chat_message(message_id, text, 0)?;
        ops.send(&raw).await?;
        self.outstanding.insert(message_id);
        Ok(message_id)
    }

    pub(super) async fn packet(
        &mut self,
        ops: &mut ChannelOps<'_>,
        app: &mut dyn ConnectionHandler,
        payload: &[u8],
    ) -> ConnectionResult<()> {
        match chat::decode_chat(payload)? {
            ChatMessage::Message {
                message_id,
                message_text,
                time_delta,
            } => {
                ricochet_wire::contact::validate_message(&message_text)?;
                let when = SystemTime::now()
                    .checked_sub(Duration::from_secs(time_delta.max(0) as u64))
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                let accepted = app.chat_message(message_id, when, &message_text);
                ops.send(&chat::chat_ack(message_id, accepted)?).await
            }
            ChatMessage::Acknowledge {
                message_id,
                accepted,
            } => {
                if self.outstanding.remove(&message_id) {
                    app.event(Event::ChatMessageAck {
                        message_id,
                        accepted,
                    });
                } else {
                    debug!(message_id, "acknowledgement for unknown message id");
                }
                Ok(())
            }
        }
    }

    pub(super) fn closed(&mut self, _app: &mut dyn ConnectionHandler, err: &crate::ConnectionError) {
        if !self.outstanding.is_empty() {
            debug!(unacknowledged = self.outstanding.len(), %err, "chat channel closed");
        }
        self.outstanding.clear();
    }
}
