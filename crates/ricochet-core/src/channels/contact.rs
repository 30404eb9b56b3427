//! Contact request channel
//!
//! Only the connecting client may open this channel; the request travels
//! in the open extension and the server's status in the result extension.
//! A Pending status leaves the channel open so the server can deliver a
//! definitive response later as a per-channel packet.

use tracing::debug;

use ricochet_wire::contact::{self, ContactMessage, ContactRequestStatus};
use ricochet_wire::control::{self, ChannelResult, CommonError, OpenChannel};
use ricochet_wire::WireError;

use super::InboundReply;
use crate::channel::{ChannelOps, ChannelType};
use crate::error::{ConnectionError, ConnectionResult};
use crate::event::Event;
use crate::handler::ConnectionHandler;

#[derive(Debug)]
enum ContactRole {
    /// We sent the request and wait for a status
    Outbound { nickname: String, message: String },
    /// We received the request
    Inbound,
}

/// Handler for `im.ricochet.contact.request`
#[derive(Debug)]
pub struct ContactRequestChannel {
    role: ContactRole,
}

impl ContactRequestChannel {
    /// Handler for a request we are sending
    pub fn outbound(nickname: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            role: ContactRole::Outbound {
                nickname: nickname.into(),
                message: message.into(),
            },
        }
    }

    /// Handler for a request the peer is sending
    pub fn inbound() -> Self {
        Self {
            role: ContactRole::Inbound,
        }
    }

    pub(super) fn open_outbound(&mut self, channel_id: u16) -> ConnectionResult<Vec<u8>> {
        let (nickname, message) = match &self.role {
            ContactRole::Outbound { nickname, message } => (nickname, message),
            ContactRole::Inbound => {
                return Err(ConnectionError::ProtocolError(
                    "inbound contact handler cannot open".into(),
                ))
            }
        };
        contact::validate_nickname(nickname)?;
        contact::validate_message(message)?;
        Ok(control::open_contact_request_channel(
            i32::from(channel_id),
            ChannelType::ContactRequest.type_string(),
            nickname,
            message,
        )?)
    }

    pub(super) fn open_inbound(
        &mut self,
        channel_id: u16,
        app: &mut dyn ConnectionHandler,
        msg: &OpenChannel,
    ) -> ConnectionResult<InboundReply> {
        let request = msg
            .contact_request
            .as_ref()
            .ok_or_else(|| WireError::BadUsage("open channel missing contact request".into()))?;
        contact::validate_nickname(&request.nickname)?;
        contact::validate_message(&request.message_text)?;

        let status = app.contact_request(&request.nickname, &request.message_text);
        debug!(nickname = %request.nickname, ?status, "inbound contact request");
        let reply =
            control::reply_to_contact_request_on_response(i32::from(channel_id), status)?;

        if status == ContactRequestStatus::Pending {
            // Keep the channel open for the definitive response
            Ok(InboundReply::pending(reply))
        } else {
            Ok(InboundReply::opened(reply))
        }
    }

    pub(super) async fn open_outbound_result(
        &mut self,
        ops: &mut ChannelOps<'_>,
        app: &mut dyn ConnectionHandler,
        result: Result<&ChannelResult, CommonError>,
    ) -> ConnectionResult<()> {
        match result {
            Ok(cr) => {
                let status = cr
                    .response
                    .as_ref()
                    .map(|r| r.status)
                    .unwrap_or(ContactRequestStatus::Undefined);
                self.deliver_status(ops, app, status).await
            }
            Err(reason) => {
                debug!(?reason, "contact request channel rejected");
                app.event(Event::ContactRequestError);
                Ok(())
            }
        }
    }

    pub(super) async fn packet(
        &mut self,
        ops: &mut ChannelOps<'_>,
        app: &mut dyn ConnectionHandler,
        payload: &[u8],
    ) -> ConnectionResult<()> {
        if !matches!(self.role, ContactRole::Outbound { .. }) {
            return Err(ConnectionError::ProtocolError(
                "unexpected packet on inbound contact request channel".into(),
            ));
        }
        let ContactMessage::Response(response) = contact::decode_contact(payload)?;
        self.deliver_status(ops, app, response.status).await
    }

    pub(super) fn closed(&mut self, _app: &mut dyn ConnectionHandler, err: &ConnectionError) {
        debug!(%err, "contact request channel closed");
    }

    /// Map a status onto the application event and close on a definitive
    /// answer.
    async fn deliver_status(
        &mut self,
        ops: &mut ChannelOps<'_>,
        app: &mut dyn ConnectionHandler,
        status: ContactRequestStatus,
    ) -> ConnectionResult<()> {
        match status {
            ContactRequestStatus::Accepted => {
                app.event(Event::ContactRequestAccepted);
                ops.close().await
            }
            ContactRequestStatus::Rejected => {
                app.event(Event::ContactRequestRejected);
                ops.close().await
            }
            ContactRequestStatus::Error => {
                app.event(Event::ContactRequestError);
                ops.close().await
            }
            ContactRequestStatus::Pending | ContactRequestStatus::Undefined => {
                // Not definitive; the channel stays open
                Ok(())
            }
        }
    }
}
