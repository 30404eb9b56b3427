//! Application-facing connection handler

use std::time::SystemTime;

use crate::channel::ChannelType;
use crate::channels::ChannelHandler;
use crate::connection::Connection;
use crate::error::ConnectionError;
use crate::event::Event;
use ricochet_wire::contact::ContactRequestStatus;

/// Application callbacks for one connection.
///
/// All methods run synchronously on the connection's process task. They
/// must not block on other connection activity and must not call
/// [`Connection::execute`] on the same connection; engine operations are
/// available directly from the process task instead.
///
/// [`Connection::execute`]: crate::connection::Connection::execute
pub trait ConnectionHandler: Send {
    /// Called when the process loop starts
    fn on_ready(&mut self, _conn: &Connection) {}

    /// Called when the connection closed for any reason
    fn on_closed(&mut self, _err: &ConnectionError) {}

    /// Supply a handler for a peer-requested channel type, or None to
    /// reject the open with an unknown-type error.
    fn handler_for(&mut self, _channel_type: ChannelType) -> Option<ChannelHandler> {
        None
    }

    /// Protocol events, in stream order
    fn event(&mut self, _event: Event) {}

    /// Decide whether an authenticated peer is accepted and whether it is
    /// already a known contact. `public_key_der` is the peer's DER-encoded
    /// RSA public key.
    fn server_auth_valid(&mut self, _hostname: &str, _public_key_der: &[u8]) -> (bool, bool) {
        (false, false)
    }

    /// Decide the status of an inbound contact request
    fn contact_request(&mut self, _nickname: &str, _message: &str) -> ContactRequestStatus {
        ContactRequestStatus::Rejected
    }

    /// Receive an inbound chat message; the return value becomes the
    /// acknowledgement's accepted flag.
    fn chat_message(&mut self, _id: u32, _when: SystemTime, _text: &str) -> bool {
        false
    }
}
