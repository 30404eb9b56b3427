//! Inbound connection facade

use std::sync::Arc;

use ricochet_crypto::Identity;

use crate::channel::ChannelType;
use crate::channels::{ChannelHandler, HiddenServiceAuthChannel};
use crate::connection::Connection;
use crate::error::{ConnectionError, ConnectionResult};
use crate::event::Event;
use crate::handler::ConnectionHandler;
use crate::policies::UNKNOWN_PURPOSE_TIMEOUT;

/// Runs the server side of the initial authentication flow
pub struct InboundConnectionHandler {
    connection: Arc<Connection>,
}

/// Minimal handler that accepts one auth channel and waits for its
/// outcome
struct ServerAuthObserver<F> {
    conn: Arc<Connection>,
    identity: Identity,
    predicate: F,
    hostname: Option<String>,
}

impl<F> ConnectionHandler for ServerAuthObserver<F>
where
    F: FnMut(&str, &[u8]) -> (bool, bool) + Send,
{
    fn handler_for(&mut self, channel_type: ChannelType) -> Option<ChannelHandler> {
        match channel_type {
            ChannelType::Auth => Some(ChannelHandler::Auth(HiddenServiceAuthChannel::server(
                self.identity.clone(),
            ))),
            _ => None,
        }
    }

    fn server_auth_valid(&mut self, hostname: &str, public_key_der: &[u8]) -> (bool, bool) {
        (self.predicate)(hostname, public_key_der)
    }

    fn event(&mut self, event: Event) {
        match event {
            Event::RemoteAuthenticated { hostname } => {
                self.hostname = Some(hostname);
                self.conn.request_break();
            }
            Event::AuthResult { accepted: false, .. } => {
                self.conn.request_break();
            }
            _ => {}
        }
    }
}

impl InboundConnectionHandler {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Wait for the client to authenticate, blocking until a verdict, a
    /// timeout, or connection close. `predicate` decides `(accepted,
    /// is_known_contact)` for the proven hostname and DER public key.
    ///
    /// Returns the authenticated remote hostname.
    pub async fn process_auth_as_server<F>(
        &self,
        identity: Option<Identity>,
        predicate: F,
    ) -> ConnectionResult<String>
    where
        F: FnMut(&str, &[u8]) -> (bool, bool) + Send,
    {
        let identity = identity.ok_or(ConnectionError::PrivateKeyNotSet)?;

        let mut observer = ServerAuthObserver {
            conn: Arc::clone(&self.connection),
            identity,
            predicate,
            hostname: None,
        };

        match UNKNOWN_PURPOSE_TIMEOUT
            .execute(self.connection.process(&mut observer))
            .await
        {
            Ok(()) => {}
            Err(ConnectionError::ActionTimedOut) => {
                self.connection.shutdown().await;
                return Err(ConnectionError::ActionTimedOut);
            }
            Err(err) => return Err(err),
        }

        observer
            .hostname
            .ok_or(ConnectionError::ClientFailedToAuthenticate)
    }
}
