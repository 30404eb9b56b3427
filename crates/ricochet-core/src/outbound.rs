//! Outbound connection facade

use std::sync::Arc;

use ricochet_crypto::Identity;

use crate::channels::{ChannelHandler, HiddenServiceAuthChannel};
use crate::connection::Connection;
use crate::error::{ConnectionError, ConnectionResult};
use crate::event::Event;
use crate::handler::ConnectionHandler;
use crate::policies::UNKNOWN_PURPOSE_TIMEOUT;

/// Runs the client side of the initial authentication flow
pub struct OutboundConnectionHandler {
    connection: Arc<Connection>,
}

/// Minimal handler that waits for the client auth outcome
struct ClientAuthObserver {
    conn: Arc<Connection>,
    result: Option<(bool, bool)>,
}

impl ConnectionHandler for ClientAuthObserver {
    fn event(&mut self, event: Event) {
        if let Event::AuthResult {
            accepted,
            is_known_contact,
        } = event
        {
            self.result = Some((accepted, is_known_contact));
            self.conn.request_break();
        }
    }
}

impl OutboundConnectionHandler {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Authenticate to the server with our hidden-service key, blocking
    /// until the server's verdict, a timeout, or connection close.
    ///
    /// On success the return value tells whether the server already knows
    /// us as a contact; unknown contacts generally need to send a contact
    /// request before any other activity.
    pub async fn process_auth_as_client(
        &self,
        identity: Option<Identity>,
    ) -> ConnectionResult<bool> {
        let identity = identity.ok_or(ConnectionError::PrivateKeyNotSet)?;
        let server_hostname = self.connection.remote_hostname().await.ok_or_else(|| {
            ConnectionError::ProtocolError("remote hostname unknown".into())
        })?;

        self.connection
            .request_open_channel(ChannelHandler::Auth(HiddenServiceAuthChannel::client(
                identity,
                server_hostname,
            )))
            .await?;

        let mut observer = ClientAuthObserver {
            conn: Arc::clone(&self.connection),
            result: None,
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

        match observer.result {
            Some((true, known)) => Ok(known),
            _ => Err(ConnectionError::ServerRejectedClientConnection),
        }
    }
}
