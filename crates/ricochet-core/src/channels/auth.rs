//! Hidden-service authentication channel
//!
//! The client opens the channel with a random cookie; the server answers
//! with its own cookie. Both sides derive the same HMAC challenge from
//! the cookies and hostnames; the client signs it with its hidden-service
//! key and the server verifies the proof against the hostname the public
//! key hashes to. The channel closes once the result is delivered.

use tracing::debug;

use ricochet_crypto::{onion_hostname, verify_challenge, AuthHandshake, Identity};
use ricochet_wire::auth::{self, AuthMessage};
use ricochet_wire::control::{self, ChannelResult, CommonError, OpenChannel};
use ricochet_wire::WireError;

use super::InboundReply;
use crate::channel::{ChannelOps, ChannelType};
use crate::error::{ConnectionError, ConnectionResult};
use crate::event::Event;
use crate::handler::ConnectionHandler;

#[derive(Debug)]
enum AuthRole {
    /// We prove our identity to the server named here
    Client { server_hostname: String },
    /// We verify the peer's proof
    Server,
}

/// Handler for `im.ricochet.auth.hidden-service`
#[derive(Debug)]
pub struct HiddenServiceAuthChannel {
    identity: Identity,
    role: AuthRole,
    handshake: AuthHandshake,
}

impl HiddenServiceAuthChannel {
    /// Client-side handler, authenticating to `server_hostname`
    pub fn client(identity: Identity, server_hostname: impl Into<String>) -> Self {
        Self {
            identity,
            role: AuthRole::Client {
                server_hostname: server_hostname.into(),
            },
            handshake: AuthHandshake::new(),
        }
    }

    /// Server-side handler, verifying proofs against our own hostname
    pub fn server(identity: Identity) -> Self {
        Self {
            identity,
            role: AuthRole::Server,
            handshake: AuthHandshake::new(),
        }
    }

    pub(super) fn open_outbound(&mut self, channel_id: u16) -> ConnectionResult<Vec<u8>> {
        if !matches!(self.role, AuthRole::Client { .. }) {
            return Err(ConnectionError::UnauthorizedChannelType);
        }
        let cookie = self.handshake.gen_client_cookie();
        Ok(control::open_authentication_channel(
            i32::from(channel_id),
            ChannelType::Auth.type_string(),
            cookie,
        )?)
    }

    pub(super) fn open_inbound(
        &mut self,
        channel_id: u16,
        msg: &OpenChannel,
    ) -> ConnectionResult<InboundReply> {
        let cookie = msg
            .client_cookie
            .ok_or_else(|| WireError::BadUsage("open channel missing client cookie".into()))?;
        self.handshake.set_client_cookie(cookie);
        let server_cookie = self.handshake.gen_server_cookie();
        let reply = control::confirm_auth_channel(i32::from(channel_id), server_cookie)?;
        // The channel is not fully open until a valid proof arrives
        Ok(InboundReply::pending(reply))
    }

    pub(super) async fn open_outbound_result(
        &mut self,
        ops: &mut ChannelOps<'_>,
        app: &mut dyn ConnectionHandler,
        result: Result<&ChannelResult, CommonError>,
    ) -> ConnectionResult<()> {
        let server_hostname = match &self.role {
            AuthRole::Client { server_hostname } => server_hostname.clone(),
            AuthRole::Server => {
                return Err(ConnectionError::ProtocolError(
                    "auth result on server-side channel".into(),
                ))
            }
        };

        match result {
            Ok(cr) => {
                let cookie = cr.server_cookie.ok_or_else(|| {
                    ConnectionError::ProtocolError("channel result missing server cookie".into())
                })?;
                self.handshake.set_server_cookie(cookie);

                let challenge = self
                    .handshake
                    .challenge(self.identity.hostname(), &server_hostname);
                let signature = self.identity.sign_challenge(&challenge)?;
                ops.send(&auth::proof(self.identity.public_key_der(), &signature)?)
                    .await
            }
            Err(reason) => {
                debug!(?reason, "authentication channel rejected");
                app.event(Event::AuthResult {
                    accepted: false,
                    is_known_contact: false,
                });
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
        match auth::decode_auth(payload)? {
            AuthMessage::Proof {
                public_key,
                signature,
            } => {
                if !matches!(self.role, AuthRole::Server) {
                    return Err(ConnectionError::ProtocolError(
                        "proof received on client-side channel".into(),
                    ));
                }

                let claimed = onion_hostname(&public_key);
                let challenge = self.handshake.challenge(&claimed, self.identity.hostname());

                match verify_challenge(&public_key, &challenge, &signature) {
                    Ok(hostname) => {
                        let (accepted, known) = app.server_auth_valid(&hostname, &public_key);
                        debug!(%hostname, accepted, known, "verified authentication proof");
                        ops.send(&auth::auth_result(accepted, known)?).await?;
                        if accepted {
                            ops.delegate_authorization(ChannelType::Auth, Some(hostname.clone()));
                            app.event(Event::RemoteAuthenticated { hostname });
                        } else {
                            app.event(Event::AuthResult {
                                accepted: false,
                                is_known_contact: false,
                            });
                        }
                        ops.close().await
                    }
                    Err(err) => {
                        debug!(%err, "invalid authentication proof");
                        ops.send(&auth::auth_result(false, false)?).await?;
                        app.event(Event::AuthResult {
                            accepted: false,
                            is_known_contact: false,
                        });
                        ops.close().await
                    }
                }
            }
            AuthMessage::Result {
                accepted,
                is_known_contact,
            } => {
                if !matches!(self.role, AuthRole::Client { .. }) {
                    return Err(ConnectionError::ProtocolError(
                        "auth result received on server-side channel".into(),
                    ));
                }
                if accepted {
                    ops.delegate_authorization(ChannelType::Auth, None);
                }
                app.event(Event::AuthResult {
                    accepted,
                    is_known_contact,
                });
                ops.close().await
            }
        }
    }

    pub(super) fn closed(&mut self, _app: &mut dyn ConnectionHandler, err: &ConnectionError) {
        debug!(%err, "authentication channel closed");
    }
}
