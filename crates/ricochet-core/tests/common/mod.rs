//! Shared helpers for the integration tests: the fixture hidden-service
//! key and a hand-rolled wire-level client for driving a server
//! connection from raw frames.

#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use ricochet_core::{ConnectionHandler, ContactRequestStatus, Event};
use ricochet_crypto::{AuthHandshake, Identity};
use ricochet_wire::auth::{self, AuthMessage};
use ricochet_wire::control::{self, ChannelResult, ControlMessage};
use ricochet_wire::{read_packet, write_packet, Packet};

pub const FIXTURE_KEY: &str = include_str!("../../../../testing/private_key");
pub const FIXTURE_HOSTNAME: &str = "kwke2hntvyfqm7dr";

/// Opt-in protocol tracing for test runs (`RUST_LOG=ricochet_core=trace`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fixture_identity() -> Identity {
    Identity::from_pem(FIXTURE_KEY).unwrap()
}

/// Drive the client side of version negotiation by hand
pub async fn negotiate_raw_client(stream: &mut DuplexStream) {
    stream.write_all(&[0x49, 0x4D, 0x01, 0x01]).await.unwrap();
    let mut reply = [0u8; 1];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply[0], 0x01, "server should select version 1");
}

/// Drive the server side of version negotiation by hand
pub async fn negotiate_raw_server(stream: &mut DuplexStream) {
    let mut header = [0u8; 3];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(&header[..2], &[0x49, 0x4D]);
    let mut versions = vec![0u8; header[2] as usize];
    stream.read_exact(&mut versions).await.unwrap();
    assert!(versions.contains(&0x01));
    stream.write_all(&[0x01]).await.unwrap();
}

pub async fn expect_packet(stream: &mut DuplexStream) -> Packet {
    read_packet(stream).await.unwrap()
}

pub async fn expect_channel_result(stream: &mut DuplexStream) -> ChannelResult {
    let packet = expect_packet(stream).await;
    assert_eq!(packet.channel, 0, "expected a control packet");
    match control::decode_control(&packet.payload).unwrap() {
        ControlMessage::ChannelResult(cr) => cr,
        other => panic!("expected channel result, got {other:?}"),
    }
}

/// Complete the whole authentication flow against a serving connection,
/// using channel identifier 1.
pub async fn authenticate_raw_client(
    stream: &mut DuplexStream,
    identity: &Identity,
    server_hostname: &str,
) {
    let mut handshake = AuthHandshake::new();
    let cookie = handshake.gen_client_cookie();

    write_packet(
        stream,
        0,
        &control::open_authentication_channel(1, "im.ricochet.auth.hidden-service", cookie)
            .unwrap(),
    )
    .await
    .unwrap();

    let cr = expect_channel_result(stream).await;
    assert!(cr.opened);
    handshake.set_server_cookie(cr.server_cookie.expect("server cookie"));

    let challenge = handshake.challenge(identity.hostname(), server_hostname);
    let signature = identity.sign_challenge(&challenge).unwrap();
    write_packet(
        stream,
        1,
        &auth::proof(identity.public_key_der(), &signature).unwrap(),
    )
    .await
    .unwrap();

    let packet = expect_packet(stream).await;
    assert_eq!(packet.channel, 1);
    match auth::decode_auth(&packet.payload).unwrap() {
        AuthMessage::Result { accepted, .. } => assert!(accepted, "proof should be accepted"),
        other => panic!("expected auth result, got {other:?}"),
    }

    // The server closes the auth channel after the result
    let packet = expect_packet(stream).await;
    assert_eq!(packet.channel, 1);
    assert!(packet.payload.is_empty());
}

/// Serving-side handler that accepts chat and contact channels and
/// records what arrives.
pub struct TestServerHandler {
    pub contact_status: ContactRequestStatus,
    pub chat_tx: Option<tokio::sync::mpsc::UnboundedSender<(u32, String)>>,
    pub events: Vec<Event>,
}

impl Default for TestServerHandler {
    fn default() -> Self {
        Self {
            contact_status: ContactRequestStatus::Accepted,
            chat_tx: None,
            events: Vec::new(),
        }
    }
}

impl ConnectionHandler for TestServerHandler {
    fn handler_for(
        &mut self,
        channel_type: ricochet_core::ChannelType,
    ) -> Option<ricochet_core::ChannelHandler> {
        use ricochet_core::{ChannelHandler, ChannelType, ChatChannel, ContactRequestChannel};
        match channel_type {
            ChannelType::Chat => Some(ChannelHandler::Chat(ChatChannel::new())),
            ChannelType::ContactRequest => Some(ChannelHandler::ContactRequest(
                ContactRequestChannel::inbound(),
            )),
            ChannelType::Auth => None,
        }
    }

    fn event(&mut self, event: Event) {
        self.events.push(event);
    }

    fn contact_request(&mut self, _nickname: &str, _message: &str) -> ContactRequestStatus {
        self.contact_status
    }

    fn chat_message(&mut self, id: u32, _when: std::time::SystemTime, text: &str) -> bool {
        if let Some(tx) = &self.chat_tx {
            let _ = tx.send((id, text.to_string()));
        }
        true
    }
}
