//! Connection engine
//!
//! Owns one duplex byte stream. A dedicated reader task blocks on frame
//! reads and hands packets to the process loop over a one-deep queue;
//! the process loop is the sole executor of channel handlers and
//! application callbacks, and all writes are serialized through the
//! engine. Code running outside the process task gains safe access
//! through the turn hand-off in [`Connection::execute`].

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use ricochet_wire::contact::ContactRequestStatus;
use ricochet_wire::control::{self, ChannelResult, CommonError, ControlMessage, OpenChannel};
use ricochet_wire::{Packet, WireError, WireResult};

use crate::channel::{Channel, ChannelOps, ChannelType, ConnectionSide, Direction};
use crate::channels::{ChannelHandler, InboundReply};
use crate::error::{ConnectionError, ConnectionResult};
use crate::event::Event;
use crate::handler::ConnectionHandler;
use crate::manager::ChannelManager;
use crate::policies::UNKNOWN_PURPOSE_TIMEOUT;
use crate::version;

/// Any duplex byte stream the engine can drive
pub trait RawStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> RawStream for T {}

type StreamBox = Box<dyn RawStream>;

/// A queued request for exclusive access to the connection
struct TurnRequest {
    grant: oneshot::Sender<()>,
    done: oneshot::Receiver<()>,
}

/// Receivers consumed only by the process loop
struct LoopReceivers {
    packets: mpsc::Receiver<WireResult<Packet>>,
    turns: mpsc::Receiver<TurnRequest>,
    breaks: mpsc::Receiver<()>,
}

/// The state of one protocol connection
pub struct Connection {
    side: ConnectionSide,
    writer: Mutex<WriteHalf<StreamBox>>,
    loop_rx: Mutex<LoopReceivers>,
    turn_tx: mpsc::Sender<TurnRequest>,
    break_tx: mpsc::Sender<()>,
    channels: Mutex<ChannelManager>,
    auth_state: Mutex<HashSet<ChannelType>>,
    remote_hostname: Mutex<Option<String>>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Dial-side constructor: negotiates the protocol version, then
    /// starts the reader task. `remote_hostname` is the onion hostname we
    /// dialed (with or without the `.onion` suffix).
    pub async fn new_outbound<S>(mut stream: S, remote_hostname: &str) -> ConnectionResult<Arc<Self>>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        UNKNOWN_PURPOSE_TIMEOUT
            .execute(version::negotiate_version_outbound(&mut stream))
            .await?;
        let hostname = remote_hostname.trim_end_matches(".onion").to_string();
        Ok(Self::start(
            Box::new(stream),
            ConnectionSide::Client,
            Some(hostname),
        ))
    }

    /// Accept-side constructor: answers the peer's version negotiation,
    /// then starts the reader task. The remote hostname becomes known
    /// after authentication.
    pub async fn new_inbound<S>(mut stream: S) -> ConnectionResult<Arc<Self>>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        UNKNOWN_PURPOSE_TIMEOUT
            .execute(version::negotiate_version_inbound(&mut stream))
            .await?;
        Ok(Self::start(Box::new(stream), ConnectionSide::Server, None))
    }

    fn start(stream: StreamBox, side: ConnectionSide, remote_hostname: Option<String>) -> Arc<Self> {
        let (read_half, write_half) = tokio::io::split(stream);
        let (packet_tx, packet_rx) = mpsc::channel(1);
        let (turn_tx, turn_rx) = mpsc::channel(1);
        let (break_tx, break_rx) = mpsc::channel(1);

        let reader = tokio::spawn(Self::read_loop(read_half, packet_tx));

        let manager = match side {
            ConnectionSide::Client => ChannelManager::new_client(),
            ConnectionSide::Server => ChannelManager::new_server(),
        };

        Arc::new(Self {
            side,
            writer: Mutex::new(write_half),
            loop_rx: Mutex::new(LoopReceivers {
                packets: packet_rx,
                turns: turn_rx,
                breaks: break_rx,
            }),
            turn_tx,
            break_tx,
            channels: Mutex::new(manager),
            auth_state: Mutex::new(HashSet::new()),
            remote_hostname: Mutex::new(remote_hostname),
            reader,
        })
    }

    /// Reader task: frames packets off the stream until it fails
    async fn read_loop(
        mut read_half: ReadHalf<StreamBox>,
        packet_tx: mpsc::Sender<WireResult<Packet>>,
    ) {
        loop {
            match ricochet_wire::read_packet(&mut read_half).await {
                Ok(packet) => {
                    trace!(channel = packet.channel, len = packet.payload.len(), "read packet");
                    if packet_tx.send(Ok(packet)).await.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let _ = packet_tx.send(Err(err)).await;
                    return;
                }
            }
        }
    }

    /// Which side of the connection we are
    pub fn side(&self) -> ConnectionSide {
        self.side
    }

    /// Whether the connection holds the given authentication
    pub async fn is_authenticated(&self, channel_type: ChannelType) -> bool {
        self.auth_state.lock().await.contains(&channel_type)
    }

    /// The peer's onion hostname: known from dialing on outbound
    /// connections, known after authentication on inbound ones.
    pub async fn remote_hostname(&self) -> Option<String> {
        self.remote_hostname.lock().await.clone()
    }

    /// Identifier of the live channel matching a type and direction
    pub async fn channel(&self, channel_type: ChannelType, direction: Direction) -> Option<u16> {
        self.channels.lock().await.channel_id(channel_type, direction)
    }

    /// Close the write side of the stream
    pub async fn shutdown(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }

    pub(crate) async fn send_packet(&self, channel: u16, payload: &[u8]) -> ConnectionResult<()> {
        let mut writer = self.writer.lock().await;
        ricochet_wire::write_packet(&mut *writer, channel, payload).await?;
        Ok(())
    }

    /// Ask the process loop to return after its current step. Safe to
    /// call from application callbacks running on the process task.
    pub fn request_break(&self) {
        let _ = self.break_tx.try_send(());
    }

    /// Run `f` with exclusive access to the connection while the process
    /// loop is suspended at its next wait.
    ///
    /// Must not be called from code already running on the process task
    /// (callbacks, channel handlers); that would deadlock. Inside a
    /// callback, use engine operations directly instead.
    pub async fn execute<F, Fut, R>(&self, f: F) -> ConnectionResult<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let (grant_tx, grant_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        self.turn_tx
            .send(TurnRequest {
                grant: grant_tx,
                done: done_rx,
            })
            .await
            .map_err(|_| ConnectionError::ConnectionClosed)?;
        grant_rx
            .await
            .map_err(|_| ConnectionError::ConnectionClosed)?;

        let result = f().await;
        let _ = done_tx.send(());
        Ok(result)
    }

    /// Like [`Connection::execute`], but gives up if `cancel` completes
    /// before the process loop grants the turn.
    pub async fn execute_cancellable<C, F, Fut, R>(&self, cancel: C, f: F) -> ConnectionResult<R>
    where
        C: Future<Output = ()>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        tokio::pin!(cancel);

        let (grant_tx, grant_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let request = TurnRequest {
            grant: grant_tx,
            done: done_rx,
        };

        tokio::select! {
            biased;
            _ = &mut cancel => return Err(ConnectionError::Cancelled),
            sent = self.turn_tx.send(request) => {
                sent.map_err(|_| ConnectionError::ConnectionClosed)?;
            }
        }

        // If cancelled now, dropping the grant receiver and completion
        // sender lets the loop skip the stale request.
        tokio::select! {
            biased;
            _ = &mut cancel => return Err(ConnectionError::Cancelled),
            granted = grant_rx => {
                granted.map_err(|_| ConnectionError::ConnectionClosed)?;
            }
        }

        let result = f().await;
        let _ = done_tx.send(());
        Ok(result)
    }

    /// Ask the peer to open a channel driven by `handler`.
    ///
    /// Ok means the request was issued; acceptance arrives asynchronously
    /// as a ChannelResult. Fails synchronously (with nothing sent) if the
    /// handler's required authentication is missing.
    pub async fn request_open_channel(&self, handler: ChannelHandler) -> ConnectionResult<u16> {
        if let Some(required) = handler.requires_authentication() {
            if !self.is_authenticated(required).await {
                return Err(ConnectionError::UnauthorizedAction);
            }
        }

        let id = self.channels.lock().await.open_local(handler)?;
        let mut chan = self
            .channels
            .lock()
            .await
            .take(id)
            .ok_or(ConnectionError::NoSuchChannel)?;

        match chan.handler.open_outbound(id) {
            Ok(bytes) => {
                debug!(id, channel_type = %chan.channel_type(), "requesting channel open");
                self.send_packet(0, &bytes).await?;
                self.channels.lock().await.insert(chan);
                Ok(id)
            }
            Err(err) => {
                debug!(id, %err, "local channel open failed");
                Err(err)
            }
        }
    }

    /// Send a chat message on the outbound chat channel, returning the
    /// identifier the acknowledgement will carry.
    pub async fn send_chat_message(&self, text: &str) -> ConnectionResult<u32> {
        let id = self
            .channels
            .lock()
            .await
            .channel_id(ChannelType::Chat, Direction::Outbound)
            .ok_or(ConnectionError::NoSuchChannel)?;
        let mut chan = self
            .channels
            .lock()
            .await
            .take(id)
            .ok_or(ConnectionError::NoSuchChannel)?;

        let mut ops = ChannelOps::new(self, id);
        let result = match &mut chan.handler {
            ChannelHandler::Chat(chat) => chat.send_message(&mut ops, text).await,
            _ => Err(ConnectionError::NoSuchChannel),
        };
        self.channels.lock().await.insert(chan);
        result
    }

    /// Deliver the definitive response for a pending inbound contact
    /// request. A definitive status also closes the channel.
    pub async fn respond_contact_request(
        &self,
        status: ContactRequestStatus,
    ) -> ConnectionResult<()> {
        let id = self
            .channels
            .lock()
            .await
            .channel_id(ChannelType::ContactRequest, Direction::Inbound)
            .ok_or(ConnectionError::NoSuchChannel)?;

        self.send_packet(id, &ricochet_wire::contact::contact_response(status)?)
            .await?;

        if status != ContactRequestStatus::Pending {
            self.close_channel(id).await?;
        }
        Ok(())
    }

    /// Close a channel we hold open. Closing an unknown or already-closed
    /// channel is a no-op.
    pub async fn close_channel(&self, id: u16) -> ConnectionResult<()> {
        if self.channels.lock().await.remove(id).is_none() {
            return Ok(());
        }
        self.send_packet(id, &[]).await
    }

    /// Receive socket and protocol events for the connection, invoking
    /// `handler` for every event. Blocks until the connection closes
    /// (returning the error) or [`Connection::request_break`] is called
    /// (returning Ok without closing the stream, so a later call can
    /// resume).
    pub async fn process(&self, handler: &mut dyn ConnectionHandler) -> ConnectionResult<()> {
        let mut guard = self.loop_rx.lock().await;
        let LoopReceivers {
            packets,
            turns,
            breaks,
        } = &mut *guard;
        trace!("entering process loop");
        handler.on_ready(self);

        loop {
            tokio::select! {
                biased;
                Some(turn) = turns.recv() => {
                    trace!("granting connection turn");
                    if turn.grant.send(()).is_ok() {
                        let _ = turn.done.await;
                    }
                }
                Some(()) = breaks.recv() => {
                    trace!("process loop break");
                    return Ok(());
                }
                packet = packets.recv() => {
                    let result = match packet {
                        Some(Ok(packet)) => self.dispatch(handler, packet).await,
                        Some(Err(err)) => Err(err.into()),
                        None => Err(ConnectionError::ConnectionClosed),
                    };
                    if let Err(err) = result {
                        debug!(%err, "connection failed");
                        self.shutdown().await;
                        handler.on_closed(&err);
                        return Err(err);
                    }
                }
            }
        }
    }

    async fn dispatch(
        &self,
        app: &mut dyn ConnectionHandler,
        packet: Packet,
    ) -> ConnectionResult<()> {
        if packet.channel == 0 {
            match control::decode_control(&packet.payload) {
                Ok(msg) => self.control_packet(app, msg).await,
                Err(err) => {
                    warn!(%err, "dropping malformed control packet");
                    Ok(())
                }
            }
        } else {
            self.channel_packet(app, packet).await
        }
    }

    async fn control_packet(
        &self,
        app: &mut dyn ConnectionHandler,
        msg: ControlMessage,
    ) -> ConnectionResult<()> {
        match msg {
            ControlMessage::OpenChannel(oc) => self.handle_open_channel(app, oc).await,
            ControlMessage::ChannelResult(cr) => self.handle_channel_result(app, cr).await,
            ControlMessage::KeepAlive { response_requested } => {
                trace!(response_requested, "keep alive");
                if response_requested {
                    self.send_packet(0, &control::keep_alive(false)?).await?;
                }
                Ok(())
            }
            ControlMessage::EnableFeatures { features } => {
                trace!(?features, "enable features");
                self.send_packet(0, &control::features_enabled(&[])?).await
            }
            ControlMessage::FeaturesEnabled { .. } => {
                // Never solicited; ignore
                trace!("unsolicited features enabled");
                Ok(())
            }
        }
    }

    async fn reject_open(&self, id: i32, reason: CommonError) -> ConnectionResult<()> {
        self.send_packet(0, &control::reject_open_channel(id, reason)?)
            .await
    }

    async fn handle_open_channel(
        &self,
        app: &mut dyn ConnectionHandler,
        oc: OpenChannel,
    ) -> ConnectionResult<()> {
        let id32 = oc.channel_identifier;
        let Ok(id) = u16::try_from(id32) else {
            return self.reject_open(id32, CommonError::Generic).await;
        };

        let Some(ctype) = ChannelType::from_type_string(&oc.channel_type) else {
            debug!(channel_type = %oc.channel_type, "open for unknown channel type");
            return self.reject_open(id32, CommonError::UnknownType).await;
        };
        let Some(handler) = app.handler_for(ctype) else {
            debug!(%ctype, "application has no handler for channel type");
            return self.reject_open(id32, CommonError::UnknownType).await;
        };

        if let Some(required) = handler.requires_authentication() {
            if !self.is_authenticated(required).await {
                debug!(%ctype, "peer lacks authentication for channel type");
                return self.send_packet(0, &[]).await;
            }
        }

        if let Err(err) = self.channels.lock().await.open_from_peer(id, handler) {
            debug!(id, %err, "rejecting channel open");
            let reason = match err {
                ConnectionError::UnauthorizedChannelType => CommonError::Unauthorized,
                _ => CommonError::Generic,
            };
            return self.reject_open(id32, reason).await;
        }

        let Some(mut chan) = self.channels.lock().await.take(id) else {
            return Ok(());
        };

        match chan.handler.open_inbound(id, app, &oc) {
            Ok(InboundReply { reply, pending }) => {
                chan.pending = pending;
                let replied = reply.is_some();
                if let Some(bytes) = reply {
                    self.send_packet(0, &bytes).await?;
                }
                if !replied && !pending {
                    // The handler produced no result and deferred nothing
                    self.send_packet(0, &[]).await
                } else {
                    debug!(id, %ctype, "inbound channel open");
                    self.channels.lock().await.insert(chan);
                    app.event(Event::ChannelOpened {
                        id,
                        channel_type: ctype,
                    });
                    Ok(())
                }
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                debug!(id, %err, "inbound open failed");
                let reason = match &err {
                    ConnectionError::Wire(WireError::BadUsage(_)) => CommonError::BadUsage,
                    _ => CommonError::Generic,
                };
                self.reject_open(id32, reason).await
            }
        }
    }

    async fn handle_channel_result(
        &self,
        app: &mut dyn ConnectionHandler,
        cr: ChannelResult,
    ) -> ConnectionResult<()> {
        let Ok(id) = u16::try_from(cr.channel_identifier) else {
            return Ok(());
        };
        let Some(mut chan) = self.channels.lock().await.take(id) else {
            debug!(id, "channel result for unknown channel");
            return Ok(());
        };
        let ctype = chan.channel_type();
        let mut ops = ChannelOps::new(self, id);

        if cr.opened {
            debug!(id, %ctype, "channel open accepted");
            chan.pending = false;
            let outcome = chan.handler.open_outbound_result(&mut ops, app, Ok(&cr)).await;
            if outcome.is_ok() && !ops.close_requested {
                app.event(Event::ChannelOpened {
                    id,
                    channel_type: ctype,
                });
            }
            self.finish_dispatch(app, chan, ops, outcome).await
        } else {
            let reason = cr.common_error.unwrap_or(CommonError::Generic);
            debug!(id, %ctype, ?reason, "channel open rejected");
            let outcome = chan
                .handler
                .open_outbound_result(&mut ops, app, Err(reason))
                .await;
            app.event(Event::ChannelRejected {
                id,
                channel_type: ctype,
            });
            // The channel registration is discarded either way
            match outcome {
                Err(err) if err.is_fatal() => Err(err),
                _ => Ok(()),
            }
        }
    }

    async fn channel_packet(
        &self,
        app: &mut dyn ConnectionHandler,
        packet: Packet,
    ) -> ConnectionResult<()> {
        let id = packet.channel;
        let Some(mut chan) = self.channels.lock().await.take(id) else {
            // Unknown channel: answer nonempty data with a single close
            if !packet.payload.is_empty() {
                debug!(id, "packet on unknown channel; closing");
                self.send_packet(id, &[]).await?;
            }
            return Ok(());
        };
        let ctype = chan.channel_type();

        if packet.payload.is_empty() {
            debug!(id, %ctype, "channel closed by peer");
            chan.handler
                .closed(app, &ConnectionError::ChannelClosedByPeer);
            app.event(Event::ChannelClosed {
                id,
                channel_type: ctype,
            });
            return Ok(());
        }

        let mut ops = ChannelOps::new(self, id);
        let outcome = chan.handler.packet(&mut ops, app, &packet.payload).await;
        self.finish_dispatch(app, chan, ops, outcome).await
    }

    /// Apply the effects a handler recorded on its ops token and settle
    /// the channel's fate.
    async fn finish_dispatch(
        &self,
        app: &mut dyn ConnectionHandler,
        mut chan: Channel,
        ops: ChannelOps<'_>,
        outcome: ConnectionResult<()>,
    ) -> ConnectionResult<()> {
        let id = chan.id;
        let ctype = chan.channel_type();
        match outcome {
            Ok(()) => {
                if let Some((auth_type, hostname)) = ops.delegated {
                    debug!(%auth_type, "connection authenticated");
                    self.auth_state.lock().await.insert(auth_type);
                    if let Some(hostname) = hostname {
                        *self.remote_hostname.lock().await = Some(hostname);
                    }
                }
                if ops.close_requested {
                    app.event(Event::ChannelClosed {
                        id,
                        channel_type: ctype,
                    });
                } else {
                    self.channels.lock().await.insert(chan);
                }
                Ok(())
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(id, %err, "channel error; closing channel");
                if !ops.close_requested {
                    self.send_packet(id, &[]).await?;
                }
                chan.handler.closed(app, &err);
                app.event(Event::ChannelClosed {
                    id,
                    channel_type: ctype,
                });
                Ok(())
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("side", &self.side)
            .finish()
    }
}
