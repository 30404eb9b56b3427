//! Connection error types

use thiserror::Error;

use crate::channel::ChannelType;
use ricochet_crypto::CryptoError;
use ricochet_wire::WireError;

/// Errors surfaced by the connection engine
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Transport failure during version negotiation
    #[error("Version negotiation error")]
    VersionNegotiationError,

    /// The peer explicitly offered or selected no supported version
    #[error("Version negotiation failed")]
    VersionNegotiationFailed,

    /// The underlying stream closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// The peer violated the protocol
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The remote side closed a channel
    #[error("Channel closed by peer")]
    ChannelClosedByPeer,

    /// No handler exists for the requested channel type
    #[error("Unknown channel type")]
    UnknownChannelType,

    /// The peer may not open channels of this type
    #[error("Unauthorized channel type")]
    UnauthorizedChannelType,

    /// The operation requires authentication this connection lacks
    #[error("Unauthorized action")]
    UnauthorizedAction,

    /// The channel identifier is already registered
    #[error("Channel {0} already in use")]
    ChannelInUse(u16),

    /// The channel identifier does not match the opener's parity
    #[error("Channel {0} has wrong parity for opener")]
    BadParity(u16),

    /// A second singleton channel of the same type and direction
    #[error("Singleton violation for channel type {0}")]
    SingletonViolation(ChannelType),

    /// No live channel matches the request
    #[error("No such channel")]
    NoSuchChannel,

    /// A policy timeout elapsed
    #[error("Action timed out")]
    ActionTimedOut,

    /// The caller's cancellation signal fired
    #[error("Action cancelled")]
    Cancelled,

    /// The client never produced a valid proof
    #[error("Client failed to authenticate")]
    ClientFailedToAuthenticate,

    /// The server refused our authentication
    #[error("Server rejected client connection")]
    ServerRejectedClientConnection,

    /// No private key was supplied for authentication
    #[error("Private key not set")]
    PrivateKeyNotSet,

    /// Wire layer error
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// Crypto layer error
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ConnectionError {
    /// Errors that end the connection rather than a single channel
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConnectionError::ConnectionClosed
                | ConnectionError::Wire(WireError::ConnectionClosed | WireError::Io(_))
        )
    }
}

/// Result type for connection operations
pub type ConnectionResult<T> = Result<T, ConnectionError>;
