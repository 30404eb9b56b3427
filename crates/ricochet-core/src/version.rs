//! Version negotiation
//!
//! The first bytes on every connection. The dialer sends two magic bytes,
//! a version count and the version list; the acceptor answers with the
//! highest version it supports, or 0xff for none.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ConnectionError, ConnectionResult};
use crate::PROTOCOL_VERSION;

const MAGIC: [u8; 2] = [0x49, 0x4D];
const VERSION_NONE: u8 = 0xff;

/// Dial-side negotiation: offer version 1, read the selection.
pub async fn negotiate_version_outbound<S>(stream: &mut S) -> ConnectionResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let offer = [MAGIC[0], MAGIC[1], 0x01, PROTOCOL_VERSION];
    stream
        .write_all(&offer)
        .await
        .map_err(|_| ConnectionError::VersionNegotiationError)?;
    stream
        .flush()
        .await
        .map_err(|_| ConnectionError::VersionNegotiationError)?;

    let mut selected = [0u8; 1];
    stream
        .read_exact(&mut selected)
        .await
        .map_err(|_| ConnectionError::VersionNegotiationError)?;

    match selected[0] {
        PROTOCOL_VERSION => {
            debug!(version = PROTOCOL_VERSION, "negotiated protocol version");
            Ok(())
        }
        VERSION_NONE => Err(ConnectionError::VersionNegotiationFailed),
        other => {
            debug!(selected = other, "peer selected unsupported version");
            Err(ConnectionError::VersionNegotiationError)
        }
    }
}

/// Accept-side negotiation: read the offer, select version 1 if present,
/// otherwise answer 0xff and fail.
pub async fn negotiate_version_inbound<S>(stream: &mut S) -> ConnectionResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = [0u8; 3];
    stream
        .read_exact(&mut header)
        .await
        .map_err(|_| ConnectionError::VersionNegotiationError)?;

    if header[0] != MAGIC[0] || header[1] != MAGIC[1] || header[2] == 0 {
        return Err(ConnectionError::VersionNegotiationError);
    }

    let mut versions = vec![0u8; header[2] as usize];
    stream
        .read_exact(&mut versions)
        .await
        .map_err(|_| ConnectionError::VersionNegotiationError)?;

    let selected = if versions.contains(&PROTOCOL_VERSION) {
        PROTOCOL_VERSION
    } else {
        VERSION_NONE
    };
    stream
        .write_all(&[selected])
        .await
        .map_err(|_| ConnectionError::VersionNegotiationError)?;
    stream
        .flush()
        .await
        .map_err(|_| ConnectionError::VersionNegotiationError)?;

    if selected == VERSION_NONE {
        debug!(offered = ?versions, "no common protocol version");
        return Err(ConnectionError::VersionNegotiationFailed);
    }
    debug!(version = selected, "negotiated protocol version");
    Ok(())
}
