//! Packet framing
//!
//! Every frame is a 2-byte big-endian total length (header included), a
//! 2-byte big-endian channel identifier, and the payload. The declared
//! length must be at least the header size; reads retry until the whole
//! frame has arrived.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{WireError, WireResult};
use crate::{HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// A framed protocol packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Channel identifier (0 is the control channel)
    pub channel: u16,

    /// Packet payload
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet
    pub fn new(channel: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }

    /// An empty payload on a nonzero channel closes that channel
    pub fn is_close(&self) -> bool {
        self.channel != 0 && self.payload.is_empty()
    }
}

/// Read one whole frame from the stream.
///
/// EOF before or inside a frame is `WireError::ConnectionClosed`; a declared
/// length below the header size is `WireError::Protocol`.
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> WireResult<Packet> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await?;

    let size = u16::from_be_bytes([header[0], header[1]]) as usize;
    let channel = u16::from_be_bytes([header[2], header[3]]);

    if size < HEADER_SIZE {
        return Err(WireError::Protocol(format!(
            "invalid frame size {size}"
        )));
    }

    let mut payload = vec![0u8; size - HEADER_SIZE];
    reader.read_exact(&mut payload).await?;

    Ok(Packet::new(channel, payload))
}

/// Write one whole frame to the stream.
///
/// Rejects payloads that would not fit in a 65535-byte frame before any
/// bytes reach the stream.
pub async fn write_packet<W: AsyncWrite + Unpin>(
    writer: &mut W,
    channel: u16,
    payload: &[u8],
) -> WireResult<()> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(WireError::PayloadTooLarge(payload.len()));
    }

    let size = (HEADER_SIZE + payload.len()) as u16;
    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u16(size);
    frame.put_u16(channel);
    frame.put_slice(payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn packet_roundtrip() {
        let mut buf = Vec::new();
        write_packet(&mut buf, 7, &[1, 2, 3, 4, 5]).await.unwrap();

        let mut reader = buf.as_slice();
        let packet = read_packet(&mut reader).await.unwrap();
        assert_eq!(packet.channel, 7);
        assert_eq!(&packet.payload[..], &[1, 2, 3, 4, 5]);
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn empty_payload_is_close_signal() {
        let mut buf = Vec::new();
        write_packet(&mut buf, 3, &[]).await.unwrap();

        let packet = read_packet(&mut buf.as_slice()).await.unwrap();
        assert!(packet.is_close());
        assert_eq!(packet.channel, 3);
    }

    #[tokio::test]
    async fn control_packet_is_never_close() {
        let mut buf = Vec::new();
        write_packet(&mut buf, 0, &[]).await.unwrap();
        let packet = read_packet(&mut buf.as_slice()).await.unwrap();
        assert!(!packet.is_close());
    }

    #[tokio::test]
    async fn undersized_frame_is_protocol_error() {
        // Declared length 3 < header size
        let buf = [0x00, 0x03, 0x00, 0x01];
        let err = read_packet(&mut buf.as_slice()).await.unwrap_err();
        assert!(matches!(err, WireError::Protocol(_)));
    }

    #[tokio::test]
    async fn eof_mid_header_is_connection_closed() {
        let buf = [0x00, 0x10];
        let err = read_packet(&mut buf.as_slice()).await.unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[tokio::test]
    async fn eof_mid_payload_is_connection_closed() {
        let buf = [0x00, 0x0a, 0x00, 0x01, 0xde, 0xad];
        let err = read_packet(&mut buf.as_slice()).await.unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_before_writing() {
        let mut buf = Vec::new();
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        let err = write_packet(&mut buf, 1, &payload).await.unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge(65532)));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn max_payload_fits() {
        let mut buf = Vec::new();
        let payload = vec![0xabu8; MAX_PAYLOAD_SIZE];
        write_packet(&mut buf, 1, &payload).await.unwrap();
        let packet = read_packet(&mut buf.as_slice()).await.unwrap();
        assert_eq!(packet.payload.len(), MAX_PAYLOAD_SIZE);
    }

    #[tokio::test]
    async fn back_to_back_frames_do_not_drop_bytes() {
        let mut buf = Vec::new();
        write_packet(&mut buf, 1, b"first").await.unwrap();
        write_packet(&mut buf, 2, b"second").await.unwrap();

        let mut reader = buf.as_slice();
        let first = read_packet(&mut reader).await.unwrap();
        let second = read_packet(&mut reader).await.unwrap();
        assert_eq!(&first.payload[..], b"first");
        assert_eq!(second.channel, 2);
        assert_eq!(&second.payload[..], b"second");
    }
}
