//! Wire framing for the `CHAT_PROTOCOL` libp2p stream (spec §6): a tagged
//! JSON envelope per message, each prefixed with a 4-byte big-endian length.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::handshake::{KeyExchangeInit, KeyExchangeResponse};

/// Frames never exceed this size; anything larger on the wire is a protocol
/// violation, not a local bug, so it is rejected before allocating.
pub const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatFrame {
    #[serde(rename = "key_exchange")]
    KeyExchangeInit(KeyExchangeInit),

    #[serde(rename = "key_exchange_response")]
    KeyExchangeResponse(KeyExchangeResponse),

    #[serde(rename = "encrypted")]
    Encrypted {
        #[serde_as(as = "serde_with::base64::Base64")]
        content: Vec<u8>,
        #[serde_as(as = "serde_with::base64::Base64")]
        nonce: Vec<u8>,
        #[serde(rename = "senderUsername", skip_serializing_if = "Option::is_none")]
        sender_username: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        offline_ack_timestamp: Option<u64>,
    },

    #[serde(rename = "plain")]
    Plain { content: String },
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame of {0} bytes exceeds the {1}-byte limit")]
    TooLarge(u32, u32),

    #[error("frame stream closed")]
    Closed,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Write one length-prefixed JSON frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &ChatFrame) -> Result<()> {
    let body = serde_json::to_vec(frame)?;
    let len = u32::try_from(body.len()).map_err(|_| FrameError::TooLarge(u32::MAX, MAX_FRAME_BYTES))?;
    if len > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge(len, MAX_FRAME_BYTES));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed JSON frame, or `Ok(None)` on a clean EOF before
/// any bytes of the next frame arrive.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<ChatFrame>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge(len, MAX_FRAME_BYTES));
    }

    let mut body = vec![0u8; len as usize];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|_| FrameError::Closed)?;

    let frame = serde_json::from_slice(&body)?;
    Ok(Some(frame))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_frame_roundtrip() {
        let frame = ChatFrame::Plain {
            content: "hello".to_string(),
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.expect("write");

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_frame(&mut cursor).await.expect("read").expect("some frame");
        match decoded {
            ChatFrame::Plain { content } => assert_eq!(content, "hello"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_encrypted_frame_roundtrip() {
        let frame = ChatFrame::Encrypted {
            content: vec![1, 2, 3, 4],
            nonce: vec![9; 24],
            sender_username: Some("alice".to_string()),
            offline_ack_timestamp: Some(1_700_000_000),
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.expect("write");

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_frame(&mut cursor).await.expect("read").expect("some frame");
        match decoded {
            ChatFrame::Encrypted { content, nonce, sender_username, .. } => {
                assert_eq!(content, vec![1, 2, 3, 4]);
                assert_eq!(nonce, vec![9; 24]);
                assert_eq!(sender_username.as_deref(), Some("alice"));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_multiple_frames_in_sequence() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &ChatFrame::Plain { content: "one".into() })
            .await
            .expect("write 1");
        write_frame(&mut buf, &ChatFrame::Plain { content: "two".into() })
            .await
            .expect("write 2");

        let mut cursor = std::io::Cursor::new(buf);
        let first = read_frame(&mut cursor).await.expect("read").expect("frame 1");
        let second = read_frame(&mut cursor).await.expect("read").expect("frame 2");
        assert!(matches!(first, ChatFrame::Plain { content } if content == "one"));
        assert!(matches!(second, ChatFrame::Plain { content } if content == "two"));
    }

    #[tokio::test]
    async fn test_eof_before_next_frame_returns_none() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let result = read_frame(&mut cursor).await.expect("read");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_oversized_length_prefix_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge(_, _)));
    }
}
