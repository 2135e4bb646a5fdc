use futures_util::SinkExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedWrite;

use crate::codec::{CastCodec, FrameConfig};
use crate::error::{FrameError, Result};
use crate::message::CastMessage;

/// Writes complete frames to any `AsyncWrite` stream.
///
/// Each [`send`](Self::send) encodes the whole frame before writing and
/// flushes after it, so one writer never leaves a partial frame between calls.
pub struct FrameWriter<W> {
    inner: FramedWrite<W, CastCodec>,
    config: FrameConfig,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: W, config: FrameConfig) -> Self {
        let codec = CastCodec::new(config.max_payload_size);
        Self {
            inner: FramedWrite::new(inner, codec),
            config,
        }
    }

    /// Encode, write and flush one message.
    pub async fn send(&mut self, msg: &CastMessage) -> Result<()> {
        match self.config.write_timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.send(msg))
                .await
                .map_err(|_| FrameError::WriteTimeout(limit))?,
            None => self.inner.send(msg).await,
        }
    }

    /// Flush and shut down the write side of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        SinkExt::<&CastMessage>::flush(&mut self.inner).await?;
        self.inner.get_mut().shutdown().await?;
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }

    /// Update maximum payload size for subsequent frame encoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
        self.inner
            .encoder_mut()
            .set_max_payload_size(max_payload_size);
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use bytes::BytesMut;
    use prost::Message;

    use super::*;
    use crate::codec::{decode_frame, DEFAULT_MAX_PAYLOAD};
    use crate::reader::FrameReader;

    fn message(payload: &str) -> CastMessage {
        CastMessage::new_text("sender-0", "receiver-0", "urn:x-cast:test", payload)
    }

    fn decode_all(bytes: &[u8]) -> Vec<CastMessage> {
        let mut wire = BytesMut::from(bytes);
        let mut out = Vec::new();
        while let Some(body) = decode_frame(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap() {
            out.push(CastMessage::decode(body).unwrap());
        }
        assert!(wire.is_empty());
        out
    }

    #[tokio::test]
    async fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&message("hello")).await.unwrap();

        let written = writer.into_inner().into_inner();
        assert_eq!(decode_all(&written), vec![message("hello")]);
    }

    #[tokio::test]
    async fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&message("one")).await.unwrap();
        writer.send(&message("two")).await.unwrap();
        writer.send(&message("three")).await.unwrap();

        let written = writer.into_inner().into_inner();
        assert_eq!(
            decode_all(&written),
            vec![message("one"), message("two"), message("three")]
        );
    }

    #[tokio::test]
    async fn payload_too_large_rejected() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer.send(&message("oversized")).await.unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[tokio::test]
    async fn written_bytes_decode_with_reader() {
        let (left, right) = tokio::io::duplex(4096);
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(&message("z")).await.unwrap();
        assert_eq!(reader.read_message().await.unwrap(), message("z"));
    }

    #[tokio::test]
    async fn write_to_closed_peer_fails() {
        let (left, right) = tokio::io::duplex(64);
        drop(right);
        let mut writer = FrameWriter::new(left);

        let err = writer.send(&message("nobody home")).await.unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
    }

    #[tokio::test]
    async fn stalled_peer_hits_write_timeout() {
        let cfg = FrameConfig {
            write_timeout: Some(Duration::from_millis(20)),
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(StalledWriter, cfg);

        let err = writer.send(&message("stuck")).await.unwrap_err();
        assert!(matches!(err, FrameError::WriteTimeout(_)));
    }

    #[tokio::test]
    async fn shutdown_closes_write_side() {
        let (left, right) = tokio::io::duplex(4096);
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.shutdown().await.unwrap();
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::ConnectionClosed)
        ));
    }

    struct StalledWriter;

    impl AsyncWrite for StalledWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Pending
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Pending
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }
}
