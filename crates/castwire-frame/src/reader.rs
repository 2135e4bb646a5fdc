use bytes::Bytes;
use futures_util::StreamExt;
use prost::Message;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::codec::{CastCodec, FrameConfig};
use crate::error::{FrameError, Result};
use crate::message::CastMessage;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Reads complete frames from any `AsyncRead` stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<R> {
    inner: FramedRead<R, CastCodec>,
    config: FrameConfig,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        let codec = CastCodec::new(config.max_payload_size);
        Self {
            inner: FramedRead::with_capacity(inner, codec, INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame body.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub async fn read_frame(&mut self) -> Result<Bytes> {
        match self.inner.next().await {
            Some(result) => result,
            None => Err(FrameError::ConnectionClosed),
        }
    }

    /// Read the next frame and decode it as a message.
    ///
    /// A [`FrameError::Decode`] leaves the reader positioned at the next frame.
    pub async fn read_message(&mut self) -> Result<CastMessage> {
        let body = self.read_frame().await?;
        Ok(CastMessage::decode(body)?)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    /// Update maximum payload size for subsequent frame decoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
        self.inner
            .decoder_mut()
            .set_max_payload_size(max_payload_size);
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
