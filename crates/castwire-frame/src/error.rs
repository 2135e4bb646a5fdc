/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame length exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame body is not a valid `CastMessage`.
    ///
    /// The frame was fully consumed, so the stream is still aligned.
    #[error("undecodable message body: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The message could not be encoded into the output buffer.
    #[error("message encode failed: {0}")]
    Encode(#[from] prost::EncodeError),

    /// A write did not complete before the configured deadline.
    #[error("write timed out after {0:?}")]
    WriteTimeout(std::time::Duration),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether the stream can keep being read after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::Decode(_))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
