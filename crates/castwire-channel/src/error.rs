/// Errors that can occur in connection and channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Transport establishment failed (resolution, refusal, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] castwire_transport::TransportError),

    /// Frame-level error, usually a failed write.
    #[error("frame error: {0}")]
    Frame(#[from] castwire_frame::FrameError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload cannot carry the header contract.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// No reply arrived before the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The connection is closed.
    #[error("connection closed: {0}")]
    Disconnected(String),

    /// The receiver answered with something other than the expected reply.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
