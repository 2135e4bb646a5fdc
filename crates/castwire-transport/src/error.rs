use std::net::SocketAddr;

/// Errors that can occur while establishing a receiver connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Host name resolution failed.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        source: std::io::Error,
    },

    /// Resolution succeeded but produced no usable address.
    #[error("no addresses found for {host}")]
    NoAddress { host: String },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// A connection step did not finish before its deadline.
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// The host cannot be used as a TLS server name.
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    /// TLS configuration or handshake failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
