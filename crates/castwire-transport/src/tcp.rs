use std::time::Duration;

use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::tls::{server_name, TlsMode};
use crate::traits::CastStream;

/// Port receivers listen on.
pub const DEFAULT_PORT: u16 = 8009;

/// Configuration for establishing a receiver stream.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Deadline for resolution plus TCP connect.
    pub connect_timeout: Duration,
    /// Deadline for the TLS handshake.
    pub tls_handshake_timeout: Duration,
    /// Stream security.
    pub tls: TlsMode,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            tls_handshake_timeout: Duration::from_secs(10),
            tls: TlsMode::default(),
        }
    }
}

/// Resolve `host`, connect, and secure the stream per `config.tls`.
pub async fn connect(host: &str, port: u16, config: &TransportConfig) -> Result<CastStream> {
    let tcp = timeout(config.connect_timeout, connect_tcp(host, port))
        .await
        .map_err(|_| TransportError::Timeout {
            operation: format!("TCP connect to {host}:{port}"),
        })??;
    tcp.set_nodelay(true)?;

    let Some(connector) = config.tls.connector()? else {
        info!(host, port, "connected (plaintext)");
        return Ok(CastStream::plain(tcp));
    };

    let name = server_name(host)?;
    let stream = timeout(config.tls_handshake_timeout, connector.connect(name, tcp))
        .await
        .map_err(|_| TransportError::Timeout {
            operation: format!("TLS handshake with {host}:{port}"),
        })?
        .map_err(|e| TransportError::Tls(format!("handshake failed: {e}")))?;

    info!(host, port, "connected (tls)");
    Ok(CastStream::tls(stream))
}

async fn connect_tcp(host: &str, port: u16) -> Result<TcpStream> {
    let addrs = lookup_host((host, port))
        .await
        .map_err(|source| TransportError::Resolve {
            host: host.to_string(),
            source,
        })?;

    let mut last = TransportError::NoAddress {
        host: host.to_string(),
    };
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                debug!(%addr, "tcp connected");
                return Ok(stream);
            }
            Err(source) => {
                debug!(%addr, error = %source, "tcp connect attempt failed");
                last = TransportError::Connect { addr, source };
            }
        }
    }
    Err(last)
}
