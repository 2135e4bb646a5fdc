use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use castwire_frame::{CastMessage, FrameConfig, FrameError, FrameReader, FrameWriter};
use castwire_transport::{CastStream, TransportConfig, TransportError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::{Channel, WeakChannel};
use crate::error::{ChannelError, Result};
use crate::payload::PayloadHeaders;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// How long [`Connection::close`] spends flushing before dropping the stream.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

/// Configuration for opening a [`Connection`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    pub transport: TransportConfig,
    pub frame: FrameConfig,
    /// Deadline for the whole setup: resolution, TCP connect and handshake.
    pub setup_timeout: Option<Duration>,
}

impl ConnectionConfig {
    /// Default configuration with connection setup bounded by `timeout` overall.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            transport: TransportConfig {
                connect_timeout: timeout,
                tls_handshake_timeout: timeout,
                ..TransportConfig::default()
            },
            frame: FrameConfig::default(),
            setup_timeout: Some(timeout),
        }
    }
}

/// Why a connection stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// [`Connection::close`] was called.
    Local,
    /// The receiver closed the stream.
    PeerClosed,
    /// A read or write failed.
    Error(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Local => f.write_str("closed locally"),
            CloseReason::PeerClosed => f.write_str("closed by peer"),
            CloseReason::Error(e) => write!(f, "connection failed: {e}"),
        }
    }
}

/// One framed stream to a receiver, shared by every [`Channel`] bound to it.
///
/// Cloning is cheap and yields another handle to the same stream. A
/// background task reads frames and dispatches them to the bound channels in
/// binding order. The connection closes when the peer hangs up, a framing
/// error occurs, [`close`](Self::close) is called, or the last handle drops.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    writer: tokio::sync::Mutex<FrameWriter<BoxedWriter>>,
    state: Mutex<State>,
    closed: CancellationToken,
    peer_addr: Option<SocketAddr>,
}

#[derive(Default)]
struct State {
    channels: Vec<WeakChannel>,
    reason: Option<CloseReason>,
}

impl Connection {
    /// Connect to a receiver with default settings and `timeout` for setup.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        Self::connect_with_config(host, port, &ConnectionConfig::with_timeout(timeout)).await
    }

    /// Connect with explicit transport and framing configuration.
    pub async fn connect_with_config(
        host: &str,
        port: u16,
        config: &ConnectionConfig,
    ) -> Result<Self> {
        let setup = castwire_transport::connect(host, port, &config.transport);
        let stream: CastStream = match config.setup_timeout {
            Some(limit) => tokio::time::timeout(limit, setup).await.map_err(|_| {
                TransportError::Timeout {
                    operation: format!("connection setup with {host}:{port}"),
                }
            })??,
            None => setup.await?,
        };
        let peer_addr = stream.peer_addr().ok();
        Ok(Self::spawn(stream, config.frame.clone(), peer_addr))
    }

    /// Bind an already established byte stream.
    ///
    /// Spawns the read loop, so this must be called within a Tokio runtime.
    pub fn from_stream<S>(stream: S, config: FrameConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::spawn(stream, config, None)
    }

    fn spawn<S>(stream: S, config: FrameConfig, peer_addr: Option<SocketAddr>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let writer: BoxedWriter = Box::new(write_half);
        let inner = Arc::new(ConnectionInner {
            writer: tokio::sync::Mutex::new(FrameWriter::with_config(writer, config.clone())),
            state: Mutex::new(State::default()),
            closed: CancellationToken::new(),
            peer_addr,
        });

        let reader = FrameReader::with_config(read_half, config);
        tokio::spawn(read_loop(
            reader,
            Arc::downgrade(&inner),
            inner.closed.clone(),
        ));

        Self { inner }
    }

    /// Create a channel for `namespace` between `source_id` and `destination_id`.
    pub fn channel(
        &self,
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Channel {
        Channel::new(self, source_id, destination_id, namespace)
    }

    /// Write one message. Concurrent callers never interleave frames.
    pub async fn send(&self, message: &CastMessage) -> Result<()> {
        if let Some(reason) = self.close_reason() {
            return Err(ChannelError::Disconnected(reason.to_string()));
        }

        let write = async { self.inner.writer.lock().await.send(message).await };
        let result = tokio::select! {
            result = write => result,
            _ = self.inner.closed.cancelled() => {
                let reason = self.close_reason().unwrap_or(CloseReason::Local);
                return Err(ChannelError::Disconnected(reason.to_string()));
            }
        };
        match result {
            Ok(()) => {
                debug!(
                    namespace = %message.namespace,
                    destination = %message.destination_id,
                    len = message.payload_len(),
                    "sent message"
                );
                Ok(())
            }
            // Rejected before any byte was written; the stream is intact.
            Err(err @ FrameError::PayloadTooLarge { .. }) => Err(err.into()),
            Err(err) => {
                self.inner.shutdown(CloseReason::Error(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Close the connection and fail every pending request.
    pub async fn close(&self) {
        if !self.inner.shutdown(CloseReason::Local) {
            return;
        }
        let flush = async { self.inner.writer.lock().await.shutdown().await };
        match tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, flush).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "stream shutdown failed"),
            Err(_) => debug!("peer not reading, abandoning stream shutdown"),
        }
    }

    /// Wait until the connection is closed and return why.
    pub async fn wait_closed(&self) -> CloseReason {
        self.inner.closed.cancelled().await;
        self.close_reason().unwrap_or(CloseReason::Local)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// Why the connection closed, if it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.inner.lock_state().reason.clone()
    }

    /// Token cancelled when the connection closes, for use in `select!`.
    pub fn closed_token(&self) -> CancellationToken {
        self.inner.closed.clone()
    }

    /// Remote address, when connected over the network.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr
    }

    /// Number of live channels bound to this connection.
    pub fn channel_count(&self) -> usize {
        self.inner
            .lock_state()
            .channels
            .iter()
            .filter(|c| c.upgrade().is_some())
            .count()
    }

    /// Add `channel` to the dispatch list, or close it at once if the
    /// connection is already gone.
    pub(crate) fn bind(&self, channel: &Channel) {
        let reason = {
            let mut state = self.inner.lock_state();
            match &state.reason {
                Some(reason) => Some(reason.clone()),
                None => {
                    state.channels.retain(|c| c.upgrade().is_some());
                    state.channels.push(channel.downgrade());
                    None
                }
            }
        };
        if let Some(reason) = reason {
            channel.close(&reason.to_string());
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer_addr", &self.inner.peer_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ConnectionInner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `reason`, wake waiters and close every bound channel.
    ///
    /// Returns false if the connection was already closed.
    fn shutdown(&self, reason: CloseReason) -> bool {
        let channels = {
            let mut state = self.lock_state();
            if state.reason.is_some() {
                return false;
            }
            state.reason = Some(reason.clone());
            std::mem::take(&mut state.channels)
        };
        match &reason {
            CloseReason::Error(e) => warn!(error = %e, "connection closed"),
            other => info!(reason = %other, "connection closed"),
        }
        self.closed.cancel();

        let reason = reason.to_string();
        for channel in channels.iter().filter_map(WeakChannel::upgrade) {
            channel.close(&reason);
        }
        true
    }

    fn dispatch(&self, message: CastMessage) {
        let headers = match PayloadHeaders::from_message(&message) {
            Ok(headers) => headers,
            Err(e) => {
                warn!(
                    namespace = %message.namespace,
                    source = %message.source_id,
                    error = %e,
                    "dropping message with unparsable payload"
                );
                return;
            }
        };
        debug!(
            namespace = %message.namespace,
            source = %message.source_id,
            msg_type = %headers.msg_type,
            "received message"
        );

        let channels: Vec<Channel> = self
            .lock_state()
            .channels
            .iter()
            .filter_map(WeakChannel::upgrade)
            .collect();
        for channel in channels {
            channel.dispatch(&message, &headers);
        }
    }
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

async fn read_loop<R>(
    mut reader: FrameReader<R>,
    connection: Weak<ConnectionInner>,
    closed: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let result = tokio::select! {
            _ = closed.cancelled() => break,
            result = reader.read_message() => result,
        };
        let Some(inner) = connection.upgrade() else {
            break;
        };
        match result {
            Ok(message) => inner.dispatch(message),
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "dropping undecodable frame");
            }
            Err(FrameError::ConnectionClosed) => {
                inner.shutdown(CloseReason::PeerClosed);
                break;
            }
            Err(e) => {
                inner.shutdown(CloseReason::Error(e.to_string()));
                break;
            }
        }
    }
    debug!("read loop stopped");
}
