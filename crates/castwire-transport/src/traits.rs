use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// A connected receiver stream that implements `AsyncRead + AsyncWrite`.
///
/// This is the fundamental I/O type returned by [`crate::connect`].
/// Normally this wraps a TLS session over TCP; plaintext is available for
/// local proxies and tests.
pub struct CastStream {
    inner: CastStreamInner,
}

enum CastStreamInner {
    Tls(Box<TlsStream<TcpStream>>),
    Plain(TcpStream),
}

impl CastStream {
    pub(crate) fn tls(stream: TlsStream<TcpStream>) -> Self {
        Self {
            inner: CastStreamInner::Tls(Box::new(stream)),
        }
    }

    pub(crate) fn plain(stream: TcpStream) -> Self {
        Self {
            inner: CastStreamInner::Plain(stream),
        }
    }

    /// Whether the stream is protected by TLS.
    pub fn is_encrypted(&self) -> bool {
        matches!(self.inner, CastStreamInner::Tls(_))
    }

    /// Remote address of the receiver.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match &self.inner {
            CastStreamInner::Tls(stream) => stream.get_ref().0.peer_addr(),
            CastStreamInner::Plain(stream) => stream.peer_addr(),
        }
    }
}

impl AsyncRead for CastStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            CastStreamInner::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
            CastStreamInner::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for CastStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().inner {
            CastStreamInner::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
            CastStreamInner::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            CastStreamInner::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
            CastStreamInner::Plain(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            CastStreamInner::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
            CastStreamInner::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for CastStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            CastStreamInner::Tls(_) => "tls",
            CastStreamInner::Plain(_) => "plain",
        };
        let mut dbg = f.debug_struct("CastStream");
        dbg.field("type", &kind);
        if let Ok(addr) = self.peer_addr() {
            dbg.field("peer", &addr);
        }
        dbg.finish()
    }
}
