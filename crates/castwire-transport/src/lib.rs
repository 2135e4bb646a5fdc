//! TCP + TLS transport for cast receivers.
//!
//! Receivers listen on a TLS socket (port 8009 by default) and present a
//! self-signed certificate. This crate resolves the host, connects within a
//! deadline, runs the TLS client handshake and hands back a [`CastStream`].
//!
//! This is the lowest layer of castwire. Framing and channel multiplexing
//! build on top of the stream provided here.

pub mod error;
pub mod tcp;
pub mod tls;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::{connect, TransportConfig, DEFAULT_PORT};
pub use tls::TlsMode;
pub use traits::CastStream;
