//! Client for the cast receiver protocol.
//!
//! castwire speaks the length-prefixed protobuf protocol cast receivers
//! expose on TLS port 8009, and multiplexes JSON namespaces over one
//! connection with request/reply correlation.
//!
//! # Crate Structure
//!
//! - [`transport`] - TCP connect and TLS handshake
//! - [`frame`] - Length-prefixed message framing and the wire message
//! - [`channel`] - Connections, namespace channels and the receiver client (behind `channel` feature)

/// Re-export transport types.
pub mod transport {
    pub use castwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use castwire_frame::*;
}

/// Re-export channel types (requires `channel` feature).
#[cfg(feature = "channel")]
pub mod channel {
    pub use castwire_channel::*;
}
