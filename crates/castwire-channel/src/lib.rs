//! Connections and namespace channels for cast receivers.
//!
//! This is the "just works" layer. Open a [`Connection`], bind a [`Channel`]
//! per namespace, then send payloads, issue correlated requests and listen
//! for pushed messages. [`Client`] wires up the platform channels for you.

pub mod channel;
pub mod client;
pub mod connection;
pub mod control;
pub mod error;
pub mod payload;
pub mod receiver;

#[cfg(test)]
mod testing;

pub use channel::{Callback, Channel, ListenerId, WeakChannel};
pub use client::{Client, ClientConfig};
pub use connection::{CloseReason, Connection, ConnectionConfig};
pub use control::{
    ControlMessage, CLOSE, CONNECT, GET_STATUS, PING, PONG, RECEIVER_STATUS, SET_VOLUME, STOP,
};
pub use error::{ChannelError, Result};
pub use payload::{stamp_request_id, PayloadHeaders, REQUEST_ID_KEY};
pub use receiver::{AppNamespace, Application, ReceiverController, ReceiverStatus, Volume};
