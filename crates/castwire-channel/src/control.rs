use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Connection namespace: open a virtual connection to a destination.
pub const CONNECT: &str = "CONNECT";
/// Connection namespace: close the virtual connection.
pub const CLOSE: &str = "CLOSE";
/// Heartbeat namespace: liveness probe.
pub const PING: &str = "PING";
/// Heartbeat namespace: liveness answer.
pub const PONG: &str = "PONG";
/// Receiver namespace: ask for the current receiver status.
pub const GET_STATUS: &str = "GET_STATUS";
/// Receiver namespace: status document, pushed or as a reply.
pub const RECEIVER_STATUS: &str = "RECEIVER_STATUS";
/// Receiver namespace: change the device volume.
pub const SET_VOLUME: &str = "SET_VOLUME";
/// Receiver namespace: stop a running application.
pub const STOP: &str = "STOP";

/// Platform message payload: a `type` plus any extra fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ControlMessage {
    pub fn new(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            fields: Map::new(),
        }
    }

    /// Add a field to the payload.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Create a CONNECT message.
    pub fn connect() -> Self {
        Self::new(CONNECT).with("origin", Value::Object(Map::new()))
    }

    /// Create a CLOSE message.
    pub fn close() -> Self {
        Self::new(CLOSE)
    }

    /// Create a PING message.
    pub fn ping() -> Self {
        Self::new(PING)
    }

    /// Create a PONG message.
    pub fn pong() -> Self {
        Self::new(PONG)
    }

    /// Create a GET_STATUS request.
    pub fn get_status() -> Self {
        Self::new(GET_STATUS)
    }
}
