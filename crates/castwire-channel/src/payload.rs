use castwire_frame::CastMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChannelError, Result};

/// JSON key the correlation id is stamped under.
pub const REQUEST_ID_KEY: &str = "requestId";

/// Routing fields every payload document carries.
///
/// Other fields in the document are ignored here; controllers parse them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadHeaders {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub msg_type: String,
    #[serde(
        rename = "responseType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response_type: Option<String>,
    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
}

impl PayloadHeaders {
    pub fn new(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            ..Self::default()
        }
    }

    /// Parse headers from a JSON payload document.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Headers of a wire message. BINARY messages carry none.
    pub fn from_message(message: &CastMessage) -> serde_json::Result<Self> {
        match message.text() {
            Some(text) => Self::parse(text),
            None => Ok(Self::default()),
        }
    }

    /// A payload with neither `type` nor `responseType` cannot be routed.
    pub fn is_routable(&self) -> bool {
        !self.msg_type.is_empty() || self.response_type.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// The correlation id, if this payload answers a request.
    pub fn correlation_id(&self) -> Option<i64> {
        self.request_id.filter(|id| *id != 0)
    }

    /// Whether a listener registered under `key` should see this payload.
    pub fn matches(&self, key: &str) -> bool {
        self.msg_type == key || self.response_type.as_deref() == Some(key)
    }
}

/// Write `request_id` into a payload object.
pub fn stamp_request_id(payload: &mut Value, request_id: i64) -> Result<()> {
    if !payload.is_object() {
        return Err(ChannelError::InvalidPayload(format!(
            "request payload must be a JSON object, got {payload}"
        )));
    }
    let object = payload.as_object_mut().expect("checked is_object above");
    object.insert(REQUEST_ID_KEY.to_string(), Value::from(request_id));
    Ok(())
}
