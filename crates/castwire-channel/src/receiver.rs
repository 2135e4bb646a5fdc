use std::time::Duration;

use castwire_frame::CastMessage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::channel::{Channel, ListenerId};
use crate::control::{ControlMessage, RECEIVER_STATUS, SET_VOLUME, STOP};
use crate::error::{ChannelError, Result};

/// Status document the receiver platform reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverStatus {
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active_input: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_stand_by: Option<bool>,
}

/// An application running on the receiver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Application {
    pub app_id: String,
    pub display_name: String,
    pub session_id: String,
    /// Destination id for messages to the application itself.
    pub transport_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    pub namespaces: Vec<AppNamespace>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppNamespace {
    pub name: String,
}

/// Device volume. Absent fields are left unchanged by `SET_VOLUME`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_interval: Option<f64>,
}

#[derive(Deserialize)]
struct StatusReply {
    #[serde(rename = "type", default)]
    msg_type: String,
    #[serde(default)]
    status: ReceiverStatus,
    #[serde(default)]
    reason: Option<String>,
}

/// Typed commands on the receiver namespace.
#[derive(Debug, Clone)]
pub struct ReceiverController {
    channel: Channel,
    timeout: Duration,
}

impl ReceiverController {
    /// Wrap a channel bound to the receiver namespace.
    pub fn new(channel: Channel, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Ask the receiver for its current status.
    pub async fn get_status(&self) -> Result<ReceiverStatus> {
        self.status_request(&ControlMessage::get_status()).await
    }

    /// Change volume level (0.0 to 1.0) and/or mute state.
    pub async fn set_volume(
        &self,
        level: Option<f64>,
        muted: Option<bool>,
    ) -> Result<ReceiverStatus> {
        if let Some(level) = level {
            if !(0.0..=1.0).contains(&level) {
                return Err(ChannelError::InvalidPayload(format!(
                    "volume level {level} outside 0.0..=1.0"
                )));
            }
        }
        let volume = Volume {
            level,
            muted,
            ..Volume::default()
        };
        let message = ControlMessage::new(SET_VOLUME).with("volume", serde_json::to_value(volume)?);
        self.status_request(&message).await
    }

    /// Stop the application running under `session_id`.
    pub async fn stop_app(&self, session_id: &str) -> Result<ReceiverStatus> {
        let message = ControlMessage::new(STOP).with("sessionId", session_id);
        self.status_request(&message).await
    }

    /// Call `callback` for every RECEIVER_STATUS the receiver sends, including
    /// replies to this controller's own requests.
    pub fn on_status<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&ReceiverStatus) + Send + Sync + 'static,
    {
        self.channel.on_message(RECEIVER_STATUS, move |message| {
            match parse_status(message) {
                Ok(status) => callback(&status),
                Err(e) => warn!(error = %e, "ignoring malformed receiver status"),
            }
        })
    }

    async fn status_request(&self, message: &ControlMessage) -> Result<ReceiverStatus> {
        let reply = self.channel.request(message, self.timeout).await?;
        parse_status(&reply)
    }
}

fn parse_status(message: &CastMessage) -> Result<ReceiverStatus> {
    let text = message
        .text()
        .ok_or_else(|| ChannelError::UnexpectedReply("binary payload".to_string()))?;
    let reply: StatusReply = serde_json::from_str(text)?;
    if reply.msg_type != RECEIVER_STATUS {
        let detail = match reply.reason {
            Some(reason) => format!("{} ({reason})", reply.msg_type),
            None => reply.msg_type,
        };
        return Err(ChannelError::UnexpectedReply(detail));
    }
    Ok(reply.status)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use castwire_frame::{DEFAULT_RECEIVER_ID, DEFAULT_SENDER_ID, RECEIVER};
    use serde_json::json;

    use super::*;
    use crate::testing::{pair, payload_json, receiver_text, Device};

    const STATUS: &str = r#"{
        "applications": [{
            "appId": "CC1AD845",
            "displayName": "Default Media Receiver",
            "sessionId": "7E2FF513",
            "transportId": "web-5",
            "statusText": "Ready To Cast",
            "namespaces": [{"name": "urn:x-cast:com.google.cast.media"}]
        }],
        "volume": {"level": 0.5, "muted": false, "controlType": "attenuation", "stepInterval": 0.05},
        "isActiveInput": true
    }"#;

    fn controller() -> (ReceiverController, Device) {
        let (conn, device) = pair();
        let channel = conn.channel(DEFAULT_SENDER_ID, DEFAULT_RECEIVER_ID, RECEIVER);
        (ReceiverController::new(channel, Duration::from_secs(5)), device)
    }

    async fn answer(device: &mut Device, reply_type: &str) -> serde_json::Value {
        let got = device.recv().await;
        let request = payload_json(&got);
        let reply = format!(
            r#"{{"type":"{reply_type}","requestId":{},"status":{STATUS}}}"#,
            request["requestId"]
        );
        device.send(receiver_text(RECEIVER, &reply)).await;
        request
    }

    #[tokio::test]
    async fn get_status_round_trip() {
        let (receiver, mut device) = controller();

        let (status, request) = tokio::join!(
            receiver.get_status(),
            answer(&mut device, RECEIVER_STATUS)
        );
        assert_eq!(request["type"], "GET_STATUS");

        let status = status.expect("status should parse");
        assert_eq!(status.applications.len(), 1);
        let app = &status.applications[0];
        assert_eq!(app.app_id, "CC1AD845");
        assert_eq!(app.transport_id, "web-5");
        assert_eq!(app.namespaces[0].name, "urn:x-cast:com.google.cast.media");
        let volume = status.volume.expect("volume");
        assert_eq!(volume.level, Some(0.5));
        assert_eq!(volume.muted, Some(false));
        assert_eq!(status.is_active_input, Some(true));
        assert_eq!(status.is_stand_by, None);
    }

    #[tokio::test]
    async fn set_volume_sends_only_given_fields() {
        let (receiver, mut device) = controller();

        let (status, request) = tokio::join!(
            receiver.set_volume(None, Some(true)),
            answer(&mut device, RECEIVER_STATUS)
        );
        status.expect("status should parse");
        assert_eq!(request["type"], "SET_VOLUME");
        assert_eq!(request["volume"], json!({"muted": true}));
    }

    #[tokio::test]
    async fn set_volume_rejects_out_of_range_level() {
        let (receiver, _device) = controller();
        let err = receiver.set_volume(Some(1.5), None).await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn stop_app_names_session() {
        let (receiver, mut device) = controller();

        let (status, request) = tokio::join!(
            receiver.stop_app("7E2FF513"),
            answer(&mut device, RECEIVER_STATUS)
        );
        status.expect("status should parse");
        assert_eq!(request["type"], "STOP");
        assert_eq!(request["sessionId"], "7E2FF513");
    }

    #[tokio::test]
    async fn error_reply_is_unexpected() {
        let (receiver, mut device) = controller();

        let (status, _) = tokio::join!(
            receiver.get_status(),
            answer(&mut device, "INVALID_REQUEST")
        );
        match status {
            Err(ChannelError::UnexpectedReply(detail)) => assert!(detail.contains("INVALID_REQUEST")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn pushed_status_reaches_observer() {
        let (receiver, mut device) = controller();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        receiver.on_status(move |status| {
            sink.lock().expect("sink").push(status.clone());
        });

        device
            .send(receiver_text(
                RECEIVER,
                r#"{"type":"RECEIVER_STATUS","requestId":0,"status":{"isStandBy":true}}"#,
            ))
            .await;
        device
            .send(receiver_text(RECEIVER, r#"{"type":"RECEIVER_STATUS","status":[]}"#))
            .await;
        device
            .send(receiver_text(
                RECEIVER,
                r#"{"type":"RECEIVER_STATUS","status":{"isStandBy":false}}"#,
            ))
            .await;

        tokio::time::timeout(Duration::from_secs(5), async {
            while seen.lock().expect("seen").len() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("observer should see pushed statuses");
        let seen = seen.lock().expect("seen");
        assert_eq!(seen[0].is_stand_by, Some(true));
        assert_eq!(seen[1].is_stand_by, Some(false));
    }
}
