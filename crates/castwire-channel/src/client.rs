use std::time::Duration;

use castwire_frame::{CONNECTION, DEFAULT_RECEIVER_ID, DEFAULT_SENDER_ID, HEARTBEAT, RECEIVER};
use castwire_transport::DEFAULT_PORT;
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::connection::{Connection, ConnectionConfig};
use crate::control::{ControlMessage, CLOSE, PING};
use crate::error::Result;
use crate::receiver::ReceiverController;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub sender_id: String,
    pub receiver_id: String,
    pub connection: ConnectionConfig,
    /// Deadline for controller requests.
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            sender_id: DEFAULT_SENDER_ID.to_string(),
            receiver_id: DEFAULT_RECEIVER_ID.to_string(),
            connection: ConnectionConfig::default(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// A session with one receiver.
///
/// Owns the connection plus the platform channels: it opens the virtual
/// connection with CONNECT, answers heartbeat PINGs, and exposes the
/// receiver controller. Reconnection is left to the caller, who can watch
/// [`Connection::wait_closed`].
#[derive(Debug)]
pub struct Client {
    connection: Connection,
    sender_id: String,
    control: Channel,
    heartbeat: Channel,
    receiver: ReceiverController,
}

impl Client {
    /// Connect to `config.host` and start the session.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let connection =
            Connection::connect_with_config(&config.host, config.port, &config.connection).await?;
        Self::start(connection, &config).await
    }

    /// Start a session on an existing connection.
    pub async fn start(connection: Connection, config: &ClientConfig) -> Result<Self> {
        let control = connection.channel(&config.sender_id, &config.receiver_id, CONNECTION);
        let heartbeat = connection.channel(&config.sender_id, &config.receiver_id, HEARTBEAT);
        let receiver = ReceiverController::new(
            connection.channel(&config.sender_id, &config.receiver_id, RECEIVER),
            config.request_timeout,
        );

        let responder = heartbeat.downgrade();
        heartbeat.on_message(PING, move |_| {
            let Some(heartbeat) = responder.upgrade() else {
                return;
            };
            tokio::spawn(async move {
                if let Err(e) = heartbeat.send(&ControlMessage::pong()).await {
                    debug!(error = %e, "failed to answer PING");
                }
            });
        });
        control.on_message(CLOSE, |message| {
            info!(source = %message.source_id, "receiver closed the virtual connection");
        });

        control.send(&ControlMessage::connect()).await?;
        info!(receiver = %config.receiver_id, "session started");

        Ok(Self {
            connection,
            sender_id: config.sender_id.clone(),
            control,
            heartbeat,
            receiver,
        })
    }

    /// Open a virtual connection to another destination, such as an
    /// application's transport id.
    pub async fn connect_to(&self, destination: &str) -> Result<Channel> {
        let control = self.connection.channel(&self.sender_id, destination, CONNECTION);
        control.send(&ControlMessage::connect()).await?;
        Ok(control)
    }

    /// A channel from this client to `destination` on `namespace`.
    pub fn channel(&self, namespace: &str, destination: &str) -> Channel {
        self.connection.channel(&self.sender_id, destination, namespace)
    }

    pub fn receiver(&self) -> &ReceiverController {
        &self.receiver
    }

    pub fn heartbeat(&self) -> &Channel {
        &self.heartbeat
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Send CLOSE and shut the connection down.
    pub async fn close(self) -> Result<()> {
        let result = if self.connection.is_closed() {
            Ok(())
        } else {
            self.control.send(&ControlMessage::close()).await
        };
        if let Err(e) = &result {
            warn!(error = %e, "failed to send CLOSE");
        }
        self.connection.close().await;
        result
    }
}
