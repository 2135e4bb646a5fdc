//! In-memory receiver used by unit tests.

use std::time::Duration;

use bytes::BytesMut;
use castwire_frame::{
    encode_message, CastMessage, FrameConfig, FrameError, FrameReader, DEFAULT_MAX_PAYLOAD,
    DEFAULT_RECEIVER_ID, DEFAULT_SENDER_ID,
};
use serde_json::Value;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

use crate::connection::Connection;

const BUFFER: usize = 256 * 1024;
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// The far end of a test connection.
pub(crate) struct Device {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

impl Device {
    /// Next message from the connection under test.
    pub(crate) async fn recv(&mut self) -> CastMessage {
        tokio::time::timeout(RECV_TIMEOUT, self.reader.read_message())
            .await
            .expect("device should receive a message in time")
            .expect("device should read a valid message")
    }

    /// Whether the connection under test closed its write side.
    pub(crate) async fn recv_eof(&mut self) -> bool {
        let result = tokio::time::timeout(RECV_TIMEOUT, self.reader.read_frame())
            .await
            .expect("device should observe the stream ending in time");
        matches!(result, Err(FrameError::ConnectionClosed))
    }

    pub(crate) async fn send(&mut self, message: CastMessage) {
        let mut wire = BytesMut::new();
        encode_message(&message, &mut wire, DEFAULT_MAX_PAYLOAD).expect("message should encode");
        self.write_raw(&wire).await;
    }

    pub(crate) async fn write_raw(&mut self, bytes: &[u8]) {
        self.writer
            .write_all(bytes)
            .await
            .expect("device write should succeed");
    }
}

/// A connection wired to an in-memory [`Device`].
pub(crate) fn pair() -> (Connection, Device) {
    let (stream, device) = raw_pair();
    (
        Connection::from_stream(stream, FrameConfig::default()),
        device,
    )
}

/// An unbound stream and the [`Device`] on its far end.
pub(crate) fn raw_pair() -> (DuplexStream, Device) {
    let (local, remote) = tokio::io::duplex(BUFFER);
    let (read_half, write_half) = tokio::io::split(remote);
    (
        local,
        Device {
            reader: FrameReader::new(read_half),
            writer: write_half,
        },
    )
}

/// A STRING message from the receiver platform to the default sender.
pub(crate) fn receiver_text(namespace: &str, payload: &str) -> CastMessage {
    CastMessage::new_text(DEFAULT_RECEIVER_ID, DEFAULT_SENDER_ID, namespace, payload)
}

pub(crate) fn payload_json(message: &CastMessage) -> Value {
    serde_json::from_str(message.text().expect("message should carry text"))
        .expect("payload should be JSON")
}
