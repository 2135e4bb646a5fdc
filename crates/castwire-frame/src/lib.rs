//! Length-prefixed framing for the cast wire protocol.
//!
//! Every message is framed with:
//! - A 4-byte big-endian body length
//! - A protobuf-encoded [`CastMessage`] body
//!
//! No partial reads, no buffer management in user code. A body that fails to
//! decode is reported per frame without losing stream alignment.

pub mod codec;
pub mod error;
pub mod message;
pub mod namespace;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, encode_message, CastCodec, FrameConfig, DEFAULT_MAX_PAYLOAD,
    HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use message::{CastMessage, PayloadType, ProtocolVersion, BROADCAST_DESTINATION};
pub use namespace::{
    CONNECTION, DEFAULT_RECEIVER_ID, DEFAULT_SENDER_ID, DEVICE_AUTH, HEARTBEAT, MEDIA, RECEIVER,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
