use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, Result};
use crate::message::CastMessage;

/// Frame header: big-endian body length (4) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Default maximum body size: 64 KiB, the receiver's own limit.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Encode a raw body into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────┬──────────────────────────┐
/// │ Length (4B BE) │ Body (Length bytes)      │
/// │                │ protobuf CastMessage     │
/// └────────────────┴──────────────────────────┘
/// ```
pub fn encode_frame(body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if body.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: body.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + body.len());
    dst.put_u32(body.len() as u32);
    dst.put_slice(body);
    Ok(())
}

/// Encode a message straight into the wire format, enforcing `max_payload`.
pub fn encode_message(msg: &CastMessage, dst: &mut BytesMut, max_payload: usize) -> Result<()> {
    let len = msg.encoded_len();
    if len > max_payload || len > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: max_payload,
        });
    }
    dst.reserve(HEADER_SIZE + len);
    dst.put_u32(len as u32);
    msg.encode(dst)?;
    Ok(())
}

/// Decode one frame body from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let body_len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if body_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: body_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + body_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(body_len).freeze()))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum body size in bytes, both directions. Default: 64 KiB.
    pub max_payload_size: usize,
    /// Deadline for writing one frame. `None` waits indefinitely.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            write_timeout: None,
        }
    }
}

/// `tokio_util` codec: decodes frame bodies, encodes whole messages.
///
/// Body decoding is left to the caller so one corrupt message does not end
/// the stream.
#[derive(Debug, Clone)]
pub struct CastCodec {
    max_payload_size: usize,
}

impl CastCodec {
    pub fn new(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.max_payload_size = max_payload_size;
    }
}

impl Default for CastCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl Decoder for CastCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        decode_frame(src, self.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        match self.decode(src)? {
            Some(body) => Ok(Some(body)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl<'a> Encoder<&'a CastMessage> for CastCodec {
    type Error = FrameError;

    fn encode(&mut self, msg: &'a CastMessage, dst: &mut BytesMut) -> Result<()> {
        encode_message(msg, dst, self.max_payload_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CastMessage {
        CastMessage::new_text(
            "sender-0",
            "receiver-0",
            "urn:x-cast:com.google.cast.tp.heartbeat",
            r#"{"type":"PING"}"#,
        )
    }

    #[test]
    fn test_length_prefix_is_big_endian() {
        let mut buf = BytesMut::new();
        encode_frame(&[0xAA; 0x0102], &mut buf).unwrap();
        assert_eq!(&buf[..HEADER_SIZE], &[0x00, 0x00, 0x01, 0x02]);
        assert_eq!(buf.len(), HEADER_SIZE + 0x0102);
    }

    #[test]
    fn test_encode_decode_message() {
        let msg = sample();
        let mut buf = BytesMut::new();
        encode_message(&msg, &mut buf, DEFAULT_MAX_PAYLOAD).unwrap();

        let body = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert!(buf.is_empty());
        assert_eq!(CastMessage::decode(body).unwrap(), msg);
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x00, 0x00, 0x00][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_decode_incomplete_body() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), HEADER_SIZE + 2);
    }

    #[test]
    fn test_decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u32(DEFAULT_MAX_PAYLOAD as u32 + 1);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
    }

    #[test]
    fn test_encode_message_too_large() {
        let msg = CastMessage::new_text("a", "b", "c", "x".repeat(128));
        let mut buf = BytesMut::new();
        let result = encode_message(&msg, &mut buf, 64);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_multiple_frames() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(f1.as_ref(), b"first");
        assert_eq!(f2.as_ref(), b"second");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_body() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf).unwrap();

        let body = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_codec_decode_eof_mid_frame() {
        let mut codec = CastCodec::default();
        let mut buf = BytesMut::new();
        encode_frame(b"partial", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 3);

        let result = codec.decode_eof(&mut buf);
        assert!(matches!(result, Err(FrameError::ConnectionClosed)));
    }

    #[test]
    fn test_codec_decode_eof_clean() {
        let mut codec = CastCodec::default();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_encoder_respects_limit() {
        let mut codec = CastCodec::new(8);
        let mut buf = BytesMut::new();
        let result = codec.encode(&sample(), &mut buf);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
    }
}
