use bytes::Bytes;

/// Destination id meaning "every listening channel".
pub const BROADCAST_DESTINATION: &str = "*";

/// Protocol revision carried in every message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ProtocolVersion {
    Castv210 = 0,
}

/// How the payload is carried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PayloadType {
    /// UTF-8 text in `payload_utf8`, normally a JSON document.
    String = 0,
    /// Raw bytes in `payload_binary`.
    Binary = 1,
}

/// One wire message.
///
/// Field tags match the receiver's protobuf schema:
/// ```text
/// 1 protocol_version  enum     required
/// 2 source_id         string   required
/// 3 destination_id    string   required  ("*" = broadcast)
/// 4 namespace         string   required
/// 5 payload_type      enum     required
/// 6 payload_utf8      string   optional
/// 7 payload_binary    bytes    optional
/// ```
#[derive(Clone, PartialEq, prost::Message)]
pub struct CastMessage {
    #[prost(enumeration = "ProtocolVersion", required, tag = "1")]
    pub protocol_version: i32,
    #[prost(string, required, tag = "2")]
    pub source_id: String,
    #[prost(string, required, tag = "3")]
    pub destination_id: String,
    #[prost(string, required, tag = "4")]
    pub namespace: String,
    #[prost(enumeration = "PayloadType", required, tag = "5")]
    pub payload_type: i32,
    #[prost(string, optional, tag = "6")]
    pub payload_utf8: Option<String>,
    #[prost(bytes = "bytes", optional, tag = "7")]
    pub payload_binary: Option<Bytes>,
}

impl CastMessage {
    /// Build a STRING message.
    pub fn new_text(
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        namespace: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            protocol_version: ProtocolVersion::Castv210 as i32,
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            namespace: namespace.into(),
            payload_type: PayloadType::String as i32,
            payload_utf8: Some(payload.into()),
            payload_binary: None,
        }
    }

    /// Build a BINARY message.
    pub fn new_binary(
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        namespace: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            protocol_version: ProtocolVersion::Castv210 as i32,
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            namespace: namespace.into(),
            payload_type: PayloadType::Binary as i32,
            payload_utf8: None,
            payload_binary: Some(payload.into()),
        }
    }

    /// Payload kind. Unknown wire values read as STRING.
    pub fn payload_kind(&self) -> PayloadType {
        PayloadType::try_from(self.payload_type).unwrap_or(PayloadType::String)
    }

    /// Text payload, if this is a STRING message carrying one.
    pub fn text(&self) -> Option<&str> {
        match self.payload_kind() {
            PayloadType::String => self.payload_utf8.as_deref(),
            PayloadType::Binary => None,
        }
    }

    /// Binary payload, if this is a BINARY message carrying one.
    pub fn binary(&self) -> Option<&[u8]> {
        match self.payload_kind() {
            PayloadType::Binary => self.payload_binary.as_deref(),
            PayloadType::String => None,
        }
    }

    /// Payload length in bytes, whichever kind it is.
    pub fn payload_len(&self) -> usize {
        self.text()
            .map(str::len)
            .or_else(|| self.binary().map(<[u8]>::len))
            .unwrap_or(0)
    }

    /// Whether the message is addressed to the broadcast destination.
    pub fn is_broadcast(&self) -> bool {
        self.destination_id == BROADCAST_DESTINATION
    }
}
