use std::fmt;
use std::io;

use castwire_channel::ChannelError;
use castwire_frame::FrameError;
use castwire_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => TRANSPORT_ERROR,
        io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::InvalidServerName(_) => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::WriteTimeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::PayloadTooLarge { .. } | FrameError::Decode(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Transport(err) => transport_error(context, err),
        ChannelError::Frame(err) => frame_error(context, err),
        ChannelError::Json(_) | ChannelError::InvalidPayload(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ChannelError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ChannelError::UnexpectedReply(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ChannelError::Cancelled | ChannelError::Disconnected(_) => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn refused_connect_is_transport_error() {
        let err = TransportError::Connect {
            addr: "127.0.0.1:8009".parse().expect("addr"),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(transport_error("connect", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn timeouts_map_to_timeout_code() {
        let err = ChannelError::Timeout(Duration::from_secs(1));
        assert_eq!(channel_error("request", err).code, TIMEOUT);

        let err = ChannelError::Transport(TransportError::Timeout {
            operation: "TCP connect".into(),
        });
        assert_eq!(channel_error("connect", err).code, TIMEOUT);
    }

    #[test]
    fn bad_payloads_are_data_invalid() {
        let err = ChannelError::InvalidPayload("not an object".into());
        assert_eq!(channel_error("send", err).code, DATA_INVALID);
        let err = ChannelError::Frame(FrameError::PayloadTooLarge { size: 10, max: 5 });
        assert_eq!(channel_error("send", err).code, DATA_INVALID);
    }

    #[test]
    fn context_prefixes_message() {
        let err = channel_error("status failed", ChannelError::Cancelled);
        assert_eq!(err.code, FAILURE);
        assert_eq!(err.to_string(), "status failed: request cancelled");
    }
}
