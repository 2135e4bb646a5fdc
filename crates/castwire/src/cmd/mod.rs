use std::path::PathBuf;
use std::time::Duration;

use castwire_channel::{Client, ClientConfig, ConnectionConfig};
use castwire_frame::{DEFAULT_RECEIVER_ID, RECEIVER};
use castwire_transport::{TlsMode, DEFAULT_PORT};
use clap::{Args, Subcommand};

use crate::exit::{channel_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod status;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the receiver status.
    Status(StatusArgs),
    /// Send a single JSON payload on a namespace.
    Send(SendArgs),
    /// Print messages pushed by the receiver.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Status(args) => status::run(args, connect, format).await,
        Command::Send(args) => send::run(args, connect, format).await,
        Command::Listen(args) => listen::run(args, connect, format).await,
        Command::Version(args) => version::run(args),
    }
}

/// Receiver connection options shared by every networked command.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Receiver host name or address.
    #[arg(long, env = "CASTWIRE_HOST", global = true)]
    pub host: Option<String>,
    /// Receiver port.
    #[arg(long, default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,
    /// Connect and request timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "15s", global = true)]
    pub timeout: String,
    /// Speak plain TCP instead of TLS (bridges and emulators).
    #[arg(long, global = true)]
    pub plaintext: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Set the volume level (0.0 to 1.0) before printing.
    #[arg(long, value_name = "LEVEL")]
    pub volume: Option<f64>,
    /// Mute the receiver.
    #[arg(long, conflicts_with = "unmute")]
    pub mute: bool,
    /// Unmute the receiver.
    #[arg(long)]
    pub unmute: bool,
    /// Stop the application running under this session id.
    #[arg(long, value_name = "SESSION")]
    pub stop: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Namespace to send on (e.g. urn:x-cast:com.google.cast.receiver).
    #[arg(default_value = RECEIVER)]
    pub namespace: String,
    /// Destination id. Anything but the platform receiver gets a CONNECT first.
    #[arg(long, short = 'd', default_value = DEFAULT_RECEIVER_ID)]
    pub destination: String,
    /// JSON payload.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub json: Option<String>,
    /// Read the JSON payload from a file.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Stamp a requestId and wait for the reply carrying it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the reply when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Namespace to listen on.
    #[arg(long, default_value = RECEIVER)]
    pub namespace: String,
    /// Source id to listen to.
    #[arg(long, default_value = DEFAULT_RECEIVER_ID)]
    pub source: String,
    /// Message types to print (comma-separated, matched against type and responseType).
    #[arg(long = "type", value_delimiter = ',', default_value = "RECEIVER_STATUS")]
    pub types: Vec<String>,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Open a client session using the global connection options.
pub async fn connect(args: &ConnectArgs) -> CliResult<Client> {
    let host = args
        .host
        .as_deref()
        .ok_or_else(|| CliError::new(USAGE, "--host (or CASTWIRE_HOST) is required"))?;
    let timeout = parse_duration(&args.timeout)?;

    let mut config = ClientConfig::new(host);
    config.port = args.port;
    config.request_timeout = timeout;
    config.connection = ConnectionConfig::with_timeout(timeout);
    if args.plaintext {
        config.connection.transport.tls = TlsMode::Plaintext;
    }

    Client::connect(config)
        .await
        .map_err(|err| channel_error("connect failed", err))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }
}
