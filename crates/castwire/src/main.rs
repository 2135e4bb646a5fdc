mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, ConnectArgs};
use crate::exit::{CliError, INTERNAL};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "castwire", version, about = "Cast receiver protocol CLI")]
struct Cli {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))
        .and_then(|runtime| runtime.block_on(cmd::run(cli.command, &cli.connect, format)));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "castwire",
            "--host",
            "192.168.1.20",
            "send",
            "urn:x-cast:com.google.cast.receiver",
            "--json",
            r#"{"type":"GET_STATUS"}"#,
            "--wait",
        ])
        .expect("send args should parse");

        assert_eq!(cli.connect.host.as_deref(), Some("192.168.1.20"));
        match cli.command {
            Command::Send(args) => {
                assert!(args.wait);
                assert_eq!(args.destination, "receiver-0");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "castwire",
            "send",
            "--json",
            "{\"type\":\"X\"}",
            "--file",
            "payload.json",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn global_connection_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "castwire",
            "status",
            "--host",
            "tv.local",
            "--port",
            "8010",
            "--timeout",
            "3s",
            "--plaintext",
        ])
        .expect("status args should parse");
        assert!(matches!(cli.command, Command::Status(_)));
        assert_eq!(cli.connect.port, 8010);
        assert_eq!(cli.connect.timeout, "3s");
        assert!(cli.connect.plaintext);
    }

    #[test]
    fn listen_types_are_comma_separated() {
        let cli = Cli::try_parse_from(["castwire", "listen", "--type", "MEDIA_STATUS,RECEIVER_STATUS"])
            .expect("listen args should parse");
        match cli.command {
            Command::Listen(args) => {
                assert_eq!(args.types, vec!["MEDIA_STATUS", "RECEIVER_STATUS"]);
                assert_eq!(args.namespace, "urn:x-cast:com.google.cast.receiver");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
