use std::fs;

use castwire_channel::Channel;
use castwire_frame::namespace;
use serde_json::Value;

use crate::cmd::{connect, parse_duration, ConnectArgs, SendArgs};
use crate::exit::{channel_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub async fn run(args: SendArgs, connect_args: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    if !namespace::is_valid(&args.namespace) {
        return Err(CliError::new(
            USAGE,
            format!("invalid namespace: {}", args.namespace),
        ));
    }
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let client = connect(connect_args).await?;
    if args.destination != client.receiver().channel().destination_id() {
        client
            .connect_to(&args.destination)
            .await
            .map_err(|err| channel_error("connect to destination failed", err))?;
    }
    let channel = client.channel(&args.namespace, &args.destination);

    if args.wait {
        let reply = request(&channel, &payload, wait_timeout).await?;
        print_message(&reply, format);
    } else {
        channel
            .send(&payload)
            .await
            .map_err(|err| channel_error("send failed", err))?;
    }

    client
        .close()
        .await
        .map_err(|err| channel_error("close failed", err))?;
    Ok(SUCCESS)
}

async fn request(
    channel: &Channel,
    payload: &Value,
    timeout: std::time::Duration,
) -> CliResult<castwire_frame::CastMessage> {
    channel
        .request(payload, timeout)
        .await
        .map_err(|err| channel_error("request failed", err))
}

fn resolve_payload(args: &SendArgs) -> CliResult<Value> {
    let text = match (&args.json, &args.file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        (None, None) => return Err(CliError::new(USAGE, "one of --json or --file is required")),
    };
    let payload: Value = serde_json::from_str(&text)
        .map_err(|err| CliError::new(USAGE, format!("payload is not valid JSON: {err}")))?;
    if !payload.is_object() {
        return Err(CliError::new(USAGE, "payload must be a JSON object"));
    }
    if payload.get("type").and_then(Value::as_str).is_none() {
        return Err(CliError::new(USAGE, "payload must carry a string \"type\" field"));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(json: &str) -> SendArgs {
        SendArgs {
            namespace: castwire_frame::RECEIVER.to_string(),
            destination: castwire_frame::DEFAULT_RECEIVER_ID.to_string(),
            json: Some(json.to_string()),
            file: None,
            wait: false,
            wait_timeout: "5s".to_string(),
        }
    }

    #[test]
    fn payload_must_be_typed_object() {
        assert!(resolve_payload(&args(r#"{"type":"GET_STATUS"}"#)).is_ok());
        assert_eq!(resolve_payload(&args("[1]")).unwrap_err().code, USAGE);
        assert_eq!(resolve_payload(&args(r#"{"x":1}"#)).unwrap_err().code, USAGE);
        assert_eq!(resolve_payload(&args("{oops")).unwrap_err().code, USAGE);
    }

    #[test]
    fn payload_from_missing_file_is_io_error() {
        let mut args = args("{}");
        args.json = None;
        args.file = Some("/nonexistent/castwire/payload.json".into());
        let err = resolve_payload(&args).unwrap_err();
        assert!(err.message.contains("failed reading"));
    }
}
