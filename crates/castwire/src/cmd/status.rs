use crate::cmd::{connect, ConnectArgs, StatusArgs};
use crate::exit::{channel_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_status, OutputFormat};

pub async fn run(args: StatusArgs, connect_args: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    if let Some(level) = args.volume {
        if !(0.0..=1.0).contains(&level) {
            return Err(CliError::new(USAGE, "--volume must be between 0.0 and 1.0"));
        }
    }

    let client = connect(connect_args).await?;
    let receiver = client.receiver();

    let muted = match (args.mute, args.unmute) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    // Every requested change runs in order; the last reply is what prints.
    let mut status = None;
    if let Some(session) = &args.stop {
        status = Some(
            receiver
                .stop_app(session)
                .await
                .map_err(|err| channel_error("stop failed", err))?,
        );
    }
    if args.volume.is_some() || muted.is_some() {
        status = Some(
            receiver
                .set_volume(args.volume, muted)
                .await
                .map_err(|err| channel_error("volume change failed", err))?,
        );
    }
    let status = match status {
        Some(status) => status,
        None => receiver
            .get_status()
            .await
            .map_err(|err| channel_error("status failed", err))?,
    };

    print_status(&status, format);
    client
        .close()
        .await
        .map_err(|err| channel_error("close failed", err))?;
    Ok(SUCCESS)
}
