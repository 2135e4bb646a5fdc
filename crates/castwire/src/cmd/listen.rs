use castwire_frame::{namespace, CastMessage};
use tokio::sync::mpsc;
use tracing::info;

use crate::cmd::{connect, ConnectArgs, ListenArgs};
use crate::exit::{channel_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub async fn run(args: ListenArgs, connect_args: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    if !namespace::is_valid(&args.namespace) {
        return Err(CliError::new(
            USAGE,
            format!("invalid namespace: {}", args.namespace),
        ));
    }

    let client = connect(connect_args).await?;
    let channel = client.channel(&args.namespace, &args.source);

    let (tx, mut rx) = mpsc::unbounded_channel::<CastMessage>();
    for msg_type in &args.types {
        let tx = tx.clone();
        channel.on_message(msg_type.as_str(), move |message| {
            let _ = tx.send(message.clone());
        });
    }
    drop(tx);

    let closed = client.connection().closed_token();
    let mut printed = 0usize;
    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else { break };
                print_message(&message, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            _ = closed.cancelled() => {
                let reason = client.connection().wait_closed().await;
                return Err(CliError::new(FAILURE, format!("connection closed: {reason}")));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    client
        .close()
        .await
        .map_err(|err| channel_error("close failed", err))?;
    Ok(SUCCESS)
}
