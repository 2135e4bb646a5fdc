use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use castwire_channel::ReceiverStatus;
use castwire_frame::namespace::namespace_name;
use castwire_frame::CastMessage;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    namespace: &'a str,
    namespace_name: &'a str,
    source_id: &'a str,
    destination_id: &'a str,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_message(message: &CastMessage, format: OutputFormat) {
    let name = namespace_name(&message.namespace);
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                namespace: &message.namespace,
                namespace_name: name,
                source_id: &message.source_id,
                destination_id: &message.destination_id,
                payload_size: message.payload_len(),
                payload: payload_preview(message),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAMESPACE", "FROM", "TO", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    name.to_string(),
                    message.source_id.clone(),
                    message.destination_id.clone(),
                    message.payload_len().to_string(),
                    payload_preview(message),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "namespace={} ({}) from={} to={} size={} payload={}",
                message.namespace,
                name,
                message.source_id,
                message.destination_id,
                message.payload_len(),
                payload_preview(message)
            );
        }
        OutputFormat::Raw => {
            println!("{}", payload_preview(message));
        }
    }
}

pub fn print_status(status: &ReceiverStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(status).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["APP", "NAME", "SESSION", "TRANSPORT", "STATUS"]);
            for app in &status.applications {
                table.add_row(vec![
                    app.app_id.clone(),
                    app.display_name.clone(),
                    app.session_id.clone(),
                    app.transport_id.clone(),
                    app.status_text.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
            println!("volume: {}", volume_summary(status));
        }
        OutputFormat::Pretty => {
            if status.applications.is_empty() {
                println!("no applications running");
            }
            for app in &status.applications {
                println!(
                    "app={} name=\"{}\" session={} transport={}",
                    app.app_id, app.display_name, app.session_id, app.transport_id
                );
            }
            println!("volume: {}", volume_summary(status));
        }
    }
}

fn volume_summary(status: &ReceiverStatus) -> String {
    match &status.volume {
        Some(volume) => format!(
            "level={} muted={}",
            volume
                .level
                .map(|l| format!("{l:.2}"))
                .unwrap_or_else(|| "?".to_string()),
            volume
                .muted
                .map(|m| m.to_string())
                .unwrap_or_else(|| "?".to_string())
        ),
        None => "unknown".to_string(),
    }
}

fn payload_preview(message: &CastMessage) -> String {
    match message.text() {
        Some(text) => text.to_string(),
        None => format!("<binary {} bytes>", message.payload_len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
