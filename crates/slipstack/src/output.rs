use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
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
struct PacketOutput<'a> {
    event: &'static str,
    index: u64,
    source: &'a str,
    size: usize,
    hex: String,
    payload: String,
    timestamp: String,
}

#[derive(Serialize)]
struct SendOutput<'a> {
    event: &'static str,
    path: &'a str,
    transport: &'a str,
    payload_size: usize,
    wire_size: usize,
}

/// Print one received packet.
pub fn print_packet(index: u64, payload: &[u8], source: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                event: "packet",
                index,
                source,
                size: payload.len(),
                hex: hex_string(payload),
                payload: payload_preview(payload),
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
                .set_header(vec!["#", "SIZE", "SOURCE", "HEX", "PAYLOAD"])
                .add_row(vec![
                    index.to_string(),
                    payload.len().to_string(),
                    source.to_string(),
                    hex_string(payload),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "packet #{index} size={} source={source} hex={} payload={}",
                payload.len(),
                hex_string(payload),
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

/// Print the outcome of a `send`.
pub fn print_sent(
    path: &str,
    transport: &str,
    payload_size: usize,
    wire_size: usize,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = SendOutput {
                event: "sent",
                path,
                transport,
                payload_size,
                wire_size,
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
                .set_header(vec!["PATH", "TRANSPORT", "PAYLOAD", "WIRE"])
                .add_row(vec![
                    path.to_string(),
                    transport.to_string(),
                    payload_size.to_string(),
                    wire_size.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("sent {payload_size} bytes ({wire_size} on wire) to {path} via {transport}");
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
