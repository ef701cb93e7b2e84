use std::io::IsTerminal;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use sdsio_server::SessionSummary;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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
struct EndpointOutput<'a> {
    event: &'static str,
    endpoint: &'a str,
    out_dir: String,
    timestamp: String,
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    event: &'static str,
    endpoint: &'a str,
    frames_dispatched: u64,
    streams_opened: u64,
    streams_closed_at_shutdown: usize,
    bytes_written: u64,
    responses_sent: u64,
    responses_dropped: u64,
    timestamp: String,
}

impl<'a> From<&'a SessionSummary> for SummaryOutput<'a> {
    fn from(summary: &'a SessionSummary) -> Self {
        Self {
            event: "session-summary",
            endpoint: &summary.transport,
            frames_dispatched: summary.frames_dispatched,
            streams_opened: summary.streams_opened,
            streams_closed_at_shutdown: summary.streams_closed_at_shutdown,
            bytes_written: summary.bytes_written,
            responses_sent: summary.responses_sent,
            responses_dropped: summary.responses_dropped,
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_endpoint(endpoint: &str, out_dir: &Path, format: OutputFormat) {
    let out_dir = out_dir.display().to_string();
    match format {
        OutputFormat::Json => {
            let out = EndpointOutput {
                event: "server-opening",
                endpoint,
                out_dir,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "OUTPUT DIR"])
                .add_row(vec![endpoint.to_string(), out_dir]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("server opening endpoint={endpoint} out_dir={out_dir}");
        }
    }
}

pub fn print_summary(summary: &SessionSummary, format: OutputFormat) {
    let out = SummaryOutput::from(summary);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METRIC", "VALUE"])
                .add_row(vec!["endpoint".to_string(), out.endpoint.to_string()])
                .add_row(vec![
                    "frames dispatched".to_string(),
                    out.frames_dispatched.to_string(),
                ])
                .add_row(vec![
                    "streams opened".to_string(),
                    out.streams_opened.to_string(),
                ])
                .add_row(vec![
                    "closed at shutdown".to_string(),
                    out.streams_closed_at_shutdown.to_string(),
                ])
                .add_row(vec![
                    "bytes written".to_string(),
                    out.bytes_written.to_string(),
                ])
                .add_row(vec![
                    "responses sent".to_string(),
                    out.responses_sent.to_string(),
                ])
                .add_row(vec![
                    "responses dropped".to_string(),
                    out.responses_dropped.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "exit endpoint={} frames={} streams_opened={} closed_at_shutdown={} bytes={} responses_sent={} responses_dropped={}",
                out.endpoint,
                out.frames_dispatched,
                out.streams_opened,
                out.streams_closed_at_shutdown,
                out.bytes_written,
                out.responses_sent,
                out.responses_dropped
            );
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
