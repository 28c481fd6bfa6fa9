//! Subcommands and the request arguments they share

pub mod fetch;
pub mod plan;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use stationfetch_core::{DownloadSpec, TimeOfDay};

use crate::config::Config;

/// Station, date range and daily window of one batch
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Station identifier (e.g. KXYZ)
    #[arg(long)]
    pub station: String,

    /// State / region code the station is filed under
    #[arg(long)]
    pub state: String,

    /// First day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start: NaiveDate,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end: NaiveDate,

    /// Start of the daily window (HH:MM, minutes on a quarter hour)
    #[arg(long, value_parser = parse_time, default_value = "00:00")]
    pub from: TimeOfDay,

    /// End of the daily window, inclusive (HH:MM)
    #[arg(long, value_parser = parse_time, default_value = "23:45")]
    pub to: TimeOfDay,

    /// Local output root (default: from config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RequestArgs {
    pub fn to_spec(&self, config: &Config) -> DownloadSpec {
        DownloadSpec {
            station: self.station.clone(),
            state: self.state.clone(),
            start_date: self.start,
            end_date: self.end,
            start_time: self.from,
            end_time: self.to,
            remote_base: config.ftp.remote_base.clone(),
        }
    }

    pub fn local_root(&self, config: &Config) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| config.output.local_root.clone())
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date format: {e}"))
}

/// Parse `HH:MM`. Range checks happen in request validation.
fn parse_time(s: &str) -> Result<TimeOfDay, String> {
    let (hour, minute) = s
        .split_once(':')
        .ok_or_else(|| format!("Invalid time format (expected HH:MM): {s}"))?;
    let hour = hour
        .parse::<u8>()
        .map_err(|e| format!("Invalid hour '{hour}': {e}"))?;
    let minute = minute
        .parse::<u8>()
        .map_err(|e| format!("Invalid minute '{minute}': {e}"))?;
    Ok(TimeOfDay::new(hour, minute))
}

/// Print a key-value summary table on stderr
pub(crate) fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

/// Show the effective configuration
pub fn show_config(config: &Config) {
    let ftp = &config.ftp;
    let host = if ftp.host.is_empty() {
        "not set".to_string()
    } else {
        format!("{}:{}", ftp.host, ftp.port)
    };
    let backoff = format!("{:?}", config.retry.backoff).to_lowercase();
    let max_days = match config.limits.max_days() {
        Some(days) => days.to_string(),
        None => "unlimited".to_string(),
    };

    print_summary(
        "Setting",
        &[
            ("FTP host", host),
            ("FTP user", ftp.user.clone()),
            (
                "FTP password",
                if ftp.password.is_some() { "configured" } else { "not set" }.to_string(),
            ),
            ("Remote base", ftp.remote_base.clone()),
            ("Connect timeout", format!("{}s", ftp.connect_timeout_secs)),
            ("Output directory", config.output.local_root.display().to_string()),
            (
                "Workers",
                format!("{} (max: {})", config.workers.default, config.workers.max),
            ),
            (
                "Retry",
                format!(
                    "{} attempts, {}s {backoff}",
                    config.retry.max_attempts, config.retry.delay_secs
                ),
            ),
            ("Max days", max_days),
        ],
    );
}
