//! Fetch subcommand - download one station's files over FTP

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use signal_hook::consts::{SIGINT, SIGTERM};

use stationfetch_core::{
    BatchConfig, BatchResult, BatchState, CancellationToken, Credentials, FailureKind, Scheduler,
    SharedProgress, progress::fmt_num,
};
use stationfetch_ftp::FtpConnector;

use super::{RequestArgs, print_summary};
use crate::config::{Config, FtpConfig};

/// Exit status after an interrupted batch
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Number of parallel downloads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Write a JSON report of the batch to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

pub fn run(args: FetchArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let credentials = credentials(&config.ftp)?;
    let spec = args.request.to_spec(config);
    let batch_config = BatchConfig {
        concurrency: config.workers.resolve(args.workers),
        retry: config.retry.policy(),
        local_root: args.request.local_root(config),
        max_days: config.limits.max_days(),
    };

    let cancel = CancellationToken::new();
    install_signal_handlers(&cancel)?;

    log::info!(
        "Fetching {}/{} {}..={} {}-{}",
        spec.state,
        spec.station,
        spec.start_date,
        spec.end_date,
        spec.start_time,
        spec.end_time
    );
    log::info!("  Server: {}", credentials.address());
    log::info!("  Output: {}", batch_config.local_root.display());
    log::info!("  Workers: {}", batch_config.concurrency);

    let connector = FtpConnector::new(config.ftp.connect_timeout());
    let scheduler = Scheduler::new(&connector, batch_config);

    let mut observer = progress.batch_observer(&spec.station);
    let result = scheduler.run_batch(&spec, &credentials, &cancel, &mut observer);
    observer.finish();
    let result = result?;

    print_summary(&spec.station, &summary_rows(&result));
    for failure in &result.failed {
        progress.println(format!(
            "  {} [{}]: {}",
            failure.remote_path,
            failure.error.kind(),
            failure.error
        ));
    }

    if let Some(path) = &args.report {
        write_report(path, &result)?;
        log::info!("Report written to {}", path.display());
    }

    if result.state() == BatchState::Cancelled {
        log::warn!("Interrupted, {} files not attempted", fmt_num(result.skipped()));
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    if !result.failed.is_empty() {
        anyhow::bail!("{} files failed", fmt_num(result.failed.len()));
    }
    Ok(ExitCode::SUCCESS)
}

fn credentials(ftp: &FtpConfig) -> Result<Credentials> {
    if ftp.host.is_empty() {
        anyhow::bail!("FTP host not configured (set [ftp] host in stationfetch.toml)");
    }
    if ftp.user.is_empty() {
        anyhow::bail!("FTP user not configured (set [ftp] user in stationfetch.toml)");
    }
    let password = ftp
        .password
        .clone()
        .context("FTP password not configured (set [ftp] password or STATIONFETCH_PASSWORD)")?;

    let mut credentials = Credentials::new(ftp.host.clone(), ftp.user.clone(), password);
    credentials.port = ftp.port;
    Ok(credentials)
}

/// First SIGINT/SIGTERM raises the token; a second one exits immediately.
fn install_signal_handlers(cancel: &CancellationToken) -> Result<()> {
    for sig in [SIGINT, SIGTERM] {
        // Order matters: the conditional exit sees the flag before this signal sets it
        signal_hook::flag::register_conditional_shutdown(
            sig,
            i32::from(EXIT_INTERRUPTED),
            cancel.flag(),
        )
        .context("Failed to register signal handler")?;
        signal_hook::flag::register(sig, cancel.flag())
            .context("Failed to register signal handler")?;
    }
    Ok(())
}

fn summary_rows(result: &BatchResult) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        (
            "Files",
            format!(
                "{}/{} downloaded",
                fmt_num(result.succeeded.len()),
                fmt_num(result.total)
            ),
        ),
        (
            "Failed",
            format!(
                "{} ({} connect, {} transfer)",
                fmt_num(result.failed.len()),
                result.failed_count(FailureKind::Connect),
                result.failed_count(FailureKind::Transfer)
            ),
        ),
        ("Bytes", fmt_num(result.bytes as usize)),
        ("Time", format!("{:.1}s", result.elapsed.as_secs_f64())),
    ];
    if result.skipped() > 0 {
        rows.insert(2, ("Skipped", fmt_num(result.skipped())));
    }
    rows
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    state: &'static str,
    total: usize,
    skipped: usize,
    bytes: u64,
    elapsed_secs: f64,
    succeeded: &'a [PathBuf],
    failed: Vec<FailureEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct FailureEntry<'a> {
    remote_path: &'a str,
    kind: String,
    error: String,
}

impl<'a> Report<'a> {
    fn new(result: &'a BatchResult) -> Self {
        Self {
            state: match result.state() {
                BatchState::Completed => "completed",
                BatchState::Cancelled => "cancelled",
            },
            total: result.total,
            skipped: result.skipped(),
            bytes: result.bytes,
            elapsed_secs: result.elapsed.as_secs_f64(),
            succeeded: &result.succeeded,
            failed: result
                .failed
                .iter()
                .map(|f| FailureEntry {
                    remote_path: &f.remote_path,
                    kind: f.error.kind().to_string(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

fn write_report(path: &Path, result: &BatchResult) -> Result<()> {
    let json = serde_json::to_string_pretty(&Report::new(result))?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))
}
