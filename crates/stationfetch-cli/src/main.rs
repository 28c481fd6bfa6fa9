//! stationfetch - bulk downloader for quarter-hourly station data files
//!
//! Fetches every file of one station over a date range and daily time
//! window from an FTP server, several files at a time.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "stationfetch")]
#[command(about = "Bulk downloader for quarter-hourly station data files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./stationfetch.toml or ~/.config/stationfetch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Download station files over FTP
    Fetch(cmd::fetch::FetchArgs),
    /// Show the files a fetch would download
    Plan(cmd::plan::PlanArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(stationfetch_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    stationfetch_core::init_logging(quiet, cli.debug, multi)?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Fetch(args) => cmd::fetch::run(args, &config, &progress),
        Command::Plan(args) => cmd::plan::run(args, &config).map(|()| ExitCode::SUCCESS),
        Command::Config => {
            cmd::show_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}
