//! Plan subcommand - show what a fetch would download without connecting

use anyhow::Result;
use clap::Args;

use stationfetch_core::progress::fmt_num;

use super::{RequestArgs, print_summary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Print every remote -> local pair
    #[arg(long)]
    pub list: bool,
}

pub fn run(args: PlanArgs, config: &Config) -> Result<()> {
    let spec = args.request.to_spec(config);
    spec.validate(config.limits.max_days())?;

    let local_root = args.request.local_root(config);
    let tasks = stationfetch_core::plan(&spec, &local_root);

    if args.list {
        for task in &tasks {
            println!("{} -> {}", task.remote_path, task.local_path.display());
        }
    }

    let first = tasks.first().map(|t| t.file_name().to_string());
    let last = tasks.last().map(|t| t.file_name().to_string());
    print_summary(
        &spec.station,
        &[
            ("Days", spec.day_count().to_string()),
            (
                "Window",
                format!(
                    "{}-{} ({} files/day)",
                    spec.start_time,
                    spec.end_time,
                    spec.quarter_hours_per_day()
                ),
            ),
            ("Files", fmt_num(tasks.len())),
            ("First", first.unwrap_or_default()),
            ("Last", last.unwrap_or_default()),
            ("Output", local_root.join(&spec.state).join(&spec.station).display().to_string()),
        ],
    );
    Ok(())
}
