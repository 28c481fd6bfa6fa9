//! Progress reporting for batches.
//!
//! The scheduler reports each completion to a [`ProgressObserver`] on its
//! coordinating thread, so observers are never called concurrently.
//!
//! TTY mode: one indicatif bar for the batch.
//! Non-TTY mode: log-based output (no progress bars).

use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::mpsc::SyncSender;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// One completion within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based count of completed tasks, strictly increasing
    pub current: usize,
    /// Planned task count, constant within a batch
    pub total: usize,
    /// Basename of the remote file that just completed
    pub file_name: String,
    pub succeeded: bool,
}

/// Receives progress updates from the scheduler.
pub trait ProgressObserver {
    fn on_progress(&mut self, progress: &BatchProgress);
}

impl<F: FnMut(&BatchProgress)> ProgressObserver for F {
    fn on_progress(&mut self, progress: &BatchProgress) {
        self(progress)
    }
}

/// Forwards updates into a bounded channel drained by the caller.
///
/// Blocks the scheduler while the channel is full; a dropped receiver
/// silently discards further updates.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: SyncSender<BatchProgress>,
}

impl ChannelObserver {
    pub fn new(sender: SyncSender<BatchProgress>) -> Self {
        Self { sender }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&mut self, progress: &BatchProgress) {
        let _ = self.sender.send(progress.clone());
    }
}

fn batch_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<12.cyan.bold} {bar:30.green/dim} {pos:>6}/{len:6} {eta:>4} {wide_msg:.dim}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Central progress context managing terminal output.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        let is_tty = std::io::stderr().is_terminal();
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Observer driving a batch bar (TTY) or log lines (non-TTY).
    pub fn batch_observer(&self, label: &str) -> BarObserver {
        let bar = if self.is_tty {
            let pb = self.multi.add(ProgressBar::new(0));
            pb.set_style(batch_style());
            pb.set_prefix(label.to_string());
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        } else {
            ProgressBar::hidden()
        };
        BarObserver {
            bar,
            is_tty: self.is_tty,
            failed: 0,
        }
    }

    /// Print a line above managed progress bars (avoids interference).
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Progress observer bound to one batch.
pub struct BarObserver {
    bar: ProgressBar,
    is_tty: bool,
    failed: usize,
}

impl BarObserver {
    /// Clear the bar once the batch has returned.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for BarObserver {
    fn on_progress(&mut self, progress: &BatchProgress) {
        if !progress.succeeded {
            self.failed += 1;
        }
        if self.is_tty {
            self.bar.set_length(progress.total as u64);
            self.bar.set_position(progress.current as u64);
            if self.failed > 0 {
                self.bar
                    .set_message(format!("{} ({} failed)", progress.file_name, self.failed));
            } else {
                self.bar.set_message(progress.file_name.clone());
            }
        } else {
            let status = if progress.succeeded { "ok" } else { "failed" };
            log::info!(
                "[{}/{}] {} {status}",
                fmt_num(progress.current),
                fmt_num(progress.total),
                progress.file_name
            );
        }
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
