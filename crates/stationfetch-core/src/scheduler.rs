//! Batch execution: plan, dispatch with bounded parallelism, aggregate.
//!
//! Workers run on a dedicated rayon pool sized to the concurrency cap and
//! pull tasks from a shared [`WorkQueue`]. Each outcome travels back over a
//! bounded channel to the calling thread, which alone owns the progress
//! counter and the result lists.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;
use crate::error::{BatchError, FailureKind, TaskError};
use crate::plan::{DEFAULT_LOCAL_ROOT, DownloadSpec, FileTask, plan};
use crate::progress::{BatchProgress, ProgressObserver, fmt_num};
use crate::provision::Provisioner;
use crate::retry::RetryPolicy;
use crate::transport::{Connector, Credentials};
use crate::work_queue::WorkQueue;
use crate::worker::{self, TaskOutcome};

/// Default number of parallel downloads
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default cap on days per batch
pub const DEFAULT_MAX_DAYS: u32 = 31;

/// Engine settings shared by every batch a [`Scheduler`] runs.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum parallel downloads (0 is treated as 1)
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Local directory mirrored as `<root>/<state>/<station>/<file>`
    pub local_root: PathBuf,
    /// Reject requests spanning more days than this
    pub max_days: Option<u32>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            local_root: PathBuf::from(DEFAULT_LOCAL_ROOT),
            max_days: Some(DEFAULT_MAX_DAYS),
        }
    }
}

/// A file that could not be fetched.
#[derive(Debug)]
pub struct FailedFile {
    pub remote_path: String,
    pub error: TaskError,
}

/// Terminal state of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Completed,
    /// Cancellation left some planned tasks unstarted
    Cancelled,
}

/// Everything a finished batch produced, in completion order.
#[derive(Debug)]
pub struct BatchResult {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<FailedFile>,
    /// Planned task count
    pub total: usize,
    pub bytes: u64,
    pub elapsed: Duration,
    /// Cancellation was observed while the batch ran
    pub cancel_observed: bool,
}

impl BatchResult {
    fn new(total: usize) -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            total,
            bytes: 0,
            elapsed: Duration::ZERO,
            cancel_observed: false,
        }
    }

    /// Tasks that produced an outcome
    pub fn completed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Planned tasks that were never started
    pub fn skipped(&self) -> usize {
        self.total - self.completed()
    }

    pub fn state(&self) -> BatchState {
        if self.cancel_observed && self.completed() < self.total {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        }
    }

    /// Failures of one kind
    pub fn failed_count(&self, kind: FailureKind) -> usize {
        self.failed.iter().filter(|f| f.error.kind() == kind).count()
    }

    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Succeeded { local_path, bytes } => {
                self.bytes += bytes;
                self.succeeded.push(local_path);
            }
            TaskOutcome::Failed { remote_path, error } => {
                self.failed.push(FailedFile { remote_path, error });
            }
        }
    }

    /// Log batch completion summary.
    pub fn log(&self) {
        log::info!(
            "Files: {}/{} downloaded ({} failed, {} skipped) [{:.1}s]",
            fmt_num(self.succeeded.len()),
            fmt_num(self.total),
            fmt_num(self.failed.len()),
            fmt_num(self.skipped()),
            self.elapsed.as_secs_f64()
        );
    }
}

/// Runs download batches over a shared [`Connector`].
pub struct Scheduler<'a> {
    connector: &'a dyn Connector,
    config: BatchConfig,
}

impl<'a> Scheduler<'a> {
    pub fn new(connector: &'a dyn Connector, config: BatchConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Task list a batch for `spec` would run
    pub fn plan(&self, spec: &DownloadSpec) -> Vec<FileTask> {
        plan(spec, &self.config.local_root)
    }

    /// Download every file of `spec`.
    ///
    /// Fails only when `spec` is invalid or the pool cannot start, before
    /// anything is dispatched. Per-file failures land in
    /// [`BatchResult::failed`]. `observer` is called on this thread once per
    /// completion. The caller owns `cancel`; a token raised before the call
    /// lets nothing start, and raising it mid-batch stops new tasks while
    /// in-flight ones finish.
    pub fn run_batch(
        &self,
        spec: &DownloadSpec,
        credentials: &Credentials,
        cancel: &CancellationToken,
        observer: &mut dyn ProgressObserver,
    ) -> Result<BatchResult, BatchError> {
        spec.validate(self.config.max_days)?;
        let start = Instant::now();

        let tasks = self.plan(spec);
        let total = tasks.len();
        let mut result = BatchResult::new(total);
        if total == 0 {
            return Ok(result);
        }

        let workers = self.config.concurrency.clamp(1, total);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("fetch-{i}"))
            .build()?;

        log::info!(
            "Fetching {} files for {}/{} from {} with {workers} workers",
            fmt_num(total),
            spec.state,
            spec.station,
            credentials.address()
        );

        let queue = WorkQueue::new(tasks);
        let provisioner = Provisioner::new(self.connector, self.config.retry);
        let (tx, rx) = mpsc::sync_channel::<(&FileTask, TaskOutcome)>(workers);

        pool.in_place_scope(|s| {
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                s.spawn(move |_| {
                    while let Some(task) = queue.claim(cancel) {
                        let outcome = worker::run(task, credentials, &provisioner, cancel);
                        if tx.send((task, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            // Workers hold the only senders now; the loop ends when all exit
            drop(tx);

            let mut current = 0usize;
            for (task, outcome) in rx {
                current += 1;
                observer.on_progress(&BatchProgress {
                    current,
                    total,
                    file_name: task.file_name().to_string(),
                    succeeded: outcome.is_success(),
                });
                result.record(outcome);

                if cancel.is_cancelled() && !result.cancel_observed {
                    result.cancel_observed = true;
                    log::warn!("Cancellation requested, waiting for in-flight downloads");
                }
            }
        });

        if cancel.is_cancelled() {
            result.cancel_observed = true;
        }
        result.elapsed = start.elapsed();
        log::debug!("{} of {} tasks dispatched", queue.dispatched(), total);
        result.log();
        Ok(result)
    }
}
