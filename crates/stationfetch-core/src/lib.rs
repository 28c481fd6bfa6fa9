//! Stationfetch Core - concurrent download engine for station data files
//!
//! Expands a station/date/time request into quarter-hourly file tasks and
//! fetches them over a pluggable transport with bounded parallelism,
//! per-file retrying connection setup, and cooperative cancellation.

pub mod cancel;
pub mod error;
pub mod logging;
pub mod plan;
pub mod progress;
pub mod provision;
pub mod retry;
pub mod scheduler;
pub mod transport;
pub mod work_queue;
pub mod worker;

// Re-exports for convenience
pub use cancel::CancellationToken;
pub use error::{BatchError, FailureKind, SpecError, TaskError, TransportError};
pub use logging::init_logging;
pub use plan::{DownloadSpec, FileTask, TimeOfDay, plan};
pub use progress::{
    BarObserver, BatchProgress, ChannelObserver, ProgressContext, ProgressObserver,
    SharedProgress,
};
pub use provision::Provisioner;
pub use retry::{Backoff, RetryPolicy};
pub use scheduler::{BatchConfig, BatchResult, BatchState, FailedFile, Scheduler};
pub use transport::{Connector, Credentials, Session};
pub use worker::TaskOutcome;
