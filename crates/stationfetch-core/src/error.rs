//! Error types for transport, per-file tasks, and batch preconditions

use std::io;

/// Error from a remote session (connect, login, or retrieve).
#[derive(Debug)]
pub enum TransportError {
    /// Socket or network I/O failure
    Io(io::Error),
    /// Server replied with an unexpected status
    Protocol { code: Option<u32>, message: String },
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Protocol {
                code: Some(c),
                message,
            } => write!(f, "server replied {c}: {message}"),
            Self::Protocol {
                code: None,
                message,
            } => write!(f, "protocol error: {message}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Protocol { .. } => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl TransportError {
    /// 550 = requested file unavailable (missing remote file)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Protocol { code: Some(550), .. })
    }
}

/// Coarse classification of a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Connect,
    Transfer,
    Cancelled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Transfer => "transfer",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Why a single file task failed. Never escapes the task it belongs to.
#[derive(Debug)]
pub enum TaskError {
    /// Could not open a session after exhausting the retry budget
    Connect { attempts: u32, last: TransportError },
    /// Retrieve failed (includes a missing remote file)
    Transfer(TransportError),
    /// Local filesystem failure (directory creation, write, rename)
    LocalIo(io::Error),
    /// Skipped because the batch was cancelled
    Cancelled,
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect { attempts, last } => {
                write!(f, "connection failed after {attempts} attempt(s): {last}")
            }
            Self::Transfer(e) => write!(f, "transfer failed: {e}"),
            Self::LocalIo(e) => write!(f, "local IO: {e}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect { last, .. } => Some(last),
            Self::Transfer(e) => Some(e),
            Self::LocalIo(e) => Some(e),
            Self::Cancelled => None,
        }
    }
}

impl TaskError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Connect { .. } => FailureKind::Connect,
            Self::Transfer(_) | Self::LocalIo(_) => FailureKind::Transfer,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// A download request that fails its preconditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    EmptyStation,
    EmptyState,
    InvalidHour(u8),
    InvalidMinute(u8),
    EndDateBeforeStart,
    EndTimeBeforeStart,
    RangeTooLarge { days: u32, max: u32 },
}

impl std::fmt::Display for SpecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyStation => f.write_str("station id is empty"),
            Self::EmptyState => f.write_str("state code is empty"),
            Self::InvalidHour(h) => write!(f, "hour {h} is outside 0-23"),
            Self::InvalidMinute(m) => write!(f, "minute {m} is not one of 00, 15, 30, 45"),
            Self::EndDateBeforeStart => f.write_str("end date is before start date"),
            Self::EndTimeBeforeStart => f.write_str("end time is before start time"),
            Self::RangeTooLarge { days, max } => {
                write!(f, "date range of {days} days exceeds the limit of {max}")
            }
        }
    }
}

impl std::error::Error for SpecError {}

/// Failure of a whole batch, raised before any task is dispatched.
#[derive(Debug)]
pub enum BatchError {
    InvalidSpec(SpecError),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSpec(e) => write!(f, "invalid download request: {e}"),
            Self::ThreadPool(e) => write!(f, "cannot start worker pool: {e}"),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidSpec(e) => Some(e),
            Self::ThreadPool(e) => Some(e),
        }
    }
}

impl From<SpecError> for BatchError {
    fn from(e: SpecError) -> Self {
        Self::InvalidSpec(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for BatchError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(e)
    }
}
