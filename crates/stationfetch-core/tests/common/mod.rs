//! In-memory transport for engine tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use stationfetch_core::{
    BatchConfig, Connector, Credentials, DownloadSpec, RetryPolicy, Session, TimeOfDay,
    TransportError,
};

#[derive(Default)]
struct State {
    missing: HashSet<String>,
    refuse: bool,
    /// Refuse this many connection attempts before accepting
    refuse_first: usize,
    latency: Duration,
    connects: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    retrieved: Mutex<Vec<String>>,
}

/// Serves the remote path itself as the body of every file.
#[derive(Clone, Default)]
pub struct MockServer {
    state: Arc<State>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self::build(latency, HashSet::new(), false)
    }

    /// Answer 550 for these basenames
    pub fn with_missing(names: &[&str]) -> Self {
        let missing = names.iter().map(|n| n.to_string()).collect();
        Self::build(Duration::ZERO, missing, false)
    }

    /// Refuse every connection attempt
    pub fn refusing() -> Self {
        Self::build(Duration::ZERO, HashSet::new(), true)
    }

    /// Refuse the first `n` connection attempts, then behave normally
    pub fn refusing_first(n: usize) -> Self {
        Self {
            state: Arc::new(State {
                refuse_first: n,
                ..State::default()
            }),
        }
    }

    fn build(latency: Duration, missing: HashSet<String>, refuse: bool) -> Self {
        Self {
            state: Arc::new(State {
                missing,
                refuse,
                latency,
                ..State::default()
            }),
        }
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn retrieved(&self) -> Vec<String> {
        self.state.retrieved.lock().unwrap().clone()
    }
}

impl Connector for MockServer {
    fn connect(&self, _: &Credentials) -> Result<Box<dyn Session>, TransportError> {
        let attempt = self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self.state.refuse || attempt < self.state.refuse_first {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockSession {
    state: Arc<State>,
}

impl Session for MockSession {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.state.latency.is_zero() {
            std::thread::sleep(self.state.latency);
        }
        self.state
            .retrieved
            .lock()
            .unwrap()
            .push(remote_path.to_string());

        let name = remote_path.rsplit('/').next().unwrap_or(remote_path);
        let result = if self.state.missing.contains(name) {
            Err(TransportError::Protocol {
                code: Some(550),
                message: format!("{name}: No such file or directory"),
            })
        } else {
            sink.write_all(remote_path.as_bytes())
                .map(|_| remote_path.len() as u64)
                .map_err(TransportError::Io)
        };
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn close(self: Box<Self>) -> Result<(), TransportError> {
        Ok(())
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("ftp.test", "user", "secret")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// KXYZ/TS over `[start, end]` with the given daily window
pub fn spec(start: NaiveDate, end: NaiveDate, from: TimeOfDay, to: TimeOfDay) -> DownloadSpec {
    DownloadSpec {
        station: "KXYZ".to_string(),
        state: "TS".to_string(),
        start_date: start,
        end_date: end,
        start_time: from,
        end_time: to,
        remote_base: "/forecast/stations".to_string(),
    }
}

/// Engine config writing under `root` with instant retries
pub fn config(root: &Path, concurrency: usize) -> BatchConfig {
    BatchConfig {
        concurrency,
        retry: RetryPolicy {
            delay: Duration::ZERO,
            ..Default::default()
        },
        local_root: root.to_path_buf(),
        max_days: Some(31),
    }
}
