//! Integration tests against a live FTP server
//!
//! These tests require network access and are marked #[ignore] by default.
//! Point them at a server with:
//!   STATIONFETCH_TEST_HOST, STATIONFETCH_TEST_USER, STATIONFETCH_TEST_PASSWORD,
//!   STATIONFETCH_TEST_FILE (remote path of an existing file)
//! Run with: cargo test -p stationfetch-ftp --test integration -- --ignored

use std::time::Duration;

use stationfetch_core::{
    BatchConfig, BatchProgress, CancellationToken, Connector, Credentials, DownloadSpec, FailureKind,
    RetryPolicy, Scheduler, TimeOfDay,
};
use stationfetch_ftp::FtpConnector;
use tempfile::TempDir;

fn env_credentials() -> Credentials {
    let var = |name: &str| std::env::var(name).unwrap_or_else(|_| panic!("{name} not set"));
    Credentials::new(
        var("STATIONFETCH_TEST_HOST"),
        var("STATIONFETCH_TEST_USER"),
        var("STATIONFETCH_TEST_PASSWORD"),
    )
}

/// Retrieve one known file into memory
/// Run with: cargo test -p stationfetch-ftp --test integration -- --ignored retrieve_known_file
#[test]
#[ignore]
fn retrieve_known_file() {
    let remote = std::env::var("STATIONFETCH_TEST_FILE").expect("STATIONFETCH_TEST_FILE not set");
    let connector = FtpConnector::default();

    let mut session = connector
        .connect(&env_credentials())
        .expect("login should succeed");
    let mut buf = Vec::new();
    let bytes = session
        .retrieve(&remote, &mut buf)
        .expect("retrieve should succeed");
    session.close().expect("quit should succeed");

    assert_eq!(bytes as usize, buf.len());
    assert!(!buf.is_empty(), "remote file should not be empty");
}

/// A path that cannot exist comes back as an ordinary not-found failure
#[test]
#[ignore]
fn missing_file_is_reported() {
    let connector = FtpConnector::default();
    let mut session = connector
        .connect(&env_credentials())
        .expect("login should succeed");

    let err = session
        .retrieve("/definitely/not/here/KXYZ_190001010000.txt", &mut Vec::new())
        .expect_err("retrieve should fail");
    assert!(err.is_not_found(), "unexpected error: {err}");
}

/// Nothing listens on port 1 of localhost: every attempt is refused
#[test]
fn refused_connection_becomes_connect_failure() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let connector = FtpConnector::new(Duration::from_secs(2));
    let config = BatchConfig {
        concurrency: 2,
        retry: RetryPolicy {
            max_attempts: 2,
            delay: Duration::ZERO,
            ..Default::default()
        },
        local_root: dir.path().to_path_buf(),
        max_days: None,
    };
    let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let spec = DownloadSpec {
        station: "KXYZ".to_string(),
        state: "TS".to_string(),
        start_date: day,
        end_date: day,
        start_time: TimeOfDay::new(0, 0),
        end_time: TimeOfDay::new(0, 15),
        remote_base: "/forecast/stations".to_string(),
    };
    let mut credentials = Credentials::new("127.0.0.1", "anonymous", "guest");
    credentials.port = 1;

    let result = Scheduler::new(&connector, config)
        .run_batch(&spec, &credentials, &CancellationToken::new(), &mut |_: &BatchProgress| {})
        .expect("batch should run");

    assert_eq!(result.total, 2);
    assert!(result.succeeded.is_empty());
    assert_eq!(result.failed_count(FailureKind::Connect), 2);
}
