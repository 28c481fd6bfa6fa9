//! Download of a single file task

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cancel::CancellationToken;
use crate::error::TaskError;
use crate::plan::FileTask;
use crate::provision::Provisioner;
use crate::transport::Credentials;

/// Result of one dispatched task.
#[derive(Debug)]
pub enum TaskOutcome {
    Succeeded { local_path: PathBuf, bytes: u64 },
    Failed { remote_path: String, error: TaskError },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Fetch one file. Never panics on I/O and never aborts sibling tasks:
/// every failure comes back as [`TaskOutcome::Failed`].
pub fn run(
    task: &FileTask,
    credentials: &Credentials,
    provisioner: &Provisioner<'_>,
    cancel: &CancellationToken,
) -> TaskOutcome {
    if cancel.is_cancelled() {
        return TaskOutcome::Failed {
            remote_path: task.remote_path.clone(),
            error: TaskError::Cancelled,
        };
    }

    match download(task, credentials, provisioner) {
        Ok(bytes) => {
            log::debug!("{}: {bytes} bytes", task.file_name());
            TaskOutcome::Succeeded {
                local_path: task.local_path.clone(),
                bytes,
            }
        }
        Err(error) => {
            log::warn!("{}: {error}", task.remote_path);
            TaskOutcome::Failed {
                remote_path: task.remote_path.clone(),
                error,
            }
        }
    }
}

fn download(
    task: &FileTask,
    credentials: &Credentials,
    provisioner: &Provisioner<'_>,
) -> Result<u64, TaskError> {
    if let Some(parent) = task.local_path.parent() {
        fs::create_dir_all(parent).map_err(TaskError::LocalIo)?;
    }

    let mut session = provisioner.acquire(credentials)?;
    let part = PartFile::create(&task.local_path).map_err(TaskError::LocalIo)?;
    let mut writer = BufWriter::new(&part.file);

    let bytes = session
        .retrieve(&task.remote_path, &mut writer)
        .map_err(TaskError::Transfer)?;
    writer.flush().map_err(TaskError::LocalIo)?;
    drop(writer);

    // File is complete; a failed QUIT does not invalidate it
    if let Err(e) = session.close() {
        log::debug!("{}: close failed: {e}", task.file_name());
    }

    part.commit().map_err(TaskError::LocalIo)?;
    Ok(bytes)
}

/// `<final>.part` sibling, renamed onto the final path on commit and
/// removed on drop otherwise.
struct PartFile {
    file: File,
    tmp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl PartFile {
    fn create(final_path: &Path) -> std::io::Result<Self> {
        let mut name = final_path.as_os_str().to_owned();
        name.push(".part");
        let tmp_path = PathBuf::from(name);
        let file = File::create(&tmp_path)?;
        Ok(Self {
            file,
            tmp_path,
            final_path: final_path.to_path_buf(),
            committed: false,
        })
    }

    fn commit(mut self) -> std::io::Result<()> {
        self.file.sync_all()?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::error::{FailureKind, TransportError};
    use crate::retry::RetryPolicy;
    use crate::transport::{Connector, Session};

    /// Serves `body` for every path, or a 550 for paths containing "missing".
    struct Canned {
        body: &'static [u8],
    }

    struct CannedSession {
        body: &'static [u8],
    }

    impl Connector for Canned {
        fn connect(&self, _: &Credentials) -> Result<Box<dyn Session>, TransportError> {
            Ok(Box::new(CannedSession { body: self.body }))
        }
    }

    impl Session for CannedSession {
        fn retrieve(&mut self, path: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
            if path.contains("missing") {
                // Some bytes first, to check partial output is removed
                sink.write_all(b"partial")?;
                return Err(TransportError::Protocol {
                    code: Some(550),
                    message: "No such file".to_string(),
                });
            }
            sink.write_all(self.body)?;
            Ok(self.body.len() as u64)
        }

        fn close(self: Box<Self>) -> Result<(), TransportError> {
            Err(TransportError::Io(io::Error::other("quit refused")))
        }
    }

    struct Refusing;

    impl Connector for Refusing {
        fn connect(&self, _: &Credentials) -> Result<Box<dyn Session>, TransportError> {
            Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "refused",
            )))
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn creds() -> Credentials {
        Credentials::new("localhost", "u", "p")
    }

    fn task(dir: &Path, name: &str) -> FileTask {
        FileTask {
            remote_path: format!("/base/TS/KXYZ/{name}"),
            local_path: dir.join("TS").join("KXYZ").join(name),
        }
    }

    #[test]
    fn writes_file_and_creates_parents() {
        let dir = TempDir::new().unwrap();
        let conn = Canned { body: b"obs data" };
        let t = task(dir.path(), "KXYZ_202401010000.txt");

        let outcome = run(&t, &creds(), &Provisioner::new(&conn, policy()), &CancellationToken::new());

        match outcome {
            TaskOutcome::Succeeded { local_path, bytes } => {
                assert_eq!(local_path, t.local_path);
                assert_eq!(bytes, 8);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fs::read(&t.local_path).unwrap(), b"obs data");
        assert!(!dir.path().join("TS/KXYZ/KXYZ_202401010000.txt.part").exists());
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let t = task(dir.path(), "a.txt");
        fs::create_dir_all(t.local_path.parent().unwrap()).unwrap();
        fs::write(&t.local_path, b"old contents, longer").unwrap();

        let conn = Canned { body: b"new" };
        let outcome = run(&t, &creds(), &Provisioner::new(&conn, policy()), &CancellationToken::new());
        assert!(outcome.is_success());
        assert_eq!(fs::read(&t.local_path).unwrap(), b"new");
    }

    #[test]
    fn missing_remote_file_is_transfer_failure_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let conn = Canned { body: b"x" };
        let t = task(dir.path(), "missing.txt");

        let outcome = run(&t, &creds(), &Provisioner::new(&conn, policy()), &CancellationToken::new());

        match outcome {
            TaskOutcome::Failed { remote_path, error } => {
                assert_eq!(remote_path, t.remote_path);
                assert_eq!(error.kind(), FailureKind::Transfer);
                assert!(error.to_string().contains("550"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!t.local_path.exists());
        assert!(!dir.path().join("TS/KXYZ/missing.txt.part").exists());
    }

    #[test]
    fn connect_failure_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let t = task(dir.path(), "a.txt");
        let outcome = run(&t, &creds(), &Provisioner::new(&Refusing, policy()), &CancellationToken::new());
        match outcome {
            TaskOutcome::Failed { error, .. } => {
                assert_eq!(error.kind(), FailureKind::Connect);
                assert!(error.to_string().contains("3 attempt"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cancelled_token_skips_all_io() {
        let dir = TempDir::new().unwrap();
        let t = task(dir.path(), "a.txt");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = run(&t, &creds(), &Provisioner::new(&Refusing, policy()), &cancel);

        match outcome {
            TaskOutcome::Failed { error, .. } => assert_eq!(error.to_string(), "cancelled"),
            other => panic!("unexpected {other:?}"),
        }
        // Parent directory was never created
        assert!(!dir.path().join("TS").exists());
    }
}
